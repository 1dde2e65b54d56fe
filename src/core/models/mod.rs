pub mod cost_tree;
pub mod resources;
pub mod series;

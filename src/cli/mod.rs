pub mod config_cmd;
pub mod data_cmd;
pub mod output;
pub mod renderer;

pub mod backend;
pub mod config;
pub mod formatter;
pub mod logging;
pub mod models;
pub mod sequences;
pub mod session;
pub mod state;
pub mod transform;

pub mod auth;
pub mod chat;
pub mod config;
pub mod conversation;
pub mod logger;
pub mod relay;
pub mod storage;
pub mod token;

// Re-export commonly used functions at the top of the modules namespace
pub use config::*;
pub use logger::*;
pub use storage::{get_data_dir, LocalStore};

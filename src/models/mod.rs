pub mod chat;
pub mod config;
pub mod context;

pub use chat::{ChatMode, Message, Role};
pub use config::{AppConfig, ClientConfig};
pub use context::{ContextSnapshot, ContextUpdate};

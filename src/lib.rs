pub mod commands;
pub mod error;
pub mod models;
pub mod modules;
pub mod proxy; // Forwarding proxy module
pub mod utils;

pub use error::{AppError, AppResult, ProxyError, RelayError};
pub use models::{AppConfig, ChatMode, ClientConfig};
pub use modules::chat::{ChatService, SubmitOutcome};
pub use modules::LocalStore;
pub use proxy::{AxumServer, ProxyConfig};

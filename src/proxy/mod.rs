// proxy module - forwarding route to the loyalty backend

pub mod config;
pub mod handlers; // Forwarding handler
pub mod server;
pub mod upstream; // Upstream client

pub use config::ProxyConfig;
pub use server::AxumServer;

// Handlers module - forwarding route endpoints

pub mod forward;

pub use forward::handle_forward;

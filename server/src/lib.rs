pub mod app;
pub mod config;
pub mod error;
pub mod heartbeat;
pub mod history;
pub mod protocol;
pub mod segment;
pub mod session;
pub mod transport;
pub mod validation;

// Public API for integration tests and embedding the relay

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod server;
pub mod state;
pub mod types;
pub mod ws;

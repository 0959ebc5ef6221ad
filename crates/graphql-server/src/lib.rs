//! Hosts an engine schema over HTTP and the graphql-ws websocket protocol.

pub mod config;
mod error;
mod server;

pub use config::Config;
pub use error::{Error, Result};
pub use server::{router, serve};

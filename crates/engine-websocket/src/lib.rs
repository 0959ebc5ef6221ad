//! Server side of the graphql-ws protocol over the engine's subscriptions.
//!
//! [`serve`] runs the protocol over any stream of inbound [`Frame`]s and sink of outbound
//! ones. [`WebsocketService`] plugs it into axum websocket upgrades.

mod axum;
mod connection;
mod error;
mod keep_alive;
pub mod messages;
mod operations;

pub use self::axum::{WebsocketService, PROTOCOL};
pub use connection::{serve, ConnectionSettings, ConnectionState, SchemaWatcher};
pub use error::ProtocolError;
pub use messages::{CloseFrame, Frame};
pub use operations::{Observer, OperationManager};

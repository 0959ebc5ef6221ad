//! Dynamic GraphQL execution engine.
//!
//! Types and resolvers are registered at runtime in a [`Registry`]. A [`Schema`] built from it
//! executes queries and mutations, and turns subscriptions into streams of responses fed by
//! the events published on its [`EventBus`].

mod context;
mod data;
mod error;
mod prepare;
mod query_path;
pub mod registry;
mod request;
mod resolver_utils;
mod response;
mod schema;
mod subscription;

pub use async_graphql_parser::{types::OperationType, Pos};
pub use async_graphql_value::{ConstValue, Name};
pub use context::{ContextField, ContextSelectionSet};
pub use data::Data;
pub use error::{Error, RegistryError, ServerError, ServerResult, StructuralError};
pub use event_bus::{self, ChannelSelector, ClientId, EventBus, Filter};
pub use prepare::PreparedOperation;
pub use query_path::{PositionPath, QueryPath, QueryPathSegment};
pub use registry::Registry;
pub use request::{Request, Variables};
pub use response::{Response, ResponseObject, ResponseValue};
pub use schema::{Schema, SchemaBuilder};
pub use subscription::ResponseStream;

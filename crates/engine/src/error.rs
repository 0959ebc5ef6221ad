use async_graphql_parser::{types::OperationType, Pos};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::QueryPath;

pub type ServerResult<T> = Result<T, ServerError>;

/// Error returned by resolvers. Any `Display` error converts into it with `?`.
#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    pub message: String,
    pub extensions: Option<Map<String, Value>>,
}

impl Error {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            extensions: None,
        }
    }

    #[must_use]
    pub fn with_extension(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extensions
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn into_server_error(self, pos: Pos) -> ServerError {
        ServerError {
            message: self.message,
            locations: vec![pos],
            path: QueryPath::empty(),
            extensions: self.extensions,
        }
    }
}

impl<T: std::fmt::Display + Send + Sync + 'static> From<T> for Error {
    fn from(error: T) -> Self {
        Self::new(error.to_string())
    }
}

/// An error as it appears in the `errors` list of a response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerError {
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<Pos>,
    #[serde(skip_serializing_if = "QueryPath::is_empty")]
    pub path: QueryPath,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Map<String, Value>>,
}

impl ServerError {
    pub fn new(message: impl Into<String>, pos: Option<Pos>) -> Self {
        Self {
            message: message.into(),
            locations: pos.into_iter().collect(),
            path: QueryPath::empty(),
            extensions: None,
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: QueryPath) -> Self {
        self.path = path;
        self
    }
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ServerError {}

/// Errors that make a document impossible to execute. Nothing of the operation runs when
/// one of these is returned.
#[derive(Debug, thiserror::Error)]
pub enum StructuralError {
    #[error(transparent)]
    Parse(#[from] async_graphql_parser::Error),
    #[error("Unknown operation named \"{0}\".")]
    UnknownOperation(String),
    #[error("Operation name required in request.")]
    OperationNameRequired,
    #[error("Unknown fragment \"{name}\".")]
    UnknownFragment { name: String, pos: Pos },
    #[error("Cannot spread fragment \"{name}\" within itself.")]
    FragmentCycle { name: String, pos: Pos },
    #[error("Schema is not configured for {}s.", operation_kind(.0))]
    OperationNotSupported(OperationType),
    #[error("{} operations cannot be executed here.", capitalize(operation_kind(.0)))]
    WrongEntryPoint(OperationType),
    #[error("Variable \"${name}\" of required type \"{ty}\" was not provided.")]
    MissingVariable { name: String, ty: String, pos: Pos },
    #[error("Subscription field \"{name}\" is not bound to an event channel.")]
    NotSubscribable { name: String, pos: Pos },
    #[error("Subscription operations must select exactly one top level field.")]
    InvalidSubscriptionRoot,
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl StructuralError {
    pub fn into_server_error(self) -> ServerError {
        let locations = match &self {
            StructuralError::Parse(error) => error.positions().collect(),
            StructuralError::UnknownFragment { pos, .. }
            | StructuralError::FragmentCycle { pos, .. }
            | StructuralError::MissingVariable { pos, .. }
            | StructuralError::NotSubscribable { pos, .. } => vec![*pos],
            _ => Vec::new(),
        };

        ServerError {
            message: self.to_string(),
            locations,
            path: QueryPath::empty(),
            extensions: None,
        }
    }
}

impl From<StructuralError> for ServerError {
    fn from(error: StructuralError) -> Self {
        error.into_server_error()
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegistryError {
    #[error("Type \"{0}\" is already registered.")]
    DuplicateType(String),
    #[error("Unknown type \"{0}\".")]
    UnknownType(String),
    #[error("Cannot query field \"{field}\" on type \"{owner}\".")]
    UnknownField { owner: String, field: String },
}

pub(crate) fn operation_kind(ty: &OperationType) -> &'static str {
    match ty {
        OperationType::Query => "query",
        OperationType::Mutation => "mutation",
        OperationType::Subscription => "subscription",
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

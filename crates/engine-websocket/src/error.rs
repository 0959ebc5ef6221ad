use engine::ServerError;

/// Protocol violations reported to the client. The connection stays open.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("No schema is available to serve this connection.")]
    SchemaUnavailable,
    #[error("Unknown operation id \"{0}\".")]
    UnknownOperation(String),
}

impl From<ProtocolError> for ServerError {
    fn from(error: ProtocolError) -> Self {
        ServerError::new(error.to_string(), None)
    }
}

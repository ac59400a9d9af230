use thiserror::Error;

/// Framing and serialization errors.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("invalid message type: {0}")]
    InvalidMessageType(u8),

    #[error("message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("framing error: {0}")]
    FramingError(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors surfaced by a push exchange.
#[derive(Debug, Error)]
pub enum PushError {
    /// The responder refused the push. Carries its message verbatim.
    #[error("{0}")]
    Rejected(String),

    /// Connection or framing failure, including protocol violations.
    #[error("transport error: {0}")]
    Transport(String),

    /// The batch cannot be pushed as given.
    #[error("invalid push batch: {0}")]
    InvalidBatch(String),

    #[error("store error: {0}")]
    Store(#[from] aleph_store::StoreError),

    #[error("statement error: {0}")]
    Statement(#[from] aleph_statement::StatementError),
}

impl From<ProtocolError> for PushError {
    fn from(e: ProtocolError) -> Self {
        Self::Transport(e.to_string())
    }
}

impl From<std::io::Error> for PushError {
    fn from(e: std::io::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

pub type PushCallResult<T> = Result<T, PushError>;

use thiserror::Error;

/// Errors from statement construction and id extraction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StatementError {
    #[error("invalid selector {selector:?}: {reason}")]
    SelectorSyntax { selector: String, reason: String },

    #[error("path not found: {path}")]
    PathNotFound { path: String },

    #[error("{0}")]
    IdExtraction(String),

    #[error("invalid id pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("statement must carry at least one ref")]
    EmptyRefs,

    #[error("invalid namespace: {0:?}")]
    InvalidNamespace(String),

    #[error("invalid signature on statement {id}")]
    InvalidSignature { id: String },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("statement log error: {0}")]
    Log(String),
}

pub type StatementResult<T> = Result<T, StatementError>;

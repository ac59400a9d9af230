use std::fmt;

use aleph_protocol::PushError;
use aleph_statement::StatementError;
use aleph_store::StoreError;
use thiserror::Error;

/// The two phases of publishing a batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Bodies are stored and their references collected.
    Store,
    /// Statements referencing the stored bodies are published.
    Publish,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store => f.write_str("store"),
            Self::Publish => f.write_str("publish"),
        }
    }
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error(transparent)]
    Statement(#[from] StatementError),

    #[error("{phase} phase returned {actual} results for a batch of {expected}")]
    BatchCountMismatch {
        phase: Phase,
        expected: usize,
        actual: usize,
    },

    #[error("malformed record on line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    #[error("namespace client error: {0}")]
    Client(String),

    #[error("batch task failed: {0}")]
    Task(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("push failed: {0}")]
    Push(#[from] PushError),
}

pub type PublishResult<T> = Result<T, PublishError>;

use aleph_statement::StatementRecord;
use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: u32 = 1;
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024 * 1024;

/// Protocol id a node registers its push handler under.
pub const PUSH_PROTOCOL: &str = "/aleph/node/push/1.0";

/// Payload of an authorized push: statements and the bodies they reference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushRequest {
    pub namespace: String,
    pub statements: Vec<StatementRecord>,
    pub bodies: Vec<Vec<u8>>,
}

/// Outcome reported by the responder at the end of an exchange.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushResult {
    pub objects_stored: u64,
    pub statements_recorded: u64,
    pub error: Option<String>,
}

/// All message types in the push protocol.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlephMessage {
    PushOpen { requester: String, namespace: String },
    Accept,
    Reject { error: String },
    PushRequest(PushRequest),
    PushResult(PushResult),
    /// Liveness check between nodes. Answered with a `Pong` carrying the same nonce.
    Ping { nonce: u64 },
    Pong { nonce: u64 },
    Error { code: u32, message: String },
}

impl AlephMessage {
    pub fn type_tag(&self) -> u8 {
        match self {
            Self::PushOpen { .. } => 1,
            Self::Accept => 2,
            Self::Reject { .. } => 3,
            Self::PushRequest(_) => 4,
            Self::PushResult(_) => 5,
            Self::Ping { .. } => 6,
            Self::Pong { .. } => 7,
            Self::Error { .. } => 255,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::PushOpen { .. } => "PushOpen",
            Self::Accept => "Accept",
            Self::Reject { .. } => "Reject",
            Self::PushRequest(_) => "PushRequest",
            Self::PushResult(_) => "PushResult",
            Self::Ping { .. } => "Ping",
            Self::Pong { .. } => "Pong",
            Self::Error { .. } => "Error",
        }
    }
}

pub mod error_codes {
    pub const UNEXPECTED_MESSAGE: u32 = 400;
    pub const INTERNAL: u32 = 500;
}

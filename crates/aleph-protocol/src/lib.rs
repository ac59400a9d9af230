//! Peer push protocol for aleph nodes.
//!
//! One exchange replicates a batch of statements, plus the bodies they
//! reference, from an initiator to a responder:
//!
//! ```text
//! initiator                         responder
//!   PushOpen{requester, namespace} ->
//!                                  <- Accept | Reject{error}
//!   PushRequest{statements, bodies} ->
//!                                  <- PushResult{objects, statements, error}
//! ```
//!
//! A `Reject` ends the exchange and surfaces to the initiator as
//! [`PushError::Rejected`] carrying the responder's message verbatim.
//! Anything that goes wrong with the connection or framing is a
//! [`PushError::Transport`]. There are no timeouts: once the payload is
//! being sent, the exchange runs until it completes or the connection fails.
//!
//! The same listener answers a `Ping{nonce}` opening with `Pong{nonce}`, so
//! nodes can check each other directly.

pub mod auth;
pub mod codec;
pub mod error;
pub mod message;
pub mod ping;
pub mod push;

pub use auth::{AllowAll, Authorization, NamespaceAllowList, PushAuthorizer};
pub use codec::{read_message, write_message, AlephCodec};
pub use error::{ProtocolError, ProtocolResult, PushError, PushCallResult};
pub use message::{
    AlephMessage, PushRequest, PushResult, MAX_MESSAGE_SIZE, PROTOCOL_VERSION, PUSH_PROTOCOL,
};
pub use ping::{ping, ping_over};
pub use push::{PushClient, PushExchange, PushOutcome, PushResponder, PushState};

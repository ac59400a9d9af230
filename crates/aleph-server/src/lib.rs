//! Hosting for an aleph node.
//!
//! An [`AlephNode`] owns the content store, the statement log, and the
//! node's publisher key. It answers peer pushes over TCP with a
//! [`PushResponder`](aleph_protocol::PushResponder) and exposes a small
//! read-only HTTP API:
//!
//! | Route | Response |
//! |-------|----------|
//! | `GET /v1/health` | liveness and protocol version |
//! | `GET /v1/info` | publisher id and store/log counts |
//! | `GET /v1/object/:key` | stored object (`?raw=true` for bytes) |
//! | `GET /v1/statement/:id` | recorded statement |

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use config::{read_key, write_key, NodeConfig};
pub use error::{ServerError, ServerResult};
pub use handler::{AppState, HealthResponse};
pub use server::AlephNode;

//! Batched publishing of statements built from newline-delimited JSON.
//!
//! A [`BatchPublisher`] reads records from a [`RecordStream`], extracts a
//! ref for each one, and folds the resulting statements into batches with a
//! [`Batcher`]. Each batch goes through two phases against a
//! [`NamespaceClient`]:
//!
//! 1. **Store**: the statement bodies are stored and one reference per body
//!    comes back.
//! 2. **Publish**: each statement's embedded body is swapped for its
//!    reference, and the statements are published into the namespace.
//!
//! Either phase returning the wrong number of results fails the batch with
//! [`PublishError::BatchCountMismatch`]. Batches fail independently.
//!
//! [`LocalNamespace`] publishes into an in-process store and log;
//! [`PeerNamespace`] pushes to a running node, holding each body only until
//! its batch has been pushed.

pub mod batch;
pub mod error;
pub mod namespace;
pub mod publisher;
pub mod records;

pub use batch::{Batch, Batcher, DEFAULT_BATCH_SIZE};
pub use error::{Phase, PublishError, PublishResult};
pub use namespace::{LocalNamespace, NamespaceClient, PeerNamespace};
pub use publisher::{BatchPublisher, PublishEvent, PublishOptions, PublishSummary};
pub use records::{DynInput, RecordStream};

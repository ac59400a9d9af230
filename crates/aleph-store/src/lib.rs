//! Content-addressed object storage for aleph nodes.
//!
//! Every statement body and every other blob a node holds is stored under its
//! sha2-256 multihash, base58 encoded. The [`Datastore`] computes keys and
//! applies the value codec; the bytes themselves live in a pluggable
//! [`KvBackend`].
//!
//! # Storage Backends
//!
//! - [`MemoryBackend`]: `HashMap`-based store for tests and embedding
//! - [`FsBackend`]: one file per object under a sharded directory tree
//!
//! # Design Rules
//!
//! 1. Keys are a pure function of content: the same value always maps to the
//!    same key, so writes are idempotent and safe to repeat concurrently.
//! 2. The backend never interprets values; decoding happens in the datastore.
//! 3. Reading bytes that fail to decode returns them as base64 text instead
//!    of an error, so foreign content stays readable.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod datastore;
pub mod error;
pub mod fs;
pub mod memory;
pub mod traits;

pub use datastore::{BackendKind, Datastore, DatastoreOptions, Fetched, GetOptions, StoreValue};
pub use error::{StoreError, StoreResult};
pub use fs::FsBackend;
pub use memory::MemoryBackend;
pub use traits::KvBackend;

//! Foundation types for aleph nodes.
//!
//! Every other aleph crate depends on `aleph-types`.
//!
//! # Key Types
//!
//! - [`ContentRef`]: self-describing content digest (multihash, base58)
//! - [`PublisherIdentity`]: opaque signing capability injected into nodes

pub mod error;
pub mod identity;
pub mod object;

pub use error::TypeError;
pub use identity::PublisherIdentity;
pub use object::{ContentRef, MULTIHASH_SHA2_256, SHA2_256_LEN};

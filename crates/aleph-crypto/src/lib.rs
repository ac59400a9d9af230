//! Cryptographic primitives for aleph nodes.
//!
//! Provides sha2-256 multihash content addressing and an Ed25519
//! [`PublisherIdentity`](aleph_types::PublisherIdentity) implementation.
//!
//! All crypto operations wrap established libraries; no custom cryptography.

pub mod hasher;
pub mod signer;

pub use hasher::{ContentHasher, HasherError};
pub use signer::{PublisherKey, PublisherPublicKey, SignatureError};

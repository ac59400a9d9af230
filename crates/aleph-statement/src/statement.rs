use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};

use aleph_crypto::PublisherPublicKey;
use aleph_types::{ContentRef, PublisherIdentity};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{StatementError, StatementResult};

/// A statement whose object is still the embedded record body.
#[derive(Clone, Debug, PartialEq)]
pub struct PartialStatement {
    object: Value,
    pub refs: Vec<String>,
    pub tags: BTreeSet<String>,
}

impl PartialStatement {
    pub fn new(object: Value, refs: Vec<String>, tags: BTreeSet<String>) -> Self {
        Self { object, refs, tags }
    }

    /// The embedded body.
    pub fn body(&self) -> &Value {
        &self.object
    }

    /// Replace the embedded body with its stored reference.
    pub fn into_simple(self, object: ContentRef) -> SimpleStatement {
        SimpleStatement {
            object,
            refs: self.refs,
            tags: self.tags,
        }
    }
}

/// A statement ready for publication: object, refs, and tags.
///
/// Publisher, namespace, and sequence are assigned by the node that signs it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleStatement {
    pub object: ContentRef,
    pub refs: Vec<String>,
    pub tags: BTreeSet<String>,
}

/// A signed statement as recorded in a namespace.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementRecord {
    pub id: String,
    pub namespace: String,
    pub publisher: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub sequence: u64,
    pub object: ContentRef,
    pub refs: Vec<String>,
    pub tags: BTreeSet<String>,
    pub signature: Vec<u8>,
}

#[derive(Serialize)]
struct SigningView<'a> {
    id: &'a str,
    namespace: &'a str,
    publisher: &'a str,
    timestamp: i64,
    sequence: u64,
    object: &'a ContentRef,
    refs: &'a [String],
    tags: &'a BTreeSet<String>,
}

impl StatementRecord {
    /// Build and sign a record stamped with the current time.
    pub fn build(
        identity: &dyn PublisherIdentity,
        namespace: &str,
        statement: SimpleStatement,
        sequence: u64,
    ) -> StatementResult<Self> {
        let timestamp = chrono::Utc::now().timestamp_millis();
        Self::build_at(identity, namespace, statement, sequence, timestamp)
    }

    /// Build and sign a record with an explicit timestamp.
    pub fn build_at(
        identity: &dyn PublisherIdentity,
        namespace: &str,
        statement: SimpleStatement,
        sequence: u64,
        timestamp: i64,
    ) -> StatementResult<Self> {
        if namespace.trim().is_empty() {
            return Err(StatementError::InvalidNamespace(namespace.to_string()));
        }
        if statement.refs.is_empty() {
            return Err(StatementError::EmptyRefs);
        }

        let publisher = identity.public_id();
        let mut record = Self {
            id: format!("{publisher}:{timestamp}:{sequence}"),
            namespace: namespace.to_string(),
            publisher,
            timestamp,
            sequence,
            object: statement.object,
            refs: statement.refs,
            tags: statement.tags,
            signature: Vec::new(),
        };
        record.signature = identity.sign(&record.signing_bytes()?);
        Ok(record)
    }

    /// Canonical bytes covered by the signature (everything but the signature).
    pub fn signing_bytes(&self) -> StatementResult<Vec<u8>> {
        let view = SigningView {
            id: &self.id,
            namespace: &self.namespace,
            publisher: &self.publisher,
            timestamp: self.timestamp,
            sequence: self.sequence,
            object: &self.object,
            refs: &self.refs,
            tags: &self.tags,
        };
        serde_json::to_vec(&view).map_err(|e| StatementError::Serialization(e.to_string()))
    }

    /// Check the signature against the publisher's Ed25519 public id.
    pub fn verify(&self) -> StatementResult<()> {
        let invalid = || StatementError::InvalidSignature {
            id: self.id.clone(),
        };
        let key = PublisherPublicKey::from_public_id(&self.publisher).map_err(|_| invalid())?;
        key.verify(&self.signing_bytes()?, &self.signature)
            .map_err(|_| invalid())
    }

    /// The simple statement this record was built from.
    pub fn to_simple(&self) -> SimpleStatement {
        SimpleStatement {
            object: self.object.clone(),
            refs: self.refs.clone(),
            tags: self.tags.clone(),
        }
    }
}

/// Monotonic sequence numbers for statements signed by one node.
#[derive(Debug, Default)]
pub struct SequenceCounter(AtomicU64);

impl SequenceCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start after `last`, e.g. when resuming.
    pub fn starting_after(last: u64) -> Self {
        Self(AtomicU64::new(last + 1))
    }

    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst)
    }
}

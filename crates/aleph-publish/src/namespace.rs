use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use aleph_crypto::ContentHasher;
use aleph_protocol::{PushClient, PushRequest, PushResult};
use aleph_statement::{SequenceCounter, SimpleStatement, StatementLog, StatementRecord};
use aleph_store::{Datastore, StoreError};
use aleph_types::{ContentRef, PublisherIdentity};
use async_trait::async_trait;
use serde_json::Value;

use crate::error::{PublishError, PublishResult};

/// Endpoint that stores bodies and publishes statements into namespaces.
///
/// Both calls are positional: `put_data` returns one reference per body and
/// `publish` one statement id per statement, in input order. Callers check
/// the lengths.
#[async_trait]
pub trait NamespaceClient: Send + Sync {
    async fn put_data(&self, bodies: &[Value]) -> PublishResult<Vec<ContentRef>>;

    async fn publish(
        &self,
        namespace: &str,
        statements: Vec<SimpleStatement>,
    ) -> PublishResult<Vec<String>>;
}

fn sign_all(
    identity: &dyn PublisherIdentity,
    sequence: &SequenceCounter,
    namespace: &str,
    statements: Vec<SimpleStatement>,
) -> PublishResult<Vec<StatementRecord>> {
    statements
        .into_iter()
        .map(|stmt| {
            StatementRecord::build(identity, namespace, stmt, sequence.next()).map_err(Into::into)
        })
        .collect()
}

/// Publishes into this node's own store and statement log.
pub struct LocalNamespace {
    store: Datastore,
    log: Arc<StatementLog>,
    identity: Arc<dyn PublisherIdentity>,
    sequence: Arc<SequenceCounter>,
}

impl LocalNamespace {
    pub fn new(
        store: Datastore,
        log: Arc<StatementLog>,
        identity: Arc<dyn PublisherIdentity>,
        sequence: Arc<SequenceCounter>,
    ) -> Self {
        Self {
            store,
            log,
            identity,
            sequence,
        }
    }
}

#[async_trait]
impl NamespaceClient for LocalNamespace {
    async fn put_data(&self, bodies: &[Value]) -> PublishResult<Vec<ContentRef>> {
        Ok(self.store.put_many(bodies).await?)
    }

    async fn publish(
        &self,
        namespace: &str,
        statements: Vec<SimpleStatement>,
    ) -> PublishResult<Vec<String>> {
        let records = sign_all(self.identity.as_ref(), &self.sequence, namespace, statements)?;
        let ids = records.iter().map(|r| r.id.clone()).collect();
        let recorded = self.log.record(records)?;
        tracing::debug!(namespace, recorded, "published locally");
        Ok(ids)
    }
}

/// Publishes to a remote node through the push protocol.
///
/// `put_data` only hashes and holds the bodies; nothing is written locally.
/// `publish` signs the statements and pushes them with their bodies in one
/// request, then lets go of those bodies whether or not the push succeeded.
/// Memory therefore tracks the batches in flight, not the whole run.
pub struct PeerNamespace {
    client: PushClient,
    identity: Arc<dyn PublisherIdentity>,
    sequence: Arc<SequenceCounter>,
    peer: String,
    staged: Mutex<HashMap<ContentRef, Staged>>,
}

// A body held for the batches that reference it.
struct Staged {
    bytes: Vec<u8>,
    holds: usize,
}

impl PeerNamespace {
    pub fn new(
        identity: Arc<dyn PublisherIdentity>,
        sequence: Arc<SequenceCounter>,
        peer: impl Into<String>,
    ) -> Self {
        let client = PushClient::new(identity.public_id());
        Self {
            client,
            identity,
            sequence,
            peer: peer.into(),
            staged: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_max_frame_size(mut self, max: usize) -> Self {
        self.client = self.client.with_max_frame_size(max);
        self
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Number of distinct bodies currently held for unpublished batches.
    pub fn staged_len(&self) -> PublishResult<usize> {
        Ok(self.staged.lock().map_err(poisoned)?.len())
    }

    fn take_bodies(&self, records: &[StatementRecord]) -> PublishResult<Vec<Vec<u8>>> {
        let staged = self.staged.lock().map_err(poisoned)?;
        records
            .iter()
            .map(|r| {
                staged.get(&r.object).map(|s| s.bytes.clone()).ok_or_else(|| {
                    PublishError::Client(format!("object {} was never stored", r.object))
                })
            })
            .collect()
    }

    fn release(&self, objects: &[ContentRef]) -> PublishResult<()> {
        let mut staged = self.staged.lock().map_err(poisoned)?;
        for object in objects {
            if let Some(entry) = staged.get_mut(object) {
                entry.holds -= 1;
                if entry.holds == 0 {
                    staged.remove(object);
                }
            }
        }
        Ok(())
    }

    async fn push_signed(
        &self,
        namespace: &str,
        statements: Vec<SimpleStatement>,
    ) -> PublishResult<(Vec<String>, PushResult)> {
        let records = sign_all(self.identity.as_ref(), &self.sequence, namespace, statements)?;
        let bodies = self.take_bodies(&records)?;
        let ids = records.iter().map(|r| r.id.clone()).collect();
        let request = PushRequest {
            namespace: namespace.to_string(),
            statements: records,
            bodies,
        };
        let result = self.client.push(&self.peer, request).await?;
        Ok((ids, result))
    }
}

fn poisoned<T>(e: std::sync::PoisonError<T>) -> PublishError {
    PublishError::Client(format!("staging lock poisoned: {e}"))
}

#[async_trait]
impl NamespaceClient for PeerNamespace {
    async fn put_data(&self, bodies: &[Value]) -> PublishResult<Vec<ContentRef>> {
        let mut encoded = Vec::with_capacity(bodies.len());
        for body in bodies {
            let bytes = ContentHasher::canonical_bytes(body)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            encoded.push((ContentHasher::hash(&bytes), bytes));
        }

        let mut staged = self.staged.lock().map_err(poisoned)?;
        let refs = encoded
            .into_iter()
            .map(|(key, bytes)| {
                staged
                    .entry(key.clone())
                    .and_modify(|s| s.holds += 1)
                    .or_insert(Staged { bytes, holds: 1 });
                key
            })
            .collect();
        Ok(refs)
    }

    async fn publish(
        &self,
        namespace: &str,
        statements: Vec<SimpleStatement>,
    ) -> PublishResult<Vec<String>> {
        let objects: Vec<ContentRef> = statements.iter().map(|s| s.object.clone()).collect();
        let pushed = self.push_signed(namespace, statements).await;
        self.release(&objects)?;
        let (ids, result) = pushed?;

        let recorded = usize::try_from(result.statements_recorded).unwrap_or(usize::MAX);
        if recorded < ids.len() {
            // Short list; the publisher reports it as a publish-phase mismatch.
            tracing::warn!(
                peer = %self.peer,
                recorded,
                error = ?result.error,
                "peer recorded fewer statements"
            );
            return Ok(ids.into_iter().take(recorded).collect());
        }
        if let Some(error) = result.error {
            return Err(PublishError::Client(format!("peer {}: {error}", self.peer)));
        }
        Ok(ids)
    }
}

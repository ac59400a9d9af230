use std::collections::BTreeSet;
use std::sync::Arc;

use aleph_statement::{IdExtractor, SimpleStatement};
use aleph_types::ContentRef;
use serde_json::Value;
use tokio::io::AsyncBufRead;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::batch::{Batch, Batcher, DEFAULT_BATCH_SIZE};
use crate::error::{Phase, PublishError, PublishResult};
use crate::namespace::NamespaceClient;
use crate::records::RecordStream;

/// Settings for one publish run.
#[derive(Clone, Debug)]
pub struct PublishOptions {
    pub namespace: String,
    pub batch_size: usize,
    /// Extract refs and tags only; nothing is stored or published.
    pub dry_run: bool,
}

impl PublishOptions {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            dry_run: false,
        }
    }
}

/// Progress reported while a run is in flight.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PublishEvent {
    Published {
        statement_id: String,
        body_hash: ContentRef,
        refs: Vec<String>,
    },
    DryRun {
        refs: Vec<String>,
        tags: BTreeSet<String>,
    },
    /// `batch` is `None` when the failure cannot be tied to a batch, such as
    /// a batch task that panicked.
    BatchFailed {
        batch: Option<usize>,
        error: String,
    },
}

/// Totals for a finished run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PublishSummary {
    pub records: usize,
    pub batches: usize,
    pub published: usize,
    pub failed_batches: usize,
}

impl PublishSummary {
    pub fn is_success(&self) -> bool {
        self.failed_batches == 0
    }
}

/// Two-phase batched publisher.
///
/// Records are read lazily, turned into partial statements, and folded into
/// batches. Each sealed batch is dispatched on its own task without waiting
/// for earlier ones; there is no cap on batches in flight. A batch first
/// stores its bodies (phase 1), then publishes statements that reference the
/// stored bodies (phase 2). A failed batch is reported on its own and does
/// not stop the others.
pub struct BatchPublisher {
    client: Arc<dyn NamespaceClient>,
    extractor: IdExtractor,
    options: PublishOptions,
    events: mpsc::UnboundedSender<PublishEvent>,
}

impl BatchPublisher {
    /// Returns the publisher and the receiving end of its event stream.
    ///
    /// The stream closes once [`run`](Self::run) has returned.
    pub fn new(
        client: Arc<dyn NamespaceClient>,
        extractor: IdExtractor,
        options: PublishOptions,
    ) -> (Self, mpsc::UnboundedReceiver<PublishEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let publisher = Self {
            client,
            extractor,
            options,
            events,
        };
        (publisher, rx)
    }

    /// Publish every record in `records`.
    ///
    /// Resolves after every dispatched batch has settled. If reading or id
    /// extraction fails, no further batches are dispatched, the ones already
    /// in flight are awaited, and the error is returned.
    pub async fn run<R>(self, mut records: RecordStream<R>) -> PublishResult<PublishSummary>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut tasks = JoinSet::new();
        let mut summary = PublishSummary::default();

        let ingested = self.ingest(&mut records, &mut tasks, &mut summary).await;
        if let Err(e) = &ingested {
            tracing::warn!(error = %e, in_flight = tasks.len(), "ingestion stopped");
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(published)) => summary.published += published,
                Ok(Err(_)) => summary.failed_batches += 1,
                Err(e) => {
                    summary.failed_batches += 1;
                    let _ = self.events.send(PublishEvent::BatchFailed {
                        batch: None,
                        error: PublishError::Task(e.to_string()).to_string(),
                    });
                }
            }
        }

        ingested?;
        tracing::info!(
            records = summary.records,
            batches = summary.batches,
            published = summary.published,
            failed = summary.failed_batches,
            "publish run finished"
        );
        Ok(summary)
    }

    async fn ingest<R>(
        &self,
        records: &mut RecordStream<R>,
        tasks: &mut JoinSet<PublishResult<usize>>,
        summary: &mut PublishSummary,
    ) -> PublishResult<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut batcher = Batcher::new(self.options.batch_size);
        while let Some(record) = records.next_record().await? {
            let partial = self.extractor.extract(record)?;
            summary.records += 1;
            if self.options.dry_run {
                let _ = self.events.send(PublishEvent::DryRun {
                    refs: partial.refs,
                    tags: partial.tags,
                });
                continue;
            }
            if let Some(batch) = batcher.push(partial) {
                self.dispatch(tasks, batch);
                summary.batches += 1;
            }
        }
        if let Some(batch) = batcher.finish() {
            self.dispatch(tasks, batch);
            summary.batches += 1;
        }
        Ok(())
    }

    fn dispatch(&self, tasks: &mut JoinSet<PublishResult<usize>>, batch: Batch) {
        let client = Arc::clone(&self.client);
        let namespace = self.options.namespace.clone();
        let events = self.events.clone();
        let index = batch.index();
        tracing::debug!(batch = index, size = batch.len(), "dispatching batch");

        tasks.spawn(async move {
            let result = publish_batch(client.as_ref(), &namespace, batch, &events).await;
            match &result {
                Ok(n) => tracing::info!(batch = index, published = n, "batch published"),
                Err(e) => {
                    tracing::warn!(batch = index, error = %e, "batch failed");
                    let _ = events.send(PublishEvent::BatchFailed {
                        batch: Some(index),
                        error: e.to_string(),
                    });
                }
            }
            result
        });
    }
}

async fn publish_batch(
    client: &dyn NamespaceClient,
    namespace: &str,
    batch: Batch,
    events: &mpsc::UnboundedSender<PublishEvent>,
) -> PublishResult<usize> {
    let expected = batch.len();
    let bodies: Vec<Value> = batch.statements().iter().map(|s| s.body().clone()).collect();

    let digests = client.put_data(&bodies).await?;
    if digests.len() != expected {
        return Err(PublishError::BatchCountMismatch {
            phase: Phase::Store,
            expected,
            actual: digests.len(),
        });
    }
    tracing::debug!(batch = batch.index(), "bodies stored");

    let statements: Vec<SimpleStatement> = batch
        .into_statements()
        .into_iter()
        .zip(digests.iter().cloned())
        .map(|(partial, object)| partial.into_simple(object))
        .collect();
    let refs: Vec<Vec<String>> = statements.iter().map(|s| s.refs.clone()).collect();

    let ids = client.publish(namespace, statements).await?;
    if ids.len() != expected {
        return Err(PublishError::BatchCountMismatch {
            phase: Phase::Publish,
            expected,
            actual: ids.len(),
        });
    }

    for ((statement_id, body_hash), refs) in ids.into_iter().zip(digests).zip(refs) {
        let _ = events.send(PublishEvent::Published {
            statement_id,
            body_hash,
            refs,
        });
    }
    Ok(expected)
}

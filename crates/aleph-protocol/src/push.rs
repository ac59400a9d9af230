use std::sync::Arc;

use aleph_statement::{StatementLog, StatementRecord};
use aleph_store::Datastore;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::auth::{Authorization, PushAuthorizer};
use crate::codec::{read_message, write_message};
use crate::error::{PushCallResult, PushError};
use crate::message::{error_codes, AlephMessage, PushRequest, PushResult, MAX_MESSAGE_SIZE};

/// Initiator side of a push exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PushState {
    Idle,
    StreamOpened,
    AwaitingAuthorization,
    Rejected,
    Authorized,
    SendingPayload,
    AwaitingResult,
    Completed,
    Failed,
}

impl PushState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Completed | Self::Failed)
    }
}

/// One push exchange over an open stream, driven from the initiator side.
pub struct PushExchange<S> {
    stream: S,
    state: PushState,
    max_frame_size: usize,
}

impl<S> PushExchange<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, max_frame_size: usize) -> Self {
        Self {
            stream,
            state: PushState::Idle,
            max_frame_size,
        }
    }

    pub fn state(&self) -> PushState {
        self.state
    }

    fn transition(&mut self, next: PushState) {
        tracing::debug!(from = ?self.state, to = ?next, "push state");
        self.state = next;
    }

    /// Run the exchange to completion.
    ///
    /// Leaves the exchange in `Rejected`, `Completed`, or `Failed`.
    pub async fn run(&mut self, requester: &str, request: PushRequest) -> PushCallResult<PushResult> {
        let outcome = self.drive(requester, request).await;
        match &outcome {
            Ok(_) => self.transition(PushState::Completed),
            Err(PushError::Rejected(_)) => self.transition(PushState::Rejected),
            Err(_) => self.transition(PushState::Failed),
        }
        outcome
    }

    async fn drive(&mut self, requester: &str, request: PushRequest) -> PushCallResult<PushResult> {
        self.transition(PushState::StreamOpened);
        let open = AlephMessage::PushOpen {
            requester: requester.to_string(),
            namespace: request.namespace.clone(),
        };
        write_message(&mut self.stream, &open, self.max_frame_size).await?;

        self.transition(PushState::AwaitingAuthorization);
        match self.next_message("authorization").await? {
            AlephMessage::Accept => self.transition(PushState::Authorized),
            AlephMessage::Reject { error } => return Err(PushError::Rejected(error)),
            other => return Err(unexpected(&other, "authorization")),
        }

        self.transition(PushState::SendingPayload);
        let payload = AlephMessage::PushRequest(request);
        write_message(&mut self.stream, &payload, self.max_frame_size).await?;

        self.transition(PushState::AwaitingResult);
        match self.next_message("push result").await? {
            AlephMessage::PushResult(result) => Ok(result),
            other => Err(unexpected(&other, "push result")),
        }
    }

    async fn next_message(&mut self, waiting_for: &str) -> PushCallResult<AlephMessage> {
        read_message(&mut self.stream, self.max_frame_size)
            .await?
            .ok_or_else(|| {
                PushError::Transport(format!("connection closed while waiting for {waiting_for}"))
            })
    }
}

fn unexpected(msg: &AlephMessage, waiting_for: &str) -> PushError {
    match msg {
        AlephMessage::Error { code, message } => {
            PushError::Transport(format!("peer error {code}: {message}"))
        }
        other => PushError::Transport(format!(
            "unexpected {} while waiting for {waiting_for}",
            other.type_name()
        )),
    }
}

impl PushRequest {
    /// Build a request for `statements`, reading one body per statement from
    /// `store` in statement order, even when objects repeat.
    pub async fn from_store(
        store: &Datastore,
        namespace: &str,
        statements: Vec<StatementRecord>,
    ) -> PushCallResult<Self> {
        let mut bodies = Vec::with_capacity(statements.len());
        for stmt in &statements {
            bodies.push(store.get_raw(&stmt.object).await?.to_vec());
        }
        Ok(Self {
            namespace: namespace.to_string(),
            statements,
            bodies,
        })
    }

    fn check(&self) -> PushCallResult<()> {
        if self.statements.is_empty() {
            return Err(PushError::InvalidBatch("no statements to push".into()));
        }
        if let Some(stray) = self.statements.iter().find(|s| s.namespace != self.namespace) {
            return Err(PushError::InvalidBatch(format!(
                "statement {} belongs to namespace {}, not {}",
                stray.id, stray.namespace, self.namespace
            )));
        }
        if self.bodies.len() != self.statements.len() {
            return Err(PushError::InvalidBatch(format!(
                "{} bodies for {} statements",
                self.bodies.len(),
                self.statements.len()
            )));
        }
        Ok(())
    }
}

/// Pushes statements, with the bodies they reference, to peers.
#[derive(Clone, Debug)]
pub struct PushClient {
    requester: String,
    max_frame_size: usize,
}

impl PushClient {
    pub fn new(requester: impl Into<String>) -> Self {
        Self {
            requester: requester.into(),
            max_frame_size: MAX_MESSAGE_SIZE,
        }
    }

    pub fn with_max_frame_size(mut self, max: usize) -> Self {
        self.max_frame_size = max;
        self
    }

    /// Connect to `addr` and push one batch.
    pub async fn push(&self, addr: &str, request: PushRequest) -> PushCallResult<PushResult> {
        request.check()?;
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| PushError::Transport(format!("connect {addr}: {e}")))?;
        self.push_over(stream, request).await
    }

    /// Push one batch over an already open stream.
    ///
    /// The batch must be non-empty, within one namespace, and carry one body
    /// per statement.
    pub async fn push_over<S>(&self, stream: S, request: PushRequest) -> PushCallResult<PushResult>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        request.check()?;
        tracing::debug!(
            namespace = %request.namespace,
            statements = request.statements.len(),
            "pushing batch"
        );
        let mut exchange = PushExchange::new(stream, self.max_frame_size);
        exchange.run(&self.requester, request).await
    }
}

/// How a responder-side exchange ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PushOutcome {
    Rejected { reason: String },
    Completed(PushResult),
    /// The peer only pinged.
    Pinged { nonce: u64 },
}

/// Responder side: authorizes pushes, stores bodies, and records statements.
pub struct PushResponder {
    store: Datastore,
    log: Arc<StatementLog>,
    authorizer: Arc<dyn PushAuthorizer>,
    max_frame_size: usize,
}

impl PushResponder {
    pub fn new(store: Datastore, log: Arc<StatementLog>, authorizer: Arc<dyn PushAuthorizer>) -> Self {
        Self {
            store,
            log,
            authorizer,
            max_frame_size: MAX_MESSAGE_SIZE,
        }
    }

    pub fn with_max_frame_size(mut self, max: usize) -> Self {
        self.max_frame_size = max;
        self
    }

    /// Accept connections forever, handling each exchange on its own task.
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> std::io::Result<()> {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!(%addr, "push responder listening");
        }
        loop {
            let (stream, peer) = listener.accept().await?;
            let responder = Arc::clone(&self);
            tokio::spawn(async move {
                match responder.handle(stream).await {
                    Ok(outcome) => tracing::debug!(%peer, ?outcome, "push exchange finished"),
                    Err(e) => tracing::warn!(%peer, error = %e, "push exchange failed"),
                }
            });
        }
    }

    /// Handle one exchange on `stream`.
    pub async fn handle<S>(&self, mut stream: S) -> PushCallResult<PushOutcome>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let (requester, namespace) = match self.read(&mut stream, "PushOpen").await? {
            AlephMessage::PushOpen { requester, namespace } => (requester, namespace),
            AlephMessage::Ping { nonce } => {
                write_message(&mut stream, &AlephMessage::Pong { nonce }, self.max_frame_size).await?;
                stream.shutdown().await?;
                return Ok(PushOutcome::Pinged { nonce });
            }
            other => return Err(self.refuse(&mut stream, &other, "PushOpen").await),
        };

        if let Authorization::Deny { reason } = self.authorizer.authorize(&requester, &namespace).await {
            tracing::info!(%requester, %namespace, %reason, "push rejected");
            let reject = AlephMessage::Reject { error: reason.clone() };
            write_message(&mut stream, &reject, self.max_frame_size).await?;
            stream.shutdown().await?;
            return Ok(PushOutcome::Rejected { reason });
        }
        write_message(&mut stream, &AlephMessage::Accept, self.max_frame_size).await?;

        let request = match self.read(&mut stream, "PushRequest").await? {
            AlephMessage::PushRequest(request) => request,
            other => return Err(self.refuse(&mut stream, &other, "PushRequest").await),
        };

        let result = match self.ingest(&namespace, request).await {
            Ok(result) => result,
            Err(e) => {
                let error = AlephMessage::Error {
                    code: error_codes::INTERNAL,
                    message: e.to_string(),
                };
                let _ = write_message(&mut stream, &error, self.max_frame_size).await;
                return Err(e);
            }
        };
        write_message(&mut stream, &AlephMessage::PushResult(result.clone()), self.max_frame_size).await?;
        stream.shutdown().await?;
        Ok(PushOutcome::Completed(result))
    }

    async fn read<S>(&self, stream: &mut S, waiting_for: &str) -> PushCallResult<AlephMessage>
    where
        S: AsyncRead + Unpin,
    {
        read_message(stream, self.max_frame_size)
            .await?
            .ok_or_else(|| {
                PushError::Transport(format!("connection closed while waiting for {waiting_for}"))
            })
    }

    async fn refuse<S>(&self, stream: &mut S, got: &AlephMessage, waiting_for: &str) -> PushError
    where
        S: AsyncWrite + Unpin,
    {
        let message = format!("expected {waiting_for}, got {}", got.type_name());
        let error = AlephMessage::Error {
            code: error_codes::UNEXPECTED_MESSAGE,
            message: message.clone(),
        };
        let _ = write_message(stream, &error, self.max_frame_size).await;
        PushError::Transport(message)
    }

    /// Store bodies, then record every statement that checks out.
    async fn ingest(&self, namespace: &str, request: PushRequest) -> PushCallResult<PushResult> {
        if request.namespace != namespace {
            return Ok(PushResult {
                error: Some(format!(
                    "push request for namespace {} on a stream opened for {namespace}",
                    request.namespace
                )),
                ..PushResult::default()
            });
        }

        let mut objects_stored = 0u64;
        for body in request.bodies {
            self.store.put(body).await?;
            objects_stored += 1;
        }

        let statement_count = request.statements.len();
        let mut accepted = Vec::with_capacity(statement_count);
        for stmt in request.statements {
            if let Some(reason) = self.check(namespace, &stmt).await? {
                tracing::warn!(id = %stmt.id, %reason, "statement not recorded");
                continue;
            }
            accepted.push(stmt);
        }
        let statements_recorded = accepted.len() as u64;
        let new = self.log.record(accepted)?;
        tracing::info!(
            namespace,
            objects_stored,
            statements_recorded,
            new,
            "push ingested"
        );

        // Every statement carries its own body, so both counts must match the batch.
        let error = (objects_stored != statement_count as u64
            || statements_recorded != statement_count as u64)
            .then(|| {
                format!(
                    "stored {objects_stored} of {statement_count} objects, \
                     recorded {statements_recorded} of {statement_count} statements"
                )
            });
        Ok(PushResult {
            objects_stored,
            statements_recorded,
            error,
        })
    }

    async fn check(&self, namespace: &str, stmt: &StatementRecord) -> PushCallResult<Option<String>> {
        if stmt.namespace != namespace {
            return Ok(Some(format!("namespace {} does not match {namespace}", stmt.namespace)));
        }
        if !self.store.contains(&stmt.object).await? {
            return Ok(Some(format!("object {} was not sent", stmt.object)));
        }
        if let Err(e) = stmt.verify() {
            return Ok(Some(e.to_string()));
        }
        Ok(None)
    }
}

impl std::fmt::Debug for PushResponder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushResponder")
            .field("max_frame_size", &self.max_frame_size)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AllowAll, NamespaceAllowList};
    use aleph_crypto::PublisherKey;
    use aleph_statement::SimpleStatement;
    use aleph_types::PublisherIdentity;
    use serde_json::json;
    use std::collections::BTreeSet;

    const NS: &str = "scratch.push-test";

    async fn request(store: &Datastore, statements: Vec<StatementRecord>) -> PushRequest {
        PushRequest::from_store(store, NS, statements).await.unwrap()
    }

    async fn seed(store: &Datastore, key: &PublisherKey, n: usize) -> Vec<StatementRecord> {
        let mut out = Vec::new();
        for i in 0..n {
            let object = store.put(json!({"id": i, "foo": "bar"})).await.unwrap();
            let stmt = SimpleStatement {
                object,
                refs: vec![format!("push-test:{i}")],
                tags: BTreeSet::new(),
            };
            out.push(StatementRecord::build(key, NS, stmt, i as u64).unwrap());
        }
        out
    }

    fn responder(authorizer: Arc<dyn PushAuthorizer>) -> (PushResponder, Datastore, Arc<StatementLog>) {
        let store = Datastore::in_memory();
        let log = Arc::new(StatementLog::new());
        let r = PushResponder::new(store.clone(), Arc::clone(&log), authorizer);
        (r, store, log)
    }

    // Scripted peer that answers PushOpen with `reply`, then the PushRequest with `result`.
    async fn mock_peer<S>(mut stream: S, reply: AlephMessage, result: Option<PushResult>)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let open = read_message(&mut stream, MAX_MESSAGE_SIZE).await.unwrap();
        assert!(matches!(open, Some(AlephMessage::PushOpen { .. })));
        write_message(&mut stream, &reply, MAX_MESSAGE_SIZE).await.unwrap();
        if let Some(result) = result {
            let req = read_message(&mut stream, MAX_MESSAGE_SIZE).await.unwrap();
            assert!(matches!(req, Some(AlephMessage::PushRequest(_))));
            write_message(&mut stream, &AlephMessage::PushResult(result), MAX_MESSAGE_SIZE)
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn rejection_surfaces_verbatim() {
        let key = PublisherKey::generate();
        let store = Datastore::in_memory();
        let statements = seed(&store, &key, 2).await;
        let client = PushClient::new(key.public_id());

        let (a, b) = tokio::io::duplex(64 * 1024);
        let peer = tokio::spawn(mock_peer(
            b,
            AlephMessage::Reject { error: "not authorized".into() },
            None,
        ));
        let err = client.push_over(a, request(&store, statements).await).await.unwrap_err();
        peer.await.unwrap();
        assert!(matches!(&err, PushError::Rejected(m) if m == "not authorized"));
        assert_eq!(err.to_string(), "not authorized");
    }

    #[tokio::test]
    async fn accepted_push_returns_peer_result() {
        let key = PublisherKey::generate();
        let store = Datastore::in_memory();
        let statements = seed(&store, &key, 2).await;
        let client = PushClient::new(key.public_id());
        let expected = PushResult { objects_stored: 2, statements_recorded: 2, error: None };

        let (a, b) = tokio::io::duplex(64 * 1024);
        let peer = tokio::spawn(mock_peer(b, AlephMessage::Accept, Some(expected.clone())));
        let result = client.push_over(a, request(&store, statements).await).await.unwrap();
        peer.await.unwrap();
        assert_eq!(result, expected);
    }

    #[tokio::test]
    async fn exchange_states_end_terminal() {
        let (a, b) = tokio::io::duplex(64 * 1024);
        let peer = tokio::spawn(mock_peer(b, AlephMessage::Reject { error: "no".into() }, None));
        let mut exchange = PushExchange::new(a, MAX_MESSAGE_SIZE);
        assert_eq!(exchange.state(), PushState::Idle);
        let request = PushRequest { namespace: NS.into(), statements: vec![], bodies: vec![] };
        assert!(exchange.run("me", request).await.is_err());
        peer.await.unwrap();
        assert_eq!(exchange.state(), PushState::Rejected);
        assert!(exchange.state().is_terminal());
    }

    #[tokio::test]
    async fn dropped_connection_is_transport_error() {
        let key = PublisherKey::generate();
        let store = Datastore::in_memory();
        let statements = seed(&store, &key, 1).await;
        let client = PushClient::new(key.public_id());

        let (a, mut b) = tokio::io::duplex(64 * 1024);
        let peer = tokio::spawn(async move {
            let _ = read_message(&mut b, MAX_MESSAGE_SIZE).await;
            drop(b);
        });
        let err = client.push_over(a, request(&store, statements).await).await.unwrap_err();
        peer.await.unwrap();
        assert!(matches!(err, PushError::Transport(_)), "{err}");
    }

    #[tokio::test]
    async fn unexpected_reply_is_transport_error() {
        let key = PublisherKey::generate();
        let store = Datastore::in_memory();
        let statements = seed(&store, &key, 1).await;
        let client = PushClient::new(key.public_id());

        let (a, b) = tokio::io::duplex(64 * 1024);
        let peer = tokio::spawn(mock_peer(b, AlephMessage::PushResult(PushResult::default()), None));
        let err = client.push_over(a, request(&store, statements).await).await.unwrap_err();
        peer.await.unwrap();
        assert!(matches!(err, PushError::Transport(_)));
    }

    #[tokio::test]
    async fn invalid_batches_never_connect() {
        let key = PublisherKey::generate();
        let store = Datastore::in_memory();
        let statements = seed(&store, &key, 1).await;
        let client = PushClient::new(key.public_id());

        let (a, _b) = tokio::io::duplex(1024);
        let empty = PushRequest { namespace: NS.into(), statements: vec![], bodies: vec![] };
        let err = client.push_over(a, empty).await.unwrap_err();
        assert!(matches!(err, PushError::InvalidBatch(_)));

        let (a, _b) = tokio::io::duplex(1024);
        let stray = PushRequest::from_store(&store, "other.ns", statements.clone()).await.unwrap();
        let err = client.push_over(a, stray).await.unwrap_err();
        assert!(matches!(err, PushError::InvalidBatch(_)));

        let (a, _b) = tokio::io::duplex(1024);
        let mut short = request(&store, statements).await;
        short.bodies.clear();
        let err = client.push_over(a, short).await.unwrap_err();
        assert!(matches!(err, PushError::InvalidBatch(_)));
    }

    #[tokio::test]
    async fn responder_records_accepted_push() {
        let key = PublisherKey::generate();
        let local = Datastore::in_memory();
        let statements = seed(&local, &key, 3).await;
        let client = PushClient::new(key.public_id());
        let (responder, remote_store, log) = responder(Arc::new(AllowAll));

        let (a, b) = tokio::io::duplex(64 * 1024);
        let server = tokio::spawn(async move { responder.handle(b).await });
        let result = client.push_over(a, request(&local, statements.clone()).await).await.unwrap();
        let outcome = server.await.unwrap().unwrap();

        let expected = PushResult { objects_stored: 3, statements_recorded: 3, error: None };
        assert_eq!(result, expected);
        assert_eq!(outcome, PushOutcome::Completed(expected));
        assert_eq!(remote_store.len().await.unwrap(), 3);
        assert_eq!(log.namespace_len(NS).unwrap(), 3);
        assert_eq!(log.get(&statements[0].id).unwrap(), Some(statements[0].clone()));
    }

    #[tokio::test]
    async fn responder_rejects_unlisted_namespace() {
        let key = PublisherKey::generate();
        let local = Datastore::in_memory();
        let statements = seed(&local, &key, 1).await;
        let client = PushClient::new(key.public_id());
        let (responder, remote_store, log) = responder(Arc::new(NamespaceAllowList::new(["museum"])));

        let (a, b) = tokio::io::duplex(64 * 1024);
        let server = tokio::spawn(async move { responder.handle(b).await });
        let err = client.push_over(a, request(&local, statements).await).await.unwrap_err();
        let outcome = server.await.unwrap().unwrap();

        assert_eq!(err.to_string(), "not authorized");
        assert_eq!(outcome, PushOutcome::Rejected { reason: "not authorized".into() });
        assert!(remote_store.is_empty().await.unwrap());
        assert!(log.is_empty().unwrap());
    }

    #[tokio::test]
    async fn shared_object_sent_once_per_statement() {
        let key = PublisherKey::generate();
        let local = Datastore::in_memory();
        let object = local.put(json!({"same": true})).await.unwrap();
        let statements: Vec<StatementRecord> = (0..2)
            .map(|i| {
                let stmt = SimpleStatement {
                    object: object.clone(),
                    refs: vec![format!("dup:{i}")],
                    tags: BTreeSet::new(),
                };
                StatementRecord::build(&key, NS, stmt, i).unwrap()
            })
            .collect();
        let client = PushClient::new(key.public_id());
        let (responder, remote_store, log) = responder(Arc::new(AllowAll));

        let (a, b) = tokio::io::duplex(64 * 1024);
        let server = tokio::spawn(async move { responder.handle(b).await });
        let result = client.push_over(a, request(&local, statements).await).await.unwrap();
        server.await.unwrap().unwrap();

        assert_eq!(result, PushResult { objects_stored: 2, statements_recorded: 2, error: None });
        assert_eq!(remote_store.len().await.unwrap(), 1);
        assert_eq!(log.len().unwrap(), 2);
    }

    #[tokio::test]
    async fn missing_bodies_reported_as_mismatch() {
        let key = PublisherKey::generate();
        let local = Datastore::in_memory();
        let statements = seed(&local, &key, 2).await;
        let bodies = vec![local.get_raw(&statements[0].object).await.unwrap().to_vec()];
        let (responder, _store, _log) = responder(Arc::new(AllowAll));

        let (a, b) = tokio::io::duplex(64 * 1024);
        let server = tokio::spawn(async move { responder.handle(b).await });
        let request = PushRequest { namespace: NS.into(), statements, bodies };
        let result = PushExchange::new(a, MAX_MESSAGE_SIZE).run("me", request).await.unwrap();
        server.await.unwrap().unwrap();

        assert_eq!(result.objects_stored, 1);
        assert_eq!(result.statements_recorded, 1);
        assert_eq!(
            result.error.as_deref(),
            Some("stored 1 of 2 objects, recorded 1 of 2 statements")
        );
    }

    #[tokio::test]
    async fn tampered_statement_reported_as_mismatch() {
        let key = PublisherKey::generate();
        let local = Datastore::in_memory();
        let mut statements = seed(&local, &key, 2).await;
        statements[1].refs.push("injected".into());
        let client = PushClient::new(key.public_id());
        let (responder, _store, log) = responder(Arc::new(AllowAll));

        let (a, b) = tokio::io::duplex(64 * 1024);
        let server = tokio::spawn(async move { responder.handle(b).await });
        let result = client.push_over(a, request(&local, statements).await).await.unwrap();
        server.await.unwrap().unwrap();

        assert_eq!(result.objects_stored, 2);
        assert_eq!(result.statements_recorded, 1);
        assert!(result.error.unwrap().contains("recorded 1 of 2 statements"));
        assert_eq!(log.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn responder_refuses_out_of_order_messages() {
        let (responder, _store, _log) = responder(Arc::new(AllowAll));
        let (mut a, b) = tokio::io::duplex(64 * 1024);
        let server = tokio::spawn(async move { responder.handle(b).await });
        write_message(&mut a, &AlephMessage::Accept, MAX_MESSAGE_SIZE).await.unwrap();
        let reply = read_message(&mut a, MAX_MESSAGE_SIZE).await.unwrap();
        assert!(matches!(
            reply,
            Some(AlephMessage::Error { code: error_codes::UNEXPECTED_MESSAGE, .. })
        ));
        assert!(matches!(server.await.unwrap(), Err(PushError::Transport(_))));
    }

    #[tokio::test]
    async fn tcp_loopback_push() {
        let key = PublisherKey::generate();
        let local = Datastore::in_memory();
        let statements = seed(&local, &key, 2).await;
        let client = PushClient::new(key.public_id());
        let (responder, _store, log) = responder(Arc::new(AllowAll));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let server = tokio::spawn(Arc::new(responder).serve(listener));

        let result = client.push(&addr, request(&local, statements).await).await.unwrap();
        assert_eq!(result, PushResult { objects_stored: 2, statements_recorded: 2, error: None });
        assert_eq!(log.len().unwrap(), 2);
        server.abort();
    }
}

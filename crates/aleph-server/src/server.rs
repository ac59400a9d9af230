use std::sync::Arc;
use std::time::Duration;

use aleph_crypto::PublisherKey;
use aleph_protocol::PushResponder;
use aleph_statement::{SequenceCounter, StatementLog};
use aleph_store::Datastore;
use aleph_types::PublisherIdentity;
use tokio::net::TcpListener;

use crate::config::NodeConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::AppState;
use crate::router::build_router;

/// A running aleph node: store, statement log, and publisher key.
///
/// Serves the push responder over TCP and the HTTP API with axum.
pub struct AlephNode {
    config: NodeConfig,
    store: Datastore,
    log: Arc<StatementLog>,
    identity: Arc<PublisherKey>,
    sequence: Arc<SequenceCounter>,
}

impl AlephNode {
    pub fn new(config: NodeConfig, store: Datastore, identity: PublisherKey) -> Self {
        Self {
            config,
            store,
            log: Arc::new(StatementLog::new()),
            identity: Arc::new(identity),
            sequence: Arc::new(SequenceCounter::new()),
        }
    }

    /// Open the configured store and load the configured key.
    pub fn from_config(config: NodeConfig) -> ServerResult<Self> {
        let store = Datastore::open(&config.store_options())?;
        let identity = config.load_identity()?;
        Ok(Self::new(config, store, identity))
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn store(&self) -> &Datastore {
        &self.store
    }

    pub fn log(&self) -> Arc<StatementLog> {
        Arc::clone(&self.log)
    }

    pub fn identity(&self) -> Arc<dyn PublisherIdentity> {
        self.identity.clone()
    }

    pub fn sequence(&self) -> Arc<SequenceCounter> {
        Arc::clone(&self.sequence)
    }

    pub fn public_id(&self) -> String {
        self.identity.public_id()
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(AppState {
            store: self.store.clone(),
            log: self.log(),
            publisher_id: self.public_id(),
        })
    }

    pub fn responder(&self) -> PushResponder {
        PushResponder::new(self.store.clone(), self.log(), self.config.authorizer())
            .with_max_frame_size(self.config.max_frame_size)
    }

    /// Ping another node on its push address and return the round-trip time.
    pub async fn ping(&self, addr: &str) -> ServerResult<Duration> {
        let rtt = aleph_protocol::ping(addr, self.config.max_frame_size).await?;
        tracing::info!(peer = addr, ?rtt, "ping");
        Ok(rtt)
    }

    /// Bind the configured addresses and serve until either listener fails.
    pub async fn serve(self) -> ServerResult<()> {
        let push = TcpListener::bind(self.config.push_addr).await?;
        let http = TcpListener::bind(self.config.http_addr).await?;
        self.serve_on(push, http).await
    }

    /// Serve on already bound listeners.
    pub async fn serve_on(self, push: TcpListener, http: TcpListener) -> ServerResult<()> {
        tracing::info!(
            publisher = %self.public_id(),
            push = ?push.local_addr().ok(),
            http = ?http.local_addr().ok(),
            "aleph node starting"
        );
        let responder = Arc::new(self.responder());
        let app = self.router();
        let http_server = async move { axum::serve(http, app).await };

        tokio::select! {
            res = responder.serve(push) => res.map_err(ServerError::Io),
            res = http_server => res.map_err(|e| ServerError::Internal(e.to_string())),
        }
    }
}

use std::sync::Arc;

use aleph_statement::{StatementLog, StatementRecord};
use aleph_store::{Datastore, Fetched, GetOptions};
use aleph_types::ContentRef;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{ServerError, ServerResult};

/// Shared state behind the HTTP routes.
#[derive(Clone)]
pub struct AppState {
    pub store: Datastore,
    pub log: Arc<StatementLog>,
    pub publisher_id: String,
}

/// Health check response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub protocol_version: u32,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            protocol_version: aleph_protocol::PROTOCOL_VERSION,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ObjectQuery {
    #[serde(default)]
    pub raw: bool,
}

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

pub async fn info_handler(State(state): State<AppState>) -> ServerResult<Json<Value>> {
    Ok(Json(json!({
        "name": "aleph-node",
        "version": env!("CARGO_PKG_VERSION"),
        "protocol_version": aleph_protocol::PROTOCOL_VERSION,
        "push_protocol": aleph_protocol::PUSH_PROTOCOL,
        "publisher_id": state.publisher_id,
        "objects": state.store.len().await?,
        "statements": state.log.len()?,
        "namespaces": state.log.namespaces()?,
    })))
}

/// Stored object by key.
///
/// Decoded JSON by default. Bytes that do not decode come back as a JSON
/// string holding their base64 text. `?raw=true` returns the stored bytes.
pub async fn object_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<ObjectQuery>,
) -> ServerResult<Response> {
    let key = ContentRef::from_b58(&key).map_err(|e| ServerError::InvalidKey(e.to_string()))?;
    if query.raw {
        let bytes = state.store.get_raw(&key).await?;
        return Ok(([(header::CONTENT_TYPE, "application/octet-stream")], bytes).into_response());
    }
    let value = match state.store.get(&key, GetOptions::default()).await? {
        Fetched::Structured(value) => value,
        Fetched::Undecodable(text) => Value::String(text),
        Fetched::Raw(bytes) => Value::String(String::from_utf8_lossy(&bytes).into_owned()),
    };
    Ok(Json(value).into_response())
}

pub async fn statement_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServerResult<Json<StatementRecord>> {
    state
        .log
        .get(&id)?
        .map(Json)
        .ok_or(ServerError::StatementNotFound(id))
}

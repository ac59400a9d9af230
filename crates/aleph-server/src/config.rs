use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use aleph_crypto::PublisherKey;
use aleph_protocol::{AllowAll, NamespaceAllowList, PushAuthorizer, MAX_MESSAGE_SIZE};
use aleph_store::{BackendKind, DatastoreOptions};
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

pub const DEFAULT_PUSH_PORT: u16 = 9090;
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Node configuration, usually read from a TOML file.
///
/// Every field has a default, so a partial file is fine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub push_addr: SocketAddr,
    pub http_addr: SocketAddr,
    /// Filesystem store root. In-memory store when unset.
    pub data_dir: Option<PathBuf>,
    /// Namespace prefixes peers may push into. Empty allows every namespace.
    pub allowed_namespaces: Vec<String>,
    /// Hex-encoded Ed25519 secret key. A fresh key is generated when unset.
    pub key_file: Option<PathBuf>,
    pub max_frame_size: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            push_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PUSH_PORT)),
            http_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_HTTP_PORT)),
            data_dir: None,
            allowed_namespaces: Vec::new(),
            key_file: None,
            max_frame_size: MAX_MESSAGE_SIZE,
        }
    }
}

impl NodeConfig {
    pub fn load(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> ServerResult<Self> {
        toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn store_options(&self) -> DatastoreOptions {
        match &self.data_dir {
            Some(dir) => DatastoreOptions {
                backend: BackendKind::Filesystem,
                location: Some(dir.clone()),
            },
            None => DatastoreOptions::default(),
        }
    }

    pub fn authorizer(&self) -> Arc<dyn PushAuthorizer> {
        if self.allowed_namespaces.is_empty() {
            Arc::new(AllowAll)
        } else {
            Arc::new(NamespaceAllowList::new(self.allowed_namespaces.iter().cloned()))
        }
    }

    /// Load the node key from `key_file`, or generate an ephemeral one.
    pub fn load_identity(&self) -> ServerResult<PublisherKey> {
        match &self.key_file {
            Some(path) => read_key(path),
            None => {
                tracing::info!("no key file configured, using an ephemeral publisher key");
                Ok(PublisherKey::generate())
            }
        }
    }
}

/// Read a hex-encoded publisher key.
pub fn read_key(path: &Path) -> ServerResult<PublisherKey> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
    PublisherKey::from_hex(text.trim())
        .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))
}

/// Write a publisher key as hex. Refuses to overwrite an existing file.
pub fn write_key(path: &Path, key: &PublisherKey) -> ServerResult<()> {
    if path.exists() {
        return Err(ServerError::Config(format!(
            "{} already exists",
            path.display()
        )));
    }
    std::fs::write(path, format!("{}\n", key.to_hex()))?;
    Ok(())
}

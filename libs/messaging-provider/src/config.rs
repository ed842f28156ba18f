use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::routing::RoutingInfo;

pub const CHANNELS_ENV: &str = "MESSAGING_CHANNELS";
pub const CHANNELS_PATH_ENV: &str = "MESSAGING_CHANNELS_PATH";

/// Errors produced while loading a channel catalog.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("channel catalog parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read channel catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("channel catalog is invalid: {0}")]
    Invalid(String),
}

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default)]
    channels: BTreeMap<String, RoutingInfo>,
}

/// Named channels and the routing used to reach them.
///
/// ```json
/// { "channels": { "index-updates": { "protocol": "amqp_sender", "hostname": "localhost",
///   "port": 5672, "virtual_host": "alvin", "exchange": "index", "routing_key": "alvin.#" } } }
/// ```
#[derive(Clone, Debug, Default)]
pub struct ChannelCatalog {
    channels: BTreeMap<String, Arc<RoutingInfo>>,
}

impl ChannelCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and validates a catalog from a JSON string.
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let file: CatalogFile = serde_json::from_str(content)?;
        let catalog = Self {
            channels: file
                .channels
                .into_iter()
                .map(|(name, routing)| (name, Arc::new(routing)))
                .collect(),
        };
        catalog.ensure_valid()?;
        Ok(catalog)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Loads inline JSON from `MESSAGING_CHANNELS`, else the file named by
    /// `MESSAGING_CHANNELS_PATH`. With neither set the catalog is empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(inline) = env::var(CHANNELS_ENV) {
            debug!("loading channel catalog from {CHANNELS_ENV}");
            return Self::from_json(&inline);
        }
        if let Ok(path) = env::var(CHANNELS_PATH_ENV) {
            debug!(%path, "loading channel catalog from file");
            return Self::from_path(path);
        }
        Ok(Self::default())
    }

    pub fn insert(&mut self, name: impl Into<String>, routing: RoutingInfo) -> Arc<RoutingInfo> {
        let routing = Arc::new(routing);
        self.channels.insert(name.into(), routing.clone());
        routing
    }

    pub fn get(&self, name: &str) -> Option<Arc<RoutingInfo>> {
        self.channels.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.channels.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    fn ensure_valid(&self) -> Result<(), ConfigError> {
        if self.channels.keys().any(|name| name.trim().is_empty()) {
            return Err(ConfigError::Invalid("channel names must not be empty".into()));
        }
        Ok(())
    }
}

//! Manager configuration types
//!
//! The configuration document is JSON shaped like
//! `{ "fileSystem": { "connections": { "<name>": { "type": "...", ... } } } }`.
//! Each connection is handed untouched to the adapter factory registered for
//! its `type`, which decodes the remaining parameters itself.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::{Error, Result};

/// Configuration section holding the file-system connections
pub const FILESYSTEM_CONNECTIONS: &str = "fileSystem.connections";

/// Main manager configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerConfig {
    /// Connection settings
    #[serde(default)]
    pub file_system: FileSystemConfig,

    /// Deadline applied to every adapter call made by the read pipeline
    #[serde(default = "default_stage_timeout", with = "millis_serde")]
    pub stage_timeout: Duration,
}

fn default_stage_timeout() -> Duration {
    Duration::from_secs(30)
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            file_system: FileSystemConfig::default(),
            stage_timeout: default_stage_timeout(),
        }
    }
}

impl ManagerConfig {
    /// Parse a configuration document
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::InvalidConfig {
            message: format!("Failed to parse configuration: {}", e),
        })
    }

    /// Load a configuration document from disk
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!(?path, "Loading configuration");

        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::InvalidConfig {
                message: format!("Failed to read {:?}: {}", path, e),
            })?;
        Self::from_json_str(&contents)
    }
}

/// The `fileSystem` section: logical name to connection parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileSystemConfig {
    #[serde(default)]
    pub connections: BTreeMap<String, ConnectionConfig>,
}

impl FileSystemConfig {
    /// Add or replace a connection
    pub fn with_connection(
        mut self,
        name: impl Into<String>,
        connection: ConnectionConfig,
    ) -> Self {
        self.connections.insert(name.into(), connection);
        self
    }
}

/// Connection parameters for one logical name
///
/// `type` selects the adapter factory; every other field is backend-specific.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    #[serde(rename = "type")]
    pub adapter_type: String,

    #[serde(flatten)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl ConnectionConfig {
    /// Create a connection with no parameters
    pub fn new(adapter_type: impl Into<String>) -> Self {
        Self {
            adapter_type: adapter_type.into(),
            params: serde_json::Map::new(),
        }
    }

    /// Set a backend-specific parameter
    pub fn with_param(
        mut self,
        name: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Decode the backend-specific parameters into a typed config
    pub fn params<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(serde_json::Value::Object(self.params.clone())).map_err(|e| {
            Error::InvalidConfig {
                message: format!("Invalid parameters for {} connection: {}", self.adapter_type, e),
            }
        })
    }
}

/// Source of connection configurations, looked up by logical name
pub trait ConnectionSource: Send + Sync {
    /// Resolve the connection for `key`
    ///
    /// # Errors
    /// Returns `Error::ConnectionNotFound` when nothing is configured for `key`
    fn connection(&self, key: &str) -> Result<ConnectionConfig>;
}

impl ConnectionSource for FileSystemConfig {
    fn connection(&self, key: &str) -> Result<ConnectionConfig> {
        let name = connection_name(key);
        self.connections
            .get(name)
            .cloned()
            .ok_or_else(|| Error::ConnectionNotFound {
                key: key.to_string(),
            })
    }
}

impl ConnectionSource for ManagerConfig {
    fn connection(&self, key: &str) -> Result<ConnectionConfig> {
        self.file_system.connection(key)
    }
}

/// Strip the `fileSystem.connections.` section prefix from a key, if present
pub fn connection_name(key: &str) -> &str {
    key.strip_prefix(FILESYSTEM_CONNECTIONS)
        .and_then(|rest| rest.strip_prefix('.'))
        .unwrap_or(key)
}

/// Duration serialization helper (milliseconds)
mod millis_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

//! Adapter registry
//!
//! Resolves a logical connection name to a live storage adapter. Adapters are
//! constructed lazily on first use through a factory looked up by the
//! connection's `type`, then shared for the lifetime of the registry.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use fs_core::config::connection_name;
use fs_core::{ConnectionConfig, ConnectionSource, Error, Result};
use parking_lot::RwLock;
use storage::{LocalDisk, MemoryStorage, StorageAdapter};
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Shared handle to a live adapter
pub type AdapterHandle = Arc<dyn StorageAdapter>;

/// Builds an adapter from its connection parameters
#[async_trait]
pub trait AdapterFactory: Send + Sync {
    async fn create(&self, connection: &ConnectionConfig) -> Result<AdapterHandle>;
}

/// Adapts an async closure into an `AdapterFactory`
pub struct FnFactory<F>(pub F);

#[async_trait]
impl<F, Fut> AdapterFactory for FnFactory<F>
where
    F: Fn(ConnectionConfig) -> Fut + Send + Sync,
    Fut: Future<Output = Result<AdapterHandle>> + Send,
{
    async fn create(&self, connection: &ConnectionConfig) -> Result<AdapterHandle> {
        (self.0)(connection.clone()).await
    }
}

struct LocalDiskFactory;

#[async_trait]
impl AdapterFactory for LocalDiskFactory {
    async fn create(&self, connection: &ConnectionConfig) -> Result<AdapterHandle> {
        Ok(Arc::new(LocalDisk::from_config(connection)?))
    }
}

struct MemoryFactory;

#[async_trait]
impl AdapterFactory for MemoryFactory {
    async fn create(&self, connection: &ConnectionConfig) -> Result<AdapterHandle> {
        Ok(Arc::new(MemoryStorage::from_config(connection)?))
    }
}

#[cfg(feature = "s3")]
struct S3Factory;

#[cfg(feature = "s3")]
#[async_trait]
impl AdapterFactory for S3Factory {
    async fn create(&self, connection: &ConnectionConfig) -> Result<AdapterHandle> {
        Ok(Arc::new(storage::S3Storage::from_config(connection).await?))
    }
}

/// Thread-safe registry of storage adapters keyed by connection name
///
/// Each key owns a once-cell published atomically in the map, so concurrent
/// first calls for the same key run exactly one construction and all observe
/// the same instance. A failed construction drops the entry and the next
/// call tries again; lookups of unconfigured names never add one.
pub struct AdapterRegistry {
    /// Source of connection parameters
    connections: Arc<dyn ConnectionSource>,

    /// Adapter type to factory
    factories: RwLock<HashMap<String, Arc<dyn AdapterFactory>>>,

    /// Connection name to adapter
    modules: DashMap<String, Arc<OnceCell<AdapterHandle>>>,
}

impl AdapterRegistry {
    /// Create a registry with no factories
    pub fn new(connections: Arc<dyn ConnectionSource>) -> Self {
        Self {
            connections,
            factories: RwLock::new(HashMap::new()),
            modules: DashMap::new(),
        }
    }

    /// Create a registry with the bundled factories: `LocalDisk`, `Memory`
    /// and, with the `s3` feature, `S3`
    pub fn with_builtin_factories(connections: Arc<dyn ConnectionSource>) -> Self {
        let registry = Self::new(connections);
        registry.register_factory("LocalDisk", LocalDiskFactory);
        registry.register_factory("Memory", MemoryFactory);
        #[cfg(feature = "s3")]
        registry.register_factory("S3", S3Factory);
        registry
    }

    /// Register the factory used for connections of `adapter_type`
    ///
    /// Replaces any factory previously registered for that type. Adapters
    /// already constructed are not affected.
    pub fn register_factory<F>(&self, adapter_type: impl Into<String>, factory: F)
    where
        F: AdapterFactory + 'static,
    {
        let adapter_type = adapter_type.into();
        debug!(%adapter_type, "Registering adapter factory");
        self.factories.write().insert(adapter_type, Arc::new(factory));
    }

    /// Get the adapter for `key`, constructing it on first use
    ///
    /// `key` is a connection name, optionally written with its
    /// `fileSystem.connections.` section prefix.
    ///
    /// # Errors
    /// `ConnectionNotFound` when `key` has no configuration,
    /// `UnknownAdapterType` when its `type` has no factory, or the
    /// factory's own error
    pub async fn get_module(&self, key: &str) -> Result<AdapterHandle> {
        let name = connection_name(key);
        if let Some(adapter) = self.modules.get(name).and_then(|cell| cell.get().cloned()) {
            return Ok(adapter);
        }

        // Unconfigured names never get an entry
        self.connections.connection(name)?;

        let cell = self.modules.entry(name.to_string()).or_default().clone();
        let result = cell.get_or_try_init(|| self.construct(name)).await.cloned();

        if result.is_err() {
            // Keep the cell while another caller is still waiting on it
            drop(cell);
            self.modules
                .remove_if(name, |_, cell| !cell.initialized() && Arc::strong_count(cell) == 1);
        }
        result
    }

    async fn construct(&self, name: &str) -> Result<AdapterHandle> {
        let connection = self.connections.connection(name)?;

        let factory = self
            .factories
            .read()
            .get(&connection.adapter_type)
            .cloned()
            .ok_or_else(|| Error::UnknownAdapterType {
                key: name.to_string(),
                adapter_type: connection.adapter_type.clone(),
            })?;

        let adapter = factory.create(&connection).await?;

        info!(
            key = %name,
            adapter_type = %connection.adapter_type,
            backend = adapter.kind(),
            "Storage adapter created"
        );
        Ok(adapter)
    }

    /// Whether an adapter has been constructed for `key`
    pub fn is_loaded(&self, key: &str) -> bool {
        self.modules
            .get(connection_name(key))
            .is_some_and(|cell| cell.initialized())
    }

    /// Names of all constructed adapters, sorted
    pub fn loaded_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .modules
            .iter()
            .filter(|entry| entry.value().initialized())
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        keys
    }

    /// Adapter types with a registered factory, sorted
    pub fn factory_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.factories.read().keys().cloned().collect();
        types.sort();
        types
    }
}

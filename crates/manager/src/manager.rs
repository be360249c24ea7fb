//! File-system manager
//!
//! Bundles one adapter registry and one read orchestrator. Construct it once
//! at startup and clone the handle into every call site.

use std::sync::Arc;

use fs_core::{ConnectionSource, ManagerConfig, Result};
use tracing::{debug, info};

use crate::orchestrator::{ReadOrchestrator, ReadRequest};
use crate::registry::{AdapterHandle, AdapterRegistry};
use crate::result::ReadResult;

/// Entry point for reads over configured connections
#[derive(Clone)]
pub struct FileSystemManager {
    /// Connection name to live adapter
    registry: Arc<AdapterRegistry>,

    /// Read pipeline shared by every connection
    orchestrator: ReadOrchestrator,
}

impl FileSystemManager {
    /// Create a manager with the bundled adapter factories
    pub fn new(config: ManagerConfig) -> Self {
        let orchestrator = ReadOrchestrator::new(config.stage_timeout);
        let connections: Arc<dyn ConnectionSource> = Arc::new(config);
        let registry = AdapterRegistry::with_builtin_factories(connections);

        info!(
            factories = ?registry.factory_types(),
            stage_timeout_ms = orchestrator.stage_timeout().as_millis() as u64,
            "File-system manager ready"
        );
        Self::from_parts(Arc::new(registry), orchestrator)
    }

    /// Assemble a manager from an existing registry and orchestrator
    pub fn from_parts(registry: Arc<AdapterRegistry>, orchestrator: ReadOrchestrator) -> Self {
        Self {
            registry,
            orchestrator,
        }
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    pub fn orchestrator(&self) -> &ReadOrchestrator {
        &self.orchestrator
    }

    /// Get the adapter for connection `key`
    pub async fn get_module(&self, key: &str) -> Result<AdapterHandle> {
        self.registry.get_module(key).await
    }

    /// Read `request` from connection `key`
    ///
    /// # Errors
    /// Registry lookup failures and adapter failures; expected outcomes are
    /// returned as a `ReadResult`
    pub async fn read(&self, key: &str, request: ReadRequest) -> Result<ReadResult> {
        let adapter = self.get_module(key).await?;
        let path = request.path().to_string();

        let result = self.orchestrator.read(adapter.as_ref(), request).await?;
        debug!(%key, %path, code = %result.code(), "Read finished");
        Ok(result)
    }
}

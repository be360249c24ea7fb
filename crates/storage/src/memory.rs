//! In-memory storage adapter
//!
//! Object-store semantics kept in process memory: flat keys, content type
//! recorded at write time, no directories. Useful for tests and as a scratch
//! backend.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use fs_core::{
    mime, ConnectionConfig, Encoding, Error, PathOptions, ReadOptions, Result, StatInfo,
    WriteOptions,
};
use parking_lot::RwLock;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::backend::object_key;
use crate::stream::{self, ByteStream, WriteSource};
use crate::StorageAdapter;

/// Connection parameters of a `Memory` connection
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemoryConfig {
    /// Optional prefix for all keys
    #[serde(default)]
    pub prefix: Option<String>,
}

#[derive(Debug, Clone)]
struct MemoryObject {
    data: Bytes,
    modified: DateTime<Utc>,
    content_type: String,
}

/// In-memory object storage adapter
#[derive(Debug, Default)]
pub struct MemoryStorage {
    objects: RwLock<BTreeMap<String, MemoryObject>>,
    prefix: String,
}

impl MemoryStorage {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store whose relative paths live under `prefix`
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
            prefix: prefix.into(),
        }
    }

    /// Create a store from a `Memory` connection
    pub fn from_config(connection: &ConnectionConfig) -> Result<Self> {
        let config: MemoryConfig = connection.params()?;
        Ok(Self::with_prefix(config.prefix.unwrap_or_default()))
    }

    /// Number of stored objects
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    fn key(&self, path: &str, absolute: bool) -> String {
        object_key(&self.prefix, path, absolute)
    }

    fn not_found(path: &str) -> Error {
        Error::StoragePathNotFound {
            path: path.to_string(),
        }
    }
}

#[async_trait]
impl StorageAdapter for MemoryStorage {
    fn kind(&self) -> &'static str {
        "memory"
    }

    #[instrument(skip(self, data), fields(backend = "memory"))]
    async fn write(&self, path: &str, data: WriteSource, options: WriteOptions) -> Result<u64> {
        let key = self.key(path, options.absolute);
        let data = data.into_bytes().await?;
        let size = data.len() as u64;
        let content_type = options
            .content_type
            .unwrap_or_else(|| mime::lookup(path).to_string());

        debug!(%key, size, %content_type, "Storing object");
        self.objects.write().insert(
            key,
            MemoryObject {
                data,
                modified: Utc::now(),
                content_type,
            },
        );
        Ok(size)
    }

    #[instrument(skip(self), fields(backend = "memory"))]
    async fn read(&self, path: &str, options: ReadOptions) -> Result<ByteStream> {
        let key = self.key(path, options.absolute);
        let data = self
            .objects
            .read()
            .get(&key)
            .map(|object| object.data.clone())
            .ok_or_else(|| Self::not_found(path))?;

        if options.encoding == Encoding::Utf8 {
            stream::ensure_utf8(path, &data)?;
        }
        Ok(stream::once(data))
    }

    #[instrument(skip(self), fields(backend = "memory"))]
    async fn exists(&self, path: &str, options: PathOptions) -> Result<bool> {
        Ok(self.objects.read().contains_key(&self.key(path, options.absolute)))
    }

    #[instrument(skip(self), fields(backend = "memory"))]
    async fn stat(&self, path: &str, options: PathOptions) -> Result<StatInfo> {
        let objects = self.objects.read();
        let object = objects
            .get(&self.key(path, options.absolute))
            .ok_or_else(|| Self::not_found(path))?;

        Ok(StatInfo::file(
            path,
            object.modified,
            object.data.len() as u64,
            object.content_type.clone(),
        ))
    }

    #[instrument(skip(self), fields(backend = "memory"))]
    async fn copy(&self, from: &str, to: &str, options: PathOptions) -> Result<()> {
        let mut objects = self.objects.write();
        let mut object = objects
            .get(&self.key(from, options.absolute))
            .cloned()
            .ok_or_else(|| Self::not_found(from))?;
        object.modified = Utc::now();
        objects.insert(self.key(to, options.absolute), object);
        Ok(())
    }

    #[instrument(skip(self), fields(backend = "memory"))]
    async fn rename(&self, from: &str, to: &str, options: PathOptions) -> Result<()> {
        let mut objects = self.objects.write();
        let object = objects
            .remove(&self.key(from, options.absolute))
            .ok_or_else(|| Self::not_found(from))?;
        objects.insert(self.key(to, options.absolute), object);
        Ok(())
    }

    #[instrument(skip(self), fields(backend = "memory"))]
    async fn remove(&self, path: &str, options: PathOptions) -> Result<()> {
        self.objects
            .write()
            .remove(&self.key(path, options.absolute))
            .map(|_| ())
            .ok_or_else(|| Self::not_found(path))
    }
}

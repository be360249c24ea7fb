//! Storage adapter trait definition
//!
//! Defines the async interface that all storage backends must implement.

use async_trait::async_trait;
use fs_core::{Error, PathOptions, ReadOptions, Result, StatInfo, WriteOptions};

use crate::stream::{self, ByteStream, WriteSource};

/// Async trait for storage adapters
///
/// Implementors translate these operations onto a concrete backend (local
/// disk, object storage, ...). The trait imposes no ordering between calls
/// and no locking; each adapter is responsible for its own concurrency
/// safety. Operations never retry.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Short backend name used in logs (e.g. "local", "s3")
    fn kind(&self) -> &'static str;

    /// Write data to the given path
    ///
    /// # Arguments
    /// * `path` - Path relative to the backend root, unless `options.absolute`
    /// * `data` - Buffer or streaming source
    ///
    /// # Returns
    /// Number of bytes written
    async fn write(&self, path: &str, data: WriteSource, options: WriteOptions) -> Result<u64>;

    /// Open the content at the given path as a byte stream
    ///
    /// # Errors
    /// Returns `Error::StoragePathNotFound` if the path doesn't exist, and
    /// `Error::InvalidEncoding` for a UTF-8 read of non UTF-8 content
    async fn read(&self, path: &str, options: ReadOptions) -> Result<ByteStream>;

    /// Check if a path exists
    ///
    /// A missing path is `Ok(false)`; only backend failures are errors.
    async fn exists(&self, path: &str, options: PathOptions) -> Result<bool>;

    /// Retrieve metadata for a path
    ///
    /// # Errors
    /// Returns `Error::StoragePathNotFound` if the path doesn't exist
    async fn stat(&self, path: &str, options: PathOptions) -> Result<StatInfo>;

    /// Copy `from` to `to`
    ///
    /// `options.absolute` applies to both paths.
    async fn copy(&self, from: &str, to: &str, options: PathOptions) -> Result<()>;

    /// Move `from` to `to`
    ///
    /// `options.absolute` applies to both paths.
    async fn rename(&self, from: &str, to: &str, options: PathOptions) -> Result<()>;

    /// Remove the file at `path`
    async fn remove(&self, path: &str, options: PathOptions) -> Result<()>;

    /// Read the whole content at `path` as UTF-8 text
    async fn read_text(&self, path: &str) -> Result<String> {
        let data = stream::collect(self.read(path, ReadOptions::utf8()).await?).await?;
        String::from_utf8(data.to_vec()).map_err(|_| Error::InvalidEncoding {
            path: path.to_string(),
        })
    }
}

/// Full object key for a path under an optional key prefix
pub(crate) fn object_key(prefix: &str, path: &str, absolute: bool) -> String {
    if absolute || prefix.is_empty() {
        path.to_string()
    } else {
        format!("{}/{}", prefix.trim_end_matches('/'), path)
    }
}

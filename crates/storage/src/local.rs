//! Local filesystem storage adapter
//!
//! Provides async file I/O with atomic writes to prevent partial/corrupt files.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use fs_core::{
    mime, ConnectionConfig, Encoding, Error, PathOptions, ReadOptions, Result, StatInfo,
    WriteOptions,
};
use serde::Deserialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_stream::StreamExt;
use tokio_util::io::ReaderStream;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::stream::{self, ByteStream, WriteSource};
use crate::StorageAdapter;

/// Connection parameters of a `LocalDisk` connection
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocalDiskConfig {
    /// Directory that relative paths resolve against (defaults to the
    /// process working directory)
    #[serde(default)]
    pub root: Option<PathBuf>,
}

/// Local filesystem storage adapter
///
/// Stores data in a local directory with support for:
/// - Atomic writes (write to .tmp, then rename)
/// - Automatic directory creation
/// - Recursive directory copies
#[derive(Debug, Clone)]
pub struct LocalDisk {
    /// Root for all relative paths
    root: PathBuf,
}

impl LocalDisk {
    /// Create a new LocalDisk adapter
    ///
    /// # Arguments
    /// * `root` - Directory to use as the storage root
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Create an adapter from a `LocalDisk` connection
    pub fn from_config(connection: &ConnectionConfig) -> Result<Self> {
        let config: LocalDiskConfig = connection.params()?;
        let root = match config.root {
            Some(root) => root,
            None => std::env::current_dir()?,
        };
        Ok(Self::new(root))
    }

    /// Get the root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a path against the root unless it is absolute
    fn resolve_path(&self, path: &str, absolute: bool) -> PathBuf {
        if absolute {
            PathBuf::from(path)
        } else {
            self.root.join(path.trim_start_matches('/'))
        }
    }
}

/// Generate a unique temporary file path next to `full_path`
fn temp_path(full_path: &Path) -> PathBuf {
    let temp_name = format!(
        ".{}.{}.tmp",
        full_path.file_name().unwrap_or_default().to_string_lossy(),
        Uuid::new_v4()
    );
    full_path.with_file_name(temp_name)
}

fn io_error(path: &str, action: &str, e: std::io::Error) -> Error {
    if e.kind() == std::io::ErrorKind::NotFound {
        Error::StoragePathNotFound {
            path: path.to_string(),
        }
    } else {
        Error::Storage {
            message: format!("Failed to {} {}: {}", action, path, e),
        }
    }
}

async fn write_source(file: &mut fs::File, data: WriteSource) -> Result<u64> {
    match data {
        WriteSource::Bytes(data) => {
            file.write_all(&data).await?;
            Ok(data.len() as u64)
        }
        WriteSource::Stream(mut chunks) => {
            let mut size = 0u64;
            while let Some(chunk) = chunks.next().await {
                let chunk = chunk?;
                file.write_all(&chunk).await?;
                size += chunk.len() as u64;
            }
            Ok(size)
        }
    }
}

async fn copy_dir(source: &Path, target: &Path) -> std::io::Result<()> {
    let mut stack = vec![(source.to_path_buf(), target.to_path_buf())];
    while let Some((from, to)) = stack.pop() {
        fs::create_dir_all(&to).await?;
        let mut entries = fs::read_dir(&from).await?;
        while let Some(entry) = entries.next_entry().await? {
            let dest = to.join(entry.file_name());
            if entry.file_type().await?.is_dir() {
                stack.push((entry.path(), dest));
            } else {
                fs::copy(entry.path(), &dest).await?;
            }
        }
    }
    Ok(())
}

async fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::Storage {
                message: format!("Failed to create directory {:?}: {}", parent, e),
            })?;
    }
    Ok(())
}

#[async_trait]
impl StorageAdapter for LocalDisk {
    fn kind(&self) -> &'static str {
        "local"
    }

    #[instrument(skip(self, data), fields(backend = "local"))]
    async fn write(&self, path: &str, data: WriteSource, options: WriteOptions) -> Result<u64> {
        let full_path = self.resolve_path(path, options.absolute);
        let temp_path = temp_path(&full_path);

        debug!(?full_path, ?temp_path, "Writing file atomically");

        ensure_parent(&full_path).await?;

        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| Error::Storage {
                message: format!("Failed to create temp file {:?}: {}", temp_path, e),
            })?;

        let written = async {
            let size = write_source(&mut file, data).await?;
            file.sync_all().await?;
            Ok::<u64, Error>(size)
        }
        .await;
        drop(file);

        let size = match written {
            Ok(size) => size,
            Err(e) => {
                let _ = fs::remove_file(&temp_path).await;
                return Err(e);
            }
        };

        // Atomic rename
        fs::rename(&temp_path, &full_path)
            .await
            .map_err(|e| Error::Storage {
                message: format!("Failed to rename {:?} to {:?}: {}", temp_path, full_path, e),
            })?;

        debug!(?full_path, size, "File written successfully");
        Ok(size)
    }

    #[instrument(skip(self), fields(backend = "local"))]
    async fn read(&self, path: &str, options: ReadOptions) -> Result<ByteStream> {
        let full_path = self.resolve_path(path, options.absolute);
        debug!(?full_path, "Reading file");

        match options.encoding {
            Encoding::Binary => {
                let file = fs::File::open(&full_path)
                    .await
                    .map_err(|e| io_error(path, "open", e))?;
                let chunks: ByteStream =
                    Box::pin(ReaderStream::new(file).map(|chunk| chunk.map_err(Error::from)));
                Ok(chunks)
            }
            Encoding::Utf8 => {
                let data = fs::read(&full_path)
                    .await
                    .map_err(|e| io_error(path, "read", e))?;
                stream::ensure_utf8(path, &data)?;
                Ok(stream::once(Bytes::from(data)))
            }
        }
    }

    #[instrument(skip(self), fields(backend = "local"))]
    async fn exists(&self, path: &str, options: PathOptions) -> Result<bool> {
        let full_path = self.resolve_path(path, options.absolute);
        fs::try_exists(&full_path)
            .await
            .map_err(|e| io_error(path, "check", e))
    }

    #[instrument(skip(self), fields(backend = "local"))]
    async fn stat(&self, path: &str, options: PathOptions) -> Result<StatInfo> {
        let full_path = self.resolve_path(path, options.absolute);
        let metadata = fs::metadata(&full_path)
            .await
            .map_err(|e| io_error(path, "stat", e))?;
        let mtime: DateTime<Utc> = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .map_err(|e| io_error(path, "stat", e))?;

        if metadata.is_dir() {
            Ok(StatInfo::directory(path, mtime, metadata.len()))
        } else {
            Ok(StatInfo::file(
                path,
                mtime,
                metadata.len(),
                mime::lookup(&full_path),
            ))
        }
    }

    #[instrument(skip(self), fields(backend = "local"))]
    async fn copy(&self, from: &str, to: &str, options: PathOptions) -> Result<()> {
        let source = self.resolve_path(from, options.absolute);
        let target = self.resolve_path(to, options.absolute);
        debug!(?source, ?target, "Copying");

        let metadata = fs::metadata(&source)
            .await
            .map_err(|e| io_error(from, "copy", e))?;

        if metadata.is_dir() {
            copy_dir(&source, &target)
                .await
                .map_err(|e| io_error(from, "copy", e))?;
        } else {
            ensure_parent(&target).await?;
            fs::copy(&source, &target)
                .await
                .map_err(|e| io_error(from, "copy", e))?;
        }
        Ok(())
    }

    #[instrument(skip(self), fields(backend = "local"))]
    async fn rename(&self, from: &str, to: &str, options: PathOptions) -> Result<()> {
        let source = self.resolve_path(from, options.absolute);
        let target = self.resolve_path(to, options.absolute);
        debug!(?source, ?target, "Moving");

        if !fs::try_exists(&source)
            .await
            .map_err(|e| io_error(from, "move", e))?
        {
            return Err(Error::StoragePathNotFound {
                path: from.to_string(),
            });
        }

        ensure_parent(&target).await?;
        fs::rename(&source, &target)
            .await
            .map_err(|e| io_error(from, "move", e))
    }

    #[instrument(skip(self), fields(backend = "local"))]
    async fn remove(&self, path: &str, options: PathOptions) -> Result<()> {
        let full_path = self.resolve_path(path, options.absolute);
        debug!(?full_path, "Deleting file");

        fs::remove_file(&full_path)
            .await
            .map_err(|e| io_error(path, "delete", e))
    }
}

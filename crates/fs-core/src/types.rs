//! Core type definitions shared by adapters and the read pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata describing one path of a storage backend
///
/// Produced fresh by every `stat` call and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatInfo {
    /// Path as it was requested from the backend
    path: String,

    /// Last modification time
    mtime: DateTime<Utc>,

    /// Size in bytes
    size: u64,

    /// Whether the path names a directory
    is_dir: bool,

    /// MIME type, empty for directories
    mime_type: String,
}

impl StatInfo {
    /// Metadata for a regular file
    pub fn file(
        path: impl Into<String>,
        mtime: DateTime<Utc>,
        size: u64,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            mtime,
            size,
            is_dir: false,
            mime_type: mime_type.into(),
        }
    }

    /// Metadata for a directory
    pub fn directory(path: impl Into<String>, mtime: DateTime<Utc>, size: u64) -> Self {
        Self {
            path: path.into(),
            mtime,
            size,
            is_dir: true,
            mime_type: String::new(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn mtime(&self) -> DateTime<Utc> {
        self.mtime
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_directory(&self) -> bool {
        self.is_dir
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }
}

/// How read content should be interpreted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Encoding {
    /// Raw bytes
    #[default]
    Binary,

    /// Content must be valid UTF-8
    Utf8,
}

/// Options accepted by the path-only operations of `StorageAdapter`
/// (`exists`, `stat`, `copy`, `rename` and `remove`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PathOptions {
    /// Use the path as given instead of resolving it against the backend root
    pub absolute: bool,
}

impl PathOptions {
    pub fn absolute() -> Self {
        Self { absolute: true }
    }
}

/// Options accepted by `StorageAdapter::read`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Use the path as given instead of resolving it against the backend root
    pub absolute: bool,

    pub encoding: Encoding,
}

impl ReadOptions {
    pub fn absolute() -> Self {
        Self {
            absolute: true,
            ..Default::default()
        }
    }

    pub fn utf8() -> Self {
        Self {
            encoding: Encoding::Utf8,
            ..Default::default()
        }
    }
}

/// Options accepted by `StorageAdapter::write`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Use the path as given instead of resolving it against the backend root
    pub absolute: bool,

    /// Content type to record with the object; guessed from the path when unset
    pub content_type: Option<String>,
}

impl WriteOptions {
    pub fn absolute() -> Self {
        Self {
            absolute: true,
            ..Default::default()
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

//! Storage - Adapter contract and backends for the file-system manager
//!
//! Provides the `StorageAdapter` trait plus:
//! - Local filesystem (`LocalDisk`)
//! - In-memory object store (`MemoryStorage`)
//! - Amazon S3 / S3-compatible storage (with `s3` feature)
//!
//! # Example
//!
//! ```no_run
//! use storage::{LocalDisk, StorageAdapter};
//! use fs_core::{ReadOptions, WriteOptions};
//!
//! # async fn example() -> fs_core::Result<()> {
//! let storage = LocalDisk::new("/srv/files");
//! storage.write("reports/q1.txt", "revenue".into(), WriteOptions::default()).await?;
//! let chunks = storage.read("reports/q1.txt", ReadOptions::default()).await?;
//! let data = storage::stream::collect(chunks).await?;
//! # Ok(())
//! # }
//! ```

mod backend;
mod local;
mod memory;
pub mod stream;

#[cfg(feature = "s3")]
mod s3;

pub use backend::StorageAdapter;
pub use local::{LocalDisk, LocalDiskConfig};
pub use memory::{MemoryConfig, MemoryStorage};
pub use stream::{ByteStream, WriteSource};

#[cfg(feature = "s3")]
pub use s3::{S3Config, S3Storage};

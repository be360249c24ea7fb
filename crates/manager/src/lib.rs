//! File-system manager over pluggable storage backends
//!
//! This crate provides:
//! - **Adapter registry**: lazy, single-construction adapters keyed by connection name
//! - **Read pipeline**: path validation, existence, type and cache checks before any content fetch
//! - **Typed outcomes**: expected results as `ReadResult` codes, backend failures as errors
//!
//! # Example
//!
//! ```no_run
//! use manager::{FileSystemManager, ReadCode, ReadRequest};
//! use fs_core::ManagerConfig;
//!
//! # async fn example() -> fs_core::Result<()> {
//! let config = ManagerConfig::from_file("fs.json").await?;
//! let manager = FileSystemManager::new(config);
//!
//! let result = manager.read("docs", ReadRequest::new("report.pdf")).await?;
//! if result.code() == ReadCode::Success {
//!     let data = storage::stream::collect(result.into_stream().unwrap()).await?;
//!     println!("{} bytes", data.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod manager;
pub mod orchestrator;
pub mod registry;
pub mod result;

#[cfg(test)]
mod testing;

pub use manager::FileSystemManager;
pub use orchestrator::{is_valid_path, ReadOrchestrator, ReadRequest, DEFAULT_STAGE_TIMEOUT};
pub use registry::{AdapterFactory, AdapterHandle, AdapterRegistry, FnFactory};
pub use result::{ReadCode, ReadResult};

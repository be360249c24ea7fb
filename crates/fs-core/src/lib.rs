//! FS Core - Foundation for the file-system manager
//!
//! Provides the shared error type, connection configuration and the
//! metadata/option types used by every storage adapter.

pub mod config;
pub mod error;
pub mod mime;
pub mod types;

pub use config::{ConnectionConfig, ConnectionSource, FileSystemConfig, ManagerConfig};
pub use error::{Error, Result};
pub use types::*;

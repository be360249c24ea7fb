//! Validated, cache-aware reads
//!
//! A read runs a fixed sequence of stages and stops at the first terminal
//! outcome:
//!
//! 1. path validation, `InvalidPath`
//! 2. `exists`, `NotFound`
//! 3. `stat`, backend failures propagate
//! 4. directory check, `InvalidResourceType`
//! 5. caller cache predicate, `NotModified`
//! 6. `read`, `Success`
//!
//! Every adapter call runs under the stage deadline and the request's
//! cancellation token. Nothing is retried.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use fs_core::{Error, PathOptions, ReadOptions, Result, StatInfo};
use storage::StorageAdapter;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::result::ReadResult;

/// Default deadline for a single adapter call
pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(30);

/// Cache predicate: returns `true` when the caller's cached copy is still
/// valid for the given metadata
pub type CacheCheck = Box<dyn Fn(&StatInfo) -> bool + Send + Sync>;

/// A read request
pub struct ReadRequest {
    path: String,
    check_cache: Option<CacheCheck>,
    cancel: Option<CancellationToken>,
}

impl ReadRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            check_cache: None,
            cancel: None,
        }
    }

    /// Skip the content fetch when `check` reports the cached copy as current
    pub fn check_cache<F>(mut self, check: F) -> Self
    where
        F: Fn(&StatInfo) -> bool + Send + Sync + 'static,
    {
        self.check_cache = Some(Box::new(check));
        self
    }

    /// Abandon the pending adapter call once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Debug for ReadRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadRequest")
            .field("path", &self.path)
            .field("check_cache", &self.check_cache.is_some())
            .field("cancellable", &self.cancel.is_some())
            .finish()
    }
}

/// Textual path check
///
/// Rejects any path containing `./`. This is not a traversal guard: it also
/// rejects benign paths such as `a/./b` and lets `docs/..` or absolute paths
/// through.
pub fn is_valid_path(path: &str) -> bool {
    !path.contains("./")
}

/// Turns read requests into typed results by composing adapter calls
#[derive(Debug, Clone)]
pub struct ReadOrchestrator {
    stage_timeout: Duration,
}

impl Default for ReadOrchestrator {
    fn default() -> Self {
        Self::new(DEFAULT_STAGE_TIMEOUT)
    }
}

impl ReadOrchestrator {
    pub fn new(stage_timeout: Duration) -> Self {
        Self { stage_timeout }
    }

    pub fn with_stage_timeout(mut self, stage_timeout: Duration) -> Self {
        self.stage_timeout = stage_timeout;
        self
    }

    pub fn stage_timeout(&self) -> Duration {
        self.stage_timeout
    }

    /// Run the read pipeline for `request` against `adapter`
    ///
    /// # Errors
    /// Adapter failures, stage timeouts and cancellation propagate as
    /// errors; every expected outcome is an `Ok(ReadResult)`
    pub async fn read<A>(&self, adapter: &A, request: ReadRequest) -> Result<ReadResult>
    where
        A: StorageAdapter + ?Sized,
    {
        let ReadRequest {
            path,
            check_cache,
            cancel,
        } = request;
        let cancel = cancel.as_ref();

        if !is_valid_path(&path) {
            debug!(%path, "Rejected path");
            return Ok(ReadResult::InvalidPath);
        }

        let options = PathOptions::default();

        if !self.stage("exists", cancel, adapter.exists(&path, options)).await? {
            debug!(%path, backend = adapter.kind(), "Path not found");
            return Ok(ReadResult::NotFound);
        }

        let stat = self.stage("stat", cancel, adapter.stat(&path, options)).await?;

        if stat.is_directory() {
            debug!(%path, "Path is a directory");
            return Ok(ReadResult::InvalidResourceType);
        }

        if let Some(check) = &check_cache {
            if check(&stat) {
                debug!(%path, mtime = %stat.mtime(), "Cached copy still valid");
                return Ok(ReadResult::NotModified { stat });
            }
        }

        let stream = self
            .stage("read", cancel, adapter.read(&path, ReadOptions::default()))
            .await?;

        debug!(%path, size = stat.size(), "Read ready");
        Ok(ReadResult::Success { stream, stat })
    }

    /// Await one adapter call under the stage deadline and cancellation token
    async fn stage<T, F>(
        &self,
        operation: &'static str,
        cancel: Option<&CancellationToken>,
        call: F,
    ) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let timeout = self.stage_timeout;
        let guarded = async move {
            tokio::time::timeout(timeout, call)
                .await
                .unwrap_or_else(|_| {
                    Err(Error::Timeout {
                        operation: operation.to_string(),
                        timeout_ms: timeout.as_millis() as u64,
                    })
                })
        };

        match cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(Error::Cancelled {
                        operation: operation.to_string(),
                    }),
                    result = guarded => result,
                }
            }
            None => guarded.await,
        }
    }
}

//! Test doubles for the read pipeline and the registry

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use fs_core::{Error, PathOptions, ReadOptions, Result, StatInfo, WriteOptions};
use parking_lot::Mutex;
use storage::{ByteStream, StorageAdapter, WriteSource};

/// Adapter recording every call it receives
///
/// Serves a single path: `exists` answers the configured flag, `stat`
/// returns the configured metadata (or fails when none is set) and `read`
/// yields the configured content.
pub struct SpyAdapter {
    exists: bool,
    stat: Option<StatInfo>,
    content: Bytes,
    delay: Option<Duration>,
    delayed_call: Option<&'static str>,
    calls: Mutex<Vec<&'static str>>,
}

impl SpyAdapter {
    pub fn file(path: &str, mtime: DateTime<Utc>, content: &'static str) -> Self {
        Self {
            exists: true,
            stat: Some(StatInfo::file(path, mtime, content.len() as u64, "text/plain")),
            content: Bytes::from_static(content.as_bytes()),
            delay: None,
            delayed_call: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn directory(path: &str) -> Self {
        Self {
            stat: Some(StatInfo::directory(path, Utc::now(), 0)),
            ..Self::file(path, Utc::now(), "")
        }
    }

    pub fn missing() -> Self {
        Self {
            exists: false,
            stat: None,
            ..Self::file("", Utc::now(), "")
        }
    }

    /// Exists, but every `stat` fails with a backend error
    pub fn broken_stat() -> Self {
        Self {
            stat: None,
            ..Self::file("", Utc::now(), "")
        }
    }

    /// Delay every call by `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Delay only calls named `call`
    pub fn with_delay_on(mut self, call: &'static str, delay: Duration) -> Self {
        self.delay = Some(delay);
        self.delayed_call = Some(call);
        self
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }

    async fn record(&self, call: &'static str) {
        self.calls.lock().push(call);
        if self.delayed_call.is_some_and(|delayed| delayed != call) {
            return;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl StorageAdapter for SpyAdapter {
    fn kind(&self) -> &'static str {
        "spy"
    }

    async fn write(&self, _path: &str, data: WriteSource, _options: WriteOptions) -> Result<u64> {
        self.record("write").await;
        Ok(data.into_bytes().await?.len() as u64)
    }

    async fn read(&self, _path: &str, _options: ReadOptions) -> Result<ByteStream> {
        self.record("read").await;
        Ok(storage::stream::once(self.content.clone()))
    }

    async fn exists(&self, _path: &str, _options: PathOptions) -> Result<bool> {
        self.record("exists").await;
        Ok(self.exists)
    }

    async fn stat(&self, path: &str, _options: PathOptions) -> Result<StatInfo> {
        self.record("stat").await;
        self.stat.clone().ok_or_else(|| Error::Storage {
            message: format!("stat failed for {}", path),
        })
    }

    async fn copy(&self, _from: &str, _to: &str, _options: PathOptions) -> Result<()> {
        self.record("copy").await;
        Ok(())
    }

    async fn rename(&self, _from: &str, _to: &str, _options: PathOptions) -> Result<()> {
        self.record("rename").await;
        Ok(())
    }

    async fn remove(&self, _path: &str, _options: PathOptions) -> Result<()> {
        self.record("remove").await;
        Ok(())
    }
}

//! S3 storage adapter
//!
//! Provides async S3-compatible storage with:
//! - Multipart uploads for large files
//! - Content type recorded at write time and reported by `stat`
//! - Custom endpoint support (for MinIO, LocalStack, etc.)
//!
//! Failures are never retried; they propagate to the caller unchanged.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    config::Builder as S3ConfigBuilder,
    primitives::ByteStream as S3ByteStream,
    types::{CompletedMultipartUpload, CompletedPart},
    Client,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use fs_core::{
    mime, ConnectionConfig, Encoding, Error, PathOptions, ReadOptions, Result, StatInfo,
    WriteOptions,
};
use serde::Deserialize;
use tokio_stream::StreamExt;
use tokio_util::io::ReaderStream;
use tracing::{debug, instrument};

use crate::backend::object_key;
use crate::stream::{self, ByteStream, WriteSource};
use crate::StorageAdapter;

/// Threshold for switching to multipart upload (5 MB)
const MULTIPART_THRESHOLD: usize = 5 * 1024 * 1024;

/// Part size for multipart uploads (5 MB minimum required by S3)
const MULTIPART_PART_SIZE: usize = 5 * 1024 * 1024;

/// S3-compatible storage adapter
///
/// Supports Amazon S3 and S3-compatible services like MinIO. Objects are
/// never reported as directories.
#[derive(Debug, Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
    prefix: String,
}

/// Connection parameters of an `S3` connection
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct S3Config {
    /// S3 bucket name
    pub bucket: String,
    /// Optional prefix for all paths (e.g., "assets/")
    pub prefix: Option<String>,
    /// Optional custom endpoint URL (for MinIO, LocalStack, etc.)
    pub endpoint_url: Option<String>,
    /// AWS region (default: "us-east-1")
    pub region: Option<String>,
    /// Force path-style addressing (required for MinIO)
    pub force_path_style: bool,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            prefix: None,
            endpoint_url: None,
            region: Some("us-east-1".to_string()),
            force_path_style: false,
        }
    }
}

impl S3Storage {
    /// Create a new S3Storage with default AWS configuration
    ///
    /// Uses environment variables or instance profile for credentials.
    pub async fn new(bucket: impl Into<String>) -> Self {
        Self::with_config(S3Config {
            bucket: bucket.into(),
            ..Default::default()
        })
        .await
    }

    /// Create an adapter from an `S3` connection
    pub async fn from_config(connection: &ConnectionConfig) -> Result<Self> {
        let config: S3Config = connection.params()?;
        if config.bucket.is_empty() {
            return Err(Error::InvalidConfig {
                message: "S3 connection requires a bucket".to_string(),
            });
        }
        Ok(Self::with_config(config).await)
    }

    /// Create a new S3Storage with custom configuration
    pub async fn with_config(config: S3Config) -> Self {
        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new(
                config.region.unwrap_or_else(|| "us-east-1".to_string()),
            ))
            .load()
            .await;

        let mut s3_config_builder = S3ConfigBuilder::from(&aws_config);

        if let Some(endpoint) = &config.endpoint_url {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint);
        }

        if config.force_path_style {
            s3_config_builder = s3_config_builder.force_path_style(true);
        }

        let client = Client::from_conf(s3_config_builder.build());

        Self {
            client,
            bucket: config.bucket,
            prefix: config.prefix.unwrap_or_default(),
        }
    }

    /// Get the full S3 key for a path
    fn s3_key(&self, path: &str, absolute: bool) -> String {
        object_key(&self.prefix, path, absolute)
    }

    /// Perform multipart upload for large files
    async fn multipart_upload(&self, key: &str, data: Bytes, content_type: &str) -> Result<u64> {
        let size = data.len() as u64;

        // Initiate multipart upload
        let create_result = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| Error::Storage {
                message: format!("Failed to initiate multipart upload: {}", e),
            })?;

        let upload_id = create_result.upload_id().ok_or_else(|| Error::Storage {
            message: "No upload_id returned".to_string(),
        })?;

        debug!(key, upload_id, size, "Started multipart upload");

        let mut completed_parts = Vec::new();
        let mut offset = 0;
        let mut part_number = 1;

        while offset < data.len() {
            let end = std::cmp::min(offset + MULTIPART_PART_SIZE, data.len());
            let part_data = data.slice(offset..end);

            let upload_part_result = self
                .client
                .upload_part()
                .bucket(&self.bucket)
                .key(key)
                .upload_id(upload_id)
                .part_number(part_number)
                .body(S3ByteStream::from(part_data))
                .send()
                .await
                .map_err(|e| {
                    // Attempt to abort the upload on failure
                    self.abort_multipart_upload(key, upload_id);
                    Error::Storage {
                        message: format!("Failed to upload part {}: {}", part_number, e),
                    }
                })?;

            let etag = upload_part_result.e_tag().map(String::from);
            completed_parts.push(
                CompletedPart::builder()
                    .part_number(part_number)
                    .set_e_tag(etag)
                    .build(),
            );

            debug!(part_number, offset, end, "Uploaded part");
            offset = end;
            part_number += 1;
        }

        // Complete multipart upload
        let completed_upload = CompletedMultipartUpload::builder()
            .set_parts(Some(completed_parts))
            .build();

        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(completed_upload)
            .send()
            .await
            .map_err(|e| Error::Storage {
                message: format!("Failed to complete multipart upload: {}", e),
            })?;

        debug!(key, size, "Completed multipart upload");
        Ok(size)
    }

    /// Abort a multipart upload (best effort, for cleanup)
    fn abort_multipart_upload(&self, key: &str, upload_id: &str) {
        let client = self.client.clone();
        let bucket = self.bucket.clone();
        let key = key.to_string();
        let upload_id = upload_id.to_string();

        tokio::spawn(async move {
            let _ = client
                .abort_multipart_upload()
                .bucket(&bucket)
                .key(&key)
                .upload_id(&upload_id)
                .send()
                .await;
        });
    }
}

fn not_found(path: &str) -> Error {
    Error::StoragePathNotFound {
        path: path.to_string(),
    }
}

fn to_utc(timestamp: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(timestamp.secs(), timestamp.subsec_nanos())
}

#[async_trait]
impl StorageAdapter for S3Storage {
    fn kind(&self) -> &'static str {
        "s3"
    }

    #[instrument(skip(self, data), fields(backend = "s3", bucket = %self.bucket))]
    async fn write(&self, path: &str, data: WriteSource, options: WriteOptions) -> Result<u64> {
        let key = self.s3_key(path, options.absolute);
        let content_type = options
            .content_type
            .unwrap_or_else(|| mime::lookup(path).to_string());
        let data = data.into_bytes().await?;
        let size = data.len();
        debug!(%key, size, %content_type, "Writing to S3");

        if size > MULTIPART_THRESHOLD {
            return self.multipart_upload(&key, data, &content_type).await;
        }

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(content_type)
            .body(S3ByteStream::from(data))
            .send()
            .await
            .map_err(|e| Error::Storage {
                message: format!("S3 put_object failed: {}", e),
            })?;

        Ok(size as u64)
    }

    #[instrument(skip(self), fields(backend = "s3", bucket = %self.bucket))]
    async fn read(&self, path: &str, options: ReadOptions) -> Result<ByteStream> {
        let key = self.s3_key(path, options.absolute);
        debug!(%key, "Reading from S3");

        let result = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    not_found(path)
                } else {
                    Error::Storage {
                        message: format!("S3 get_object failed: {}", e),
                    }
                }
            })?;

        match options.encoding {
            Encoding::Binary => {
                let reader = result.body.into_async_read();
                let chunks: ByteStream =
                    Box::pin(ReaderStream::new(reader).map(|chunk| chunk.map_err(Error::from)));
                Ok(chunks)
            }
            Encoding::Utf8 => {
                let data = result
                    .body
                    .collect()
                    .await
                    .map_err(|e| Error::Storage {
                        message: format!("Failed to read S3 response body: {}", e),
                    })?
                    .into_bytes();
                stream::ensure_utf8(path, &data)?;
                Ok(stream::once(data))
            }
        }
    }

    #[instrument(skip(self), fields(backend = "s3", bucket = %self.bucket))]
    async fn exists(&self, path: &str, options: PathOptions) -> Result<bool> {
        let key = self.s3_key(path, options.absolute);
        debug!(%key, "Checking existence in S3");

        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => Ok(false),
            Err(e) => Err(Error::Storage {
                message: format!("S3 head_object failed: {}", e),
            }),
        }
    }

    #[instrument(skip(self), fields(backend = "s3", bucket = %self.bucket))]
    async fn stat(&self, path: &str, options: PathOptions) -> Result<StatInfo> {
        let key = self.s3_key(path, options.absolute);

        let head = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_not_found()) {
                    not_found(path)
                } else {
                    Error::Storage {
                        message: format!("S3 head_object failed: {}", e),
                    }
                }
            })?;

        let mtime = head.last_modified().and_then(to_utc).unwrap_or_default();
        let size = head.content_length().unwrap_or_default().max(0) as u64;
        let content_type = head
            .content_type()
            .map(String::from)
            .unwrap_or_else(|| mime::lookup(path).to_string());

        Ok(StatInfo::file(path, mtime, size, content_type))
    }

    #[instrument(skip(self), fields(backend = "s3", bucket = %self.bucket))]
    async fn copy(&self, from: &str, to: &str, options: PathOptions) -> Result<()> {
        let source = format!("{}/{}", self.bucket, self.s3_key(from, options.absolute));
        let target = self.s3_key(to, options.absolute);
        debug!(%source, %target, "Copying S3 object");

        self.client
            .copy_object()
            .bucket(&self.bucket)
            .copy_source(source)
            .key(target)
            .send()
            .await
            .map_err(|e| {
                if e.to_string().contains("NoSuchKey") {
                    not_found(from)
                } else {
                    Error::Storage {
                        message: format!("S3 copy_object failed: {}", e),
                    }
                }
            })?;

        Ok(())
    }

    #[instrument(skip(self), fields(backend = "s3", bucket = %self.bucket))]
    async fn rename(&self, from: &str, to: &str, options: PathOptions) -> Result<()> {
        self.copy(from, to, options).await?;
        self.remove(from, options).await
    }

    #[instrument(skip(self), fields(backend = "s3", bucket = %self.bucket))]
    async fn remove(&self, path: &str, options: PathOptions) -> Result<()> {
        // delete_object succeeds for missing keys
        if !self.exists(path, options).await? {
            return Err(not_found(path));
        }

        let key = self.s3_key(path, options.absolute);
        debug!(%key, "Deleting from S3");

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|e| Error::Storage {
                message: format!("S3 delete_object failed: {}", e),
            })?;

        Ok(())
    }
}

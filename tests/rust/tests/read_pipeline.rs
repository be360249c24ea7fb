use anyhow::Result;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use fs_core::{Error, ManagerConfig, PathOptions};
use manager::{FileSystemManager, ReadCode, ReadRequest};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

// Builds a "docs" LocalDisk connection rooted at a fresh temp dir holding
// report.pdf and an empty reports/ directory
async fn docs_manager() -> Result<(TempDir, FileSystemManager)> {
    let root = tempfile::tempdir()?;
    tokio::fs::write(root.path().join("report.pdf"), b"%PDF-1.7 quarterly").await?;
    tokio::fs::create_dir(root.path().join("reports")).await?;

    let config = ManagerConfig::from_json_str(&serde_json::json!({
        "fileSystem": {
            "connections": {
                "docs": { "type": "LocalDisk", "root": root.path() }
            }
        },
        "stageTimeout": 5000
    }).to_string())?;

    Ok((root, FileSystemManager::new(config)))
}

async fn report_mtime(manager: &FileSystemManager) -> Result<DateTime<Utc>> {
    let docs = manager.get_module("docs").await?;
    Ok(docs.stat("report.pdf", PathOptions::default()).await?.mtime())
}

#[tokio::test]
async fn test_missing_file_is_not_found() -> Result<()> {
    let (_root, manager) = docs_manager().await?;

    let result = manager.read("docs", ReadRequest::new("missing.pdf")).await?;
    assert_eq!(u8::from(result.code()), 2);
    assert!(result.stat().is_none());
    Ok(())
}

#[tokio::test]
async fn test_directory_is_invalid_resource_type() -> Result<()> {
    let (_root, manager) = docs_manager().await?;

    let result = manager.read("docs", ReadRequest::new("reports")).await?;
    assert_eq!(u8::from(result.code()), 3);
    assert!(result.into_stream().is_none());
    Ok(())
}

#[tokio::test]
async fn test_dot_slash_path_is_invalid() -> Result<()> {
    let (_root, manager) = docs_manager().await?;

    let result = manager.read("docs", ReadRequest::new("a/./report.pdf")).await?;
    assert_eq!(u8::from(result.code()), 1);

    // Rejected even though the file resolves
    let result = manager.read("docs", ReadRequest::new("./report.pdf")).await?;
    assert_eq!(result.code(), ReadCode::InvalidPath);
    Ok(())
}

#[tokio::test]
async fn test_unchanged_file_is_not_modified() -> Result<()> {
    let (_root, manager) = docs_manager().await?;
    let known_mtime = report_mtime(&manager).await?;

    let result = manager
        .read(
            "docs",
            ReadRequest::new("report.pdf").check_cache(move |stat| stat.mtime() <= known_mtime),
        )
        .await?;
    assert_eq!(u8::from(result.code()), 4);
    assert_eq!(result.stat().map(|s| s.mtime()), Some(known_mtime));
    assert!(result.into_stream().is_none());
    Ok(())
}

#[tokio::test]
async fn test_stale_cache_reads_content() -> Result<()> {
    let (_root, manager) = docs_manager().await?;
    let known_mtime = report_mtime(&manager).await? - ChronoDuration::days(1);

    let result = manager
        .read(
            "docs",
            ReadRequest::new("report.pdf").check_cache(move |stat| stat.mtime() <= known_mtime),
        )
        .await?;
    assert_eq!(result.code(), ReadCode::Success);

    let (_, stream, stat) = result.into_parts();
    let stat = stat.expect("success carries stat");
    assert_eq!(stat.size(), 18);
    assert_eq!(stat.mime_type(), "application/pdf");
    assert!(!stat.is_directory());

    let data = storage::stream::collect(stream.expect("success carries stream")).await?;
    assert_eq!(&data[..], b"%PDF-1.7 quarterly");
    Ok(())
}

#[tokio::test]
async fn test_full_section_key() -> Result<()> {
    let (_root, manager) = docs_manager().await?;

    let result = manager
        .read("fileSystem.connections.docs", ReadRequest::new("report.pdf"))
        .await?;
    assert!(result.is_success());
    assert_eq!(manager.registry().loaded_keys(), vec!["docs"]);
    Ok(())
}

#[tokio::test]
async fn test_unknown_connection_is_failure_not_code() -> Result<()> {
    let (_root, manager) = docs_manager().await?;

    let err = manager
        .read("archive", ReadRequest::new("report.pdf"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ConnectionNotFound { .. }));
    assert!(err.is_misconfiguration());
    Ok(())
}

#[tokio::test]
async fn test_cancelled_read_is_failure() -> Result<()> {
    let (_root, manager) = docs_manager().await?;
    let token = CancellationToken::new();
    token.cancel();

    let err = manager
        .read(
            "docs",
            ReadRequest::new("report.pdf").with_cancellation(token),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled { .. }));
    Ok(())
}

#[tokio::test]
async fn test_concurrent_reads_share_adapter() -> Result<()> {
    let (_root, manager) = docs_manager().await?;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let manager = manager.clone();
            tokio::spawn(async move {
                let result = manager.read("docs", ReadRequest::new("report.pdf")).await?;
                let data = storage::stream::collect(result.into_stream().expect("stream")).await?;
                Ok::<_, Error>(data.len())
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await??, 18);
    }
    assert_eq!(
        manager.orchestrator().stage_timeout(),
        Duration::from_millis(5000)
    );
    Ok(())
}

use anyhow::Result;
use bytes::Bytes;
use fs_core::{
    ConnectionConfig, FileSystemConfig, ManagerConfig, PathOptions, ReadOptions, WriteOptions,
};
use manager::{AdapterRegistry, FileSystemManager, ReadCode, ReadRequest};
use std::sync::Arc;
use storage::stream::{self, ByteStream};

const REL: PathOptions = PathOptions { absolute: false };

fn manager_with(root: &std::path::Path) -> FileSystemManager {
    let connections = FileSystemConfig::default()
        .with_connection(
            "docs",
            ConnectionConfig::new("LocalDisk")
                .with_param("root", root.to_string_lossy().to_string()),
        )
        .with_connection(
            "scratch",
            ConnectionConfig::new("Memory").with_param("prefix", "tenant-a"),
        );
    FileSystemManager::new(ManagerConfig {
        file_system: connections,
        ..ManagerConfig::default()
    })
}

#[tokio::test]
async fn test_memory_connection_lifecycle() -> Result<()> {
    let root = tempfile::tempdir()?;
    let manager = manager_with(root.path());
    let scratch = manager.get_module("scratch").await?;

    let chunks: ByteStream = Box::pin(chunks_of(vec!["draft ", "one"]));
    let size = scratch
        .write("drafts/one.md", chunks.into(), WriteOptions::default())
        .await?;
    assert_eq!(size, 9);

    scratch.copy("drafts/one.md", "drafts/two.md", REL).await?;
    scratch.rename("drafts/one.md", "archive/one.md", REL).await?;
    assert!(!scratch.exists("drafts/one.md", REL).await?);

    let text = scratch.read_text("archive/one.md").await?;
    assert_eq!(text, "draft one");

    let result = manager.read("scratch", ReadRequest::new("drafts/two.md")).await?;
    assert_eq!(result.code(), ReadCode::Success);
    assert_eq!(result.stat().map(|s| s.mime_type()), Some("text/markdown"));

    scratch.remove("drafts/two.md", REL).await?;
    let result = manager.read("scratch", ReadRequest::new("drafts/two.md")).await?;
    assert_eq!(result.code(), ReadCode::NotFound);
    Ok(())
}

#[tokio::test]
async fn test_local_disk_write_then_read_through_manager() -> Result<()> {
    let root = tempfile::tempdir()?;
    let manager = manager_with(root.path());
    let docs = manager.get_module("docs").await?;

    docs.write(
        "reports/2024/q1.json",
        Bytes::from_static(br#"{"revenue":42}"#).into(),
        WriteOptions::default(),
    )
    .await?;
    assert!(root.path().join("reports/2024/q1.json").exists());

    let result = manager.read("docs", ReadRequest::new("reports/2024/q1.json")).await?;
    let (code, stream, stat) = result.into_parts();
    assert_eq!(code, ReadCode::Success);
    assert_eq!(stat.map(|s| s.size()), Some(14));
    let data = stream::collect(stream.expect("stream")).await?;
    assert_eq!(&data[..], br#"{"revenue":42}"#);

    let result = manager.read("docs", ReadRequest::new("reports/2024")).await?;
    assert_eq!(result.code(), ReadCode::InvalidResourceType);
    Ok(())
}

#[tokio::test]
async fn test_local_disk_absolute_paths() -> Result<()> {
    let root = tempfile::tempdir()?;
    let elsewhere = tempfile::tempdir()?;
    let manager = manager_with(root.path());
    let docs = manager.get_module("docs").await?;

    let outside = elsewhere.path().join("export.txt");
    let outside = outside.to_string_lossy();
    docs.write(&outside, "exported".into(), WriteOptions::absolute())
        .await?;

    let data = stream::collect(docs.read(&outside, ReadOptions::absolute()).await?).await?;
    assert_eq!(&data[..], b"exported");
    assert!(!root.path().join("export.txt").exists());

    let abs = PathOptions::absolute();
    assert!(docs.exists(&outside, abs).await?);
    assert!(!docs.exists(&outside, REL).await?);
    assert_eq!(docs.stat(&outside, abs).await?.size(), 8);

    let renamed = elsewhere.path().join("exports/final.txt");
    let renamed = renamed.to_string_lossy();
    docs.rename(&outside, &renamed, abs).await?;
    assert!(!docs.exists(&outside, abs).await?);

    docs.remove(&renamed, abs).await?;
    assert!(!docs.exists(&renamed, abs).await?);
    Ok(())
}

#[tokio::test]
async fn test_registry_identity_across_handles() -> Result<()> {
    let root = tempfile::tempdir()?;
    let manager = manager_with(root.path());

    let (a, b) = tokio::join!(manager.get_module("docs"), manager.get_module("docs"));
    assert!(Arc::ptr_eq(&a?, &b?));

    let scratch = manager.get_module("scratch").await?;
    let docs = manager.get_module("fileSystem.connections.docs").await?;
    assert_eq!(scratch.kind(), "memory");
    assert_eq!(docs.kind(), "local");
    assert_eq!(manager.registry().loaded_keys(), vec!["docs", "scratch"]);
    Ok(())
}

#[tokio::test]
async fn test_bad_parameters_surface_from_factory() -> Result<()> {
    let connections = FileSystemConfig::default().with_connection(
        "docs",
        ConnectionConfig::new("LocalDisk").with_param("root", 17),
    );
    let registry = AdapterRegistry::with_builtin_factories(Arc::new(connections));

    let err = registry.get_module("docs").await.err().expect("expected error");
    assert!(err.is_misconfiguration());
    assert!(!registry.is_loaded("docs"));
    Ok(())
}

fn chunks_of(
    parts: Vec<&'static str>,
) -> impl tokio_stream::Stream<Item = fs_core::Result<Bytes>> + Send {
    tokio_stream::iter(parts.into_iter().map(|p| Ok(Bytes::from_static(p.as_bytes()))))
}

use remtrace_core::{TransferError, fetch};
use test_log::test;

use crate::common::FakeTransport;

#[test(tokio::test)]
async fn fetch_remote_file() {
    let content = br#"{"traceEvents":[]}"#;
    let transport = FakeTransport::new().with_file("/data/trace.json", content);

    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("trace.json");

    let n_bytes = fetch(&transport, "/data/trace.json", &local).await.unwrap();

    assert_eq!(n_bytes, content.len() as u64);
    assert_eq!(std::fs::read(&local).unwrap(), content);
}

#[test(tokio::test)]
async fn overwrite_existing_local_file() {
    let transport = FakeTransport::new().with_file("/data/trace.json", b"new");

    let local = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(local.path(), b"previous content").unwrap();

    fetch(&transport, "/data/trace.json", local.path()).await.unwrap();

    assert_eq!(std::fs::read(local.path()).unwrap(), b"new");
}

#[test(tokio::test)]
async fn missing_remote_file() {
    let transport = FakeTransport::new();

    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("trace.json");

    let res = fetch(&transport, "/data/missing.json", &local).await;

    assert!(matches!(res, Err(TransferError::RemoteOpen(path, _)) if path == "/data/missing.json"));
    assert!(!local.exists(), "local file created without remote file");
}

#[test(tokio::test)]
async fn local_file_cannot_be_created() {
    let transport = FakeTransport::new().with_file("/data/trace.json", b"{}");

    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("missing-dir").join("trace.json");

    let res = fetch(&transport, "/data/trace.json", &local).await;

    assert!(matches!(res, Err(TransferError::LocalCreate(path, _)) if path == local));
}

#[test(tokio::test)]
async fn copy_failure_keeps_partial_file() {
    let transport = FakeTransport::new().with_broken_file("/data/trace.json", b"partial");

    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("trace.json");

    let res = fetch(&transport, "/data/trace.json", &local).await;

    assert!(matches!(res, Err(TransferError::Copy(_))));
    assert!(local.exists());
}

#[test(tokio::test)]
async fn copy_failure_flushes_received_bytes() {
    let content = (0..64 * 1024).map(|i| (i % 239) as u8).collect::<Vec<_>>();
    let transport = FakeTransport::new().with_broken_file("/data/trace.json", &content);

    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("trace.json");

    let res = fetch(&transport, "/data/trace.json", &local).await;

    assert!(matches!(res, Err(TransferError::Copy(_))));
    assert_eq!(std::fs::read(&local).unwrap(), content);
}

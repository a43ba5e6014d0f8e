//! Integration tests: SyncEngine against real temporary trees
//!
//! Every test builds a source and a replica directory under one `TempDir`,
//! runs passes through the real `LocalFileSystemAdapter`, and checks both
//! the resulting replica and what was reported to a `MemorySink`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use foldersync_audit::{ActionLog, MemorySink};
use foldersync_core::domain::{EntryKind, Fingerprint};
use foldersync_core::ports::ILocalFileSystem;
use foldersync_sync::fingerprint::fingerprint_file;
use foldersync_sync::{LocalFileSystemAdapter, SyncEngine, SyncError, TreeScanner};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Fixtures
// ============================================================================

struct Fixture {
    _dir: TempDir,
    source: PathBuf,
    replica: PathBuf,
    sink: MemorySink,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("source");
        let replica = dir.path().join("replica");
        fs::create_dir(&source).unwrap();
        Self {
            _dir: dir,
            source,
            replica,
            sink: MemorySink::new(),
        }
    }

    fn engine(&self) -> SyncEngine {
        self.engine_with(Arc::new(LocalFileSystemAdapter::new()))
    }

    fn engine_with(&self, filesystem: Arc<dyn ILocalFileSystem>) -> SyncEngine {
        let log = ActionLog::new().with_sink(self.sink.clone());
        SyncEngine::new(&self.source, &self.replica, filesystem, log)
    }

    fn write_source(&self, relative: &str, content: &[u8]) {
        write(&self.source.join(relative), content);
    }

    fn write_replica(&self, relative: &str, content: &[u8]) {
        write(&self.replica.join(relative), content);
    }
}

fn write(path: &Path, content: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// Relative path → (kind, fingerprint for files)
async fn snapshot(root: &Path) -> BTreeMap<String, (EntryKind, Option<Fingerprint>)> {
    let mut tree = BTreeMap::new();
    for entry in TreeScanner::new(root).unwrap() {
        let entry = entry.unwrap();
        let fingerprint = if entry.kind.is_file() {
            Some(fingerprint_file(&entry.path).await.unwrap())
        } else {
            None
        };
        tree.insert(entry.relative.to_string(), (entry.kind, fingerprint));
    }
    tree
}

/// Adapter that fails to fingerprint any file with the given name
struct FailingFingerprint {
    inner: LocalFileSystemAdapter,
    file_name: &'static str,
}

#[async_trait]
impl ILocalFileSystem for FailingFingerprint {
    async fn entry_kind(&self, path: &Path) -> anyhow::Result<Option<EntryKind>> {
        self.inner.entry_kind(path).await
    }

    async fn fingerprint(&self, path: &Path) -> anyhow::Result<Fingerprint> {
        if path.file_name().is_some_and(|n| n == self.file_name) {
            anyhow::bail!("simulated read failure on {}", path.display());
        }
        self.inner.fingerprint(path).await
    }

    async fn create_directory(&self, path: &Path) -> anyhow::Result<()> {
        self.inner.create_directory(path).await
    }

    async fn copy_file(&self, source: &Path, destination: &Path) -> anyhow::Result<()> {
        self.inner.copy_file(source, destination).await
    }

    async fn remove_directory(&self, path: &Path) -> anyhow::Result<()> {
        self.inner.remove_directory(path).await
    }

    async fn remove_file(&self, path: &Path) -> anyhow::Result<()> {
        self.inner.remove_file(path).await
    }
}

// ============================================================================
// Scenario
// ============================================================================

#[tokio::test]
async fn test_first_pass_then_idempotent_then_prune() {
    let fx = Fixture::new();
    fx.write_source("a.txt", b"hello");
    fx.write_source("sub/b.txt", b"world");
    let engine = fx.engine();
    let cancel = CancellationToken::new();

    // First pass: one directory, two files
    let report = engine.run_pass(&cancel).await;
    assert_eq!(report.actions_taken(), 3);
    assert_eq!(report.directories_created, 1);
    assert_eq!(report.files_created, 2);
    assert!(report.errors.is_empty());
    assert_eq!(
        fx.sink.action_messages(),
        vec![
            format!(
                "File created: {} to {}",
                fx.source.join("a.txt").display(),
                fx.replica.join("a.txt").display()
            ),
            format!("Directory created: {}", fx.replica.join("sub").display()),
            format!(
                "File created: {} to {}",
                fx.source.join("sub/b.txt").display(),
                fx.replica.join("sub/b.txt").display()
            ),
        ]
    );
    assert_eq!(fs::read(fx.replica.join("sub/b.txt")).unwrap(), b"world");

    // Second pass: nothing to do, nothing logged
    fx.sink.clear();
    let report = engine.run_pass(&cancel).await;
    assert!(report.is_converged());
    assert!(fx.sink.records().is_empty());

    // Delete one source file: exactly one removal
    fs::remove_file(fx.source.join("sub/b.txt")).unwrap();
    let report = engine.run_pass(&cancel).await;
    assert_eq!(report.actions_taken(), 1);
    assert_eq!(report.files_removed, 1);
    assert_eq!(
        fx.sink.action_messages(),
        vec![format!("File removed: {}", fx.replica.join("sub/b.txt").display())]
    );
    assert!(fx.replica.join("sub").is_dir());
    assert_eq!(fs::read(fx.replica.join("a.txt")).unwrap(), b"hello");
}

#[tokio::test]
async fn test_changed_content_is_updated() {
    let fx = Fixture::new();
    fx.write_source("doc.txt", b"version one");
    let engine = fx.engine();
    let cancel = CancellationToken::new();
    engine.run_pass(&cancel).await;

    // Same length, different bytes
    fx.write_source("doc.txt", b"version two");
    fx.sink.clear();
    let report = engine.run_pass(&cancel).await;

    assert_eq!(report.files_updated, 1);
    assert_eq!(report.actions_taken(), 1);
    assert!(fx.sink.action_messages()[0].starts_with("File updated: "));
    assert_eq!(fs::read(fx.replica.join("doc.txt")).unwrap(), b"version two");
}

#[tokio::test]
async fn test_replica_edit_is_reverted() {
    let fx = Fixture::new();
    fx.write_source("x.txt", b"truth");
    let engine = fx.engine();
    let cancel = CancellationToken::new();
    engine.run_pass(&cancel).await;

    fx.write_replica("x.txt", b"tampered");
    let report = engine.run_pass(&cancel).await;

    assert_eq!(report.files_updated, 1);
    assert_eq!(fs::read(fx.replica.join("x.txt")).unwrap(), b"truth");
}

// ============================================================================
// Mirroring
// ============================================================================

#[tokio::test]
async fn test_full_mirror_of_nested_tree() {
    let fx = Fixture::new();
    fx.write_source("top.txt", b"top");
    fx.write_source("a/one.bin", &[0u8; 1000]);
    fx.write_source("a/b/two.txt", b"two");
    fx.write_source("a/b/c/three.txt", b"");
    fs::create_dir_all(fx.source.join("empty/dir")).unwrap();
    fx.write_replica("stale/junk.txt", b"junk");
    fx.write_replica("a/old.txt", b"old");

    let report = fx.engine().run_pass(&CancellationToken::new()).await;

    assert!(report.errors.is_empty(), "{:?}", report.errors);
    assert_eq!(snapshot(&fx.source).await, snapshot(&fx.replica).await);
}

#[tokio::test]
async fn test_extra_replica_directory_removed_once() {
    let fx = Fixture::new();
    fx.write_source("keep.txt", b"k");
    fx.write_replica("keep.txt", b"k");
    fx.write_replica("gone/deep/nested/file.txt", b"x");
    fx.write_replica("gone/other.txt", b"y");

    let report = fx.engine().run_pass(&CancellationToken::new()).await;

    // One recursive removal, no per-child actions
    assert_eq!(report.directories_removed, 1);
    assert_eq!(report.actions_taken(), 1);
    assert_eq!(
        fx.sink.action_messages(),
        vec![format!("Directory removed: {}", fx.replica.join("gone").display())]
    );
    assert!(!fx.replica.join("gone").exists());
}

#[tokio::test]
async fn test_replica_root_is_created_and_recreated() {
    let fx = Fixture::new();
    fx.write_source("f.txt", b"f");
    let engine = fx.engine();
    let cancel = CancellationToken::new();

    assert!(!fx.replica.exists());
    engine.run_pass(&cancel).await;
    assert!(fx.replica.is_dir());

    fs::remove_dir_all(&fx.replica).unwrap();
    let report = engine.run_pass(&cancel).await;
    assert_eq!(report.files_created, 1);
    assert!(fx.replica.join("f.txt").is_file());
}

// ============================================================================
// Type mismatch
// ============================================================================

#[tokio::test]
async fn test_source_file_replaces_replica_directory() {
    let fx = Fixture::new();
    fx.write_source("thing", b"now a file");
    fx.write_replica("thing/inside.txt", b"was a dir");

    let report = fx.engine().run_pass(&CancellationToken::new()).await;

    assert_eq!(report.directories_removed, 1);
    assert_eq!(report.files_created, 1);
    assert_eq!(report.files_updated, 0);
    assert_eq!(fs::read(fx.replica.join("thing")).unwrap(), b"now a file");
    let messages = fx.sink.action_messages();
    assert!(messages[0].starts_with("Directory removed: "));
    assert!(messages[1].starts_with("File created: "));
}

#[tokio::test]
async fn test_source_directory_replaces_replica_file() {
    let fx = Fixture::new();
    fx.write_source("thing/inside.txt", b"now a dir");
    fx.write_replica("thing", b"was a file");

    let report = fx.engine().run_pass(&CancellationToken::new()).await;

    assert_eq!(report.files_removed, 1);
    assert_eq!(report.directories_created, 1);
    assert_eq!(report.files_created, 1);
    assert!(report.errors.is_empty());
    assert!(fx.replica.join("thing").is_dir());
    assert_eq!(
        fs::read(fx.replica.join("thing/inside.txt")).unwrap(),
        b"now a dir"
    );
}

#[cfg(unix)]
#[tokio::test]
async fn test_replica_symlink_replaced_by_file() {
    let fx = Fixture::new();
    fx.write_source("link.txt", b"real content");
    fx.write_replica("target.txt", b"elsewhere");
    std::os::unix::fs::symlink(fx.replica.join("target.txt"), fx.replica.join("link.txt"))
        .unwrap();

    let report = fx.engine().run_pass(&CancellationToken::new()).await;

    assert!(report.errors.is_empty(), "{:?}", report.errors);
    let meta = fs::symlink_metadata(fx.replica.join("link.txt")).unwrap();
    assert!(meta.file_type().is_file());
    assert_eq!(fs::read(fx.replica.join("link.txt")).unwrap(), b"real content");
    // The link target was never touched through the link, only pruned
    assert!(!fx.replica.join("target.txt").exists());
}

#[cfg(unix)]
#[tokio::test]
async fn test_stray_replica_links_and_sockets_are_removed() {
    let fx = Fixture::new();
    let outside = fx.replica.parent().unwrap().join("outside");
    fs::create_dir_all(&outside).unwrap();
    fs::write(outside.join("keep.txt"), b"not ours").unwrap();
    fs::create_dir_all(fx.replica.join("sub")).unwrap();
    fx.write_source("sub/real.txt", b"real");
    std::os::unix::fs::symlink("../outside", fx.replica.join("stray")).unwrap();
    std::os::unix::fs::symlink("../outside", fx.replica.join("sub/nested")).unwrap();
    // A source link of the same name is skipped, so the replica link still goes
    std::os::unix::fs::symlink("sub/real.txt", fx.source.join("shared")).unwrap();
    std::os::unix::fs::symlink("sub/real.txt", fx.replica.join("shared")).unwrap();
    let socket = std::os::unix::net::UnixListener::bind(fx.replica.join("sock")).unwrap();
    let engine = fx.engine();
    let cancel = CancellationToken::new();

    let report = engine.run_pass(&cancel).await;

    assert!(report.errors.is_empty(), "{:?}", report.errors);
    assert_eq!(report.files_removed, 4);
    for name in ["stray", "sub/nested", "shared", "sock"] {
        assert!(
            fs::symlink_metadata(fx.replica.join(name)).is_err(),
            "{name} still present"
        );
    }
    assert_eq!(fs::read(outside.join("keep.txt")).unwrap(), b"not ours");
    assert_eq!(fs::read(fx.replica.join("sub/real.txt")).unwrap(), b"real");
    drop(socket);

    let again = engine.run_pass(&cancel).await;
    assert!(again.is_converged(), "{again:?}");
}

#[tokio::test]
async fn test_file_name_at_length_limit_is_mirrored() {
    let fx = Fixture::new();
    let name = "a".repeat(250);
    fx.write_source(&name, b"long name");
    let engine = fx.engine();
    let cancel = CancellationToken::new();

    let report = engine.run_pass(&cancel).await;

    assert!(report.errors.is_empty(), "{:?}", report.errors);
    assert_eq!(report.files_created, 1);
    assert_eq!(fs::read(fx.replica.join(&name)).unwrap(), b"long name");
    assert!(engine.run_pass(&cancel).await.is_converged());
}

#[tokio::test]
async fn test_names_resembling_copy_temporaries_converge() {
    let fx = Fixture::new();
    fx.write_source("x", b"payload");
    fx.write_source(".x.foldersync-tmp", b"a real file");
    fx.write_source(".foldersync-abc123.tmp", b"another real file");
    let engine = fx.engine();
    let cancel = CancellationToken::new();

    let first = engine.run_pass(&cancel).await;
    assert!(first.errors.is_empty(), "{:?}", first.errors);
    assert_eq!(first.files_created, 3);

    let second = engine.run_pass(&cancel).await;
    assert_eq!(second.actions_taken(), 0, "{:?}", fx.sink.action_messages());
    assert!(second.is_converged());
    assert_eq!(snapshot(&fx.source).await, snapshot(&fx.replica).await);
}

// ============================================================================
// Failure isolation
// ============================================================================

#[tokio::test]
async fn test_fingerprint_failure_does_not_stop_other_entries() {
    let fx = Fixture::new();
    fx.write_source("bad.txt", b"new bad");
    fx.write_source("good.txt", b"new good");
    fx.write_source("later/fresh.txt", b"fresh");
    fx.write_replica("bad.txt", b"old bad");
    fx.write_replica("good.txt", b"old good");

    let engine = fx.engine_with(Arc::new(FailingFingerprint {
        inner: LocalFileSystemAdapter::new(),
        file_name: "bad.txt",
    }));
    let report = engine.run_pass(&CancellationToken::new()).await;

    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("bad.txt"));
    assert_eq!(report.files_updated, 1);
    assert_eq!(report.files_created, 1);
    assert_eq!(fs::read(fx.replica.join("good.txt")).unwrap(), b"new good");
    assert_eq!(fs::read(fx.replica.join("bad.txt")).unwrap(), b"old bad");
    assert!(fx.replica.join("later/fresh.txt").is_file());

    // The error is reported through the log as well
    let errors = fx.sink.error_messages();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("Read error at "));
}

#[tokio::test]
async fn test_missing_source_root_keeps_replica() {
    let fx = Fixture::new();
    fx.write_source("a.txt", b"a");
    let engine = fx.engine();
    let cancel = CancellationToken::new();
    engine.run_pass(&cancel).await;

    fs::remove_dir_all(&fx.source).unwrap();
    let report = engine.run_pass(&cancel).await;

    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.actions_taken(), 0);
    assert!(fx.replica.join("a.txt").is_file());
}

// ============================================================================
// Startup and cancellation
// ============================================================================

#[tokio::test]
async fn test_prepare_creates_replica_root() {
    let fx = Fixture::new();
    fx.engine().prepare().await.unwrap();
    assert!(fx.replica.is_dir());
}

#[tokio::test]
async fn test_prepare_rejects_missing_source() {
    let fx = Fixture::new();
    fs::remove_dir(&fx.source).unwrap();

    let err = fx.engine().prepare().await.unwrap_err();
    assert!(matches!(err, SyncError::Startup(_)));
    assert!(err.is_fatal());
}

#[tokio::test]
async fn test_cancelled_token_means_no_actions() {
    let fx = Fixture::new();
    fx.write_source("a.txt", b"a");
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = fx.engine().run_pass(&cancel).await;

    assert!(report.cancelled);
    assert_eq!(report.actions_taken(), 0);
    assert!(fx.sink.records().is_empty());
    assert!(!fx.replica.exists());
}

//! One-way synchronization engine
//!
//! The [`SyncEngine`] runs one convergence pass that makes the replica tree
//! an exact mirror of the source tree.
//!
//! ## Pass Flow
//!
//! 1. **Forward pass** (create/update): walk the source; create missing
//!    directories, copy missing files, re-copy files whose fingerprints
//!    differ, replace entries of the wrong kind.
//! 2. **Reverse pass** (prune): walk the replica; remove every entry with no
//!    source counterpart of the same kind, plus every symlink and special
//!    file. Removed directories are not descended into.
//! 3. **Bookkeeping**: return a [`PassReport`] summary.
//!
//! ## Error Isolation
//!
//! A failure on one entry is reported through the [`ActionLog`], collected
//! in the report and the pass moves on. Nothing is retried before the next
//! pass.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use foldersync_audit::ActionLog;
use foldersync_core::config::Config;
use foldersync_core::domain::{ActionKind, CopyMode, EntryKind, Fingerprint, SyncAction};
use foldersync_core::ports::local_filesystem::ILocalFileSystem;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::scanner::{ScanEntry, TreeScanner};
use crate::SyncError;

// ============================================================================
// PassReport
// ============================================================================

/// Summary of one completed (or cancelled) pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Directories created in the replica
    pub directories_created: u32,
    /// Files copied to a path that had no replica file
    pub files_created: u32,
    /// Files re-copied because their fingerprints differed
    pub files_updated: u32,
    /// Replica directories removed recursively
    pub directories_removed: u32,
    /// Replica files removed
    pub files_removed: u32,
    /// Per-entry errors (non-fatal)
    pub errors: Vec<String>,
    /// Wall-clock duration of the pass in milliseconds
    pub duration_ms: u64,
    /// Whether cancellation cut the pass short
    pub cancelled: bool,
}

impl PassReport {
    /// Total number of actions applied
    pub fn actions_taken(&self) -> u32 {
        self.directories_created
            + self.files_created
            + self.files_updated
            + self.directories_removed
            + self.files_removed
    }

    /// True when the replica already matched: no actions, no errors
    pub fn is_converged(&self) -> bool {
        self.actions_taken() == 0 && self.errors.is_empty() && !self.cancelled
    }

    fn count(&mut self, kind: ActionKind) {
        match kind {
            ActionKind::DirectoryCreated => self.directories_created += 1,
            ActionKind::FileCreated => self.files_created += 1,
            ActionKind::FileUpdated => self.files_updated += 1,
            ActionKind::DirectoryRemoved => self.directories_removed += 1,
            ActionKind::FileRemoved => self.files_removed += 1,
        }
    }
}

// ============================================================================
// LoopState
// ============================================================================

/// Lifecycle of the sync loop, published on a watch channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Constructed, no pass started yet
    Idle,
    /// Walking a tree and comparing entries
    Scanning,
    /// Applying an action to the replica
    Acting,
    /// Waiting for the next pass
    Sleeping,
    /// The loop has exited
    Stopped,
}

// ============================================================================
// SyncEngine
// ============================================================================

/// One-way mirroring engine
///
/// ## Dependencies
///
/// - `filesystem`: probing, fingerprinting, copying and removal
/// - `log`: dual-sink reporting of actions and caught errors
pub struct SyncEngine {
    source: PathBuf,
    replica: PathBuf,
    filesystem: Arc<dyn ILocalFileSystem>,
    log: ActionLog,
    state: watch::Sender<LoopState>,
}

impl SyncEngine {
    /// Creates a new `SyncEngine` mirroring `source` into `replica`
    pub fn new(
        source: impl Into<PathBuf>,
        replica: impl Into<PathBuf>,
        filesystem: Arc<dyn ILocalFileSystem>,
        log: ActionLog,
    ) -> Self {
        let (state, _) = watch::channel(LoopState::Idle);
        Self {
            source: source.into(),
            replica: replica.into(),
            filesystem,
            log,
            state,
        }
    }

    /// Creates an engine for the roots named in `config`
    pub fn from_config(
        config: &Config,
        filesystem: Arc<dyn ILocalFileSystem>,
        log: ActionLog,
    ) -> Self {
        Self::new(
            config.sync.source.clone(),
            config.sync.replica.clone(),
            filesystem,
            log,
        )
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn replica(&self) -> &Path {
        &self.replica
    }

    /// Current lifecycle state
    pub fn state(&self) -> LoopState {
        *self.state.borrow()
    }

    /// Receiver that observes every lifecycle transition
    pub fn subscribe(&self) -> watch::Receiver<LoopState> {
        self.state.subscribe()
    }

    pub(crate) fn set_state(&self, state: LoopState) {
        self.state.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }

    /// Startup checks: the source is a directory, the replica root exists
    ///
    /// # Errors
    /// Returns `SyncError::Startup`; the caller should exit.
    pub async fn prepare(&self) -> Result<(), SyncError> {
        match tokio::fs::metadata(&self.source).await {
            Ok(m) if m.is_dir() => {}
            Ok(_) => {
                return Err(SyncError::Startup(format!(
                    "source {} is not a directory",
                    self.source.display()
                )))
            }
            Err(e) => {
                return Err(SyncError::Startup(format!(
                    "source {} is not accessible: {e}",
                    self.source.display()
                )))
            }
        }

        self.filesystem
            .create_directory(&self.replica)
            .await
            .map_err(|e| SyncError::Startup(format!("{e:#}")))?;

        info!(
            source = %self.source.display(),
            replica = %self.replica.display(),
            "Sync engine ready"
        );
        Ok(())
    }

    // ========================================================================
    // run_pass()
    // ========================================================================

    /// Runs one forward + reverse pass
    ///
    /// Never fails: per-entry errors end up in [`PassReport::errors`].
    /// `cancel` is checked before every entry; a cancelled pass stops
    /// between entries and never inside a copy.
    #[tracing::instrument(skip(self, cancel), fields(source = %self.source.display()))]
    pub async fn run_pass(&self, cancel: &CancellationToken) -> PassReport {
        let start = Instant::now();
        let mut report = PassReport::default();

        if cancel.is_cancelled() {
            report.cancelled = true;
            return report;
        }

        self.set_state(LoopState::Scanning);
        debug!("Starting sync pass");

        // The replica root may have been removed since the last pass
        match self.filesystem.create_directory(&self.replica).await {
            Ok(()) => {
                let source_scanned = self.forward_pass(cancel, &mut report).await;
                // An unreadable source root must not be mistaken for an empty one
                if source_scanned && !report.cancelled {
                    self.reverse_pass(cancel, &mut report).await;
                }
            }
            Err(e) => self.record_error(
                &mut report,
                SyncError::Write {
                    path: self.replica.clone(),
                    message: format!("{e:#}"),
                },
            ),
        }

        report.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            dirs_created = report.directories_created,
            files_created = report.files_created,
            files_updated = report.files_updated,
            dirs_removed = report.directories_removed,
            files_removed = report.files_removed,
            errors = report.errors.len(),
            cancelled = report.cancelled,
            duration_ms = report.duration_ms,
            "Sync pass completed"
        );

        report
    }

    // ========================================================================
    // Forward pass
    // ========================================================================

    /// Returns false if the source root itself could not be scanned
    async fn forward_pass(&self, cancel: &CancellationToken, report: &mut PassReport) -> bool {
        let mut scanner = match TreeScanner::new(&self.source) {
            Ok(scanner) => scanner,
            Err(e) => {
                self.record_error(report, e);
                return false;
            }
        };

        while let Some(item) = scanner.next() {
            if cancel.is_cancelled() {
                debug!("Forward pass cancelled");
                report.cancelled = true;
                return true;
            }

            let entry = match item {
                Ok(entry) => entry,
                Err(e) => {
                    self.record_error(report, e);
                    continue;
                }
            };

            let destination = entry.relative.join_onto(&self.replica);
            let outcome = match entry.kind {
                EntryKind::Directory => self.sync_directory(&entry, &destination, report).await,
                EntryKind::File => self.sync_file(&entry, &destination, report).await,
                EntryKind::Symlink | EntryKind::Special => Ok(()),
            };

            if let Err(e) = outcome {
                // Children cannot be placed under a directory we failed to make
                if entry.kind.is_dir() {
                    scanner.skip_subtree();
                }
                self.record_error(report, e);
            }
        }

        true
    }

    async fn sync_directory(
        &self,
        entry: &ScanEntry,
        destination: &Path,
        report: &mut PassReport,
    ) -> Result<(), SyncError> {
        let create = SyncAction::CreateDir {
            relative: entry.relative.clone(),
            path: destination.to_path_buf(),
        };

        match self.kind_at(destination).await? {
            Some(EntryKind::Directory) => Ok(()),
            None => self.execute(create, report).await,
            Some(EntryKind::File | EntryKind::Symlink | EntryKind::Special) => {
                let remove = SyncAction::RemoveFile {
                    relative: entry.relative.clone(),
                    path: destination.to_path_buf(),
                };
                self.execute(remove, report).await?;
                self.execute(create, report).await
            }
        }
    }

    async fn sync_file(
        &self,
        entry: &ScanEntry,
        destination: &Path,
        report: &mut PassReport,
    ) -> Result<(), SyncError> {
        let mode = match self.kind_at(destination).await? {
            None => CopyMode::Create,
            Some(EntryKind::File) => {
                let source_fp = self.fingerprint(&entry.path).await?;
                let replica_fp = self.fingerprint(destination).await?;
                if source_fp == replica_fp {
                    debug!(path = %entry.relative, "unchanged");
                    return Ok(());
                }
                CopyMode::Update
            }
            Some(EntryKind::Directory) => {
                let remove = SyncAction::RemoveDir {
                    relative: entry.relative.clone(),
                    path: destination.to_path_buf(),
                };
                self.execute(remove, report).await?;
                CopyMode::Create
            }
            Some(EntryKind::Symlink | EntryKind::Special) => {
                let remove = SyncAction::RemoveFile {
                    relative: entry.relative.clone(),
                    path: destination.to_path_buf(),
                };
                self.execute(remove, report).await?;
                CopyMode::Create
            }
        };

        let copy = SyncAction::CopyFile {
            relative: entry.relative.clone(),
            source: entry.path.clone(),
            destination: destination.to_path_buf(),
            mode,
        };
        self.execute(copy, report).await
    }

    // ========================================================================
    // Reverse pass
    // ========================================================================

    async fn reverse_pass(&self, cancel: &CancellationToken, report: &mut PassReport) {
        let mut scanner = match TreeScanner::new(&self.replica) {
            Ok(scanner) => scanner.include_unmirrored(),
            Err(e) => {
                self.record_error(report, e);
                return;
            }
        };

        while let Some(item) = scanner.next() {
            if cancel.is_cancelled() {
                debug!("Reverse pass cancelled");
                report.cancelled = true;
                return;
            }

            let entry = match item {
                Ok(entry) => entry,
                Err(e) => {
                    self.record_error(report, e);
                    continue;
                }
            };

            // Links and special files never have a mirrored counterpart
            if entry.kind.is_mirrored() {
                let counterpart = entry.relative.join_onto(&self.source);
                let source_kind = match self.kind_at(&counterpart).await {
                    Ok(kind) => kind,
                    Err(e) => {
                        // Unknown source state: leave the replica entry alone
                        if entry.kind.is_dir() {
                            scanner.skip_subtree();
                        }
                        self.record_error(report, e);
                        continue;
                    }
                };

                if source_kind == Some(entry.kind) {
                    continue;
                }
            }

            let action = if entry.kind.is_dir() {
                scanner.skip_subtree();
                SyncAction::RemoveDir {
                    relative: entry.relative,
                    path: entry.path,
                }
            } else {
                SyncAction::RemoveFile {
                    relative: entry.relative,
                    path: entry.path,
                }
            };

            if let Err(e) = self.execute(action, report).await {
                self.record_error(report, e);
            }
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn kind_at(&self, path: &Path) -> Result<Option<EntryKind>, SyncError> {
        self.filesystem
            .entry_kind(path)
            .await
            .map_err(|e| SyncError::Read {
                path: path.to_path_buf(),
                message: format!("{e:#}"),
            })
    }

    async fn fingerprint(&self, path: &Path) -> Result<Fingerprint, SyncError> {
        self.filesystem
            .fingerprint(path)
            .await
            .map_err(|e| SyncError::Read {
                path: path.to_path_buf(),
                message: format!("{e:#}"),
            })
    }

    /// Applies one action, then counts and reports it
    async fn execute(&self, action: SyncAction, report: &mut PassReport) -> Result<(), SyncError> {
        self.set_state(LoopState::Acting);

        let result = match &action {
            SyncAction::CreateDir { path, .. } => self.filesystem.create_directory(path).await,
            SyncAction::CopyFile {
                source,
                destination,
                ..
            } => self.filesystem.copy_file(source, destination).await,
            SyncAction::RemoveDir { path, .. } => self.filesystem.remove_directory(path).await,
            SyncAction::RemoveFile { path, .. } => self.filesystem.remove_file(path).await,
        };

        self.set_state(LoopState::Scanning);

        match result {
            Ok(()) => {
                debug!(kind = %action.kind(), path = %action.relative(), "action applied");
                report.count(action.kind());
                self.log.record_action(&action);
                Ok(())
            }
            Err(e) => Err(SyncError::Write {
                path: action.target().to_path_buf(),
                message: format!("{e:#}"),
            }),
        }
    }

    fn record_error(&self, report: &mut PassReport, error: SyncError) {
        let message = error.to_string();
        warn!(error = %message, "Entry skipped for this pass");
        self.log.record_error(message.clone());
        report.errors.push(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_report_default() {
        let report = PassReport::default();
        assert_eq!(report.actions_taken(), 0);
        assert!(report.errors.is_empty());
        assert!(report.is_converged());
    }

    #[test]
    fn test_pass_report_counts_each_kind() {
        let mut report = PassReport::default();
        report.count(ActionKind::DirectoryCreated);
        report.count(ActionKind::FileCreated);
        report.count(ActionKind::FileCreated);
        report.count(ActionKind::FileUpdated);
        report.count(ActionKind::DirectoryRemoved);
        report.count(ActionKind::FileRemoved);

        assert_eq!(report.files_created, 2);
        assert_eq!(report.actions_taken(), 6);
        assert!(!report.is_converged());
    }

    #[test]
    fn test_errors_break_convergence() {
        let report = PassReport {
            errors: vec!["boom".into()],
            ..Default::default()
        };
        assert!(!report.is_converged());
    }
}

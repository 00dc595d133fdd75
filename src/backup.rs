// backup.rs — one backup copy per mutated file, restore on failure.
//
// All in-flight backups live in an explicit map owned by the ledger, so
// two sequential pipeline runs can never leak state between them. The
// swap is copy-then-delete, not an atomic rename: a process kill between
// the copy and the delete can leave a stray `.nestauth.bak` sidecar next
// to the original. That residue is accepted and documented rather than
// masked with extra locking.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;

/// Suffix appended to the original file name for the backup sidecar.
pub const BACKUP_SUFFIX: &str = ".nestauth.bak";

#[derive(Debug)]
struct BackupRecord {
    /// Path of the sidecar copy; `None` when the original did not exist
    /// before the mutation (rollback then means delete-on-failure).
    backup: Option<PathBuf>,
}

/// Tracks one backup per path. Exactly one active record per path at any
/// time; a second `begin` for a path already in flight is a no-op, so the
/// earliest backup (the true pre-mutation state) always wins.
#[derive(Debug, Default)]
pub struct BackupLedger {
    records: HashMap<PathBuf, BackupRecord>,
}

fn sidecar_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(BACKUP_SUFFIX);
    path.with_file_name(name)
}

impl BackupLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_tracking(&self, path: &Path) -> bool {
        self.records.contains_key(path)
    }

    /// Take a backup of `path` before its first mutation. If the file does
    /// not exist yet, records "no prior file" so a rollback deletes it.
    pub async fn begin(&mut self, path: &Path) -> Result<()> {
        if self.records.contains_key(path) {
            return Ok(());
        }
        let backup = if path.exists() {
            let sidecar = sidecar_path(path);
            tokio::fs::copy(path, &sidecar).await?;
            debug!(path = %path.display(), backup = %sidecar.display(), "backup taken");
            Some(sidecar)
        } else {
            debug!(path = %path.display(), "no prior file; rollback will delete");
            None
        };
        self.records.insert(path.to_path_buf(), BackupRecord { backup });
        Ok(())
    }

    /// Mutation of `path` succeeded: delete the sidecar, forget the record.
    pub async fn commit(&mut self, path: &Path) -> Result<()> {
        if let Some(record) = self.records.remove(path) {
            if let Some(backup) = record.backup {
                tokio::fs::remove_file(&backup).await?;
            }
        }
        Ok(())
    }

    /// Mutation of `path` failed: restore the pre-mutation content, or
    /// delete the file if it was newly created.
    pub async fn rollback(&mut self, path: &Path) -> Result<()> {
        let Some(record) = self.records.remove(path) else {
            return Ok(());
        };
        match record.backup {
            Some(backup) => {
                tokio::fs::copy(&backup, path).await?;
                tokio::fs::remove_file(&backup).await?;
                debug!(path = %path.display(), "restored from backup");
            }
            None => {
                if path.exists() {
                    tokio::fs::remove_file(path).await?;
                    debug!(path = %path.display(), "deleted newly created file");
                }
            }
        }
        Ok(())
    }

    /// Restore every backup taken since the last `cleanup_all` and delete
    /// every newly created file. Keeps going past individual IO errors so
    /// one unreadable sidecar cannot strand the rest; the first error is
    /// reported after all restores were attempted.
    pub async fn rollback_all(&mut self) -> Result<()> {
        let paths: Vec<PathBuf> = self.records.keys().cloned().collect();
        let mut first_err = None;
        for path in paths {
            if let Err(e) = self.rollback(&path).await {
                tracing::warn!(path = %path.display(), err = %e, "rollback failed");
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Discard all backups, keeping the new file contents.
    pub async fn cleanup_all(&mut self) -> Result<()> {
        let paths: Vec<PathBuf> = self.records.keys().cloned().collect();
        for path in paths {
            self.commit(&path).await?;
        }
        Ok(())
    }
}

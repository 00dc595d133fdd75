// writer.rs — conflict-checked writes and the safe-mutation funnel.
//
// Every filesystem write of a generation run goes through `ProjectWriter`:
// template-generated files via `write`, the two AST-mutated source files
// via `mutate_source`, and the manifest via `mutate_text`. The writer owns
// the backup ledger, so a failure at any step can restore the target
// project exactly as it was found (`rollback_all`), and success discards
// the backups in one sweep (`cleanup_all`).

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::backup::BackupLedger;
use crate::error::{Result, ScaffoldError};
use crate::rewrite::SourceModel;

/// How `write` treats a pre-existing target file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Fail with `FileExists` — the expected, reportable condition for
    /// "don't clobber a user's prior generation".
    Fresh,
    /// Back the file up, then replace it.
    Overwrite,
    /// Leave the file alone and record it as skipped.
    SkipExisting,
}

#[derive(Debug, Default)]
pub struct ProjectWriter {
    ledger: BackupLedger,
    written: Vec<PathBuf>,
    skipped: Vec<PathBuf>,
    modified: Vec<PathBuf>,
}

impl ProjectWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    pub fn skipped(&self) -> &[PathBuf] {
        &self.skipped
    }

    pub fn modified(&self) -> &[PathBuf] {
        &self.modified
    }

    /// Write a generated file. Returns `Ok(true)` when the file was
    /// written, `Ok(false)` when an existing file was tolerated under
    /// `SkipExisting`.
    pub async fn write(&mut self, path: &Path, content: &str, mode: WriteMode) -> Result<bool> {
        if path.exists() {
            match mode {
                WriteMode::Fresh => {
                    return Err(ScaffoldError::FileExists(path.to_path_buf()));
                }
                WriteMode::SkipExisting => {
                    self.skipped.push(path.to_path_buf());
                    return Ok(false);
                }
                WriteMode::Overwrite => {}
            }
        }
        self.ledger.begin(path).await?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, content).await?;
        debug!(path = %path.display(), "wrote generated file");
        self.written.push(path.to_path_buf());
        Ok(true)
    }

    /// Load `path` as a source model, apply `edit`, and save — wrapped in
    /// backup/restore-on-error. The file on disk is either fully the old
    /// version or fully the new one; no partial save is observable.
    pub async fn mutate_source<F>(&mut self, path: &Path, edit: F) -> Result<()>
    where
        F: FnOnce(&mut SourceModel) -> Result<()>,
    {
        self.ledger.begin(path).await?;
        let result = async {
            let mut model = SourceModel::load(path).await?;
            edit(&mut model)?;
            model.save().await
        }
        .await;
        match result {
            Ok(()) => {
                self.modified.push(path.to_path_buf());
                Ok(())
            }
            Err(e) => {
                if let Err(restore_err) = self.ledger.rollback(path).await {
                    tracing::warn!(
                        path = %path.display(),
                        err = %restore_err,
                        "rollback after failed mutation also failed"
                    );
                }
                Err(e)
            }
        }
    }

    /// Same contract as `mutate_source` for non-source text files (the
    /// dependency manifest).
    pub async fn mutate_text<F>(&mut self, path: &Path, edit: F) -> Result<()>
    where
        F: FnOnce(&str) -> Result<String>,
    {
        if !path.exists() {
            return Err(ScaffoldError::NotFound(path.to_path_buf()));
        }
        self.ledger.begin(path).await?;
        let result = async {
            let old = tokio::fs::read_to_string(path).await?;
            let new = edit(&old)?;
            tokio::fs::write(path, new).await?;
            Ok(())
        }
        .await;
        match result {
            Ok(()) => {
                self.modified.push(path.to_path_buf());
                Ok(())
            }
            Err(e) => {
                if let Err(restore_err) = self.ledger.rollback(path).await {
                    tracing::warn!(
                        path = %path.display(),
                        err = %restore_err,
                        "rollback after failed manifest edit also failed"
                    );
                }
                Err(e)
            }
        }
    }

    /// Restore every backup taken in this run and delete every newly
    /// created file — generation is all-or-nothing from the caller's view.
    pub async fn rollback_all(&mut self) -> Result<()> {
        self.written.clear();
        self.modified.clear();
        self.ledger.rollback_all().await
    }

    /// Discard all backups, keeping the new files.
    pub async fn cleanup_all(&mut self) -> Result<()> {
        self.ledger.cleanup_all().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewrite::imports::ensure_import;
    use tempfile::TempDir;

    #[tokio::test]
    async fn conflict_without_overwrite_never_writes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("auth.module.ts");
        tokio::fs::write(&path, "user content").await.unwrap();
        let mtime = std::fs::metadata(&path).unwrap().modified().unwrap();

        let mut w = ProjectWriter::new();
        let err = w.write(&path, "generated", WriteMode::Fresh).await;
        assert!(matches!(err, Err(ScaffoldError::FileExists(_))));
        assert_eq!(
            tokio::fs::read_to_string(&path).await.unwrap(),
            "user content"
        );
        assert_eq!(std::fs::metadata(&path).unwrap().modified().unwrap(), mtime);
        assert!(w.written().is_empty());
    }

    #[tokio::test]
    async fn overwrite_backs_up_then_replaces() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("auth.module.ts");
        tokio::fs::write(&path, "old").await.unwrap();

        let mut w = ProjectWriter::new();
        w.write(&path, "new", WriteMode::Overwrite).await.unwrap();
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "new");

        w.rollback_all().await.unwrap();
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "old");
    }

    #[tokio::test]
    async fn skip_existing_records_skip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("x.ts");
        tokio::fs::write(&path, "keep").await.unwrap();

        let mut w = ProjectWriter::new();
        let wrote = w.write(&path, "new", WriteMode::SkipExisting).await.unwrap();
        assert!(!wrote);
        assert_eq!(w.skipped(), [path.clone()]);
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "keep");
    }

    #[tokio::test]
    async fn write_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("src/auth/guards/jwt-auth.guard.ts");

        let mut w = ProjectWriter::new();
        w.write(&path, "content", WriteMode::Fresh).await.unwrap();
        assert!(path.exists());
        assert_eq!(w.written(), [path]);
    }

    #[tokio::test]
    async fn failed_mutation_restores_byte_for_byte() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.module.ts");
        let original = "@Module({})\nexport class AppModule {}\n";
        tokio::fs::write(&path, original).await.unwrap();

        let mut w = ProjectWriter::new();
        let err = w
            .mutate_source(&path, |model| {
                // Mutate, then fail — the half-edited model must never land.
                ensure_import(model, "./auth/auth.module", &["AuthModule"])?;
                Err(ScaffoldError::structure(model.path(), "forced failure"))
            })
            .await;
        assert!(err.is_err());
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), original);
        assert!(w.modified().is_empty());
    }

    #[tokio::test]
    async fn successful_mutation_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.module.ts");
        tokio::fs::write(&path, "@Module({})\nexport class AppModule {}\n")
            .await
            .unwrap();

        let mut w = ProjectWriter::new();
        w.mutate_source(&path, |model| {
            ensure_import(model, "./auth/auth.module", &["AuthModule"])
        })
        .await
        .unwrap();
        w.cleanup_all().await.unwrap();

        let text = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(text.contains("AuthModule"));
        assert_eq!(w.modified().len(), 1);
    }

    #[tokio::test]
    async fn bulk_rollback_covers_writes_and_mutations() {
        let dir = TempDir::new().unwrap();
        let module = dir.path().join("app.module.ts");
        let generated = dir.path().join("auth/auth.module.ts");
        let original = "@Module({})\nexport class AppModule {}\n";
        tokio::fs::write(&module, original).await.unwrap();

        let mut w = ProjectWriter::new();
        w.write(&generated, "generated", WriteMode::Fresh).await.unwrap();
        w.mutate_source(&module, |model| {
            ensure_import(model, "./auth/auth.module", &["AuthModule"])
        })
        .await
        .unwrap();

        w.rollback_all().await.unwrap();
        assert!(!generated.exists());
        assert_eq!(tokio::fs::read_to_string(&module).await.unwrap(), original);
    }
}

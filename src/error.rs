// error.rs — the error taxonomy for the generation pipeline.
//
// Every mutating component raises one of these synchronously; the pipeline
// is the only place that decides "roll back and abort" vs. "warn and
// continue". Nothing here is retried automatically — a retry is a human
// re-running the CLI.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScaffoldError {
    /// The target directory is not a usable NestJS project. Reported before
    /// the pipeline starts; nothing has been written when this fires.
    #[error("not a valid NestJS project:\n{}", .0.join("\n"))]
    Validation(Vec<String>),

    /// A generated file already exists and overwrite was not authorized.
    /// In bulk generation this aborts the whole plan (all-or-nothing).
    #[error("file already exists: {0} (pass --overwrite to replace it)")]
    FileExists(PathBuf),

    /// An expected class, decorator, function or property was not found, or
    /// had a shape the rewriter does not recognize. The rewriter fails
    /// closed rather than guessing.
    #[error("unexpected structure in {path}: {detail}")]
    Structure { path: PathBuf, detail: String },

    /// The file could not be read as syntactically plausible TypeScript
    /// (unterminated string/comment, unbalanced brackets).
    #[error("could not parse {path}: {detail}")]
    Parse { path: PathBuf, detail: String },

    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// package.json was missing, unreadable, or not a JSON object.
    #[error("invalid manifest: {0}")]
    Manifest(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ScaffoldError>;

impl ScaffoldError {
    /// Convenience constructor used throughout the rewriter.
    pub fn structure(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        Self::Structure {
            path: path.into(),
            detail: detail.into(),
        }
    }

    pub fn parse(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            detail: detail.into(),
        }
    }
}

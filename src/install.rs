// install.rs — optional dependency install after a successful generation.
//
// Install failure is a warning, never a rollback: the generated files and
// the updated manifest are already consistent, the user just runs the
// install by hand.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Detected from the lockfile in the project root; npm is the fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    Npm,
    Yarn,
    Pnpm,
    Bun,
}

impl PackageManager {
    pub fn detect(root: &Path) -> Self {
        if root.join("pnpm-lock.yaml").exists() {
            PackageManager::Pnpm
        } else if root.join("yarn.lock").exists() {
            PackageManager::Yarn
        } else if root.join("bun.lockb").exists() || root.join("bun.lock").exists() {
            PackageManager::Bun
        } else {
            PackageManager::Npm
        }
    }

    pub fn command(self) -> &'static str {
        match self {
            PackageManager::Npm => "npm",
            PackageManager::Yarn => "yarn",
            PackageManager::Pnpm => "pnpm",
            PackageManager::Bun => "bun",
        }
    }

    fn install_args(self) -> &'static [&'static str] {
        match self {
            PackageManager::Npm => &["install"],
            PackageManager::Yarn => &["install"],
            PackageManager::Pnpm => &["install"],
            PackageManager::Bun => &["install"],
        }
    }
}

impl std::fmt::Display for PackageManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.command())
    }
}

/// Run the package manager's install in `root`. Returns a warning string
/// instead of an error when anything goes wrong.
pub async fn run_install(pm: PackageManager, root: &Path) -> Option<String> {
    info!(pm = %pm, root = %root.display(), "installing dependencies");
    let result = tokio::process::Command::new(pm.command())
        .args(pm.install_args())
        .current_dir(root)
        .output()
        .await;
    match result {
        Ok(out) if out.status.success() => None,
        Ok(out) => {
            let stderr = String::from_utf8_lossy(&out.stderr);
            let tail = stderr_tail(&stderr);
            warn!(pm = %pm, status = ?out.status.code(), "install failed");
            Some(format!(
                "`{pm} install` exited with {:?}: {tail}",
                out.status.code()
            ))
        }
        Err(e) => {
            warn!(pm = %pm, err = %e, "could not spawn package manager");
            Some(format!("could not run `{pm} install`: {e}"))
        }
    }
}

/// Last five stderr lines, oldest first, on one line.
fn stderr_tail(stderr: &str) -> String {
    let mut tail: Vec<&str> = stderr.lines().rev().take(5).collect();
    tail.reverse();
    tail.join("; ")
}

//! doctor.rs — pre-flight diagnostic checks for `nestauth doctor`.
//!
//! Self-contained: runs before anything is generated, so it can catch
//! environment problems before they cause a confusing mid-run failure.

use std::path::Path;
use std::process::Command;

use crate::install::PackageManager;

/// The result of a single diagnostic check.
pub struct CheckResult {
    pub name: &'static str,
    pub passed: bool,
    pub detail: String,
}

/// Run all diagnostic checks against the project at `root`.
pub async fn run_doctor(root: &Path) -> Vec<CheckResult> {
    vec![
        check_node_installed(),
        check_package_manager(root),
        check_project(root).await,
    ]
}

// ─── Individual checks ────────────────────────────────────────────────────────

/// Check 1: `node` is installed and on PATH.
fn check_node_installed() -> CheckResult {
    match Command::new("node").arg("--version").output() {
        Ok(out) if out.status.success() => CheckResult {
            name: "node installed",
            passed: true,
            detail: String::from_utf8_lossy(&out.stdout).trim().to_string(),
        },
        _ => CheckResult {
            name: "node installed",
            passed: false,
            detail: "not found in PATH".to_string(),
        },
    }
}

/// Check 2: the lockfile's package manager is on PATH.
fn check_package_manager(root: &Path) -> CheckResult {
    let pm = PackageManager::detect(root);
    match Command::new(pm.command()).arg("--version").output() {
        Ok(out) if out.status.success() => CheckResult {
            name: "package manager installed",
            passed: true,
            detail: format!(
                "{} {}",
                pm.command(),
                String::from_utf8_lossy(&out.stdout).trim()
            ),
        },
        _ => CheckResult {
            name: "package manager installed",
            passed: false,
            detail: format!("`{}` not found in PATH", pm.command()),
        },
    }
}

/// Check 3: the target directory probes as a valid NestJS project.
async fn check_project(root: &Path) -> CheckResult {
    match crate::project::probe(root).await {
        Ok(probe) => {
            let detail = if probe.auth_present {
                format!(
                    "{} at {} (auth already present)",
                    probe.name,
                    root.display()
                )
            } else {
                format!("{} at {}", probe.name, root.display())
            };
            CheckResult {
                name: "NestJS project",
                passed: true,
                detail,
            }
        }
        Err(e) => CheckResult {
            name: "NestJS project",
            passed: false,
            detail: e.to_string(),
        },
    }
}

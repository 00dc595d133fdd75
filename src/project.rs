// project.rs — probing the target project before a single byte is written.
//
// The probe reads `package.json` and `nest-cli.json`, locates the two
// files the rewriter will touch, and sniffs the dependency set for an ORM,
// a datastore driver, and signs of an existing auth setup. Every problem
// is collected; an invalid project is reported with the full list in one
// `Validation` error rather than failing on the first finding.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::{Datastore, Orm};
use crate::error::{Result, ScaffoldError};
use crate::install::PackageManager;

#[derive(Debug, Clone, Serialize)]
pub struct ProjectProbe {
    pub root: PathBuf,
    pub name: String,
    /// Relative source root, from `nest-cli.json` or the `src` default.
    pub source_root: String,
    pub module_file: PathBuf,
    pub main_file: PathBuf,
    pub package_manager: PackageManager,
    pub orm: Option<Orm>,
    pub datastore: Option<Datastore>,
    /// An `auth/` directory or passport/jwt packages already exist.
    pub auth_present: bool,
    pub warnings: Vec<String>,
}

fn dependency_names(pkg: &Value) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for key in ["dependencies", "devDependencies"] {
        if let Some(map) = pkg.get(key).and_then(Value::as_object) {
            names.extend(map.keys().cloned());
        }
    }
    names
}

fn detect_orm(deps: &BTreeSet<String>) -> Option<Orm> {
    if deps.contains("@nestjs/typeorm") || deps.contains("typeorm") {
        Some(Orm::TypeOrm)
    } else if deps.contains("@nestjs/mongoose") || deps.contains("mongoose") {
        Some(Orm::Mongoose)
    } else if deps.contains("@prisma/client") || deps.contains("prisma") {
        Some(Orm::Prisma)
    } else {
        None
    }
}

fn detect_datastore(deps: &BTreeSet<String>) -> Option<Datastore> {
    if deps.contains("pg") {
        Some(Datastore::Postgres)
    } else if deps.contains("mysql2") || deps.contains("mysql") {
        Some(Datastore::Mysql)
    } else if deps.contains("better-sqlite3") || deps.contains("sqlite3") {
        Some(Datastore::Sqlite)
    } else if deps.contains("mongodb") || deps.contains("mongoose") {
        Some(Datastore::Mongo)
    } else {
        None
    }
}

/// Probe `root`. Returns `Validation` with every problem found when the
/// directory is not a usable NestJS project.
pub async fn probe(root: &Path) -> Result<ProjectProbe> {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let pkg_path = root.join("package.json");
    let pkg: Value = match tokio::fs::read_to_string(&pkg_path).await {
        Ok(text) => match serde_json::from_str(&text) {
            Ok(v) => v,
            Err(e) => {
                return Err(ScaffoldError::Validation(vec![format!(
                    "package.json is not valid JSON: {e}"
                )]));
            }
        },
        Err(_) => {
            return Err(ScaffoldError::Validation(vec![format!(
                "no package.json at {}",
                root.display()
            )]));
        }
    };

    let name = pkg
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or("app")
        .to_string();
    let deps = dependency_names(&pkg);
    if !deps.contains("@nestjs/core") {
        errors.push("package.json has no @nestjs/core dependency; not a NestJS project".into());
    }

    let source_root = match tokio::fs::read_to_string(root.join("nest-cli.json")).await {
        Ok(text) => serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|v| v.get("sourceRoot").and_then(Value::as_str).map(String::from))
            .unwrap_or_else(|| "src".to_string()),
        Err(_) => "src".to_string(),
    };

    let src_dir = root.join(&source_root);
    let module_file = src_dir.join("app.module.ts");
    let main_file = src_dir.join("main.ts");
    if !module_file.exists() {
        errors.push(format!("missing {}", module_file.display()));
    }
    if !main_file.exists() {
        errors.push(format!("missing {}", main_file.display()));
    }

    let auth_present = src_dir.join("auth").is_dir()
        || deps.contains("@nestjs/passport")
        || deps.contains("@nestjs/jwt");
    if auth_present {
        warnings.push(
            "project already has authentication packages or an auth/ directory".to_string(),
        );
    }

    if !errors.is_empty() {
        return Err(ScaffoldError::Validation(errors));
    }

    let probe = ProjectProbe {
        root: root.to_path_buf(),
        name,
        source_root,
        module_file,
        main_file,
        package_manager: PackageManager::detect(root),
        orm: detect_orm(&deps),
        datastore: detect_datastore(&deps),
        auth_present,
        warnings,
    };
    debug!(
        name = %probe.name,
        source_root = %probe.source_root,
        orm = ?probe.orm,
        datastore = ?probe.datastore,
        pm = %probe.package_manager,
        "project probe complete"
    );
    Ok(probe)
}

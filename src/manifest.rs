// manifest.rs — merging the dependency set into package.json.
//
// Insert-if-absent only: a version the user already pinned always wins,
// whatever range the catalog would have chosen. Key order of the user's
// manifest is preserved (serde_json with preserve_order); new entries are
// appended at the end of their block.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::debug;

use crate::config::{AuthStrategy, GenerationConfig, Orm};
use crate::error::{Result, ScaffoldError};

/// Runtime and dev dependencies required by a configuration.
#[derive(Debug, Clone, Default)]
pub struct DependencySet {
    pub dependencies: BTreeMap<&'static str, &'static str>,
    pub dev_dependencies: BTreeMap<&'static str, &'static str>,
}

pub fn dependency_set(config: &GenerationConfig) -> DependencySet {
    let mut set = DependencySet::default();
    let deps = &mut set.dependencies;
    let dev = &mut set.dev_dependencies;

    deps.insert("@nestjs/config", "^4.0.0");
    deps.insert("@nestjs/passport", "^11.0.0");
    deps.insert("passport", "^0.7.0");
    deps.insert("passport-local", "^1.0.0");
    deps.insert("bcrypt", "^5.1.0");
    deps.insert("class-validator", "^0.14.0");
    deps.insert("class-transformer", "^0.5.1");
    dev.insert("@types/bcrypt", "^5.0.2");
    dev.insert("@types/passport-local", "^1.0.38");

    match config.strategy {
        AuthStrategy::Jwt => {
            deps.insert("@nestjs/jwt", "^11.0.0");
            deps.insert("passport-jwt", "^4.0.1");
            dev.insert("@types/passport-jwt", "^4.0.1");
        }
        AuthStrategy::Session => {
            deps.insert("express-session", "^1.18.0");
            dev.insert("@types/express-session", "^1.18.0");
        }
    }

    match config.orm {
        Orm::TypeOrm => {
            deps.insert("@nestjs/typeorm", "^11.0.0");
            deps.insert("typeorm", "^0.3.20");
            deps.insert(config.datastore.typeorm_driver_package(), config.datastore.driver_version());
        }
        Orm::Mongoose => {
            deps.insert("@nestjs/mongoose", "^11.0.0");
            deps.insert("mongoose", "^8.9.0");
        }
        Orm::Prisma => {
            deps.insert("@prisma/client", "^6.2.0");
            dev.insert("prisma", "^6.2.0");
        }
    }

    if config.rate_limiting {
        deps.insert("@nestjs/throttler", "^6.3.0");
    }
    if config.api_docs {
        deps.insert("@nestjs/swagger", "^8.1.0");
    }
    set
}

impl crate::config::Datastore {
    fn typeorm_driver_package(self) -> &'static str {
        match self {
            Self::Postgres => "pg",
            Self::Mysql => "mysql2",
            Self::Sqlite => "better-sqlite3",
            Self::Mongo => "mongodb",
        }
    }

    fn driver_version(self) -> &'static str {
        match self {
            Self::Postgres => "^8.13.0",
            Self::Mysql => "^3.11.0",
            Self::Sqlite => "^11.7.0",
            Self::Mongo => "^6.12.0",
        }
    }
}

fn merge_block(pkg: &mut Map<String, Value>, key: &str, wanted: &BTreeMap<&str, &str>) -> usize {
    if wanted.is_empty() {
        return 0;
    }
    let block = pkg
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    let Some(map) = block.as_object_mut() else {
        return 0;
    };
    let mut added = 0;
    for (name, version) in wanted {
        if !map.contains_key(*name) {
            map.insert(name.to_string(), Value::String(version.to_string()));
            added += 1;
        }
    }
    added
}

/// Merge the configuration's dependency set into package.json text.
/// Existing entries are never rewritten.
pub fn merge_manifest(text: &str, config: &GenerationConfig) -> Result<String> {
    let mut pkg: Value = serde_json::from_str(text)
        .map_err(|e| ScaffoldError::Manifest(format!("package.json is not valid JSON: {e}")))?;
    let Some(root) = pkg.as_object_mut() else {
        return Err(ScaffoldError::Manifest(
            "package.json root is not an object".to_string(),
        ));
    };

    let set = dependency_set(config);
    let added = merge_block(root, "dependencies", &set.dependencies)
        + merge_block(root, "devDependencies", &set.dev_dependencies);
    debug!(added, "manifest merge complete");

    let mut out = serde_json::to_string_pretty(&pkg)
        .map_err(|e| ScaffoldError::Manifest(e.to_string()))?;
    out.push('\n');
    Ok(out)
}

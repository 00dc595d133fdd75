// config.rs — the generation configuration, built once per run.
//
// The templating context is a typed struct with every field enumerated;
// conditional template sections are ordinary branches over these fields.
// The config is immutable after `build_config` and passed by reference
// into every downstream component.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScaffoldError};

// ─── Closed enums ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum AuthStrategy {
    /// Stateless passport-jwt bearer tokens (default).
    Jwt,
    /// Cookie sessions via express-session and a passport serializer.
    Session,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Orm {
    #[value(name = "typeorm")]
    #[serde(rename = "typeorm")]
    TypeOrm,
    Mongoose,
    Prisma,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Datastore {
    Postgres,
    Mysql,
    Sqlite,
    Mongo,
}

impl Datastore {
    /// The driver string TypeORM expects in its connection options.
    pub fn typeorm_type(self) -> &'static str {
        match self {
            Datastore::Postgres => "postgres",
            Datastore::Mysql => "mysql",
            Datastore::Sqlite => "better-sqlite3",
            Datastore::Mongo => "mongodb",
        }
    }

    pub fn default_for(orm: Orm) -> Self {
        match orm {
            Orm::Mongoose => Datastore::Mongo,
            Orm::TypeOrm | Orm::Prisma => Datastore::Postgres,
        }
    }
}

// ─── Answers ──────────────────────────────────────────────────────────────────

/// Flat answers object, gathered from CLI flags or a REST request body.
/// `None` means "use the probed/default value".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Answers {
    pub strategy: AuthStrategy,
    pub authorization: bool,
    pub roles: Vec<String>,
    pub orm: Option<Orm>,
    pub datastore: Option<Datastore>,
    pub refresh_rotation: bool,
    pub rate_limiting: bool,
    pub api_docs: bool,
    pub with_tests: bool,
    pub username_field: bool,
    pub email_verification: bool,
    pub password_reset: bool,
    pub access_token_ttl: String,
    pub refresh_token_ttl: String,
    pub auto_install: bool,
}

impl Default for Answers {
    fn default() -> Self {
        Self {
            strategy: AuthStrategy::Jwt,
            authorization: false,
            roles: Vec::new(),
            orm: None,
            datastore: None,
            refresh_rotation: false,
            rate_limiting: false,
            api_docs: false,
            with_tests: false,
            username_field: false,
            email_verification: false,
            password_reset: false,
            access_token_ttl: "15m".to_string(),
            refresh_token_ttl: "7d".to_string(),
            auto_install: false,
        }
    }
}

// ─── GenerationConfig ─────────────────────────────────────────────────────────

/// Everything the pipeline needs, resolved and validated. Immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub project_name: String,
    /// Source root relative to the project root (usually `src`).
    pub source_root: String,
    pub strategy: AuthStrategy,
    pub authorization: bool,
    /// Ordered role names; the first is treated as the default role.
    pub roles: Vec<String>,
    pub orm: Orm,
    pub datastore: Datastore,
    pub refresh_rotation: bool,
    pub rate_limiting: bool,
    pub api_docs: bool,
    pub with_tests: bool,
    /// Log in with a username field in addition to email.
    pub username_field: bool,
    pub email_verification: bool,
    pub password_reset: bool,
    pub access_token_ttl: String,
    pub refresh_token_ttl: String,
    pub auto_install: bool,
}

/// Pure builder: answers + probe results in, validated config out.
pub fn build_config(
    answers: &Answers,
    project_name: &str,
    source_root: &str,
    detected_orm: Option<Orm>,
    detected_datastore: Option<Datastore>,
) -> Result<GenerationConfig> {
    let orm = answers.orm.or(detected_orm).unwrap_or(Orm::TypeOrm);
    let datastore = answers
        .datastore
        .or(detected_datastore)
        .unwrap_or_else(|| Datastore::default_for(orm));

    let mut errors = Vec::new();
    match (orm, datastore) {
        (Orm::Mongoose, ds) if ds != Datastore::Mongo => {
            errors.push(format!("mongoose requires the mongo datastore, got {ds:?}"));
        }
        (Orm::TypeOrm | Orm::Prisma, Datastore::Mongo) => {
            errors.push(format!("{orm:?} does not support the mongo datastore"));
        }
        _ => {}
    }
    if answers.authorization && answers.roles.is_empty() {
        errors.push("authorization requested but no roles given".to_string());
    }
    if !answers.authorization && !answers.roles.is_empty() {
        errors.push("roles given but authorization is disabled".to_string());
    }
    if !errors.is_empty() {
        return Err(ScaffoldError::Validation(errors));
    }

    Ok(GenerationConfig {
        project_name: project_name.to_string(),
        source_root: source_root.to_string(),
        strategy: answers.strategy,
        authorization: answers.authorization,
        roles: answers.roles.clone(),
        orm,
        datastore,
        refresh_rotation: answers.refresh_rotation,
        rate_limiting: answers.rate_limiting,
        api_docs: answers.api_docs,
        with_tests: answers.with_tests,
        username_field: answers.username_field,
        email_verification: answers.email_verification,
        password_reset: answers.password_reset,
        access_token_ttl: answers.access_token_ttl.clone(),
        refresh_token_ttl: answers.refresh_token_ttl.clone(),
        auto_install: answers.auto_install,
    })
}

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use nestauth::config::{build_config, Answers, AuthStrategy, Datastore, Orm};
use nestauth::events::{ProgressBroadcaster, StepStatus};
use nestauth::rest::{ServerState, REST_PORT};
use nestauth::{doctor, pipeline, project, rest};

#[derive(Parser)]
#[command(
    name = "nestauth",
    about = "Inject a production-ready authentication module into a NestJS project",
    version
)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "NESTAUTH_LOG")]
    log: Option<String>,

    /// Suppress progress and informational output.
    ///
    /// Errors are still printed to stderr. JSON output (--json flags) is
    /// unaffected. Use this flag when piping output to other tools.
    #[arg(long, short = 'q', global = true)]
    quiet: bool,
}

/// Generation answers as flags. Every flag has a default, so a bare
/// `nestauth add` produces the JWT + TypeORM + Postgres baseline.
#[derive(clap::Args)]
struct AnswerArgs {
    /// Authentication strategy
    #[arg(long, value_enum, default_value = "jwt")]
    strategy: AuthStrategy,

    /// Enable role-based authorization (requires --roles)
    #[arg(long)]
    authorization: bool,

    /// Role names, first one is the default role
    #[arg(long, value_delimiter = ',', value_name = "ROLE,ROLE,...")]
    roles: Vec<String>,

    /// ORM to generate for (default: detected from the project)
    #[arg(long, value_enum)]
    orm: Option<Orm>,

    /// Datastore driver (default: detected, else the ORM's usual choice)
    #[arg(long, value_enum)]
    datastore: Option<Datastore>,

    /// Issue rotating refresh tokens alongside access tokens
    #[arg(long)]
    refresh: bool,

    /// Add a throttler module for login rate limiting
    #[arg(long)]
    rate_limit: bool,

    /// Wire up Swagger API docs at /docs
    #[arg(long)]
    api_docs: bool,

    /// Generate .spec.ts test files next to the sources
    #[arg(long)]
    with_tests: bool,

    /// Log in with a username field in addition to email
    #[arg(long)]
    username: bool,

    /// Generate email verification hooks
    #[arg(long)]
    email_verification: bool,

    /// Generate forgot/reset password endpoints
    #[arg(long)]
    password_reset: bool,

    /// Access token lifetime
    #[arg(long, default_value = "15m", value_name = "TTL")]
    access_ttl: String,

    /// Refresh token lifetime
    #[arg(long, default_value = "7d", value_name = "TTL")]
    refresh_ttl: String,
}

impl AnswerArgs {
    fn into_answers(self, auto_install: bool) -> Answers {
        Answers {
            strategy: self.strategy,
            authorization: self.authorization,
            roles: self.roles,
            orm: self.orm,
            datastore: self.datastore,
            refresh_rotation: self.refresh,
            rate_limiting: self.rate_limit,
            api_docs: self.api_docs,
            with_tests: self.with_tests,
            username_field: self.username,
            email_verification: self.email_verification,
            password_reset: self.password_reset,
            access_token_ttl: self.access_ttl,
            refresh_token_ttl: self.refresh_ttl,
            auto_install,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Add the authentication module to a project.
    ///
    /// Writes the auth/ and users/ source trees, wires AuthModule into
    /// app.module.ts, merges the required packages into package.json, and
    /// registers a global ValidationPipe in main.ts. Safe to re-run: edits
    /// are idempotent and existing entries are never duplicated. A failure
    /// restores the project exactly as it was found.
    ///
    /// Examples:
    ///   nestauth add
    ///   nestauth add ./my-api --strategy jwt --refresh --install
    ///   nestauth add --authorization --roles admin,user
    Add {
        /// Project path (default: current directory)
        path: Option<PathBuf>,
        #[command(flatten)]
        answers: AnswerArgs,
        /// Replace generated files that already exist (still backed up)
        #[arg(long)]
        overwrite: bool,
        /// Run the package manager's install after generating
        #[arg(long)]
        install: bool,
    },
    /// Show what `add` would write, without touching the project.
    ///
    /// Examples:
    ///   nestauth preview
    ///   nestauth preview ./my-api --strategy session --json
    Preview {
        /// Project path (default: current directory)
        path: Option<PathBuf>,
        #[command(flatten)]
        answers: AnswerArgs,
        /// Print the full preview as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run pre-flight checks against the environment and the project.
    ///
    /// Examples:
    ///   nestauth doctor
    ///   nestauth doctor ./my-api
    Doctor {
        /// Project path (default: current directory)
        path: Option<PathBuf>,
    },
    /// Serve the local HTTP API for the desktop GUI.
    ///
    /// Listens on 127.0.0.1 only. One generation runs at a time; progress
    /// is streamed over SSE at /api/v1/events.
    ///
    /// Examples:
    ///   nestauth serve
    ///   nestauth serve ./my-api --port 4800
    Serve {
        /// Project path (default: current directory)
        path: Option<PathBuf>,
        /// HTTP port
        #[arg(long, env = "NESTAUTH_PORT")]
        port: Option<u16>,
    },
}

fn init_tracing(level: Option<&str>) {
    use tracing_subscriber::EnvFilter;
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_env("NESTAUTH_LOG")
            .unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_root(path: Option<PathBuf>) -> Result<PathBuf> {
    match path {
        Some(p) => Ok(p),
        None => std::env::current_dir().context("could not resolve current directory"),
    }
}

/// Drive an indicatif spinner from the progress channel until it closes.
fn spawn_spinner(progress: &ProgressBroadcaster) -> tokio::task::JoinHandle<()> {
    let mut rx = progress.subscribe();
    tokio::spawn(async move {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .expect("static template"),
        );
        pb.enable_steady_tick(std::time::Duration::from_millis(80));
        while let Ok(event) = rx.recv().await {
            match event.status {
                StepStatus::Started => pb.set_message(event.label),
                StepStatus::Completed => pb.println(format!("  ✓ {}", event.label)),
                StepStatus::Warning => pb.println(format!(
                    "  ⚠ {}: {}",
                    event.label,
                    event.detail.unwrap_or_default()
                )),
                StepStatus::Failed => pb.println(format!(
                    "  ✗ {}: {}",
                    event.label,
                    event.detail.unwrap_or_default()
                )),
            }
        }
        pb.finish_and_clear();
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log.as_deref());

    match args.command {
        Command::Add {
            path,
            answers,
            overwrite,
            install,
        } => {
            let root = resolve_root(path)?;
            let probe = project::probe(&root).await?;
            let config = build_config(
                &answers.into_answers(install),
                &probe.name,
                &probe.source_root,
                probe.orm,
                probe.datastore,
            )?;

            let progress = ProgressBroadcaster::new();
            let spinner = (!args.quiet).then(|| spawn_spinner(&progress));
            let result = pipeline::generate(&config, &probe, overwrite, &progress).await;
            drop(progress);
            if let Some(handle) = spinner {
                let _ = handle.await;
            }
            let report = result?;

            if !args.quiet {
                println!(
                    "\nAdded authentication to {} ({} files created, {} modified).",
                    probe.name,
                    report.files_created.len(),
                    report.files_modified.len()
                );
                for skipped in &report.files_skipped {
                    println!("  skipped existing {}", skipped.display());
                }
                for warning in &report.warnings {
                    println!("  warning: {warning}");
                }
                println!("\nNext steps:");
                println!("  - set JWT_SECRET in your .env");
                if !config.auto_install {
                    println!(
                        "  - run `{} install` to fetch the new packages",
                        probe.package_manager
                    );
                }
            }
            Ok(())
        }
        Command::Preview {
            path,
            answers,
            json,
        } => {
            let root = resolve_root(path)?;
            let probe = project::probe(&root).await?;
            let config = build_config(
                &answers.into_answers(false),
                &probe.name,
                &probe.source_root,
                probe.orm,
                probe.datastore,
            )?;
            let report = pipeline::preview(&config, &probe).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Would create:");
                for file in &report.files {
                    let tag = if file.is_new { "new" } else { "exists" };
                    println!("  [{tag}] {}", file.path.display());
                }
                println!("Would modify:");
                for desc in &report.modified {
                    println!("  {desc}");
                }
            }
            Ok(())
        }
        Command::Doctor { path } => {
            let root = resolve_root(path)?;
            let results = doctor::run_doctor(&root).await;
            let mut failed = false;
            for check in &results {
                let mark = if check.passed { "✓" } else { "✗" };
                println!("{mark} {:<26} {}", check.name, check.detail);
                failed |= !check.passed;
            }
            if failed {
                std::process::exit(1);
            }
            Ok(())
        }
        Command::Serve { path, port } => {
            let root = resolve_root(path)?;
            // Probe once up front so a bad directory fails fast.
            let probe = project::probe(&root).await?;
            info!(project = %probe.name, "serving GUI API");
            let state = Arc::new(ServerState::new(root));
            rest::start_rest_server(state, port.unwrap_or(REST_PORT)).await
        }
    }
}

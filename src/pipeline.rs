// pipeline.rs — the generation run, start to finish.
//
// Step order: render templates → wire app.module.ts → merge package.json →
// inject bootstrap → optional install. The first three are fatal on error
// and roll back everything written in the run; bootstrap injection and the
// install are best-effort and downgrade to warnings, because at that point
// the generated tree is already self-consistent.

use std::path::PathBuf;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::GenerationConfig;
use crate::error::{Result, ScaffoldError};
use crate::events::ProgressBroadcaster;
use crate::manifest::merge_manifest;
use crate::project::ProjectProbe;
use crate::rewrite::decorator::{merge_into_decorator_array, ModuleEntry};
use crate::rewrite::imports::{ensure_import, ensure_namespace_import};
use crate::rewrite::bootstrap::inject_before_anchor;
use crate::templates::{bootstrap_wiring, module_wiring, plan_files};
use crate::writer::{ProjectWriter, WriteMode};

#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub success: bool,
    pub files_created: Vec<PathBuf>,
    pub files_skipped: Vec<PathBuf>,
    pub files_modified: Vec<PathBuf>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PreviewFile {
    pub path: PathBuf,
    pub content: String,
    pub is_new: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PreviewReport {
    pub files: Vec<PreviewFile>,
    /// Descriptions of the in-place edits a real run would make.
    pub modified: Vec<String>,
}

static LISTEN_CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.listen\s*\(").expect("static regex"));

fn listen_anchor(stmt: &str) -> bool {
    LISTEN_CALL.is_match(stmt)
}

/// Run the full generation. All-or-nothing for template writes, the
/// module file, and the manifest; warnings for the rest.
pub async fn generate(
    config: &GenerationConfig,
    probe: &ProjectProbe,
    overwrite: bool,
    progress: &ProgressBroadcaster,
) -> Result<GenerationReport> {
    let mut writer = ProjectWriter::new();
    let mut warnings = probe.warnings.clone();
    let src_dir = probe.root.join(&probe.source_root);
    let mode = if overwrite {
        WriteMode::Overwrite
    } else {
        WriteMode::Fresh
    };

    let fatal = async {
        progress.started("render", "Writing authentication files");
        for file in plan_files(config) {
            writer.write(&src_dir.join(&file.path), &file.content, mode).await?;
        }
        progress.completed("render", "Writing authentication files");

        progress.started("module", "Wiring AppModule");
        let wiring = module_wiring(config);
        writer
            .mutate_source(&probe.module_file, |model| {
                for (module, names) in &wiring.imports {
                    let names: Vec<&str> = names.iter().map(String::as_str).collect();
                    ensure_import(model, module, &names)?;
                }
                let entries: Vec<ModuleEntry> = wiring
                    .entries
                    .iter()
                    .map(|e| ModuleEntry::new(e.clone()))
                    .collect();
                merge_into_decorator_array(model, "AppModule", "Module", "imports", &entries)
            })
            .await?;
        progress.completed("module", "Wiring AppModule");

        progress.started("manifest", "Updating package.json");
        writer
            .mutate_text(&probe.root.join("package.json"), |text| {
                merge_manifest(text, config)
            })
            .await?;
        progress.completed("manifest", "Updating package.json");
        Ok::<(), ScaffoldError>(())
    }
    .await;

    if let Err(e) = fatal {
        progress.failed("generate", "Generation failed", e.to_string());
        warn!(err = %e, "fatal step failed; rolling back");
        writer.rollback_all().await?;
        return Err(e);
    }

    progress.started("bootstrap", "Updating main.ts");
    let boot = bootstrap_wiring(config);
    let boot_result = writer
        .mutate_source(&probe.main_file, |model| {
            for (module, names) in &boot.imports {
                let names: Vec<&str> = names.iter().map(String::as_str).collect();
                ensure_import(model, module, &names)?;
            }
            for (module, alias) in &boot.namespace_imports {
                ensure_namespace_import(model, module, alias)?;
            }
            inject_before_anchor(model, "bootstrap", listen_anchor, &boot.marker, &boot.block)
        })
        .await;
    match boot_result {
        Ok(()) => progress.completed("bootstrap", "Updating main.ts"),
        Err(e) => {
            // main.ts was restored by the writer; the rest of the run stands.
            let detail = format!("could not update main.ts: {e}");
            progress.warning("bootstrap", "Updating main.ts", detail.clone());
            warnings.push(detail);
        }
    }

    if config.auto_install {
        progress.started("install", "Installing dependencies");
        match crate::install::run_install(probe.package_manager, &probe.root).await {
            None => progress.completed("install", "Installing dependencies"),
            Some(detail) => {
                progress.warning("install", "Installing dependencies", detail.clone());
                warnings.push(detail);
            }
        }
    }

    writer.cleanup_all().await?;
    let report = GenerationReport {
        success: true,
        files_created: writer.written().to_vec(),
        files_skipped: writer.skipped().to_vec(),
        files_modified: writer.modified().to_vec(),
        warnings,
    };
    info!(
        created = report.files_created.len(),
        modified = report.files_modified.len(),
        warnings = report.warnings.len(),
        "generation complete"
    );
    Ok(report)
}

/// Render everything a run would produce without touching the project.
pub async fn preview(config: &GenerationConfig, probe: &ProjectProbe) -> Result<PreviewReport> {
    let src_dir = probe.root.join(&probe.source_root);
    let files = plan_files(config)
        .into_iter()
        .map(|f| {
            let abs = src_dir.join(&f.path);
            PreviewFile {
                is_new: !abs.exists(),
                path: abs,
                content: f.content,
            }
        })
        .collect();

    let wiring = module_wiring(config);
    let mut modified = vec![format!(
        "{}: add {} to the @Module imports array",
        probe.module_file.display(),
        wiring
            .entries
            .iter()
            .map(|e| crate::rewrite::scan::leading_identifier(e).to_string())
            .collect::<Vec<_>>()
            .join(", ")
    )];
    modified.push(format!(
        "{}: merge authentication dependencies",
        probe.root.join("package.json").display()
    ));
    modified.push(format!(
        "{}: register global validation pipe before listen",
        probe.main_file.display()
    ));
    Ok(PreviewReport { files, modified })
}

// pipeline_test.rs — end-to-end generation against a fixture project.

use std::path::Path;

use tempfile::TempDir;

use nestauth::config::{build_config, Answers, AuthStrategy, GenerationConfig};
use nestauth::error::ScaffoldError;
use nestauth::events::ProgressBroadcaster;
use nestauth::pipeline::{generate, preview};
use nestauth::project::{probe, ProjectProbe};

const PACKAGE_JSON: &str = r#"{
  "name": "fixture-api",
  "version": "0.0.1",
  "scripts": {
    "start": "nest start"
  },
  "dependencies": {
    "@nestjs/common": "^11.0.0",
    "@nestjs/core": "^11.0.0",
    "@nestjs/typeorm": "^11.0.0",
    "pg": "^8.13.0"
  }
}
"#;

const APP_MODULE: &str = r#"import { Module } from '@nestjs/common';
import { AppController } from './app.controller';
import { AppService } from './app.service';

@Module({
  imports: [],
  controllers: [AppController],
  providers: [AppService],
})
export class AppModule {}
"#;

const MAIN_TS: &str = r#"import { NestFactory } from '@nestjs/core';
import { AppModule } from './app.module';

async function bootstrap() {
  const app = await NestFactory.create(AppModule);
  await app.listen(3000);
}
bootstrap();
"#;

async fn fixture_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    tokio::fs::write(dir.path().join("package.json"), PACKAGE_JSON)
        .await
        .unwrap();
    tokio::fs::create_dir_all(dir.path().join("src")).await.unwrap();
    tokio::fs::write(dir.path().join("src/app.module.ts"), APP_MODULE)
        .await
        .unwrap();
    tokio::fs::write(dir.path().join("src/main.ts"), MAIN_TS)
        .await
        .unwrap();
    dir
}

async fn probe_and_config(root: &Path, answers: Answers) -> (ProjectProbe, GenerationConfig) {
    let probe = probe(root).await.unwrap();
    let config = build_config(
        &answers,
        &probe.name,
        &probe.source_root,
        probe.orm,
        probe.datastore,
    )
    .unwrap();
    (probe, config)
}

fn tree(root: &Path) -> Vec<String> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stack.push(path);
            } else {
                out.push(
                    path.strip_prefix(root)
                        .unwrap()
                        .to_string_lossy()
                        .into_owned(),
                );
            }
        }
    }
    out.sort();
    out
}

#[tokio::test]
async fn default_run_generates_a_wired_project() {
    let dir = fixture_project().await;
    let (probe, config) = probe_and_config(dir.path(), Answers::default()).await;
    let progress = ProgressBroadcaster::new();

    let report = generate(&config, &probe, false, &progress).await.unwrap();
    assert!(report.success);
    assert!(report.files_created.len() >= 10);
    assert!(report.files_skipped.is_empty());
    assert_eq!(report.files_modified.len(), 3, "{:?}", report.files_modified);

    // Generated tree.
    assert!(dir.path().join("src/auth/auth.module.ts").exists());
    assert!(dir.path().join("src/auth/strategies/jwt.strategy.ts").exists());
    assert!(dir.path().join("src/users/user.entity.ts").exists());

    // Module wiring.
    let module = std::fs::read_to_string(dir.path().join("src/app.module.ts")).unwrap();
    assert!(module.contains("import { AuthModule } from './auth/auth.module';"));
    assert!(module.contains("AuthModule,"));
    assert!(module.contains("controllers: [AppController],"));

    // Manifest merge: new packages added, existing pins untouched.
    let pkg: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("package.json")).unwrap())
            .unwrap();
    assert_eq!(pkg["dependencies"]["pg"], "^8.13.0");
    assert!(pkg["dependencies"]["@nestjs/jwt"].is_string());
    assert_eq!(pkg["name"], "fixture-api");

    // Bootstrap injection before listen.
    let main = std::fs::read_to_string(dir.path().join("src/main.ts")).unwrap();
    let pipes = main.find("useGlobalPipes").unwrap();
    let listen = main.find("app.listen").unwrap();
    assert!(pipes < listen);

    // No backup sidecars survive a successful run.
    assert!(!tree(dir.path()).iter().any(|p| p.ends_with(".nestauth.bak")));
}

#[tokio::test]
async fn session_run_imports_what_its_bootstrap_block_uses() {
    let dir = fixture_project().await;
    let (probe, config) = probe_and_config(
        dir.path(),
        Answers {
            strategy: AuthStrategy::Session,
            ..Answers::default()
        },
    )
    .await;
    let progress = ProgressBroadcaster::new();

    let report = generate(&config, &probe, false, &progress).await.unwrap();
    assert!(report.success);
    assert!(dir.path().join("src/auth/session.serializer.ts").exists());

    // Every name the injected block references resolves to an import.
    let main = std::fs::read_to_string(dir.path().join("src/main.ts")).unwrap();
    assert!(main.contains("import * as session from 'express-session';"), "{main}");
    assert!(main.contains("import * as passport from 'passport';"), "{main}");
    let middleware = main.find("passport.initialize()").unwrap();
    let listen = main.find("app.listen").unwrap();
    assert!(main.find("session(").unwrap() < listen);
    assert!(middleware < listen);

    // And the manifest carries the matching runtime packages.
    let pkg: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("package.json")).unwrap())
            .unwrap();
    assert!(pkg["dependencies"]["express-session"].is_string());
    assert!(pkg["dependencies"]["passport"].is_string());
}

#[tokio::test]
async fn second_run_without_overwrite_fails_and_changes_nothing() {
    let dir = fixture_project().await;
    let (probe, config) = probe_and_config(dir.path(), Answers::default()).await;
    let progress = ProgressBroadcaster::new();
    generate(&config, &probe, false, &progress).await.unwrap();

    let before_tree = tree(dir.path());
    let before_module =
        std::fs::read_to_string(dir.path().join("src/app.module.ts")).unwrap();

    let err = generate(&config, &probe, false, &progress).await;
    assert!(matches!(err, Err(ScaffoldError::FileExists(_))));

    assert_eq!(tree(dir.path()), before_tree);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("src/app.module.ts")).unwrap(),
        before_module
    );
}

#[tokio::test]
async fn second_run_with_overwrite_converges() {
    let dir = fixture_project().await;
    let (probe, config) = probe_and_config(dir.path(), Answers::default()).await;
    let progress = ProgressBroadcaster::new();
    generate(&config, &probe, false, &progress).await.unwrap();

    let module_once = std::fs::read_to_string(dir.path().join("src/app.module.ts")).unwrap();
    let main_once = std::fs::read_to_string(dir.path().join("src/main.ts")).unwrap();
    let pkg_once = std::fs::read_to_string(dir.path().join("package.json")).unwrap();

    let report = generate(&config, &probe, true, &progress).await.unwrap();
    assert!(report.success);

    // In-place edits are idempotent across runs.
    assert_eq!(
        std::fs::read_to_string(dir.path().join("src/app.module.ts")).unwrap(),
        module_once
    );
    assert_eq!(
        std::fs::read_to_string(dir.path().join("src/main.ts")).unwrap(),
        main_once
    );
    assert_eq!(
        std::fs::read_to_string(dir.path().join("package.json")).unwrap(),
        pkg_once
    );
    assert!(!tree(dir.path()).iter().any(|p| p.ends_with(".nestauth.bak")));
}

#[tokio::test]
async fn fatal_module_failure_rolls_back_every_write() {
    let dir = fixture_project().await;
    // Sabotage: no AppModule class, so the decorator edit fails closed
    // after all templates were already written.
    tokio::fs::write(
        dir.path().join("src/app.module.ts"),
        "@Module({})\nexport class RootModule {}\n",
    )
    .await
    .unwrap();
    let before_tree = tree(dir.path());

    let (probe, config) = probe_and_config(dir.path(), Answers::default()).await;
    let progress = ProgressBroadcaster::new();
    let err = generate(&config, &probe, false, &progress).await;
    assert!(matches!(err, Err(ScaffoldError::Structure { .. })), "{err:?}");

    // All-or-nothing: the written template files are gone again.
    assert_eq!(tree(dir.path()), before_tree);
    assert!(!dir.path().join("src/auth").exists() || tree(dir.path()).iter().all(|p| !p.starts_with("src/auth")));
}

#[tokio::test]
async fn bootstrap_failure_is_downgraded_to_a_warning() {
    let dir = fixture_project().await;
    // main.ts with no bootstrap function: injection fails, run succeeds.
    tokio::fs::write(dir.path().join("src/main.ts"), "const app = start();\n")
        .await
        .unwrap();
    let main_before = std::fs::read_to_string(dir.path().join("src/main.ts")).unwrap();

    let (probe, config) = probe_and_config(dir.path(), Answers::default()).await;
    let progress = ProgressBroadcaster::new();
    let report = generate(&config, &probe, false, &progress).await.unwrap();

    assert!(report.success);
    assert!(report
        .warnings
        .iter()
        .any(|w| w.contains("main.ts")), "{:?}", report.warnings);
    // The generated tree stands; main.ts was restored untouched.
    assert!(dir.path().join("src/auth/auth.module.ts").exists());
    assert_eq!(
        std::fs::read_to_string(dir.path().join("src/main.ts")).unwrap(),
        main_before
    );
}

#[tokio::test]
async fn preview_writes_nothing() {
    let dir = fixture_project().await;
    let before_tree = tree(dir.path());
    let (probe, config) = probe_and_config(dir.path(), Answers::default()).await;

    let report = preview(&config, &probe).await.unwrap();
    assert!(report.files.iter().all(|f| f.is_new));
    assert!(report
        .files
        .iter()
        .any(|f| f.path.ends_with("auth/auth.module.ts")));
    assert_eq!(report.modified.len(), 3);
    assert_eq!(tree(dir.path()), before_tree);
}

#[tokio::test]
async fn progress_events_trace_the_run() {
    let dir = fixture_project().await;
    let (probe, config) = probe_and_config(dir.path(), Answers::default()).await;
    let progress = ProgressBroadcaster::new();
    let mut rx = progress.subscribe();

    generate(&config, &probe, false, &progress).await.unwrap();

    let mut steps = Vec::new();
    while let Ok(event) = rx.try_recv() {
        steps.push((event.step, event.status));
    }
    let step_names: Vec<&str> = steps.iter().map(|(s, _)| s.as_str()).collect();
    assert_eq!(
        step_names,
        [
            "render", "render", "module", "module", "manifest", "manifest", "bootstrap",
            "bootstrap"
        ]
    );
}

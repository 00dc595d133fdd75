// rewrite_test.rs — the source rewriter against realistic project files.
//
// Unit tests inside the rewrite modules cover the editors in isolation;
// these exercise the combinations a real run performs on files that look
// like what `nest new` actually produces (plus user edits).

use std::path::Path;

use proptest::prelude::*;

use nestauth::rewrite::bootstrap::inject_before_anchor;
use nestauth::rewrite::decorator::{merge_into_decorator_array, ModuleEntry};
use nestauth::rewrite::imports::ensure_import;
use nestauth::rewrite::SourceModel;

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
  app.enableCors();
  await app.listen(process.env.PORT ?? 3000);
}
bootstrap();
"#;

fn model(name: &str, src: &str) -> SourceModel {
    SourceModel::from_source(Path::new(name), src.to_string()).unwrap()
}

fn wire_module(model: &mut SourceModel) {
    ensure_import(model, "@nestjs/config", &["ConfigModule"]).unwrap();
    ensure_import(model, "./auth/auth.module", &["AuthModule"]).unwrap();
    ensure_import(model, "./users/users.module", &["UsersModule"]).unwrap();
    merge_into_decorator_array(
        model,
        "AppModule",
        "Module",
        "imports",
        &[
            ModuleEntry::new("ConfigModule.forRoot({ isGlobal: true })"),
            ModuleEntry::new("AuthModule"),
            ModuleEntry::new("UsersModule"),
        ],
    )
    .unwrap();
}

#[test]
fn full_module_wiring_produces_valid_structure() {
    let mut m = model("app.module.ts", APP_MODULE);
    wire_module(&mut m);
    let text = m.text();

    // New imports land after the existing import section.
    let last_original = text.find("./app.service").unwrap();
    let auth_import = text.find("./auth/auth.module").unwrap();
    assert!(auth_import > last_original);
    assert!(text.find("import { AuthModule }").unwrap() < text.find("@Module").unwrap());

    // The rewritten array parses and carries all three entries.
    let class = m.find_class("AppModule").unwrap().unwrap();
    let obj = class.decorators[0].arg_object.clone().unwrap();
    let props = m.object_properties(&obj).unwrap();
    assert!(props.iter().any(|p| p.key == "imports"));
    assert!(text.contains("ConfigModule.forRoot({ isGlobal: true }),"));
    assert!(text.contains("controllers: [AppController],"));
}

#[test]
fn full_wiring_is_idempotent() {
    let mut m = model("app.module.ts", APP_MODULE);
    wire_module(&mut m);
    let once = m.text().to_string();
    wire_module(&mut m);
    assert_eq!(m.text(), once, "second pass must be byte-identical");
}

#[test]
fn wiring_survives_a_hand_edited_module() {
    let src = r#"import { Module } from '@nestjs/common';
import { ScheduleModule } from '@nestjs/schedule';
import { AppController } from './app.controller';

@Module({
  imports: [
    ScheduleModule.forRoot(),
    ConfigModule.forRoot({
      isGlobal: true,
      envFilePath: '.env.local',
    }),
  ],
  controllers: [AppController],
})
export class AppModule {}
"#;
    let mut m = model("app.module.ts", src);
    wire_module(&mut m);
    let text = m.text();

    // The user's ConfigModule call wins; ours is dropped.
    assert!(text.contains("envFilePath: '.env.local'"));
    assert_eq!(text.matches("ConfigModule.forRoot").count(), 1);
    // Order: user entries first, then the appended ones.
    let schedule = text.find("ScheduleModule.forRoot()").unwrap();
    let auth = text.find("AuthModule,").unwrap();
    assert!(schedule < auth);
}

#[test]
fn bootstrap_injection_lands_before_listen() {
    let mut m = model("main.ts", MAIN_TS);
    ensure_import(&mut m, "@nestjs/common", &["ValidationPipe"]).unwrap();
    inject_before_anchor(
        &mut m,
        "bootstrap",
        |s| s.contains(".listen("),
        "ValidationPipe",
        "app.useGlobalPipes(new ValidationPipe({ whitelist: true, transform: true }));",
    )
    .unwrap();
    let text = m.text();
    let cors = text.find("enableCors").unwrap();
    let pipes = text.find("useGlobalPipes").unwrap();
    let listen = text.find("app.listen").unwrap();
    assert!(cors < pipes && pipes < listen, "got:\n{text}");
    // `bootstrap();` trailer stays last.
    assert!(text.trim_end().ends_with("bootstrap();"));
}

#[test]
fn structure_failure_leaves_text_untouched() {
    // The decorator takes a variable, not an object literal: fail closed.
    let src = r#"const options = { imports: [] };
@Module(options)
export class AppModule {}
"#;
    let mut m = model("app.module.ts", src);
    let before = m.text().to_string();
    let err = merge_into_decorator_array(
        &mut m,
        "AppModule",
        "Module",
        "imports",
        &[ModuleEntry::new("AuthModule")],
    );
    assert!(err.is_err());
    assert_eq!(m.text(), before);
}

proptest! {
    // Whatever subset of modules is ensured, in whatever order, each module
    // path ends up with exactly one import statement, and a second pass
    // changes nothing.
    #[test]
    fn ensure_import_converges(indices in proptest::collection::vec(0usize..4, 1..12)) {
        let names = ["AuthModule", "UsersModule", "ConfigModule", "ThrottlerModule"];
        let modules = [
            "./auth/auth.module",
            "./users/users.module",
            "@nestjs/config",
            "@nestjs/throttler",
        ];
        let mut m = model("app.module.ts", APP_MODULE);
        for &i in &indices {
            ensure_import(&mut m, modules[i], &[names[i]]).unwrap();
        }
        let once = m.text().to_string();
        for &i in &indices {
            ensure_import(&mut m, modules[i], &[names[i]]).unwrap();
        }
        prop_assert_eq!(m.text(), once.as_str());
        for &i in &indices {
            let needle = format!("from '{}'", modules[i]);
            prop_assert_eq!(once.matches(&needle).count(), 1);
        }
    }
}

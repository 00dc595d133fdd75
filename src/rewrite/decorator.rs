// rewrite/decorator.rs — merging entries into a decorator's config array.
//
// This is the heart of the rewriter: it locates a named class, its
// configuration decorator (e.g. `@Module({...})`), and an array-valued
// property of the decorator's argument object, then merges new entries in.
// Presence is decided by leading identifier alone — an existing
// `ConfigModule.forRoot({ isGlobal: true })` blocks a candidate
// `ConfigModule.forRoot({ isGlobal: false })` outright, so re-running the
// generator never duplicates a module reference even when its arguments
// differ. The existing entry always wins; no reconciliation is attempted.
//
// The editor tolerates files the user has already hand-edited: existing
// entries are preserved verbatim and in order, and the property is created
// as an array when it is missing entirely. Anything of unexpected shape is
// a Structure error (fail closed).

use super::scan::{leading_identifier, line_indent, matching};
use super::SourceModel;
use crate::error::Result;

/// A candidate entry for the config array: the full source text to insert
/// plus the leading identifier used as its identity key.
#[derive(Debug, Clone)]
pub struct ModuleEntry {
    pub leading: String,
    pub text: String,
}

impl ModuleEntry {
    /// Build an entry from its source text, deriving the leading identifier.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            leading: leading_identifier(&text).to_string(),
            text,
        }
    }
}

/// Merge `entries` into the `property_name` array of the `decorator_name`
/// decorator on class `class_name`. See module docs for the dedup rule.
pub fn merge_into_decorator_array(
    model: &mut SourceModel,
    class_name: &str,
    decorator_name: &str,
    property_name: &str,
    entries: &[ModuleEntry],
) -> Result<()> {
    let class = model
        .find_class(class_name)?
        .ok_or_else(|| model.structure_err(format!("class `{class_name}` not found")))?;
    let decorator = class
        .decorators
        .iter()
        .find(|d| d.name == decorator_name)
        .ok_or_else(|| {
            model.structure_err(format!(
                "class `{class_name}` has no `@{decorator_name}` decorator"
            ))
        })?;
    let obj = decorator.arg_object.clone().ok_or_else(|| {
        model.structure_err(format!(
            "`@{decorator_name}` must be called with a single object literal argument"
        ))
    })?;

    let props = model.object_properties(&obj)?;
    match props.iter().find(|p| p.key == property_name) {
        Some(prop) => {
            let arr_open = prop.value.start;
            if model.text().as_bytes().get(arr_open) != Some(&b'[') {
                return Err(model.structure_err(format!(
                    "property `{property_name}` of `@{decorator_name}` is not an array literal"
                )));
            }
            let cls = model.classified()?;
            let arr_close = matching(model.text(), &cls, arr_open)
                .ok_or_else(|| model.structure_err("unbalanced array literal"))?;
            let arr = arr_open..arr_close + 1;

            let existing: Vec<String> = model
                .array_elements(&arr)?
                .into_iter()
                .map(|span| model.text()[span].to_string())
                .collect();
            let mut present: Vec<String> = existing
                .iter()
                .map(|e| leading_identifier(e).to_string())
                .collect();

            let mut appended: Vec<&ModuleEntry> = Vec::new();
            for entry in entries {
                if present.iter().any(|p| p == &entry.leading) {
                    continue;
                }
                present.push(entry.leading.clone());
                appended.push(entry);
            }
            if appended.is_empty() {
                return Ok(());
            }

            let prop_indent = line_indent(model.text(), prop.key_start);
            let elem_indent = format!("{prop_indent}  ");
            let mut lines = String::from("[\n");
            for elem in existing
                .iter()
                .map(String::as_str)
                .chain(appended.iter().map(|e| e.text.as_str()))
            {
                lines.push_str(&elem_indent);
                lines.push_str(elem);
                lines.push_str(",\n");
            }
            lines.push_str(&prop_indent);
            lines.push(']');
            model.splice(arr, &lines);
            Ok(())
        }
        None => {
            // Property missing entirely — create it as an array holding
            // exactly the (deduplicated) merged entries.
            let mut present: Vec<&str> = Vec::new();
            let mut fresh: Vec<&ModuleEntry> = Vec::new();
            for entry in entries {
                if present.iter().any(|p| *p == entry.leading) {
                    continue;
                }
                present.push(entry.leading.as_str());
                fresh.push(entry);
            }

            let brace_indent = line_indent(model.text(), obj.start);
            let prop_indent = match props.first() {
                Some(p) => line_indent(model.text(), p.key_start),
                None => format!("{brace_indent}  "),
            };
            let elem_indent = format!("{prop_indent}  ");
            let mut block = format!("{prop_indent}{property_name}: [\n");
            for entry in &fresh {
                block.push_str(&elem_indent);
                block.push_str(&entry.text);
                block.push_str(",\n");
            }
            block.push_str(&prop_indent);
            block.push_str("],");

            match props.last() {
                Some(last) => {
                    let obj_close = obj.end - 1;
                    let tail = &model.text()[last.value.end..obj_close];
                    match tail.find(',') {
                        Some(i) => {
                            let at = last.value.end + i + 1;
                            let insert = format!("\n{block}");
                            model.splice(at..at, &insert);
                        }
                        None => {
                            let at = last.value.end;
                            let insert = format!(",\n{block}");
                            model.splice(at..at, &insert);
                        }
                    }
                }
                None => {
                    let rebuilt = format!("{{\n{block}\n{brace_indent}}}");
                    model.splice(obj, &rebuilt);
                }
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScaffoldError;
    use std::path::Path;

    fn model(src: &str) -> SourceModel {
        SourceModel::from_source(Path::new("app.module.ts"), src.to_string()).unwrap()
    }

    fn entries(texts: &[&str]) -> Vec<ModuleEntry> {
        texts.iter().map(|t| ModuleEntry::new(*t)).collect()
    }

    const EMPTY_IMPORTS: &str = r#"import { Module } from '@nestjs/common';

@Module({
  imports: [],
  controllers: [AppController],
  providers: [AppService],
})
export class AppModule {}
"#;

    #[test]
    fn fills_empty_array_one_entry_per_line() {
        let mut m = model(EMPTY_IMPORTS);
        merge_into_decorator_array(
            &mut m,
            "AppModule",
            "Module",
            "imports",
            &entries(&[
                "ConfigModule.forRoot({ isGlobal: true })",
                "AuthModule",
                "UsersModule",
            ]),
        )
        .unwrap();
        let expected = "  imports: [\n    ConfigModule.forRoot({ isGlobal: true }),\n    AuthModule,\n    UsersModule,\n  ],";
        assert!(m.text().contains(expected), "got:\n{}", m.text());
        // Untouched siblings survive.
        assert!(m.text().contains("controllers: [AppController],"));
    }

    #[test]
    fn order_is_original_then_appended() {
        let src = r#"@Module({
  imports: [ExistingModule],
})
export class AppModule {}
"#;
        let mut m = model(src);
        merge_into_decorator_array(
            &mut m,
            "AppModule",
            "Module",
            "imports",
            &entries(&["AuthModule", "UsersModule"]),
        )
        .unwrap();
        let text = m.text();
        let x = text.find("ExistingModule").unwrap();
        let a = text.find("AuthModule").unwrap();
        let u = text.find("UsersModule").unwrap();
        assert!(x < a && a < u, "order preserved: got\n{text}");
    }

    #[test]
    fn leading_identifier_collision_keeps_original() {
        let src = r#"@Module({
  imports: [ConfigModule.forRoot({ isGlobal: true })],
})
export class AppModule {}
"#;
        let mut m = model(src);
        let before = m.text().to_string();
        merge_into_decorator_array(
            &mut m,
            "AppModule",
            "Module",
            "imports",
            &entries(&["ConfigModule.forRoot({ isGlobal: false })"]),
        )
        .unwrap();
        // No duplicate, no replacement — the file is untouched.
        assert_eq!(m.text(), before);
        assert!(m.text().contains("isGlobal: true"));
        assert!(!m.text().contains("isGlobal: false"));
    }

    #[test]
    fn merge_is_idempotent_across_runs() {
        let mut m = model(EMPTY_IMPORTS);
        let add = entries(&["AuthModule", "UsersModule"]);
        merge_into_decorator_array(&mut m, "AppModule", "Module", "imports", &add).unwrap();
        let once = m.text().to_string();
        merge_into_decorator_array(&mut m, "AppModule", "Module", "imports", &add).unwrap();
        assert_eq!(m.text(), once);
    }

    #[test]
    fn creates_missing_property() {
        let src = r#"@Module({
  controllers: [AppController],
  providers: [AppService],
})
export class AppModule {}
"#;
        let mut m = model(src);
        merge_into_decorator_array(
            &mut m,
            "AppModule",
            "Module",
            "imports",
            &entries(&["AuthModule", "UsersModule"]),
        )
        .unwrap();
        let expected =
            "  imports: [\n    AuthModule,\n    UsersModule,\n  ],";
        assert!(m.text().contains(expected), "got:\n{}", m.text());
        // The created property must still parse as part of the object.
        let class = m.find_class("AppModule").unwrap().unwrap();
        let obj = class.decorators[0].arg_object.clone().unwrap();
        let props = m.object_properties(&obj).unwrap();
        assert!(props.iter().any(|p| p.key == "imports"));
    }

    #[test]
    fn creates_property_in_empty_object() {
        let src = "@Module({})\nexport class AppModule {}\n";
        let mut m = model(src);
        merge_into_decorator_array(
            &mut m,
            "AppModule",
            "Module",
            "imports",
            &entries(&["AuthModule"]),
        )
        .unwrap();
        assert!(
            m.text().contains("imports: [\n    AuthModule,\n  ],"),
            "got:\n{}",
            m.text()
        );
        let reparsed = m.find_class("AppModule").unwrap().unwrap();
        assert!(reparsed.decorators[0].arg_object.is_some());
    }

    #[test]
    fn missing_class_fails_closed() {
        let mut m = model("export class Other {}\n");
        let err = merge_into_decorator_array(
            &mut m,
            "AppModule",
            "Module",
            "imports",
            &entries(&["AuthModule"]),
        );
        assert!(matches!(err, Err(ScaffoldError::Structure { .. })));
    }

    #[test]
    fn missing_decorator_fails_closed() {
        let mut m = model("export class AppModule {}\n");
        let err = merge_into_decorator_array(
            &mut m,
            "AppModule",
            "Module",
            "imports",
            &entries(&["AuthModule"]),
        );
        assert!(matches!(err, Err(ScaffoldError::Structure { .. })));
    }

    #[test]
    fn non_array_property_fails_closed() {
        let src = "@Module({\n  imports: 'nope',\n})\nexport class AppModule {}\n";
        let mut m = model(src);
        let err = merge_into_decorator_array(
            &mut m,
            "AppModule",
            "Module",
            "imports",
            &entries(&["AuthModule"]),
        );
        assert!(matches!(err, Err(ScaffoldError::Structure { .. })));
    }

    #[test]
    fn hand_edited_array_survives_merge() {
        let src = r#"@Module({
  imports: [
    TypeOrmModule.forRoot({
      type: 'postgres',
      autoLoadEntities: true,
    }),
    ScheduleModule.forRoot(),
  ],
})
export class AppModule {}
"#;
        let mut m = model(src);
        merge_into_decorator_array(
            &mut m,
            "AppModule",
            "Module",
            "imports",
            &entries(&["AuthModule", "TypeOrmModule.forRoot()"]),
        )
        .unwrap();
        let text = m.text();
        // User's TypeOrm config is preserved, candidate TypeOrm is skipped.
        assert!(text.contains("autoLoadEntities: true"));
        assert_eq!(text.matches("TypeOrmModule").count(), 1);
        assert!(text.contains("AuthModule"));
        let t = text.find("TypeOrmModule").unwrap();
        let s = text.find("ScheduleModule").unwrap();
        let a = text.find("AuthModule").unwrap();
        assert!(t < s && s < a);
    }
}

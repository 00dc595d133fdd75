// rewrite/bootstrap.rs — injecting statements into the bootstrap function.
//
// Finds a named function, scans its top-level statements for the first one
// matching the anchor predicate (for NestJS, "calls `.listen(`"), and
// inserts the injected block immediately before it. When no statement
// matches, the block is appended at the end of the body — best-effort
// insertion rather than the hard failure the decorator editor uses.
//
// Idempotency here is textual, not structural: if the body already
// contains the marker substring the injection is skipped. A user whose own
// code happens to contain the marker text gets a false positive; that is a
// known, accepted approximation.

use super::scan::{line_indent, line_start};
use super::SourceModel;
use crate::error::Result;

/// Insert `block` (one or more statements, lines unindented) before the
/// first top-level statement of `function_name` matching `anchor`.
pub fn inject_before_anchor(
    model: &mut SourceModel,
    function_name: &str,
    anchor: impl Fn(&str) -> bool,
    marker: &str,
    block: &str,
) -> Result<()> {
    let function = model.find_function(function_name)?.ok_or_else(|| {
        model.structure_err(format!("function `{function_name}` not found"))
    })?;

    if model.text()[function.body.clone()].contains(marker) {
        return Ok(());
    }

    let stmts = model.statements(&function.body)?;
    let anchor_stmt = stmts
        .iter()
        .find(|s| anchor(&model.text()[s.span.clone()]));

    let (at, indent) = match anchor_stmt {
        Some(stmt) => (
            line_start(model.text(), stmt.span.start),
            line_indent(model.text(), stmt.span.start),
        ),
        None => {
            // No anchor — append at the end of the body, aligned with the
            // last statement (or one level inside the braces when empty).
            let indent = match stmts.last() {
                Some(last) => line_indent(model.text(), last.span.start),
                None => format!("{}  ", line_indent(model.text(), function.body.start)),
            };
            (line_start(model.text(), function.body.end), indent)
        }
    };

    let mut rendered = String::new();
    for line in block.lines() {
        if line.trim().is_empty() {
            rendered.push('\n');
        } else {
            rendered.push_str(&indent);
            rendered.push_str(line);
            rendered.push('\n');
        }
    }
    model.splice(at..at, &rendered);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScaffoldError;
    use std::path::Path;

    fn model(src: &str) -> SourceModel {
        SourceModel::from_source(Path::new("main.ts"), src.to_string()).unwrap()
    }

    fn listen_anchor(stmt: &str) -> bool {
        stmt.contains(".listen(")
    }

    const MAIN: &str = r#"import { NestFactory } from '@nestjs/core';
import { AppModule } from './app.module';

async function bootstrap() {
  const app = await NestFactory.create(AppModule);
  await app.listen(3000);
}
bootstrap();
"#;

    #[test]
    fn inserts_before_listen_statement() {
        let mut m = model(MAIN);
        inject_before_anchor(
            &mut m,
            "bootstrap",
            listen_anchor,
            "ValidationPipe",
            "app.useGlobalPipes(new ValidationPipe({ whitelist: true }));",
        )
        .unwrap();
        let text = m.text();
        let create = text.find("NestFactory.create").unwrap();
        let pipes = text.find("useGlobalPipes").unwrap();
        let listen = text.find("app.listen").unwrap();
        assert!(create < pipes && pipes < listen, "got:\n{text}");
        // Indentation matches the anchor statement.
        assert!(text.contains("\n  app.useGlobalPipes"));
    }

    #[test]
    fn statements_after_anchor_are_untouched() {
        let src = r#"async function bootstrap() {
  const app = await NestFactory.create(AppModule);
  await app.listen(3000);
  console.log('ready');
}
"#;
        let mut m = model(src);
        inject_before_anchor(&mut m, "bootstrap", listen_anchor, "XMARK", "XMARK();").unwrap();
        let text = m.text();
        let mark = text.find("XMARK").unwrap();
        let listen = text.find("app.listen").unwrap();
        let log = text.find("console.log").unwrap();
        assert!(mark < listen && listen < log);
    }

    #[test]
    fn no_anchor_appends_at_end() {
        let src = r#"async function bootstrap() {
  const app = await NestFactory.create(AppModule);
  app.enableCors();
}
"#;
        let mut m = model(src);
        inject_before_anchor(&mut m, "bootstrap", listen_anchor, "XMARK", "XMARK();").unwrap();
        let text = m.text();
        let cors = text.find("enableCors").unwrap();
        let mark = text.find("XMARK").unwrap();
        assert!(cors < mark, "appended after existing statements:\n{text}");
        assert!(mark < text.rfind('}').unwrap());
    }

    #[test]
    fn marker_makes_injection_idempotent() {
        let mut m = model(MAIN);
        let block = "app.useGlobalPipes(new ValidationPipe());";
        inject_before_anchor(&mut m, "bootstrap", listen_anchor, "ValidationPipe", block).unwrap();
        let once = m.text().to_string();
        inject_before_anchor(&mut m, "bootstrap", listen_anchor, "ValidationPipe", block).unwrap();
        assert_eq!(m.text(), once);
    }

    #[test]
    fn marker_check_is_textual_not_structural() {
        // Documented approximation: marker text in a comment still counts
        // as "already applied".
        let src = r#"async function bootstrap() {
  // ValidationPipe is configured elsewhere
  const app = await NestFactory.create(AppModule);
  await app.listen(3000);
}
"#;
        let mut m = model(src);
        let before = m.text().to_string();
        inject_before_anchor(
            &mut m,
            "bootstrap",
            listen_anchor,
            "ValidationPipe",
            "app.useGlobalPipes(new ValidationPipe());",
        )
        .unwrap();
        assert_eq!(m.text(), before, "false positive is accepted by design");
    }

    #[test]
    fn multi_line_block_is_reindented() {
        let mut m = model(MAIN);
        let block = "const config = new DocumentBuilder().build();\nconst document = SwaggerModule.createDocument(app, config);\nSwaggerModule.setup('docs', app, document);";
        inject_before_anchor(&mut m, "bootstrap", listen_anchor, "SwaggerModule", block).unwrap();
        let text = m.text();
        assert!(text.contains("\n  const config = new DocumentBuilder"));
        assert!(text.contains("\n  SwaggerModule.setup"));
        assert!(text.find("SwaggerModule.setup").unwrap() < text.find("app.listen").unwrap());
    }

    #[test]
    fn missing_function_fails_closed() {
        let mut m = model("const x = 1;\n");
        let err = inject_before_anchor(&mut m, "bootstrap", listen_anchor, "X", "X();");
        assert!(matches!(err, Err(ScaffoldError::Structure { .. })));
    }
}

// rewrite/imports.rs — idempotent editing of a file's import section.
//
// `ensure_import` merges named bindings into an existing import from the
// same module path, or appends a new import declaration at the end of the
// import section. It never sorts, and never deduplicates against other
// module paths exporting the same name — a cross-module collision is the
// TypeScript compiler's to flag.

use std::ops::Range;

use super::scan::{matching, Class, Cursor};
use super::SourceModel;
use crate::error::{Result, ScaffoldError};

/// One parsed `import` declaration.
#[derive(Debug, Clone)]
pub struct ImportDecl {
    /// Full statement span, trailing `;` included.
    pub span: Range<usize>,
    pub module: String,
    /// Imported (exported-side) names from the `{ ... }` list; for
    /// `A as B` entries this is `A`.
    pub names: Vec<String>,
    /// Raw entry texts of the named list, original aliases preserved.
    entries: Vec<String>,
    /// Span of the `{ ... }` list, braces included.
    brace: Option<Range<usize>>,
    default_name: Option<String>,
    namespace: Option<String>,
    pub type_only: bool,
    quote: u8,
}

/// Parse every top-level import declaration, in file order.
pub fn parse_imports(model: &SourceModel) -> Result<Vec<ImportDecl>> {
    let cls = model.classified()?;
    let src = model.text();
    let b = src.as_bytes();
    let mut out = Vec::new();
    let mut cur = Cursor::new(src, &cls);

    loop {
        cur.skip_trivia();
        if cur.eof() {
            return Ok(out);
        }
        if cls[cur.pos] != Class::Code {
            while cur.pos < b.len() && cls[cur.pos] != Class::Code {
                cur.pos += 1;
            }
            continue;
        }
        match b[cur.pos] {
            b'(' | b'[' | b'{' => {
                cur.skip_balanced(b[cur.pos]);
            }
            c if super::scan::is_ident_start(c) => {
                let start = cur.pos;
                let id = cur.eat_ident().unwrap_or_default();
                if id != "import" {
                    continue;
                }
                // `import(...)` is a dynamic import expression, not a declaration.
                if cur.peek() == Some(b'(') {
                    continue;
                }
                if let Some(decl) = parse_one(model, src, &cls, &mut cur, start)? {
                    out.push(decl);
                }
            }
            _ => cur.pos += 1,
        }
    }
}

fn parse_one(
    model: &SourceModel,
    src: &str,
    cls: &[Class],
    cur: &mut Cursor,
    start: usize,
) -> Result<Option<ImportDecl>> {
    let mut type_only = false;
    let mut default_name = None;
    let mut namespace = None;
    let mut names = Vec::new();
    let mut entries = Vec::new();
    let mut brace = None;

    // Side-effect import: `import './polyfills';`
    if let Some((module, quote)) = peek_string(src, cls, cur) {
        cur.eat_string();
        cur.eat_char(b';');
        return Ok(Some(ImportDecl {
            span: start..cur.pos,
            module,
            names,
            entries,
            brace: None,
            default_name: None,
            namespace: None,
            type_only: false,
            quote,
        }));
    }

    // `import type ...` unless `type` is itself the default binding.
    let save = cur.pos;
    if cur.eat_keyword("type") {
        if cur.eat_keyword("from") {
            cur.pos = save;
        } else {
            type_only = true;
        }
    }

    if let Some(c) = cur.peek() {
        if super::scan::is_ident_start(c) {
            default_name = cur.eat_ident().map(str::to_string);
            cur.eat_char(b',');
        }
    }

    match cur.peek() {
        Some(b'{') => {
            let open = cur.pos;
            let close = matching(src, cls, open)
                .ok_or_else(|| ScaffoldError::parse(model.path(), "unbalanced import list"))?;
            brace = Some(open..close + 1);
            for entry in model.array_elements(&(open..close + 1))? {
                let text = src[entry].to_string();
                let name = super::scan::leading_identifier(&text).to_string();
                if !name.is_empty() {
                    names.push(name);
                }
                entries.push(text.trim().to_string());
            }
            cur.pos = close + 1;
        }
        Some(b'*') => {
            cur.pos += 1;
            if cur.eat_keyword("as") {
                namespace = cur.eat_ident().map(str::to_string);
            }
        }
        _ => {}
    }

    if !cur.eat_keyword("from") {
        // Not a shape we recognize (e.g. `import = require(...)`); skip it.
        return Ok(None);
    }
    let Some((module, quote)) = peek_string(src, cls, cur) else {
        return Ok(None);
    };
    cur.eat_string();
    cur.eat_char(b';');

    Ok(Some(ImportDecl {
        span: start..cur.pos,
        module,
        names,
        entries,
        brace,
        default_name,
        namespace,
        type_only,
        quote,
    }))
}

fn peek_string(src: &str, cls: &[Class], cur: &mut Cursor) -> Option<(String, u8)> {
    cur.skip_trivia();
    let q = *src.as_bytes().get(cur.pos)?;
    if (q != b'\'' && q != b'"') || cls[cur.pos] != Class::Str {
        return None;
    }
    let mut probe = Cursor::at(src, cls, cur.pos);
    probe.eat_string().map(|s| (s, q))
}

/// Idempotently ensure `names` are imported from `module_path`. Calling
/// twice with the same arguments is a no-op the second time.
pub fn ensure_import(model: &mut SourceModel, module_path: &str, names: &[&str]) -> Result<()> {
    let decls = parse_imports(model)?;
    let existing = decls
        .iter()
        .find(|d| d.module == module_path && !d.type_only);

    match existing {
        Some(decl) => {
            let missing: Vec<&str> = names
                .iter()
                .copied()
                .filter(|n| !decl.names.iter().any(|have| have == n))
                .collect();
            if missing.is_empty() {
                return Ok(());
            }
            // `import * as X from 'm'` cannot also carry a named list;
            // append a separate declaration instead.
            if decl.brace.is_none() && decl.namespace.is_some() {
                let stmt = render_import(&missing, module_path, decl.quote);
                let at = insert_offset(model, decl.span.end);
                model.splice(at..at, &stmt);
                return Ok(());
            }
            let mut items: Vec<String> = decl.entries.clone();
            items.extend(missing.iter().map(|s| s.to_string()));
            let list = format!("{{ {} }}", items.join(", "));
            match decl.brace.clone() {
                Some(brace) => model.splice(brace, &list),
                None => {
                    // Default-only import: `import App from 'm'` →
                    // `import App, { A } from 'm'`.
                    let rebuilt = format!(
                        "import {}, {} from {q}{}{q};",
                        decl.default_name.clone().unwrap_or_default(),
                        list,
                        module_path,
                        q = decl.quote as char,
                    );
                    model.splice(decl.span.clone(), &rebuilt);
                }
            }
            Ok(())
        }
        None => {
            let quote = decls.first().map(|d| d.quote).unwrap_or(b'\'');
            let stmt = render_import(names, module_path, quote);
            let at = decls
                .last()
                .map(|d| insert_offset(model, d.span.end))
                .unwrap_or(0);
            model.splice(at..at, &stmt);
            Ok(())
        }
    }
}

/// Idempotently ensure `import * as alias from 'module_path';`. An existing
/// namespace import under the same alias wins; a namespace import under a
/// different alias is left alone and a second declaration is appended.
pub fn ensure_namespace_import(
    model: &mut SourceModel,
    module_path: &str,
    alias: &str,
) -> Result<()> {
    let decls = parse_imports(model)?;
    if decls
        .iter()
        .any(|d| d.module == module_path && d.namespace.as_deref() == Some(alias))
    {
        return Ok(());
    }
    let quote = decls.first().map(|d| d.quote).unwrap_or(b'\'');
    let q = quote as char;
    let stmt = format!("import * as {alias} from {q}{module_path}{q};\n");
    let at = decls
        .last()
        .map(|d| insert_offset(model, d.span.end))
        .unwrap_or(0);
    model.splice(at..at, &stmt);
    Ok(())
}

fn render_import(names: &[&str], module_path: &str, quote: u8) -> String {
    let q = quote as char;
    format!("import {{ {} }} from {q}{module_path}{q};\n", names.join(", "))
}

/// Offset of the start of the line following `after` — new imports are
/// appended at the end of the existing import section, never sorted in.
fn insert_offset(model: &SourceModel, after: usize) -> usize {
    model.text()[after..]
        .find('\n')
        .map(|i| after + i + 1)
        .unwrap_or(model.text().len())
}

// rewrite/mod.rs — AST-based source rewriting for the two target files.
//
// `SourceModel` is an in-memory mutable view of one source file, loaded
// from exactly one path and written back to that same path. The editors
// (imports, decorator, bootstrap) only use the structural finders exposed
// here — classes, decorators, functions, statements, object properties —
// never the raw scanner, so the scanning engine can be swapped without
// touching editor logic.
//
// The rewriter recognizes exactly two file shapes: a decorator-configured
// class (app.module.ts) and a single bootstrap function (main.ts). On any
// structure it does not recognize it fails closed with a Structure error
// instead of attempting a best-effort edit.

pub mod bootstrap;
pub mod decorator;
pub mod imports;
pub mod scan;

use std::ops::Range;
use std::path::{Path, PathBuf};

use crate::error::{Result, ScaffoldError};
use scan::{matching, Class, Cursor};

/// A decorator attached to a class, e.g. `@Module({ ... })`.
#[derive(Debug, Clone)]
pub struct DecoratorView {
    pub name: String,
    /// Span of the sole object-literal argument, braces included, when the
    /// decorator is called with one.
    pub arg_object: Option<Range<usize>>,
}

/// A top-level class declaration and its attached decorators.
#[derive(Debug, Clone)]
pub struct ClassView {
    pub name: String,
    pub decorators: Vec<DecoratorView>,
}

/// A top-level function declaration. `body` is the span between the body
/// braces, braces excluded.
#[derive(Debug, Clone)]
pub struct FunctionView {
    pub name: String,
    pub body: Range<usize>,
}

/// One top-level statement inside a function body (content span, trimmed).
#[derive(Debug, Clone)]
pub struct StatementView {
    pub span: Range<usize>,
}

/// One property entry of an object literal.
#[derive(Debug, Clone)]
pub struct PropertyView {
    pub key: String,
    pub key_start: usize,
    /// Span of the value expression (trimmed). For shorthand properties
    /// this is the whole entry.
    pub value: Range<usize>,
}

/// Mutable model of one source file. Created at mutation start, discarded
/// after save or rollback — never persisted.
pub struct SourceModel {
    path: PathBuf,
    text: String,
}

impl SourceModel {
    /// Read and validate `path`. Fails with `NotFound` if the file does not
    /// exist and `Parse` if it is not syntactically plausible TypeScript.
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ScaffoldError::NotFound(path.to_path_buf()));
        }
        let text = tokio::fs::read_to_string(path).await?;
        Self::from_source(path, text)
    }

    /// Build a model from already-read source. Used by `load` and by tests.
    pub fn from_source(path: &Path, text: String) -> Result<Self> {
        let model = Self {
            path: path.to_path_buf(),
            text,
        };
        // Classification plus overall bracket balance is the parse gate.
        let cls = model.classified()?;
        model.check_balance(&cls)?;
        Ok(model)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Write the (possibly mutated) text back to the originating path.
    pub async fn save(&self) -> Result<()> {
        tokio::fs::write(&self.path, &self.text).await?;
        Ok(())
    }

    /// Replace a byte range of the source. Spans held by callers are
    /// invalidated; editors re-run their finders after every splice.
    pub(crate) fn splice(&mut self, range: Range<usize>, replacement: &str) {
        self.text.replace_range(range, replacement);
    }

    pub(crate) fn classified(&self) -> Result<Vec<Class>> {
        scan::classify(&self.text).map_err(|detail| ScaffoldError::parse(&self.path, detail))
    }

    fn check_balance(&self, cls: &[Class]) -> Result<()> {
        let mut stack = Vec::new();
        for (i, b) in self.text.bytes().enumerate() {
            if cls[i] != Class::Code {
                continue;
            }
            match b {
                b'(' | b'[' | b'{' => stack.push(b),
                b')' | b']' | b'}' => {
                    let expect = match b {
                        b')' => b'(',
                        b']' => b'[',
                        _ => b'{',
                    };
                    if stack.pop() != Some(expect) {
                        return Err(ScaffoldError::parse(
                            &self.path,
                            format!("unbalanced `{}` at byte {i}", b as char),
                        ));
                    }
                }
                _ => {}
            }
        }
        if let Some(open) = stack.pop() {
            return Err(ScaffoldError::parse(
                &self.path,
                format!("unclosed `{}`", open as char),
            ));
        }
        Ok(())
    }

    pub(crate) fn structure_err(&self, detail: impl Into<String>) -> ScaffoldError {
        ScaffoldError::structure(&self.path, detail)
    }

    // ─── Structural finders ──────────────────────────────────────────────

    /// Find the top-level class named `name` together with its decorators.
    pub fn find_class(&self, name: &str) -> Result<Option<ClassView>> {
        let cls = self.classified()?;
        let src = self.text.as_str();
        let b = src.as_bytes();
        let mut cur = Cursor::new(src, &cls);
        let mut pending: Vec<DecoratorView> = Vec::new();

        loop {
            cur.skip_trivia();
            if cur.eof() {
                return Ok(None);
            }
            let i = cur.pos;
            if cls[i] != Class::Code {
                // A top-level string (e.g. 'use strict';) — step past the run.
                while cur.pos < b.len() && cls[cur.pos] != Class::Code {
                    cur.pos += 1;
                }
                pending.clear();
                continue;
            }
            match b[i] {
                b'@' => {
                    cur.pos += 1;
                    let Some(first) = cur.eat_ident() else {
                        pending.clear();
                        continue;
                    };
                    let mut deco_name = first.to_string();
                    while cur.eat_char(b'.') {
                        match cur.eat_ident() {
                            Some(part) => {
                                deco_name.push('.');
                                deco_name.push_str(part);
                            }
                            None => break,
                        }
                    }
                    let mut arg_object = None;
                    if cur.peek() == Some(b'(') {
                        let open = cur.pos;
                        let close = matching(src, &cls, open).ok_or_else(|| {
                            ScaffoldError::parse(&self.path, "unbalanced decorator call")
                        })?;
                        let mut inner = Cursor::at(src, &cls, open + 1);
                        if inner.peek() == Some(b'{') {
                            if let Some(obj_close) = matching(src, &cls, inner.pos) {
                                if obj_close < close {
                                    arg_object = Some(inner.pos..obj_close + 1);
                                }
                            }
                        }
                        cur.pos = close + 1;
                    }
                    pending.push(DecoratorView {
                        name: deco_name,
                        arg_object,
                    });
                }
                b'(' | b'[' | b'{' => {
                    cur.skip_balanced(b[i]);
                    pending.clear();
                }
                c if scan::is_ident_start(c) => {
                    let id = cur.eat_ident().unwrap_or_default();
                    match id {
                        // Modifiers between decorators and the class keyword.
                        "export" | "default" | "abstract" => {}
                        "class" => {
                            let class_name = cur.eat_ident().map(str::to_string);
                            // Skip heritage clause up to the class body.
                            loop {
                                match cur.peek() {
                                    Some(b'{') => {
                                        cur.skip_balanced(b'{');
                                        break;
                                    }
                                    Some(b'(') => {
                                        cur.skip_balanced(b'(');
                                    }
                                    Some(b'<') => {
                                        self.skip_angles(&mut cur)?;
                                    }
                                    Some(_) => {
                                        if cur.eat_ident().is_none() {
                                            cur.pos += 1;
                                        }
                                    }
                                    None => break,
                                }
                            }
                            let found = ClassView {
                                name: class_name.unwrap_or_default(),
                                decorators: std::mem::take(&mut pending),
                            };
                            if found.name == name {
                                return Ok(Some(found));
                            }
                        }
                        _ => pending.clear(),
                    }
                }
                _ => {
                    cur.pos += 1;
                    pending.clear();
                }
            }
        }
    }

    /// Find the top-level function declaration named `name`.
    pub fn find_function(&self, name: &str) -> Result<Option<FunctionView>> {
        let cls = self.classified()?;
        let src = self.text.as_str();
        let b = src.as_bytes();
        let mut cur = Cursor::new(src, &cls);

        loop {
            cur.skip_trivia();
            if cur.eof() {
                return Ok(None);
            }
            let i = cur.pos;
            if cls[i] != Class::Code {
                while cur.pos < b.len() && cls[cur.pos] != Class::Code {
                    cur.pos += 1;
                }
                continue;
            }
            match b[i] {
                b'(' | b'[' | b'{' => {
                    cur.skip_balanced(b[i]);
                }
                c if scan::is_ident_start(c) => {
                    let id = cur.eat_ident().unwrap_or_default();
                    if id != "function" {
                        continue;
                    }
                    // Optional generator star would appear here; not supported,
                    // the finder simply will not match the name.
                    let Some(fn_name) = cur.eat_ident() else {
                        continue;
                    };
                    let fn_name = fn_name.to_string();
                    if cur.peek() != Some(b'(') {
                        continue;
                    }
                    cur.skip_balanced(b'(');
                    if cur.eat_char(b':') {
                        self.skip_type_annotation(&mut cur)?;
                    }
                    if cur.peek() != Some(b'{') {
                        continue;
                    }
                    let body_open = cur.pos;
                    let body_close = matching(src, &cls, body_open).ok_or_else(|| {
                        ScaffoldError::parse(&self.path, "unbalanced function body")
                    })?;
                    if fn_name == name {
                        return Ok(Some(FunctionView {
                            name: fn_name,
                            body: body_open + 1..body_close,
                        }));
                    }
                    cur.pos = body_close + 1;
                }
                _ => cur.pos += 1,
            }
        }
    }

    /// Split a function body into its top-level statements, in order.
    pub fn statements(&self, body: &Range<usize>) -> Result<Vec<StatementView>> {
        let cls = self.classified()?;
        let src = self.text.as_str();
        let b = src.as_bytes();
        let mut out = Vec::new();
        let mut cur = Cursor::at(src, &cls, body.start);

        while cur.pos < body.end {
            cur.skip_trivia();
            if cur.pos >= body.end {
                break;
            }
            let start = cur.pos;
            let mut end = None;
            while cur.pos < body.end {
                if cls[cur.pos] != Class::Code {
                    while cur.pos < body.end && cls[cur.pos] != Class::Code {
                        cur.pos += 1;
                    }
                    continue;
                }
                match b[cur.pos] {
                    b'(' | b'[' => {
                        cur.skip_balanced(b[cur.pos]);
                    }
                    b'{' => {
                        cur.skip_balanced(b'{');
                        // A block may end the statement (if/for/try bodies)
                        // unless a continuation follows.
                        let after = cur.pos;
                        let mut look = Cursor::at(src, &cls, after);
                        let continues = match look.peek() {
                            Some(b';') | Some(b'.') | Some(b'(') | Some(b'[') | Some(b',')
                            | Some(b'=') | Some(b':') | Some(b'+') | Some(b'-') => true,
                            Some(c) if scan::is_ident_start(c) => {
                                let save = look.pos;
                                let kw = look.eat_ident().unwrap_or_default();
                                look.pos = save;
                                matches!(kw, "else" | "catch" | "finally" | "while")
                            }
                            _ => false,
                        };
                        if !continues || look.pos >= body.end {
                            end = Some(after);
                            break;
                        }
                    }
                    b';' => {
                        cur.pos += 1;
                        end = Some(cur.pos);
                        break;
                    }
                    _ => cur.pos += 1,
                }
            }
            let end = end.unwrap_or_else(|| cur.pos.min(body.end));
            let text = &src[start..end];
            let trimmed_len = text.trim_end().len();
            if trimmed_len > 0 {
                out.push(StatementView {
                    span: start..start + trimmed_len,
                });
            }
        }
        Ok(out)
    }

    /// Top-level properties of an object literal (span includes braces).
    pub fn object_properties(&self, obj: &Range<usize>) -> Result<Vec<PropertyView>> {
        let entries = self.split_commas(obj.start + 1, obj.end - 1)?;
        let src = self.text.as_str();
        let mut out = Vec::new();
        for entry in entries {
            let text = &src[entry.clone()];
            let colon = self.top_level_colon(&entry)?;
            match colon {
                Some(at) => {
                    let key = src[entry.start..at].trim().trim_matches(['\'', '"']).to_string();
                    let mut vstart = at + 1;
                    while vstart < entry.end && src.as_bytes()[vstart].is_ascii_whitespace() {
                        vstart += 1;
                    }
                    out.push(PropertyView {
                        key,
                        key_start: entry.start,
                        value: vstart..entry.end,
                    });
                }
                None => {
                    // Shorthand or spread entry.
                    out.push(PropertyView {
                        key: scan::leading_identifier(text).to_string(),
                        key_start: entry.start,
                        value: entry,
                    });
                }
            }
        }
        Ok(out)
    }

    /// Element spans of an array literal (span includes brackets).
    pub fn array_elements(&self, arr: &Range<usize>) -> Result<Vec<Range<usize>>> {
        self.split_commas(arr.start + 1, arr.end - 1)
    }

    // ─── Span utilities ──────────────────────────────────────────────────

    /// Split `start..end` at top-level commas, returning trimmed non-empty
    /// member spans.
    fn split_commas(&self, start: usize, end: usize) -> Result<Vec<Range<usize>>> {
        let cls = self.classified()?;
        let src = self.text.as_str();
        let b = src.as_bytes();
        let mut out = Vec::new();
        let mut item_start = start;
        let mut cur = Cursor::at(src, &cls, start);

        let push = |s: usize, e: usize, out: &mut Vec<Range<usize>>| {
            let text = &src[s..e];
            let lead = text.len() - text.trim_start().len();
            let trail = text.trim_end().len();
            if trail > lead {
                out.push(s + lead..s + trail);
            }
        };

        while cur.pos < end {
            if cls[cur.pos] != Class::Code {
                cur.pos += 1;
                continue;
            }
            match b[cur.pos] {
                b'(' | b'[' | b'{' => {
                    cur.skip_balanced(b[cur.pos]);
                }
                b',' => {
                    push(item_start, cur.pos, &mut out);
                    cur.pos += 1;
                    item_start = cur.pos;
                }
                _ => cur.pos += 1,
            }
        }
        push(item_start, end, &mut out);
        Ok(out)
    }

    /// Byte offset of the first top-level `:` in an entry span, ignoring
    /// ternaries inside nested groups and arrow-function bodies.
    fn top_level_colon(&self, entry: &Range<usize>) -> Result<Option<usize>> {
        let cls = self.classified()?;
        let b = self.text.as_bytes();
        let mut cur = Cursor::at(&self.text, &cls, entry.start);
        while cur.pos < entry.end {
            if cls[cur.pos] != Class::Code {
                cur.pos += 1;
                continue;
            }
            match b[cur.pos] {
                b'(' | b'[' | b'{' => {
                    cur.skip_balanced(b[cur.pos]);
                }
                b'?' => return Ok(None), // ternary — not a plain property
                b':' => return Ok(Some(cur.pos)),
                _ => cur.pos += 1,
            }
        }
        Ok(None)
    }

    fn skip_angles(&self, cur: &mut Cursor) -> Result<()> {
        // `<...>` generic clause; assumes the scanner already guaranteed
        // global bracket balance.
        let b = self.text.as_bytes();
        let cls = self.classified()?;
        let mut depth = 0usize;
        while cur.pos < b.len() {
            if cls[cur.pos] == Class::Code {
                match b[cur.pos] {
                    b'<' => depth += 1,
                    b'>' => {
                        depth -= 1;
                        if depth == 0 {
                            cur.pos += 1;
                            return Ok(());
                        }
                    }
                    b'(' | b'[' | b'{' => {
                        cur.skip_balanced(b[cur.pos]);
                        continue;
                    }
                    _ => {}
                }
            }
            cur.pos += 1;
        }
        Err(ScaffoldError::parse(&self.path, "unclosed generic clause"))
    }

    /// Skip a return-type annotation after `:`, stopping at the `{` that
    /// opens the function body.
    fn skip_type_annotation(&self, cur: &mut Cursor) -> Result<()> {
        let cls = self.classified()?;
        let b = self.text.as_bytes();
        // Tracks whether the previous significant token completed a type
        // expression; a `{` after a complete type is the function body, a
        // `{` elsewhere is an object-type literal.
        let mut complete = false;
        loop {
            cur.skip_trivia();
            if cur.eof() {
                return Err(ScaffoldError::parse(&self.path, "missing function body"));
            }
            if cls[cur.pos] != Class::Code {
                // String-literal types are complete expressions.
                while cur.pos < b.len() && cls[cur.pos] != Class::Code {
                    cur.pos += 1;
                }
                complete = true;
                continue;
            }
            match b[cur.pos] {
                b'{' if complete => return Ok(()),
                b'{' | b'(' | b'[' => {
                    cur.skip_balanced(b[cur.pos]);
                    complete = true;
                }
                b'<' => {
                    self.skip_angles(cur)?;
                    complete = true;
                }
                b'|' | b'&' | b',' | b'.' => {
                    cur.pos += 1;
                    complete = false;
                }
                b'=' if b.get(cur.pos + 1) == Some(&b'>') => {
                    cur.pos += 2;
                    complete = false;
                }
                c if scan::is_ident_start(c) => {
                    cur.eat_ident();
                    complete = true;
                }
                _ => cur.pos += 1,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn model(src: &str) -> SourceModel {
        SourceModel::from_source(Path::new("test.ts"), src.to_string()).unwrap()
    }

    const APP_MODULE: &str = r#"import { Module } from '@nestjs/common';
import { AppController } from './app.controller';

@Module({
  imports: [],
  controllers: [AppController],
  providers: [AppService],
})
export class AppModule {}
"#;

    #[test]
    fn finds_decorated_class() {
        let m = model(APP_MODULE);
        let class = m.find_class("AppModule").unwrap().unwrap();
        assert_eq!(class.name, "AppModule");
        assert_eq!(class.decorators.len(), 1);
        assert_eq!(class.decorators[0].name, "Module");
        assert!(class.decorators[0].arg_object.is_some());
    }

    #[test]
    fn missing_class_is_none() {
        let m = model(APP_MODULE);
        assert!(m.find_class("OtherModule").unwrap().is_none());
    }

    #[test]
    fn reads_decorator_object_properties() {
        let m = model(APP_MODULE);
        let class = m.find_class("AppModule").unwrap().unwrap();
        let obj = class.decorators[0].arg_object.clone().unwrap();
        let props = m.object_properties(&obj).unwrap();
        let keys: Vec<&str> = props.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, ["imports", "controllers", "providers"]);
        let imports = &props[0];
        assert!(m.text()[imports.value.clone()].starts_with('['));
    }

    #[test]
    fn finds_bootstrap_function_and_statements() {
        let src = r#"import { NestFactory } from '@nestjs/core';

async function bootstrap() {
  const app = await NestFactory.create(AppModule);
  app.enableCors();
  await app.listen(3000);
}
bootstrap();
"#;
        let m = model(src);
        let f = m.find_function("bootstrap").unwrap().unwrap();
        let stmts = m.statements(&f.body).unwrap();
        assert_eq!(stmts.len(), 3);
        assert!(m.text()[stmts[2].span.clone()].contains(".listen(3000)"));
    }

    #[test]
    fn statement_split_handles_blocks_and_nested_braces() {
        let src = r#"async function bootstrap() {
  const app = await NestFactory.create(AppModule, { cors: true });
  if (process.env.PREFIX) {
    app.setGlobalPrefix(process.env.PREFIX);
  }
  await app.listen(3000);
}
"#;
        let m = model(src);
        let f = m.find_function("bootstrap").unwrap().unwrap();
        let stmts = m.statements(&f.body).unwrap();
        assert_eq!(stmts.len(), 3);
        assert!(m.text()[stmts[1].span.clone()].starts_with("if"));
    }

    #[test]
    fn function_with_return_type_is_found() {
        let src = "export async function bootstrap(): Promise<void> {\n  await app.listen(3000);\n}\n";
        let m = model(src);
        let f = m.find_function("bootstrap").unwrap().unwrap();
        assert_eq!(m.statements(&f.body).unwrap().len(), 1);
    }

    #[test]
    fn class_keyword_in_string_is_ignored() {
        let src = "const s = 'export class AppModule';\n@Module({})\nexport class AppModule {}\n";
        let m = model(src);
        let class = m.find_class("AppModule").unwrap().unwrap();
        assert_eq!(class.decorators.len(), 1);
    }

    #[test]
    fn unbalanced_source_fails_parse() {
        let err = SourceModel::from_source(Path::new("bad.ts"), "function f() {".to_string());
        assert!(matches!(err, Err(ScaffoldError::Parse { .. })));
    }

    #[test]
    fn array_elements_split_on_top_level_commas_only() {
        let src = "const x = [ConfigModule.forRoot({ a: 1, b: [2, 3] }), AuthModule];\n";
        let m = model(src);
        let open = src.find('[').unwrap();
        let cls = m.classified().unwrap();
        let close = scan::matching(src, &cls, open).unwrap();
        let elems = m.array_elements(&(open..close + 1)).unwrap();
        assert_eq!(elems.len(), 2);
        assert!(m.text()[elems[0].clone()].starts_with("ConfigModule"));
        assert_eq!(&m.text()[elems[1].clone()], "AuthModule");
    }
}

// rewrite/scan.rs — character-level scanning over TypeScript source.
//
// The rewriter never works on raw text: every structural find runs over a
// classification mask that marks each byte as code, string content, or
// comment, so a `class` keyword inside a template literal or a `//` inside
// a string can never confuse the finders. Regex literals are not modeled;
// the two file shapes the rewriter targets (a decorator-configured module
// class and a bootstrap function) do not contain them, and anything the
// scanner cannot classify makes the whole load fail closed.

/// Byte classification. Quote and comment delimiters are classified the
/// same as their contents, so `Code` positions are always semantically
/// significant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Class {
    Code,
    Str,
    Comment,
}

/// Classify every byte of `src`. Fails on an unterminated string, template
/// literal, or block comment.
pub fn classify(src: &str) -> Result<Vec<Class>, String> {
    let b = src.as_bytes();
    let mut out = vec![Class::Code; b.len()];
    let mut i = 0;

    // Template literals nest through `${ ... }` expressions: inside an
    // expression we are back in code, but a `}` at expression depth zero
    // returns to the enclosing template string.
    enum Ctx {
        Template,
        Expr(usize),
    }
    let mut stack: Vec<Ctx> = Vec::new();

    while i < b.len() {
        if matches!(stack.last(), Some(Ctx::Template)) {
            out[i] = Class::Str;
            match b[i] {
                b'\\' if i + 1 < b.len() => {
                    out[i + 1] = Class::Str;
                    i += 2;
                }
                b'`' => {
                    stack.pop();
                    i += 1;
                }
                b'$' if b.get(i + 1) == Some(&b'{') => {
                    out[i + 1] = Class::Str;
                    stack.push(Ctx::Expr(0));
                    i += 2;
                }
                _ => i += 1,
            }
            continue;
        }

        match b[i] {
            b'/' if b.get(i + 1) == Some(&b'/') => {
                while i < b.len() && b[i] != b'\n' {
                    out[i] = Class::Comment;
                    i += 1;
                }
            }
            b'/' if b.get(i + 1) == Some(&b'*') => {
                let start = i;
                out[i] = Class::Comment;
                out[i + 1] = Class::Comment;
                i += 2;
                loop {
                    if i + 1 >= b.len() {
                        return Err(format!("unterminated block comment at byte {start}"));
                    }
                    out[i] = Class::Comment;
                    if b[i] == b'*' && b[i + 1] == b'/' {
                        out[i + 1] = Class::Comment;
                        i += 2;
                        break;
                    }
                    i += 1;
                }
            }
            q @ (b'\'' | b'"') => {
                let start = i;
                out[i] = Class::Str;
                i += 1;
                loop {
                    if i >= b.len() || b[i] == b'\n' {
                        return Err(format!("unterminated string at byte {start}"));
                    }
                    out[i] = Class::Str;
                    if b[i] == b'\\' && i + 1 < b.len() {
                        out[i + 1] = Class::Str;
                        i += 2;
                        continue;
                    }
                    if b[i] == q {
                        i += 1;
                        break;
                    }
                    i += 1;
                }
            }
            b'`' => {
                out[i] = Class::Str;
                stack.push(Ctx::Template);
                i += 1;
            }
            b'{' => {
                if let Some(Ctx::Expr(d)) = stack.last_mut() {
                    *d += 1;
                }
                i += 1;
            }
            b'}' => {
                if let Some(Ctx::Expr(d)) = stack.last_mut() {
                    if *d == 0 {
                        out[i] = Class::Str;
                        stack.pop();
                    } else {
                        *d -= 1;
                    }
                }
                i += 1;
            }
            _ => i += 1,
        }
    }

    if !stack.is_empty() {
        return Err("unterminated template literal".to_string());
    }
    Ok(out)
}

pub fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_' || c == b'$'
}

pub fn is_ident_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_' || c == b'$'
}

/// Given `open` pointing at a code-classified `(`, `[` or `{`, return the
/// index of the matching closer, honoring nesting and skipping non-code
/// bytes.
pub fn matching(src: &str, cls: &[Class], open: usize) -> Option<usize> {
    let b = src.as_bytes();
    let (oc, cc) = match b[open] {
        b'(' => (b'(', b')'),
        b'[' => (b'[', b']'),
        b'{' => (b'{', b'}'),
        _ => return None,
    };
    let mut depth = 0usize;
    let mut i = open;
    while i < b.len() {
        if cls[i] == Class::Code {
            if b[i] == oc {
                depth += 1;
            } else if b[i] == cc {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
        }
        i += 1;
    }
    None
}

/// A lightweight forward cursor over classified source. All helpers skip
/// whitespace and comments before looking at anything.
pub struct Cursor<'a> {
    pub src: &'a str,
    pub cls: &'a [Class],
    pub pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(src: &'a str, cls: &'a [Class]) -> Self {
        Self { src, cls, pos: 0 }
    }

    pub fn at(src: &'a str, cls: &'a [Class], pos: usize) -> Self {
        Self { src, cls, pos }
    }

    fn bytes(&self) -> &'a [u8] {
        self.src.as_bytes()
    }

    pub fn eof(&self) -> bool {
        self.pos >= self.src.len()
    }

    /// Skip whitespace and comment bytes. Stops at code or at the opening
    /// quote of a string literal.
    pub fn skip_trivia(&mut self) {
        let b = self.bytes();
        while self.pos < b.len() {
            match self.cls[self.pos] {
                Class::Comment => self.pos += 1,
                Class::Code if b[self.pos].is_ascii_whitespace() => self.pos += 1,
                _ => break,
            }
        }
    }

    /// The next significant byte without consuming it.
    pub fn peek(&mut self) -> Option<u8> {
        self.skip_trivia();
        self.bytes().get(self.pos).copied()
    }

    /// Consume `c` if it is the next significant code byte.
    pub fn eat_char(&mut self, c: u8) -> bool {
        self.skip_trivia();
        if self.bytes().get(self.pos) == Some(&c) && self.cls[self.pos] == Class::Code {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Consume and return the next identifier, if one starts here.
    pub fn eat_ident(&mut self) -> Option<&'a str> {
        self.skip_trivia();
        let b = self.bytes();
        if self.pos >= b.len() || self.cls[self.pos] != Class::Code || !is_ident_start(b[self.pos])
        {
            return None;
        }
        let start = self.pos;
        while self.pos < b.len() && is_ident_char(b[self.pos]) {
            self.pos += 1;
        }
        Some(&self.src[start..self.pos])
    }

    /// Consume the exact keyword `kw` (with identifier boundary), if present.
    pub fn eat_keyword(&mut self, kw: &str) -> bool {
        let save = self.pos;
        match self.eat_ident() {
            Some(id) if id == kw => true,
            _ => {
                self.pos = save;
                false
            }
        }
    }

    /// Consume a plain string literal and return its unquoted contents.
    /// Template literals are not accepted here.
    pub fn eat_string(&mut self) -> Option<String> {
        self.skip_trivia();
        let b = self.bytes();
        let q = *b.get(self.pos)?;
        if (q != b'\'' && q != b'"') || self.cls[self.pos] != Class::Str {
            return None;
        }
        let start = self.pos;
        let mut i = self.pos + 1;
        while i < b.len() && self.cls[i] == Class::Str {
            if b[i] == q && b[i - 1] != b'\\' {
                self.pos = i + 1;
                return Some(self.src[start + 1..i].to_string());
            }
            i += 1;
        }
        None
    }

    /// Skip a balanced group starting at the next significant byte, which
    /// must be `open`. Returns the index just past the closer.
    pub fn skip_balanced(&mut self, open: u8) -> Option<usize> {
        self.skip_trivia();
        if self.bytes().get(self.pos) != Some(&open) || self.cls[self.pos] != Class::Code {
            return None;
        }
        let close = matching(self.src, self.cls, self.pos)?;
        self.pos = close + 1;
        Some(self.pos)
    }
}

/// Indentation (leading spaces/tabs) of the line containing byte `at`.
pub fn line_indent(src: &str, at: usize) -> String {
    let b = src.as_bytes();
    let line_start = src[..at].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let mut end = line_start;
    while end < b.len() && (b[end] == b' ' || b[end] == b'\t') {
        end += 1;
    }
    src[line_start..end].to_string()
}

/// Start-of-line offset for the line containing byte `at`.
pub fn line_start(src: &str, at: usize) -> usize {
    src[..at].rfind('\n').map(|i| i + 1).unwrap_or(0)
}

/// Leading identifier of a source expression: the token sequence before any
/// `(`, `.`, or other punctuation. `Foo.configure({...})` yields `Foo`.
pub fn leading_identifier(expr: &str) -> &str {
    let b = expr.trim_start();
    let bytes = b.as_bytes();
    let mut end = 0;
    while end < bytes.len() && is_ident_char(bytes[end]) {
        end += 1;
    }
    &b[..end]
}

//! A small JavaScript/TypeScript tokenizer.
//!
//! Produces a flat token list with byte spans. Comments and whitespace are
//! dropped, but each token remembers whether a line break preceded it and how
//! deeply it is nested in `()`, `[]`, `{}` and template substitutions.
//! Opening and closing brackets carry the depth of their surroundings, so a
//! bracket and its partner always share a depth.

use serde::Serialize;

/// Byte range within a source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start: start as u32,
            end: end as u32,
        }
    }

    /// Smallest span covering both.
    #[must_use]
    pub fn to(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Str,
    /// A template chunk: from a backtick or `}` up to the next `${` or backtick.
    Template,
    Number,
    Regex,
    Punct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub depth: u32,
    pub newline_before: bool,
}

impl Token {
    #[must_use]
    pub fn text<'a>(&self, src: &'a str) -> &'a str {
        src.get(self.span.start as usize..self.span.end as usize)
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bracket {
    Paren,
    Square,
    Brace,
    Substitution,
}

const PUNCTUATORS: &[&str] = &[
    ">>>=", "...", "===", "!==", "**=", "<<=", ">>=", ">>>", "&&=", "||=", "??=", "=>", "==",
    "!=", "<=", ">=", "&&", "||", "??", "?.", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=",
    "|=", "^=", "**", "<<", ">>",
];

/// Keywords after which a `/` starts a regular expression.
const REGEX_PRECEDING_KEYWORDS: &[&str] = &[
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case",
    "do", "else", "yield", "await",
];

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$' || b == b'\\' || b >= 0x80
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b == b'\\' || b >= 0x80
}

struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    depth: u32,
    stack: Vec<Bracket>,
    newline: bool,
    tokens: Vec<Token>,
}

/// Tokenize a source text.
#[must_use]
pub fn tokenize(src: &str) -> Vec<Token> {
    let mut lexer = Lexer {
        src,
        bytes: src.as_bytes(),
        pos: 0,
        depth: 0,
        stack: Vec::new(),
        newline: true,
        tokens: Vec::with_capacity(src.len() / 4),
    };
    lexer.run();
    lexer.tokens
}

impl<'a> Lexer<'a> {
    fn peek(&self, offset: usize) -> u8 {
        self.bytes.get(self.pos + offset).copied().unwrap_or(0)
    }

    fn push(&mut self, kind: TokenKind, start: usize, depth: u32) {
        self.tokens.push(Token {
            kind,
            span: Span::new(start, self.pos),
            depth,
            newline_before: self.newline,
        });
        self.newline = false;
    }

    fn run(&mut self) {
        if self.src.starts_with('\u{feff}') {
            self.pos = 3;
        }
        if self.bytes[self.pos..].starts_with(b"#!") {
            self.skip_line();
        }

        while self.pos < self.bytes.len() {
            let b = self.bytes[self.pos];
            match b {
                b'\n' | b'\r' => {
                    self.newline = true;
                    self.pos += 1;
                }
                b' ' | b'\t' | 0x0b | 0x0c => self.pos += 1,
                b'/' if self.peek(1) == b'/' => self.skip_line(),
                b'/' if self.peek(1) == b'*' => self.skip_block_comment(),
                b'"' | b'\'' => self.string(b),
                b'`' => {
                    let start = self.pos;
                    self.pos += 1;
                    self.template_chunk(start);
                }
                b'0'..=b'9' => self.number(),
                b'.' if self.peek(1).is_ascii_digit() => self.number(),
                b'/' if self.regex_allowed() => self.regex(),
                b'#' if is_ident_start(self.peek(1)) => {
                    let start = self.pos;
                    self.pos += 1;
                    self.ident(start);
                }
                b if is_ident_start(b) => {
                    let start = self.pos;
                    self.ident(start);
                }
                _ => self.punct(),
            }
        }
    }

    fn skip_line(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos] != b'\n' {
            self.pos += 1;
        }
    }

    fn skip_block_comment(&mut self) {
        self.pos += 2;
        while self.pos < self.bytes.len() {
            if self.bytes[self.pos] == b'*' && self.peek(1) == b'/' {
                self.pos += 2;
                return;
            }
            if self.bytes[self.pos] == b'\n' {
                self.newline = true;
            }
            self.pos += 1;
        }
    }

    fn string(&mut self, quote: u8) {
        let start = self.pos;
        self.pos += 1;
        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b'\\' => self.pos += 2,
                b'\n' => break,
                b if b == quote => {
                    self.pos += 1;
                    break;
                }
                _ => self.pos += 1,
            }
        }
        self.pos = self.pos.min(self.bytes.len());
        self.push(TokenKind::Str, start, self.depth);
    }

    /// Scan template text after a backtick or a closing substitution brace.
    fn template_chunk(&mut self, start: usize) {
        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b'\\' => self.pos += 2,
                b'`' => {
                    self.pos += 1;
                    self.push(TokenKind::Template, start, self.depth);
                    return;
                }
                b'$' if self.peek(1) == b'{' => {
                    self.pos += 2;
                    self.push(TokenKind::Template, start, self.depth);
                    self.stack.push(Bracket::Substitution);
                    self.depth += 1;
                    return;
                }
                _ => self.pos += 1,
            }
        }
        self.pos = self.bytes.len();
        self.push(TokenKind::Template, start, self.depth);
    }

    fn number(&mut self) {
        let start = self.pos;
        while self.pos < self.bytes.len() {
            let b = self.bytes[self.pos];
            if b.is_ascii_alphanumeric() || b == b'_' || b == b'.' {
                self.pos += 1;
            } else if (b == b'+' || b == b'-')
                && matches!(self.bytes[self.pos - 1], b'e' | b'E')
                && !self.src[start..self.pos].starts_with("0x")
            {
                self.pos += 1;
            } else {
                break;
            }
        }
        self.push(TokenKind::Number, start, self.depth);
    }

    fn ident(&mut self, start: usize) {
        while self.pos < self.bytes.len() && is_ident_continue(self.bytes[self.pos]) {
            self.pos += 1;
        }
        self.push(TokenKind::Ident, start, self.depth);
    }

    fn regex_allowed(&self) -> bool {
        let Some(last) = self.tokens.last() else {
            return true;
        };
        let text = last.text(self.src);
        match last.kind {
            TokenKind::Punct => !matches!(text, ")" | "]" | "}"),
            TokenKind::Ident => REGEX_PRECEDING_KEYWORDS.contains(&text),
            TokenKind::Template => text.ends_with("${"),
            _ => false,
        }
    }

    fn regex(&mut self) {
        let start = self.pos;
        let mut i = self.pos + 1;
        let mut in_class = false;
        while i < self.bytes.len() {
            match self.bytes[i] {
                b'\\' => i += 1,
                b'\n' => {
                    // Not a regular expression after all.
                    self.punct();
                    return;
                }
                b'[' => in_class = true,
                b']' => in_class = false,
                b'/' if !in_class => break,
                _ => {}
            }
            i += 1;
        }
        self.pos = (i + 1).min(self.bytes.len());
        while self.pos < self.bytes.len() && is_ident_continue(self.bytes[self.pos]) {
            self.pos += 1;
        }
        self.push(TokenKind::Regex, start, self.depth);
    }

    fn punct(&mut self) {
        let start = self.pos;
        let rest = &self.src[self.pos..];
        if let Some(p) = PUNCTUATORS.iter().find(|p| rest.starts_with(**p)) {
            self.pos += p.len();
            self.push(TokenKind::Punct, start, self.depth);
            return;
        }

        let b = self.bytes[self.pos];
        self.pos += 1;
        match b {
            b'(' | b'[' | b'{' => {
                self.push(TokenKind::Punct, start, self.depth);
                self.stack.push(match b {
                    b'(' => Bracket::Paren,
                    b'[' => Bracket::Square,
                    _ => Bracket::Brace,
                });
                self.depth += 1;
            }
            b'}' if self.stack.last() == Some(&Bracket::Substitution) => {
                self.stack.pop();
                self.depth = self.depth.saturating_sub(1);
                self.template_chunk(start);
            }
            b')' | b']' | b'}' => {
                if self.stack.pop().is_some() {
                    self.depth = self.depth.saturating_sub(1);
                }
                self.push(TokenKind::Punct, start, self.depth);
            }
            _ => self.push(TokenKind::Punct, start, self.depth),
        }
    }
}

/// Decode the value of a string literal token, including its quotes.
#[must_use]
pub fn unquote(text: &str) -> String {
    let inner = text
        .get(1..text.len().saturating_sub(1))
        .unwrap_or_default();
    if !inner.contains('\\') {
        return inner.to_string();
    }
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

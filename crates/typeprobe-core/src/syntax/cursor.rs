use super::lexer::{unquote, Span, Token, TokenKind};

/// Read access to a token list together with its source text.
#[derive(Clone, Copy)]
pub struct Cursor<'a> {
    pub src: &'a str,
    pub tokens: &'a [Token],
}

impl<'a> Cursor<'a> {
    #[must_use]
    pub fn new(src: &'a str, tokens: &'a [Token]) -> Self {
        Self { src, tokens }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Text of token `i`, or `""` past the end.
    #[must_use]
    pub fn text(&self, i: usize) -> &'a str {
        self.tokens.get(i).map_or("", |t| t.text(self.src))
    }

    #[must_use]
    pub fn is(&self, i: usize, text: &str) -> bool {
        self.text(i) == text
    }

    #[must_use]
    pub fn kind(&self, i: usize) -> Option<TokenKind> {
        self.tokens.get(i).map(|t| t.kind)
    }

    #[must_use]
    pub fn depth(&self, i: usize) -> u32 {
        self.tokens.get(i).map_or(0, |t| t.depth)
    }

    #[must_use]
    pub fn span(&self, i: usize) -> Span {
        self.tokens.get(i).map_or_else(
            || Span::new(self.src.len(), self.src.len()),
            |t| t.span,
        )
    }

    #[must_use]
    pub fn is_ident(&self, i: usize) -> bool {
        self.kind(i) == Some(TokenKind::Ident)
    }

    /// An identifier not preceded by `.` or `?.`, so not a property access.
    #[must_use]
    pub fn is_free_ident(&self, i: usize, name: &str) -> bool {
        self.is_ident(i) && self.is(i, name) && (i == 0 || !matches!(self.text(i - 1), "." | "?."))
    }

    /// Decoded value of a string literal (or substitution-free template).
    #[must_use]
    pub fn string_value(&self, i: usize) -> Option<String> {
        let token = self.tokens.get(i)?;
        let text = token.text(self.src);
        match token.kind {
            TokenKind::Str => Some(unquote(text)),
            TokenKind::Template if text.len() >= 2 && text.ends_with('`') && text.starts_with('`') => {
                Some(unquote(text))
            }
            _ => None,
        }
    }

    /// Property name at `i`: an identifier, or a string literal.
    #[must_use]
    pub fn property_name(&self, i: usize) -> Option<String> {
        match self.kind(i)? {
            TokenKind::Ident => Some(self.text(i).to_string()),
            TokenKind::Str => self.string_value(i),
            _ => None,
        }
    }

    /// For the opening bracket at `open`, the index of its partner.
    #[must_use]
    pub fn matching_close(&self, open: usize) -> Option<usize> {
        let depth = self.depth(open);
        (open + 1..self.tokens.len()).find(|&j| self.tokens[j].depth <= depth)
    }

    /// For the closing bracket at `close`, the index of its partner.
    #[must_use]
    pub fn matching_open(&self, close: usize) -> Option<usize> {
        let depth = self.depth(close);
        (0..close).rev().find(|&j| self.tokens[j].depth <= depth)
    }

    /// The innermost bracket enclosing token `i`.
    #[must_use]
    pub fn enclosing_open(&self, i: usize) -> Option<usize> {
        let depth = self.depth(i);
        (0..i).rev().find(|&j| self.tokens[j].depth < depth)
    }

    /// Index just past the balanced group opened at `open`, or the end.
    #[must_use]
    pub fn skip_group(&self, open: usize) -> usize {
        self.matching_close(open).map_or(self.tokens.len(), |c| c + 1)
    }

    /// Exclusive end of the statement starting at `start`.
    ///
    /// The statement ends at a `;` on its own depth, at a token closing an
    /// enclosing block, or at a line break where a new statement clearly starts.
    #[must_use]
    pub fn statement_end(&self, start: usize) -> usize {
        let depth = self.depth(start);
        let mut j = start + 1;
        while j < self.tokens.len() {
            let token = &self.tokens[j];
            if token.depth < depth {
                return j;
            }
            if token.depth == depth {
                let text = token.text(self.src);
                if text == ";" {
                    return j;
                }
                if token.newline_before && self.ends_expression(j - 1) && self.starts_statement(j) {
                    return j;
                }
            }
            j += 1;
        }
        j
    }

    /// Index of the first token of the next statement after `start`.
    #[must_use]
    pub fn next_statement(&self, start: usize) -> usize {
        let end = self.statement_end(start);
        if self.is(end, ";") {
            end + 1
        } else {
            end
        }
    }

    fn ends_expression(&self, i: usize) -> bool {
        match self.kind(i) {
            Some(TokenKind::Punct) => matches!(self.text(i), ")" | "]" | "}" | "++" | "--"),
            Some(TokenKind::Template) => self.text(i).ends_with('`'),
            Some(_) => true,
            None => false,
        }
    }

    fn starts_statement(&self, i: usize) -> bool {
        match self.kind(i) {
            Some(TokenKind::Ident) => !matches!(
                self.text(i),
                "in" | "instanceof" | "as" | "satisfies" | "extends" | "implements"
            ),
            Some(TokenKind::Str | TokenKind::Number | TokenKind::Regex) => true,
            Some(TokenKind::Template) => self.text(i).starts_with('`'),
            Some(TokenKind::Punct) => matches!(self.text(i), "{" | "!" | "~" | "++" | "--" | "@"),
            None => false,
        }
    }

    /// Find the first token in `[from, to)` with `text` at `depth`.
    #[must_use]
    pub fn find_at_depth(&self, from: usize, to: usize, depth: u32, text: &str) -> Option<usize> {
        (from..to.min(self.tokens.len()))
            .find(|&j| self.tokens[j].depth == depth && self.text(j) == text)
    }

    /// Span covering tokens `[from, to)`.
    #[must_use]
    pub fn span_of(&self, from: usize, to: usize) -> Span {
        let last = to.saturating_sub(1).max(from);
        self.span(from).to(self.span(last))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::lexer::tokenize;

    #[test]
    fn test_statement_end_with_semicolons_and_asi() {
        let src = "exports.a = 1;\nexports.b = function () { return 2 }\nconst c = 3";
        let tokens = tokenize(src);
        let cursor = Cursor::new(src, &tokens);

        let first_end = cursor.statement_end(0);
        assert!(cursor.is(first_end, ";"));

        let second = cursor.next_statement(0);
        assert_eq!(cursor.text(second), "exports");
        let third = cursor.next_statement(second);
        assert_eq!(cursor.text(third), "const");
    }

    #[test]
    fn test_statement_continues_across_operator_lines() {
        let src = "module.exports =\n  foo\nbar()";
        let tokens = tokenize(src);
        let cursor = Cursor::new(src, &tokens);
        let next = cursor.next_statement(0);
        assert_eq!(cursor.text(next), "bar");
    }

    #[test]
    fn test_matching_close() {
        let src = "f(a, (b), [c])";
        let tokens = tokenize(src);
        let cursor = Cursor::new(src, &tokens);
        assert_eq!(cursor.matching_close(1), Some(tokens.len() - 1));
        assert_eq!(cursor.skip_group(1), tokens.len());
    }

    #[test]
    fn test_free_ident() {
        let src = "a.require(x); require(y)";
        let tokens = tokenize(src);
        let cursor = Cursor::new(src, &tokens);
        assert!(!cursor.is_free_ident(2, "require"));
        assert!(cursor.is_free_ident(7, "require"));
    }
}

use crate::token::{SourceLocation, Token, TokenKind};

static EOF: Token<'static> = Token {
    kind: TokenKind::Eof,
    text: "",
    location: SourceLocation {
        line: 0,
        column: 0,
        offset: 0,
    },
    length: 0,
};

/// A cursor over a token slice.
///
/// Reading past the end yields an `Eof` token rather than panicking, so
/// grammar code can look ahead freely.
#[derive(Debug, Clone)]
pub struct TokenCursor<'t, 'a> {
    tokens: &'t [Token<'a>],
    pos: usize,
}

impl<'t, 'a> TokenCursor<'t, 'a> {
    pub fn new(tokens: &'t [Token<'a>]) -> Self {
        Self { tokens, pos: 0 }
    }

    /// The token under the cursor.
    pub fn current(&self) -> &'t Token<'a> {
        self.nth(0)
    }

    /// The token `n` places ahead.
    pub fn nth(&self, n: usize) -> &'t Token<'a> {
        match self.tokens.get(self.pos + n) {
            Some(token) => token,
            None => &EOF,
        }
    }

    pub fn kind(&self) -> TokenKind {
        self.current().kind
    }

    pub fn at(&self, kind: TokenKind) -> bool {
        self.kind() == kind
    }

    pub fn at_any(&self, kinds: &[TokenKind]) -> bool {
        kinds.contains(&self.kind())
    }

    /// At the end of the slice or on an `Eof` token.
    pub fn at_end(&self) -> bool {
        self.pos >= self.tokens.len() || self.kind() == TokenKind::Eof
    }

    /// Advance one token. Does nothing at the end of the slice.
    pub fn bump(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    /// Return the current token and advance past it.
    pub fn consume(&mut self) -> &'t Token<'a> {
        let token = self.current();
        self.bump();
        token
    }

    /// Advance if the current token has the given kind.
    pub fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    pub fn skip_while(&mut self, kinds: &[TokenKind]) {
        while !self.at_end() && self.at_any(kinds) {
            self.bump();
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Move to an absolute position, clamped to the slice.
    pub fn reset(&mut self, pos: usize) {
        self.pos = pos.min(self.tokens.len());
    }

    pub fn tokens(&self) -> &'t [Token<'a>] {
        self.tokens
    }

    /// A fresh cursor over `start..end` of this cursor's tokens.
    pub fn slice(&self, start: usize, end: usize) -> TokenCursor<'t, 'a> {
        let end = end.min(self.tokens.len());
        let start = start.min(end);
        TokenCursor::new(&self.tokens[start..end])
    }

    /// Concatenated text of the tokens in `start..end`.
    pub fn text_between(&self, start: usize, end: usize) -> String {
        let end = end.min(self.tokens.len());
        let start = start.min(end);
        self.tokens[start..end].iter().map(|t| t.text).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use pretty_assertions::assert_eq;

    #[test]
    fn cursor_basics() {
        let tokens = tokenize("a *b*");
        let mut cur = TokenCursor::new(&tokens);
        assert_eq!(cur.position(), 0);
        assert!(cur.at(TokenKind::Text));
        assert_eq!(cur.nth(2).kind, TokenKind::Asterisk);
        assert_eq!(cur.consume().text, "a");
        assert!(cur.eat(TokenKind::Whitespace));
        assert!(!cur.eat(TokenKind::Text));
        assert_eq!(cur.position(), 2);
    }

    #[test]
    fn empty_token_slice() {
        let cur = TokenCursor::new(&[]);
        assert!(cur.at_end());
        assert_eq!(cur.kind(), TokenKind::Eof);
        assert_eq!(cur.nth(5).kind, TokenKind::Eof);
    }

    #[test]
    fn eof_token_counts_as_end() {
        let tokens = tokenize("x");
        let mut cur = TokenCursor::new(&tokens);
        assert!(!cur.at_end());
        cur.bump();
        assert!(cur.at_end());
        assert_eq!(cur.position(), 1);
    }

    #[test]
    fn bump_past_end_is_idempotent() {
        let tokens = tokenize("x");
        let mut cur = TokenCursor::new(&tokens);
        for _ in 0..5 {
            cur.bump();
        }
        assert_eq!(cur.position(), tokens.len());
        assert_eq!(cur.consume().kind, TokenKind::Eof);
    }

    #[test]
    fn reset_is_clamped() {
        let tokens = tokenize("a b");
        let mut cur = TokenCursor::new(&tokens);
        cur.reset(100);
        assert_eq!(cur.position(), tokens.len());
        cur.reset(1);
        assert!(cur.at(TokenKind::Whitespace));
    }

    #[test]
    fn slice_is_independent() {
        let tokens = tokenize("**x** y");
        let cur = TokenCursor::new(&tokens);
        let mut inner = cur.slice(2, 3);
        assert_eq!(inner.consume().text, "x");
        assert!(inner.at_end());
        assert_eq!(cur.text_between(0, 5), "**x**");
        assert_eq!(cur.text_between(4, 2), "");
    }

    #[test]
    fn skip_while_stops_at_other_kinds() {
        let tokens = tokenize("\n\n  x");
        let mut cur = TokenCursor::new(&tokens);
        cur.skip_while(&[TokenKind::Newline, TokenKind::Whitespace]);
        assert_eq!(cur.current().text, "x");
    }
}

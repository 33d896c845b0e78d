use crate::token::{Span, Token, TokenKind};

static EOF: Token = Token {
    kind: TokenKind::Eof,
    span: Span {
        start: 0,
        end: 0,
        line: 1,
        column: 1,
    },
};

/// A saved cursor position, restored with [`TokenCursor::rewind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark(usize);

/// Cursor over a materialized token slice.
///
/// All tokens exist before parsing starts, so lookahead is bounded only by the
/// slice length. Reads past the end yield the final `Eof` token and rewinds
/// are clamped to the slice, so a stale mark can never index out of bounds.
#[derive(Debug, Clone)]
pub struct TokenCursor<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> TokenCursor<'t> {
    pub fn new(tokens: &'t [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    /// The current token.
    pub fn peek(&self) -> &'t Token {
        self.peek_nth(0)
    }

    /// The token `k` positions ahead of the current one.
    pub fn peek_nth(&self, k: usize) -> &'t Token {
        let tokens: &'t [Token] = self.tokens;
        match tokens.get(self.pos + k) {
            Some(token) => token,
            None => tokens.last().unwrap_or(&EOF),
        }
    }

    /// The token just before the current one, if any.
    pub fn previous(&self) -> Option<&'t Token> {
        let tokens: &'t [Token] = self.tokens;
        self.pos.checked_sub(1).and_then(|i| tokens.get(i))
    }

    /// Move past the current token. Never moves past `Eof`.
    pub fn advance(&mut self) -> &'t Token {
        let token = self.peek();
        if token.kind != TokenKind::Eof && self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn mark(&self) -> Mark {
        Mark(self.pos)
    }

    pub fn rewind(&mut self, mark: Mark) {
        self.pos = mark.0.min(self.tokens.len().saturating_sub(1));
    }

    /// Move to an absolute token position, clamped like [`TokenCursor::rewind`].
    pub fn seek(&mut self, position: usize) {
        self.rewind(Mark(position));
    }

    pub fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    pub fn tokens(&self) -> &'t [Token] {
        self.tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Dialect, Scanner};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_peek_and_advance() {
        let tokens = Scanner::tokenize("a b", Dialect::Css);
        let mut cursor = TokenCursor::new(&tokens);
        assert_eq!(cursor.peek().kind, TokenKind::Ident);
        assert_eq!(cursor.peek_nth(1).kind, TokenKind::Ws);
        cursor.advance();
        cursor.advance();
        assert_eq!(cursor.peek().kind, TokenKind::Ident);
        assert_eq!(cursor.previous().map(|t| t.kind), Some(TokenKind::Ws));
    }

    #[test]
    fn test_advance_stops_at_eof() {
        let tokens = Scanner::tokenize("a", Dialect::Css);
        let mut cursor = TokenCursor::new(&tokens);
        for _ in 0..5 {
            cursor.advance();
        }
        assert!(cursor.is_at_end());
        assert_eq!(cursor.position(), 1);
    }

    #[test]
    fn test_peek_past_end_yields_eof() {
        let tokens = Scanner::tokenize("a", Dialect::Css);
        let cursor = TokenCursor::new(&tokens);
        assert_eq!(cursor.peek_nth(100).kind, TokenKind::Eof);
    }

    #[test]
    fn test_mark_and_rewind() {
        let tokens = Scanner::tokenize("a b c", Dialect::Css);
        let mut cursor = TokenCursor::new(&tokens);
        cursor.advance();
        let mark = cursor.mark();
        cursor.advance();
        cursor.advance();
        cursor.rewind(mark);
        assert_eq!(cursor.position(), 1);
    }

    #[test]
    fn test_rewind_is_clamped() {
        let tokens = Scanner::tokenize("a", Dialect::Css);
        let mut cursor = TokenCursor::new(&tokens);
        cursor.rewind(Mark(42));
        assert_eq!(cursor.peek().kind, TokenKind::Eof);
    }

    #[test]
    fn test_empty_slice() {
        let cursor = TokenCursor::new(&[]);
        assert!(cursor.is_at_end());
        assert_eq!(cursor.previous(), None);
    }
}

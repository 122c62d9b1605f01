//! Core parser infrastructure: token cursor, node ids, error reporting.

use pigeon_lexer::token::{Token, TokenKind};
use pigeon_types::ast::{Ident, NodeId, Program};
use pigeon_types::{CodeError, Diagnostics, ErrorCode, SourceFile, Span, MAX_ERRORS};

/// Maximum nesting of blocks and expressions.
pub const MAX_NESTING_DEPTH: u32 = 64;

/// Builds a [`Program`] from the lexer's tokens, recovering after errors.
pub struct Parser<'src> {
    tokens: Vec<Token>,
    pos: usize,
    source_file: &'src SourceFile,
    errors: Diagnostics,
    next_id: u32,
    depth: u32,
}

pub struct ParseResult {
    /// `None` when any syntax error was reported.
    pub program: Option<Program>,
    pub errors: Diagnostics,
}

impl<'src> Parser<'src> {
    pub fn new(tokens: Vec<Token>, source_file: &'src SourceFile) -> Self {
        Self {
            tokens,
            pos: 0,
            source_file,
            errors: Diagnostics::empty(),
            next_id: 0,
            depth: 0,
        }
    }

    pub fn parse(mut self) -> ParseResult {
        let program = self.parse_program();
        let program = if self.errors.has_errors() {
            None
        } else {
            Some(program)
        };
        ParseResult {
            program,
            errors: self.errors,
        }
    }

    pub(crate) fn next_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    // ── Token Cursor ──────────────────────────────────────────────────────────

    pub(crate) fn peek(&self) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.pos.min(last)]
    }

    pub(crate) fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    pub(crate) fn look_ahead(&self, n: usize) -> &TokenKind {
        self.tokens
            .get(self.pos + n)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    pub(crate) fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn previous_span(&self) -> Span {
        match self.pos.checked_sub(1).and_then(|i| self.tokens.get(i)) {
            Some(token) => token.span,
            None => Span::point(1, 1),
        }
    }

    pub(crate) fn current_span(&self) -> Span {
        self.peek().span
    }

    pub(crate) fn at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    pub(crate) fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    // ── Expect Helpers ────────────────────────────────────────────────────────

    pub(crate) fn expect(&mut self, expected: &TokenKind) -> Option<Token> {
        if self.check(expected) {
            Some(self.advance())
        } else {
            let code = if self.at_end() {
                ErrorCode::UNTERMINATED
            } else {
                ErrorCode::UNEXPECTED_TOKEN
            };
            self.error_at_current(
                code,
                format!("expected '{}', got '{}'", expected, self.peek_kind()),
            );
            None
        }
    }

    pub(crate) fn expect_identifier(&mut self) -> Option<Ident> {
        match self.peek_kind().clone() {
            TokenKind::Identifier(name) => {
                let span = self.advance().span;
                Some(Ident::new(name, span))
            }
            other if other.is_keyword() => {
                // Taken as the intended name so recovery skips the rest of the statement.
                let span = self.advance().span;
                self.error_at(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("'{other}' is a reserved word and cannot be used as a name"),
                    span,
                );
                None
            }
            other => {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("expected identifier, got '{other}'"),
                );
                None
            }
        }
    }

    /// Runs `f` one nesting level deeper, refusing past [`MAX_NESTING_DEPTH`].
    pub(crate) fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Option<T>) -> Option<T> {
        if self.depth >= MAX_NESTING_DEPTH {
            self.error_at_current(
                ErrorCode::NESTING_TOO_DEEP,
                format!("nesting deeper than {MAX_NESTING_DEPTH} levels"),
            );
            return None;
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    // ── Error Reporting ───────────────────────────────────────────────────────

    pub(crate) fn error_at_current(&mut self, code: ErrorCode, message: impl Into<String>) {
        let span = self.current_span();
        self.error_at(code, message, span);
    }

    pub(crate) fn error_at(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let source_line = self.source_file.line(span.start_line).unwrap_or("");
        self.errors.push_error(CodeError::new(
            &self.source_file.name,
            code,
            message,
            span,
            source_line,
        ));
    }

    pub(crate) fn too_many_errors(&self) -> bool {
        self.errors.total_errors >= MAX_ERRORS
    }

    // ── Synchronization ───────────────────────────────────────────────────────

    /// Skips to the next likely statement boundary after an error.
    ///
    /// Stops after a `;`, or before a `}` or a token that starts a statement.
    /// Always consumes at least one token when `start` is the current position.
    pub(crate) fn synchronize(&mut self, start: usize) {
        if self.pos == start && !self.at_end() {
            if self.advance().kind == TokenKind::Semicolon {
                return;
            }
        }
        while !self.at_end() {
            match self.peek_kind() {
                TokenKind::Semicolon => {
                    self.advance();
                    return;
                }
                TokenKind::RBrace => return,
                kind if kind.starts_statement() => return,
                _ => {
                    self.advance();
                }
            }
        }
    }
}

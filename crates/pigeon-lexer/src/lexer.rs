//! Core Pigeon lexer: source text to a token stream.
//!
//! Whitespace and both comment forms (`//` and `/* */`) are skipped.
//! Errors are collected rather than stopping at the first one; the
//! offending character is skipped and scanning continues.

use pigeon_types::{CodeError, Diagnostics, ErrorCode, SourceFile, Span, MAX_ERRORS};

use crate::token::{Token, TokenKind};

/// Converts a [`SourceFile`] into [`Token`]s.
pub struct Lexer<'src> {
    source: &'src str,
    source_file: &'src SourceFile,
    /// Byte offset into `source`.
    pos: usize,
    /// 1-based position of `pos`.
    line: u32,
    col: u32,
    errors: Diagnostics,
}

/// Tokens plus any errors collected while producing them.
pub struct LexResult {
    /// Always ends with [`TokenKind::Eof`].
    pub tokens: Vec<Token>,
    pub errors: Diagnostics,
}

impl<'src> Lexer<'src> {
    pub fn new(source_file: &'src SourceFile) -> Self {
        Self {
            source: &source_file.source,
            source_file,
            pos: 0,
            line: 1,
            col: 1,
            errors: Diagnostics::empty(),
        }
    }

    pub fn lex(mut self) -> LexResult {
        let mut tokens = Vec::new();
        loop {
            let token = self.scan_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof || self.errors.total_errors >= MAX_ERRORS {
                break;
            }
        }
        if tokens.last().is_none_or(|t| t.kind != TokenKind::Eof) {
            tokens.push(Token::new(TokenKind::Eof, self.current_span()));
        }
        LexResult {
            tokens,
            errors: self.errors,
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Character-level helpers
    // ─────────────────────────────────────────────────────────────

    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.source[self.pos..].chars().nth(offset)
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn current_span(&self) -> Span {
        Span::point(self.line, self.col)
    }

    /// Span from a start position up to (and including) the last consumed character.
    fn span_from(&self, start_line: u32, start_col: u32) -> Span {
        Span::new(
            start_line,
            start_col,
            self.line,
            self.col.saturating_sub(1).max(1),
        )
    }

    fn emit_error(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let source_line = self.source_file.line(span.start_line).unwrap_or("");
        self.errors.push_error(CodeError::new(
            &self.source_file.name,
            code,
            message,
            span,
            source_line,
        ));
    }

    // ─────────────────────────────────────────────────────────────
    // Whitespace & comments
    // ─────────────────────────────────────────────────────────────

    fn skip_trivia(&mut self) {
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(ch), _) if ch.is_whitespace() => {
                    self.advance();
                }
                (Some('/'), Some('/')) => {
                    while self.peek().is_some_and(|ch| ch != '\n') {
                        self.advance();
                    }
                }
                (Some('/'), Some('*')) => self.skip_block_comment(),
                _ => return,
            }
        }
    }

    fn skip_block_comment(&mut self) {
        let (start_line, start_col) = (self.line, self.col);
        self.advance();
        self.advance();
        loop {
            match self.advance() {
                Some('*') if self.eat('/') => return,
                Some(_) => {}
                None => {
                    let span = self.span_from(start_line, start_col);
                    self.emit_error(ErrorCode::UNTERMINATED, "unterminated block comment", span);
                    return;
                }
            }
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Tokens
    // ─────────────────────────────────────────────────────────────

    fn scan_token(&mut self) -> Token {
        loop {
            self.skip_trivia();
            let (start_line, start_col) = (self.line, self.col);
            let Some(ch) = self.advance() else {
                return Token::new(TokenKind::Eof, self.current_span());
            };

            let kind = match ch {
                '"' => self.scan_string(start_line, start_col),
                '0'..='9' => self.scan_number(start_line, start_col),
                c if c.is_ascii_alphabetic() || c == '_' => self.scan_identifier(),

                '+' if self.eat('+') => TokenKind::PlusPlus,
                '+' => self.with_eq(TokenKind::Plus, TokenKind::PlusEq),
                '-' if self.eat('-') => TokenKind::MinusMinus,
                '-' => self.with_eq(TokenKind::Minus, TokenKind::MinusEq),
                '*' => self.with_eq(TokenKind::Star, TokenKind::StarEq),
                '/' => self.with_eq(TokenKind::Slash, TokenKind::SlashEq),
                '%' => self.with_eq(TokenKind::Percent, TokenKind::PercentEq),
                '!' => self.with_eq(TokenKind::Bang, TokenKind::BangEq),
                '<' => self.with_eq(TokenKind::Less, TokenKind::LessEq),
                '>' => self.with_eq(TokenKind::Greater, TokenKind::GreaterEq),
                '=' => self.with_eq(TokenKind::Eq, TokenKind::EqEq),
                '&' if self.eat('&') => TokenKind::AmpAmp,
                '|' if self.eat('|') => TokenKind::PipePipe,
                '?' => TokenKind::Question,
                ':' => TokenKind::Colon,
                '(' => TokenKind::LParen,
                ')' => TokenKind::RParen,
                '{' => TokenKind::LBrace,
                '}' => TokenKind::RBrace,
                ',' => TokenKind::Comma,
                ';' => TokenKind::Semicolon,

                other => {
                    let span = self.span_from(start_line, start_col);
                    self.emit_error(
                        ErrorCode::UNEXPECTED_TOKEN,
                        format!("unexpected character '{other}'"),
                        span,
                    );
                    continue;
                }
            };
            return Token::new(kind, self.span_from(start_line, start_col));
        }
    }

    /// `single`, or `with_eq` when followed by `=`.
    fn with_eq(&mut self, single: TokenKind, with_eq: TokenKind) -> TokenKind {
        if self.eat('=') {
            with_eq
        } else {
            single
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Literals
    // ─────────────────────────────────────────────────────────────

    /// A literal with a decimal point is a float, otherwise an int.
    fn scan_number(&mut self, start_line: u32, start_col: u32) -> TokenKind {
        let start = self.pos - 1;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        let is_float =
            self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit());
        if is_float {
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        let text = &self.source[start..self.pos];
        if is_float {
            return TokenKind::FloatLit(text.parse().unwrap_or(0.0));
        }
        match text.parse::<i64>() {
            Ok(value) => TokenKind::IntLit(value),
            Err(_) => {
                let span = self.span_from(start_line, start_col);
                self.emit_error(
                    ErrorCode::INVALID_LITERAL,
                    format!("integer literal '{text}' is out of range"),
                    span,
                );
                TokenKind::IntLit(0)
            }
        }
    }

    fn scan_string(&mut self, start_line: u32, start_col: u32) -> TokenKind {
        let mut value = String::new();
        loop {
            match self.peek() {
                None | Some('\n') => {
                    let span = self.span_from(start_line, start_col);
                    self.emit_error(ErrorCode::UNTERMINATED, "unterminated string literal", span);
                    break;
                }
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    let (esc_line, esc_col) = (self.line, self.col);
                    self.advance();
                    match self.advance() {
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some('r') => value.push('\r'),
                        Some('"') => value.push('"'),
                        Some('\\') => value.push('\\'),
                        other => {
                            let span = self.span_from(esc_line, esc_col);
                            let shown = other.map(String::from).unwrap_or_default();
                            self.emit_error(
                                ErrorCode::INVALID_LITERAL,
                                format!("unknown escape sequence '\\{shown}'"),
                                span,
                            );
                        }
                    }
                }
                Some(ch) => {
                    self.advance();
                    value.push(ch);
                }
            }
        }
        TokenKind::StringLit(value)
    }

    fn scan_identifier(&mut self) -> TokenKind {
        let start = self.pos - 1;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.advance();
        }
        let text = &self.source[start..self.pos];
        TokenKind::from_keyword(text).unwrap_or_else(|| TokenKind::Identifier(text.to_string()))
    }
}

//! Token types for the Pigeon lexer.

use pigeon_types::Span;
use std::fmt;

/// Reserved words. None of them may be used as a name.
pub const ALL_KEYWORDS: &[&str] = &[
    // Statements
    "if", "else", "for", "to", "downto", "step", "do", "while", "break", "continue", "return",
    "var", "const",
    // Type names
    "int", "float", "bool", "string", "void",
    // Literals
    "true", "false",
];

// ─────────────────────────────────────────────────────────────────────
// Token
// ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

// ─────────────────────────────────────────────────────────────────────
// TokenKind
// ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // ── Literals ──────────────────────────────────────────────
    /// `17`
    IntLit(i64),
    /// `17.0`
    FloatLit(f64),
    /// `"Hello World"`, escapes already resolved
    StringLit(String),
    True,
    False,

    Identifier(String),

    // ── Keywords ─────────────────────────────────────────────
    If,
    Else,
    For,
    To,
    Downto,
    Step,
    Do,
    While,
    Break,
    Continue,
    Return,
    Var,
    Const,

    // ── Type keywords ────────────────────────────────────────
    KwInt,
    KwFloat,
    KwBool,
    KwString,
    KwVoid,

    // ── Operators ────────────────────────────────────────────
    Plus,
    PlusEq,
    PlusPlus,
    Minus,
    MinusEq,
    MinusMinus,
    Star,
    StarEq,
    Slash,
    SlashEq,
    Percent,
    PercentEq,
    Bang,
    AmpAmp,
    PipePipe,
    Less,
    Greater,
    LessEq,
    GreaterEq,
    EqEq,
    BangEq,
    Eq,
    Question,
    Colon,

    // ── Punctuation ──────────────────────────────────────────
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Semicolon,

    Eof,
}

impl TokenKind {
    pub fn from_keyword(s: &str) -> Option<TokenKind> {
        Some(match s {
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "for" => TokenKind::For,
            "to" => TokenKind::To,
            "downto" => TokenKind::Downto,
            "step" => TokenKind::Step,
            "do" => TokenKind::Do,
            "while" => TokenKind::While,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "return" => TokenKind::Return,
            "var" => TokenKind::Var,
            "const" => TokenKind::Const,
            "int" => TokenKind::KwInt,
            "float" => TokenKind::KwFloat,
            "bool" => TokenKind::KwBool,
            "string" => TokenKind::KwString,
            "void" => TokenKind::KwVoid,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            _ => return None,
        })
    }

    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::If
                | TokenKind::Else
                | TokenKind::For
                | TokenKind::To
                | TokenKind::Downto
                | TokenKind::Step
                | TokenKind::Do
                | TokenKind::While
                | TokenKind::Break
                | TokenKind::Continue
                | TokenKind::Return
                | TokenKind::Var
                | TokenKind::Const
                | TokenKind::KwInt
                | TokenKind::KwFloat
                | TokenKind::KwBool
                | TokenKind::KwString
                | TokenKind::KwVoid
                | TokenKind::True
                | TokenKind::False
        )
    }

    /// Whether this token names a type.
    pub fn is_type_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::KwInt
                | TokenKind::KwFloat
                | TokenKind::KwBool
                | TokenKind::KwString
                | TokenKind::KwVoid
        )
    }

    /// Whether a statement can begin with this token. Used for error recovery.
    pub fn starts_statement(&self) -> bool {
        matches!(
            self,
            TokenKind::If
                | TokenKind::For
                | TokenKind::Do
                | TokenKind::While
                | TokenKind::Break
                | TokenKind::Continue
                | TokenKind::Return
                | TokenKind::Var
                | TokenKind::Const
                | TokenKind::LBrace
        ) || self.is_type_keyword()
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenKind::IntLit(n) => return write!(f, "{n}"),
            TokenKind::FloatLit(x) => return write!(f, "{x:?}"),
            TokenKind::StringLit(s) => return write!(f, "{s:?}"),
            TokenKind::Identifier(name) => return f.write_str(name),
            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::If => "if",
            TokenKind::Else => "else",
            TokenKind::For => "for",
            TokenKind::To => "to",
            TokenKind::Downto => "downto",
            TokenKind::Step => "step",
            TokenKind::Do => "do",
            TokenKind::While => "while",
            TokenKind::Break => "break",
            TokenKind::Continue => "continue",
            TokenKind::Return => "return",
            TokenKind::Var => "var",
            TokenKind::Const => "const",
            TokenKind::KwInt => "int",
            TokenKind::KwFloat => "float",
            TokenKind::KwBool => "bool",
            TokenKind::KwString => "string",
            TokenKind::KwVoid => "void",
            TokenKind::Plus => "+",
            TokenKind::PlusEq => "+=",
            TokenKind::PlusPlus => "++",
            TokenKind::Minus => "-",
            TokenKind::MinusEq => "-=",
            TokenKind::MinusMinus => "--",
            TokenKind::Star => "*",
            TokenKind::StarEq => "*=",
            TokenKind::Slash => "/",
            TokenKind::SlashEq => "/=",
            TokenKind::Percent => "%",
            TokenKind::PercentEq => "%=",
            TokenKind::Bang => "!",
            TokenKind::AmpAmp => "&&",
            TokenKind::PipePipe => "||",
            TokenKind::Less => "<",
            TokenKind::Greater => ">",
            TokenKind::LessEq => "<=",
            TokenKind::GreaterEq => ">=",
            TokenKind::EqEq => "==",
            TokenKind::BangEq => "!=",
            TokenKind::Eq => "=",
            TokenKind::Question => "?",
            TokenKind::Colon => ":",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::Comma => ",",
            TokenKind::Semicolon => ";",
            TokenKind::Eof => "end of file",
        };
        f.write_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_keyword_is_recognised() {
        for kw in ALL_KEYWORDS {
            let kind = TokenKind::from_keyword(kw)
                .unwrap_or_else(|| panic!("'{kw}' not recognised"));
            assert!(kind.is_keyword(), "'{kw}' not flagged as keyword");
            assert_eq!(kind.to_string(), *kw);
        }
    }

    #[test]
    fn keywords_are_case_sensitive() {
        assert_eq!(TokenKind::from_keyword("If"), None);
        assert_eq!(TokenKind::from_keyword("INT"), None);
        assert_eq!(TokenKind::from_keyword("Step"), None);
    }

    #[test]
    fn type_keywords_start_statements() {
        assert!(TokenKind::KwVoid.starts_statement());
        assert!(TokenKind::Var.starts_statement());
        assert!(!TokenKind::Identifier("x".into()).starts_statement());
        assert!(!TokenKind::Semicolon.starts_statement());
    }
}

use crate::{Span, Type};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of diagnostics stored; further ones are only counted.
pub const MAX_ERRORS: usize = 100;

/// Diagnostic category, determined by error code range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Syntax,
    Type,
    Scope,
    Control,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Syntax => "syntax",
            Self::Type => "type",
            Self::Scope => "scope",
            Self::Control => "control",
        })
    }
}

/// Numeric diagnostic code (E100–E699).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ErrorCode(pub u16);

impl ErrorCode {
    // ── Syntax (E100–E199) ──
    pub const UNEXPECTED_TOKEN: Self = Self(100);
    pub const UNTERMINATED: Self = Self(101);
    pub const INVALID_LITERAL: Self = Self(102);
    pub const MISPLACED_FUNCTION: Self = Self(103);
    pub const NESTING_TOO_DEEP: Self = Self(104);

    // ── Type (E200–E299) ──
    pub const INVALID_TYPE: Self = Self(200);
    pub const TYPE_MISMATCH: Self = Self(201);
    pub const WRONG_ARG_COUNT: Self = Self(202);
    pub const INVALID_ARGUMENT_TYPE: Self = Self(203);
    pub const INVALID_BINARY_OPERATOR: Self = Self(204);
    pub const INVALID_UNARY_OPERATOR: Self = Self(205);
    pub const INVALID_TERNARY_OPERATOR: Self = Self(206);
    pub const INVALID_ASSIGNMENT: Self = Self(207);
    pub const RETURN_TYPE_MISMATCH: Self = Self(208);
    pub const MISSING_RETURN: Self = Self(209);

    // ── Scope (E500–E599) ──
    pub const VARIABLE_REDECLARATION: Self = Self(500);
    pub const UNDECLARED_VARIABLE: Self = Self(501);
    pub const UNDECLARED_FUNCTION: Self = Self(502);
    pub const READ_ONLY_ASSIGNMENT: Self = Self(503);
    pub const FUNCTION_REDECLARATION: Self = Self(504);
    pub const GLOBAL_USED_BEFORE_DECLARATION: Self = Self(505);

    // ── Control flow (E600–E699) ──
    pub const STATEMENT_NOT_IN_LOOP: Self = Self(600);
    pub const RETURN_OUTSIDE_FUNCTION: Self = Self(601);

    pub fn category(self) -> ErrorCategory {
        match self.0 {
            200..=299 => ErrorCategory::Type,
            500..=599 => ErrorCategory::Scope,
            600..=699 => ErrorCategory::Control,
            _ => ErrorCategory::Syntax,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

/// A structured diagnostic produced by the lexer, parser or analyzer.
///
/// Hosts render these directly; the optional type fields let an editor
/// show the expected and found types without parsing `message`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{span}: {code} [{category}] {message}")]
pub struct CodeError {
    pub file: String,
    pub code: ErrorCode,
    pub category: ErrorCategory,
    pub message: String,
    #[serde(flatten)]
    pub span: Span,
    /// The offending source line, verbatim.
    pub source_line: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<Type>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub found: Option<Type>,
    /// Zero-based index of the offending call argument.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub argument: Option<usize>,
    /// A likely fix, phrased for the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl CodeError {
    pub fn new(
        file: impl Into<String>,
        code: ErrorCode,
        message: impl Into<String>,
        span: Span,
        source_line: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            code,
            category: code.category(),
            message: message.into(),
            span,
            source_line: source_line.into(),
            expected: None,
            found: None,
            argument: None,
            suggestion: None,
        }
    }

    pub fn with_types(mut self, expected: Type, found: Type) -> Self {
        self.expected = Some(expected);
        self.found = Some(found);
        self
    }

    pub fn with_argument(mut self, index: usize) -> Self {
        self.argument = Some(index);
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Ordered diagnostics for one compilation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub errors: Vec<CodeError>,
    pub total_errors: usize,
}

impl Diagnostics {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn has_errors(&self) -> bool {
        self.total_errors > 0
    }

    /// Records a diagnostic, storing at most [`MAX_ERRORS`].
    pub fn push_error(&mut self, error: CodeError) {
        if self.errors.len() < MAX_ERRORS {
            self.errors.push(error);
        }
        self.total_errors += 1;
    }

    /// Appends every diagnostic of `other`, preserving order.
    pub fn extend(&mut self, other: Diagnostics) {
        let dropped = other.total_errors - other.errors.len();
        for error in other.errors {
            self.push_error(error);
        }
        self.total_errors += dropped;
    }

    pub fn codes(&self) -> Vec<ErrorCode> {
        self.errors.iter().map(|e| e.code).collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for error in &self.errors {
            writeln!(f, "{}: {error}", error.file)?;
        }
        if self.total_errors > self.errors.len() {
            writeln!(
                f,
                "... and {} more",
                self.total_errors - self.errors.len()
            )?;
        }
        Ok(())
    }
}

//! Runtime error types for the Pigeon evaluator.

use pigeon_types::Span;

/// A fault that stops a run.
///
/// Control flow (`break`, `continue`, `return`) never surfaces here.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    /// Int `/` or `%` with a zero right operand.
    #[error("{span}: division by zero")]
    DivisionByZero { span: Span },
    /// More nested calls than `EvalOptions::max_call_depth`.
    #[error("stack overflow: call depth exceeded {depth}")]
    StackOverflow { depth: usize },
    /// A for-loop `step` that is zero or negative.
    #[error("{span}: for-loop step must be positive, got {step}")]
    InvalidStep { step: i64, span: Span },
    #[error("{span}: variable '{name}' was read before it had a value")]
    UninitializedVariable { name: String, span: Span },
    /// A host function reported failure or returned the wrong type.
    #[error("native function '{name}' failed: {message}")]
    Native { name: String, message: String },
    /// The tree disagrees with what analysis recorded about it.
    #[error("internal evaluator error: {0}")]
    Internal(String),
}

/// Result alias for evaluator operations.
pub type EvalResult<T> = Result<T, EvalError>;

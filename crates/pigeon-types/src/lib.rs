//! Shared types for the Pigeon language.
//!
//! This crate defines the syntax tree, source spans, diagnostics, and the
//! semantic type and runtime value models used by every stage.

mod error;
mod span;
mod ty;
mod value;
pub mod ast;

pub use error::{CodeError, Diagnostics, ErrorCategory, ErrorCode, MAX_ERRORS};
pub use span::{SourceFile, Span};
pub use ty::Type;
pub use value::Value;

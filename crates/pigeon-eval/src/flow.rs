//! Control flow signals between statements.

use pigeon_types::Value;

/// How a statement finished.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Flow {
    /// Fall through to the next statement.
    Normal,
    /// Leave the innermost loop.
    Break,
    /// Skip to the innermost loop's next iteration.
    Continue,
    /// Leave the current function, with its value unless it is void.
    Return(Option<Value>),
}

//! Semantic types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The static type of a variable, expression or function result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Type {
    Int,
    Float,
    Bool,
    String,
    /// Result type of functions that produce no value.
    Void,
    /// Given to expressions that failed to check. Accepted everywhere so
    /// that one mistake yields one diagnostic.
    Error,
}

impl Type {
    /// Looks up a type by its keyword.
    pub fn from_name(name: &str) -> Option<Type> {
        match name {
            "int" => Some(Type::Int),
            "float" => Some(Type::Float),
            "bool" => Some(Type::Bool),
            "string" => Some(Type::String),
            "void" => Some(Type::Void),
            _ => None,
        }
    }

    pub fn is_error(self) -> bool {
        self == Type::Error
    }

    /// Whether a value of type `found` may be stored where `self` is expected.
    ///
    /// Identical types match and an Int widens to Float; nothing narrows.
    pub fn accepts(self, found: Type) -> bool {
        self == found
            || (self == Type::Float && found == Type::Int)
            || self.is_error()
            || found.is_error()
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Type::Int => "int",
            Type::Float => "float",
            Type::Bool => "bool",
            Type::String => "string",
            Type::Void => "void",
            Type::Error => "<error>",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widening_is_one_way() {
        assert!(Type::Float.accepts(Type::Int));
        assert!(!Type::Int.accepts(Type::Float));
        assert!(Type::String.accepts(Type::String));
        assert!(!Type::String.accepts(Type::Bool));
        assert!(!Type::Void.accepts(Type::Int));
    }

    #[test]
    fn error_is_accepted_both_ways() {
        assert!(Type::Int.accepts(Type::Error));
        assert!(Type::Error.accepts(Type::Bool));
    }

    #[test]
    fn names_round_trip() {
        for ty in [Type::Int, Type::Float, Type::Bool, Type::String, Type::Void] {
            assert_eq!(Type::from_name(&ty.to_string()), Some(ty));
        }
        assert_eq!(Type::from_name("number"), None);
    }
}

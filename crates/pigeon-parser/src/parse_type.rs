//! Type keyword parsing.

use pigeon_lexer::token::TokenKind;
use pigeon_types::ast::TypeAnnotation;
use pigeon_types::{ErrorCode, Type};

use crate::parser::Parser;

impl<'src> Parser<'src> {
    /// `Type = "int" | "float" | "bool" | "string" | "void"`
    pub(crate) fn parse_type_annotation(&mut self) -> Option<TypeAnnotation> {
        let ty = match self.peek_kind() {
            TokenKind::KwInt => Type::Int,
            TokenKind::KwFloat => Type::Float,
            TokenKind::KwBool => Type::Bool,
            TokenKind::KwString => Type::String,
            TokenKind::KwVoid => Type::Void,
            other => {
                let message = format!("expected a type, got '{other}'");
                self.error_at_current(ErrorCode::UNEXPECTED_TOKEN, message);
                return None;
            }
        };
        let span = self.advance().span;
        Some(TypeAnnotation { ty, span })
    }
}

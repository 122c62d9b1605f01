//! Program and function declaration parsing.

use pigeon_lexer::token::TokenKind;
use pigeon_types::ast::*;
use pigeon_types::ErrorCode;

use crate::parser::Parser;

impl<'src> Parser<'src> {
    /// `Program = { FunctionDecl | Stmt } EOF`
    pub(crate) fn parse_program(&mut self) -> Program {
        let start = self.current_span();
        let mut items = Vec::new();
        while !self.at_end() && !self.too_many_errors() {
            let before = self.position();
            let item = if self.at_function_decl() {
                self.parse_function_decl().map(Item::Function)
            } else {
                self.parse_statement().map(Item::Stmt)
            };
            match item {
                Some(item) => items.push(item),
                None => self.synchronize(before),
            }
        }
        let span = start.merge(self.current_span());
        Program { items, span }
    }

    /// Whether the cursor sits on `Type Identifier (`.
    pub(crate) fn at_function_decl(&self) -> bool {
        self.peek_kind().is_type_keyword()
            && matches!(self.look_ahead(1), TokenKind::Identifier(_))
            && *self.look_ahead(2) == TokenKind::LParen
    }

    /// `FunctionDecl = Type Identifier "(" [ Param { "," Param } ] ")" Block`
    pub(crate) fn parse_function_decl(&mut self) -> Option<FunctionDecl> {
        let start = self.current_span();
        let return_type = self.parse_type_annotation()?;
        let name = self.expect_identifier()?;
        self.expect(&TokenKind::LParen)?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                params.push(self.parse_param()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen)?;
        let body = self.parse_block()?;
        Some(FunctionDecl {
            return_type,
            name,
            params,
            span: start.merge(body.span),
            body,
        })
    }

    fn parse_param(&mut self) -> Option<Param> {
        let type_ann = self.parse_type_annotation()?;
        let name = self.expect_identifier()?;
        Some(Param {
            span: type_ann.span.merge(name.span),
            type_ann,
            name,
        })
    }

    /// A function declaration where only statements may appear.
    ///
    /// The declaration is parsed so that parsing resumes after it. It
    /// becomes an empty block; the reported error discards the tree anyway.
    pub(crate) fn parse_misplaced_function(&mut self) -> Option<Stmt> {
        let start = self.current_span();
        let decl = self.parse_function_decl()?;
        self.error_at(
            ErrorCode::MISPLACED_FUNCTION,
            format!(
                "function '{}' must be declared at the top level",
                decl.name.name
            ),
            start.merge(decl.name.span),
        );
        Some(Stmt::Block(Block {
            id: self.next_id(),
            stmts: Vec::new(),
            span: decl.span,
        }))
    }
}

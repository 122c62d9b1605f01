//! Expression parsing.
//!
//! Precedence (lowest → highest):
//! 1. `? :` (right associative)
//! 2. `||`
//! 3. `&&`
//! 4. `==`, `!=`
//! 5. `<`, `>`, `<=`, `>=`
//! 6. `+`, `-`
//! 7. `*`, `/`, `%`
//! 8. unary `+`, `-`, `!`
//!
//! All binary operators are left associative.

use pigeon_lexer::token::TokenKind;
use pigeon_types::ast::*;
use pigeon_types::ErrorCode;

use crate::parser::Parser;

type Level<'src> = fn(&mut Parser<'src>) -> Option<Expr>;

impl<'src> Parser<'src> {
    pub(crate) fn parse_expression(&mut self) -> Option<Expr> {
        self.nested(|p| p.parse_ternary())
    }

    /// `Ternary = Or [ "?" Expr ":" Expr ]`
    fn parse_ternary(&mut self) -> Option<Expr> {
        let condition = self.parse_or()?;
        if !self.eat(&TokenKind::Question) {
            return Some(condition);
        }
        let then_expr = self.parse_expression()?;
        self.expect(&TokenKind::Colon)?;
        let else_expr = self.parse_expression()?;
        let span = condition.span.merge(else_expr.span);
        Some(Expr::new(
            self.next_id(),
            ExprKind::Ternary {
                condition: Box::new(condition),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
            },
            span,
        ))
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Binary Levels
    // ══════════════════════════════════════════════════════════════════════════

    /// `Level = Next { Op Next }`
    fn parse_binary_level(
        &mut self,
        next: Level<'src>,
        op_for: fn(&TokenKind) -> Option<BinOp>,
    ) -> Option<Expr> {
        let mut left = next(self)?;
        while let Some(op) = op_for(self.peek_kind()) {
            let op_span = self.advance().span;
            let right = next(self)?;
            let span = left.span.merge(right.span);
            left = Expr::new(
                self.next_id(),
                ExprKind::Binary {
                    left: Box::new(left),
                    op,
                    op_span,
                    right: Box::new(right),
                },
                span,
            );
        }
        Some(left)
    }

    fn parse_or(&mut self) -> Option<Expr> {
        self.parse_binary_level(Self::parse_and, |kind| match kind {
            TokenKind::PipePipe => Some(BinOp::Or),
            _ => None,
        })
    }

    fn parse_and(&mut self) -> Option<Expr> {
        self.parse_binary_level(Self::parse_equality, |kind| match kind {
            TokenKind::AmpAmp => Some(BinOp::And),
            _ => None,
        })
    }

    fn parse_equality(&mut self) -> Option<Expr> {
        self.parse_binary_level(Self::parse_relational, |kind| match kind {
            TokenKind::EqEq => Some(BinOp::Eq),
            TokenKind::BangEq => Some(BinOp::NotEq),
            _ => None,
        })
    }

    fn parse_relational(&mut self) -> Option<Expr> {
        self.parse_binary_level(Self::parse_additive, |kind| match kind {
            TokenKind::Less => Some(BinOp::Less),
            TokenKind::Greater => Some(BinOp::Greater),
            TokenKind::LessEq => Some(BinOp::LessEq),
            TokenKind::GreaterEq => Some(BinOp::GreaterEq),
            _ => None,
        })
    }

    fn parse_additive(&mut self) -> Option<Expr> {
        self.parse_binary_level(Self::parse_term, |kind| match kind {
            TokenKind::Plus => Some(BinOp::Add),
            TokenKind::Minus => Some(BinOp::Sub),
            _ => None,
        })
    }

    fn parse_term(&mut self) -> Option<Expr> {
        self.parse_binary_level(Self::parse_unary, |kind| match kind {
            TokenKind::Star => Some(BinOp::Mul),
            TokenKind::Slash => Some(BinOp::Div),
            TokenKind::Percent => Some(BinOp::Mod),
            _ => None,
        })
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Unary & Primary
    // ══════════════════════════════════════════════════════════════════════════

    fn parse_unary(&mut self) -> Option<Expr> {
        let op = match self.peek_kind() {
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Minus => UnaryOp::Minus,
            TokenKind::Bang => UnaryOp::Not,
            _ => return self.parse_primary(),
        };
        let op_span = self.advance().span;
        let operand = self.nested(|p| p.parse_unary())?;
        let span = op_span.merge(operand.span);
        Some(Expr::new(
            self.next_id(),
            ExprKind::Unary {
                op,
                op_span,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    fn parse_primary(&mut self) -> Option<Expr> {
        let token = self.peek().clone();
        let kind = match token.kind {
            TokenKind::IntLit(n) => ExprKind::IntLit(n),
            TokenKind::FloatLit(x) => ExprKind::FloatLit(x),
            TokenKind::StringLit(s) => ExprKind::StringLit(s),
            TokenKind::True => ExprKind::BoolLit(true),
            TokenKind::False => ExprKind::BoolLit(false),
            TokenKind::Identifier(_) if *self.look_ahead(1) == TokenKind::LParen => {
                return self.parse_call();
            }
            TokenKind::Identifier(name) => ExprKind::Identifier(name),
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(&TokenKind::RParen)?;
                let span = token.span.merge(self.previous_span());
                return Some(Expr::new(self.next_id(), ExprKind::Paren(Box::new(inner)), span));
            }
            other => {
                let code = if other == TokenKind::Eof {
                    ErrorCode::UNTERMINATED
                } else {
                    ErrorCode::UNEXPECTED_TOKEN
                };
                self.error_at_current(code, format!("expected an expression, got '{other}'"));
                return None;
            }
        };
        self.advance();
        Some(Expr::new(self.next_id(), kind, token.span))
    }

    /// `Call = Identifier "(" [ Expr { "," Expr } ] ")"`
    fn parse_call(&mut self) -> Option<Expr> {
        let name = self.expect_identifier()?;
        self.expect(&TokenKind::LParen)?;
        let mut args = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                args.push(self.parse_expression()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen)?;
        let span = name.span.merge(self.previous_span());
        Some(Expr::new(
            self.next_id(),
            ExprKind::Call { name, args },
            span,
        ))
    }
}

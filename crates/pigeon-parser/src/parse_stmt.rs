//! Statement parsing.

use pigeon_lexer::token::TokenKind;
use pigeon_types::ast::*;
use pigeon_types::ErrorCode;

use crate::parser::Parser;

impl<'src> Parser<'src> {
    /// `Block = "{" { Stmt } "}"`
    pub(crate) fn parse_block(&mut self) -> Option<Block> {
        self.nested(|p| {
            let start = p.current_span();
            p.expect(&TokenKind::LBrace)?;
            let mut stmts = Vec::new();
            while !p.check(&TokenKind::RBrace) && !p.at_end() && !p.too_many_errors() {
                let before = p.position();
                match p.parse_statement() {
                    Some(stmt) => stmts.push(stmt),
                    None => p.synchronize(before),
                }
            }
            p.expect(&TokenKind::RBrace)?;
            Some(Block {
                id: p.next_id(),
                stmts,
                span: start.merge(p.previous_span()),
            })
        })
    }

    /// A braced block, or a single statement standing in for one.
    ///
    /// Allows `if a x = 1; else if b x = 2;` without braces.
    pub(crate) fn parse_body(&mut self) -> Option<Block> {
        if self.check(&TokenKind::LBrace) {
            return self.parse_block();
        }
        let stmt = self.nested(|p| p.parse_statement())?;
        Some(Block {
            id: self.next_id(),
            span: stmt.span(),
            stmts: vec![stmt],
        })
    }

    pub(crate) fn parse_statement(&mut self) -> Option<Stmt> {
        match self.peek_kind().clone() {
            TokenKind::Var | TokenKind::Const => self.parse_var_decl().map(Stmt::VarDecl),
            TokenKind::If => self.parse_if().map(Stmt::If),
            TokenKind::While => self.parse_while().map(Stmt::While),
            TokenKind::Do => self.parse_do_while().map(Stmt::DoWhile),
            TokenKind::For => self.parse_for().map(Stmt::For),
            TokenKind::Return => self.parse_return().map(Stmt::Return),
            TokenKind::Break => self.parse_jump().map(Stmt::Break),
            TokenKind::Continue => self.parse_jump().map(Stmt::Continue),
            TokenKind::LBrace => self.parse_block().map(Stmt::Block),
            TokenKind::Identifier(_) => self.parse_identifier_statement(),
            kind if kind.is_type_keyword() => {
                if self.at_function_decl() {
                    return self.parse_misplaced_function();
                }
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("unexpected type '{kind}'; declare variables with 'var' or 'const'"),
                );
                None
            }
            kind => {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("expected a statement, got '{kind}'"),
                );
                None
            }
        }
    }

    /// `("var" | "const") Identifier "=" Expr ";"`
    fn parse_var_decl(&mut self) -> Option<VarDecl> {
        let keyword = self.advance();
        let read_only = keyword.kind == TokenKind::Const;
        let name = self.expect_identifier()?;
        self.expect(&TokenKind::Eq)?;
        let value = self.parse_expression()?;
        self.expect(&TokenKind::Semicolon)?;
        Some(VarDecl {
            id: self.next_id(),
            read_only,
            name,
            value,
            span: keyword.span.merge(self.previous_span()),
        })
    }

    /// An assignment (`x op= expr;`) or a call statement (`f(args);`).
    fn parse_identifier_statement(&mut self) -> Option<Stmt> {
        if *self.look_ahead(1) == TokenKind::LParen {
            let call = self.parse_expression()?;
            self.expect(&TokenKind::Semicolon)?;
            let span = call.span.merge(self.previous_span());
            return Some(Stmt::Call(CallStmt { call, span }));
        }

        let target = self.expect_identifier()?;
        let step = match self.peek_kind() {
            TokenKind::PlusPlus => Some(AssignOp::AddAssign),
            TokenKind::MinusMinus => Some(AssignOp::SubAssign),
            _ => None,
        };
        if let Some(op) = step {
            return self.parse_step_statement(target, op);
        }
        let op = match self.peek_kind() {
            TokenKind::Eq => AssignOp::Assign,
            TokenKind::PlusEq => AssignOp::AddAssign,
            TokenKind::MinusEq => AssignOp::SubAssign,
            TokenKind::StarEq => AssignOp::MulAssign,
            TokenKind::SlashEq => AssignOp::DivAssign,
            TokenKind::PercentEq => AssignOp::ModAssign,
            other => {
                let message = format!(
                    "expected an assignment or call after '{}', got '{other}'",
                    target.name
                );
                self.error_at_current(ErrorCode::UNEXPECTED_TOKEN, message);
                return None;
            }
        };
        let op_span = self.advance().span;
        let value = self.parse_expression()?;
        self.expect(&TokenKind::Semicolon)?;
        Some(Stmt::Assign(AssignStmt {
            id: self.next_id(),
            span: target.span.merge(self.previous_span()),
            target,
            op,
            op_span,
            value,
        }))
    }

    /// `x++;` and `x--;`, read as `x += 1;` and `x -= 1;`.
    fn parse_step_statement(&mut self, target: Ident, op: AssignOp) -> Option<Stmt> {
        let op_span = self.advance().span;
        self.expect(&TokenKind::Semicolon)?;
        let one = Expr::new(self.next_id(), ExprKind::IntLit(1), op_span);
        Some(Stmt::Assign(AssignStmt {
            id: self.next_id(),
            span: target.span.merge(self.previous_span()),
            target,
            op,
            op_span,
            value: one,
        }))
    }

    /// `"if" Expr Body [ "else" Body ]`
    fn parse_if(&mut self) -> Option<IfStmt> {
        let start = self.advance().span;
        let condition = self.parse_expression()?;
        let then_block = self.parse_body()?;
        let else_block = if self.eat(&TokenKind::Else) {
            Some(self.parse_body()?)
        } else {
            None
        };
        Some(IfStmt {
            condition,
            then_block,
            else_block,
            span: start.merge(self.previous_span()),
        })
    }

    /// `"while" Expr Body`
    fn parse_while(&mut self) -> Option<WhileStmt> {
        let start = self.advance().span;
        let condition = self.parse_expression()?;
        let body = self.parse_body()?;
        Some(WhileStmt {
            condition,
            span: start.merge(body.span),
            body,
        })
    }

    /// `"do" Body "while" Expr ";"`
    fn parse_do_while(&mut self) -> Option<DoWhileStmt> {
        let start = self.advance().span;
        let body = self.parse_body()?;
        self.expect(&TokenKind::While)?;
        let condition = self.parse_expression()?;
        self.expect(&TokenKind::Semicolon)?;
        Some(DoWhileStmt {
            body,
            condition,
            span: start.merge(self.previous_span()),
        })
    }

    /// `"for" Identifier "=" Expr ("to" | "downto") Expr [ "step" Expr ] Body`
    fn parse_for(&mut self) -> Option<ForStmt> {
        let start = self.advance().span;
        let variable = self.expect_identifier()?;
        self.expect(&TokenKind::Eq)?;
        let from = self.parse_expression()?;
        let direction = match self.peek_kind() {
            TokenKind::To => ForDirection::To,
            TokenKind::Downto => ForDirection::Downto,
            other => {
                let message = format!("expected 'to' or 'downto', got '{other}'");
                self.error_at_current(ErrorCode::UNEXPECTED_TOKEN, message);
                return None;
            }
        };
        self.advance();
        let end = self.parse_expression()?;
        let step = if self.eat(&TokenKind::Step) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        let body = self.parse_body()?;
        Some(ForStmt {
            variable,
            start: from,
            direction,
            end,
            step,
            span: start.merge(body.span),
            body,
        })
    }

    /// `"return" [ Expr ] ";"`
    fn parse_return(&mut self) -> Option<ReturnStmt> {
        let start = self.advance().span;
        let value = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&TokenKind::Semicolon)?;
        Some(ReturnStmt {
            value,
            span: start.merge(self.previous_span()),
        })
    }

    /// `"break" ";"` or `"continue" ";"`
    fn parse_jump(&mut self) -> Option<pigeon_types::Span> {
        let start = self.advance().span;
        self.expect(&TokenKind::Semicolon)?;
        Some(start.merge(self.previous_span()))
    }
}

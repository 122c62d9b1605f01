//! Core statement and expression evaluator.
//!
//! Runs directly over the analyzed tree. Names are resolved through the
//! scope recorded for each node, and values live in the scope tree's slots.

use pigeon_compiler::stack::ensure_sufficient_stack;
use pigeon_compiler::{FunctionBody, NativeFn, ScopeError, ScopeId, ScopeTree, SemanticModel};
use pigeon_types::ast::*;
use pigeon_types::{Span, Type, Value};

use crate::error::{EvalError, EvalResult};
use crate::flow::Flow;
use crate::EvalOptions;

/// Walks one program, mutating its scope values.
pub(crate) struct Evaluator<'p> {
    program: &'p Program,
    model: &'p SemanticModel,
    scopes: &'p mut ScopeTree,
    options: &'p EvalOptions,
    /// Script calls currently active.
    depth: usize,
}

impl<'p> Evaluator<'p> {
    pub(crate) fn new(
        program: &'p Program,
        model: &'p SemanticModel,
        scopes: &'p mut ScopeTree,
        options: &'p EvalOptions,
    ) -> Self {
        Self {
            program,
            model,
            scopes,
            options,
            depth: 0,
        }
    }

    /// Executes the top-level statements in order. Function declarations
    /// are skipped; they only run when called.
    pub(crate) fn run(&mut self) -> EvalResult<()> {
        let program = self.program;
        for item in &program.items {
            let Item::Stmt(stmt) = item else {
                continue;
            };
            match self.exec_stmt(stmt)? {
                Flow::Normal => {}
                other => {
                    return Err(EvalError::Internal(format!(
                        "{other:?} escaped to the top level at {}",
                        stmt.span()
                    )))
                }
            }
        }
        Ok(())
    }

    // ══════════════════════════════════════════════════════════════════════
    // Statements
    // ══════════════════════════════════════════════════════════════════════

    fn exec_stmt(&mut self, stmt: &Stmt) -> EvalResult<Flow> {
        ensure_sufficient_stack(|| match stmt {
            Stmt::VarDecl(decl) => {
                let value = self.eval_expr(&decl.value)?;
                let scope = self.scope_of(decl.id)?;
                self.scopes.define(scope, &decl.name.name, value);
                Ok(Flow::Normal)
            }
            Stmt::Assign(assign) => {
                self.exec_assign(assign)?;
                Ok(Flow::Normal)
            }
            Stmt::Call(call) => {
                match &call.call.kind {
                    ExprKind::Call { name, args } => {
                        self.eval_call(name, args)?;
                    }
                    _ => {
                        self.eval_expr(&call.call)?;
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::If(stmt) => {
                if self.eval_bool(&stmt.condition)? {
                    self.exec_block(&stmt.then_block)
                } else if let Some(else_block) = &stmt.else_block {
                    self.exec_block(else_block)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::While(stmt) => {
                while self.eval_bool(&stmt.condition)? {
                    match self.exec_block(&stmt.body)? {
                        Flow::Break => break,
                        Flow::Normal | Flow::Continue => {}
                        ret @ Flow::Return(_) => return Ok(ret),
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::DoWhile(stmt) => {
                loop {
                    match self.exec_block(&stmt.body)? {
                        Flow::Break => break,
                        Flow::Normal | Flow::Continue => {}
                        ret @ Flow::Return(_) => return Ok(ret),
                    }
                    if !self.eval_bool(&stmt.condition)? {
                        break;
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::For(stmt) => self.exec_for(stmt),
            Stmt::Return(ret) => {
                let value = match &ret.value {
                    Some(expr) => Some(self.eval_expr(expr)?),
                    None => None,
                };
                Ok(Flow::Return(value))
            }
            Stmt::Break(_) => Ok(Flow::Break),
            Stmt::Continue(_) => Ok(Flow::Continue),
            Stmt::Block(block) => self.exec_block(block),
        })
    }

    /// Runs `block` in its own scope, starting from empty slots.
    fn exec_block(&mut self, block: &Block) -> EvalResult<Flow> {
        let scope = self.scope_of(block.id)?;
        self.scopes.restart(scope);
        self.exec_stmts(&block.stmts)
    }

    fn exec_stmts(&mut self, stmts: &[Stmt]) -> EvalResult<Flow> {
        for stmt in stmts {
            match self.exec_stmt(stmt)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_assign(&mut self, assign: &AssignStmt) -> EvalResult<()> {
        let scope = self.scope_of(assign.id)?;
        let name = &assign.target.name;
        let var_ty = self
            .scopes
            .lookup_variable(scope, name)
            .map(|v| v.ty)
            .ok_or_else(|| EvalError::Internal(format!("'{name}' has no declaration")))?;

        let value = self.eval_expr(&assign.value)?;
        let value = match assign.op.binary_op() {
            None => value,
            Some(op) => {
                let current = self.read_variable(scope, name, assign.target.span)?;
                apply_binary(op, current, value, assign.op_span)?
            }
        };
        self.scopes
            .assign(scope, name, value.widen_to(var_ty))
            .map_err(|err| match err {
                ScopeError::Unbound(name) => EvalError::UninitializedVariable {
                    name,
                    span: assign.target.span,
                },
                other => EvalError::Internal(other.to_string()),
            })
    }

    /// The counter is bound fresh in the scope wrapping the body on every
    /// iteration. Both bounds are inclusive; they and the step are evaluated
    /// once.
    fn exec_for(&mut self, stmt: &ForStmt) -> EvalResult<Flow> {
        let start = self.eval_int(&stmt.start)?;
        let end = self.eval_int(&stmt.end)?;
        let step = match &stmt.step {
            Some(expr) => {
                let step = self.eval_int(expr)?;
                if step <= 0 {
                    return Err(EvalError::InvalidStep {
                        step,
                        span: expr.span,
                    });
                }
                step
            }
            None => 1,
        };
        let body = self.scope_of(stmt.body.id)?;
        let scope = self.parent_scope(body)?;

        let mut counter = start;
        loop {
            let in_range = match stmt.direction {
                ForDirection::To => counter <= end,
                ForDirection::Downto => counter >= end,
            };
            if !in_range {
                break;
            }
            self.scopes.restart(scope);
            self.scopes
                .define(scope, &stmt.variable.name, Value::Int(counter));
            match self.exec_block(&stmt.body)? {
                Flow::Break => break,
                Flow::Normal | Flow::Continue => {}
                ret @ Flow::Return(_) => return Ok(ret),
            }
            let next = match stmt.direction {
                ForDirection::To => counter.checked_add(step),
                ForDirection::Downto => counter.checked_sub(step),
            };
            match next {
                Some(next) => counter = next,
                None => break,
            }
        }
        Ok(Flow::Normal)
    }

    // ══════════════════════════════════════════════════════════════════════
    // Expressions
    // ══════════════════════════════════════════════════════════════════════

    fn eval_expr(&mut self, expr: &Expr) -> EvalResult<Value> {
        ensure_sufficient_stack(|| match &expr.kind {
            ExprKind::IntLit(n) => Ok(Value::Int(*n)),
            ExprKind::FloatLit(x) => Ok(Value::Float(*x)),
            ExprKind::StringLit(s) => Ok(Value::String(s.clone())),
            ExprKind::BoolLit(b) => Ok(Value::Bool(*b)),
            ExprKind::Identifier(name) => {
                let scope = self.scope_of(expr.id)?;
                self.read_variable(scope, name, expr.span)
            }
            ExprKind::Call { name, args } => self.eval_call(name, args)?.ok_or_else(|| {
                EvalError::Internal(format!("void function '{}' used as a value", name.name))
            }),
            ExprKind::Unary { op, operand, .. } => {
                let value = self.eval_expr(operand)?;
                apply_unary(*op, value)
            }
            ExprKind::Binary {
                left,
                op: BinOp::And,
                right,
                ..
            } => Ok(Value::Bool(self.eval_bool(left)? && self.eval_bool(right)?)),
            ExprKind::Binary {
                left,
                op: BinOp::Or,
                right,
                ..
            } => Ok(Value::Bool(self.eval_bool(left)? || self.eval_bool(right)?)),
            ExprKind::Binary {
                left,
                op,
                op_span,
                right,
            } => {
                let left = self.eval_expr(left)?;
                let right = self.eval_expr(right)?;
                apply_binary(*op, left, right, *op_span)
            }
            ExprKind::Ternary {
                condition,
                then_expr,
                else_expr,
            } => {
                let chosen = if self.eval_bool(condition)? {
                    then_expr
                } else {
                    else_expr
                };
                let value = self.eval_expr(chosen)?;
                Ok(match self.model.type_of(expr.id) {
                    Some(ty) => value.widen_to(ty),
                    None => value,
                })
            }
            ExprKind::Paren(inner) => self.eval_expr(inner),
        })
    }

    fn eval_bool(&mut self, expr: &Expr) -> EvalResult<bool> {
        let value = self.eval_expr(expr)?;
        value
            .as_bool()
            .ok_or_else(|| mismatch("bool", &value, expr.span))
    }

    fn eval_int(&mut self, expr: &Expr) -> EvalResult<i64> {
        let value = self.eval_expr(expr)?;
        value
            .as_int()
            .ok_or_else(|| mismatch("int", &value, expr.span))
    }

    fn read_variable(&self, scope: ScopeId, name: &str, span: Span) -> EvalResult<Value> {
        self.scopes
            .evaluate(scope, name)
            .cloned()
            .ok_or_else(|| EvalError::UninitializedVariable {
                name: name.to_string(),
                span,
            })
    }

    // ══════════════════════════════════════════════════════════════════════
    // Calls
    // ══════════════════════════════════════════════════════════════════════

    /// Calls a script or native function; `None` is the result of a void call.
    fn eval_call(&mut self, name: &Ident, args: &[Expr]) -> EvalResult<Option<Value>> {
        let function = self
            .scopes
            .lookup_function(&name.name)
            .cloned()
            .ok_or_else(|| EvalError::Internal(format!("function '{}' is not declared", name.name)))?;

        let mut values = Vec::with_capacity(args.len());
        for (arg, param) in args.iter().zip(&function.parameters) {
            values.push(self.eval_expr(arg)?.widen_to(param.ty));
        }

        match &function.body {
            FunctionBody::Native(native) => {
                call_native(&function.name, native, &values, function.return_type)
            }
            FunctionBody::Script { item, body } => {
                let params: Vec<&str> = function.parameters.iter().map(|p| p.name.as_str()).collect();
                let result = self.call_script(&function.name, *item, *body, &params, values)?;
                Ok(result.map(|value| value.widen_to(function.return_type)))
            }
        }
    }

    /// Runs a script function with its scopes set aside for the call, so a
    /// recursive activation cannot see or clobber the caller's locals.
    /// Parameters are bound in the scope enclosing the body block.
    #[tracing::instrument(level = "trace", skip_all, fields(function = %name, depth = self.depth))]
    fn call_script(
        &mut self,
        name: &str,
        item: usize,
        body: NodeId,
        params: &[&str],
        args: Vec<Value>,
    ) -> EvalResult<Option<Value>> {
        if self.depth >= self.options.max_call_depth {
            return Err(EvalError::StackOverflow {
                depth: self.options.max_call_depth,
            });
        }
        let program = self.program;
        let Some(Item::Function(decl)) = program.items.get(item) else {
            return Err(EvalError::Internal(format!(
                "item {item} is not the declaration of '{name}'"
            )));
        };
        let body_scope = self.scope_of(body)?;
        let scope = self.parent_scope(body_scope)?;

        let frame = self.scopes.subtree(scope);
        let saved = self.scopes.suspend(frame);
        for (param, value) in params.iter().zip(args) {
            self.scopes.define(scope, param, value);
        }
        self.depth += 1;
        let result = ensure_sufficient_stack(|| self.exec_block(&decl.body));
        self.depth -= 1;
        self.scopes.resume(saved);

        match result? {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(None),
            other => Err(EvalError::Internal(format!(
                "{other:?} escaped function '{name}'"
            ))),
        }
    }

    fn scope_of(&self, id: NodeId) -> EvalResult<ScopeId> {
        self.model
            .scope_of(id)
            .ok_or_else(|| EvalError::Internal(format!("no scope recorded for node {}", id.0)))
    }

    fn parent_scope(&self, scope: ScopeId) -> EvalResult<ScopeId> {
        self.scopes
            .parent(scope)
            .ok_or_else(|| EvalError::Internal(format!("scope {} has no parent", scope.0)))
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

fn call_native(
    name: &str,
    native: &NativeFn,
    args: &[Value],
    return_type: Type,
) -> EvalResult<Option<Value>> {
    let result = native.call(args).map_err(|message| EvalError::Native {
        name: name.to_string(),
        message,
    })?;
    match result {
        None if return_type == Type::Void => Ok(None),
        Some(value) if return_type != Type::Void && return_type.accepts(value.ty()) => {
            Ok(Some(value.widen_to(return_type)))
        }
        other => {
            let found = other.map_or(Type::Void, |v| v.ty());
            Err(EvalError::Native {
                name: name.to_string(),
                message: format!("returned {found}, declared {return_type}"),
            })
        }
    }
}

fn mismatch(expected: &str, found: &Value, span: Span) -> EvalError {
    EvalError::Internal(format!("{span}: expected {expected}, found {}", found.ty()))
}

fn apply_unary(op: UnaryOp, value: Value) -> EvalResult<Value> {
    match (op, value) {
        (UnaryOp::Plus, v @ (Value::Int(_) | Value::Float(_))) => Ok(v),
        (UnaryOp::Minus, Value::Int(n)) => Ok(Value::Int(n.wrapping_neg())),
        (UnaryOp::Minus, Value::Float(x)) => Ok(Value::Float(-x)),
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (op, value) => Err(EvalError::Internal(format!(
            "operator '{}' applied to {}",
            op.as_str(),
            value.ty()
        ))),
    }
}

/// Applies a non-short-circuit binary operator. Mixed Int/Float operands are
/// widened to Float.
pub(crate) fn apply_binary(op: BinOp, left: Value, right: Value, span: Span) -> EvalResult<Value> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => int_binary(op, a, b, span),
        (Value::String(a), Value::String(b)) => match op {
            BinOp::Add => Ok(Value::String(a + &b)),
            BinOp::Eq => Ok(Value::Bool(a == b)),
            BinOp::NotEq => Ok(Value::Bool(a != b)),
            _ => Err(unsupported(op, Type::String, Type::String)),
        },
        (Value::Bool(a), Value::Bool(b)) => match op {
            BinOp::Eq => Ok(Value::Bool(a == b)),
            BinOp::NotEq => Ok(Value::Bool(a != b)),
            BinOp::And => Ok(Value::Bool(a && b)),
            BinOp::Or => Ok(Value::Bool(a || b)),
            _ => Err(unsupported(op, Type::Bool, Type::Bool)),
        },
        (left, right) => match (left.as_float(), right.as_float()) {
            (Some(a), Some(b)) => float_binary(op, a, b),
            _ => Err(unsupported(op, left.ty(), right.ty())),
        },
    }
}

/// Int arithmetic wraps on overflow.
fn int_binary(op: BinOp, a: i64, b: i64, span: Span) -> EvalResult<Value> {
    let value = match op {
        BinOp::Add => Value::Int(a.wrapping_add(b)),
        BinOp::Sub => Value::Int(a.wrapping_sub(b)),
        BinOp::Mul => Value::Int(a.wrapping_mul(b)),
        BinOp::Div | BinOp::Mod if b == 0 => return Err(EvalError::DivisionByZero { span }),
        BinOp::Div => Value::Int(a.wrapping_div(b)),
        BinOp::Mod => Value::Int(a.wrapping_rem(b)),
        BinOp::Less => Value::Bool(a < b),
        BinOp::Greater => Value::Bool(a > b),
        BinOp::LessEq => Value::Bool(a <= b),
        BinOp::GreaterEq => Value::Bool(a >= b),
        BinOp::Eq => Value::Bool(a == b),
        BinOp::NotEq => Value::Bool(a != b),
        BinOp::And | BinOp::Or => return Err(unsupported(op, Type::Int, Type::Int)),
    };
    Ok(value)
}

/// Float arithmetic follows IEEE 754; dividing by zero is not a fault.
fn float_binary(op: BinOp, a: f64, b: f64) -> EvalResult<Value> {
    let value = match op {
        BinOp::Add => Value::Float(a + b),
        BinOp::Sub => Value::Float(a - b),
        BinOp::Mul => Value::Float(a * b),
        BinOp::Div => Value::Float(a / b),
        BinOp::Mod => Value::Float(a % b),
        BinOp::Less => Value::Bool(a < b),
        BinOp::Greater => Value::Bool(a > b),
        BinOp::LessEq => Value::Bool(a <= b),
        BinOp::GreaterEq => Value::Bool(a >= b),
        BinOp::Eq => Value::Bool(a == b),
        BinOp::NotEq => Value::Bool(a != b),
        BinOp::And | BinOp::Or => return Err(unsupported(op, Type::Float, Type::Float)),
    };
    Ok(value)
}

fn unsupported(op: BinOp, left: Type, right: Type) -> EvalError {
    EvalError::Internal(format!(
        "operator '{}' applied to {left} and {right}",
        op.as_str()
    ))
}

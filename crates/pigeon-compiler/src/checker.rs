//! Pigeon semantic analyzer: walks a parsed program, resolves names and
//! types, and records what the evaluator needs.
//!
//! Entry point: [`SemanticAnalyzer::analyze`].
//!
//! Diagnostics emitted:
//! - E200: `void` used as a parameter or variable type
//! - E201: condition or loop bound of the wrong type
//! - E202: wrong argument count
//! - E203: argument of the wrong type
//! - E204/E205/E206: no binary / unary / ternary operator for the operand types
//! - E207: no assignment operator for the variable and value types
//! - E208: return value does not match the function's return type
//! - E209: non-void function can finish without returning
//! - E500: variable or parameter declared twice in one scope
//! - E501/E502: undeclared variable / function
//! - E503: assignment to a constant or loop counter
//! - E504: function declared twice
//! - E505: top-level call reaches a global declared at or after the call
//! - E600: `break` or `continue` outside a loop
//! - E601: `return` outside a function
//!
//! An expression whose check failed gets [`Type::Error`], which every later
//! check accepts silently.

use std::collections::{BTreeSet, HashMap};

use pigeon_types::ast::*;
use pigeon_types::{CodeError, Diagnostics, ErrorCode, SourceFile, Span, Type};

use crate::natives::Natives;
use crate::operators;
use crate::program::SemanticModel;
use crate::scope::{Function, FunctionBody, ScopeId, ScopeTree, Variable};
use crate::stack::ensure_sufficient_stack;

// ══════════════════════════════════════════════════════════════════════════════
// SemanticAnalyzer
// ══════════════════════════════════════════════════════════════════════════════

struct FunctionContext {
    name: String,
    return_type: Type,
}

/// What a script function's body touches directly.
#[derive(Debug, Default)]
struct Reach {
    globals: BTreeSet<String>,
    calls: BTreeSet<String>,
}

/// A call made while a top-level statement runs.
struct TopLevelCall {
    item: usize,
    callee: String,
    span: Span,
}

pub struct SemanticAnalyzer<'a> {
    scopes: ScopeTree,
    model: SemanticModel,
    current: ScopeId,
    errors: &'a mut Diagnostics,
    source: &'a SourceFile,
    loop_depth: u32,
    function: Option<FunctionContext>,
    /// Index of the top-level item being checked.
    item: usize,
    /// Item index of each global variable's declaration.
    global_decls: HashMap<String, usize>,
    reach: HashMap<String, Reach>,
    top_level_calls: Vec<TopLevelCall>,
}

impl<'a> SemanticAnalyzer<'a> {
    /// An analyzer whose global scope already holds `natives`.
    pub fn new(errors: &'a mut Diagnostics, source: &'a SourceFile, natives: &Natives) -> Self {
        let mut scopes = ScopeTree::new();
        for native in natives.iter() {
            if let Err(err) = scopes.declare_function(native.clone()) {
                tracing::error!(%err, "native function skipped");
            }
        }
        Self {
            scopes,
            model: SemanticModel::default(),
            current: ScopeId::GLOBAL,
            errors,
            source,
            loop_depth: 0,
            function: None,
            item: 0,
            global_decls: HashMap::new(),
            reach: HashMap::new(),
            top_level_calls: Vec::new(),
        }
    }

    /// Checks the whole program in source order.
    ///
    /// Every function signature is registered first, so calls may refer to
    /// functions declared later and functions may recurse. A function body
    /// sees the globals declared above it; calls from the top level are then
    /// checked against the order in which those globals come into being.
    pub fn analyze(mut self, program: &Program) -> (ScopeTree, SemanticModel) {
        self.register_functions(program);
        for (index, item) in program.items.iter().enumerate() {
            self.item = index;
            match item {
                Item::Function(decl) => self.check_function(decl),
                Item::Stmt(stmt) => self.check_stmt(stmt),
            }
        }
        self.check_global_order();
        (self.scopes, self.model)
    }

    // ══════════════════════════════════════════════════════════════════════
    // Functions
    // ══════════════════════════════════════════════════════════════════════

    fn register_functions(&mut self, program: &Program) {
        for (index, item) in program.items.iter().enumerate() {
            let Item::Function(decl) = item else {
                continue;
            };
            let parameters = decl
                .params
                .iter()
                .map(|p| Variable {
                    ty: self.param_type(p),
                    name: p.name.name.clone(),
                    read_only: false,
                })
                .collect();
            let function = Function {
                return_type: decl.return_type.ty,
                name: decl.name.name.clone(),
                parameters,
                body: FunctionBody::Script {
                    item: index,
                    body: decl.body.id,
                },
            };
            if self.scopes.declare_function(function).is_err() {
                self.error(
                    ErrorCode::FUNCTION_REDECLARATION,
                    format!("function '{}' is already declared", decl.name.name),
                    decl.name.span,
                );
            }
        }
    }

    fn param_type(&mut self, param: &Param) -> Type {
        if param.type_ann.ty == Type::Void {
            self.error(
                ErrorCode::INVALID_TYPE,
                format!("parameter '{}' cannot have type void", param.name.name),
                param.type_ann.span,
            );
            return Type::Error;
        }
        param.type_ann.ty
    }

    /// Parameters get a scope of their own; the body block nests inside it,
    /// so a local may shadow a parameter.
    fn check_function(&mut self, decl: &FunctionDecl) {
        let scope = self.scopes.push_scope(ScopeId::GLOBAL);

        for param in &decl.params {
            let ty = match param.type_ann.ty {
                Type::Void => Type::Error,
                ty => ty,
            };
            if self
                .scopes
                .declare_variable(scope, &param.name.name, ty, false)
                .is_err()
            {
                self.error(
                    ErrorCode::VARIABLE_REDECLARATION,
                    format!("parameter '{}' is declared twice", param.name.name),
                    param.name.span,
                );
            }
        }

        self.function = Some(FunctionContext {
            name: decl.name.name.clone(),
            return_type: decl.return_type.ty,
        });
        let outer_loops = std::mem::replace(&mut self.loop_depth, 0);
        self.in_scope(scope, |this| this.check_block(&decl.body));
        self.loop_depth = outer_loops;
        self.function = None;

        if decl.return_type.ty != Type::Void && !always_returns(&decl.body.stmts) {
            self.error(
                ErrorCode::MISSING_RETURN,
                format!(
                    "function '{}' can finish without returning a {} value",
                    decl.name.name, decl.return_type.ty
                ),
                decl.name.span,
            );
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Scopes
    // ══════════════════════════════════════════════════════════════════════

    /// Runs `f` with `scope` as the current scope, then closes it.
    fn in_scope(&mut self, scope: ScopeId, f: impl FnOnce(&mut Self)) {
        let outer = std::mem::replace(&mut self.current, scope);
        f(self);
        self.current = outer;
        self.scopes.close_scope(scope);
    }

    /// Checks a block in a new scope nested in the current one.
    fn check_block(&mut self, block: &Block) {
        let scope = self.scopes.push_scope(self.current);
        self.model.record_scope(block.id, scope);
        self.in_scope(scope, |this| this.check_stmts(&block.stmts));
    }

    fn check_loop_body(&mut self, body: &Block) {
        self.loop_depth += 1;
        self.check_block(body);
        self.loop_depth -= 1;
    }

    // ══════════════════════════════════════════════════════════════════════
    // Statements
    // ══════════════════════════════════════════════════════════════════════

    fn check_stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.check_stmt(stmt);
        }
    }

    fn check_stmt(&mut self, stmt: &Stmt) {
        ensure_sufficient_stack(|| match stmt {
            Stmt::VarDecl(decl) => self.check_var_decl(decl),
            Stmt::Assign(assign) => self.check_assign(assign),
            Stmt::Call(call) => {
                self.check_expr(&call.call);
            }
            Stmt::If(stmt) => {
                self.check_condition(&stmt.condition, "if");
                self.check_block(&stmt.then_block);
                if let Some(else_block) = &stmt.else_block {
                    self.check_block(else_block);
                }
            }
            Stmt::While(stmt) => {
                self.check_condition(&stmt.condition, "while");
                self.check_loop_body(&stmt.body);
            }
            Stmt::DoWhile(stmt) => {
                self.check_loop_body(&stmt.body);
                self.check_condition(&stmt.condition, "do-while");
            }
            Stmt::For(stmt) => self.check_for(stmt),
            Stmt::Return(ret) => self.check_return(ret),
            Stmt::Break(span) => self.check_in_loop("break", *span),
            Stmt::Continue(span) => self.check_in_loop("continue", *span),
            Stmt::Block(block) => self.check_block(block),
        })
    }

    fn check_var_decl(&mut self, decl: &VarDecl) {
        let mut ty = self.check_expr(&decl.value);
        self.model.record_scope(decl.id, self.current);
        if ty == Type::Void {
            self.error(
                ErrorCode::INVALID_TYPE,
                format!(
                    "'{}' cannot hold the result of a void function",
                    decl.name.name
                ),
                decl.value.span,
            );
            ty = Type::Error;
        }
        if self
            .scopes
            .declare_variable(self.current, &decl.name.name, ty, decl.read_only)
            .is_err()
        {
            self.error(
                ErrorCode::VARIABLE_REDECLARATION,
                format!(
                    "variable '{}' is already declared in this scope",
                    decl.name.name
                ),
                decl.name.span,
            );
        } else if self.current == ScopeId::GLOBAL {
            self.global_decls.insert(decl.name.name.clone(), self.item);
        }
    }

    fn check_assign(&mut self, assign: &AssignStmt) {
        let value_ty = self.check_expr(&assign.value);
        self.model.record_scope(assign.id, self.current);

        let name = &assign.target.name;
        let Some((var_ty, read_only)) = self.resolve_variable(name) else {
            self.undeclared_variable(name, assign.target.span);
            return;
        };

        if read_only {
            self.error(
                ErrorCode::READ_ONLY_ASSIGNMENT,
                format!("cannot assign to read-only variable '{name}'"),
                assign.target.span,
            );
            return;
        }
        if var_ty.is_error() || value_ty.is_error() {
            return;
        }
        if operators::bind_assignment(assign.op, var_ty, value_ty).is_none() {
            let err = self
                .diagnostic(
                    ErrorCode::INVALID_ASSIGNMENT,
                    format!(
                        "operator '{}' cannot assign {value_ty} to '{name}' of type {var_ty}",
                        assign.op.as_str()
                    ),
                    assign.op_span,
                )
                .with_types(var_ty, value_ty);
            self.errors.push_error(err);
        }
    }

    /// The bounds and step are checked in the enclosing scope. The counter
    /// lives in a scope wrapping the body and cannot be assigned.
    fn check_for(&mut self, stmt: &ForStmt) {
        for bound in [&stmt.start, &stmt.end] {
            let ty = self.check_expr(bound);
            self.expect_type(Type::Int, ty, bound.span, "for-loop bound");
        }
        if let Some(step) = &stmt.step {
            let ty = self.check_expr(step);
            self.expect_type(Type::Int, ty, step.span, "for-loop step");
        }

        let scope = self.scopes.push_scope(self.current);
        if let Err(err) = self
            .scopes
            .declare_variable(scope, &stmt.variable.name, Type::Int, true)
        {
            self.error(
                ErrorCode::VARIABLE_REDECLARATION,
                err.to_string(),
                stmt.variable.span,
            );
        }
        self.in_scope(scope, |this| this.check_loop_body(&stmt.body));
    }

    fn check_return(&mut self, ret: &ReturnStmt) {
        let found = ret.value.as_ref().map(|value| self.check_expr(value));
        let Some(function) = &self.function else {
            self.error(
                ErrorCode::RETURN_OUTSIDE_FUNCTION,
                "'return' outside of a function".to_string(),
                ret.span,
            );
            return;
        };
        let expected = function.return_type;
        let message = match found {
            None if expected != Type::Void => format!(
                "function '{}' must return a {expected} value",
                function.name
            ),
            Some(found) if expected == Type::Void && !found.is_error() => format!(
                "void function '{}' cannot return a value",
                function.name
            ),
            Some(found) if !expected.accepts(found) => format!(
                "function '{}' returns {expected}, found {found}",
                function.name
            ),
            _ => return,
        };
        let err = self
            .diagnostic(ErrorCode::RETURN_TYPE_MISMATCH, message, ret.span)
            .with_types(expected, found.unwrap_or(Type::Void));
        self.errors.push_error(err);
    }

    fn check_in_loop(&mut self, keyword: &str, span: Span) {
        if self.loop_depth == 0 {
            self.error(
                ErrorCode::STATEMENT_NOT_IN_LOOP,
                format!("'{keyword}' outside of a loop"),
                span,
            );
        }
    }

    fn check_condition(&mut self, condition: &Expr, construct: &str) {
        let ty = self.check_expr(condition);
        self.expect_type(Type::Bool, ty, condition.span, &format!("{construct} condition"));
    }

    fn expect_type(&mut self, expected: Type, found: Type, span: Span, what: &str) {
        if !expected.accepts(found) {
            let err = self
                .diagnostic(
                    ErrorCode::TYPE_MISMATCH,
                    format!("{what} must be {expected}, found {found}"),
                    span,
                )
                .with_types(expected, found);
            self.errors.push_error(err);
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Expressions
    // ══════════════════════════════════════════════════════════════════════

    /// Resolves and records the type of `expr`.
    fn check_expr(&mut self, expr: &Expr) -> Type {
        let ty = ensure_sufficient_stack(|| self.check_expr_kind(expr));
        self.model.record_type(expr.id, ty);
        ty
    }

    fn check_expr_kind(&mut self, expr: &Expr) -> Type {
        match &expr.kind {
            ExprKind::IntLit(_) => Type::Int,
            ExprKind::FloatLit(_) => Type::Float,
            ExprKind::StringLit(_) => Type::String,
            ExprKind::BoolLit(_) => Type::Bool,
            ExprKind::Identifier(name) => {
                self.model.record_scope(expr.id, self.current);
                match self.resolve_variable(name) {
                    Some((ty, _)) => ty,
                    None => {
                        self.undeclared_variable(name, expr.span);
                        Type::Error
                    }
                }
            }
            ExprKind::Call { name, args } => self.check_call(name, args, expr.span),
            ExprKind::Unary {
                op,
                op_span,
                operand,
            } => {
                let ty = self.check_expr(operand);
                if ty.is_error() {
                    return Type::Error;
                }
                match operators::bind_unary(*op, ty) {
                    Some(binding) => binding.result,
                    None => {
                        self.error(
                            ErrorCode::INVALID_UNARY_OPERATOR,
                            format!("operator '{}' cannot be applied to {ty}", op.as_str()),
                            *op_span,
                        );
                        Type::Error
                    }
                }
            }
            ExprKind::Binary {
                left,
                op,
                op_span,
                right,
            } => {
                let left_ty = self.check_expr(left);
                let right_ty = self.check_expr(right);
                if left_ty.is_error() || right_ty.is_error() {
                    return Type::Error;
                }
                match operators::bind_binary(*op, left_ty, right_ty) {
                    Some(binding) => binding.result,
                    None => {
                        self.error(
                            ErrorCode::INVALID_BINARY_OPERATOR,
                            format!(
                                "operator '{}' cannot be applied to {left_ty} and {right_ty}",
                                op.as_str()
                            ),
                            *op_span,
                        );
                        Type::Error
                    }
                }
            }
            ExprKind::Ternary {
                condition,
                then_expr,
                else_expr,
            } => {
                self.check_condition(condition, "ternary");
                let then_ty = self.check_expr(then_expr);
                let else_ty = self.check_expr(else_expr);
                if then_ty.is_error() || else_ty.is_error() {
                    return Type::Error;
                }
                match operators::bind_ternary(then_ty, else_ty) {
                    Some(binding) => binding.result,
                    None => {
                        self.error(
                            ErrorCode::INVALID_TERNARY_OPERATOR,
                            format!("ternary branches have incompatible types {then_ty} and {else_ty}"),
                            expr.span,
                        );
                        Type::Error
                    }
                }
            }
            ExprKind::Paren(inner) => self.check_expr(inner),
        }
    }

    /// Arguments are checked even when the callee is unknown, so that each
    /// independent mistake is reported.
    fn check_call(&mut self, name: &Ident, args: &[Expr], span: Span) -> Type {
        let arg_types: Vec<Type> = args.iter().map(|arg| self.check_expr(arg)).collect();

        let Some(function) = self.scopes.lookup_function(&name.name) else {
            let mut err = self.diagnostic(
                ErrorCode::UNDECLARED_FUNCTION,
                format!("function '{}' is not declared", name.name),
                name.span,
            );
            if self.scopes.lookup_variable(self.current, &name.name).is_some() {
                err = err.with_suggestion(format!("'{}' is a variable, not a function", name.name));
            }
            self.errors.push_error(err);
            return Type::Error;
        };
        let return_type = function.return_type;
        let param_types: Vec<Type> = function.parameters.iter().map(|p| p.ty).collect();
        self.record_call(&name.name, span);

        if param_types.len() != args.len() {
            self.error(
                ErrorCode::WRONG_ARG_COUNT,
                format!(
                    "function '{}' takes {} argument(s), got {}",
                    name.name,
                    param_types.len(),
                    args.len()
                ),
                span,
            );
            return return_type;
        }

        for (index, ((expected, found), arg)) in
            param_types.iter().zip(&arg_types).zip(args).enumerate()
        {
            if !expected.accepts(*found) {
                let err = self
                    .diagnostic(
                        ErrorCode::INVALID_ARGUMENT_TYPE,
                        format!(
                            "argument {index} of '{}' must be {expected}, found {found}",
                            name.name
                        ),
                        arg.span,
                    )
                    .with_types(*expected, *found)
                    .with_argument(index);
                self.errors.push_error(err);
            }
        }
        return_type
    }

    // ══════════════════════════════════════════════════════════════════════
    // Globals
    // ══════════════════════════════════════════════════════════════════════

    /// Type and read-only flag of the nearest `name`. A global used inside a
    /// function body is noted for [`check_global_order`](Self::check_global_order).
    fn resolve_variable(&mut self, name: &str) -> Option<(Type, bool)> {
        let (scope, variable) = self.scopes.resolve_variable(self.current, name)?;
        let found = (variable.ty, variable.read_only);
        if scope == ScopeId::GLOBAL {
            if let Some(function) = &self.function {
                self.reach
                    .entry(function.name.clone())
                    .or_default()
                    .globals
                    .insert(name.to_string());
            }
        }
        Some(found)
    }

    fn record_call(&mut self, callee: &str, span: Span) {
        match &self.function {
            Some(function) => {
                self.reach
                    .entry(function.name.clone())
                    .or_default()
                    .calls
                    .insert(callee.to_string());
            }
            None => self.top_level_calls.push(TopLevelCall {
                item: self.item,
                callee: callee.to_string(),
                span,
            }),
        }
    }

    /// A global gets its value when its declaration runs, so no call made
    /// by a top-level statement may reach a function that uses a global
    /// declared at or below that statement.
    fn check_global_order(&mut self) {
        let calls = std::mem::take(&mut self.top_level_calls);
        for call in &calls {
            for global in self.globals_reached_from(&call.callee) {
                let Some(&declared) = self.global_decls.get(&global) else {
                    continue;
                };
                if declared < call.item {
                    continue;
                }
                let err = self
                    .diagnostic(
                        ErrorCode::GLOBAL_USED_BEFORE_DECLARATION,
                        format!(
                            "call to '{}' uses global '{global}' before it is declared",
                            call.callee
                        ),
                        call.span,
                    )
                    .with_suggestion(format!("declare '{global}' above this call"));
                self.errors.push_error(err);
            }
        }
    }

    /// Globals used by `function` or anything it calls, transitively.
    fn globals_reached_from(&self, function: &str) -> BTreeSet<String> {
        let mut globals = BTreeSet::new();
        let mut seen = BTreeSet::new();
        let mut pending = vec![function];
        while let Some(name) = pending.pop() {
            if !seen.insert(name) {
                continue;
            }
            if let Some(reach) = self.reach.get(name) {
                globals.extend(reach.globals.iter().cloned());
                pending.extend(reach.calls.iter().map(String::as_str));
            }
        }
        globals
    }

    // ══════════════════════════════════════════════════════════════════════
    // Error Reporting
    // ══════════════════════════════════════════════════════════════════════

    fn undeclared_variable(&mut self, name: &str, span: Span) {
        let mut err = self.diagnostic(
            ErrorCode::UNDECLARED_VARIABLE,
            format!("variable '{name}' is not declared"),
            span,
        );
        if self.scopes.lookup_function(name).is_some() {
            err = err.with_suggestion(format!("'{name}' is a function; call it as '{name}(...)'"));
        }
        self.errors.push_error(err);
    }

    fn diagnostic(&self, code: ErrorCode, message: String, span: Span) -> CodeError {
        let source_line = self.source.line(span.start_line).unwrap_or("");
        CodeError::new(&self.source.name, code, message, span, source_line)
    }

    fn error(&mut self, code: ErrorCode, message: String, span: Span) {
        let err = self.diagnostic(code, message, span);
        self.errors.push_error(err);
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

/// Whether running `stmts` always ends in a `return`.
///
/// Loops never count, since their body may run zero times or be left by
/// `break`.
fn always_returns(stmts: &[Stmt]) -> bool {
    stmts.iter().any(|stmt| match stmt {
        Stmt::Return(_) => true,
        Stmt::Block(block) => always_returns(&block.stmts),
        Stmt::If(stmt) => stmt.else_block.as_ref().is_some_and(|else_block| {
            always_returns(&stmt.then_block.stmts) && always_returns(&else_block.stmts)
        }),
        _ => false,
    })
}

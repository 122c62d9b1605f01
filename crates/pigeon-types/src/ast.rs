//! Syntax tree for Pigeon programs.
//!
//! Every node carries a [`Span`]. Nodes that later stages annotate
//! (expressions, blocks, declarations, assignments) also carry a
//! [`NodeId`] unique within one parse.

use crate::{Span, Type};
use std::fmt;

/// Identity of an annotated node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

// ══════════════════════════════════════════════════════════════════════════════
// Top Level
// ══════════════════════════════════════════════════════════════════════════════

/// A whole script: function declarations and global statements in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub items: Vec<Item>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Function(FunctionDecl),
    Stmt(Stmt),
}

/// `int name(float a, bool b) { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub return_type: TypeAnnotation,
    pub name: Ident,
    pub params: Vec<Param>,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub type_ann: TypeAnnotation,
    pub name: Ident,
    pub span: Span,
}

/// A spanned identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

/// A type keyword as written in source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TypeAnnotation {
    pub ty: Type,
    pub span: Span,
}

/// `{ stmts... }`, or a single statement standing in for one.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub id: NodeId,
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

// ══════════════════════════════════════════════════════════════════════════════
// Statements
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `var x = expr;` or `const x = expr;`
    VarDecl(VarDecl),
    /// `x = expr;`, `x += expr;` ...
    Assign(AssignStmt),
    /// `f(args);`
    Call(CallStmt),
    /// `if cond block [else block]`
    If(IfStmt),
    /// `while cond block`
    While(WhileStmt),
    /// `do block while cond;`
    DoWhile(DoWhileStmt),
    /// `for i = a to b block` or `for i = a downto b block`
    For(ForStmt),
    /// `return [expr];`
    Return(ReturnStmt),
    Break(Span),
    Continue(Span),
    Block(Block),
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::VarDecl(s) => s.span,
            Stmt::Assign(s) => s.span,
            Stmt::Call(s) => s.span,
            Stmt::If(s) => s.span,
            Stmt::While(s) => s.span,
            Stmt::DoWhile(s) => s.span,
            Stmt::For(s) => s.span,
            Stmt::Return(s) => s.span,
            Stmt::Break(span) | Stmt::Continue(span) => *span,
            Stmt::Block(b) => b.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub id: NodeId,
    pub read_only: bool,
    pub name: Ident,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignStmt {
    pub id: NodeId,
    pub target: Ident,
    pub op: AssignOp,
    pub op_span: Span,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallStmt {
    pub call: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub condition: Expr,
    pub then_block: Block,
    pub else_block: Option<Block>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStmt {
    pub condition: Expr,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DoWhileStmt {
    pub body: Block,
    pub condition: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForDirection {
    To,
    Downto,
}

/// Counts `variable` from `start` to `end` inclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct ForStmt {
    pub variable: Ident,
    pub start: Expr,
    pub direction: ForDirection,
    pub end: Expr,
    /// Distance between counter values; 1 when omitted.
    pub step: Option<Expr>,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStmt {
    pub value: Option<Expr>,
    pub span: Span,
}

// ══════════════════════════════════════════════════════════════════════════════
// Expressions
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub id: NodeId,
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(id: NodeId, kind: ExprKind, span: Span) -> Self {
        Self { id, kind, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    IntLit(i64),
    FloatLit(f64),
    StringLit(String),
    BoolLit(bool),
    Identifier(String),
    Call {
        name: Ident,
        args: Vec<Expr>,
    },
    Unary {
        op: UnaryOp,
        op_span: Span,
        operand: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinOp,
        op_span: Span,
        right: Box<Expr>,
    },
    /// `cond ? then : otherwise`
    Ternary {
        condition: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    Paren(Box<Expr>),
}

// ── Operators ─────────────────────────────────────────────────────────────────

/// Binary operators (in precedence order, lowest first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Or,
    And,
    Eq,
    NotEq,
    Less,
    Greater,
    LessEq,
    GreaterEq,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinOp::Or => "||",
            BinOp::And => "&&",
            BinOp::Eq => "==",
            BinOp::NotEq => "!=",
            BinOp::Less => "<",
            BinOp::Greater => ">",
            BinOp::LessEq => "<=",
            BinOp::GreaterEq => ">=",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Plus,
    Minus,
    Not,
}

impl UnaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Minus => "-",
            UnaryOp::Not => "!",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
}

impl AssignOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::AddAssign => "+=",
            AssignOp::SubAssign => "-=",
            AssignOp::MulAssign => "*=",
            AssignOp::DivAssign => "/=",
            AssignOp::ModAssign => "%=",
        }
    }

    /// The arithmetic a compound assignment applies, `None` for plain `=`.
    pub fn binary_op(&self) -> Option<BinOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::AddAssign => Some(BinOp::Add),
            AssignOp::SubAssign => Some(BinOp::Sub),
            AssignOp::MulAssign => Some(BinOp::Mul),
            AssignOp::DivAssign => Some(BinOp::Div),
            AssignOp::ModAssign => Some(BinOp::Mod),
        }
    }
}

/// Prints expressions fully parenthesized, e.g. `(4 + (4 * 4))`.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::IntLit(n) => write!(f, "{n}"),
            ExprKind::FloatLit(x) => write!(f, "{x:?}"),
            ExprKind::StringLit(s) => write!(f, "{s:?}"),
            ExprKind::BoolLit(b) => write!(f, "{b}"),
            ExprKind::Identifier(name) => f.write_str(name),
            ExprKind::Call { name, args } => {
                write!(f, "{}(", name.name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
            ExprKind::Unary { op, operand, .. } => write!(f, "({}{operand})", op.as_str()),
            ExprKind::Binary {
                left, op, right, ..
            } => write!(f, "({left} {} {right})", op.as_str()),
            ExprKind::Ternary {
                condition,
                then_expr,
                else_expr,
            } => write!(f, "({condition} ? {then_expr} : {else_expr})"),
            ExprKind::Paren(inner) => write!(f, "{inner}"),
        }
    }
}

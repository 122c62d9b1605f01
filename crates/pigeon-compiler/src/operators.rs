//! Typed operator tables.
//!
//! Every operator is resolved by looking up its operand types in a static
//! table of legal combinations. The analyzer uses the result type to
//! annotate the node; a miss is a diagnostic. Int→Float widening is written
//! out as explicit rows, so lookups are plain equality scans and the first
//! matching row wins.

use pigeon_types::ast::{AssignOp, BinOp, UnaryOp};
use pigeon_types::Type;

use Type::{Bool, Float, Int, String as Str};

// ══════════════════════════════════════════════════════════════════════════════
// Bindings
// ══════════════════════════════════════════════════════════════════════════════

/// A legal `left op right` combination and its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinaryBinding {
    pub left: Type,
    pub right: Type,
    pub result: Type,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnaryBinding {
    pub operand: Type,
    pub result: Type,
}

/// A legal `variable op= value` combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssignmentBinding {
    pub variable: Type,
    pub value: Type,
}

/// A legal `cond ? then : else` branch combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TernaryBinding {
    pub then_type: Type,
    pub else_type: Type,
    pub result: Type,
}

const fn bin(left: Type, right: Type, result: Type) -> BinaryBinding {
    BinaryBinding {
        left,
        right,
        result,
    }
}

const fn assign(variable: Type, value: Type) -> AssignmentBinding {
    AssignmentBinding { variable, value }
}

// ══════════════════════════════════════════════════════════════════════════════
// Tables
// ══════════════════════════════════════════════════════════════════════════════

const ARITHMETIC: &[BinaryBinding] = &[
    bin(Int, Int, Int),
    bin(Int, Float, Float),
    bin(Float, Int, Float),
    bin(Float, Float, Float),
];

const ADDITION: &[BinaryBinding] = &[
    bin(Int, Int, Int),
    bin(Int, Float, Float),
    bin(Float, Int, Float),
    bin(Float, Float, Float),
    bin(Str, Str, Str),
];

const MODULO: &[BinaryBinding] = &[bin(Int, Int, Int)];

const RELATIONAL: &[BinaryBinding] = &[
    bin(Int, Int, Bool),
    bin(Int, Float, Bool),
    bin(Float, Int, Bool),
    bin(Float, Float, Bool),
];

const EQUALITY: &[BinaryBinding] = &[
    bin(Int, Int, Bool),
    bin(Float, Float, Bool),
    bin(Bool, Bool, Bool),
    bin(Str, Str, Bool),
];

const LOGICAL: &[BinaryBinding] = &[bin(Bool, Bool, Bool)];

const NUMERIC_UNARY: &[UnaryBinding] = &[
    UnaryBinding {
        operand: Int,
        result: Int,
    },
    UnaryBinding {
        operand: Float,
        result: Float,
    },
];

const NOT: &[UnaryBinding] = &[UnaryBinding {
    operand: Bool,
    result: Bool,
}];

const PLAIN_ASSIGN: &[AssignmentBinding] = &[
    assign(Int, Int),
    assign(Float, Float),
    assign(Float, Int),
    assign(Bool, Bool),
    assign(Str, Str),
];

const ADD_ASSIGN: &[AssignmentBinding] = &[
    assign(Int, Int),
    assign(Float, Float),
    assign(Float, Int),
    assign(Str, Str),
];

const ARITHMETIC_ASSIGN: &[AssignmentBinding] = &[
    assign(Int, Int),
    assign(Float, Float),
    assign(Float, Int),
];

const MOD_ASSIGN: &[AssignmentBinding] = &[assign(Int, Int)];

const TERNARY: &[TernaryBinding] = &[
    TernaryBinding {
        then_type: Int,
        else_type: Int,
        result: Int,
    },
    TernaryBinding {
        then_type: Float,
        else_type: Float,
        result: Float,
    },
    TernaryBinding {
        then_type: Int,
        else_type: Float,
        result: Float,
    },
    TernaryBinding {
        then_type: Float,
        else_type: Int,
        result: Float,
    },
    TernaryBinding {
        then_type: Bool,
        else_type: Bool,
        result: Bool,
    },
    TernaryBinding {
        then_type: Str,
        else_type: Str,
        result: Str,
    },
];

// ══════════════════════════════════════════════════════════════════════════════
// Lookup
// ══════════════════════════════════════════════════════════════════════════════

pub fn binary_table(op: BinOp) -> &'static [BinaryBinding] {
    match op {
        BinOp::Add => ADDITION,
        BinOp::Sub | BinOp::Mul | BinOp::Div => ARITHMETIC,
        BinOp::Mod => MODULO,
        BinOp::Less | BinOp::Greater | BinOp::LessEq | BinOp::GreaterEq => RELATIONAL,
        BinOp::Eq | BinOp::NotEq => EQUALITY,
        BinOp::And | BinOp::Or => LOGICAL,
    }
}

pub fn unary_table(op: UnaryOp) -> &'static [UnaryBinding] {
    match op {
        UnaryOp::Plus | UnaryOp::Minus => NUMERIC_UNARY,
        UnaryOp::Not => NOT,
    }
}

pub fn assignment_table(op: AssignOp) -> &'static [AssignmentBinding] {
    match op {
        AssignOp::Assign => PLAIN_ASSIGN,
        AssignOp::AddAssign => ADD_ASSIGN,
        AssignOp::SubAssign | AssignOp::MulAssign | AssignOp::DivAssign => ARITHMETIC_ASSIGN,
        AssignOp::ModAssign => MOD_ASSIGN,
    }
}

pub fn bind_binary(op: BinOp, left: Type, right: Type) -> Option<&'static BinaryBinding> {
    binary_table(op)
        .iter()
        .find(|b| b.left == left && b.right == right)
}

pub fn bind_unary(op: UnaryOp, operand: Type) -> Option<&'static UnaryBinding> {
    unary_table(op).iter().find(|b| b.operand == operand)
}

pub fn bind_assignment(
    op: AssignOp,
    variable: Type,
    value: Type,
) -> Option<&'static AssignmentBinding> {
    assignment_table(op)
        .iter()
        .find(|b| b.variable == variable && b.value == value)
}

pub fn bind_ternary(then_type: Type, else_type: Type) -> Option<&'static TernaryBinding> {
    TERNARY
        .iter()
        .find(|b| b.then_type == then_type && b.else_type == else_type)
}

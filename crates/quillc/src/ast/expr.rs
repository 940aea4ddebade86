//! Expression AST nodes

use bigdecimal::BigDecimal;
use num_bigint::BigInt;

use super::types::{FunctionSig, Type, Variable};
use crate::common::Span;

/// An expression with its source span and static-type annotation slot.
///
/// `ty` is written exactly once, by the analyzer; the debug assertion in
/// the analyzer treats a second distinct write as a logic error.
#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
    pub ty: Option<Type>,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self {
            kind,
            span,
            ty: None,
        }
    }
}

/// Expression kinds
#[derive(Debug, Clone)]
pub enum ExprKind {
    /// A literal value, fixed at parse time
    Literal(Literal),
    /// Parenthesized group; always wraps exactly a Binary expression
    Group(Box<Expr>),
    /// Binary operation: a + b
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Variable access, optionally indexed: name or name[offset]
    Access {
        offset: Option<Box<Expr>>,
        name: String,
        /// Resolved binding, filled in by the analyzer
        variable: Option<Variable>,
    },
    /// Function call: name(args...)
    Call {
        name: String,
        args: Vec<Expr>,
        /// Resolved binding, filled in by the analyzer
        function: Option<FunctionSig>,
    },
    /// List literal: [a, b, c]
    List(Vec<Expr>),
}

impl ExprKind {
    /// The literal payload, if this is a literal expression
    pub fn literal(&self) -> Option<&Literal> {
        match self {
            ExprKind::Literal(literal) => Some(literal),
            _ => None,
        }
    }
}

/// Literal values; escapes are already expanded by the parser
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Nil,
    Boolean(bool),
    Character(char),
    String(String),
    Integer(BigInt),
    Decimal(BigDecimal),
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Gt,
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinOp {
    pub fn from_symbol(symbol: &str) -> Option<BinOp> {
        match symbol {
            "&&" => Some(BinOp::And),
            "||" => Some(BinOp::Or),
            "==" => Some(BinOp::Eq),
            "!=" => Some(BinOp::Ne),
            "<" => Some(BinOp::Lt),
            ">" => Some(BinOp::Gt),
            "+" => Some(BinOp::Add),
            "-" => Some(BinOp::Sub),
            "*" => Some(BinOp::Mul),
            "/" => Some(BinOp::Div),
            "^" => Some(BinOp::Pow),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::And => "&&",
            BinOp::Or => "||",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Pow => "^",
        }
    }
}

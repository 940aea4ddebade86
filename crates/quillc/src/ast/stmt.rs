//! Statement AST nodes

use super::expr::Expr;
use super::types::Variable;

/// Statement kinds
#[derive(Debug, Clone)]
pub enum Stmt {
    /// Bare expression statement: expr;
    Expression(Expr),
    /// Local declaration: LET name (: Type)? (= expr)? ;
    Declaration {
        name: String,
        type_name: Option<String>,
        value: Option<Expr>,
        /// Resolved binding, filled in by the analyzer
        variable: Option<Variable>,
    },
    /// Assignment: receiver = value; (receiver must be an Access)
    Assignment { receiver: Expr, value: Expr },
    /// IF condition DO then (ELSE else)? END
    If {
        condition: Expr,
        then_block: Vec<Stmt>,
        else_block: Vec<Stmt>,
    },
    /// SWITCH condition (CASE value: body)* DEFAULT: body END
    Switch { condition: Expr, cases: Vec<Case> },
    /// WHILE condition DO body END
    While { condition: Expr, body: Vec<Stmt> },
    /// RETURN value;
    Return { value: Expr },
}

/// One arm of a switch; the default arm has no comparison value
#[derive(Debug, Clone)]
pub struct Case {
    pub value: Option<Expr>,
    pub body: Vec<Stmt>,
}

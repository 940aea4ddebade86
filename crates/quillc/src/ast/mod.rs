//! AST definitions

mod expr;
mod stmt;
mod types;

pub use expr::*;
pub use stmt::*;
pub use types::*;

/// A complete source file: globals first, then functions
#[derive(Debug, Clone, Default)]
pub struct Source {
    pub globals: Vec<Global>,
    pub functions: Vec<Function>,
}

/// A global declaration (LIST, VAR, or VAL)
#[derive(Debug, Clone)]
pub struct Global {
    pub name: String,
    pub type_name: String,
    pub mutable: bool,
    pub value: Option<Expr>,
    /// Resolved binding, filled in by the analyzer
    pub variable: Option<Variable>,
}

/// A function definition
#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub parameters: Vec<String>,
    pub parameter_type_names: Vec<String>,
    pub return_type_name: Option<String>,
    pub statements: Vec<Stmt>,
    /// Resolved signature, filled in by the analyzer
    pub function: Option<FunctionSig>,
}

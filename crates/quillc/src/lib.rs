//! Quill - interpreter and Java transpiler for the Quill language
//!
//! Quill is a small statically typed imperative language. Programs are a
//! sequence of global declarations followed by function definitions and
//! start from a zero-parameter `main`.
//!
//! ## Architecture
//!
//! The pipeline has four stages plus a code generator:
//! - **Lexer** (`lexer/`): character stream to tokens
//! - **Parser** (`parser/`): tokens to the AST
//! - **Sema** (`sema/`): static analysis, type and binding annotation
//! - **Interp** (`interp/`): tree-walking evaluation
//! - **Codegen** (`codegen/`): Java source emission from the analyzed AST
//! - **Common** (`common/`): shared infrastructure (errors, spans, scopes)

pub mod ast;
pub mod codegen;
pub mod common;
pub mod driver;
pub mod interp;
pub mod lexer;
pub mod parser;
pub mod sema;

// Re-exports for convenience
pub use common::{CompileError, CompileResult, DiagnosticReporter, Span};
pub use driver::{check, emit_java, parse, run, tokenize};

//! Pipeline orchestration
//!
//! Thin entry points over the four stages. Each one runs the pipeline
//! exactly as far as it needs: `parse` stops after syntax, `check` after
//! analysis, `run` and `emit_java` consume the analyzed tree.

use std::io::Write;

use crate::ast::Source;
use crate::codegen::Generator;
use crate::common::CompileResult;
use crate::interp::{self, Interpreter};
use crate::lexer::{Lexer, Token};
use crate::parser::Parser;
use crate::sema::Analyzer;

/// Lex a source string into tokens
pub fn tokenize(source: &str) -> CompileResult<Vec<Token>> {
    Lexer::new(source).tokenize()
}

/// Lex and parse a source string
pub fn parse(source: &str) -> CompileResult<Source> {
    let tokens = tokenize(source)?;
    Parser::new(tokens).parse_source()
}

/// Lex, parse, and analyze a source string, yielding the annotated tree
pub fn check(source: &str) -> CompileResult<Source> {
    let mut ast = parse(source)?;
    Analyzer::new().analyze(&mut ast)?;
    Ok(ast)
}

/// Evaluate a program, printing to stdout, and yield its exit code
pub fn run(source: &str) -> CompileResult<i32> {
    let ast = check(source)?;
    let value = Interpreter::new().run(&ast)?;
    interp::exit_code(&value)
}

/// Evaluate a program with `print` redirected to `out`
pub fn run_with_output(source: &str, out: Box<dyn Write>) -> CompileResult<i32> {
    let ast = check(source)?;
    let value = Interpreter::with_output(out).run(&ast)?;
    interp::exit_code(&value)
}

/// Analyze a program and render it as Java source
pub fn emit_java(source: &str) -> CompileResult<String> {
    let ast = check(source)?;
    Ok(Generator::generate(&ast))
}

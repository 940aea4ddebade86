//! Quill - interpreter and Java transpiler for the Quill language
//!
//! Usage: quillc [OPTIONS] <input>

use anyhow::Context;
use clap::{Parser as ClapParser, ValueEnum};
use quill_lang::codegen::Generator;
use quill_lang::common::{CompileError, DiagnosticReporter};
use quill_lang::interp::{self, Interpreter};
use std::fs;
use std::path::PathBuf;
use std::process;

/// What to do with the input program
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Default)]
enum Mode {
    /// Analyze and evaluate the program
    #[default]
    Run,
    /// Analyze only, reporting errors without evaluating
    Check,
    /// Analyze and emit Java source
    EmitJava,
}

#[derive(ClapParser, Debug)]
#[command(name = "quillc")]
#[command(version)]
#[command(about = "Interpreter and Java transpiler for the Quill language", long_about = None)]
struct Args {
    /// Input source file (.quill)
    #[arg(required = true)]
    input: PathBuf,

    /// Mode (run, check, or emit-java)
    #[arg(short, long, value_enum, default_value = "run")]
    mode: Mode,

    /// Output file for emitted Java (defaults to Main.java next to the input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Dump tokens (for debugging)
    #[arg(long)]
    dump_tokens: bool,

    /// Dump AST (for debugging)
    #[arg(long)]
    dump_ast: bool,
}

fn main() {
    let args = Args::parse();

    match run(&args) {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("error: {:#}", err);
            process::exit(1);
        }
    }
}

fn run(args: &Args) -> anyhow::Result<i32> {
    let source = fs::read_to_string(&args.input)
        .with_context(|| format!("cannot read {}", args.input.display()))?;
    let filename = args.input.display().to_string();

    let mut reporter = DiagnosticReporter::new();
    let file_id = reporter.add_file(&filename, &source);

    // Pipeline errors carry source locations, so they go through the
    // diagnostic reporter rather than the plain top-level error path.
    let report = |error: &CompileError| {
        reporter.report_error(file_id, error);
        1
    };

    let tokens = match quill_lang::tokenize(&source) {
        Ok(tokens) => tokens,
        Err(error) => return Ok(report(&error)),
    };
    if args.dump_tokens {
        eprintln!("=== Tokens ===");
        for token in &tokens {
            eprintln!("{:?}", token);
        }
        eprintln!("=== End Tokens ===\n");
    }

    let ast = match quill_lang::check(&source) {
        Ok(ast) => ast,
        Err(error) => return Ok(report(&error)),
    };
    if args.dump_ast {
        eprintln!("=== AST ===");
        eprintln!("{:#?}", ast);
        eprintln!("=== End AST ===\n");
    }

    match args.mode {
        Mode::Check => {
            if args.verbose {
                eprintln!("{}: ok", filename);
            }
            Ok(0)
        }

        Mode::Run => {
            let value = match Interpreter::new().run(&ast) {
                Ok(value) => value,
                Err(error) => return Ok(report(&error)),
            };
            match interp::exit_code(&value) {
                Ok(code) => Ok(code),
                Err(error) => Ok(report(&error)),
            }
        }

        Mode::EmitJava => {
            let java = Generator::generate(&ast);
            let output_path = args.output.clone().unwrap_or_else(|| {
                let mut path = args.input.clone();
                path.set_file_name("Main.java");
                path
            });
            fs::write(&output_path, java)
                .with_context(|| format!("cannot write {}", output_path.display()))?;
            if args.verbose {
                eprintln!("Wrote {}", output_path.display());
            }
            Ok(0)
        }
    }
}

//! Semantic analysis

mod analyzer;

pub use analyzer::{Analyzer, StaticScope, builtin_scope};

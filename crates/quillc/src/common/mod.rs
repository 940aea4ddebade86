//! Common infrastructure shared across the pipeline stages

mod error;
mod scope;
mod span;

pub use error::{CompileError, CompileResult, DiagnosticReporter};
pub use scope::{Scope, ScopeRef};
pub use span::Span;

//! Tree-walking evaluation

mod interpreter;
mod value;

pub use interpreter::{Interpreter, exit_code};
pub use value::{Callable, Env, RuntimeVariable, Value};

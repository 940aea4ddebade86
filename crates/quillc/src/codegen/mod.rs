//! Java code generation

mod generator;

pub use generator::Generator;

//! Runtime values and bindings

use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;

use crate::ast::Function;
use crate::common::ScopeRef;

/// Scope chain of runtime bindings
pub type Env = ScopeRef<RuntimeVariable, Callable>;

/// A runtime value.
///
/// Integers and decimals are arbitrary precision; the literal range checks
/// happen during analysis, arithmetic afterwards is unbounded.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Boolean(bool),
    Character(char),
    String(String),
    Integer(BigInt),
    Decimal(BigDecimal),
    List(Vec<Value>),
}

impl Value {
    /// Kind name used in runtime error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Nil => "Nil",
            Value::Boolean(_) => "Boolean",
            Value::Character(_) => "Character",
            Value::String(_) => "String",
            Value::Integer(_) => "Integer",
            Value::Decimal(_) => "Decimal",
            Value::List(_) => "List",
        }
    }

    /// Natural ordering between two values of the same comparable kind
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Integer(l), Value::Integer(r)) => Some(l.cmp(r)),
            (Value::Decimal(l), Value::Decimal(r)) => Some(l.cmp(r)),
            (Value::Character(l), Value::Character(r)) => Some(l.cmp(r)),
            (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("nil"),
            Value::Boolean(value) => write!(f, "{}", value),
            Value::Character(value) => write!(f, "{}", value),
            Value::String(value) => f.write_str(value),
            Value::Integer(value) => write!(f, "{}", value),
            Value::Decimal(value) => write!(f, "{}", value),
            Value::List(elements) => {
                f.write_str("[")?;
                for (index, element) in elements.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", element)?;
                }
                f.write_str("]")
            }
        }
    }
}

/// A variable slot; the cell is shared so that indexed assignment through
/// an outer-scope binding is visible everywhere the variable is
#[derive(Debug, Clone)]
pub struct RuntimeVariable {
    pub name: String,
    pub mutable: bool,
    pub value: Rc<RefCell<Value>>,
}

impl RuntimeVariable {
    pub fn new(name: impl Into<String>, mutable: bool, value: Value) -> Self {
        Self {
            name: name.into(),
            mutable,
            value: Rc::new(RefCell::new(value)),
        }
    }
}

/// A callable runtime binding: the one builtin, or a user function closed
/// over its definition environment
#[derive(Clone)]
pub enum Callable {
    /// print(Any): writes the argument and a newline to the output sink
    Print,
    User {
        decl: Rc<Function>,
        env: Env,
    },
}

//! Tree-walking evaluator
//!
//! Walks the analyzed AST directly. Scoping is lexical: a call runs in a
//! fresh frame whose parent is the environment the function was defined
//! in, not the caller's frame. RETURN is modeled as an explicit signal
//! that unwinds block execution and is collapsed at the call boundary.

use std::cmp::Ordering;
use std::io::{self, Write};
use std::rc::Rc;

use bigdecimal::{BigDecimal, RoundingMode};
use num_traits::{One, Signed, ToPrimitive, Zero};

use super::value::{Callable, Env, RuntimeVariable, Value};
use crate::ast::*;
use crate::common::{CompileError, CompileResult, Scope};

/// Recursion limit; deeper call chains abort with a runtime error instead
/// of overflowing the host stack. Each interpreted call costs several
/// evaluator frames, so the cap must stay well under what the default
/// thread stack can hold.
const MAX_CALL_DEPTH: usize = 64;

/// Scale decimal division rounds to, banker's rounding
const DIVISION_SCALE: i64 = 1;

/// Outcome of executing a statement or block
enum Exec {
    Normal,
    Return(Value),
}

/// The evaluator; owns the scope chain and the output sink `print`
/// writes to
pub struct Interpreter {
    scope: Env,
    out: Box<dyn Write>,
    depth: usize,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    pub fn with_output(out: Box<dyn Write>) -> Self {
        let scope: Env = Scope::root();
        scope
            .borrow_mut()
            .define_function("print", 1, Callable::Print)
            .expect("builtin scope starts empty");
        Self {
            scope: Scope::child_of(&scope),
            out,
            depth: 0,
        }
    }

    /// Evaluate a source file: define globals and functions in order, then
    /// invoke main/0 and yield its result
    pub fn run(&mut self, source: &Source) -> CompileResult<Value> {
        for global in &source.globals {
            let value = match &global.value {
                Some(expr) => self.eval_expr(expr)?,
                None => Value::Nil,
            };
            self.define_variable(&global.name, global.mutable, value)?;
        }
        for function in &source.functions {
            let callable = Callable::User {
                decl: Rc::new(function.clone()),
                env: Rc::clone(&self.scope),
            };
            self.scope
                .borrow_mut()
                .define_function(function.name.clone(), function.parameters.len(), callable)
                .map_err(CompileError::runtime)?;
        }

        let main = self
            .scope
            .borrow()
            .lookup_function("main", 0)
            .ok_or_else(|| CompileError::runtime("missing a main function"))?;
        self.call(&main, Vec::new())
    }

    fn call(&mut self, callable: &Callable, args: Vec<Value>) -> CompileResult<Value> {
        match callable {
            Callable::Print => {
                let value = args.into_iter().next().unwrap_or(Value::Nil);
                writeln!(self.out, "{}", value)?;
                Ok(Value::Nil)
            }

            Callable::User { decl, env } => {
                if self.depth >= MAX_CALL_DEPTH {
                    return Err(CompileError::runtime(format!(
                        "call depth exceeded invoking '{}'",
                        decl.name
                    )));
                }

                let frame = Scope::child_of(env);
                for (param, arg) in decl.parameters.iter().zip(args) {
                    frame
                        .borrow_mut()
                        .define_variable(
                            param.clone(),
                            RuntimeVariable::new(param.clone(), true, arg),
                        )
                        .map_err(CompileError::runtime)?;
                }

                let enclosing = std::mem::replace(&mut self.scope, frame);
                self.depth += 1;
                let result = self.exec_all(&decl.statements);
                self.depth -= 1;
                self.scope = enclosing;

                // Falling off the end of a function yields nil.
                match result? {
                    Exec::Return(value) => Ok(value),
                    Exec::Normal => Ok(Value::Nil),
                }
            }
        }
    }

    // ==================== Statements ====================

    fn exec_stmt(&mut self, stmt: &Stmt) -> CompileResult<Exec> {
        match stmt {
            Stmt::Expression(expr) => {
                self.eval_expr(expr)?;
                Ok(Exec::Normal)
            }

            Stmt::Declaration { name, value, .. } => {
                let value = match value {
                    Some(expr) => self.eval_expr(expr)?,
                    None => Value::Nil,
                };
                self.define_variable(name, true, value)?;
                Ok(Exec::Normal)
            }

            Stmt::Assignment { receiver, value } => {
                let ExprKind::Access { offset, name, .. } = &receiver.kind else {
                    return Err(CompileError::runtime("assignment target is not assignable"));
                };
                let offset = match offset {
                    Some(expr) => Some(self.eval_expr(expr)?),
                    None => None,
                };
                let value = self.eval_expr(value)?;
                let variable = self.lookup_variable(name)?;

                match offset {
                    Some(offset) => {
                        let index = self.index_value(&offset)?;
                        let mut slot = variable.value.borrow_mut();
                        let Value::List(elements) = &mut *slot else {
                            return Err(CompileError::runtime(format!(
                                "'{}' is not a list",
                                name
                            )));
                        };
                        if index >= elements.len() {
                            return Err(CompileError::runtime(format!(
                                "index {} is out of bounds for '{}' of length {}",
                                index,
                                name,
                                elements.len()
                            )));
                        }
                        elements[index] = value;
                    }
                    None => *variable.value.borrow_mut() = value,
                }
                Ok(Exec::Normal)
            }

            Stmt::If {
                condition,
                then_block,
                else_block,
            } => {
                if self.eval_condition(condition)? {
                    self.exec_block(then_block)
                } else {
                    self.exec_block(else_block)
                }
            }

            Stmt::Switch { condition, cases } => {
                let condition = self.eval_expr(condition)?;
                for case in cases {
                    let matches = match &case.value {
                        Some(value) => self.eval_expr(value)? == condition,
                        None => true,
                    };
                    if matches {
                        return self.exec_block(&case.body);
                    }
                }
                Ok(Exec::Normal)
            }

            Stmt::While { condition, body } => {
                while self.eval_condition(condition)? {
                    match self.exec_block(body)? {
                        Exec::Normal => {}
                        ret => return Ok(ret),
                    }
                }
                Ok(Exec::Normal)
            }

            Stmt::Return { value } => Ok(Exec::Return(self.eval_expr(value)?)),
        }
    }

    /// Execute a block in its own child frame; the frame is discarded
    /// when the block exits
    fn exec_block(&mut self, block: &[Stmt]) -> CompileResult<Exec> {
        let enclosing = Rc::clone(&self.scope);
        self.scope = Scope::child_of(&enclosing);
        let result = self.exec_all(block);
        self.scope = enclosing;
        result
    }

    fn exec_all(&mut self, block: &[Stmt]) -> CompileResult<Exec> {
        for stmt in block {
            match self.exec_stmt(stmt)? {
                Exec::Normal => {}
                ret => return Ok(ret),
            }
        }
        Ok(Exec::Normal)
    }

    // ==================== Expressions ====================

    fn eval_expr(&mut self, expr: &Expr) -> CompileResult<Value> {
        match &expr.kind {
            ExprKind::Literal(literal) => Ok(match literal {
                Literal::Nil => Value::Nil,
                Literal::Boolean(value) => Value::Boolean(*value),
                Literal::Character(value) => Value::Character(*value),
                Literal::String(value) => Value::String(value.clone()),
                Literal::Integer(value) => Value::Integer(value.clone()),
                Literal::Decimal(value) => Value::Decimal(value.clone()),
            }),

            ExprKind::Group(inner) => self.eval_expr(inner),

            ExprKind::Binary { op, left, right } => self.eval_binary(*op, left, right),

            ExprKind::Access { offset, name, .. } => {
                let variable = self.lookup_variable(name)?;
                match offset {
                    Some(expr) => {
                        let offset = self.eval_expr(expr)?;
                        let index = self.index_value(&offset)?;
                        let slot = variable.value.borrow();
                        let Value::List(elements) = &*slot else {
                            return Err(CompileError::runtime(format!(
                                "'{}' is not a list",
                                name
                            )));
                        };
                        elements.get(index).cloned().ok_or_else(|| {
                            CompileError::runtime(format!(
                                "index {} is out of bounds for '{}' of length {}",
                                index,
                                name,
                                elements.len()
                            ))
                        })
                    }
                    None => Ok(variable.value.borrow().clone()),
                }
            }

            ExprKind::Call { name, args, .. } => {
                let args = args
                    .iter()
                    .map(|arg| self.eval_expr(arg))
                    .collect::<CompileResult<Vec<_>>>()?;
                let callable = self
                    .scope
                    .borrow()
                    .lookup_function(name, args.len())
                    .ok_or_else(|| {
                        CompileError::runtime(format!("unresolved function '{}'", name))
                    })?;
                self.call(&callable, args)
            }

            ExprKind::List(elements) => {
                let elements = elements
                    .iter()
                    .map(|element| self.eval_expr(element))
                    .collect::<CompileResult<Vec<_>>>()?;
                Ok(Value::List(elements))
            }
        }
    }

    fn eval_binary(&mut self, op: BinOp, left: &Expr, right: &Expr) -> CompileResult<Value> {
        // The logical operators short-circuit; the right operand must not
        // be evaluated when the left already decides the result.
        match op {
            BinOp::And => {
                return Ok(Value::Boolean(
                    self.eval_condition(left)? && self.eval_condition(right)?,
                ));
            }
            BinOp::Or => {
                return Ok(Value::Boolean(
                    self.eval_condition(left)? || self.eval_condition(right)?,
                ));
            }
            _ => {}
        }

        let left = self.eval_expr(left)?;
        let right = self.eval_expr(right)?;
        match op {
            BinOp::And | BinOp::Or => unreachable!("handled above"),

            BinOp::Eq => Ok(Value::Boolean(left == right)),
            BinOp::Ne => Ok(Value::Boolean(left != right)),

            BinOp::Lt => Ok(Value::Boolean(
                self.compare(op, &left, &right)? == Ordering::Less,
            )),
            BinOp::Gt => Ok(Value::Boolean(
                self.compare(op, &left, &right)? == Ordering::Greater,
            )),

            BinOp::Add => match (left, right) {
                // Concatenation wins whenever either side is a string.
                (Value::String(l), r) => Ok(Value::String(format!("{}{}", l, r))),
                (l, Value::String(r)) => Ok(Value::String(format!("{}{}", l, r))),
                (Value::Integer(l), Value::Integer(r)) => Ok(Value::Integer(l + r)),
                (Value::Decimal(l), Value::Decimal(r)) => Ok(Value::Decimal(l + r)),
                (l, r) => Err(self.binary_error(op, &l, &r)),
            },

            BinOp::Sub => match (left, right) {
                (Value::Integer(l), Value::Integer(r)) => Ok(Value::Integer(l - r)),
                (Value::Decimal(l), Value::Decimal(r)) => Ok(Value::Decimal(l - r)),
                (l, r) => Err(self.binary_error(op, &l, &r)),
            },

            BinOp::Mul => match (left, right) {
                (Value::Integer(l), Value::Integer(r)) => Ok(Value::Integer(l * r)),
                (Value::Decimal(l), Value::Decimal(r)) => Ok(Value::Decimal(l * r)),
                (l, r) => Err(self.binary_error(op, &l, &r)),
            },

            BinOp::Div => match (left, right) {
                (Value::Integer(l), Value::Integer(r)) => {
                    if r.is_zero() {
                        return Err(CompileError::runtime("division by zero"));
                    }
                    // BigInt division already truncates toward zero.
                    Ok(Value::Integer(l / r))
                }
                (Value::Decimal(l), Value::Decimal(r)) => {
                    if r.is_zero() {
                        return Err(CompileError::runtime("division by zero"));
                    }
                    let quotient = l / r;
                    Ok(Value::Decimal(
                        quotient.with_scale_round(DIVISION_SCALE, RoundingMode::HalfEven),
                    ))
                }
                (l, r) => Err(self.binary_error(op, &l, &r)),
            },

            BinOp::Pow => {
                let exponent = match &right {
                    Value::Integer(value) => value,
                    _ => return Err(self.binary_error(op, &left, &right)),
                };
                if exponent.is_negative() {
                    return Err(CompileError::runtime(format!(
                        "negative exponent {}",
                        exponent
                    )));
                }
                let exponent = exponent.to_u32().ok_or_else(|| {
                    CompileError::runtime(format!("exponent {} is too large", exponent))
                })?;
                match left {
                    Value::Integer(base) => Ok(Value::Integer(base.pow(exponent))),
                    Value::Decimal(base) => {
                        let mut result = BigDecimal::one();
                        for _ in 0..exponent {
                            result = &result * &base;
                        }
                        Ok(Value::Decimal(result))
                    }
                    l => Err(self.binary_error(op, &l, &right)),
                }
            }
        }
    }

    // ==================== Helpers ====================

    fn eval_condition(&mut self, expr: &Expr) -> CompileResult<bool> {
        match self.eval_expr(expr)? {
            Value::Boolean(value) => Ok(value),
            other => Err(CompileError::runtime(format!(
                "expected a Boolean, found {}",
                other.kind()
            ))),
        }
    }

    fn compare(&self, op: BinOp, left: &Value, right: &Value) -> CompileResult<Ordering> {
        left.compare(right)
            .ok_or_else(|| self.binary_error(op, left, right))
    }

    fn binary_error(&self, op: BinOp, left: &Value, right: &Value) -> CompileError {
        CompileError::runtime(format!(
            "cannot apply '{}' to {} and {}",
            op.symbol(),
            left.kind(),
            right.kind()
        ))
    }

    fn index_value(&self, value: &Value) -> CompileResult<usize> {
        let Value::Integer(value) = value else {
            return Err(CompileError::runtime(format!(
                "a list index must be an Integer, found {}",
                value.kind()
            )));
        };
        value
            .to_usize()
            .ok_or_else(|| CompileError::runtime(format!("index {} is out of bounds", value)))
    }

    fn define_variable(&mut self, name: &str, mutable: bool, value: Value) -> CompileResult<()> {
        self.scope
            .borrow_mut()
            .define_variable(name.to_string(), RuntimeVariable::new(name, mutable, value))
            .map_err(CompileError::runtime)
    }

    fn lookup_variable(&self, name: &str) -> CompileResult<RuntimeVariable> {
        self.scope
            .borrow()
            .lookup_variable(name)
            .ok_or_else(|| CompileError::runtime(format!("unresolved variable '{}'", name)))
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert the value main evaluated to into a process exit code
pub fn exit_code(value: &Value) -> CompileResult<i32> {
    match value {
        Value::Nil => Ok(0),
        Value::Integer(code) => code.to_i32().ok_or_else(|| {
            CompileError::runtime(format!("exit code {} is out of range", code))
        }),
        other => Err(CompileError::runtime(format!(
            "main evaluated to a {}, expected an Integer",
            other.kind()
        ))),
    }
}

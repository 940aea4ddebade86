//! Static semantic analysis
//!
//! Single pre-order pass over globals, then statements, then expressions,
//! annotating every expression with its resolved type and every access,
//! call, and declaration with its resolved binding. Function signatures
//! are collected up front so bodies may call forward and recursively.

use std::rc::Rc;

use bigdecimal::ToPrimitive;
use num_bigint::BigInt;

use crate::ast::*;
use crate::common::{CompileError, CompileResult, Scope, ScopeRef};

/// Scope chain of static bindings
pub type StaticScope = ScopeRef<Variable, FunctionSig>;

/// Create the builtin scope every program is analyzed against:
/// a single frame holding `print(Any) -> Nil`.
pub fn builtin_scope() -> StaticScope {
    let scope = Scope::root();
    let print = FunctionSig::new("print", "System.out.println", vec![Type::Any], Type::Nil);
    scope
        .borrow_mut()
        .define_function("print", 1, print)
        .expect("builtin scope starts empty");
    scope
}

/// Semantic analyzer
pub struct Analyzer {
    scope: StaticScope,
    /// Declared return type of the function being analyzed, if any
    return_type: Option<Type>,
}

impl Analyzer {
    pub fn new() -> Self {
        Self::with_scope(builtin_scope())
    }

    pub fn with_scope(parent: StaticScope) -> Self {
        Self {
            scope: Scope::child_of(&parent),
            return_type: None,
        }
    }

    /// Analyze a complete source file in place
    pub fn analyze(&mut self, source: &mut Source) -> CompileResult<()> {
        // First pass: collect signatures so calls resolve regardless of
        // definition order.
        for function in &mut source.functions {
            self.collect_function(function)?;
        }
        self.check_main(source)?;

        for global in &mut source.globals {
            self.analyze_global(global)?;
        }
        for function in &mut source.functions {
            self.analyze_function(function)?;
        }
        Ok(())
    }

    fn collect_function(&mut self, function: &mut Function) -> CompileResult<()> {
        let parameter_types = function
            .parameter_type_names
            .iter()
            .map(|name| self.resolve_type(name))
            .collect::<CompileResult<Vec<_>>>()?;
        let return_type = match &function.return_type_name {
            Some(name) => self.resolve_type(name)?,
            None => Type::Nil,
        };

        let sig = FunctionSig::new(
            function.name.clone(),
            function.name.clone(),
            parameter_types,
            return_type,
        );
        self.scope
            .borrow_mut()
            .define_function(function.name.clone(), sig.arity(), sig.clone())
            .map_err(CompileError::analysis)?;

        debug_assert!(function.function.is_none());
        function.function = Some(sig);
        Ok(())
    }

    fn check_main(&self, source: &Source) -> CompileResult<()> {
        let main = source
            .functions
            .iter()
            .find(|f| f.name == "main" && f.parameters.is_empty());
        match main {
            None => Err(CompileError::analysis(
                "missing a main function with zero parameters",
            )),
            Some(f) if f.return_type_name.as_deref() != Some("Integer") => Err(
                CompileError::analysis("main must declare return type Integer"),
            ),
            Some(_) => Ok(()),
        }
    }

    fn analyze_global(&mut self, global: &mut Global) -> CompileResult<()> {
        let declared = self.resolve_type(&global.type_name)?;
        if let Some(value) = &mut global.value {
            let value_ty = self.analyze_expr(value)?;
            self.require_assignable(declared, value_ty)?;
        }

        let binding = Variable::new(global.name.clone(), declared, global.mutable);
        self.define_variable(binding.clone())?;
        debug_assert!(global.variable.is_none());
        global.variable = Some(binding);
        Ok(())
    }

    fn analyze_function(&mut self, function: &mut Function) -> CompileResult<()> {
        let return_type = match &function.return_type_name {
            Some(name) => Some(self.resolve_type(name)?),
            None => None,
        };

        let enclosing = Rc::clone(&self.scope);
        self.scope = Scope::child_of(&enclosing);
        let previous = self.return_type.take();
        self.return_type = return_type;

        let result = self.analyze_function_body(function);

        // Restored on every exit path, so later declarations never see a
        // stale nested scope.
        self.scope = enclosing;
        self.return_type = previous;
        result
    }

    fn analyze_function_body(&mut self, function: &mut Function) -> CompileResult<()> {
        for (name, type_name) in function
            .parameters
            .iter()
            .zip(&function.parameter_type_names)
        {
            let ty = self.resolve_type(type_name)?;
            self.define_variable(Variable::new(name.clone(), ty, true))?;
        }
        for stmt in &mut function.statements {
            self.analyze_stmt(stmt)?;
        }
        Ok(())
    }

    // ==================== Statements ====================

    fn analyze_stmt(&mut self, stmt: &mut Stmt) -> CompileResult<()> {
        match stmt {
            Stmt::Expression(expr) => {
                self.analyze_expr(expr)?;
                if !matches!(expr.kind, ExprKind::Call { .. }) {
                    return Err(CompileError::analysis(
                        "an expression statement must be a function call",
                    ));
                }
                Ok(())
            }

            Stmt::Declaration {
                name,
                type_name,
                value,
                variable,
            } => {
                let declared = match type_name {
                    Some(name) => Some(self.resolve_type(name)?),
                    None => None,
                };
                let value_ty = match value {
                    Some(expr) => Some(self.analyze_expr(expr)?),
                    None => None,
                };
                let ty = match (declared, value_ty) {
                    (Some(declared), Some(value_ty)) => {
                        self.require_assignable(declared, value_ty)?;
                        declared
                    }
                    (Some(declared), None) => declared,
                    (None, Some(value_ty)) => value_ty,
                    (None, None) => {
                        return Err(CompileError::analysis(format!(
                            "declaration of '{}' needs a type or an initializer",
                            name
                        )));
                    }
                };

                let binding = Variable::new(name.clone(), ty, true);
                self.define_variable(binding.clone())?;
                debug_assert!(variable.is_none());
                *variable = Some(binding);
                Ok(())
            }

            Stmt::Assignment { receiver, value } => {
                let ExprKind::Access { .. } = receiver.kind else {
                    return Err(CompileError::analysis(
                        "assignment target must be an access expression",
                    ));
                };
                let receiver_ty = self.analyze_expr(receiver)?;
                if let ExprKind::Access {
                    variable: Some(variable),
                    ..
                } = &receiver.kind
                {
                    if !variable.mutable {
                        return Err(CompileError::analysis(format!(
                            "cannot assign to immutable variable '{}'",
                            variable.name
                        )));
                    }
                }
                let value_ty = self.analyze_expr(value)?;
                self.require_assignable(receiver_ty, value_ty)
            }

            Stmt::If {
                condition,
                then_block,
                else_block,
            } => {
                let condition_ty = self.analyze_expr(condition)?;
                self.require_assignable(Type::Boolean, condition_ty)?;
                if then_block.is_empty() {
                    return Err(CompileError::analysis(
                        "an if statement must have a non-empty then block",
                    ));
                }
                self.analyze_block(then_block)?;
                self.analyze_block(else_block)
            }

            Stmt::Switch { condition, cases } => {
                let condition_ty = self.analyze_expr(condition)?;

                match cases.last() {
                    Some(last) if last.value.is_none() => {}
                    _ => {
                        return Err(CompileError::analysis(
                            "the last switch case must be the default",
                        ));
                    }
                }
                if cases.iter().filter(|c| c.value.is_none()).count() != 1 {
                    return Err(CompileError::analysis(
                        "a switch must have exactly one default case",
                    ));
                }

                for case in cases {
                    if let Some(value) = &mut case.value {
                        let value_ty = self.analyze_expr(value)?;
                        self.require_assignable(condition_ty, value_ty)?;
                    }
                    self.analyze_block(&mut case.body)?;
                }
                Ok(())
            }

            Stmt::While { condition, body } => {
                let condition_ty = self.analyze_expr(condition)?;
                self.require_assignable(Type::Boolean, condition_ty)?;
                self.analyze_block(body)
            }

            Stmt::Return { value } => {
                let value_ty = self.analyze_expr(value)?;
                if let Some(return_type) = self.return_type {
                    self.require_assignable(return_type, value_ty)?;
                }
                Ok(())
            }
        }
    }

    /// Analyze a block in its own child scope; the scope pointer is
    /// restored on every exit path, including errors.
    fn analyze_block(&mut self, block: &mut [Stmt]) -> CompileResult<()> {
        let enclosing = Rc::clone(&self.scope);
        self.scope = Scope::child_of(&enclosing);
        let result = block.iter_mut().try_for_each(|stmt| self.analyze_stmt(stmt));
        self.scope = enclosing;
        result
    }

    // ==================== Expressions ====================

    fn analyze_expr(&mut self, expr: &mut Expr) -> CompileResult<Type> {
        let ty = match &mut expr.kind {
            ExprKind::Literal(literal) => self.literal_type(literal)?,

            ExprKind::Group(inner) => {
                if !matches!(inner.kind, ExprKind::Binary { .. }) {
                    return Err(CompileError::analysis(
                        "a grouped expression must be a binary expression",
                    ));
                }
                self.analyze_expr(inner)?
            }

            ExprKind::Binary { op, left, right } => {
                let op = *op;
                let left_ty = self.analyze_expr(left)?;
                let right_ty = self.analyze_expr(right)?;
                self.binary_type(op, left_ty, right_ty)?
            }

            ExprKind::Access {
                offset,
                name,
                variable,
            } => {
                if let Some(offset) = offset {
                    let offset_ty = self.analyze_expr(offset)?;
                    if offset_ty != Type::Integer {
                        return Err(CompileError::analysis(format!(
                            "a list index must be Integer, found {}",
                            offset_ty
                        )));
                    }
                }
                let binding = self
                    .scope
                    .borrow()
                    .lookup_variable(name)
                    .ok_or_else(|| {
                        CompileError::analysis(format!("unresolved variable '{}'", name))
                    })?;
                let ty = binding.ty;
                debug_assert!(variable.is_none() || variable.as_ref() == Some(&binding));
                *variable = Some(binding);
                ty
            }

            ExprKind::Call {
                name,
                args,
                function,
            } => {
                let arg_types = args
                    .iter_mut()
                    .map(|arg| self.analyze_expr(arg))
                    .collect::<CompileResult<Vec<_>>>()?;
                let sig = self
                    .scope
                    .borrow()
                    .lookup_function(name, args.len())
                    .ok_or_else(|| {
                        CompileError::analysis(format!(
                            "unresolved function '{}' with {} argument(s)",
                            name,
                            args.len()
                        ))
                    })?;
                for (arg_ty, param_ty) in arg_types.iter().zip(&sig.parameter_types) {
                    self.require_assignable(*param_ty, *arg_ty)?;
                }
                let ty = sig.return_type;
                debug_assert!(function.is_none() || function.as_ref() == Some(&sig));
                *function = Some(sig);
                ty
            }

            ExprKind::List(elements) => {
                let types = elements
                    .iter_mut()
                    .map(|element| self.analyze_expr(element))
                    .collect::<CompileResult<Vec<_>>>()?;
                let element_ty = types.first().copied().ok_or_else(|| {
                    CompileError::analysis("a list literal must have at least one element")
                })?;
                for ty in &types {
                    self.require_assignable(element_ty, *ty)?;
                }
                element_ty
            }
        };

        debug_assert!(expr.ty.is_none() || expr.ty == Some(ty));
        expr.ty = Some(ty);
        Ok(ty)
    }

    /// Literal typing with host-width range checks: integers against i32,
    /// decimals against finite f64.
    fn literal_type(&self, literal: &Literal) -> CompileResult<Type> {
        match literal {
            Literal::Nil => Ok(Type::Nil),
            Literal::Boolean(_) => Ok(Type::Boolean),
            Literal::Character(_) => Ok(Type::Character),
            Literal::String(_) => Ok(Type::String),
            Literal::Integer(value) => {
                if *value < BigInt::from(i32::MIN) || *value > BigInt::from(i32::MAX) {
                    return Err(CompileError::analysis(format!(
                        "integer literal {} is out of range",
                        value
                    )));
                }
                Ok(Type::Integer)
            }
            Literal::Decimal(value) => {
                match value.to_f64() {
                    Some(host) if host.is_finite() => Ok(Type::Decimal),
                    _ => Err(CompileError::analysis(format!(
                        "decimal literal {} is out of range",
                        value
                    ))),
                }
            }
        }
    }

    fn binary_type(&self, op: BinOp, left: Type, right: Type) -> CompileResult<Type> {
        match op {
            BinOp::And | BinOp::Or => {
                if left == Type::Boolean && right == Type::Boolean {
                    Ok(Type::Boolean)
                } else {
                    Err(CompileError::analysis(format!(
                        "operands of '{}' must be Boolean, found {} and {}",
                        op.symbol(),
                        left,
                        right
                    )))
                }
            }

            BinOp::Lt | BinOp::Gt | BinOp::Eq | BinOp::Ne => {
                self.require_assignable(Type::Comparable, left)?;
                self.require_assignable(Type::Comparable, right)?;
                if left != right {
                    return Err(CompileError::analysis(format!(
                        "operands of '{}' must be the same type, found {} and {}",
                        op.symbol(),
                        left,
                        right
                    )));
                }
                Ok(Type::Boolean)
            }

            BinOp::Add if left == Type::String || right == Type::String => Ok(Type::String),

            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div => {
                if left == right && matches!(left, Type::Integer | Type::Decimal) {
                    Ok(left)
                } else {
                    Err(CompileError::analysis(format!(
                        "operands of '{}' must both be Integer or both be Decimal, found {} and {}",
                        op.symbol(),
                        left,
                        right
                    )))
                }
            }

            BinOp::Pow => {
                if right != Type::Integer {
                    return Err(CompileError::analysis(format!(
                        "the exponent of '^' must be Integer, found {}",
                        right
                    )));
                }
                if !matches!(left, Type::Integer | Type::Decimal) {
                    return Err(CompileError::analysis(format!(
                        "the base of '^' must be Integer or Decimal, found {}",
                        left
                    )));
                }
                Ok(left)
            }
        }
    }

    // ==================== Helpers ====================

    fn resolve_type(&self, name: &str) -> CompileResult<Type> {
        Type::from_name(name)
            .ok_or_else(|| CompileError::analysis(format!("unknown type '{}'", name)))
    }

    fn define_variable(&mut self, binding: Variable) -> CompileResult<()> {
        self.scope
            .borrow_mut()
            .define_variable(binding.name.clone(), binding)
            .map_err(CompileError::analysis)
    }

    fn require_assignable(&self, target: Type, source: Type) -> CompileResult<()> {
        if target.is_assignable_from(source) {
            Ok(())
        } else {
            Err(CompileError::analysis(format!(
                "{} cannot be assigned to {}",
                source, target
            )))
        }
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn analyze(source: &str) -> CompileResult<Source> {
        let tokens = Lexer::new(source).tokenize().unwrap();
        let mut ast = Parser::new(tokens).parse_source().unwrap();
        Analyzer::new().analyze(&mut ast)?;
        Ok(ast)
    }

    fn analysis_message(source: &str) -> String {
        match analyze(source) {
            Err(CompileError::Analysis { message }) => message,
            other => panic!("expected analysis error, got {:?}", other),
        }
    }

    #[test]
    fn test_simple_program_analyzes() {
        let ast = analyze("FUN main(): Integer DO LET x = 1; RETURN x + 2; END").unwrap();
        let f = &ast.functions[0];
        let Stmt::Return { value } = &f.statements[1] else {
            panic!("expected return");
        };
        assert_eq!(value.ty, Some(Type::Integer));
    }

    #[test]
    fn test_missing_main() {
        let message = analysis_message("FUN helper(): Integer DO RETURN 0; END");
        assert!(message.contains("main"), "{}", message);
    }

    #[test]
    fn test_main_with_parameters_is_not_main() {
        let message = analysis_message("FUN main(x: Integer): Integer DO RETURN x; END");
        assert!(message.contains("main"), "{}", message);
    }

    #[test]
    fn test_main_must_return_integer() {
        let message = analysis_message("FUN main(): String DO RETURN \"0\"; END");
        assert!(message.contains("Integer"), "{}", message);
    }

    #[test]
    fn test_declaration_needs_type_or_initializer() {
        analysis_message("FUN main(): Integer DO LET x; RETURN 0; END");
    }

    #[test]
    fn test_declaration_type_mismatch() {
        let message =
            analysis_message("FUN main(): Integer DO LET x: String = 1; RETURN 0; END");
        assert!(message.contains("cannot be assigned"), "{}", message);
    }

    #[test]
    fn test_global_initializer_checked() {
        analysis_message("VAR x: Boolean = 1;\nFUN main(): Integer DO RETURN 0; END");
    }

    #[test]
    fn test_assignment_to_immutable_global() {
        let message = analysis_message(
            "VAL x: Integer = 1;\nFUN main(): Integer DO x = 2; RETURN 0; END",
        );
        assert!(message.contains("immutable"), "{}", message);
    }

    #[test]
    fn test_if_condition_must_be_boolean() {
        analysis_message("FUN main(): Integer DO IF 1 DO RETURN 0; END RETURN 0; END");
    }

    #[test]
    fn test_if_then_block_must_be_non_empty() {
        analysis_message("FUN main(): Integer DO IF TRUE DO ELSE RETURN 1; END RETURN 0; END");
    }

    #[test]
    fn test_switch_default_must_be_last() {
        let message = analysis_message(
            "FUN main(): Integer DO \
               SWITCH 1 DEFAULT: print(0); CASE 1: print(1); END \
               RETURN 0; \
             END",
        );
        assert!(message.contains("default"), "{}", message);
    }

    #[test]
    fn test_switch_requires_a_default() {
        analysis_message(
            "FUN main(): Integer DO SWITCH 1 CASE 1: print(1); END RETURN 0; END",
        );
    }

    #[test]
    fn test_switch_case_type_must_match_condition() {
        analysis_message(
            "FUN main(): Integer DO \
               SWITCH 1 CASE \"one\": print(1); DEFAULT: print(0); END \
               RETURN 0; \
             END",
        );
    }

    #[test]
    fn test_comparison_requires_identical_types() {
        analysis_message("FUN main(): Integer DO LET b = 1 < 1.0; RETURN 0; END");
    }

    #[test]
    fn test_comparison_operands_must_be_comparable() {
        analysis_message("FUN main(): Integer DO LET b = TRUE < FALSE; RETURN 0; END");
    }

    #[test]
    fn test_mixed_addition_rejected() {
        analysis_message("FUN main(): Integer DO LET x = 1 + 1.0; RETURN 0; END");
    }

    #[test]
    fn test_string_concatenation_types_as_string() {
        let ast = analyze(
            "FUN main(): Integer DO LET s = \"n = \" + 1; RETURN 0; END",
        )
        .unwrap();
        let Stmt::Declaration { value, .. } = &ast.functions[0].statements[0] else {
            panic!("expected declaration");
        };
        assert_eq!(value.as_ref().unwrap().ty, Some(Type::String));
    }

    #[test]
    fn test_pow_exponent_must_be_integer() {
        analysis_message("FUN main(): Integer DO LET x = 2 ^ 2.0; RETURN 0; END");
    }

    #[test]
    fn test_expression_statement_must_be_a_call() {
        analysis_message("FUN main(): Integer DO 1 + 2; RETURN 0; END");
    }

    #[test]
    fn test_call_resolves_by_name_and_arity() {
        analyze(
            "FUN double(x: Integer): Integer DO RETURN x * 2; END\n\
             FUN main(): Integer DO RETURN double(21); END",
        )
        .unwrap();
        analysis_message("FUN main(): Integer DO RETURN double(21); END");
    }

    #[test]
    fn test_argument_type_checked() {
        analysis_message(
            "FUN double(x: Integer): Integer DO RETURN x * 2; END\n\
             FUN main(): Integer DO RETURN double(\"two\"); END",
        );
    }

    #[test]
    fn test_list_elements_checked_against_first() {
        analysis_message(
            "LIST nums: Integer = [1, \"two\", 3];\n\
             FUN main(): Integer DO RETURN 0; END",
        );
    }

    #[test]
    fn test_list_index_must_be_integer() {
        analysis_message(
            "LIST nums: Integer = [1, 2, 3];\n\
             FUN main(): Integer DO RETURN nums[\"0\"]; END",
        );
    }

    #[test]
    fn test_integer_literal_range() {
        analyze("FUN main(): Integer DO RETURN 2147483647; END").unwrap();
        let message = analysis_message("FUN main(): Integer DO RETURN 2147483648; END");
        assert!(message.contains("out of range"), "{}", message);
    }

    #[test]
    fn test_while_scope_is_discarded() {
        let message = analysis_message(
            "FUN main(): Integer DO \
               WHILE FALSE DO LET y = 1; END \
               RETURN y; \
             END",
        );
        assert!(message.contains("unresolved"), "{}", message);
    }

    #[test]
    fn test_shadowing_in_nested_block() {
        analyze(
            "FUN main(): Integer DO \
               LET x = 1; \
               IF TRUE DO LET x = \"shadow\"; x = \"ok\"; ELSE x = 3; END \
               x = 2; \
               RETURN x; \
             END",
        )
        .unwrap();
    }

    #[test]
    fn test_outer_variable_mutable_from_nested_block() {
        analyze(
            "FUN main(): Integer DO \
               LET x = 1; \
               IF TRUE DO x = 2; END \
               RETURN x; \
             END",
        )
        .unwrap();
    }

    #[test]
    fn test_return_value_checked_against_declared_type() {
        analysis_message("FUN main(): Integer DO RETURN \"three\"; END");
    }
}

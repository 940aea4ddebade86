//! Recursive descent parser
//!
//! Binary expressions use iterative precedence climbing: each level loops
//! over its own operators and recurses only into the next-tighter level,
//! which yields conventional left-to-right associativity without any
//! tree re-rotation.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;

use crate::ast::*;
use crate::common::{CompileError, CompileResult, Span};
use crate::lexer::{Token, TokenKind};

/// Precedence levels, loosest first
const LEVELS: [&[BinOp]; 4] = [
    &[BinOp::And, BinOp::Or],
    &[BinOp::Eq, BinOp::Ne, BinOp::Gt, BinOp::Lt],
    &[BinOp::Add, BinOp::Sub],
    &[BinOp::Mul, BinOp::Div, BinOp::Pow],
];

/// Nesting limit for expressions, a resource-exhaustion guard rather than
/// a language rule. Covers both parenthesized nesting and the length of a
/// single operator chain, since later passes recurse once per tree edge
/// either way.
const MAX_EXPR_DEPTH: usize = 256;

/// Parser over the lexer's token sequence
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    /// Parse a complete source file: globals, then functions
    pub fn parse_source(&mut self) -> CompileResult<Source> {
        let mut globals = Vec::new();
        let mut functions = Vec::new();

        while self.peek_any(&["LIST", "VAR", "VAL"]) {
            globals.push(self.parse_global()?);
        }
        while self.peek_text("FUN") {
            functions.push(self.parse_function()?);
        }

        // Anything left over is misplaced, most commonly a global after
        // the first function.
        if self.pos < self.tokens.len() {
            return Err(self.error_here("expected a function definition"));
        }

        Ok(Source { globals, functions })
    }

    // ==================== Globals and functions ====================

    fn parse_global(&mut self) -> CompileResult<Global> {
        if self.match_text("LIST") {
            let name = self.expect_identifier("a list name")?;
            self.expect_text(":")?;
            let type_name = self.expect_identifier("a type name")?;
            self.expect_text("=")?;
            let value = self.parse_list_literal()?;
            self.expect_text(";")?;
            Ok(Global {
                name,
                type_name,
                mutable: true,
                value: Some(value),
                variable: None,
            })
        } else if self.match_text("VAR") {
            let name = self.expect_identifier("a variable name")?;
            self.expect_text(":")?;
            let type_name = self.expect_identifier("a type name")?;
            let value = if self.match_text("=") {
                Some(self.parse_expression()?)
            } else {
                None
            };
            self.expect_text(";")?;
            Ok(Global {
                name,
                type_name,
                mutable: true,
                value,
                variable: None,
            })
        } else {
            self.expect_text("VAL")?;
            let name = self.expect_identifier("a value name")?;
            self.expect_text(":")?;
            let type_name = self.expect_identifier("a type name")?;
            self.expect_text("=")?;
            let value = self.parse_expression()?;
            self.expect_text(";")?;
            Ok(Global {
                name,
                type_name,
                mutable: false,
                value: Some(value),
                variable: None,
            })
        }
    }

    fn parse_list_literal(&mut self) -> CompileResult<Expr> {
        let start = self.expect_text("[")?;
        let mut elements = vec![self.parse_expression()?];
        while self.match_text(",") {
            elements.push(self.parse_expression()?);
        }
        let end = self.expect_text("]")?;
        Ok(Expr::new(ExprKind::List(elements), start.merge(end)))
    }

    fn parse_function(&mut self) -> CompileResult<Function> {
        self.expect_text("FUN")?;
        let name = self.expect_identifier("a function name")?;
        self.expect_text("(")?;

        let mut parameters = Vec::new();
        let mut parameter_type_names = Vec::new();
        while !self.peek_text(")") {
            parameters.push(self.expect_identifier("a parameter name")?);
            self.expect_text(":")?;
            parameter_type_names.push(self.expect_identifier("a type name")?);
            if !self.match_text(",") {
                break;
            }
        }
        self.expect_text(")")?;

        let return_type_name = if self.match_text(":") {
            Some(self.expect_identifier("a return type name")?)
        } else {
            None
        };

        self.expect_text("DO")?;
        let statements = self.parse_block()?;
        self.expect_text("END")?;

        Ok(Function {
            name,
            parameters,
            parameter_type_names,
            return_type_name,
            statements,
            function: None,
        })
    }

    // ==================== Statements ====================

    /// A block runs until `END`, `CASE`, `DEFAULT`, or `ELSE`; the
    /// terminator is left for the caller to consume.
    fn parse_block(&mut self) -> CompileResult<Vec<Stmt>> {
        let mut statements = Vec::new();
        while self.pos < self.tokens.len()
            && !self.peek_any(&["END", "CASE", "DEFAULT", "ELSE"])
        {
            statements.push(self.parse_statement()?);
        }
        Ok(statements)
    }

    fn parse_statement(&mut self) -> CompileResult<Stmt> {
        if self.match_text("LET") {
            self.parse_declaration()
        } else if self.match_text("IF") {
            self.parse_if()
        } else if self.match_text("SWITCH") {
            self.parse_switch()
        } else if self.match_text("WHILE") {
            self.parse_while()
        } else if self.match_text("RETURN") {
            let value = self.parse_expression()?;
            self.expect_text(";")?;
            Ok(Stmt::Return { value })
        } else {
            let expr = self.parse_expression()?;
            if self.match_text("=") {
                let value = self.parse_expression()?;
                self.expect_text(";")?;
                Ok(Stmt::Assignment {
                    receiver: expr,
                    value,
                })
            } else {
                self.expect_text(";")?;
                Ok(Stmt::Expression(expr))
            }
        }
    }

    fn parse_declaration(&mut self) -> CompileResult<Stmt> {
        let name = self.expect_identifier("a variable name")?;
        let type_name = if self.match_text(":") {
            Some(self.expect_identifier("a type name")?)
        } else {
            None
        };
        let value = if self.match_text("=") {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect_text(";")?;
        Ok(Stmt::Declaration {
            name,
            type_name,
            value,
            variable: None,
        })
    }

    fn parse_if(&mut self) -> CompileResult<Stmt> {
        let condition = self.parse_expression()?;
        self.expect_text("DO")?;
        let then_block = self.parse_block()?;
        let else_block = if self.match_text("ELSE") {
            self.parse_block()?
        } else {
            Vec::new()
        };
        self.expect_text("END")?;
        Ok(Stmt::If {
            condition,
            then_block,
            else_block,
        })
    }

    /// Case ordering and default uniqueness are grammar-shaped but
    /// enforced by the analyzer, so any mix parses here.
    fn parse_switch(&mut self) -> CompileResult<Stmt> {
        let condition = self.parse_expression()?;
        let mut cases = Vec::new();
        loop {
            if self.match_text("CASE") {
                let value = self.parse_expression()?;
                self.expect_text(":")?;
                let body = self.parse_block()?;
                cases.push(Case {
                    value: Some(value),
                    body,
                });
            } else if self.match_text("DEFAULT") {
                self.expect_text(":")?;
                let body = self.parse_block()?;
                cases.push(Case { value: None, body });
            } else {
                break;
            }
        }
        self.expect_text("END")?;
        Ok(Stmt::Switch { condition, cases })
    }

    fn parse_while(&mut self) -> CompileResult<Stmt> {
        let condition = self.parse_expression()?;
        self.expect_text("DO")?;
        let body = self.parse_block()?;
        self.expect_text("END")?;
        Ok(Stmt::While { condition, body })
    }

    // ==================== Expressions ====================

    pub fn parse_expression(&mut self) -> CompileResult<Expr> {
        self.depth += 1;
        if self.depth > MAX_EXPR_DEPTH {
            self.depth -= 1;
            return Err(self.error_here("expression nesting too deep"));
        }
        let result = self.parse_binary(0);
        self.depth -= 1;
        result
    }

    fn parse_binary(&mut self, level: usize) -> CompileResult<Expr> {
        let Some(operators) = LEVELS.get(level) else {
            return self.parse_primary();
        };

        let mut left = self.parse_binary(level + 1)?;
        let mut links = 0;
        while let Some(op) = self.peek_operator_in(operators) {
            // The loop deepens the left spine one edge per operator, so
            // chain length counts against the same nesting budget.
            links += 1;
            if self.depth + links > MAX_EXPR_DEPTH {
                return Err(self.error_here("expression nesting too deep"));
            }
            self.advance();
            let right = self.parse_binary(level + 1)?;
            let span = left.span.merge(right.span);
            left = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }
        Ok(left)
    }

    fn parse_primary(&mut self) -> CompileResult<Expr> {
        let Some(token) = self.tokens.get(self.pos).cloned() else {
            return Err(self.error_here("expected an expression"));
        };
        let span = token_span(&token);

        match token.kind {
            TokenKind::Identifier => match token.text.as_str() {
                "NIL" => {
                    self.advance();
                    Ok(Expr::new(ExprKind::Literal(Literal::Nil), span))
                }
                "TRUE" => {
                    self.advance();
                    Ok(Expr::new(ExprKind::Literal(Literal::Boolean(true)), span))
                }
                "FALSE" => {
                    self.advance();
                    Ok(Expr::new(ExprKind::Literal(Literal::Boolean(false)), span))
                }
                _ => self.parse_access_or_call(),
            },
            TokenKind::Integer => {
                let value = BigInt::from_str(&token.text)
                    .map_err(|_| CompileError::parser("invalid integer literal", span))?;
                self.advance();
                Ok(Expr::new(ExprKind::Literal(Literal::Integer(value)), span))
            }
            TokenKind::Decimal => {
                let value = BigDecimal::from_str(&token.text)
                    .map_err(|_| CompileError::parser("invalid decimal literal", span))?;
                self.advance();
                Ok(Expr::new(ExprKind::Literal(Literal::Decimal(value)), span))
            }
            TokenKind::Character => {
                let inner = unescape(&token.text[1..token.text.len() - 1]);
                let c = inner
                    .chars()
                    .next()
                    .ok_or_else(|| CompileError::parser("invalid character literal", span))?;
                self.advance();
                Ok(Expr::new(ExprKind::Literal(Literal::Character(c)), span))
            }
            TokenKind::String => {
                let inner = unescape(&token.text[1..token.text.len() - 1]);
                self.advance();
                Ok(Expr::new(ExprKind::Literal(Literal::String(inner)), span))
            }
            TokenKind::Operator if token.text == "(" => {
                self.advance();
                let inner = self.parse_expression()?;
                let close = self.expect_text(")")?;
                if matches!(inner.kind, ExprKind::Binary { .. }) {
                    Ok(Expr::new(ExprKind::Group(Box::new(inner)), span.merge(close)))
                } else {
                    // A parenthesized non-binary expression is just the
                    // inner expression; Group only ever wraps a Binary.
                    Ok(inner)
                }
            }
            _ => Err(self.error_here("expected an expression")),
        }
    }

    fn parse_access_or_call(&mut self) -> CompileResult<Expr> {
        let token = self.tokens[self.pos].clone();
        let name = token.text;
        let span = Span::new(token.offset, token.offset + name.chars().count());
        self.advance();

        if self.match_text("(") {
            let mut args = Vec::new();
            if !self.peek_text(")") {
                args.push(self.parse_expression()?);
                while self.match_text(",") {
                    args.push(self.parse_expression()?);
                }
            }
            let close = self.expect_text(")")?;
            Ok(Expr::new(
                ExprKind::Call {
                    name,
                    args,
                    function: None,
                },
                span.merge(close),
            ))
        } else if self.match_text("[") {
            let offset = self.parse_expression()?;
            let close = self.expect_text("]")?;
            Ok(Expr::new(
                ExprKind::Access {
                    offset: Some(Box::new(offset)),
                    name,
                    variable: None,
                },
                span.merge(close),
            ))
        } else {
            Ok(Expr::new(
                ExprKind::Access {
                    offset: None,
                    name,
                    variable: None,
                },
                span,
            ))
        }
    }

    // ==================== Token helpers ====================

    fn peek_text(&self, text: &str) -> bool {
        self.tokens.get(self.pos).is_some_and(|t| t.text == text)
    }

    fn peek_any(&self, texts: &[&str]) -> bool {
        texts.iter().any(|t| self.peek_text(t))
    }

    fn peek_operator_in(&self, operators: &[BinOp]) -> Option<BinOp> {
        let token = self.tokens.get(self.pos)?;
        if token.kind != TokenKind::Operator {
            return None;
        }
        let op = BinOp::from_symbol(&token.text)?;
        operators.contains(&op).then_some(op)
    }

    fn match_text(&mut self, text: &str) -> bool {
        if self.peek_text(text) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_text(&mut self, text: &str) -> CompileResult<Span> {
        if let Some(token) = self.tokens.get(self.pos) {
            if token.text == text {
                let span = token_span(token);
                self.advance();
                return Ok(span);
            }
        }
        Err(self.error_here(&format!("expected '{}'", text)))
    }

    fn expect_identifier(&mut self, what: &str) -> CompileResult<String> {
        if let Some(token) = self.tokens.get(self.pos) {
            if token.kind == TokenKind::Identifier {
                let name = token.text.clone();
                self.advance();
                return Ok(name);
            }
        }
        Err(self.error_here(&format!("expected {}", what)))
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    /// Error pinned to the current token, or to end-of-input plus the
    /// length of the last consumed token when the input is exhausted.
    fn error_here(&self, message: &str) -> CompileError {
        let span = match self.tokens.get(self.pos) {
            Some(token) => token_span(token),
            None => match self.tokens.last() {
                Some(last) => Span::at(last.offset + last.text.chars().count()),
                None => Span::at(0),
            },
        };
        CompileError::parser(message, span)
    }
}

fn token_span(token: &Token) -> Span {
    Span::new(token.offset, token.offset + token.text.chars().count())
}

/// Expand escape sequences using the same table as the lexer; `\\`
/// becomes a single backslash.
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('b') => out.push('\u{0008}'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            // The lexer rejects anything else before we get here.
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> Source {
        let tokens = Lexer::new(source).tokenize().unwrap();
        Parser::new(tokens).parse_source().unwrap()
    }

    fn parse_expr(source: &str) -> Expr {
        let tokens = Lexer::new(source).tokenize().unwrap();
        let mut parser = Parser::new(tokens);
        let expr = parser.parse_expression().unwrap();
        assert_eq!(parser.pos, parser.tokens.len(), "trailing tokens");
        expr
    }

    fn parse_err(source: &str) -> CompileError {
        let tokens = Lexer::new(source).tokenize().unwrap();
        Parser::new(tokens).parse_source().unwrap_err()
    }

    #[test]
    fn test_parse_function() {
        let source = parse("FUN main(): Integer DO LET x = 1; RETURN x + 2; END");
        assert_eq!(source.functions.len(), 1);
        let f = &source.functions[0];
        assert_eq!(f.name, "main");
        assert!(f.parameters.is_empty());
        assert_eq!(f.return_type_name.as_deref(), Some("Integer"));
        assert_eq!(f.statements.len(), 2);
        assert!(matches!(f.statements[0], Stmt::Declaration { .. }));
        assert!(matches!(f.statements[1], Stmt::Return { .. }));
    }

    #[test]
    fn test_parse_parameters() {
        let source = parse("FUN area(w: Integer, h: Integer) DO RETURN w * h; END");
        let f = &source.functions[0];
        assert_eq!(f.parameters, ["w", "h"]);
        assert_eq!(f.parameter_type_names, ["Integer", "Integer"]);
        assert_eq!(f.return_type_name, None);
    }

    #[test]
    fn test_parse_globals() {
        let source = parse(
            "LIST nums: Integer = [1, 2, 3];\n\
             VAR count: Integer = 0;\n\
             VAL greeting: String = \"hi\";\n\
             FUN main(): Integer DO RETURN 0; END",
        );
        assert_eq!(source.globals.len(), 3);
        assert!(source.globals[0].mutable);
        assert!(matches!(
            source.globals[0].value.as_ref().unwrap().kind,
            ExprKind::List(ref elements) if elements.len() == 3
        ));
        assert!(source.globals[1].mutable);
        assert!(!source.globals[2].mutable);
    }

    #[test]
    fn test_global_after_function_is_an_error() {
        let err = parse_err("FUN main(): Integer DO RETURN 0; END VAR x: Integer = 1;");
        assert!(matches!(err, CompileError::Parser { .. }));
    }

    #[test]
    fn test_var_without_initializer() {
        let source = parse("VAR x: Integer;\nFUN main(): Integer DO RETURN 0; END");
        assert!(source.globals[0].value.is_none());
    }

    #[test]
    fn test_precedence() {
        let expr = parse_expr("1 + 2 * 3");
        let ExprKind::Binary { op, right, .. } = expr.kind else {
            panic!("expected binary");
        };
        assert_eq!(op, BinOp::Add);
        assert!(matches!(
            right.kind,
            ExprKind::Binary { op: BinOp::Mul, .. }
        ));
    }

    #[test]
    fn test_equal_precedence_is_left_associative() {
        // (1 - 2) - 3, not 1 - (2 - 3)
        let expr = parse_expr("1 - 2 - 3");
        let ExprKind::Binary { op, left, right } = expr.kind else {
            panic!("expected binary");
        };
        assert_eq!(op, BinOp::Sub);
        assert!(matches!(left.kind, ExprKind::Binary { op: BinOp::Sub, .. }));
        assert!(matches!(right.kind, ExprKind::Literal(Literal::Integer(_))));
    }

    #[test]
    fn test_logical_operators_share_a_level() {
        let expr = parse_expr("a && b || c");
        let ExprKind::Binary { op, left, .. } = expr.kind else {
            panic!("expected binary");
        };
        assert_eq!(op, BinOp::Or);
        assert!(matches!(left.kind, ExprKind::Binary { op: BinOp::And, .. }));
    }

    #[test]
    fn test_mixed_precedence_chain() {
        // 1 + (2 * 3) + 4, with the additions left-associated
        let expr = parse_expr("1 + 2 * 3 + 4");
        let ExprKind::Binary { op, left, .. } = expr.kind else {
            panic!("expected binary");
        };
        assert_eq!(op, BinOp::Add);
        let ExprKind::Binary { op, right, .. } = left.kind else {
            panic!("expected binary");
        };
        assert_eq!(op, BinOp::Add);
        assert!(matches!(
            right.kind,
            ExprKind::Binary { op: BinOp::Mul, .. }
        ));
    }

    #[test]
    fn test_overlong_operator_chain_is_rejected() {
        let long = format!("1{}", " + 1".repeat(300));
        let tokens = Lexer::new(&long).tokenize().unwrap();
        let err = Parser::new(tokens).parse_expression().unwrap_err();
        assert!(matches!(err, CompileError::Parser { .. }), "{:?}", err);

        let fine = format!("1{}", " + 1".repeat(100));
        let tokens = Lexer::new(&fine).tokenize().unwrap();
        assert!(Parser::new(tokens).parse_expression().is_ok());
    }

    #[test]
    fn test_deeply_nested_parentheses_are_rejected() {
        let source = format!("{}1 + 2{}", "(".repeat(300), ")".repeat(300));
        let tokens = Lexer::new(&source).tokenize().unwrap();
        let err = Parser::new(tokens).parse_expression().unwrap_err();
        assert!(matches!(err, CompileError::Parser { .. }), "{:?}", err);
    }

    #[test]
    fn test_group_wraps_only_binary() {
        let grouped = parse_expr("(1 + 2)");
        assert!(matches!(grouped.kind, ExprKind::Group(_)));

        let plain = parse_expr("(x)");
        assert!(matches!(plain.kind, ExprKind::Access { .. }));
    }

    #[test]
    fn test_literals() {
        assert_eq!(
            parse_expr("NIL").kind.literal(),
            Some(&Literal::Nil)
        );
        assert_eq!(
            parse_expr("TRUE").kind.literal(),
            Some(&Literal::Boolean(true))
        );
        assert_eq!(
            parse_expr("'\\n'").kind.literal(),
            Some(&Literal::Character('\n'))
        );
        assert_eq!(
            parse_expr("\"a\\\\b\"").kind.literal(),
            Some(&Literal::String("a\\b".to_string()))
        );
    }

    #[test]
    fn test_call_and_indexed_access() {
        let call = parse_expr("f(1, x)");
        assert!(matches!(
            call.kind,
            ExprKind::Call { ref name, ref args, .. } if name == "f" && args.len() == 2
        ));

        let access = parse_expr("nums[i + 1]");
        assert!(matches!(
            access.kind,
            ExprKind::Access { offset: Some(_), ref name, .. } if name == "nums"
        ));
    }

    #[test]
    fn test_switch_statement() {
        let source = parse(
            "FUN main(): Integer DO \
               SWITCH x CASE 1: print(1); DEFAULT: print(0); END \
               RETURN 0; \
             END",
        );
        let Stmt::Switch { ref cases, .. } = source.functions[0].statements[0] else {
            panic!("expected switch");
        };
        assert_eq!(cases.len(), 2);
        assert!(cases[0].value.is_some());
        assert!(cases[1].value.is_none());
    }

    #[test]
    fn test_missing_semicolon_error_offset() {
        let err = parse_err("FUN main(): Integer DO RETURN 0 END");
        let CompileError::Parser { span, .. } = err else {
            panic!("expected parser error");
        };
        // pinned to END, where ';' was required
        assert_eq!(span.start, 32);
    }

    #[test]
    fn test_end_of_input_error_offset() {
        let err = parse_err("FUN main(): Integer DO RETURN 0;");
        let CompileError::Parser { span, .. } = err else {
            panic!("expected parser error");
        };
        assert_eq!(span.start, 32);
    }
}

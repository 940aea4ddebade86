//! Java source emission
//!
//! Renders an analyzed source file as a single `Main` class. Globals
//! become fields, functions become methods, and a static `main` wrapper
//! exits with the result of invoking the program's own `main`. Relies on
//! the analyzer's type and binding annotations, so the input must have
//! been analyzed first.

use crate::ast::*;

const INDENT: &str = "    ";

/// Java code generator
pub struct Generator {
    out: String,
    indent: usize,
}

impl Generator {
    /// Render `source` as the text of a Java `Main` class
    pub fn generate(source: &Source) -> String {
        let mut generator = Self {
            out: String::new(),
            indent: 0,
        };
        generator.gen_source(source);
        generator.out
    }

    fn gen_source(&mut self, source: &Source) {
        self.line("public class Main {");
        self.blank();

        if !source.globals.is_empty() {
            self.indent = 1;
            for global in &source.globals {
                self.gen_global(global);
            }
            self.blank();
        }

        self.indent = 1;
        self.line("public static void main(String[] args) {");
        self.indent = 2;
        self.line("System.exit(new Main().main());");
        self.indent = 1;
        self.line("}");
        self.blank();

        for function in &source.functions {
            self.gen_function(function);
            self.blank();
        }

        self.indent = 0;
        self.line("}");
    }

    fn gen_global(&mut self, global: &Global) {
        let mut decl = String::new();
        if !global.mutable {
            decl.push_str("final ");
        }
        decl.push_str(self.jvm_type(&global.type_name));
        // List globals become array fields with a brace initializer.
        if matches!(&global.value, Some(expr) if matches!(expr.kind, ExprKind::List(_))) {
            decl.push_str("[]");
        }
        decl.push(' ');
        decl.push_str(&global.name);
        if let Some(value) = &global.value {
            decl.push_str(" = ");
            decl.push_str(&self.expr_text(value));
        }
        decl.push(';');
        self.line(&decl);
    }

    fn gen_function(&mut self, function: &Function) {
        let return_type = match &function.return_type_name {
            Some(name) => self.jvm_type(name),
            None => Type::Nil.jvm_name(),
        };
        let parameters = function
            .parameters
            .iter()
            .zip(&function.parameter_type_names)
            .map(|(name, type_name)| format!("{} {}", self.jvm_type(type_name), name))
            .collect::<Vec<_>>()
            .join(", ");

        self.indent = 1;
        self.line(&format!("{} {}({}) {{", return_type, function.name, parameters));
        self.indent = 2;
        for stmt in &function.statements {
            self.gen_stmt(stmt);
        }
        self.indent = 1;
        self.line("}");
    }

    fn gen_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expression(expr) => {
                let text = self.expr_text(expr);
                self.line(&format!("{};", text));
            }

            Stmt::Declaration {
                name,
                type_name,
                value,
                ..
            } => {
                let ty = match type_name {
                    Some(type_name) => self.jvm_type(type_name),
                    // Inferred declarations use the initializer's
                    // annotated type.
                    None => value
                        .as_ref()
                        .and_then(|expr| expr.ty)
                        .map(Type::jvm_name)
                        .unwrap_or("Object"),
                };
                let mut decl = format!("{} {}", ty, name);
                if let Some(value) = value {
                    decl.push_str(" = ");
                    decl.push_str(&self.expr_text(value));
                }
                decl.push(';');
                self.line(&decl);
            }

            Stmt::Assignment { receiver, value } => {
                let text = format!("{} = {};", self.expr_text(receiver), self.expr_text(value));
                self.line(&text);
            }

            Stmt::If {
                condition,
                then_block,
                else_block,
            } => {
                let header = format!("if ({}) {{", self.expr_text(condition));
                self.line(&header);
                self.gen_nested(then_block);
                if !else_block.is_empty() {
                    self.line("} else {");
                    self.gen_nested(else_block);
                }
                self.line("}");
            }

            Stmt::Switch { condition, cases } => {
                let header = format!("switch ({}) {{", self.expr_text(condition));
                self.line(&header);
                self.indent += 1;
                for case in cases {
                    match &case.value {
                        Some(value) => {
                            let label = format!("case {}:", self.expr_text(value));
                            self.line(&label);
                        }
                        None => self.line("default:"),
                    }
                    self.gen_nested(&case.body);
                    if case.value.is_some() {
                        self.indent += 1;
                        self.line("break;");
                        self.indent -= 1;
                    }
                }
                self.indent -= 1;
                self.line("}");
            }

            Stmt::While { condition, body } => {
                let header = format!("while ({}) {{", self.expr_text(condition));
                self.line(&header);
                self.gen_nested(body);
                self.line("}");
            }

            Stmt::Return { value } => {
                let text = format!("return {};", self.expr_text(value));
                self.line(&text);
            }
        }
    }

    fn gen_nested(&mut self, block: &[Stmt]) {
        self.indent += 1;
        for stmt in block {
            self.gen_stmt(stmt);
        }
        self.indent -= 1;
    }

    fn expr_text(&self, expr: &Expr) -> String {
        match &expr.kind {
            ExprKind::Literal(literal) => match literal {
                Literal::Nil => "null".to_string(),
                Literal::Boolean(value) => value.to_string(),
                Literal::Integer(value) => value.to_string(),
                Literal::Decimal(value) => value.to_string(),
                Literal::Character(value) => format!("'{}'", escape_char(*value)),
                Literal::String(value) => {
                    let escaped: String = value.chars().map(escape_char).collect();
                    format!("\"{}\"", escaped)
                }
            },

            ExprKind::Group(inner) => format!("({})", self.expr_text(inner)),

            ExprKind::Binary { op, left, right } => {
                let left = self.expr_text(left);
                let right = self.expr_text(right);
                match op {
                    BinOp::Pow => format!("Math.pow({}, {})", left, right),
                    op => format!("{} {} {}", left, op.symbol(), right),
                }
            }

            ExprKind::Access { offset, name, .. } => match offset {
                Some(offset) => format!("{}[{}]", name, self.expr_text(offset)),
                None => name.clone(),
            },

            ExprKind::Call {
                name,
                args,
                function,
            } => {
                let name = function
                    .as_ref()
                    .map(|sig| sig.display_name.as_str())
                    .unwrap_or(name);
                let args = args
                    .iter()
                    .map(|arg| self.expr_text(arg))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{}({})", name, args)
            }

            ExprKind::List(elements) => {
                let elements = elements
                    .iter()
                    .map(|element| self.expr_text(element))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{{{}}}", elements)
            }
        }
    }

    fn jvm_type(&self, name: &str) -> &'static str {
        Type::from_name(name).map(Type::jvm_name).unwrap_or("Object")
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn blank(&mut self) {
        self.out.push('\n');
    }
}

/// Re-escape a character for Java source text
fn escape_char(ch: char) -> String {
    match ch {
        '\\' => "\\\\".to_string(),
        '\'' => "\\'".to_string(),
        '"' => "\\\"".to_string(),
        '\n' => "\\n".to_string(),
        '\r' => "\\r".to_string(),
        '\t' => "\\t".to_string(),
        '\u{0008}' => "\\b".to_string(),
        ch => ch.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;
    use crate::sema::Analyzer;

    fn generate(source: &str) -> String {
        let tokens = Lexer::new(source).tokenize().unwrap();
        let mut ast = Parser::new(tokens).parse_source().unwrap();
        Analyzer::new().analyze(&mut ast).unwrap();
        Generator::generate(&ast)
    }

    #[test]
    fn test_hello_world() {
        let java = generate(
            "FUN main(): Integer DO print(\"Hello, World!\"); RETURN 0; END",
        );
        let expected = r#"public class Main {

    public static void main(String[] args) {
        System.exit(new Main().main());
    }

    int main() {
        System.out.println("Hello, World!");
        return 0;
    }

}
"#;
        assert_eq!(java, expected);
    }

    #[test]
    fn test_globals_become_fields() {
        let java = generate(
            "VAR x: Integer = 1;\n\
             VAL y: Decimal = 2.0;\n\
             LIST nums: Integer = [1, 2, 3];\n\
             FUN main(): Integer DO RETURN x; END",
        );
        assert!(java.contains("    int x = 1;\n"), "{}", java);
        assert!(java.contains("    final double y = 2.0;\n"), "{}", java);
        assert!(java.contains("    int[] nums = {1, 2, 3};\n"), "{}", java);
    }

    #[test]
    fn test_inferred_declaration_uses_annotated_type() {
        let java = generate(
            "FUN main(): Integer DO LET s = \"text\"; RETURN 0; END",
        );
        assert!(java.contains("        String s = \"text\";\n"), "{}", java);
    }

    #[test]
    fn test_if_else() {
        let java = generate(
            "FUN main(): Integer DO \
               IF TRUE DO RETURN 1; ELSE RETURN 2; END \
             END",
        );
        assert!(java.contains("        if (true) {\n"), "{}", java);
        assert!(java.contains("            return 1;\n"), "{}", java);
        assert!(java.contains("        } else {\n"), "{}", java);
        assert!(java.contains("            return 2;\n"), "{}", java);
    }

    #[test]
    fn test_switch_breaks_after_each_case() {
        let java = generate(
            "FUN main(): Integer DO \
               SWITCH 1 \
                 CASE 1: print(\"one\"); \
                 DEFAULT: print(\"many\"); \
               END \
               RETURN 0; \
             END",
        );
        assert!(java.contains("        switch (1) {\n"), "{}", java);
        assert!(java.contains("            case 1:\n"), "{}", java);
        assert!(
            java.contains("                System.out.println(\"one\");\n"),
            "{}",
            java
        );
        assert!(java.contains("                break;\n"), "{}", java);
        assert!(java.contains("            default:\n"), "{}", java);
    }

    #[test]
    fn test_pow_lowers_to_math_pow() {
        let java = generate("FUN main(): Integer DO RETURN 2 ^ 10; END");
        assert!(java.contains("return Math.pow(2, 10);"), "{}", java);
    }

    #[test]
    fn test_group_and_binary() {
        let java = generate("FUN main(): Integer DO RETURN (1 + 2) * 3; END");
        assert!(java.contains("return (1 + 2) * 3;"), "{}", java);
    }

    #[test]
    fn test_string_escapes_round_trip() {
        let java = generate(
            "FUN main(): Integer DO print(\"line\\none\"); RETURN 0; END",
        );
        assert!(
            java.contains("System.out.println(\"line\\none\");"),
            "{}",
            java
        );
    }

    #[test]
    fn test_indexed_access_and_assignment() {
        let java = generate(
            "LIST nums: Integer = [1, 2, 3];\n\
             FUN main(): Integer DO nums[0] = 9; RETURN nums[1 + 1]; END",
        );
        assert!(java.contains("        nums[0] = 9;\n"), "{}", java);
        assert!(java.contains("        return nums[1 + 1];\n"), "{}", java);
    }

    #[test]
    fn test_parameters_and_while() {
        let java = generate(
            "FUN sum(n: Integer): Integer DO \
               LET total = 0; \
               WHILE n > 0 DO total = total + n; n = n - 1; END \
               RETURN total; \
             END\n\
             FUN main(): Integer DO RETURN sum(3); END",
        );
        assert!(java.contains("    int sum(int n) {\n"), "{}", java);
        assert!(java.contains("        while (n > 0) {\n"), "{}", java);
        assert!(java.contains("        return sum(3);\n"), "{}", java);
    }
}

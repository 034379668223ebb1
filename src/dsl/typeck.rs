use std::collections::HashMap;

use super::ast::*;
use super::builtins::Builtin;
use super::error::CompileError;

/// Statically check a parsed program.
///
/// Pass 1 registers every label. Pass 2 types every other statement inside
/// its own error boundary, so the result lists every defective statement,
/// not only the first one.
pub fn analyze(program: &Program) -> Vec<CompileError> {
    let mut ctx = TypeContext::new();
    ctx.check(program);
    ctx.errors
}

/// Names known to the analyzer. Variables keep the type of their first assignment.
#[derive(Debug, Default)]
struct SymbolTable {
    variables: HashMap<String, TypeName>,
    labels: HashMap<String, Span>,
}

struct TypeContext {
    symbols: SymbolTable,
    errors: Vec<CompileError>,
}

impl TypeContext {
    fn new() -> Self {
        Self {
            symbols: SymbolTable::default(),
            errors: Vec::new(),
        }
    }

    fn check(&mut self, program: &Program) {
        for stmt in &program.statements {
            if let StmtKind::Label(name) = &stmt.kind {
                if self.symbols.labels.contains_key(name) {
                    self.errors.push(CompileError::semantic(
                        format!("Duplicate label definition: '{name}'."),
                        stmt.span,
                    ));
                } else {
                    self.symbols.labels.insert(name.clone(), stmt.span);
                }
            }
        }

        for stmt in &program.statements {
            if matches!(stmt.kind, StmtKind::Label(_)) {
                continue;
            }
            if let Err(e) = self.check_stmt(stmt) {
                self.errors.push(e);
            }
        }
    }

    fn check_stmt(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        match &stmt.kind {
            StmtKind::Assign { name, value } => {
                let ty = self.check_expr(value)?;
                if ty == TypeName::Void {
                    return Err(CompileError::semantic(
                        "Cannot assign a void value to a variable.",
                        stmt.span,
                    ));
                }
                match self.symbols.variables.get(name) {
                    Some(&existing) if existing != ty => Err(CompileError::semantic(
                        format!(
                            "Cannot assign a value of type {ty} to variable '{name}' which is of type {existing}."
                        ),
                        stmt.span,
                    )),
                    Some(_) => Ok(()),
                    None => {
                        self.symbols.variables.insert(name.clone(), ty);
                        Ok(())
                    }
                }
            }
            StmtKind::Label(_) => Ok(()),
            StmtKind::GoTo { label, condition } => {
                if !self.symbols.labels.contains_key(label) {
                    return Err(CompileError::semantic(
                        format!("Undefined label: '{label}'."),
                        stmt.span,
                    ));
                }
                let ty = self.check_expr(condition)?;
                if ty != TypeName::Boolean {
                    return Err(CompileError::semantic(
                        format!("GoTo condition must evaluate to a Boolean, but got {ty}."),
                        condition.span,
                    ));
                }
                Ok(())
            }
            StmtKind::Command { builtin, args } => {
                self.check_args(*builtin, args, stmt.span)?;
                Ok(())
            }
        }
    }

    fn check_expr(&mut self, expr: &Expr) -> Result<TypeName, CompileError> {
        match &expr.kind {
            ExprKind::NumberLit(_) => Ok(TypeName::Number),
            ExprKind::StringLit(_) => Ok(TypeName::String),
            ExprKind::BoolLit(_) => Ok(TypeName::Boolean),
            ExprKind::Variable(name) => self.symbols.variables.get(name).copied().ok_or_else(|| {
                CompileError::semantic(
                    format!("Variable '{name}' is not defined in the current scope."),
                    expr.span,
                )
            }),
            ExprKind::UnaryOp { op, operand } => {
                let ty = self.check_expr(operand)?;
                match op {
                    UnaryOp::Neg if ty != TypeName::Number => Err(CompileError::semantic(
                        format!("Unary '-' operator can only be applied to numbers, not {ty}."),
                        expr.span,
                    )),
                    UnaryOp::Not if ty != TypeName::Boolean => Err(CompileError::semantic(
                        format!("'!' operator can only be applied to booleans, not {ty}."),
                        expr.span,
                    )),
                    UnaryOp::Neg => Ok(TypeName::Number),
                    UnaryOp::Not => Ok(TypeName::Boolean),
                }
            }
            ExprKind::BinOp { op, left, right } => {
                let lt = self.check_expr(left)?;
                let rt = self.check_expr(right)?;
                let symbol = op.symbol();
                match op {
                    BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod | BinOp::Pow => {
                        if lt != TypeName::Number || rt != TypeName::Number {
                            return Err(CompileError::semantic(
                                format!("Operator '{symbol}' can only be used with numbers, got {lt} and {rt}."),
                                expr.span,
                            ));
                        }
                        Ok(TypeName::Number)
                    }
                    BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge => {
                        if lt != TypeName::Number || rt != TypeName::Number {
                            return Err(CompileError::semantic(
                                format!("Operator '{symbol}' can only compare numbers, got {lt} and {rt}."),
                                expr.span,
                            ));
                        }
                        Ok(TypeName::Boolean)
                    }
                    BinOp::Eq | BinOp::Ne => {
                        if lt != rt {
                            return Err(CompileError::semantic(
                                format!("Cannot compare values of different types: {lt} and {rt}."),
                                expr.span,
                            ));
                        }
                        Ok(TypeName::Boolean)
                    }
                    BinOp::And | BinOp::Or => {
                        if lt != TypeName::Boolean || rt != TypeName::Boolean {
                            return Err(CompileError::semantic(
                                format!("Operator '{symbol}' can only be used with booleans, got {lt} and {rt}."),
                                expr.span,
                            ));
                        }
                        Ok(TypeName::Boolean)
                    }
                }
            }
            ExprKind::Call { builtin, args } => self.check_args(*builtin, args, expr.span),
        }
    }

    /// Check a command or query call against its registry signature and
    /// return its declared result type.
    fn check_args(&mut self, builtin: Builtin, args: &[Expr], span: Span) -> Result<TypeName, CompileError> {
        let def = builtin.def();
        if args.len() != def.arity() {
            return Err(CompileError::semantic(
                format!("'{}' expects {} arguments, but got {}.", def.name, def.arity(), args.len()),
                span,
            ));
        }
        // Every argument is checked so one call reports all of its mismatches.
        let mut errors = Vec::new();
        for (i, (arg, (param, expected))) in args.iter().zip(def.params).enumerate() {
            match self.check_expr(arg) {
                Ok(actual) if actual != *expected => errors.push(CompileError::semantic(
                    format!(
                        "Argument {} ('{param}') for '{}' should be of type {expected}, but got {actual}.",
                        i + 1,
                        def.name,
                    ),
                    arg.span,
                )),
                Ok(_) => {}
                Err(e) => errors.push(e),
            }
        }
        match errors.pop() {
            None => Ok(def.ret),
            Some(last) => {
                self.errors.extend(errors);
                Err(last)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::dsl::lexer::lex;
    use crate::dsl::parser::parse;

    fn program(src: &str) -> Program {
        let (tokens, lex_errors) = lex(src);
        assert!(lex_errors.is_empty(), "{lex_errors:?}");
        let (program, parse_errors) = parse(tokens);
        assert!(parse_errors.is_empty(), "{parse_errors:?}");
        program
    }

    fn check(src: &str) {
        let errors = analyze(&program(src));
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
    }

    fn check_err(src: &str) -> Vec<CompileError> {
        let errors = analyze(&program(src));
        assert!(!errors.is_empty(), "expected semantic errors for {src:?}");
        errors
    }

    #[test]
    fn valid_program() {
        check(
            "Spawn(0, 0)\nColor(\"red\")\nn <- 5\nloop\nDrawLine(1, 0, 1)\nn <- n - 1\nGoTo [loop] (n > 0)",
        );
    }

    #[test]
    fn forward_goto_is_allowed() {
        check("Spawn(0, 0)\nGoTo [end] (1 == 1)\nFill()\nend");
    }

    #[test]
    fn duplicate_labels_reported_once_per_duplicate() {
        let errors = check_err("Spawn(0, 0)\na\na\nb\na");
        let dups: Vec<_> = errors.iter().filter(|e| e.message.contains("Duplicate label")).collect();
        assert_eq!(dups.len(), 2);
        assert_eq!(dups[0].span.line, 3);
    }

    #[test]
    fn undefined_label() {
        let errors = check_err("Spawn(0, 0)\nGoTo [nowhere] (1 < 2)");
        assert!(errors[0].message.contains("Undefined label: 'nowhere'"));
    }

    #[test]
    fn goto_condition_must_be_boolean() {
        let errors = check_err("Spawn(0, 0)\nl\nGoTo [l] (1 + 1)");
        assert!(errors[0].message.contains("must evaluate to a Boolean, but got Number"));
    }

    #[test]
    fn undefined_variable() {
        let errors = check_err("Spawn(0, 0)\nx <- y + 1");
        assert!(errors[0].message.contains("Variable 'y' is not defined"));
    }

    #[test]
    fn variable_type_is_fixed_at_first_assignment() {
        let errors = check_err("Spawn(0, 0)\nx <- 1\nx <- \"red\"");
        assert!(errors[0].message.contains("Cannot assign a value of type String to variable 'x' which is of type Number"));
    }

    #[test]
    fn variables_may_hold_strings_and_booleans() {
        check("Spawn(0, 0)\nc <- \"blue\"\nColor(c)\nb <- IsBrushColor(c)\nl\nGoTo [l] (!b)");
    }

    #[test]
    fn arithmetic_requires_numbers() {
        let errors = check_err("Spawn(0, 0)\nx <- \"a\" + 1");
        assert!(errors[0].message.contains("Operator '+' can only be used with numbers"));
    }

    #[test]
    fn relational_requires_numbers() {
        let errors = check_err("Spawn(0, 0)\nx <- \"a\" < \"b\"");
        assert!(errors[0].message.contains("can only compare numbers"));
    }

    #[test]
    fn equality_requires_same_types() {
        check("Spawn(0, 0)\nx <- \"a\" == \"b\"\ny <- (1 < 2) != (2 < 1)");
        let errors = check_err("Spawn(0, 0)\nx <- 1 == \"1\"");
        assert!(errors[0].message.contains("different types: Number and String"));
    }

    #[test]
    fn logical_requires_booleans() {
        let errors = check_err("Spawn(0, 0)\nx <- 1 && 2");
        assert!(errors[0].message.contains("Operator '&&' can only be used with booleans"));
    }

    #[test]
    fn unary_operand_types() {
        let errors = check_err("Spawn(0, 0)\nx <- !5");
        assert!(errors[0].message.contains("'!' operator can only be applied to booleans"));
        let errors = check_err("Spawn(0, 0)\nx <- -(1 < 2)");
        assert!(errors[0].message.contains("Unary '-' operator"));
    }

    #[test]
    fn argument_types_are_checked() {
        let errors = check_err("Spawn(0, 0)\nColor(5)");
        assert!(errors[0].message.contains("Argument 1 ('name') for 'Color' should be of type String, but got Number"));
        let errors = check_err("Spawn(0, 0)\nx <- GetColorCount(\"red\", 0, 0, \"3\", 3)");
        assert!(errors[0].message.contains("Argument 4"));
    }

    #[test]
    fn every_bad_argument_is_reported() {
        let errors = check_err("Spawn(0, 0)\nx <- GetColorCount(5, \"0\", 0, (1 < 2), 3)\nSize(2)");
        assert_eq!(errors.len(), 3, "{errors:?}");
        assert!(errors[0].message.starts_with("Argument 1 ('color')"));
        assert!(errors[1].message.starts_with("Argument 2 "));
        assert!(errors[2].message.starts_with("Argument 4 "));
        assert!(errors[0].span.column < errors[1].span.column);

        let errors = check_err("Spawn(0, 0)\nDrawRectangle(\"a\", 0, b, 1, \"c\")");
        assert_eq!(errors.len(), 3, "{errors:?}");
        assert!(errors[1].message.contains("Variable 'b' is not defined"));
        assert!(errors[2].message.starts_with("Argument 5 "));
    }

    #[test]
    fn query_result_types() {
        check("Spawn(0, 0)\nx <- GetActualX() + GetCanvasSize()\nl\nGoTo [l] (IsCanvasColor(\"white\", 0, 1) && IsBrushSize(1))");
    }

    #[test]
    fn every_bad_statement_is_reported() {
        let errors = check_err("Spawn(0, 0)\nx <- a\nColor(1)\ny <- 1 && 2\nGoTo [missing] (1 < 2)");
        assert_eq!(errors.len(), 4, "{errors:?}");
    }

    #[test]
    fn error_inside_statement_does_not_define_variable() {
        let errors = check_err("Spawn(0, 0)\nx <- q\ny <- x");
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn arity_checked_for_hand_built_programs() {
        let span = Span::default();
        let program = Program {
            statements: vec![Stmt {
                kind: StmtKind::Command {
                    builtin: Builtin::Size,
                    args: vec![],
                },
                span,
            }],
        };
        let errors = analyze(&program);
        assert!(errors[0].message.contains("'Size' expects 1 arguments, but got 0"));
    }

    #[test]
    fn boolean_literals_type_as_boolean() {
        let span = Span::default();
        let program = Program {
            statements: vec![
                Stmt { kind: StmtKind::Label("top".into()), span },
                Stmt {
                    kind: StmtKind::GoTo {
                        label: "top".into(),
                        condition: Expr { kind: ExprKind::BoolLit(false), span },
                    },
                    span,
                },
            ],
        };
        assert!(analyze(&program).is_empty());
    }
}

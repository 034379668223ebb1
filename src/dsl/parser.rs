use super::ast::*;
use super::builtins::{Builtin, Category};
use super::error::CompileError;
use super::lexer::{SpannedToken, Token};

/// Parse a token stream into a `Program`.
///
/// Errors inside a statement are recorded and the parser resumes at the next
/// line, so the returned program holds every statement that did parse. A
/// program that does not open with `Spawn` yields an empty program and exactly
/// one error.
pub fn parse(tokens: Vec<SpannedToken>) -> (Program, Vec<CompileError>) {
    let mut parser = Parser::new(tokens);
    let program = parser.parse_program();
    (program, parser.errors)
}

struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
    errors: Vec<CompileError>,
}

impl Parser {
    fn new(tokens: Vec<SpannedToken>) -> Self {
        Self {
            tokens,
            pos: 0,
            errors: Vec::new(),
        }
    }

    fn parse_program(&mut self) -> Program {
        let mut statements = Vec::new();

        self.skip_newlines();
        if let Err(e) = self.check_opens_with_spawn() {
            self.errors.push(e);
            return Program::default();
        }

        while !self.at_eof() {
            match self.parse_stmt() {
                Ok(stmt) => statements.push(stmt),
                Err(e) => {
                    self.errors.push(e);
                    self.synchronize();
                }
            }
            self.skip_newlines();
        }

        Program { statements }
    }

    fn check_opens_with_spawn(&self) -> Result<(), CompileError> {
        match self.peek() {
            Token::Eof => Err(CompileError::parse(
                "Source code cannot be empty. Must start with 'Spawn'.",
                self.span(),
            )),
            Token::Builtin(Builtin::Spawn) => Ok(()),
            _ => Err(CompileError::parse("Source must start with 'Spawn'.", self.span())),
        }
    }

    // ── Helpers ────────────────────────────────────────────────────

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).map_or(&Token::Eof, |t| &t.token)
    }

    fn peek_next(&self) -> &Token {
        self.tokens.get(self.pos + 1).map_or(&Token::Eof, |t| &t.token)
    }

    fn span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(Span::default(), |t| t.span)
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek(), Token::Eof)
    }

    fn advance(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn expect(&mut self, expected: &Token, message: &str) -> Result<Span, CompileError> {
        if self.peek() == expected {
            let sp = self.span();
            self.advance();
            Ok(sp)
        } else {
            Err(CompileError::parse(message, self.span()))
        }
    }

    fn skip_newlines(&mut self) {
        while matches!(self.peek(), Token::Newline) {
            self.advance();
        }
    }

    /// A statement ends at one or more newlines or at end of file.
    fn expect_terminator(&mut self) -> Result<(), CompileError> {
        match self.peek() {
            Token::Newline => {
                self.skip_newlines();
                Ok(())
            }
            Token::Eof => Ok(()),
            _ => Err(CompileError::parse("Expected newline after statement.", self.span())),
        }
    }

    /// Discard tokens up to and including the next newline.
    fn synchronize(&mut self) {
        while !matches!(self.peek(), Token::Newline | Token::Eof) {
            self.advance();
        }
        if matches!(self.peek(), Token::Newline) {
            self.advance();
        }
    }

    // ── Statements ────────────────────────────────────────────────

    fn parse_stmt(&mut self) -> Result<Stmt, CompileError> {
        let start = self.span();
        let kind = match self.peek().clone() {
            Token::Ident(name) if matches!(self.peek_next(), Token::Assign) => {
                self.advance();
                self.advance();
                let value = self.parse_expr()?;
                StmtKind::Assign { name, value }
            }
            Token::Ident(name) if matches!(self.peek_next(), Token::Newline | Token::Eof) => {
                self.advance();
                StmtKind::Label(name)
            }
            Token::Builtin(builtin) if builtin.is_command() => {
                self.advance();
                let args = self.parse_call_args(builtin)?;
                StmtKind::Command { builtin, args }
            }
            Token::GoTo => {
                self.advance();
                self.expect(&Token::LBracket, "Expected '[' after 'GoTo'.")?;
                let label = match self.peek().clone() {
                    Token::Ident(label) => {
                        self.advance();
                        label
                    }
                    _ => {
                        return Err(CompileError::parse(
                            "Expected label name inside '[ ]' after 'GoTo'.",
                            self.span(),
                        ));
                    }
                };
                self.expect(&Token::RBracket, "Expected ']' after GoTo label.")?;
                self.expect(&Token::LParen, "Expected '(' before GoTo condition.")?;
                let condition = self.parse_expr()?;
                self.expect(&Token::RParen, "Expected ')' after GoTo condition.")?;
                StmtKind::GoTo { label, condition }
            }
            _ => {
                return Err(CompileError::parse(
                    "Unexpected token. Expected a command, assignment, label, or GoTo.",
                    start,
                ));
            }
        };
        let end = self.tokens.get(self.pos.saturating_sub(1)).map_or(start, |t| t.span);
        self.expect_terminator()?;
        Ok(Stmt {
            kind,
            span: start.merge(end),
        })
    }

    /// `( arg, arg, ... )` with the count checked against the registry.
    fn parse_call_args(&mut self, builtin: Builtin) -> Result<Vec<Expr>, CompileError> {
        let def = builtin.def();
        self.expect(
            &Token::LParen,
            &format!("Expected '(' after function name '{}'.", def.name),
        )?;

        let mut args = Vec::new();
        if !matches!(self.peek(), Token::RParen) {
            if def.arity() == 0 {
                return Err(CompileError::parse(
                    format!("Function '{}' does not take any arguments.", def.name),
                    self.span(),
                ));
            }
            args.push(self.parse_expr()?);
            while matches!(self.peek(), Token::Comma) {
                self.advance();
                args.push(self.parse_expr()?);
            }
        }
        let close = self.span();
        self.expect(
            &Token::RParen,
            &format!("Expected ')' or ',' after argument list for function '{}'.", def.name),
        )?;

        if args.len() != def.arity() {
            return Err(CompileError::parse(
                format!("'{}' expects {} arguments, but got {}.", def.name, def.arity(), args.len()),
                close,
            ));
        }
        Ok(args)
    }

    // ── Expression parsing (precedence climbing) ──────────────────

    fn parse_expr(&mut self) -> Result<Expr, CompileError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_and()?;
        while matches!(self.peek(), Token::Or) {
            self.advance();
            let right = self.parse_and()?;
            left = binop(BinOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_equality()?;
        while matches!(self.peek(), Token::And) {
            self.advance();
            let right = self.parse_equality()?;
            left = binop(BinOp::And, left, right);
        }
        Ok(left)
    }

    /// Non-associative: `a == b == c` stops after the first comparison.
    fn parse_equality(&mut self) -> Result<Expr, CompileError> {
        let left = self.parse_comparison()?;
        let op = match self.peek() {
            Token::EqEq => BinOp::Eq,
            Token::Ne => BinOp::Ne,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_comparison()?;
        Ok(binop(op, left, right))
    }

    /// Non-associative, like equality.
    fn parse_comparison(&mut self) -> Result<Expr, CompileError> {
        let left = self.parse_add()?;
        let op = match self.peek() {
            Token::Lt => BinOp::Lt,
            Token::Gt => BinOp::Gt,
            Token::Le => BinOp::Le,
            Token::Ge => BinOp::Ge,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_add()?;
        Ok(binop(op, left, right))
    }

    fn parse_add(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_mul()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_mul()?;
            left = binop(op, left, right);
        }
        Ok(left)
    }

    fn parse_mul(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_power()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                Token::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_power()?;
            left = binop(op, left, right);
        }
        Ok(left)
    }

    /// Power operator `**` — right-associative, higher precedence than mul.
    fn parse_power(&mut self) -> Result<Expr, CompileError> {
        let left = self.parse_unary()?;
        if matches!(self.peek(), Token::StarStar) {
            self.advance();
            // Right-associative: recurse into parse_power (not parse_unary)
            let right = self.parse_power()?;
            Ok(binop(BinOp::Pow, left, right))
        } else {
            Ok(left)
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, CompileError> {
        let op = match self.peek() {
            Token::Minus => UnaryOp::Neg,
            Token::Bang => UnaryOp::Not,
            _ => return self.parse_primary(),
        };
        let start = self.span();
        self.advance();
        let operand = self.parse_unary()?;
        let span = start.merge(operand.span);
        Ok(Expr {
            kind: ExprKind::UnaryOp {
                op,
                operand: Box::new(operand),
            },
            span,
        })
    }

    fn parse_primary(&mut self) -> Result<Expr, CompileError> {
        let span = self.span();
        match self.peek().clone() {
            Token::Number(text) => {
                self.advance();
                let value = text.parse::<i64>().map_err(|_| {
                    CompileError::parse(format!("Invalid integer number format '{text}'."), span)
                })?;
                Ok(Expr { kind: ExprKind::NumberLit(value), span })
            }
            Token::Str(s) => {
                self.advance();
                Ok(Expr { kind: ExprKind::StringLit(s), span })
            }
            Token::Ident(name) => {
                self.advance();
                Ok(Expr { kind: ExprKind::Variable(name), span })
            }
            Token::Builtin(builtin) => {
                let def = builtin.def();
                if def.category == Category::Command {
                    return Err(CompileError::parse(
                        format!("Command '{}' cannot be used inside an expression.", def.name),
                        span,
                    ));
                }
                self.advance();
                let args = self.parse_call_args(builtin)?;
                let end = self.tokens.get(self.pos.saturating_sub(1)).map_or(span, |t| t.span);
                Ok(Expr {
                    kind: ExprKind::Call { builtin, args },
                    span: span.merge(end),
                })
            }
            Token::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(&Token::RParen, "Expected ')' after expression.")?;
                Ok(expr)
            }
            _ => Err(CompileError::parse(
                "Expected expression (number, string, variable, function call, or parentheses).",
                span,
            )),
        }
    }
}

fn binop(op: BinOp, left: Expr, right: Expr) -> Expr {
    let span = left.span.merge(right.span);
    Expr {
        kind: ExprKind::BinOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        span,
    }
}

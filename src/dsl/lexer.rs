use super::ast::Span;
use super::builtins::{lookup_builtin, Builtin};
use super::error::CompileError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Number(String),
    Str(String),

    // Identifiers & keywords
    Ident(String),
    Builtin(Builtin),
    GoTo,

    // Punctuation
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Assign,    // <-

    // Operators
    Plus,
    Minus,
    Star,
    StarStar,  // **
    Slash,
    Percent,
    Lt,
    Gt,
    Le,        // <=
    Ge,        // >=
    EqEq,      // ==
    Ne,        // !=
    And,       // &&
    Or,        // ||
    Bang,      // !

    // Special
    Newline,
    Eof,
    /// Lexical error marker. Carries the offending text so the stream stays complete.
    Unknown(String),
}

#[derive(Debug, Clone)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
}

/// Tokenize a whole program. Lexing is total: the stream always ends in a
/// single `Eof`, and every bad character yields an `Unknown` token plus an error.
pub fn lex(source: &str) -> (Vec<SpannedToken>, Vec<CompileError>) {
    let mut lexer = Lexer::new(source);
    lexer.tokenize();
    (lexer.tokens, lexer.errors)
}

struct Lexer<'a> {
    source: &'a str,
    pos: usize,
    line: u32,
    column: u32,
    tokens: Vec<SpannedToken>,
    errors: Vec<CompileError>,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            pos: 0,
            line: 1,
            column: 1,
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn tokenize(&mut self) {
        while let Some(ch) = self.peek() {
            let start = self.pos;
            let (line, column) = (self.line, self.column);

            match ch {
                '\n' => {
                    self.bump();
                    self.push(Token::Newline, start, line, column);
                    self.new_line();
                }
                '\r' => {
                    self.bump();
                    if self.peek() == Some('\n') {
                        self.bump();
                    }
                    self.push(Token::Newline, start, line, column);
                    self.new_line();
                }
                c if c.is_whitespace() => {
                    self.bump();
                }
                c if c.is_ascii_digit() => self.lex_number(start, line, column),
                '"' => self.lex_string(start, line, column),
                c if c.is_alphabetic() => self.lex_ident(start, line, column),
                c if "+-*/%<>=!&|(),[]".contains(c) => self.lex_operator(start, line, column),
                c => {
                    self.bump();
                    self.errors.push(CompileError::lexical(
                        format!("Unrecognized character '{c}'."),
                        Span::new(start, self.pos, line, column),
                    ));
                    self.push(Token::Unknown(c.to_string()), start, line, column);
                }
            }
        }

        let (line, column) = (self.line, self.column);
        self.push(Token::Eof, self.pos, line, column);
    }

    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.source[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        self.column += 1;
        Some(ch)
    }

    fn new_line(&mut self) {
        self.line += 1;
        self.column = 1;
    }

    fn push(&mut self, token: Token, start: usize, line: u32, column: u32) {
        self.tokens.push(SpannedToken {
            token,
            span: Span::new(start, self.pos, line, column),
        });
    }

    fn lex_number(&mut self, start: usize, line: u32, column: u32) {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        let text = self.source[start..self.pos].to_string();
        self.push(Token::Number(text), start, line, column);
    }

    fn lex_string(&mut self, start: usize, line: u32, column: u32) {
        self.bump(); // opening quote
        let body_start = self.pos;
        loop {
            match self.peek() {
                Some('"') => {
                    let body = self.source[body_start..self.pos].to_string();
                    self.bump();
                    self.push(Token::Str(body), start, line, column);
                    return;
                }
                Some('\n' | '\r') => {
                    // Leave the line break in place so it still terminates the statement.
                    let partial = &self.source[body_start..self.pos];
                    self.errors.push(CompileError::lexical(
                        "Newline in string literal is not allowed.",
                        Span::new(start, self.pos, line, column),
                    ));
                    self.push(Token::Unknown(format!("\"{partial}...")), start, line, column);
                    return;
                }
                Some(_) => {
                    self.bump();
                }
                None => {
                    let partial = &self.source[body_start..self.pos];
                    self.errors.push(CompileError::lexical(
                        "Unterminated string literal at end of file.",
                        Span::new(start, self.pos, line, column),
                    ));
                    self.push(Token::Unknown(format!("\"{partial}")), start, line, column);
                    return;
                }
            }
        }
    }

    /// Identifiers are letters and digits. `_` and `-` join only when a letter
    /// follows directly, so `x-1` stays three tokens and a trailing `-` is never absorbed.
    fn lex_ident(&mut self, start: usize, line: u32, column: u32) {
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() {
                self.bump();
            } else if (c == '_' || c == '-') && self.peek_second().is_some_and(char::is_alphabetic) {
                self.bump();
            } else {
                break;
            }
        }
        let word = &self.source[start..self.pos];
        let token = if word.eq_ignore_ascii_case("GoTo") {
            Token::GoTo
        } else if let Some(def) = lookup_builtin(word) {
            Token::Builtin(def.kind)
        } else {
            Token::Ident(word.to_string())
        };
        self.push(token, start, line, column);
    }

    fn lex_operator(&mut self, start: usize, line: u32, column: u32) {
        let Some(first) = self.bump() else { return };
        let second = self.peek();

        let double = match (first, second) {
            ('<', Some('-')) => Some(Token::Assign),
            ('*', Some('*')) => Some(Token::StarStar),
            ('=', Some('=')) => Some(Token::EqEq),
            ('!', Some('=')) => Some(Token::Ne),
            ('>', Some('=')) => Some(Token::Ge),
            ('<', Some('=')) => Some(Token::Le),
            ('&', Some('&')) => Some(Token::And),
            ('|', Some('|')) => Some(Token::Or),
            _ => None,
        };
        if let Some(token) = double {
            self.bump();
            self.push(token, start, line, column);
            return;
        }

        let single = match first {
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '%' => Token::Percent,
            '<' => Token::Lt,
            '>' => Token::Gt,
            '!' => Token::Bang,
            '(' => Token::LParen,
            ')' => Token::RParen,
            ',' => Token::Comma,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            other => {
                self.errors.push(CompileError::lexical(
                    format!("Unrecognized operator '{other}'."),
                    Span::new(start, self.pos, line, column),
                ));
                Token::Unknown(other.to_string())
            }
        };
        self.push(single, start, line, column);
    }
}

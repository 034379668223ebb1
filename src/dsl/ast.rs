//! AST node types for the Pixel Wall-E drawing language.

use std::fmt;

use super::builtins::Builtin;

/// Source span for error reporting. `line` and `column` are 1-based and
/// point at the first character of the spanned text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Self { start, end, line, column }
    }

    pub fn merge(self, other: Span) -> Span {
        let (line, column) = if other.start < self.start {
            (other.line, other.column)
        } else {
            (self.line, self.column)
        };
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            line,
            column,
        }
    }
}

/// A complete program: the ordered statement list the program counter indexes into.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    /// `name <- expr`
    Assign { name: String, value: Expr },
    /// A bare identifier on its own line: `loop_start`
    Label(String),
    /// `GoTo [label] (condition)`
    GoTo { label: String, condition: Expr },
    /// `DrawLine(1, 0, 5)`
    Command { builtin: Builtin, args: Vec<Expr> },
}

/// Value types known to the analyzer. `Void` is the result of commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeName {
    Number,
    String,
    Boolean,
    Void,
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeName::Number => "Number",
            TypeName::String => "String",
            TypeName::Boolean => "Boolean",
            TypeName::Void => "Void",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    /// Integer literal: `42`
    NumberLit(i64),
    /// String literal: `"red"`
    StringLit(String),
    /// Boolean literal. The surface syntax has no spelling for these; hosts
    /// building programs directly may still use them.
    BoolLit(bool),
    /// Variable reference: `n`, `counter`
    Variable(String),
    /// Unary operation: `-x`, `!b`
    UnaryOp { op: UnaryOp, operand: Box<Expr> },
    /// Binary operation: `a + b`
    BinOp {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Query call: `GetActualX()`, `IsBrushColor("red")`
    Call { builtin: Builtin, args: Vec<Expr> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Pow => "**",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::Le => "<=",
            BinOp::Ge => ">=",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

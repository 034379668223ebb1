//! Tree-walking interpreter: a program counter over the statement list,
//! a variable scope, Wall-E's position and the brush.

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;

use super::ast::*;
use super::builtins::Builtin;
use super::raster;
use crate::model::{Color, Surface};
use crate::theme::{resolve_color, ColorResolver};

/// Default number of times any single `GoTo` may execute before the run is aborted.
pub const DEFAULT_MAX_GOTO_VISITS: u32 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterpreterOptions {
    pub max_goto_visits: u32,
}

impl Default for InterpreterOptions {
    fn default() -> Self {
        Self {
            max_goto_visits: DEFAULT_MAX_GOTO_VISITS,
        }
    }
}

/// Runtime value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Number(i64),
    Bool(bool),
    Str(String),
}

impl Value {
    pub fn type_name(&self) -> TypeName {
        match self {
            Value::Number(_) => TypeName::Number,
            Value::Bool(_) => TypeName::Boolean,
            Value::Str(_) => TypeName::String,
        }
    }
}

/// Why a run stopped early.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Fault {
    #[error("Wall-E has not been spawned. Call Spawn(x, y) first.")]
    NotSpawned,
    #[error("{command} position ({x},{y}) is outside the canvas bounds (0 to {last}).")]
    PositionOutside { command: &'static str, x: i64, y: i64, last: i64 },
    #[error("Wall-E position is outside canvas bounds ({x},{y}) after DrawLine.")]
    LineLeftCanvas { x: i64, y: i64 },
    #[error("{command} center ({x},{y}) is outside the canvas.")]
    CenterOutside { command: &'static str, x: i64, y: i64 },
    #[error("Invalid color name: '{0}'.")]
    InvalidColor(String),
    #[error("Brush size must be positive.")]
    NonPositiveBrush,
    #[error("{command} directions (dirX, dirY) must be -1, 0, or 1.")]
    InvalidDirection { command: &'static str },
    #[error("DrawLine direction cannot be (0, 0).")]
    ZeroDirection,
    #[error("{command} {what} must be positive.")]
    NonPositive { command: &'static str, what: &'static str },
    #[error("DrawRectangle distance cannot be negative.")]
    NegativeDistance,
    #[error("Division by zero.")]
    DivisionByZero,
    #[error("Modulo by zero.")]
    ModuloByZero,
    #[error("Arithmetic overflow in '{0}'.")]
    Overflow(&'static str),
    #[error("Variable '{0}' is not defined.")]
    UndefinedVariable(String),
    #[error("Undefined label: '{0}'.")]
    UndefinedLabel(String),
    #[error("Duplicate label definition: '{0}'.")]
    DuplicateLabel(String),
    #[error("Expected {expected} for {context}, but got {found}.")]
    TypeMismatch { context: String, expected: TypeName, found: TypeName },
    #[error("'{name}' expects {expected} arguments, but got {got}.")]
    ArgumentCount { name: &'static str, expected: usize, got: usize },
    #[error("'{0}' does not produce a value.")]
    NoValue(&'static str),
    #[error("Execution aborted: GoTo '{label}' visited too many times ({max}).")]
    GoToLimit { label: String, max: u32 },
}

/// A fault tagged with the statement or expression that raised it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[Line {line}:{column}] Execution Error: {fault}")]
pub struct RuntimeError {
    pub fault: Fault,
    pub line: u32,
    pub column: u32,
}

impl RuntimeError {
    fn at(fault: Fault, span: Span) -> Self {
        Self {
            fault,
            line: span.line,
            column: span.column,
        }
    }
}

/// Interpreter state at the end of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// `None` only for programs built without a `Spawn`.
    pub pointer: Option<(i64, i64)>,
    pub brush_color: Color,
    pub brush_size: i64,
    /// Statements executed, labels and jumps included.
    pub steps: u64,
}

#[derive(Debug, Clone, Copy)]
struct Brush {
    color: Color,
    size: i64,
}

impl Default for Brush {
    fn default() -> Self {
        Self {
            color: Color::TRANSPARENT,
            size: 1,
        }
    }
}

/// Runtime variable bindings. Assignment defines or overwrites.
#[derive(Debug, Default)]
struct Scope {
    vars: HashMap<String, Value>,
}

impl Scope {
    fn get(&self, name: &str) -> Result<Value, Fault> {
        self.vars
            .get(name)
            .cloned()
            .ok_or_else(|| Fault::UndefinedVariable(name.to_string()))
    }

    fn set(&mut self, name: &str, value: Value) {
        self.vars.insert(name.to_string(), value);
    }
}

enum Flow {
    Next,
    Jump(usize),
}

/// Run `program` against `surface`.
///
/// The surface is borrowed for this call only. On a fault, execution stops
/// and every pixel painted before the fault stays painted.
pub fn interpret<S: Surface + ?Sized>(
    program: &Program,
    surface: &mut S,
    resolver: Option<&dyn ColorResolver>,
    options: &InterpreterOptions,
) -> Result<RunReport, RuntimeError> {
    let mut interp = Interpreter {
        surface,
        resolver,
        max_goto_visits: options.max_goto_visits,
        scope: Scope::default(),
        pointer: None,
        brush: Brush::default(),
        labels: HashMap::new(),
        visits: HashMap::new(),
    };
    interp.index_labels(program)?;

    let mut pc = 0;
    let mut steps: u64 = 0;
    while let Some(stmt) = program.statements.get(pc) {
        steps += 1;
        pc = match interp.exec(stmt, pc) {
            Ok(Flow::Next) => pc + 1,
            Ok(Flow::Jump(target)) => target,
            Err(fault) => return Err(RuntimeError::at(fault, stmt.span)),
        };
    }

    Ok(RunReport {
        pointer: interp.pointer,
        brush_color: interp.brush.color,
        brush_size: interp.brush.size,
        steps,
    })
}

struct Interpreter<'a, S: Surface + ?Sized> {
    surface: &'a mut S,
    resolver: Option<&'a dyn ColorResolver>,
    max_goto_visits: u32,
    scope: Scope,
    pointer: Option<(i64, i64)>,
    brush: Brush,
    labels: HashMap<String, usize>,
    /// Executions per `GoTo` statement index.
    visits: HashMap<usize, u32>,
}

impl<S: Surface + ?Sized> Interpreter<'_, S> {
    fn index_labels(&mut self, program: &Program) -> Result<(), RuntimeError> {
        for (i, stmt) in program.statements.iter().enumerate() {
            if let StmtKind::Label(name) = &stmt.kind {
                if self.labels.insert(name.clone(), i).is_some() {
                    return Err(RuntimeError::at(Fault::DuplicateLabel(name.clone()), stmt.span));
                }
            }
        }
        Ok(())
    }

    fn exec(&mut self, stmt: &Stmt, pc: usize) -> Result<Flow, Fault> {
        match &stmt.kind {
            StmtKind::Assign { name, value } => {
                let v = self.eval(value)?;
                self.scope.set(name, v);
            }
            StmtKind::Label(_) => {}
            StmtKind::GoTo { label, condition } => {
                let visits = self.visits.entry(pc).or_insert(0);
                *visits += 1;
                if *visits > self.max_goto_visits {
                    return Err(Fault::GoToLimit {
                        label: label.clone(),
                        max: self.max_goto_visits,
                    });
                }
                let jump = match self.eval(condition)? {
                    Value::Bool(b) => b,
                    other => {
                        return Err(Fault::TypeMismatch {
                            context: "GoTo condition".into(),
                            expected: TypeName::Boolean,
                            found: other.type_name(),
                        })
                    }
                };
                if jump {
                    let target = self
                        .labels
                        .get(label)
                        .copied()
                        .ok_or_else(|| Fault::UndefinedLabel(label.clone()))?;
                    return Ok(Flow::Jump(target));
                }
            }
            StmtKind::Command { builtin, args } => {
                let args = self.eval_args(*builtin, args)?;
                if builtin.is_command() {
                    self.run_command(*builtin, &args)?;
                } else {
                    self.run_query(*builtin, &args)?;
                }
            }
        }
        Ok(Flow::Next)
    }

    fn eval_args(&mut self, builtin: Builtin, args: &[Expr]) -> Result<Vec<Value>, Fault> {
        let def = builtin.def();
        if args.len() != def.arity() {
            return Err(Fault::ArgumentCount {
                name: def.name,
                expected: def.arity(),
                got: args.len(),
            });
        }
        let values = args.iter().map(|a| self.eval(a)).collect::<Result<Vec<_>, _>>()?;
        for (value, (param, expected)) in values.iter().zip(def.params) {
            if value.type_name() != *expected {
                return Err(Fault::TypeMismatch {
                    context: format!("'{param}' of {}", def.name),
                    expected: *expected,
                    found: value.type_name(),
                });
            }
        }
        Ok(values)
    }

    fn eval(&mut self, expr: &Expr) -> Result<Value, Fault> {
        match &expr.kind {
            ExprKind::NumberLit(n) => Ok(Value::Number(*n)),
            ExprKind::StringLit(s) => Ok(Value::Str(s.clone())),
            ExprKind::BoolLit(b) => Ok(Value::Bool(*b)),
            ExprKind::Variable(name) => self.scope.get(name),
            ExprKind::UnaryOp { op, operand } => {
                let v = self.eval(operand)?;
                match (op, v) {
                    (UnaryOp::Neg, Value::Number(n)) => n.checked_neg().map(Value::Number).ok_or(Fault::Overflow("-")),
                    (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
                    (UnaryOp::Neg, other) => Err(mismatch("unary '-'", TypeName::Number, &other)),
                    (UnaryOp::Not, other) => Err(mismatch("'!'", TypeName::Boolean, &other)),
                }
            }
            ExprKind::BinOp { op, left, right } => {
                let l = self.eval(left)?;
                let r = self.eval(right)?;
                binary(*op, l, r)
            }
            ExprKind::Call { builtin, args } => {
                if builtin.is_command() {
                    return Err(Fault::NoValue(builtin.name()));
                }
                let args = self.eval_args(*builtin, args)?;
                self.run_query(*builtin, &args)
            }
        }
    }

    fn pointer(&self) -> Result<(i64, i64), Fault> {
        self.pointer.ok_or(Fault::NotSpawned)
    }

    fn canvas_len(&self) -> i64 {
        i64::try_from(self.surface.size()).unwrap_or(i64::MAX)
    }

    fn color(&self, name: &str) -> Result<Color, Fault> {
        resolve_color(name, self.resolver).ok_or_else(|| Fault::InvalidColor(name.to_string()))
    }

    fn paint(&mut self, x: i64, y: i64) {
        raster::stamp(&mut *self.surface, x, y, self.brush.size, self.brush.color);
    }

    fn run_command(&mut self, builtin: Builtin, args: &[Value]) -> Result<(), Fault> {
        let command = builtin.name();
        match builtin {
            Builtin::Spawn | Builtin::MoveTo => {
                let (x, y) = (num(args, 0)?, num(args, 1)?);
                if !self.surface.in_bounds(x, y) {
                    return Err(Fault::PositionOutside {
                        command,
                        x,
                        y,
                        last: self.canvas_len() - 1,
                    });
                }
                self.pointer = Some((x, y));
            }
            Builtin::Color => {
                self.brush.color = self.color(text(args, 0)?)?;
            }
            Builtin::Size => {
                let k = num(args, 0)?;
                if k <= 0 {
                    return Err(Fault::NonPositiveBrush);
                }
                self.brush.size = if k % 2 == 0 { k - 1 } else { k };
            }
            Builtin::DrawLine => {
                let (dx, dy) = direction(command, num(args, 0)?, num(args, 1)?)?;
                if dx == 0 && dy == 0 {
                    return Err(Fault::ZeroDirection);
                }
                let distance = num(args, 2)?;
                if distance <= 0 {
                    return Err(Fault::NonPositive { command, what: "distance" });
                }
                let (mut x, mut y) = self.pointer()?;
                for step in 0..distance {
                    if step > 0 {
                        x += dx;
                        y += dy;
                    }
                    if !self.surface.in_bounds(x, y) {
                        return Err(Fault::LineLeftCanvas { x: x - dx, y: y - dy });
                    }
                    self.paint(x, y);
                    self.pointer = Some((x, y));
                }
            }
            Builtin::DrawCircle => {
                let (dx, dy) = direction(command, num(args, 0)?, num(args, 1)?)?;
                let radius = num(args, 2)?;
                if radius <= 0 {
                    return Err(Fault::NonPositive { command, what: "radius" });
                }
                let (cx, cy) = self.center(command, dx, dy, radius)?;
                raster::draw_circle(&mut *self.surface, cx, cy, radius, self.brush.size, self.brush.color);
                self.pointer = Some((cx, cy));
            }
            Builtin::DrawRectangle => {
                let (dx, dy) = direction(command, num(args, 0)?, num(args, 1)?)?;
                let distance = num(args, 2)?;
                if distance < 0 {
                    return Err(Fault::NegativeDistance);
                }
                let (width, height) = (num(args, 3)?, num(args, 4)?);
                if width <= 0 {
                    return Err(Fault::NonPositive { command, what: "width" });
                }
                if height <= 0 {
                    return Err(Fault::NonPositive { command, what: "height" });
                }
                let (cx, cy) = self.center(command, dx, dy, distance)?;
                raster::draw_rectangle(
                    &mut *self.surface,
                    (cx, cy),
                    (width, height),
                    self.brush.size,
                    self.brush.color,
                );
                self.pointer = Some((cx, cy));
            }
            Builtin::Fill => {
                let (x, y) = self.pointer()?;
                raster::flood_fill(&mut *self.surface, x, y, self.brush.color);
            }
            Builtin::GetActualX
            | Builtin::GetActualY
            | Builtin::GetCanvasSize
            | Builtin::GetColorCount
            | Builtin::IsBrushColor
            | Builtin::IsBrushSize
            | Builtin::IsCanvasColor => {
                self.run_query(builtin, args)?;
            }
        }
        Ok(())
    }

    /// `pointer + dir * distance`, which must land on the canvas.
    fn center(&self, command: &'static str, dx: i64, dy: i64, distance: i64) -> Result<(i64, i64), Fault> {
        let (x, y) = self.pointer()?;
        let offset = |p: i64, d: i64| d.checked_mul(distance).and_then(|o| p.checked_add(o));
        let (Some(cx), Some(cy)) = (offset(x, dx), offset(y, dy)) else {
            return Err(Fault::Overflow("*"));
        };
        if !self.surface.in_bounds(cx, cy) {
            return Err(Fault::CenterOutside { command, x: cx, y: cy });
        }
        Ok((cx, cy))
    }

    fn run_query(&self, builtin: Builtin, args: &[Value]) -> Result<Value, Fault> {
        match builtin {
            Builtin::GetActualX => Ok(Value::Number(self.pointer()?.0)),
            Builtin::GetActualY => Ok(Value::Number(self.pointer()?.1)),
            Builtin::GetCanvasSize => Ok(Value::Number(self.canvas_len())),
            Builtin::GetColorCount => {
                let color = self.color(text(args, 0)?)?;
                let a = (num(args, 1)?, num(args, 2)?);
                let b = (num(args, 3)?, num(args, 4)?);
                Ok(Value::Number(raster::count_color(&*self.surface, color, a, b)))
            }
            Builtin::IsBrushColor => {
                let color = self.color(text(args, 0)?)?;
                Ok(Value::Bool(self.brush.color.approx_eq(color)))
            }
            Builtin::IsBrushSize => Ok(Value::Bool(self.brush.size == num(args, 0)?)),
            Builtin::IsCanvasColor => {
                let color = self.color(text(args, 0)?)?;
                let (x, y) = self.pointer()?;
                let (vertical, horizontal) = (num(args, 1)?, num(args, 2)?);
                let found = match (x.checked_add(horizontal), y.checked_add(vertical)) {
                    (Some(px), Some(py)) => self.surface.pixel(px, py).is_some_and(|c| c.approx_eq(color)),
                    _ => false,
                };
                Ok(Value::Bool(found))
            }
            Builtin::Spawn
            | Builtin::MoveTo
            | Builtin::Color
            | Builtin::Size
            | Builtin::DrawLine
            | Builtin::DrawCircle
            | Builtin::DrawRectangle
            | Builtin::Fill => Err(Fault::NoValue(builtin.name())),
        }
    }
}

fn mismatch(context: &str, expected: TypeName, found: &Value) -> Fault {
    Fault::TypeMismatch {
        context: context.to_string(),
        expected,
        found: found.type_name(),
    }
}

fn num(args: &[Value], i: usize) -> Result<i64, Fault> {
    match args.get(i) {
        Some(Value::Number(n)) => Ok(*n),
        Some(other) => Err(mismatch("argument", TypeName::Number, other)),
        None => Err(Fault::NoValue("argument")),
    }
}

fn text(args: &[Value], i: usize) -> Result<&str, Fault> {
    match args.get(i) {
        Some(Value::Str(s)) => Ok(s),
        Some(other) => Err(mismatch("argument", TypeName::String, other)),
        None => Err(Fault::NoValue("argument")),
    }
}

fn direction(command: &'static str, dx: i64, dy: i64) -> Result<(i64, i64), Fault> {
    if !(-1..=1).contains(&dx) || !(-1..=1).contains(&dy) {
        return Err(Fault::InvalidDirection { command });
    }
    Ok((dx, dy))
}

fn binary(op: BinOp, l: Value, r: Value) -> Result<Value, Fault> {
    let symbol = op.symbol();
    match op {
        BinOp::Eq => return Ok(Value::Bool(l == r)),
        BinOp::Ne => return Ok(Value::Bool(l != r)),
        BinOp::And | BinOp::Or => {
            return match (l, r) {
                (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(if op == BinOp::And { a && b } else { a || b })),
                (Value::Bool(_), other) | (other, _) => Err(mismatch(symbol, TypeName::Boolean, &other)),
            };
        }
        _ => {}
    }

    let (a, b) = match (l, r) {
        (Value::Number(a), Value::Number(b)) => (a, b),
        (Value::Number(_), other) | (other, _) => return Err(mismatch(symbol, TypeName::Number, &other)),
    };
    let overflow = Fault::Overflow(symbol);
    let n = match op {
        BinOp::Add => a.checked_add(b).ok_or(overflow)?,
        BinOp::Sub => a.checked_sub(b).ok_or(overflow)?,
        BinOp::Mul => a.checked_mul(b).ok_or(overflow)?,
        BinOp::Div => {
            if b == 0 {
                return Err(Fault::DivisionByZero);
            }
            a.checked_div(b).ok_or(overflow)?
        }
        BinOp::Mod => {
            if b == 0 {
                return Err(Fault::ModuloByZero);
            }
            a.checked_rem(b).ok_or(overflow)?
        }
        BinOp::Pow => power(a, b)?,
        BinOp::Lt => return Ok(Value::Bool(a < b)),
        BinOp::Gt => return Ok(Value::Bool(a > b)),
        BinOp::Le => return Ok(Value::Bool(a <= b)),
        BinOp::Ge => return Ok(Value::Bool(a >= b)),
        BinOp::Eq | BinOp::Ne | BinOp::And | BinOp::Or => return Err(Fault::NoValue(symbol)),
    };
    Ok(Value::Number(n))
}

/// Integer power. Negative exponents truncate toward zero like division does:
/// only bases 1 and -1 survive, and base 0 divides by zero.
fn power(base: i64, exp: i64) -> Result<i64, Fault> {
    let odd = exp % 2 != 0;
    match base {
        1 => Ok(1),
        -1 => Ok(if odd { -1 } else { 1 }),
        0 if exp < 0 => Err(Fault::DivisionByZero),
        0 => Ok(i64::from(exp == 0)),
        _ if exp < 0 => Ok(0),
        _ => u32::try_from(exp)
            .ok()
            .and_then(|e| base.checked_pow(e))
            .ok_or(Fault::Overflow("**")),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::dsl::lexer::lex;
    use crate::dsl::parser::parse;
    use crate::dsl::typeck::analyze;
    use crate::model::Canvas;
    use crate::theme::Theme;

    const RED: Color = Color::rgb(255, 0, 0);
    const BLUE: Color = Color::rgb(0, 0, 255);

    fn compile(src: &str) -> Program {
        let (tokens, lex_errors) = lex(src);
        assert!(lex_errors.is_empty(), "{lex_errors:?}");
        let (program, parse_errors) = parse(tokens);
        assert!(parse_errors.is_empty(), "{parse_errors:?}");
        let errors = analyze(&program);
        assert!(errors.is_empty(), "{errors:?}");
        program
    }

    fn run_on(src: &str, canvas: &mut Canvas) -> Result<RunReport, RuntimeError> {
        interpret(&compile(src), canvas, None, &InterpreterOptions::default())
    }

    fn run(src: &str) -> (Canvas, RunReport) {
        let mut canvas = Canvas::new(20, Color::WHITE);
        let report = run_on(src, &mut canvas).unwrap();
        (canvas, report)
    }

    fn fault(src: &str) -> (Canvas, RuntimeError) {
        let mut canvas = Canvas::new(20, Color::WHITE);
        let err = run_on(src, &mut canvas).unwrap_err();
        (canvas, err)
    }

    fn count(canvas: &Canvas, color: Color) -> usize {
        canvas.pixels().iter().filter(|&&c| c == color).count()
    }

    #[test]
    fn draw_line_paints_and_moves_pointer() {
        let (canvas, report) = run("Spawn(0, 0)\nColor(\"red\")\nDrawLine(1, 0, 5)");
        for x in 0..5 {
            assert_eq!(canvas.pixel(x, 0), Some(RED));
        }
        assert_eq!(canvas.pixel(5, 0), Some(Color::WHITE));
        assert_eq!(count(&canvas, RED), 5);
        assert_eq!(report.pointer, Some((4, 0)));
    }

    #[test]
    fn draw_line_off_canvas_faults_after_partial_paint() {
        let (canvas, err) = fault("Spawn(17, 0)\nColor(\"red\")\nDrawLine(1, 0, 5)");
        assert_eq!(err.fault, Fault::LineLeftCanvas { x: 19, y: 0 });
        assert_eq!(err.line, 3);
        assert_eq!(count(&canvas, RED), 3);
    }

    #[test]
    fn draw_line_argument_checks() {
        let (_, err) = fault("Spawn(5, 5)\nDrawLine(0, 0, 3)");
        assert_eq!(err.fault, Fault::ZeroDirection);
        let (_, err) = fault("Spawn(5, 5)\nDrawLine(2, 0, 3)");
        assert!(matches!(err.fault, Fault::InvalidDirection { .. }));
        let (_, err) = fault("Spawn(5, 5)\nDrawLine(1, 0, 0)");
        assert!(matches!(err.fault, Fault::NonPositive { what: "distance", .. }));
    }

    #[test]
    fn default_brush_paints_nothing() {
        let (canvas, report) = run("Spawn(0, 0)\nDrawLine(1, 1, 5)\nFill()");
        assert_eq!(count(&canvas, Color::WHITE), 400);
        assert_eq!(report.brush_color, Color::TRANSPARENT);
        assert_eq!(report.pointer, Some((4, 4)));
    }

    #[test]
    fn brush_size_forced_odd() {
        let (_, report) = run("Spawn(0, 0)\nSize(4)");
        assert_eq!(report.brush_size, 3);
        let (_, report) = run("Spawn(0, 0)\nSize(1)\nb <- IsBrushSize(1)");
        assert_eq!(report.brush_size, 1);
        let (_, err) = fault("Spawn(0, 0)\nSize(-1)");
        assert_eq!(err.fault, Fault::NonPositiveBrush);
        let (_, err) = fault("Spawn(0, 0)\nSize(0)");
        assert_eq!(err.fault, Fault::NonPositiveBrush);
    }

    #[test]
    fn thick_brush_stamps_square() {
        let (canvas, _) = run("Spawn(5, 5)\nColor(\"blue\")\nSize(3)\nDrawLine(1, 0, 1)");
        assert_eq!(count(&canvas, BLUE), 9);
        assert_eq!(canvas.pixel(4, 4), Some(BLUE));
        assert_eq!(canvas.pixel(6, 6), Some(BLUE));
    }

    #[test]
    fn spawn_bounds() {
        let (_, err) = fault("Spawn(20, 0)");
        assert_eq!(err.fault, Fault::PositionOutside { command: "Spawn", x: 20, y: 0, last: 19 });
        assert_eq!(err.to_string(), "[Line 1:1] Execution Error: Spawn position (20,0) is outside the canvas bounds (0 to 19).");
        let (_, err) = fault("Spawn(0, 0)\nMoveTo(-1, 3)");
        assert!(matches!(err.fault, Fault::PositionOutside { command: "MoveTo", .. }));
    }

    #[test]
    fn move_to_repositions_without_painting() {
        let (canvas, report) = run("Spawn(0, 0)\nColor(\"red\")\nMoveTo(7, 9)");
        assert_eq!(count(&canvas, RED), 0);
        assert_eq!(report.pointer, Some((7, 9)));
    }

    #[test]
    fn invalid_color_faults() {
        let (_, err) = fault("Spawn(0, 0)\nColor(\"chartreuse\")");
        assert_eq!(err.fault, Fault::InvalidColor("chartreuse".into()));
        let (_, err) = fault("Spawn(0, 0)\nb <- IsBrushColor(\"nope\")");
        assert_eq!(err.fault, Fault::InvalidColor("nope".into()));
    }

    #[test]
    fn circle_center_and_symmetry() {
        let (canvas, report) = run("Spawn(10, 10)\nColor(\"red\")\nDrawCircle(1, 0, 5)");
        assert_eq!(report.pointer, Some((15, 10)));
        assert_eq!(canvas.pixel(15, 10), Some(Color::WHITE));
        assert_eq!(canvas.pixel(10, 10), Some(RED));
        assert_eq!(canvas.pixel(15, 5), Some(RED));
        for x in 0..20_i64 {
            for y in 0..20_i64 {
                if canvas.pixel(x, y) == Some(RED) {
                    let (ox, oy) = (x - 15, y - 10);
                    assert!(ox * ox + oy * oy <= 36);
                    assert_eq!(canvas.pixel(x, 10 - oy), Some(RED));
                    if 15 - ox < 20 {
                        assert_eq!(canvas.pixel(15 - ox, y), Some(RED));
                    }
                }
            }
        }
    }

    #[test]
    fn circle_with_zero_direction_centers_on_pointer() {
        let (canvas, report) = run("Spawn(10, 10)\nColor(\"red\")\nDrawCircle(0, 0, 3)");
        assert_eq!(report.pointer, Some((10, 10)));
        assert_eq!(count(&canvas, RED), 12);
    }

    #[test]
    fn circle_center_off_canvas_faults() {
        let (_, err) = fault("Spawn(18, 10)\nDrawCircle(1, 0, 5)");
        assert_eq!(err.fault, Fault::CenterOutside { command: "DrawCircle", x: 23, y: 10 });
        let (_, err) = fault("Spawn(10, 10)\nDrawCircle(1, 0, 0)");
        assert!(matches!(err.fault, Fault::NonPositive { what: "radius", .. }));
    }

    #[test]
    fn rectangle_outline_and_pointer() {
        let (canvas, report) = run("Spawn(5, 5)\nColor(\"red\")\nDrawRectangle(1, 0, 3, 5, 3)");
        assert_eq!(report.pointer, Some((8, 5)));
        assert_eq!(count(&canvas, RED), 12);
        assert_eq!(canvas.pixel(8, 5), Some(Color::WHITE));
        assert_eq!(canvas.pixel(6, 4), Some(RED));
        assert_eq!(canvas.pixel(10, 6), Some(RED));
    }

    #[test]
    fn rectangle_argument_checks() {
        let (_, err) = fault("Spawn(5, 5)\nDrawRectangle(0, 0, -1, 3, 3)");
        assert_eq!(err.fault, Fault::NegativeDistance);
        let (_, err) = fault("Spawn(5, 5)\nDrawRectangle(0, 0, 0, 0, 3)");
        assert!(matches!(err.fault, Fault::NonPositive { what: "width", .. }));
        let (_, err) = fault("Spawn(5, 5)\nDrawRectangle(0, 0, 0, 3, 0)");
        assert!(matches!(err.fault, Fault::NonPositive { what: "height", .. }));
    }

    fn small(src: &str) -> (Canvas, RunReport) {
        let mut canvas = Canvas::new(10, Color::WHITE);
        let report = run_on(src, &mut canvas).unwrap();
        (canvas, report)
    }

    fn red_cells(canvas: &Canvas) -> Vec<(i64, i64)> {
        (0..10)
            .flat_map(|y| (0..10).map(move |x| (x, y)))
            .filter(|&(x, y)| canvas.pixel(x, y) == Some(RED))
            .collect()
    }

    #[test]
    fn brush_larger_than_canvas_is_clipped() {
        let (canvas, report) = small("Spawn(5, 5)\nColor(\"red\")\nSize(9223372036854775807)\nDrawLine(1, 0, 1)");
        assert_eq!(count(&canvas, RED), 100);
        assert_eq!(report.brush_size, i64::MAX);

        let (canvas, _) = small("Spawn(0, 0)\nColor(\"red\")\nSize(20001)\nMoveTo(9, 9)\nDrawLine(-1, 0, 1)");
        assert_eq!(count(&canvas, RED), 100);
    }

    #[test]
    fn rectangle_larger_than_canvas_is_clipped() {
        let (canvas, report) =
            small("Spawn(5, 5)\nColor(\"red\")\nSize(3)\nDrawRectangle(0, 0, 0, 1000000000000, 3)");
        assert_eq!(report.pointer, Some((5, 5)));
        let cells = red_cells(&canvas);
        assert_eq!(cells.len(), 50);
        assert!(cells.iter().all(|&(_, y)| (3..=7).contains(&y)));

        let (canvas, _) = small("Spawn(5, 5)\nColor(\"red\")\nDrawRectangle(0, 0, 0, 3, 1000000000000)");
        let cells = red_cells(&canvas);
        assert_eq!(cells.len(), 20);
        assert!(cells.iter().all(|&(x, _)| x == 4 || x == 6));
    }

    #[test]
    fn circle_larger_than_canvas_is_clipped() {
        let (canvas, report) = small("Spawn(5, 5)\nColor(\"red\")\nDrawCircle(0, 0, 1000000000)");
        assert_eq!(count(&canvas, RED), 0);
        assert_eq!(report.pointer, Some((5, 5)));

        let (canvas, _) = small("Spawn(0, 0)\nColor(\"red\")\nSize(9)\nDrawCircle(0, 0, 16)");
        let mut expected = Canvas::new(10, Color::WHITE);
        for (ox, oy) in raster::circle_points(16) {
            raster::stamp(&mut expected, ox, oy, 9, RED);
        }
        assert!(count(&expected, RED) > 0);
        assert_eq!(canvas, expected);

        let (canvas, _) = small("Spawn(0, 0)\nColor(\"red\")\nDrawCircle(0, 0, 12)");
        let expected: Vec<_> = raster::circle_points(12)
            .into_iter()
            .filter(|&(x, y)| (0..10).contains(&x) && (0..10).contains(&y))
            .collect();
        let mut cells = red_cells(&canvas);
        cells.sort_unstable();
        assert_eq!(cells, expected);
    }

    #[test]
    fn fill_repaints_component_then_no_op() {
        let src = "Spawn(0, 0)\nColor(\"black\")\nMoveTo(10, 0)\nDrawLine(0, 1, 20)\nMoveTo(0, 0)\nColor(\"red\")\nFill()";
        let (canvas, _) = run(src);
        assert_eq!(count(&canvas, RED), 200);
        assert_eq!(count(&canvas, Color::BLACK), 20);
        assert_eq!(canvas.pixel(11, 0), Some(Color::WHITE));

        let mut canvas = canvas;
        let before = canvas.clone();
        run_on("Spawn(0, 0)\nColor(\"red\")\nFill()", &mut canvas).unwrap();
        assert_eq!(canvas, before);
    }

    #[test]
    fn color_count_query() {
        let src = "Spawn(1, 1)\nColor(\"red\")\nDrawLine(1, 0, 1)\nMoveTo(3, 2)\nDrawLine(1, 0, 1)\nn <- GetColorCount(\"red\", 0, 0, 3, 3)\nm <- GetColorCount(\"red\", 50, 50, 60, 60)\nok <- n == 2 && m == 0\nend\nGoTo [end] (!ok)";
        let (_, report) = run(src);
        assert_eq!(report.steps, 10);
    }

    #[test]
    fn canvas_color_query_offsets_and_bounds() {
        let src = "Spawn(5, 5)\nColor(\"red\")\nDrawLine(1, 0, 1)\nMoveTo(4, 3)\na <- IsCanvasColor(\"red\", 2, 1)\nb <- IsCanvasColor(\"white\", -10, 0)\nc <- IsCanvasColor(\"white\", 0, 0)\nfail\nGoTo [fail] (!a || b || !c)";
        let (_, report) = run(src);
        assert_eq!(report.steps, 9);
    }

    #[test]
    fn pointer_queries() {
        let src = "Spawn(3, 4)\nx <- GetActualX() * 10 + GetActualY()\nMoveTo(x - 30, GetCanvasSize() - 1)";
        let (_, report) = run(src);
        assert_eq!(report.pointer, Some((4, 19)));
    }

    #[test]
    fn brush_color_query_is_approximate() {
        let theme = Theme::new("t").with_color("almostred", Color::rgb(253, 1, 0));
        let program = compile("Spawn(0, 0)\nColor(\"red\")\nok <- IsBrushColor(\"almostred\")\nl\nGoTo [l] (!ok)");
        let mut canvas = Canvas::new(4, Color::WHITE);
        let report = interpret(&program, &mut canvas, Some(&theme), &InterpreterOptions::default()).unwrap();
        assert_eq!(report.steps, 5);
    }

    #[test]
    fn theme_colors_resolve_before_palette() {
        let theme = Theme::new("t").with_color("red", Color::rgb(9, 9, 9));
        let program = compile("Spawn(0, 0)\nColor(\"red\")\nDrawLine(1, 0, 1)");
        let mut canvas = Canvas::new(4, Color::WHITE);
        interpret(&program, &mut canvas, Some(&theme), &InterpreterOptions::default()).unwrap();
        assert_eq!(canvas.pixel(0, 0), Some(Color::rgb(9, 9, 9)));
    }

    #[test]
    fn loop_runs_until_condition_fails() {
        let src = "Spawn(0, 0)\nColor(\"red\")\nn <- 0\nloop\nDrawLine(1, 0, 1)\nMoveTo(GetActualX() + 1, 0)\nn <- n + 1\nGoTo [loop] (n < 5)";
        let (canvas, report) = run(src);
        assert_eq!(count(&canvas, RED), 5);
        assert_eq!(report.pointer, Some((5, 0)));
    }

    #[test]
    fn goto_visit_limit_aborts() {
        let program = compile("Spawn(0, 0)\nspin\nGoTo [spin] (1 == 1)");
        let mut canvas = Canvas::new(4, Color::WHITE);
        let err = interpret(&program, &mut canvas, None, &InterpreterOptions { max_goto_visits: 50 }).unwrap_err();
        assert_eq!(err.fault, Fault::GoToLimit { label: "spin".into(), max: 50 });
        assert_eq!(err.line, 3);
    }

    #[test]
    fn goto_limit_counts_exact_visits() {
        let program = compile("Spawn(0, 0)\nn <- 0\ntop\nn <- n + 1\nGoTo [top] (n < 50)");
        let mut canvas = Canvas::new(4, Color::WHITE);
        assert!(interpret(&program, &mut canvas, None, &InterpreterOptions { max_goto_visits: 50 }).is_ok());
        assert!(interpret(&program, &mut canvas, None, &InterpreterOptions { max_goto_visits: 49 }).is_err());
    }

    #[test]
    fn arithmetic_semantics() {
        let src = "Spawn(0, 0)\na <- 7 / 2\nb <- -7 / 2\nc <- -7 % 3\nd <- 2 ** 3 ** 2\ne <- 2 ** -1\nf <- -1 ** 3\nok <- a == 3 && b == -3 && c == -1 && d == 512 && e == 0 && f == -1\nl\nGoTo [l] (!ok)";
        let (_, report) = run(src);
        assert_eq!(report.steps, 10);
    }

    #[test]
    fn division_and_modulo_by_zero() {
        let (_, err) = fault("Spawn(0, 0)\nx <- 1 / 0");
        assert_eq!(err.fault, Fault::DivisionByZero);
        assert_eq!(err.line, 2);
        let (_, err) = fault("Spawn(0, 0)\nx <- 1 % (2 - 2)");
        assert_eq!(err.fault, Fault::ModuloByZero);
        let (_, err) = fault("Spawn(0, 0)\nx <- 0 ** -2");
        assert_eq!(err.fault, Fault::DivisionByZero);
    }

    #[test]
    fn overflow_faults() {
        let (_, err) = fault("Spawn(0, 0)\nx <- 9223372036854775807 + 1");
        assert_eq!(err.fault, Fault::Overflow("+"));
        let (_, err) = fault("Spawn(0, 0)\nx <- 10 ** 40");
        assert_eq!(err.fault, Fault::Overflow("**"));
    }

    #[test]
    fn string_equality_is_case_sensitive() {
        let src = "Spawn(0, 0)\nsame <- \"Red\" == \"red\"\nl\nGoTo [l] (same)";
        let (_, report) = run(src);
        assert_eq!(report.steps, 4);
    }

    #[test]
    fn fault_keeps_earlier_paint() {
        let (canvas, err) = fault("Spawn(0, 0)\nColor(\"red\")\nDrawLine(1, 0, 3)\nx <- 1 / 0\nDrawLine(0, 1, 3)");
        assert_eq!(err.fault, Fault::DivisionByZero);
        assert_eq!(count(&canvas, RED), 3);
    }

    #[test]
    fn hand_built_program_faults_instead_of_panicking() {
        let span = Span::new(0, 1, 1, 1);
        let program = Program {
            statements: vec![
                Stmt { kind: StmtKind::Command { builtin: Builtin::Fill, args: vec![] }, span },
                Stmt { kind: StmtKind::Label("a".into()), span },
            ],
        };
        let mut canvas = Canvas::new(4, Color::WHITE);
        let err = interpret(&program, &mut canvas, None, &InterpreterOptions::default()).unwrap_err();
        assert_eq!(err.fault, Fault::NotSpawned);

        let program = Program {
            statements: vec![
                Stmt { kind: StmtKind::Label("a".into()), span },
                Stmt { kind: StmtKind::Label("a".into()), span },
            ],
        };
        let err = interpret(&program, &mut canvas, None, &InterpreterOptions::default()).unwrap_err();
        assert_eq!(err.fault, Fault::DuplicateLabel("a".into()));

        let program = Program {
            statements: vec![Stmt {
                kind: StmtKind::GoTo {
                    label: "missing".into(),
                    condition: Expr { kind: ExprKind::BoolLit(true), span },
                },
                span,
            }],
        };
        let err = interpret(&program, &mut canvas, None, &InterpreterOptions::default()).unwrap_err();
        assert_eq!(err.fault, Fault::UndefinedLabel("missing".into()));
    }

    #[test]
    fn runs_are_independent() {
        let program = compile("Spawn(0, 0)\nColor(\"red\")\nn <- 1\nDrawLine(1, 0, 2)");
        let mut a = Canvas::new(5, Color::WHITE);
        let mut b = Canvas::new(5, Color::WHITE);
        let ra = interpret(&program, &mut a, None, &InterpreterOptions::default()).unwrap();
        let rb = interpret(&program, &mut b, None, &InterpreterOptions::default()).unwrap();
        assert_eq!(ra, rb);
        assert_eq!(a, b);
    }
}

#[allow(
    clippy::indexing_slicing,
    clippy::wildcard_imports,
    clippy::cast_possible_truncation,
    clippy::single_match_else,
    clippy::needless_pass_by_value,
    clippy::module_name_repetitions,
)]
pub mod ast;
#[allow(
    clippy::indexing_slicing,
    clippy::wildcard_imports,
    clippy::cast_possible_truncation,
    clippy::single_match_else,
    clippy::needless_pass_by_value,
    clippy::module_name_repetitions,
)]
pub mod error;
#[allow(
    clippy::indexing_slicing,
    clippy::wildcard_imports,
    clippy::cast_possible_truncation,
    clippy::single_match_else,
    clippy::needless_pass_by_value,
    clippy::module_name_repetitions,
)]
pub mod lexer;
#[allow(
    clippy::indexing_slicing,
    clippy::wildcard_imports,
    clippy::cast_possible_truncation,
    clippy::single_match_else,
    clippy::needless_pass_by_value,
    clippy::module_name_repetitions,
)]
pub mod parser;
#[allow(
    clippy::indexing_slicing,
    clippy::wildcard_imports,
    clippy::cast_possible_truncation,
    clippy::single_match_else,
    clippy::needless_pass_by_value,
    clippy::module_name_repetitions,
)]
pub mod builtins;
#[allow(
    clippy::indexing_slicing,
    clippy::wildcard_imports,
    clippy::cast_possible_truncation,
    clippy::single_match_else,
    clippy::needless_pass_by_value,
    clippy::module_name_repetitions,
)]
pub mod typeck;
#[allow(
    clippy::wildcard_imports,
    clippy::single_match_else,
    clippy::module_name_repetitions,
)]
pub mod raster;
#[allow(
    clippy::wildcard_imports,
    clippy::single_match_else,
    clippy::needless_pass_by_value,
    clippy::module_name_repetitions,
)]
pub mod interpreter;

use thiserror::Error;

use crate::model::Surface;
use crate::theme::ColorResolver;
use ast::Program;
use error::CompileError;
use interpreter::{InterpreterOptions, RunReport, RuntimeError};

/// Compile a source string into a checked `Program`.
///
/// This is the front half of the pipeline: source → lex → parse → analyze.
/// Every phase runs even when an earlier one reported errors, so the caller
/// sees all lexical, parse and semantic errors at once, in that order.
pub fn compile_source(source: &str) -> Result<Program, Vec<CompileError>> {
    let (tokens, mut errors) = lexer::lex(source);
    let (program, parse_errors) = parser::parse(tokens);
    errors.extend(parse_errors);
    errors.extend(typeck::analyze(&program));
    if errors.is_empty() {
        Ok(program)
    } else {
        Err(errors)
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("{} compile error(s)", .0.len())]
    Compile(Vec<CompileError>),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// Compile and, if clean, execute `source` against `surface`.
pub fn run_source<S: Surface + ?Sized>(
    source: &str,
    surface: &mut S,
    resolver: Option<&dyn ColorResolver>,
    options: &InterpreterOptions,
) -> Result<RunReport, RunError> {
    let program = compile_source(source).map_err(RunError::Compile)?;
    Ok(interpreter::interpret(&program, surface, resolver, options)?)
}

//! Pixel Wall-E: a small line-oriented drawing language. Scripts move a
//! cursor ("Wall-E") over a square canvas and paint with a brush.
//!
//! The pipeline is lex → parse → analyze → interpret; see [`dsl::run_source`].

pub mod dsl;
pub mod model;
pub mod paths;
pub mod project;
pub mod settings;
pub mod theme;

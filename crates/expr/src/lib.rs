#![deny(unsafe_code)]
//! Random scalar expressions and the vector fields built from them.
//!
//! [`synthesize`] draws an (x, y) expression pair from a weighted
//! [`Grammar`]; [`compile`] turns the pair into a [`FieldFunction`] that
//! implements `VectorField`. Field source text (`dx = ...`, `dy = ...`)
//! round-trips through [`render_source`] and [`compile_source`].

pub mod ast;
pub mod compile;
pub mod grammar;
pub mod parse;
pub mod synth;

pub use ast::Expr;
pub use compile::{compile, compile_source, render_source, FieldFunction, MAX_DEPTH, MAX_NODES};
pub use grammar::{Grammar, ProbabilityTable, RuleClass};
pub use parse::{parse_expr, parse_source};
pub use synth::{synthesize, synthesize_with, Synthesizer};

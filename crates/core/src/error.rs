//! Error types for the flowfield core.

use thiserror::Error;

/// Errors produced by flowfield operations that callers are expected to handle.
///
/// Numeric anomalies inside the simulation (non-finite velocities, runaway
/// particles) are never reported through this type; they are absorbed where
/// they occur.
#[derive(Debug, Error)]
pub enum FlowError {
    /// Viewport width or height was zero or not finite.
    #[error("invalid dimensions: width and height must be positive and finite")]
    InvalidDimensions,

    /// A parameter existed but had the wrong JSON type.
    #[error("parameter type mismatch for '{name}': expected {expected}, got {got}")]
    ParamTypeMismatch {
        name: String,
        expected: String,
        got: String,
    },

    /// A color string could not be parsed.
    #[error("invalid color: {0}")]
    InvalidColor(String),

    /// The weighted grammar draw selected no rule. Signals a normalization bug.
    #[error("synthesis exhausted: rule probabilities sum to {mass}, no rule selected")]
    SynthesisExhausted { mass: f64 },

    /// A grammar was built without any terminal rule, so expansion could never stop.
    #[error("grammar has no terminal rule")]
    NoTerminalRule,

    /// Field source text could not be parsed.
    #[error("parse error at byte {position}: {message}")]
    Parse { position: usize, message: String },

    /// Field source parsed but could not be compiled into a field.
    #[error("compile error: {0}")]
    Compile(String),

    /// A share string could not be decoded.
    #[error("invalid share string: {0}")]
    InvalidShareString(String),

    /// A preset name was not recognized.
    #[error("unknown preset: {0}")]
    UnknownPreset(String),

    /// A saved function with this name already exists and overwrite was not requested.
    #[error("function record already exists: {0}")]
    RecordExists(String),

    /// No saved function with this name.
    #[error("function record not found: {0}")]
    RecordNotFound(String),

    /// Reading or writing a file failed.
    #[error("i/o error: {0}")]
    Io(String),
}

/// Failure of a single vector field evaluation.
///
/// Returned by [`VectorField::sample`](crate::field::VectorField::sample) and
/// absorbed by the field evaluator, which substitutes a zero vector.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldError {
    /// The field produced NaN or an infinite component.
    #[error("field produced a non-finite vector")]
    NonFinite,

    /// The field could not be evaluated at this point.
    #[error("field evaluation failed: {0}")]
    Failed(String),
}

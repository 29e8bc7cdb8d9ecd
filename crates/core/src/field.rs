//! The vector field contract shared by every base field.
//!
//! A [`VectorField`] maps a point in the field's own (normalized) domain to
//! a velocity. Implementations may fail or produce non-finite output; every
//! consumer validates the result.

use crate::error::FieldError;
use glam::DVec2;

/// A source of 2D velocity vectors.
///
/// Implementations must be deterministic: the same point yields the same
/// result on every call.
pub trait VectorField: Send + Sync {
    /// Sample the field at `point`.
    fn sample(&self, point: DVec2) -> Result<DVec2, FieldError>;
}

impl<F> VectorField for F
where
    F: Fn(DVec2) -> Result<DVec2, FieldError> + Send + Sync,
{
    fn sample(&self, point: DVec2) -> Result<DVec2, FieldError> {
        self(point)
    }
}

/// A field returning the same vector everywhere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantField(pub DVec2);

impl VectorField for ConstantField {
    fn sample(&self, _point: DVec2) -> Result<DVec2, FieldError> {
        Ok(self.0)
    }
}

//! Vector helpers applied at every combination boundary of the field math.
//!
//! Vectors are [`glam::DVec2`]. The helpers here never panic, including on
//! NaN inputs or NaN bounds, which `f64::clamp` would reject.

use crate::error::FlowError;
use glam::DVec2;

/// Returns `v` unchanged if both components are finite, otherwise zero.
pub fn finite_or_zero(v: DVec2) -> DVec2 {
    if v.is_finite() {
        v
    } else {
        DVec2::ZERO
    }
}

/// Clamps a scalar to `[-limit, limit]`. A non-finite `limit` leaves finite
/// values unbounded; NaN input maps to 0.
pub fn clamp_symmetric(value: f64, limit: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    let limit = limit.abs();
    if limit.is_nan() {
        return value;
    }
    value.max(-limit).min(limit)
}

/// Clamps each component of `v` to `[-limit, limit]`.
pub fn clamp_components(v: DVec2, limit: f64) -> DVec2 {
    DVec2::new(clamp_symmetric(v.x, limit), clamp_symmetric(v.y, limit))
}

/// Linear remap of `value` from `[in_min, in_max]` to `[out_min, out_max]`.
///
/// A degenerate input range maps everything to `out_min`.
pub fn remap(value: f64, in_min: f64, in_max: f64, out_min: f64, out_max: f64) -> f64 {
    let span = in_max - in_min;
    if span == 0.0 || !span.is_finite() {
        return out_min;
    }
    out_min + (out_max - out_min) * ((value - in_min) / span)
}

/// The visible drawing area in working (screen) coordinates.
///
/// The origin is the top-left corner; `width` and `height` are positive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    width: f64,
    height: f64,
}

impl Viewport {
    /// Creates a viewport, rejecting zero, negative, or non-finite sizes.
    pub fn new(width: f64, height: f64) -> Result<Self, FlowError> {
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(FlowError::InvalidDimensions);
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn size(&self) -> DVec2 {
        DVec2::new(self.width, self.height)
    }

    pub fn center(&self) -> DVec2 {
        self.size() * 0.5
    }

    /// True if `p` lies within the viewport grown by `margin` on every side.
    pub fn contains_with_margin(&self, p: DVec2, margin: f64) -> bool {
        p.x >= -margin
            && p.x <= self.width + margin
            && p.y >= -margin
            && p.y <= self.height + margin
    }
}

//! Field visualization: arrows sampled on a regular grid.

use flowfield_core::vector::remap;
use flowfield_core::{DVec2, Viewport};

/// Default spacing between grid samples, in working units.
pub const GRID_STEP: f64 = 60.0;
/// Samples at or below this magnitude are not drawn.
pub const MIN_MAGNITUDE: f64 = 0.5;
const LENGTH_FACTOR: f64 = 0.1;
const MIN_LENGTH: f64 = 3.0;
const MAX_LENGTH: f64 = 15.0;
const HEAD_SIZE: f64 = 2.0;
const HEAD_ANGLE: f64 = 0.4;

/// One drawable arrow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldArrow {
    pub origin: DVec2,
    pub tip: DVec2,
    pub magnitude: f64,
    /// Opacity in [0, 1].
    pub alpha: f64,
    /// Ends of the two arrowhead strokes, each drawn from `tip`.
    pub head: [DVec2; 2],
}

impl FieldArrow {
    /// Builds the arrow for vector `v` sampled at `origin`, or `None` if
    /// the vector is too weak or not finite.
    pub fn new(origin: DVec2, v: DVec2) -> Option<Self> {
        if !v.is_finite() {
            return None;
        }
        let magnitude = v.length();
        if magnitude <= MIN_MAGNITUDE {
            return None;
        }
        let length = (magnitude * LENGTH_FACTOR).max(MIN_LENGTH).min(MAX_LENGTH);
        let angle = v.y.atan2(v.x);
        let tip = origin + DVec2::from_angle(angle) * length;
        let head = [
            tip - DVec2::from_angle(angle - HEAD_ANGLE) * HEAD_SIZE,
            tip - DVec2::from_angle(angle + HEAD_ANGLE) * HEAD_SIZE,
        ];
        let alpha = (remap(magnitude, 0.0, 50.0, 20.0, 80.0) / 255.0).min(1.0);
        Some(Self {
            origin,
            tip,
            magnitude,
            alpha,
            head,
        })
    }
}

/// Samples `field` at every multiple of `step` inside the viewport and
/// returns the arrows worth drawing, row by row.
///
/// A non-positive or non-finite step yields no arrows.
pub fn sample_grid<F>(viewport: &Viewport, step: f64, field: F) -> Vec<FieldArrow>
where
    F: Fn(DVec2) -> DVec2,
{
    if !(step.is_finite() && step > 0.0) {
        return Vec::new();
    }
    let mut arrows = Vec::new();
    let mut y = 0.0;
    while y < viewport.height() {
        let mut x = 0.0;
        while x < viewport.width() {
            let origin = DVec2::new(x, y);
            if let Some(arrow) = FieldArrow::new(origin, field(origin)) {
                arrows.push(arrow);
            }
            x += step;
        }
        y += step;
    }
    arrows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weak_and_non_finite_vectors_are_skipped() {
        assert!(FieldArrow::new(DVec2::ZERO, DVec2::new(0.3, 0.3)).is_none());
        assert!(FieldArrow::new(DVec2::ZERO, DVec2::new(0.5, 0.0)).is_none());
        assert!(FieldArrow::new(DVec2::ZERO, DVec2::new(f64::NAN, 9.0)).is_none());
    }

    #[test]
    fn arrow_length_is_clamped() {
        let short = FieldArrow::new(DVec2::ZERO, DVec2::new(1.0, 0.0)).unwrap();
        assert!((short.tip - DVec2::new(3.0, 0.0)).length() < 1e-12);

        let mid = FieldArrow::new(DVec2::ZERO, DVec2::new(0.0, 100.0)).unwrap();
        assert!((mid.tip - DVec2::new(0.0, 10.0)).length() < 1e-12);

        let long = FieldArrow::new(DVec2::ZERO, DVec2::new(-400.0, 0.0)).unwrap();
        assert!((long.tip - DVec2::new(-15.0, 0.0)).length() < 1e-9);
    }

    #[test]
    fn alpha_follows_magnitude() {
        let a = FieldArrow::new(DVec2::ZERO, DVec2::new(50.0, 0.0)).unwrap();
        assert!((a.alpha - 80.0 / 255.0).abs() < 1e-12);
        let b = FieldArrow::new(DVec2::ZERO, DVec2::new(25.0, 0.0)).unwrap();
        assert!((b.alpha - 50.0 / 255.0).abs() < 1e-12);
        let c = FieldArrow::new(DVec2::ZERO, DVec2::new(0.0, 5000.0)).unwrap();
        assert_eq!(c.alpha, 1.0);
    }

    #[test]
    fn head_points_back_from_tip() {
        let a = FieldArrow::new(DVec2::new(10.0, 10.0), DVec2::new(30.0, 0.0)).unwrap();
        for end in a.head {
            assert!(end.x < a.tip.x);
            assert!((end.distance(a.tip) - 2.0).abs() < 1e-12);
        }
        assert!(a.head[0].y > a.tip.y && a.head[1].y < a.tip.y);
    }

    #[test]
    fn grid_covers_viewport_at_step() {
        let vp = Viewport::new(180.0, 120.0).unwrap();
        let arrows = sample_grid(&vp, 60.0, |_| DVec2::new(10.0, 0.0));
        assert_eq!(arrows.len(), 3 * 2);
        assert_eq!(arrows[0].origin, DVec2::ZERO);
        assert_eq!(arrows[5].origin, DVec2::new(120.0, 60.0));
    }

    #[test]
    fn bad_step_yields_nothing() {
        let vp = Viewport::new(100.0, 100.0).unwrap();
        for step in [0.0, -5.0, f64::NAN] {
            assert!(sample_grid(&vp, step, |_| DVec2::ONE * 10.0).is_empty());
        }
    }
}

//! A fading color buffer that particle trails and field arrows are
//! stroked into.

use flowfield_core::{DVec2, FlowError, Srgb};
use flowfield_flow::{FieldArrow, SegmentSink, SegmentStyle};

/// Color of field arrows; their opacity comes from the arrow.
pub const ARROW_COLOR: Srgb = Srgb {
    r: 1.0,
    g: 1.0,
    b: 1.0,
};

/// Longest stroke, in pixels, that is rasterized step by step.
const MAX_STROKE_STEPS: f64 = 4096.0;

/// Row-major sRGB pixels, opaque, initially [`Srgb::BACKGROUND`].
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    width: usize,
    height: usize,
    pixels: Vec<Srgb>,
}

impl Raster {
    /// Returns `FlowError::InvalidDimensions` if either side is zero.
    pub fn new(width: usize, height: usize) -> Result<Self, FlowError> {
        if width == 0 || height == 0 {
            return Err(FlowError::InvalidDimensions);
        }
        let len = width
            .checked_mul(height)
            .ok_or(FlowError::InvalidDimensions)?;
        Ok(Self {
            width,
            height,
            pixels: vec![Srgb::BACKGROUND; len],
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[Srgb] {
        &self.pixels
    }

    /// Pixel at column `x`, row `y`, or `None` outside the raster.
    pub fn get(&self, x: usize, y: usize) -> Option<Srgb> {
        if x < self.width && y < self.height {
            Some(self.pixels[y * self.width + x])
        } else {
            None
        }
    }

    /// Resets every pixel to the background.
    pub fn clear(&mut self) {
        self.pixels.fill(Srgb::BACKGROUND);
    }

    /// Moves every pixel `amount` of the way toward the background.
    pub fn fade(&mut self, amount: f64) {
        if amount >= 1.0 {
            self.clear();
            return;
        }
        for p in &mut self.pixels {
            *p = p.lerp(Srgb::BACKGROUND, amount);
        }
    }

    /// Strokes a line with a square brush of side `width`, blending
    /// `color` over the existing pixels at `alpha`.
    ///
    /// Non-finite endpoints or widths draw nothing.
    pub fn stroke(&mut self, from: DVec2, to: DVec2, color: Srgb, width: f64, alpha: f64) {
        if !(from.is_finite() && to.is_finite() && width.is_finite() && width > 0.0) {
            return;
        }
        let span = to - from;
        let steps = span.x.abs().max(span.y.abs()).ceil().min(MAX_STROKE_STEPS) as usize;
        let half = (width / 2.0).max(0.5);
        for i in 0..=steps {
            let t = if steps == 0 {
                0.0
            } else {
                i as f64 / steps as f64
            };
            self.stamp(from + span * t, half, color, alpha);
        }
    }

    /// Strokes an arrow shaft and both head strokes.
    pub fn draw_arrow(&mut self, arrow: &FieldArrow) {
        self.stroke(arrow.origin, arrow.tip, ARROW_COLOR, 1.0, arrow.alpha);
        for end in arrow.head {
            self.stroke(arrow.tip, end, ARROW_COLOR, 1.0, arrow.alpha);
        }
    }

    /// Quantized RGBA8 bytes, alpha always 255.
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|c| {
                let [r, g, b] = c.to_rgb8();
                [r, g, b, 255u8]
            })
            .collect()
    }

    fn stamp(&mut self, center: DVec2, half: f64, color: Srgb, alpha: f64) {
        let (x0, x1) = span_clip(center.x, half, self.width);
        let (y0, y1) = span_clip(center.y, half, self.height);
        for y in y0..y1 {
            let row = y * self.width;
            for x in x0..x1 {
                let p = &mut self.pixels[row + x];
                *p = if alpha >= 1.0 { color } else { p.lerp(color, alpha) };
            }
        }
    }
}

/// Pixel range `[lo, hi)` covered by `[c - half, c + half]`, clipped to
/// `[0, limit)`.
fn span_clip(c: f64, half: f64, limit: usize) -> (usize, usize) {
    let lo = (c - half).floor().max(0.0);
    let hi = (c + half).ceil().min(limit as f64);
    if hi <= lo {
        return (0, 0);
    }
    (lo as usize, hi as usize)
}

impl SegmentSink for Raster {
    fn segment(&mut self, from: DVec2, to: DVec2, style: &SegmentStyle) {
        self.stroke(from, to, style.color, style.width, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Srgb = Srgb {
        r: 1.0,
        g: 0.0,
        b: 0.0,
    };

    #[test]
    fn new_rejects_zero_dimensions() {
        assert!(matches!(Raster::new(0, 5), Err(FlowError::InvalidDimensions)));
        assert!(matches!(Raster::new(5, 0), Err(FlowError::InvalidDimensions)));
    }

    #[test]
    fn starts_as_background() {
        let raster = Raster::new(4, 3).unwrap();
        assert_eq!(raster.pixels().len(), 12);
        assert!(raster.pixels().iter().all(|&p| p == Srgb::BACKGROUND));
        assert_eq!(raster.get(4, 0), None);
    }

    #[test]
    fn fade_moves_toward_background() {
        let mut raster = Raster::new(1, 1).unwrap();
        raster.stroke(DVec2::new(0.5, 0.5), DVec2::new(0.5, 0.5), RED, 1.0, 1.0);
        assert_eq!(raster.get(0, 0), Some(RED));
        raster.fade(0.1);
        let p = raster.get(0, 0).unwrap();
        assert!((p.r - (1.0 + (Srgb::BACKGROUND.r - 1.0) * 0.1)).abs() < 1e-12);
        assert!((p.b - Srgb::BACKGROUND.b * 0.1).abs() < 1e-12);
        for _ in 0..300 {
            raster.fade(0.1);
        }
        let p = raster.get(0, 0).unwrap();
        assert!((p.r - Srgb::BACKGROUND.r).abs() < 1e-9);
    }

    #[test]
    fn full_fade_clears_exactly() {
        let mut raster = Raster::new(2, 2).unwrap();
        raster.stroke(DVec2::new(0.5, 0.5), DVec2::new(1.5, 1.5), RED, 1.0, 1.0);
        raster.fade(1.0);
        assert!(raster.pixels().iter().all(|&p| p == Srgb::BACKGROUND));
    }

    #[test]
    fn horizontal_stroke_covers_its_row() {
        let mut raster = Raster::new(20, 10).unwrap();
        raster.stroke(DVec2::new(2.5, 5.5), DVec2::new(12.5, 5.5), RED, 1.0, 1.0);
        for x in 2..13 {
            assert_eq!(raster.get(x, 5), Some(RED), "x = {x}");
        }
        assert_eq!(raster.get(15, 5), Some(Srgb::BACKGROUND));
        assert_eq!(raster.get(7, 1), Some(Srgb::BACKGROUND));
    }

    #[test]
    fn wide_stroke_is_thicker() {
        let mut thin = Raster::new(20, 20).unwrap();
        let mut wide = Raster::new(20, 20).unwrap();
        let (a, b) = (DVec2::new(3.5, 10.5), DVec2::new(15.5, 10.5));
        thin.stroke(a, b, RED, 1.5, 1.0);
        wide.stroke(a, b, RED, 4.5, 1.0);
        let painted = |r: &Raster| r.pixels().iter().filter(|&&p| p == RED).count();
        assert!(painted(&wide) > painted(&thin));
    }

    #[test]
    fn partial_alpha_blends() {
        let mut raster = Raster::new(3, 3).unwrap();
        raster.stroke(DVec2::new(1.5, 1.5), DVec2::new(1.5, 1.5), RED, 1.0, 0.5);
        let p = raster.get(1, 1).unwrap();
        assert!((p.r - (Srgb::BACKGROUND.r + 1.0) / 2.0).abs() < 1e-12);
    }

    #[test]
    fn degenerate_strokes_are_ignored() {
        let mut raster = Raster::new(8, 8).unwrap();
        let before = raster.clone();
        raster.stroke(DVec2::new(f64::NAN, 1.0), DVec2::ONE, RED, 2.0, 1.0);
        raster.stroke(DVec2::ONE, DVec2::new(3.0, f64::INFINITY), RED, 2.0, 1.0);
        raster.stroke(DVec2::ONE, DVec2::new(3.0, 3.0), RED, 0.0, 1.0);
        raster.stroke(DVec2::new(-50.0, -50.0), DVec2::new(-40.0, -45.0), RED, 2.0, 1.0);
        assert_eq!(raster, before);
    }

    #[test]
    fn arrows_draw_shaft_and_head() {
        let mut raster = Raster::new(40, 40).unwrap();
        let arrow = FieldArrow::new(DVec2::new(10.5, 20.5), DVec2::new(100.0, 0.0)).unwrap();
        raster.draw_arrow(&arrow);
        let shaft = raster.get(14, 20).unwrap();
        assert!(shaft.r > Srgb::BACKGROUND.r);
        assert_eq!(raster.get(35, 5), Some(Srgb::BACKGROUND));
    }

    #[test]
    fn segment_sink_strokes_opaque() {
        let mut raster = Raster::new(10, 10).unwrap();
        let style = SegmentStyle {
            color: RED,
            width: 1.5,
        };
        raster.segment(DVec2::new(1.5, 1.5), DVec2::new(6.5, 1.5), &style);
        assert_eq!(raster.get(4, 1), Some(RED));
    }

    #[test]
    fn rgba8_has_opaque_alpha() {
        let raster = Raster::new(3, 2).unwrap();
        let bytes = raster.to_rgba8();
        assert_eq!(bytes.len(), 3 * 2 * 4);
        assert_eq!(&bytes[..4], &[8, 12, 20, 255]);
        assert!(bytes.chunks(4).all(|px| px[3] == 255));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn strokes_never_panic(
                ax in -1e6_f64..1e6, ay in -1e6_f64..1e6,
                bx in -1e6_f64..1e6, by in -1e6_f64..1e6,
                width in 0.0_f64..10.0,
                alpha in 0.0_f64..=1.0,
            ) {
                let mut raster = Raster::new(16, 16).unwrap();
                raster.stroke(DVec2::new(ax, ay), DVec2::new(bx, by), RED, width, alpha);
                prop_assert_eq!(raster.pixels().len(), 256);
            }
        }
    }
}

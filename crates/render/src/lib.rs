#![deny(unsafe_code)]
//! CPU rendering for flowfield.
//!
//! A [`Raster`] receives particle trail segments through `SegmentSink`,
//! fades toward the background between frames by `1 - decay`, and can
//! overlay field arrows. [`expose`] runs an engine for a number of ticks into a raster;
//! [`snapshot::write_png`] saves the result.

pub mod raster;

#[cfg(feature = "png")]
pub mod snapshot;

pub use raster::Raster;

use flowfield_flow::{FlowEngine, GRID_STEP};

/// Per-frame fade toward the background for a long-exposure `decay`, the
/// fraction of the previous frame that persists.
pub fn fade_amount(decay: f64) -> f64 {
    (1.0 - decay).max(0.0).min(1.0)
}

/// Advances `engine` by `ticks` steps of `delta_ms`, fading the raster and
/// drawing the particles after each one. When the engine's configuration
/// asks for it, field arrows are drawn over the final frame.
pub fn expose(engine: &mut FlowEngine, raster: &mut Raster, ticks: usize, delta_ms: f64) {
    let fade = fade_amount(engine.config().decay);
    for _ in 0..ticks {
        raster.fade(fade);
        engine.tick(delta_ms);
        engine.draw(raster);
    }
    if engine.config().show_field {
        for arrow in engine.sample_field(GRID_STEP) {
            raster.draw_arrow(&arrow);
        }
    }
    tracing::debug!(
        ticks,
        frame = engine.frame(),
        particles = engine.system().len(),
        "exposed raster"
    );
}

//! The field evaluator: a total function from a working-space point to a
//! bounded, finite velocity.
//!
//! The base field is sampled in a normalized domain centered on the
//! viewport. Whatever it returns (an error, NaN, an infinity, a huge value)
//! is reduced to a vector within `base_clamp`. Perturbation layers are then
//! added, scaled by the breathing oscillator, and the sum is scaled by the
//! activity oscillator and clamped to `output_clamp`.

use crate::base_field::noise_coord;
use crate::config::EvaluatorConfig;
use flowfield_core::vector::{clamp_components, remap};
use flowfield_core::{DVec2, VectorField, Viewport};
use noise::{NoiseFn, OpenSimplex};

/// Per-call inputs that change every frame.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext {
    pub time_secs: f64,
    /// `None` is treated as the viewport center.
    pub pointer: Option<DVec2>,
    pub viewport: Viewport,
}

impl EvalContext {
    pub fn new(time_secs: f64, pointer: Option<DVec2>, viewport: Viewport) -> Self {
        Self {
            time_secs,
            pointer,
            viewport,
        }
    }
}

/// Wraps a base field with normalization, guards, and perturbations.
pub struct FieldEvaluator {
    config: EvaluatorConfig,
    noise: OpenSimplex,
}

impl FieldEvaluator {
    pub fn new(config: EvaluatorConfig, noise_seed: u32) -> Self {
        Self {
            config,
            noise: OpenSimplex::new(noise_seed),
        }
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: EvaluatorConfig) {
        self.config = config;
    }

    /// Maps a working-space point into the base field's domain.
    pub fn normalize(&self, point: DVec2, viewport: &Viewport) -> DVec2 {
        (point - viewport.center()) / (viewport.size() * self.config.coordinate_scale())
    }

    /// Samples `base` at the normalized point, substituting zero for any
    /// failure and clamping each component to `base_clamp`.
    pub fn base_vector(
        &self,
        point: DVec2,
        base: Option<&dyn VectorField>,
        viewport: &Viewport,
    ) -> DVec2 {
        let Some(field) = base else {
            return DVec2::ZERO;
        };
        let v = field
            .sample(self.normalize(point, viewport))
            .ok()
            .filter(|v| v.is_finite())
            .unwrap_or(DVec2::ZERO);
        clamp_components(v, self.config.base_clamp)
    }

    /// Evaluates the full field at `point`. Always finite and within
    /// `output_clamp` on each axis.
    pub fn evaluate(
        &self,
        point: DVec2,
        base: Option<&dyn VectorField>,
        ctx: &EvalContext,
    ) -> DVec2 {
        let cfg = &self.config;
        let t = ctx.time_secs;

        let base = self.base_vector(point, base, &ctx.viewport);
        let perturbation = self.perturbation(point, ctx);
        let breathe = cfg.breathe.value(t);
        let activity = cfg.activity.value(t) * cfg.activity_gain * cfg.flow_intensity;

        // Overflowed components saturate at the bound; only NaN becomes 0.
        let v = (base + perturbation * breathe) * activity;
        clamp_components(v, cfg.output_clamp)
    }

    /// Sum of drift, noise octaves, waves, and the pointer term.
    pub fn perturbation(&self, point: DVec2, ctx: &EvalContext) -> DVec2 {
        let cfg = &self.config;
        let t = ctx.time_secs;
        let mut total = cfg.drift;

        for octave in &cfg.octaves {
            let amp = octave.amplitude * cfg.noise_gain;
            if amp == 0.0 {
                continue;
            }
            let p = point * octave.frequency;
            let z = t * octave.time_rate + octave.time_offset;
            total += DVec2::new(
                self.noise3(p.x, p.y, z),
                self.noise3(p.x + 100.0, p.y + 100.0, z),
            ) * amp;
        }

        let waves = &cfg.waves;
        if waves.amplitude != 0.0 {
            total += DVec2::new(
                (point.y * waves.frequency + t * waves.speed).sin(),
                (point.x * waves.frequency * 1.3 + t * waves.speed * 0.7).cos(),
            ) * waves.amplitude;
        }

        if cfg.pointer.influence != 0.0 {
            total += self.pointer_term(point, ctx);
        }
        total
    }

    /// Attraction toward the pointer plus a noise-modulated perpendicular
    /// swirl, weakening linearly with distance.
    fn pointer_term(&self, point: DVec2, ctx: &EvalContext) -> DVec2 {
        let pc = &self.config.pointer;
        let t = ctx.time_secs;
        let pointer = ctx.pointer.unwrap_or_else(|| ctx.viewport.center());

        let dist = point.distance(pointer);
        let max_range = ctx.viewport.width().min(ctx.viewport.height()) * pc.range_factor;
        let modulation = self.noise01_2d(t * 0.3, dist * 0.01) * 0.5 + 0.5;
        let strength = remap(
            dist.max(0.0).min(max_range),
            0.0,
            max_range,
            0.9 * modulation,
            0.1 * modulation,
        );

        let attract = (pointer - point) * pc.attraction;
        let swirl = self.noise01_3d(t * 0.5, point.x * 0.001, point.y * 0.001) * 2.0 - 1.0;
        let perpendicular = attract.perp() * (0.5 + swirl * pc.swirl);

        (attract + perpendicular) * strength * pc.influence
    }

    fn noise3(&self, a: f64, b: f64, c: f64) -> f64 {
        self.noise.get([noise_coord(a), noise_coord(b), noise_coord(c)])
    }

    fn noise01_2d(&self, a: f64, b: f64) -> f64 {
        (self.noise.get([noise_coord(a), noise_coord(b)]) + 1.0) / 2.0
    }

    fn noise01_3d(&self, a: f64, b: f64, c: f64) -> f64 {
        (self.noise3(a, b, c) + 1.0) / 2.0
    }
}

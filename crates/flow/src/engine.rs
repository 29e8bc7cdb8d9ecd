//! The simulation context.
//!
//! [`FlowEngine`] owns everything one running toy needs: viewport,
//! configuration, the evaluator, the active base field with its seed, the
//! particle pool, the RNG that feeds spawns, the pointer, and a frame
//! counter. Every operation goes through it; there is no global state.

use crate::base_field::BaseField;
use crate::config::FlowConfig;
use crate::evaluator::{EvalContext, FieldEvaluator};
use crate::grid::{sample_grid, FieldArrow};
use crate::simulation::{ParticleSystem, SegmentSink};
use flowfield_core::{
    DVec2, FlowError, FunctionRecord, ShareParams, VectorField, Viewport, Xorshift64,
};
use flowfield_expr::{compile, parse_source};
use serde_json::Value;

const PARTICLE_STREAM: u64 = 0x7061_7274;

/// Noise seed for the evaluator's perturbation layers.
fn noise_seed(seed: u64) -> u32 {
    (seed ^ (seed >> 32)) as u32
}

pub struct FlowEngine {
    viewport: Viewport,
    config: FlowConfig,
    evaluator: FieldEvaluator,
    field: Option<BaseField>,
    seed: Option<u64>,
    system: ParticleSystem,
    rng: Xorshift64,
    pointer: Option<DVec2>,
    frame: u64,
}

impl FlowEngine {
    /// Builds an engine with a field generated from `seed`.
    pub fn new(viewport: Viewport, config: FlowConfig, seed: u64) -> Result<Self, FlowError> {
        let mut field_rng = Xorshift64::seeded(seed);
        let field = BaseField::generate(config.strategy, &mut field_rng)?;
        let mut rng = field_rng.fork(PARTICLE_STREAM);
        let system = ParticleSystem::new(config.particles.clone(), viewport, &mut rng);
        Ok(Self {
            viewport,
            evaluator: FieldEvaluator::new(config.evaluator.clone(), noise_seed(seed)),
            config,
            field,
            seed: Some(seed),
            system,
            rng,
            pointer: None,
            frame: 0,
        })
    }

    /// Rebuilds the field and tunables a share string describes on top of
    /// `base`.
    pub fn from_share(
        viewport: Viewport,
        base: &FlowConfig,
        share: &ShareParams,
    ) -> Result<Self, FlowError> {
        Self::new(viewport, base.with_share(share), share.seed)
    }

    /// Replaces the field with one generated from `seed` and resets the
    /// particles. On error nothing changes.
    pub fn new_field(&mut self, seed: u64) -> Result<(), FlowError> {
        let mut field_rng = Xorshift64::seeded(seed);
        let field = BaseField::generate(self.config.strategy, &mut field_rng)?;
        if field.is_none() {
            tracing::warn!(seed, "field did not compile, using zero base field");
        }
        tracing::debug!(
            seed,
            strategy = self.config.strategy.name(),
            nodes = field.as_ref().map(node_count).unwrap_or(0),
            "new field"
        );
        self.field = field;
        self.seed = Some(seed);
        self.evaluator = FieldEvaluator::new(self.config.evaluator.clone(), noise_seed(seed));
        self.rng = field_rng.fork(PARTICLE_STREAM);
        self.system.reset(&mut self.rng);
        Ok(())
    }

    /// Replaces the field with one compiled from source text and resets
    /// the particles. On error the current field is kept.
    pub fn load_source(&mut self, code: &str) -> Result<(), FlowError> {
        let (x, y) = parse_source(code).inspect_err(|e| {
            tracing::warn!(error = %e, "rejected field source");
        })?;
        let function = compile(x, y).ok_or_else(|| {
            FlowError::Compile("expression pair exceeds the size or depth limit".into())
        })?;
        tracing::debug!(nodes = function.node_count(), "loaded field source");
        self.field = Some(BaseField::Function(function));
        self.seed = None;
        self.system.reset(&mut self.rng);
        Ok(())
    }

    /// Drops the base field. Perturbations keep moving the particles.
    pub fn clear_field(&mut self) {
        self.field = None;
        self.seed = None;
    }

    /// Advances the simulation by `delta_ms`.
    pub fn tick(&mut self, delta_ms: f64) {
        let ctx = self.context();
        let evaluator = &self.evaluator;
        let base = self.field.as_ref().map(|f| f as &dyn VectorField);
        self.system
            .tick(delta_ms, |p| evaluator.evaluate(p, base, &ctx), &mut self.rng);
        self.frame += 1;
    }

    /// Adds `count` particles around the pointer, or the viewport center
    /// when no pointer is set.
    pub fn spawn_burst(&mut self, count: usize) {
        let center = self.pointer.unwrap_or_else(|| self.viewport.center());
        self.system.spawn_burst(center, count, &mut self.rng);
    }

    pub fn set_pointer(&mut self, pointer: Option<DVec2>) {
        self.pointer = pointer.filter(|p| p.is_finite());
    }

    /// Field velocity at `point` at the current simulation time.
    pub fn velocity_at(&self, point: DVec2) -> DVec2 {
        let base = self.field.as_ref().map(|f| f as &dyn VectorField);
        self.evaluator.evaluate(point, base, &self.context())
    }

    /// Field arrows on a grid with spacing `step`.
    pub fn sample_field(&self, step: f64) -> Vec<FieldArrow> {
        sample_grid(&self.viewport, step, |p| self.velocity_at(p))
    }

    pub fn draw<S: SegmentSink + ?Sized>(&self, sink: &mut S) {
        self.system.draw(sink);
    }

    /// Share parameters for the current state, if the field came from a seed.
    pub fn share_params(&self) -> Option<ShareParams> {
        self.seed.map(|seed| ShareParams {
            seed,
            particle_count: self.config.particles.count,
            flow_intensity: self.config.evaluator.flow_intensity,
            scale: self.config.evaluator.scale,
            decay: self.config.decay,
        })
    }

    /// A saveable record of the current field, if it has source text.
    pub fn record(&self, name: &str) -> Option<FunctionRecord> {
        self.source().map(|code| FunctionRecord::new(name, code))
    }

    pub fn reset_particles(&mut self) {
        self.system.reset(&mut self.rng);
    }

    /// Applies a new configuration. The field is kept; a strategy change
    /// takes effect on the next [`FlowEngine::new_field`].
    pub fn set_config(&mut self, config: FlowConfig) {
        self.evaluator.set_config(config.evaluator.clone());
        self.system.set_config(config.particles.clone());
        self.config = config;
    }

    /// Current tunables as flat JSON.
    pub fn params(&self) -> Value {
        self.config.params()
    }

    pub fn param_schema(&self) -> Value {
        self.config.param_schema()
    }

    /// Applies JSON overrides; see [`FlowConfig::with_overrides`].
    pub fn set_params(&mut self, params: &Value) -> Result<(), FlowError> {
        let config = self.config.with_overrides(params)?;
        self.set_config(config);
        Ok(())
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    pub fn field(&self) -> Option<&BaseField> {
        self.field.as_ref()
    }

    /// Source text of the active field, if it is a function field.
    pub fn source(&self) -> Option<&str> {
        self.field.as_ref().and_then(BaseField::source)
    }

    /// Seed of the active field; `None` after loading source text.
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn system(&self) -> &ParticleSystem {
        &self.system
    }

    pub fn pointer(&self) -> Option<DVec2> {
        self.pointer
    }

    /// Ticks since construction.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    fn context(&self) -> EvalContext {
        EvalContext::new(self.system.clock_ms() / 1000.0, self.pointer, self.viewport)
    }
}

fn node_count(field: &BaseField) -> usize {
    match field {
        BaseField::Function(f) => f.node_count(),
        BaseField::NoisyFunction(nf) => nf.function.node_count(),
        BaseField::Noise(_) => 0,
    }
}

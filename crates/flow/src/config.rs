//! Typed configuration for the evaluator, the particle simulator, and the
//! engine that combines them.
//!
//! Every struct has a `Default` matching the `organic` preset. A
//! [`FlowConfig`] can report its tunable values as flat JSON via
//! [`FlowConfig::params`], describe them via [`FlowConfig::param_schema`],
//! and accept overrides in the same shape via [`FlowConfig::with_overrides`].

use flowfield_core::params::{
    check_types, param_bool, param_f64, param_f64_in, param_string, param_usize,
};
use flowfield_core::{DVec2, FlowError, ShareParams};
use serde_json::{json, Value};

/// Reference frame duration in milliseconds; a tick of this length is one
/// normalized time step.
pub const REFERENCE_FRAME_MS: f64 = 16.67;

/// User scale at which the coordinate multiplier is 1.
pub const NEUTRAL_SCALE: f64 = 5.0;

/// Bounds applied to tunables arriving from JSON overrides or share strings.
pub const MAX_PARTICLES: usize = 20_000;
pub const FLOW_RANGE: (f64, f64) = (0.0, 20.0);
pub const SCALE_RANGE: (f64, f64) = (0.1, 50.0);
pub const DECAY_RANGE: (f64, f64) = (0.0, 1.0);

/// `value` clamped to `range`; NaN becomes the lower bound.
fn clamp_to(value: f64, range: (f64, f64)) -> f64 {
    value.max(range.0).min(range.1)
}

/// One layer of coherent-noise drift.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseOctave {
    /// Spatial frequency applied to working coordinates.
    pub frequency: f64,
    pub amplitude: f64,
    /// How fast the layer sweeps through the noise's time axis.
    pub time_rate: f64,
    /// Offset along the time axis separating this layer from the others.
    pub time_offset: f64,
}

/// Paired sinusoids of position and time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveConfig {
    pub frequency: f64,
    pub speed: f64,
    pub amplitude: f64,
}

/// A slow sinusoid between `low` and `high`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Oscillator {
    pub low: f64,
    pub high: f64,
    /// Angular rate in radians per second.
    pub rate: f64,
}

impl Oscillator {
    pub const fn new(low: f64, high: f64, rate: f64) -> Self {
        Self { low, high, rate }
    }

    /// A constant oscillator.
    pub const fn fixed(value: f64) -> Self {
        Self::new(value, value, 0.0)
    }

    pub fn value(&self, time_secs: f64) -> f64 {
        let mid = (self.low + self.high) / 2.0;
        let half = (self.high - self.low) / 2.0;
        mid + half * (time_secs * self.rate).sin()
    }
}

/// Attraction toward, and swirl around, the pointer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerConfig {
    /// Overall multiplier; 0 disables the pointer term.
    pub influence: f64,
    /// Attraction per pixel of offset.
    pub attraction: f64,
    /// Falloff range as a multiple of the viewport's shorter side.
    pub range_factor: f64,
    /// Strength of noise modulation on the perpendicular component.
    pub swirl: f64,
}

impl Default for PointerConfig {
    fn default() -> Self {
        Self {
            influence: 1.0,
            attraction: 0.0005,
            range_factor: 2.0,
            swirl: 0.3,
        }
    }
}

/// Field evaluator settings.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatorConfig {
    /// Coordinate scale at [`NEUTRAL_SCALE`].
    pub base_scale: f64,
    /// User-facing zoom; larger values cover a wider domain.
    pub scale: f64,
    /// Component bound on the raw base vector.
    pub base_clamp: f64,
    /// Component bound on the final vector.
    pub output_clamp: f64,
    /// Constant perturbation added everywhere.
    pub drift: DVec2,
    pub octaves: Vec<NoiseOctave>,
    /// Multiplier on every octave amplitude.
    pub noise_gain: f64,
    pub waves: WaveConfig,
    pub breathe: Oscillator,
    pub activity: Oscillator,
    pub activity_gain: f64,
    pub flow_intensity: f64,
    pub pointer: PointerConfig,
}

impl EvaluatorConfig {
    /// `scale / 5`, or 1 when the scale is not a positive finite number.
    pub fn scale_multiplier(&self) -> f64 {
        if self.scale.is_finite() && self.scale > 0.0 {
            self.scale / NEUTRAL_SCALE
        } else {
            1.0
        }
    }

    pub fn coordinate_scale(&self) -> f64 {
        self.base_scale / self.scale_multiplier()
    }

    /// A configuration with every perturbation layer off and unit activity.
    pub fn unperturbed() -> Self {
        Self {
            drift: DVec2::ZERO,
            octaves: Vec::new(),
            waves: WaveConfig {
                amplitude: 0.0,
                ..WaveConfig::default()
            },
            breathe: Oscillator::fixed(1.0),
            activity: Oscillator::fixed(1.0),
            activity_gain: 1.0,
            flow_intensity: 1.0,
            pointer: PointerConfig {
                influence: 0.0,
                ..PointerConfig::default()
            },
            ..Self::default()
        }
    }
}

impl Default for WaveConfig {
    fn default() -> Self {
        Self {
            frequency: 0.01,
            speed: 0.5,
            amplitude: 0.3,
        }
    }
}

/// Slow sweep, medium turbulence, fast fine detail.
pub fn organic_octaves() -> Vec<NoiseOctave> {
    vec![
        NoiseOctave { frequency: 0.002, amplitude: 0.8, time_rate: 0.05, time_offset: 0.0 },
        NoiseOctave { frequency: 0.006, amplitude: 0.4, time_rate: 0.15, time_offset: 100.0 },
        NoiseOctave { frequency: 0.015, amplitude: 0.15, time_rate: 0.4, time_offset: 200.0 },
    ]
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            base_scale: 0.005,
            scale: NEUTRAL_SCALE,
            base_clamp: 10.0,
            output_clamp: 60.0,
            drift: DVec2::ZERO,
            octaves: organic_octaves(),
            noise_gain: 1.0,
            waves: WaveConfig::default(),
            breathe: Oscillator::new(0.4, 1.0, 0.15),
            activity: Oscillator::new(0.6, 1.0, 0.1),
            activity_gain: 8.0,
            flow_intensity: 4.0,
            pointer: PointerConfig::default(),
        }
    }
}

/// Particle simulator settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleConfig {
    /// Target population.
    pub count: usize,
    /// Maximum trail samples per particle.
    pub trail_length: usize,
    /// Trail samples older than this are evicted.
    pub trail_max_age_ms: f64,
    pub speed_range: (f64, f64),
    pub life_range: (f64, f64),
    pub burst_speed_range: (f64, f64),
    pub burst_life_range: (f64, f64),
    /// Half-width of the square a burst scatters particles over.
    pub burst_jitter: f64,
    /// Fraction of `velocity * speed` applied per normalized step.
    pub step_scale: f64,
    /// Per-axis step above which a particle is treated as unstable.
    pub max_delta: f64,
    /// Distance outside the viewport at which particles are culled.
    pub cull_margin: f64,
    /// Life lost per normalized step.
    pub life_decay: f64,
    /// Pool ceiling as a multiple of the target.
    pub ceiling_factor: usize,
}

impl ParticleConfig {
    /// Largest pool size tolerated at a tick boundary.
    pub fn ceiling(&self) -> usize {
        self.ceiling_factor.max(1) * self.count.max(1)
    }
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            count: 1000,
            trail_length: 5,
            trail_max_age_ms: 1500.0,
            speed_range: (0.6, 2.5),
            life_range: (0.7, 1.0),
            burst_speed_range: (0.8, 3.0),
            burst_life_range: (0.8, 1.0),
            burst_jitter: 20.0,
            step_scale: 0.5,
            max_delta: 60.0,
            cull_margin: 100.0,
            life_decay: 0.001,
            ceiling_factor: 3,
        }
    }
}

/// Which kind of base field a "new field" request builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldStrategy {
    /// A synthesized expression pair.
    Function,
    /// Multi-octave gradient noise mapped to a direction.
    Noise,
    /// Component-wise product of a noise field and a function field.
    NoisyFunction,
    /// One of the three, chosen by the field seed.
    Random,
}

impl FieldStrategy {
    pub const ALL: [FieldStrategy; 4] = [
        FieldStrategy::Function,
        FieldStrategy::Noise,
        FieldStrategy::NoisyFunction,
        FieldStrategy::Random,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FieldStrategy::Function => "function",
            FieldStrategy::Noise => "noise",
            FieldStrategy::NoisyFunction => "noisy_function",
            FieldStrategy::Random => "random",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowConfig {
    pub particles: ParticleConfig,
    pub evaluator: EvaluatorConfig,
    pub strategy: FieldStrategy,
    /// Long-exposure decay carried in share strings.
    pub decay: f64,
    /// Whether renderers should overlay field arrows.
    pub show_field: bool,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            particles: ParticleConfig::default(),
            evaluator: EvaluatorConfig::default(),
            strategy: FieldStrategy::Function,
            decay: 0.95,
            show_field: false,
        }
    }
}

impl FlowConfig {
    /// Current tunable values as a flat JSON object.
    pub fn params(&self) -> Value {
        let ev = &self.evaluator;
        json!({
            "particle_count": self.particles.count,
            "trail_length": self.particles.trail_length,
            "trail_max_age_ms": self.particles.trail_max_age_ms,
            "flow_intensity": ev.flow_intensity,
            "scale": ev.scale,
            "decay": self.decay,
            "pointer_influence": ev.pointer.influence,
            "noise_gain": ev.noise_gain,
            "wave_amplitude": ev.waves.amplitude,
            "drift_x": ev.drift.x,
            "drift_y": ev.drift.y,
            "strategy": self.strategy.name(),
            "show_field": self.show_field,
        })
    }

    pub fn param_schema(&self) -> Value {
        json!({
            "particle_count": {
                "type": "integer",
                "default": self.particles.count,
                "min": 0,
                "max": MAX_PARTICLES,
                "description": "Target particle population"
            },
            "trail_length": {
                "type": "integer",
                "default": self.particles.trail_length,
                "min": 0,
                "max": 500,
                "description": "Maximum trail samples per particle"
            },
            "trail_max_age_ms": {
                "type": "number",
                "default": self.particles.trail_max_age_ms,
                "min": 0.0,
                "max": 60000.0,
                "description": "Trail samples older than this many milliseconds are dropped"
            },
            "flow_intensity": {
                "type": "number",
                "default": self.evaluator.flow_intensity,
                "min": FLOW_RANGE.0,
                "max": FLOW_RANGE.1,
                "description": "Multiplier on the final field vector"
            },
            "scale": {
                "type": "number",
                "default": self.evaluator.scale,
                "min": SCALE_RANGE.0,
                "max": SCALE_RANGE.1,
                "description": "Coordinate zoom; 5 is neutral"
            },
            "decay": {
                "type": "number",
                "default": self.decay,
                "min": DECAY_RANGE.0,
                "max": DECAY_RANGE.1,
                "description": "Long-exposure decay"
            },
            "pointer_influence": {
                "type": "number",
                "default": self.evaluator.pointer.influence,
                "min": 0.0,
                "max": 10.0,
                "description": "Strength of pointer attraction and swirl"
            },
            "noise_gain": {
                "type": "number",
                "default": self.evaluator.noise_gain,
                "min": 0.0,
                "max": 10.0,
                "description": "Multiplier on every noise octave amplitude"
            },
            "wave_amplitude": {
                "type": "number",
                "default": self.evaluator.waves.amplitude,
                "min": 0.0,
                "max": 10.0,
                "description": "Amplitude of the periodic wave terms"
            },
            "drift_x": {
                "type": "number",
                "default": self.evaluator.drift.x,
                "min": -10.0,
                "max": 10.0,
                "description": "Constant horizontal drift"
            },
            "drift_y": {
                "type": "number",
                "default": self.evaluator.drift.y,
                "min": -10.0,
                "max": 10.0,
                "description": "Constant vertical drift"
            },
            "strategy": {
                "type": "string",
                "default": self.strategy.name(),
                "description": "Base field kind: function, noise, noisy_function or random"
            },
            "show_field": {
                "type": "boolean",
                "default": self.show_field,
                "description": "Overlay field arrows"
            }
        })
    }

    /// Returns a copy with values from `params` applied on top of `self`.
    ///
    /// Keys are those of [`FlowConfig::params`]; unknown keys are ignored.
    /// A known key with the wrong JSON type, or an unknown strategy name,
    /// is an error. Numeric values are clamped to the schema range.
    pub fn with_overrides(&self, params: &Value) -> Result<Self, FlowError> {
        check_types(params, &self.param_schema())?;

        let strategy_name = param_string(params, "strategy", self.strategy.name());
        let strategy = FieldStrategy::from_name(&strategy_name).ok_or_else(|| {
            FlowError::ParamTypeMismatch {
                name: "strategy".into(),
                expected: "function|noise|noisy_function|random".into(),
                got: strategy_name.clone(),
            }
        })?;

        let mut out = self.clone();
        out.strategy = strategy;
        out.show_field = param_bool(params, "show_field", self.show_field);
        out.decay = clamp_to(param_f64(params, "decay", self.decay), DECAY_RANGE);

        let p = &mut out.particles;
        p.count = param_usize(params, "particle_count", p.count).min(MAX_PARTICLES);
        p.trail_length = param_usize(params, "trail_length", p.trail_length).min(500);
        p.trail_max_age_ms =
            param_f64_in(params, "trail_max_age_ms", p.trail_max_age_ms, 0.0, 60_000.0);

        let ev = &mut out.evaluator;
        ev.flow_intensity = clamp_to(
            param_f64(params, "flow_intensity", ev.flow_intensity),
            FLOW_RANGE,
        );
        ev.scale = clamp_to(param_f64(params, "scale", ev.scale), SCALE_RANGE);
        ev.pointer.influence =
            param_f64_in(params, "pointer_influence", ev.pointer.influence, 0.0, 10.0);
        ev.noise_gain = param_f64_in(params, "noise_gain", ev.noise_gain, 0.0, 10.0);
        ev.waves.amplitude = param_f64_in(params, "wave_amplitude", ev.waves.amplitude, 0.0, 10.0);
        ev.drift = DVec2::new(
            param_f64_in(params, "drift_x", ev.drift.x, -10.0, 10.0),
            param_f64_in(params, "drift_y", ev.drift.y, -10.0, 10.0),
        );
        Ok(out)
    }

    /// Applies the tunable fields of a share string, clamped to the same
    /// bounds as [`FlowConfig::with_overrides`].
    pub fn with_share(&self, share: &ShareParams) -> Self {
        let mut out = self.clone();
        out.particles.count = share.particle_count.min(MAX_PARTICLES);
        out.evaluator.flow_intensity = clamp_to(share.flow_intensity, FLOW_RANGE);
        out.evaluator.scale = clamp_to(share.scale, SCALE_RANGE);
        out.decay = clamp_to(share.decay, DECAY_RANGE);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oscillator_spans_low_to_high() {
        let osc = Oscillator::new(0.4, 1.0, 0.15);
        let quarter = std::f64::consts::FRAC_PI_2 / 0.15;
        assert!((osc.value(0.0) - 0.7).abs() < 1e-12);
        assert!((osc.value(quarter) - 1.0).abs() < 1e-12);
        assert!((osc.value(-quarter) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn fixed_oscillator_is_exact() {
        let osc = Oscillator::fixed(1.0);
        for t in [0.0, 1.3, 1000.0] {
            assert_eq!(osc.value(t), 1.0);
        }
    }

    #[test]
    fn scale_multiplier_falls_back_for_bad_scale() {
        let mut ev = EvaluatorConfig::default();
        assert_eq!(ev.scale_multiplier(), 1.0);
        assert_eq!(ev.coordinate_scale(), 0.005);
        ev.scale = 10.0;
        assert_eq!(ev.scale_multiplier(), 2.0);
        assert_eq!(ev.coordinate_scale(), 0.0025);
        ev.scale = 0.0;
        assert_eq!(ev.scale_multiplier(), 1.0);
        ev.scale = f64::NAN;
        assert_eq!(ev.scale_multiplier(), 1.0);
    }

    #[test]
    fn ceiling_is_three_times_target() {
        let mut p = ParticleConfig::default();
        assert_eq!(p.ceiling(), 3000);
        p.count = 0;
        assert_eq!(p.ceiling(), 3);
    }

    #[test]
    fn strategy_names_round_trip() {
        for s in FieldStrategy::ALL {
            assert_eq!(FieldStrategy::from_name(s.name()), Some(s));
        }
        assert_eq!(FieldStrategy::from_name("spiral"), None);
    }

    #[test]
    fn params_and_schema_cover_same_keys() {
        let config = FlowConfig::default();
        let params = config.params();
        let schema = config.param_schema();
        let keys: Vec<&String> = params.as_object().unwrap().keys().collect();
        for key in &keys {
            assert!(schema.get(key.as_str()).is_some(), "schema missing {key}");
            assert!(schema[key.as_str()].get("type").is_some());
            assert!(schema[key.as_str()].get("default").is_some());
        }
        assert_eq!(keys.len(), schema.as_object().unwrap().len());
    }

    #[test]
    fn overrides_apply_and_clamp() {
        let config = FlowConfig::default()
            .with_overrides(&json!({
                "particle_count": 250,
                "flow_intensity": 99.0,
                "strategy": "noise",
                "show_field": true,
                "drift_x": 1,
                "unrelated": [1, 2, 3],
            }))
            .unwrap();
        assert_eq!(config.particles.count, 250);
        assert_eq!(config.evaluator.flow_intensity, 20.0);
        assert_eq!(config.strategy, FieldStrategy::Noise);
        assert!(config.show_field);
        assert_eq!(config.evaluator.drift, DVec2::new(1.0, 0.0));
        assert_eq!(config.params()["particle_count"], 250);
    }

    #[test]
    fn overrides_reject_wrong_types_and_unknown_strategy() {
        let base = FlowConfig::default();
        assert!(matches!(
            base.with_overrides(&json!({"particle_count": "many"})),
            Err(FlowError::ParamTypeMismatch { .. })
        ));
        assert!(base.with_overrides(&json!({"strategy": "spiral"})).is_err());
    }

    #[test]
    fn share_fields_replace_tunables() {
        let share = ShareParams {
            seed: 9,
            particle_count: 42,
            flow_intensity: 2.5,
            scale: 7.0,
            decay: 0.5,
        };
        let config = FlowConfig::default().with_share(&share);
        assert_eq!(config.particles.count, 42);
        assert_eq!(config.evaluator.flow_intensity, 2.5);
        assert_eq!(config.evaluator.scale, 7.0);
        assert_eq!(config.decay, 0.5);
    }

    #[test]
    fn share_fields_are_clamped() {
        let share = ShareParams {
            seed: 7,
            particle_count: usize::MAX,
            flow_intensity: -1e300,
            scale: 0.0,
            decay: -5.0,
        };
        let config = FlowConfig::default().with_share(&share);
        assert_eq!(config.particles.count, MAX_PARTICLES);
        assert_eq!(config.evaluator.flow_intensity, 0.0);
        assert_eq!(config.evaluator.scale, 0.1);
        assert_eq!(config.decay, 0.0);

        let decoded = ShareParams::decode("7,18446744073709551615,1e308,99,NaN").unwrap();
        let config = FlowConfig::default().with_share(&decoded);
        assert_eq!(config.particles.count, MAX_PARTICLES);
        assert_eq!(config.evaluator.flow_intensity, 20.0);
        assert_eq!(config.evaluator.scale, 50.0);
        assert!((0.0..=1.0).contains(&config.decay));
    }

    #[test]
    fn unperturbed_disables_every_layer() {
        let ev = EvaluatorConfig::unperturbed();
        assert!(ev.octaves.is_empty());
        assert_eq!(ev.waves.amplitude, 0.0);
        assert_eq!(ev.pointer.influence, 0.0);
        assert_eq!(ev.drift, DVec2::ZERO);
        assert_eq!(ev.activity_gain * ev.flow_intensity, 1.0);
    }
}

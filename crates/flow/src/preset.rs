//! Named configurations over the one parameterized engine.

use crate::config::{EvaluatorConfig, FlowConfig, Oscillator, ParticleConfig, WaveConfig};
use flowfield_core::{DVec2, FlowError};

pub const PRESET_NAMES: [&str; 6] = ["classic", "organic", "calm", "storm", "streamlines", "field"];

impl FlowConfig {
    /// Looks up a preset by name.
    pub fn preset(name: &str) -> Result<Self, FlowError> {
        match name {
            "classic" => Ok(classic()),
            "organic" => Ok(FlowConfig::default()),
            "calm" => Ok(calm()),
            "storm" => Ok(storm()),
            "streamlines" => Ok(streamlines()),
            "field" => Ok(field()),
            other => Err(FlowError::UnknownPreset(other.to_string())),
        }
    }
}

/// Constant diagonal drift over the function field, without noise,
/// waves, or oscillation.
fn classic() -> FlowConfig {
    FlowConfig {
        particles: ParticleConfig {
            count: 1000,
            trail_length: 3,
            ..ParticleConfig::default()
        },
        evaluator: EvaluatorConfig {
            drift: DVec2::ONE,
            octaves: Vec::new(),
            waves: WaveConfig {
                amplitude: 0.0,
                ..WaveConfig::default()
            },
            breathe: Oscillator::fixed(1.0),
            activity: Oscillator::fixed(1.0),
            activity_gain: 1.0,
            flow_intensity: 4.0,
            ..EvaluatorConfig::default()
        },
        ..FlowConfig::default()
    }
}

fn calm() -> FlowConfig {
    let mut config = FlowConfig::default();
    config.particles.count = 600;
    config.particles.trail_length = 8;
    config.particles.speed_range = (0.4, 1.5);
    config.evaluator.flow_intensity = 2.0;
    config.evaluator.noise_gain = 0.5;
    config.evaluator.waves.amplitude = 0.15;
    config.evaluator.pointer.influence = 0.5;
    config.decay = 0.98;
    config
}

fn storm() -> FlowConfig {
    let mut config = FlowConfig::default();
    config.particles.count = 2500;
    config.particles.trail_length = 4;
    config.particles.speed_range = (1.0, 3.5);
    config.evaluator.flow_intensity = 8.0;
    config.evaluator.noise_gain = 2.0;
    config.evaluator.waves.amplitude = 0.8;
    config.evaluator.pointer.influence = 2.0;
    config.decay = 0.85;
    config
}

/// Few long-lived particles drawing long trails.
fn streamlines() -> FlowConfig {
    let mut config = FlowConfig::default();
    config.particles.count = 200;
    config.particles.trail_length = 60;
    config.particles.trail_max_age_ms = 6000.0;
    config.particles.life_decay = 0.0002;
    config.evaluator.flow_intensity = 3.0;
    config.evaluator.noise_gain = 0.3;
    config
}

/// The bare base field drawn as arrows.
fn field() -> FlowConfig {
    FlowConfig {
        particles: ParticleConfig {
            count: 0,
            ..ParticleConfig::default()
        },
        evaluator: EvaluatorConfig::unperturbed(),
        show_field: true,
        ..FlowConfig::default()
    }
}

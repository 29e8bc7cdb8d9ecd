//! Compact share strings.
//!
//! A [`ShareParams`] captures what is needed to rebuild an equivalent field
//! and simulation configuration: the synthesis seed plus the user-tunable
//! parameters. Encoded form: `seed,particleCount,flowIntensity,scale,decay`.
//! Particle positions are not part of it.

use crate::error::FlowError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Particle count used when a share string carries an unreadable count.
pub const FALLBACK_PARTICLE_COUNT: usize = 300;
/// Flow intensity used when a share string carries an unreadable value.
pub const FALLBACK_FLOW_INTENSITY: f64 = 4.0;
/// Coordinate scale used when a share string carries an unreadable value.
pub const FALLBACK_SCALE: f64 = 4.0;
/// Long-exposure decay used when a share string carries an unreadable value.
pub const FALLBACK_DECAY: f64 = 0.95;

/// Seed plus tunable parameters, round-trippable through a short string.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShareParams {
    pub seed: u64,
    pub particle_count: usize,
    pub flow_intensity: f64,
    pub scale: f64,
    pub decay: f64,
}

impl ShareParams {
    /// Share parameters for `seed` with every other field at its fallback.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            seed,
            particle_count: FALLBACK_PARTICLE_COUNT,
            flow_intensity: FALLBACK_FLOW_INTENSITY,
            scale: FALLBACK_SCALE,
            decay: FALLBACK_DECAY,
        }
    }

    /// Encodes as `seed,particleCount,flowIntensity,scale,decay`.
    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// Decodes a share string.
    ///
    /// Accepts an optional leading `#`, the legacy seed-only form, and the
    /// five-field form. In the five-field form only the seed is mandatory;
    /// other unreadable fields fall back to the `FALLBACK_*` constants.
    pub fn decode(input: &str) -> Result<Self, FlowError> {
        let input = input.trim();
        let input = input.strip_prefix('#').unwrap_or(input);
        if input.is_empty() {
            return Err(FlowError::InvalidShareString("empty".into()));
        }

        if !input.contains(',') {
            return parse_seed(input).map(Self::from_seed);
        }

        let fields: Vec<&str> = input.split(',').map(str::trim).collect();
        if fields.len() < 5 {
            return Err(FlowError::InvalidShareString(format!(
                "expected 5 comma-separated fields, got {}",
                fields.len()
            )));
        }

        Ok(Self {
            seed: parse_seed(fields[0])?,
            particle_count: fields[1].parse().unwrap_or(FALLBACK_PARTICLE_COUNT),
            flow_intensity: parse_finite(fields[2]).unwrap_or(FALLBACK_FLOW_INTENSITY),
            scale: parse_finite(fields[3]).unwrap_or(FALLBACK_SCALE),
            decay: parse_finite(fields[4]).unwrap_or(FALLBACK_DECAY),
        })
    }
}

fn parse_seed(field: &str) -> Result<u64, FlowError> {
    field
        .parse::<u64>()
        .map_err(|e| FlowError::InvalidShareString(format!("seed '{field}': {e}")))
}

fn parse_finite(field: &str) -> Option<f64> {
    field.parse::<f64>().ok().filter(|v| v.is_finite())
}

impl fmt::Display for ShareParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{}",
            self.seed, self.particle_count, self.flow_intensity, self.scale, self.decay
        )
    }
}

impl FromStr for ShareParams {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

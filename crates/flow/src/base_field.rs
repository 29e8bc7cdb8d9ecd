//! Base fields a "new field" request can build.
//!
//! Besides synthesized expression pairs there are gradient-noise fields
//! (a multi-octave scalar mapped to a direction) and noisy functions (the
//! component-wise product of the two). All are reproducible from a seed.

use crate::config::FieldStrategy;
use flowfield_core::{DVec2, FieldError, FlowError, VectorField, Xorshift64};
use flowfield_expr::{compile, synthesize, FieldFunction};
use noise::{NoiseFn, Perlin};

/// Noise coordinates at or beyond this magnitude are wrapped into
/// `[0, NOISE_WRAP)` before sampling; the samplers' lattice indices must
/// fit an `isize`.
pub const NOISE_WRAP: f64 = 1.0e9;

/// Maps any coordinate into the range the noise samplers accept. Non-finite
/// coordinates become 0.
pub fn noise_coord(c: f64) -> f64 {
    if !c.is_finite() {
        0.0
    } else if c.abs() < NOISE_WRAP {
        c
    } else {
        c.rem_euclid(NOISE_WRAP)
    }
}

/// How a noise scalar becomes a vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseVariant {
    /// `(cos(n*f), sin(n*f))`
    Angle,
    /// `(tan(n*f), sin(n*f))`
    Tangent,
}

/// Multi-octave Perlin noise mapped through a [`NoiseVariant`].
pub struct NoiseField {
    perlin: Perlin,
    octaves: u32,
    frequency: f64,
    variant: NoiseVariant,
}

impl NoiseField {
    pub fn new(noise_seed: u32, octaves: u32, frequency: f64, variant: NoiseVariant) -> Self {
        Self {
            perlin: Perlin::new(noise_seed),
            octaves: octaves.max(1),
            frequency,
            variant,
        }
    }

    /// Draws 1 to 6 octaves, a frequency in [1, 21), and a variant.
    pub fn random(rng: &mut Xorshift64) -> Self {
        let noise_seed = rng.next_u64() as u32;
        let octaves = (rng.next_f64() * 5.0 + 1.0).round() as u32;
        let frequency = rng.next_range(1.0, 21.0);
        let variant = if rng.next_usize(2) == 0 {
            NoiseVariant::Angle
        } else {
            NoiseVariant::Tangent
        };
        Self::new(noise_seed, octaves, frequency, variant)
    }

    pub fn octaves(&self) -> u32 {
        self.octaves
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn variant(&self) -> NoiseVariant {
        self.variant
    }

    /// Octave sum in roughly [0, 1): each octave halves the weight and
    /// doubles the spatial frequency.
    pub fn scalar(&self, p: DVec2) -> f64 {
        let mut weight = 1.0;
        let mut k = 1.0;
        let mut sum = 0.0;
        for _ in 0..self.octaves {
            weight *= 0.5;
            let n = self.perlin.get([noise_coord(k * p.x), noise_coord(k * p.y)]);
            sum += weight * (1.0 + n) / 2.0;
            k *= 2.0;
        }
        sum
    }
}

impl VectorField for NoiseField {
    fn sample(&self, point: DVec2) -> Result<DVec2, FieldError> {
        let a = self.scalar(point) * self.frequency;
        let v = match self.variant {
            NoiseVariant::Angle => DVec2::new(a.cos(), a.sin()),
            NoiseVariant::Tangent => DVec2::new(a.tan(), a.sin()),
        };
        Ok(v)
    }
}

/// Component-wise product of a noise field and a function field.
pub struct NoisyFunctionField {
    pub noise: NoiseField,
    pub function: FieldFunction,
}

impl VectorField for NoisyFunctionField {
    fn sample(&self, point: DVec2) -> Result<DVec2, FieldError> {
        Ok(self.noise.sample(point)? * self.function.sample(point)?)
    }
}

/// The active base field.
pub enum BaseField {
    Function(FieldFunction),
    Noise(NoiseField),
    NoisyFunction(NoisyFunctionField),
}

impl BaseField {
    /// Builds a field for `strategy`.
    ///
    /// `Ok(None)` means the synthesized expressions did not compile; callers
    /// treat it as a zero field. Synthesis exhaustion is an error.
    pub fn generate(
        strategy: FieldStrategy,
        rng: &mut Xorshift64,
    ) -> Result<Option<BaseField>, FlowError> {
        let strategy = match strategy {
            FieldStrategy::Random => match rng.next_usize(3) {
                0 => FieldStrategy::Noise,
                1 => FieldStrategy::Function,
                _ => FieldStrategy::NoisyFunction,
            },
            other => other,
        };
        let field = match strategy {
            FieldStrategy::Noise => Some(BaseField::Noise(NoiseField::random(rng))),
            FieldStrategy::NoisyFunction => {
                let noise = NoiseField::random(rng);
                let (x, y) = synthesize(rng)?;
                compile(x, y).map(|function| {
                    BaseField::NoisyFunction(NoisyFunctionField { noise, function })
                })
            }
            _ => {
                let (x, y) = synthesize(rng)?;
                compile(x, y).map(BaseField::Function)
            }
        };
        tracing::debug!(
            strategy = strategy.name(),
            compiled = field.is_some(),
            "generated base field"
        );
        Ok(field)
    }

    /// Source text, for fields that are exactly reproducible from it.
    pub fn source(&self) -> Option<&str> {
        match self {
            BaseField::Function(f) => Some(f.source()),
            _ => None,
        }
    }

    pub fn kind(&self) -> FieldStrategy {
        match self {
            BaseField::Function(_) => FieldStrategy::Function,
            BaseField::Noise(_) => FieldStrategy::Noise,
            BaseField::NoisyFunction(_) => FieldStrategy::NoisyFunction,
        }
    }
}

impl VectorField for BaseField {
    fn sample(&self, point: DVec2) -> Result<DVec2, FieldError> {
        match self {
            BaseField::Function(f) => f.sample(point),
            BaseField::Noise(n) => n.sample(point),
            BaseField::NoisyFunction(nf) => nf.sample(point),
        }
    }
}

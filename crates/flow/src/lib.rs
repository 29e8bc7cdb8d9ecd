#![deny(unsafe_code)]
//! Particles advected through a perturbed vector field.
//!
//! A [`FlowEngine`] combines a base field (a synthesized expression pair,
//! gradient noise, or their product) with the [`FieldEvaluator`]'s
//! perturbation layers and drives a bounded [`ParticleSystem`] through the
//! result. Configuration comes from [`FlowConfig`] and its named presets.

pub mod base_field;
pub mod config;
pub mod engine;
pub mod evaluator;
pub mod grid;
pub mod particle;
pub mod preset;
pub mod simulation;

pub use base_field::{BaseField, NoiseField, NoiseVariant, NoisyFunctionField};
pub use config::{
    EvaluatorConfig, FieldStrategy, FlowConfig, NoiseOctave, Oscillator, ParticleConfig,
    PointerConfig, WaveConfig, REFERENCE_FRAME_MS,
};
pub use engine::FlowEngine;
pub use evaluator::{EvalContext, FieldEvaluator};
pub use grid::{sample_grid, FieldArrow, GRID_STEP};
pub use particle::{Particle, TrailBuffer, TrailPoint};
pub use preset::PRESET_NAMES;
pub use simulation::{ParticleSystem, SegmentSink, SegmentStyle, TickStats};

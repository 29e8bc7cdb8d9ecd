#![deny(unsafe_code)]
//! Core types for the flowfield generative toy.
//!
//! Provides the `FlowError`/`FieldError` taxonomy, the `VectorField` trait,
//! vector clamping helpers and `Viewport`, the `Xorshift64` PRNG, `Srgb`
//! particle colors, JSON parameter helpers, share-string encoding, and
//! saved function records.

pub mod color;
pub mod error;
pub mod field;
pub mod params;
pub mod prng;
pub mod record;
pub mod share;
pub mod vector;

pub use color::Srgb;
pub use error::{FieldError, FlowError};
pub use field::{ConstantField, VectorField};
pub use glam::DVec2;
pub use prng::Xorshift64;
pub use record::{FunctionLibrary, FunctionRecord};
pub use share::ShareParams;
pub use vector::Viewport;

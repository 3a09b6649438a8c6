//! Noise generation for terrain height fields.
//!
//! Provides one noise definition shared by the CPU sampler (Rust) and the
//! compute program (WGSL).

mod fractal;
mod lattice;

pub use fractal::{
    contributing_octaves, sample, NoisePrimitive, NoiseSampler, BASE_FREQUENCY, MAX_OCTAVES,
};
pub use lattice::{gradient_noise, hash_lattice, LatticeNoise};

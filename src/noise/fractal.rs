//! Multi-octave fractal accumulation over a coherent-noise primitive.

use ::noise::{NoiseFn, Perlin};

use super::lattice::gradient_noise;
use crate::error::Result;
use crate::params::ParameterSet;

/// Frequency of the first octave in domain units.
/// `ParameterSet::scale` already converts texels to domain units.
pub const BASE_FREQUENCY: f32 = 1.0;

/// Coherent-noise primitive used for every octave
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoisePrimitive {
    /// Hashed lattice gradient noise, mirrored bit-for-bit by the compute program
    #[default]
    Lattice,

    /// `noise` crate permutation-table Perlin. CPU only, no GPU counterpart.
    Perlin,
}

/// Hard cap on accumulated layers, reached only when neither the amplitude
/// nor the frequency ever leaves the normal f32 range
pub const MAX_OCTAVES: u32 = 1024;

/// Number of leading octaves that can still change the sum.
///
/// Stops at the first layer whose amplitude or frequency is zero, subnormal
/// or non-finite; every later layer would add nothing or poison the sum with
/// NaN. The compute program receives this count instead of `params.octaves`.
pub fn contributing_octaves(params: &ParameterSet) -> u32 {
    let requested = (params.octaves.max(0) as u32).min(MAX_OCTAVES);
    let mut amplitude = 1.0f32;
    let mut frequency = BASE_FREQUENCY;
    let mut count = 0;

    while count < requested && amplitude.is_normal() && frequency.is_normal() {
        count += 1;
        amplitude *= params.persistence;
        frequency *= params.lacunarity;
    }
    count
}

/// Beyond this magnitude a Perlin layer reads as flat
const PERLIN_DOMAIN_LIMIT: f32 = 2_147_483_648.0;

/// Per-octave primitives. Lattice layers derive their seed on the fly.
enum Layers {
    Lattice { seed: i32 },
    Perlin(Vec<Perlin>),
}

/// Fractal noise sampler for one parameter set.
///
/// Layer `i` runs at `BASE_FREQUENCY * lacunarity^i` with amplitude
/// `persistence^i` and seed `seed + i`. Layers are summed without
/// renormalization, and the sum is clamped to [-1, 1]. Only the
/// `contributing_octaves` are evaluated.
pub struct NoiseSampler {
    layers: Layers,
    octaves: u32,
    persistence: f32,
    lacunarity: f32,
}

impl NoiseSampler {
    /// Build a sampler. Fails with `InvalidParameter` if `params` is invalid.
    pub fn new(params: &ParameterSet, primitive: NoisePrimitive) -> Result<Self> {
        params.validate()?;

        let octaves = contributing_octaves(params);
        let layers = match primitive {
            NoisePrimitive::Lattice => Layers::Lattice { seed: params.seed },
            NoisePrimitive::Perlin => Layers::Perlin(
                (0..octaves)
                    .map(|octave| Perlin::new(params.seed.wrapping_add(octave as i32) as u32))
                    .collect(),
            ),
        };

        Ok(Self {
            layers,
            octaves,
            persistence: params.persistence,
            lacunarity: params.lacunarity,
        })
    }

    #[inline]
    fn layer(&self, octave: u32, x: f32, y: f32) -> f32 {
        match &self.layers {
            Layers::Lattice { seed } => gradient_noise(x, y, seed.wrapping_add(octave as i32)),
            Layers::Perlin(layers) => {
                // `Perlin` converts cell coordinates to isize and panics outside its range.
                if x.abs() >= PERLIN_DOMAIN_LIMIT || y.abs() >= PERLIN_DOMAIN_LIMIT {
                    return 0.0;
                }
                layers[octave as usize].get([x as f64, y as f64]) as f32
            }
        }
    }

    /// Fractal noise at domain coordinates (x, y), in [-1, 1]
    pub fn sample(&self, x: f32, y: f32) -> f32 {
        if !(x.is_finite() && y.is_finite()) {
            return 0.0;
        }

        let mut total = 0.0f32;
        let mut amplitude = 1.0f32;
        let mut frequency = BASE_FREQUENCY;

        for octave in 0..self.octaves {
            // Scaled coordinates would leave the f32 range.
            if frequency.abs() > 1.0 {
                let limit = f32::MAX / frequency.abs();
                if x.abs() > limit || y.abs() > limit {
                    break;
                }
            }
            total += self.layer(octave, x * frequency, y * frequency) * amplitude;
            amplitude *= self.persistence;
            frequency *= self.lacunarity;
        }

        total.clamp(-1.0, 1.0)
    }

    /// Layers actually evaluated per sample
    pub fn octaves(&self) -> usize {
        self.octaves as usize
    }
}

/// One-shot fractal sample with the lattice primitive
pub fn sample(params: &ParameterSet, x: f32, y: f32) -> Result<f32> {
    Ok(NoiseSampler::new(params, NoisePrimitive::Lattice)?.sample(x, y))
}

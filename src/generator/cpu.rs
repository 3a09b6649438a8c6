//! CPU height-field builder.

use std::time::Instant;

use rayon::prelude::*;

use super::HeightFieldGenerator;
use crate::error::Result;
use crate::heightfield::HeightField;
use crate::noise::{NoisePrimitive, NoiseSampler};
use crate::params::ParameterSet;

/// Map a fractal sample in [-1, 1] to a height in [0, 1]
#[inline]
pub fn normalize_height(noise: f32) -> f32 {
    (noise + 1.0) * 0.5
}

/// Builds height fields by evaluating `NoiseSampler` at every texel.
///
/// Each texel is a pure function of its coordinates, so rows are filled in
/// parallel and the output does not depend on the thread count.
#[derive(Debug, Clone)]
pub struct HeightFieldCpu {
    primitive: NoisePrimitive,
    parallel: bool,
}

impl Default for HeightFieldCpu {
    fn default() -> Self {
        Self {
            primitive: NoisePrimitive::Lattice,
            parallel: true,
        }
    }
}

impl HeightFieldCpu {
    pub fn new(primitive: NoisePrimitive) -> Self {
        Self {
            primitive,
            ..Default::default()
        }
    }

    /// Fill rows on the caller's thread only
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Build a `map_size × map_size` field
    pub fn build(&self, params: &ParameterSet) -> Result<HeightField> {
        let sampler = NoiseSampler::new(params, self.primitive)?;
        let side = params.side();
        let start = Instant::now();

        let fill_row = |(y, row): (usize, &mut [f32])| {
            for (x, texel) in row.iter_mut().enumerate() {
                let (sx, sy) = params.domain_coords(x as u32, y as u32);
                *texel = normalize_height(sampler.sample(sx, sy));
            }
        };

        let mut values = vec![0.0f32; side * side];
        if self.parallel {
            values.par_chunks_mut(side).enumerate().for_each(fill_row);
        } else {
            values.chunks_mut(side).enumerate().for_each(fill_row);
        }

        log::debug!(
            "cpu: built {side}x{side} height field ({} octaves) in {:.2}ms",
            sampler.octaves(),
            start.elapsed().as_secs_f64() * 1000.0
        );

        HeightField::from_values(side, values)
    }
}

impl HeightFieldGenerator for HeightFieldCpu {
    fn generate(&self, params: &ParameterSet) -> Result<HeightField> {
        self.build(params)
    }

    fn name(&self) -> &'static str {
        "cpu"
    }
}

//! Immutable square grid of normalized heights shared by both backends.

use std::sync::Arc;

use image::{GrayImage, ImageBuffer, Luma};

use crate::error::{Result, TerrainError};

/// Single-channel 32-bit float image, the displacement texture format
pub type HeightTexture = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Dense row-major `size × size` grid of heights in [0, 1].
///
/// Cloning shares the underlying storage; a field is never mutated after
/// construction, so it can be handed to any number of readers.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightField {
    size: usize,
    values: Arc<[f32]>,
}

impl HeightField {
    /// Wrap a row-major buffer. `values.len()` must be `size * size`.
    pub fn from_values(size: usize, values: Vec<f32>) -> Result<Self> {
        if size == 0 {
            return Err(TerrainError::invalid("size", "height field must be at least 1x1"));
        }
        if values.len() != size * size {
            return Err(TerrainError::invalid(
                "values",
                format!("expected {} values for a {size}x{size} field, got {}", size * size, values.len()),
            ));
        }
        Ok(Self {
            size,
            values: values.into(),
        })
    }

    /// Field where every texel holds `value`
    pub fn filled(size: usize, value: f32) -> Result<Self> {
        Self::from_values(size, vec![value; size * size])
    }

    /// Texels per side
    pub fn size(&self) -> usize {
        self.size
    }

    /// Row-major texel values
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Height at texel (x, y). Panics if out of range.
    pub fn get(&self, x: usize, y: usize) -> f32 {
        assert!(x < self.size && y < self.size, "texel ({x}, {y}) outside {0}x{0} field", self.size);
        self.values[y * self.size + x]
    }

    /// Height at the texel nearest to unit coordinates (u, v), clamped to the edge
    pub fn sample_nearest(&self, u: f32, v: f32) -> f32 {
        let x = self.texel_index(u);
        let y = self.texel_index(v);
        self.values[y * self.size + x]
    }

    /// Bilinear blend at unit coordinates (u, v), treating texel centers as sample points
    pub fn sample_bilinear(&self, u: f32, v: f32) -> f32 {
        let max = (self.size - 1) as f32;
        let fx = (u * self.size as f32 - 0.5).clamp(0.0, max);
        let fy = (v * self.size as f32 - 0.5).clamp(0.0, max);

        let x0 = fx.floor() as usize;
        let y0 = fy.floor() as usize;
        let x1 = (x0 + 1).min(self.size - 1);
        let y1 = (y0 + 1).min(self.size - 1);
        let tx = fx - x0 as f32;
        let ty = fy - y0 as f32;

        let top = self.get(x0, y0) + (self.get(x1, y0) - self.get(x0, y0)) * tx;
        let bottom = self.get(x0, y1) + (self.get(x1, y1) - self.get(x0, y1)) * tx;
        top + (bottom - top) * ty
    }

    /// (min, max) over all texels
    pub fn min_max(&self) -> (f32, f32) {
        self.values
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
    }

    pub fn mean(&self) -> f32 {
        let sum: f64 = self.values.iter().map(|&v| v as f64).sum();
        (sum / self.values.len() as f64) as f32
    }

    /// Largest absolute per-texel difference. `None` if the sizes differ.
    pub fn max_abs_diff(&self, other: &HeightField) -> Option<f32> {
        if self.size != other.size {
            return None;
        }
        Some(
            self.values
                .iter()
                .zip(other.values.iter())
                .map(|(a, b)| (a - b).abs())
                .fold(0.0, f32::max),
        )
    }

    /// Float displacement texture with the raw heights
    pub fn to_texture(&self) -> HeightTexture {
        let side = self.size as u32;
        ImageBuffer::from_fn(side, side, |x, y| Luma([self.get(x as usize, y as usize)]))
    }

    /// 8-bit grayscale view, used as an albedo preview
    pub fn to_gray_image(&self) -> GrayImage {
        let side = self.size as u32;
        GrayImage::from_fn(side, side, |x, y| {
            let v = self.get(x as usize, y as usize).clamp(0.0, 1.0);
            Luma([(v * 255.0).round() as u8])
        })
    }

    /// Map a unit coordinate to a texel index (nearest-sample policy)
    fn texel_index(&self, t: f32) -> usize {
        let scaled = (t * self.size as f32).floor();
        if scaled.is_nan() || scaled < 0.0 {
            0
        } else {
            (scaled as usize).min(self.size - 1)
        }
    }
}

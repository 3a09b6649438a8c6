//! Procedural generation request parameters.

use glam::Vec2;

use crate::error::{Result, TerrainError};

/// One height-field generation request.
///
/// Plain value type: both backends borrow it for the duration of a call and
/// never store it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterSet {
    /// Noise frequency divisor (pixels per noise unit). Must be non-zero.
    pub scale: f32,

    /// Number of fractal layers (>= 1)
    pub octaves: i32,

    /// Amplitude multiplier per octave, typically in [0, 1]
    pub persistence: f32,

    /// Frequency multiplier per octave, typically >= 1
    pub lacunarity: f32,

    pub seed: i32,

    /// Domain-space translation applied after scaling
    pub offset: Vec2,

    /// Grid width and height in texels (> 0)
    pub map_size: i32,
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            scale: 50.0,
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
            seed: 42,
            offset: Vec2::ZERO,
            map_size: 1024,
        }
    }
}

impl ParameterSet {
    /// Check the invariants both backends rely on.
    ///
    /// Only the map size, scale and octave count are constrained; persistence,
    /// lacunarity, seed and offset accept any value.
    pub fn validate(&self) -> Result<()> {
        if self.map_size <= 0 {
            return Err(TerrainError::invalid(
                "map_size",
                format!("must be > 0, got {}", self.map_size),
            ));
        }
        if self.scale == 0.0 || !self.scale.is_finite() {
            return Err(TerrainError::invalid(
                "scale",
                format!("must be finite and non-zero, got {}", self.scale),
            ));
        }
        if self.octaves < 1 {
            return Err(TerrainError::invalid(
                "octaves",
                format!("must be >= 1, got {}", self.octaves),
            ));
        }
        Ok(())
    }

    /// Grid side length as an index type. Only meaningful after `validate`.
    pub fn side(&self) -> usize {
        self.map_size.max(0) as usize
    }

    /// Number of texels in the requested grid
    pub fn texel_count(&self) -> usize {
        self.side() * self.side()
    }

    /// Domain coordinates of grid cell (x, y)
    pub fn domain_coords(&self, x: u32, y: u32) -> (f32, f32) {
        (
            x as f32 / self.scale + self.offset.x,
            y as f32 / self.scale + self.offset.y,
        )
    }
}

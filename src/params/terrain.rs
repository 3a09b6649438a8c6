//! Terrain mesh configuration and backend selection.

use crate::error::{Result, TerrainError};

/// Which height-field backend the terrain owner drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// Fractal noise evaluated on the CPU
    #[default]
    Cpu,

    /// Compute program dispatched on a wgpu device
    Gpu,
}

/// How the deformer reads the height field at a vertex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SamplingMode {
    /// Nearest texel, clamped to the field edge
    #[default]
    Nearest,

    /// Bilinear blend of the four surrounding texels
    Bilinear,
}

/// Terrain mesh and backend configuration
#[derive(Debug, Clone)]
pub struct TerrainConfig {
    /// Side length of the square terrain in world units (meters)
    pub terrain_size_m: f32,

    /// Elevation of a height value of 1.0 (meters)
    pub height_scale_m: f32,

    /// Vertices per side of the terrain mesh (e.g., 256 = 65,536 vertices)
    pub resolution: usize,

    pub sampling: SamplingMode,

    pub backend: BackendKind,

    /// Switch to the CPU backend when the GPU one reports it is unavailable
    pub fallback_to_cpu: bool,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            terrain_size_m: 20.0,
            height_scale_m: 5.0,
            resolution: 256,
            sampling: SamplingMode::Nearest,
            backend: BackendKind::Cpu,
            fallback_to_cpu: true,
        }
    }
}

impl TerrainConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.terrain_size_m > 0.0 && self.terrain_size_m.is_finite()) {
            return Err(TerrainError::invalid(
                "terrain_size_m",
                format!("must be finite and > 0, got {}", self.terrain_size_m),
            ));
        }
        if !self.height_scale_m.is_finite() {
            return Err(TerrainError::invalid(
                "height_scale_m",
                format!("must be finite, got {}", self.height_scale_m),
            ));
        }
        if self.resolution < 2 {
            return Err(TerrainError::invalid(
                "resolution",
                format!("must be >= 2, got {}", self.resolution),
            ));
        }
        Ok(())
    }
}

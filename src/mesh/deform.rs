//! Height-field displacement of a terrain grid.

use std::time::Instant;

use super::MeshGrid;
use crate::error::{Result, TerrainError};
use crate::heightfield::HeightField;
use crate::params::{SamplingMode, TerrainConfig};

/// Lifts each vertex of a flat grid by the height found under it.
///
/// A vertex at (x, z) maps to unit coordinates
/// `u = (x + W/2) / W`, `v = (z + W/2) / W`, where `W` is the terrain world
/// size, and its elevation becomes `height(u, v) * height_scale`.
#[derive(Debug, Clone, Copy)]
pub struct TerrainMeshDeformer {
    terrain_world_size: f32,
    height_scale: f32,
    sampling: SamplingMode,
}

impl TerrainMeshDeformer {
    pub fn new(terrain_world_size: f32, height_scale: f32) -> Result<Self> {
        if !(terrain_world_size > 0.0 && terrain_world_size.is_finite()) {
            return Err(TerrainError::invalid(
                "terrain_world_size",
                format!("must be finite and > 0, got {terrain_world_size}"),
            ));
        }
        if !height_scale.is_finite() {
            return Err(TerrainError::invalid(
                "height_scale",
                format!("must be finite, got {height_scale}"),
            ));
        }
        Ok(Self {
            terrain_world_size,
            height_scale,
            sampling: SamplingMode::Nearest,
        })
    }

    pub fn from_config(config: &TerrainConfig) -> Result<Self> {
        Ok(Self::new(config.terrain_size_m, config.height_scale_m)?.with_sampling(config.sampling))
    }

    pub fn with_sampling(mut self, sampling: SamplingMode) -> Self {
        self.sampling = sampling;
        self
    }

    /// Displace every vertex of `mesh`, then rebuild its normals
    pub fn deform(&self, mut mesh: MeshGrid, field: &HeightField) -> MeshGrid {
        let start = Instant::now();
        let half_size = self.terrain_world_size / 2.0;

        for vertex in &mut mesh.vertices {
            let u = (vertex.position[0] + half_size) / self.terrain_world_size;
            let v = (vertex.position[2] + half_size) / self.terrain_world_size;
            let height = match self.sampling {
                SamplingMode::Nearest => field.sample_nearest(u, v),
                SamplingMode::Bilinear => field.sample_bilinear(u, v),
            };
            vertex.position[1] = height * self.height_scale;
        }
        mesh.recompute_normals();

        log::debug!(
            "deform: displaced {} vertices from a {1}x{1} field in {2:.2}ms",
            mesh.vertices.len(),
            field.size(),
            start.elapsed().as_secs_f64() * 1000.0
        );
        mesh
    }
}

/// One-shot nearest-sample deformation
pub fn deform(
    mesh: MeshGrid,
    field: &HeightField,
    terrain_world_size: f32,
    height_scale: f32,
) -> Result<MeshGrid> {
    Ok(TerrainMeshDeformer::new(terrain_world_size, height_scale)?.deform(mesh, field))
}

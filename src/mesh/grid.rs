//! Flat terrain grid mesh.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::error::{Result, TerrainError};

/// Vertex data for the terrain mesh (position + UV + normal)
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
    pub normal: [f32; 3],
}

/// Square grid of `resolution × resolution` vertices in the XZ plane
#[derive(Debug, Clone)]
pub struct MeshGrid {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    resolution: usize,
    world_size: f32,
}

impl MeshGrid {
    /// Flat plane centred on the origin, spanning `[-world_size/2, world_size/2]`
    /// on X and Z, with all normals pointing up
    pub fn plane(world_size: f32, resolution: usize) -> Result<Self> {
        if !(world_size > 0.0 && world_size.is_finite()) {
            return Err(TerrainError::invalid(
                "world_size",
                format!("must be finite and > 0, got {world_size}"),
            ));
        }
        if resolution < 2 {
            return Err(TerrainError::invalid(
                "resolution",
                format!("must be >= 2, got {resolution}"),
            ));
        }

        let cells = resolution - 1;
        let spacing = world_size / cells as f32;
        let half_size = world_size / 2.0;

        let mut vertices = Vec::with_capacity(resolution * resolution);
        let mut indices = Vec::with_capacity(cells * cells * 6);

        for z in 0..resolution {
            for x in 0..resolution {
                vertices.push(Vertex {
                    position: [x as f32 * spacing - half_size, 0.0, z as f32 * spacing - half_size],
                    uv: [x as f32 / cells as f32, z as f32 / cells as f32],
                    normal: [0.0, 1.0, 0.0],
                });
            }
        }

        // Two triangles per cell, counter-clockwise seen from +Y
        for z in 0..cells {
            for x in 0..cells {
                let top_left = (z * resolution + x) as u32;
                let top_right = top_left + 1;
                let bottom_left = ((z + 1) * resolution + x) as u32;
                let bottom_right = bottom_left + 1;

                indices.extend_from_slice(&[
                    top_left,
                    bottom_left,
                    top_right,
                    top_right,
                    bottom_left,
                    bottom_right,
                ]);
            }
        }

        Ok(Self {
            vertices,
            indices,
            resolution,
            world_size,
        })
    }

    /// Vertices per side
    pub fn resolution(&self) -> usize {
        self.resolution
    }

    /// Side length in world units
    pub fn world_size(&self) -> f32 {
        self.world_size
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Lowest and highest vertex elevation
    pub fn elevation_range(&self) -> (f32, f32) {
        self.vertices
            .iter()
            .map(|v| v.position[1])
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), y| (lo.min(y), hi.max(y)))
    }

    /// Rebuild per-vertex normals from the triangles.
    ///
    /// Face normals are summed unnormalized, so larger triangles weigh more.
    /// A vertex whose star has no area keeps +Y.
    pub fn recompute_normals(&mut self) {
        let mut accum = vec![Vec3::ZERO; self.vertices.len()];

        for tri in self.indices.chunks_exact(3) {
            let (i0, i1, i2) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
            let v0 = Vec3::from_array(self.vertices[i0].position);
            let v1 = Vec3::from_array(self.vertices[i1].position);
            let v2 = Vec3::from_array(self.vertices[i2].position);

            let face = (v1 - v0).cross(v2 - v0);
            accum[i0] += face;
            accum[i1] += face;
            accum[i2] += face;
        }

        for (vertex, sum) in self.vertices.iter_mut().zip(accum) {
            vertex.normal = sum.try_normalize().unwrap_or(Vec3::Y).to_array();
        }
    }
}

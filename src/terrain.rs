//! Terrain owner: one backend, one current height field and mesh.

use std::time::Instant;

use image::GrayImage;

use crate::compute::ComputeDispatcher;
use crate::error::{Result, TerrainError};
use crate::generator::{HeightFieldCpu, HeightFieldGenerator};
use crate::heightfield::{HeightField, HeightTexture};
use crate::mesh::{MeshGrid, TerrainMeshDeformer};
use crate::params::{BackendKind, ParameterSet, TerrainConfig};

/// Height field and displaced mesh from the last successful generation
#[derive(Debug, Clone)]
struct Surface {
    height_field: HeightField,
    mesh: MeshGrid,
}

/// Generates terrain on the configured backend and keeps the latest result.
///
/// A failed generation leaves the previous field and mesh in place.
pub struct Terrain {
    config: TerrainConfig,
    deformer: TerrainMeshDeformer,
    generator: Box<dyn HeightFieldGenerator>,
    surface: Option<Surface>,
}

impl Terrain {
    /// Build a terrain with the backend named in `config.backend`
    pub fn new(config: TerrainConfig) -> Result<Self> {
        let generator: Box<dyn HeightFieldGenerator> = match config.backend {
            BackendKind::Cpu => Box::new(HeightFieldCpu::default()),
            BackendKind::Gpu => Box::new(ComputeDispatcher::with_default_adapter()),
        };
        Self::with_generator(config, generator)
    }

    /// Build a terrain around any generator
    pub fn with_generator(config: TerrainConfig, generator: Box<dyn HeightFieldGenerator>) -> Result<Self> {
        config.validate()?;
        let deformer = TerrainMeshDeformer::from_config(&config)?;
        log::info!(
            "terrain: {}m x {}m, {} vertices per side, {} backend",
            config.terrain_size_m,
            config.terrain_size_m,
            config.resolution,
            generator.name()
        );
        Ok(Self {
            config,
            deformer,
            generator,
            surface: None,
        })
    }

    /// Generate a height field, displace a fresh plane with it, and replace
    /// the current field and mesh together.
    pub fn generate_terrain(&mut self, params: &ParameterSet) -> Result<()> {
        let start = Instant::now();
        let height_field = self.generate_field(params)?;

        let plane = MeshGrid::plane(self.config.terrain_size_m, self.config.resolution)?;
        let mesh = self.deformer.deform(plane, &height_field);

        let (lo, hi) = height_field.min_max();
        log::info!(
            "terrain: {0}x{0} field on {1} backend, heights [{2:.3}, {3:.3}], {4:.2}ms",
            height_field.size(),
            self.generator.name(),
            lo,
            hi,
            start.elapsed().as_secs_f64() * 1000.0
        );

        self.surface = Some(Surface { height_field, mesh });
        Ok(())
    }

    fn generate_field(&mut self, params: &ParameterSet) -> Result<HeightField> {
        match self.generator.generate(params) {
            Err(TerrainError::DeviceUnavailable(reason)) if self.config.fallback_to_cpu => {
                log::warn!(
                    "terrain: {} backend unavailable ({reason}), switching to cpu",
                    self.generator.name()
                );
                self.generator = Box::new(HeightFieldCpu::default());
                self.generator.generate(params)
            }
            result => result,
        }
    }

    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    /// Label of the backend that will serve the next request
    pub fn backend_name(&self) -> &'static str {
        self.generator.name()
    }

    pub fn height_field(&self) -> Option<&HeightField> {
        self.surface.as_ref().map(|s| &s.height_field)
    }

    pub fn mesh(&self) -> Option<&MeshGrid> {
        self.surface.as_ref().map(|s| &s.mesh)
    }

    /// Float displacement texture of the current field
    pub fn displacement_texture(&self) -> Option<HeightTexture> {
        self.height_field().map(HeightField::to_texture)
    }

    /// Grayscale preview of the current field
    pub fn albedo_texture(&self) -> Option<GrayImage> {
        self.height_field().map(HeightField::to_gray_image)
    }
}

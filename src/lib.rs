//! Terrainforge - fractal height-field generation and terrain mesh displacement
//!
//! Height fields come from one of two interchangeable backends: a rayon-parallel
//! CPU builder and a wgpu compute dispatcher that runs the same noise function
//! on the GPU. `Terrain` ties a backend to a displaced grid mesh.

pub mod compute;
pub mod error;
pub mod generator;
pub mod heightfield;
pub mod mesh;
pub mod noise;
pub mod params;
pub mod terrain;

pub use compute::{ComputeDevice, ComputeDispatcher, WgpuDevice};
pub use error::{Result, TerrainError};
pub use generator::{HeightFieldCpu, HeightFieldGenerator};
pub use heightfield::HeightField;
pub use mesh::{MeshGrid, TerrainMeshDeformer, Vertex};
pub use params::{BackendKind, ParameterSet, SamplingMode, TerrainConfig};
pub use terrain::Terrain;

//! Terrain grid mesh and its height-field displacement.

mod deform;
mod grid;

pub use deform::{deform, TerrainMeshDeformer};
pub use grid::{MeshGrid, Vertex};

//! Parameter definitions with physical units and documented semantics.
//!
//! Generation requests and terrain settings live here with:
//! - Units (meters, texels, vertices)
//! - Documented ranges and defaults
//! - `validate()` checks that fail fast with `InvalidParameter`

mod generation;
mod terrain;

// Re-export all types
pub use generation::ParameterSet;
pub use terrain::{BackendKind, SamplingMode, TerrainConfig};

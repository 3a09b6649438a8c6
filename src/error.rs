//! Error types shared by both generation backends and the mesh pass.

use thiserror::Error;

use crate::compute::DeviceError;

/// Errors surfaced by height-field generation and terrain deformation.
///
/// None of these are retried by the library; callers decide what to do.
#[derive(Debug, Error)]
pub enum TerrainError {
    /// A parameter is outside its valid range. Raised before any work starts.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// The GPU backend already has a dispatch in flight.
    #[error("compute dispatcher is busy with another request")]
    Busy,

    /// The compute capability was missing at startup. Permanent for the instance.
    #[error("compute device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The device returned a texel payload of the wrong size.
    #[error("readback returned {actual} bytes, expected {expected}")]
    ReadbackFailure { expected: usize, actual: usize },

    /// The device rejected a per-call operation.
    #[error(transparent)]
    Device(#[from] DeviceError),
}

impl TerrainError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = TerrainError> = std::result::Result<T, E>;

//! Height-field backends behind one interface.
//!
//! Callers hold a `Box<dyn HeightFieldGenerator>` and never learn which backend
//! produced the field. Both backends validate the request before doing work.

mod cpu;

pub use cpu::{normalize_height, HeightFieldCpu};

use crate::error::Result;
use crate::heightfield::HeightField;
use crate::params::ParameterSet;

/// Anything that turns a parameter set into a height field
pub trait HeightFieldGenerator: Send + Sync {
    fn generate(&self, params: &ParameterSet) -> Result<HeightField>;

    /// Short backend label for logs
    fn name(&self) -> &'static str;
}

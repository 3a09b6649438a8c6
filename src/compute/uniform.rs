//! Wire layout of the compute program's parameter block and dispatch geometry.

use bytemuck::{Pod, Zeroable};

use crate::noise::contributing_octaves;
use crate::params::ParameterSet;

/// Local work-group size of the compute program (8×8×1)
pub const WORKGROUP_SIZE: u32 = 8;

/// Size of the uniform block in bytes
pub const UNIFORM_BLOCK_SIZE: usize = 32;

/// Parameter block as laid out in `heightmap.wgsl`.
///
/// Seven 4-byte fields plus 4 bytes of zero padding, so the block size is a
/// power of two and a multiple of 16. `offset` is split into two scalars
/// because a WGSL `vec2<f32>` would be realigned to byte 24.
///
/// `octaves` carries `contributing_octaves`, not the requested count, so the
/// program never steps into an overflowing layer.
///
/// Uploads go through `to_le_bytes`. The `Pod` derive is a compile-time
/// guarantee that the struct has no implicit padding, and lets tests compare
/// the encoding against the native layout.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct UniformBlock {
    pub scale: f32,
    pub octaves: i32,
    pub persistence: f32,
    pub lacunarity: f32,
    pub seed: i32,
    pub offset_x: f32,
    pub offset_y: f32,
    pub _padding: u32,
}

const _: () = assert!(std::mem::size_of::<UniformBlock>() == UNIFORM_BLOCK_SIZE);

impl From<&ParameterSet> for UniformBlock {
    fn from(params: &ParameterSet) -> Self {
        Self {
            scale: params.scale,
            octaves: contributing_octaves(params) as i32,
            persistence: params.persistence,
            lacunarity: params.lacunarity,
            seed: params.seed,
            offset_x: params.offset.x,
            offset_y: params.offset.y,
            _padding: 0,
        }
    }
}

impl UniformBlock {
    /// Little-endian encoding, independent of host byte order
    pub fn to_le_bytes(&self) -> [u8; UNIFORM_BLOCK_SIZE] {
        let words = [
            self.scale.to_le_bytes(),
            self.octaves.to_le_bytes(),
            self.persistence.to_le_bytes(),
            self.lacunarity.to_le_bytes(),
            self.seed.to_le_bytes(),
            self.offset_x.to_le_bytes(),
            self.offset_y.to_le_bytes(),
            [0; 4],
        ];
        let mut out = [0u8; UNIFORM_BLOCK_SIZE];
        for (chunk, word) in out.chunks_exact_mut(4).zip(words) {
            chunk.copy_from_slice(&word);
        }
        out
    }

    /// Inverse of `to_le_bytes`, used to check the wire layout
    #[cfg(test)]
    pub(crate) fn from_le_bytes(bytes: &[u8; UNIFORM_BLOCK_SIZE]) -> Self {
        let word = |i: usize| -> [u8; 4] { [bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]] };
        Self {
            scale: f32::from_le_bytes(word(0)),
            octaves: i32::from_le_bytes(word(4)),
            persistence: f32::from_le_bytes(word(8)),
            lacunarity: f32::from_le_bytes(word(12)),
            seed: i32::from_le_bytes(word(16)),
            offset_x: f32::from_le_bytes(word(20)),
            offset_y: f32::from_le_bytes(word(24)),
            _padding: u32::from_le_bytes(word(28)),
        }
    }
}

/// Work groups per axis needed to cover `map_size` texels
pub fn group_count(map_size: u32) -> u32 {
    map_size.div_ceil(WORKGROUP_SIZE)
}

/// X/Y/Z group counts for a square `map_size` image
pub fn dispatch_groups(map_size: u32) -> [u32; 3] {
    let groups = group_count(map_size);
    [groups, groups, 1]
}

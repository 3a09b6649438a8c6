//! Hashed lattice gradient noise.
//!
//! Perlin-style 2D gradient noise whose gradients come from an integer hash
//! instead of a permutation table. Everything is f32 math plus wrapping u32
//! arithmetic, so `heightmap.wgsl` evaluates the exact same sequence of
//! operations and the two backends agree to within float rounding.
//!
//! Any edit here must be mirrored in the compute program.

use ::noise::NoiseFn;

/// Gradient directions. Diagonals are unnormalized so the output spans [-1, 1].
const GRADIENTS: [[f32; 2]; 8] = [
    [1.0, 1.0],
    [-1.0, 1.0],
    [1.0, -1.0],
    [-1.0, -1.0],
    [1.0, 0.0],
    [-1.0, 0.0],
    [0.0, 1.0],
    [0.0, -1.0],
];

/// PCG-style hash of a lattice point and seed
pub fn hash_lattice(ix: i32, iy: i32, seed: i32) -> u32 {
    let h = (ix as u32).wrapping_mul(0x8da6_b343)
        ^ (iy as u32).wrapping_mul(0xd816_3841)
        ^ (seed as u32).wrapping_mul(0xcb1a_b31f);
    let state = h.wrapping_mul(747_796_405).wrapping_add(2_891_336_453);
    let word = ((state >> ((state >> 28) + 4)) ^ state).wrapping_mul(277_803_737);
    (word >> 22) ^ word
}

#[inline]
fn fade(t: f32) -> f32 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + t * (b - a)
}

#[inline]
fn corner(ix: i32, iy: i32, seed: i32, dx: f32, dy: f32) -> f32 {
    let g = GRADIENTS[(hash_lattice(ix, iy, seed) & 7) as usize];
    g[0] * dx + g[1] * dy
}

/// Gradient noise at (x, y) for one seed. Zero on lattice points, within [-1, 1].
pub fn gradient_noise(x: f32, y: f32, seed: i32) -> f32 {
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;
    let ix = x0 as i32;
    let iy = y0 as i32;

    let n00 = corner(ix, iy, seed, fx, fy);
    let n10 = corner(ix.wrapping_add(1), iy, seed, fx - 1.0, fy);
    let n01 = corner(ix, iy.wrapping_add(1), seed, fx, fy - 1.0);
    let n11 = corner(ix.wrapping_add(1), iy.wrapping_add(1), seed, fx - 1.0, fy - 1.0);

    let u = fade(fx);
    let v = fade(fy);
    lerp(lerp(n00, n10, u), lerp(n01, n11, u), v)
}

/// Seeded lattice gradient noise usable anywhere a `noise::NoiseFn` is expected
#[derive(Debug, Clone, Copy)]
pub struct LatticeNoise {
    seed: i32,
}

impl LatticeNoise {
    pub fn new(seed: i32) -> Self {
        Self { seed }
    }

    pub fn sample(&self, x: f32, y: f32) -> f32 {
        gradient_noise(x, y, self.seed)
    }
}

impl NoiseFn<f64, 2> for LatticeNoise {
    fn get(&self, point: [f64; 2]) -> f64 {
        self.sample(point[0] as f32, point[1] as f32) as f64
    }
}

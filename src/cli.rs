//! Command-line argument parsing.

use clap::Parser;
use glam::Vec2;

use terrainforge::{BackendKind, ParameterSet, SamplingMode, TerrainConfig};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "terrainforge")]
#[command(about = "Generate a fractal height field and displace a terrain mesh", long_about = None)]
pub struct Args {
    /// Backend: cpu (default) or gpu
    #[arg(long, value_name = "BACKEND", default_value = "cpu")]
    pub backend: String,

    /// Height field width and height (texels)
    #[arg(long, value_name = "TEXELS", default_value_t = 512)]
    pub map_size: i32,

    /// Texels per noise unit (non-zero)
    #[arg(long, default_value_t = 50.0, allow_negative_numbers = true)]
    pub scale: f32,

    /// Number of fractal layers
    #[arg(long, default_value_t = 4)]
    pub octaves: i32,

    /// Amplitude multiplier per octave
    #[arg(long, default_value_t = 0.5)]
    pub persistence: f32,

    /// Frequency multiplier per octave
    #[arg(long, default_value_t = 2.0)]
    pub lacunarity: f32,

    /// Noise seed
    #[arg(long, default_value_t = 42, allow_negative_numbers = true)]
    pub seed: i32,

    /// Domain offset on X (noise units)
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub offset_x: f32,

    /// Domain offset on Y (noise units)
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub offset_y: f32,

    /// Terrain side length (meters)
    #[arg(long, value_name = "METERS", default_value_t = 20.0)]
    pub terrain_size: f32,

    /// Elevation of a height of 1.0 (meters)
    #[arg(long, value_name = "METERS", default_value_t = 5.0)]
    pub height_scale: f32,

    /// Mesh vertices per side
    #[arg(long, value_name = "VERTICES", default_value_t = 256)]
    pub resolution: usize,

    /// Sample the height field bilinearly instead of nearest-texel
    #[arg(long)]
    pub bilinear: bool,

    /// Use permutation-table Perlin noise (CPU only)
    #[arg(long)]
    pub perlin: bool,

    /// Fail instead of switching to the CPU when no GPU is available
    #[arg(long)]
    pub no_fallback: bool,

    /// Also build the field on both backends and report the largest difference
    #[arg(long)]
    pub compare: bool,
}

impl Args {
    /// Parse the backend name from command-line arguments
    pub fn parse_backend(&self) -> BackendKind {
        match self.backend.to_lowercase().as_str() {
            "gpu" if self.perlin => {
                println!("Backend: CPU (Perlin noise has no GPU program)");
                BackendKind::Cpu
            }
            "gpu" => {
                println!("Backend: GPU (wgpu compute)");
                BackendKind::Gpu
            }
            "cpu" => {
                println!("Backend: CPU (rayon)");
                BackendKind::Cpu
            }
            other => {
                eprintln!("Unknown backend '{}', using cpu", other);
                BackendKind::Cpu
            }
        }
    }

    pub fn parameter_set(&self) -> ParameterSet {
        ParameterSet {
            scale: self.scale,
            octaves: self.octaves,
            persistence: self.persistence,
            lacunarity: self.lacunarity,
            seed: self.seed,
            offset: Vec2::new(self.offset_x, self.offset_y),
            map_size: self.map_size,
        }
    }

    pub fn terrain_config(&self) -> TerrainConfig {
        TerrainConfig {
            terrain_size_m: self.terrain_size,
            height_scale_m: self.height_scale,
            resolution: self.resolution,
            sampling: if self.bilinear {
                SamplingMode::Bilinear
            } else {
                SamplingMode::Nearest
            },
            backend: self.parse_backend(),
            fallback_to_cpu: !self.no_fallback,
        }
    }
}

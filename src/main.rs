//! Terrainforge - build a fractal height field and a displaced terrain mesh
//!
//! Generates on the CPU or the GPU, prints field and mesh statistics, and can
//! cross-check the two backends against each other.

mod cli;

use std::time::Instant;

use clap::Parser;

use cli::Args;
use terrainforge::noise::NoisePrimitive;
use terrainforge::{ComputeDispatcher, HeightFieldCpu, ParameterSet, Terrain, TerrainError};

/// Largest per-texel difference accepted between the two backends
const PARITY_TOLERANCE: f32 = 1e-4;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    println!("Terrainforge");
    let params = args.parameter_set();
    let config = args.terrain_config();
    params.validate()?;

    println!("  Map size: {0}x{0} ({1} texels)", params.map_size, params.texel_count());
    println!(
        "  Noise: scale {}, {} octaves, persistence {}, lacunarity {}, seed {}",
        params.scale, params.octaves, params.persistence, params.lacunarity, params.seed
    );
    println!(
        "  Terrain: {}m, height scale {}m, {} vertices per side",
        config.terrain_size_m, config.height_scale_m, config.resolution
    );

    let mut terrain = if args.perlin {
        Terrain::with_generator(config, Box::new(HeightFieldCpu::new(NoisePrimitive::Perlin)))?
    } else {
        Terrain::new(config)?
    };

    let start = Instant::now();
    terrain.generate_terrain(&params)?;
    let elapsed = start.elapsed();

    if let (Some(field), Some(mesh)) = (terrain.height_field(), terrain.mesh()) {
        let (lo, hi) = field.min_max();
        let (mesh_lo, mesh_hi) = mesh.elevation_range();
        println!("\nGenerated on {} backend", terrain.backend_name());
        println!("  Heights: min {:.4}, max {:.4}, mean {:.4}", lo, hi, field.mean());
        println!(
            "  Mesh: {0:.1}m wide, {1}x{1} vertices, {2} triangles, elevation [{3:.2}m, {4:.2}m]",
            mesh.world_size(),
            mesh.resolution(),
            mesh.triangle_count(),
            mesh_lo,
            mesh_hi
        );
        println!("  Time: {:.2}ms", elapsed.as_secs_f64() * 1000.0);
    }

    if args.compare {
        compare_backends(&params)?;
    }

    Ok(())
}

/// Build the same field on both backends and report how far apart they are
fn compare_backends(params: &ParameterSet) -> Result<(), Box<dyn std::error::Error>> {
    println!("\nBackend comparison");

    let start = Instant::now();
    let cpu = HeightFieldCpu::default().build(params)?;
    println!("  CPU: {:.2}ms", start.elapsed().as_secs_f64() * 1000.0);

    let dispatcher = ComputeDispatcher::with_default_adapter();
    let start = Instant::now();
    let gpu = match dispatcher.generate(params) {
        Ok(field) => field,
        Err(TerrainError::DeviceUnavailable(reason)) => {
            println!("  GPU: unavailable ({reason})");
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };
    println!("  GPU: {:.2}ms", start.elapsed().as_secs_f64() * 1000.0);

    let diff = gpu.max_abs_diff(&cpu).unwrap_or(f32::INFINITY);
    let verdict = if diff <= PARITY_TOLERANCE { "MATCH" } else { "MISMATCH" };
    println!("  Max |cpu - gpu|: {:.3e} ({})", diff, verdict);
    Ok(())
}

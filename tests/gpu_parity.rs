//! Cross-backend checks through the public API.
//!
//! The wgpu test returns early on machines without an adapter.

use glam::Vec2;
use terrainforge::noise::{self, LatticeNoise};
use terrainforge::{
    ComputeDispatcher, HeightFieldCpu, HeightFieldGenerator, ParameterSet, Terrain, TerrainConfig,
    TerrainError,
};

fn parity_params(map_size: i32) -> ParameterSet {
    ParameterSet {
        map_size,
        scale: 12.0,
        octaves: 5,
        persistence: 0.5,
        lacunarity: 2.0,
        seed: 1337,
        offset: Vec2::new(3.25, -1.5),
    }
}

#[test]
fn cpu_field_is_deterministic_and_normalized() {
    let cpu = HeightFieldCpu::default();
    let a = cpu.generate(&parity_params(64)).unwrap();
    let b = cpu.generate(&parity_params(64)).unwrap();

    assert_eq!(a.values().len(), 64 * 64);
    assert!(a.values().iter().all(|v| (0.0..=1.0).contains(v)));
    assert_eq!(a, b);
}

#[test]
fn cpu_texel_matches_noise_sample() {
    let params = parity_params(16);
    let field = HeightFieldCpu::default().build(&params).unwrap();

    let (sx, sy) = params.domain_coords(5, 11);
    let expected = (noise::sample(&params, sx, sy).unwrap() + 1.0) * 0.5;
    assert_eq!(field.get(5, 11), expected);
}

#[test]
fn lattice_noise_is_zero_on_lattice_points() {
    let lattice = LatticeNoise::new(99);
    for (x, y) in [(0.0, 0.0), (3.0, -2.0), (-17.0, 40.0)] {
        assert_eq!(lattice.sample(x, y), 0.0);
    }
}

#[test]
fn invalid_parameters_are_rejected_by_both_backends() {
    let bad = ParameterSet {
        octaves: 0,
        ..parity_params(8)
    };
    let unavailable = ComputeDispatcher::<terrainforge::WgpuDevice>::unavailable("test");

    assert!(matches!(
        HeightFieldCpu::default().generate(&bad),
        Err(TerrainError::InvalidParameter { name: "octaves", .. })
    ));
    assert!(matches!(
        unavailable.generate(&bad),
        Err(TerrainError::InvalidParameter { name: "octaves", .. })
    ));
}

#[test]
fn terrain_mesh_tracks_height_field() {
    let config = TerrainConfig {
        terrain_size_m: 32.0,
        height_scale_m: 8.0,
        resolution: 33,
        ..Default::default()
    };
    let mut terrain = Terrain::new(config).unwrap();
    terrain.generate_terrain(&parity_params(32)).unwrap();

    let field = terrain.height_field().unwrap();
    let mesh = terrain.mesh().unwrap();

    // Vertex (x, z) at index z * 33 + x sits over texel (x, z) for x, z < 32.
    for (x, z) in [(0, 0), (7, 19), (31, 31)] {
        let vertex = mesh.vertices[z * 33 + x];
        assert!((vertex.position[1] - field.get(x, z) * 8.0).abs() < 1e-5);
    }
}

#[test]
fn wgpu_matches_cpu() {
    let dispatcher = ComputeDispatcher::with_default_adapter();
    if !dispatcher.is_available() {
        eprintln!("skipping wgpu_matches_cpu: no wgpu adapter");
        return;
    }

    let deep = ParameterSet {
        octaves: 200,
        ..parity_params(16)
    };
    let cpu = HeightFieldCpu::default();
    for params in [parity_params(8), parity_params(9), parity_params(100), deep] {
        let map_size = params.map_size;
        let gpu_field = dispatcher.generate(&params).unwrap();
        let cpu_field = cpu.build(&params).unwrap();
        let diff = gpu_field.max_abs_diff(&cpu_field).unwrap();
        assert!(diff <= 1e-4, "map_size {map_size}: max diff {diff}");
    }
}

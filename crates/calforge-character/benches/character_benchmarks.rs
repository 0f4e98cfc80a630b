//! Benchmarks for mesh decoding and merging
//!
//! Run with: cargo bench

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use calforge_character::merge_mesh;
use calforge_parsers::{MeshParser, ParseOptions, Parser};

/// Build a mesh file with `submeshes` x `vertices` skinned vertices
fn synthetic_mesh(submeshes: usize, vertices: usize) -> Vec<u8> {
    fn i32s(data: &mut Vec<u8>, values: &[i32]) {
        for v in values {
            data.extend_from_slice(&v.to_le_bytes());
        }
    }

    let mut data = b"CMF\0".to_vec();
    i32s(&mut data, &[700, submeshes as i32]);

    let triangles = vertices.saturating_sub(2);
    for s in 0..submeshes {
        i32s(&mut data, &[s as i32, vertices as i32, triangles as i32, 0, 0, 2]);
        for v in 0..vertices {
            let x = v as f32;
            for f in [x, x * 0.5, 1.0, 0.0, 1.0, 0.0] {
                data.extend_from_slice(&f.to_le_bytes());
            }
            i32s(&mut data, &[-1, 0]);
            for f in [0.1f32, 0.2, 0.3, 0.4] {
                data.extend_from_slice(&f.to_le_bytes());
            }
            i32s(&mut data, &[2, 0]);
            data.extend_from_slice(&0.75f32.to_le_bytes());
            i32s(&mut data, &[1]);
            data.extend_from_slice(&0.25f32.to_le_bytes());
        }
        for t in 0..triangles {
            let t = t as i32;
            i32s(&mut data, &[t, t + 1, t + 2]);
        }
    }
    data
}

fn bench_mesh_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("mesh_decode");
    let parser = MeshParser::new();
    let options = ParseOptions::with_scale(0.01);

    for vertices in [100, 1_000, 10_000] {
        let data = synthetic_mesh(4, vertices);
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(vertices), &data, |b, data| {
            b.iter(|| parser.parse_bytes(black_box(data), &options))
        });
    }

    group.finish();
}

fn bench_mesh_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("mesh_merge");
    let parser = MeshParser::new();

    for vertices in [100, 1_000, 10_000] {
        let data = synthetic_mesh(4, vertices);
        let Ok(Some(mesh)) = parser.parse_bytes(&data, &ParseOptions::default()) else {
            continue;
        };
        group.throughput(Throughput::Elements(mesh.vertex_count() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(vertices), &mesh, |b, mesh| {
            b.iter(|| merge_mesh(black_box(mesh)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_mesh_decode, bench_mesh_merge);
criterion_main!(benches);

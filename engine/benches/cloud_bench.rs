//! Benchmarks for the cloud pipeline.
//!
//! Measures:
//!   1. Raw gradient-noise sampling (2D and periodic 3D fBm)
//!   2. Noise volume generation at the supported grid sizes
//!   3. A full frame: uniforms → ray march → composite
//!
//! Run with:
//!   cargo bench -p cloud_engine --bench cloud_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use glam::Vec3;

use cloud_engine::{
    CloudScene, CloudSettings, FrameRenderer, NoiseSampler, NoiseVolume, RayonDevice, VolumeGenerator,
    VolumeParams,
};

// ── Noise ──────────────────────────────────────────────────────────

fn bench_noise(c: &mut Criterion) {
    let sampler = NoiseSampler::new(42, 1.0, 1.0);
    let mut group = c.benchmark_group("noise");
    group.throughput(Throughput::Elements(1024));
    group.bench_function("sample_2d", |b| {
        b.iter(|| {
            let mut acc = 0.0;
            for i in 0..1024 {
                acc += sampler.sample(black_box(i as f32 * 0.37), black_box(i as f32 * 0.11));
            }
            acc
        })
    });
    group.bench_function("fbm3_periodic_4", |b| {
        b.iter(|| {
            let mut acc = 0.0;
            for i in 0..1024 {
                let p = Vec3::new(i as f32 * 0.013, 0.5, i as f32 * 0.007) * 8.0;
                acc += sampler.fbm3_periodic(black_box(p), 8, 4);
            }
            acc
        })
    });
    group.finish();
}

// ── Volume generation ──────────────────────────────────────────────

fn bench_generation(c: &mut Criterion) {
    let device = RayonDevice::new(0).unwrap();
    let mut group = c.benchmark_group("volume_generation");
    group.sample_size(10);
    for size in [32u32, 64, 128] {
        group.throughput(Throughput::Elements(u64::from(size).pow(3) * 2));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let shape_params = VolumeParams { size, ..VolumeParams::shape() };
            let detail_params = VolumeParams { size, ..VolumeParams::detail() };
            let mut shape = NoiseVolume::new(size);
            let mut detail = NoiseVolume::new(size);
            let mut generator = VolumeGenerator::new();
            b.iter(|| {
                generator
                    .generate(&device, &mut shape, &shape_params, &mut detail, &detail_params)
                    .unwrap()
            })
        });
    }
    group.finish();
}

// ── Full frame ─────────────────────────────────────────────────────

fn bench_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame");
    group.sample_size(20);
    for (label, divisor) in [("quarter_res", 4u32), ("eighth_res", 8)] {
        let mut settings = CloudSettings::default();
        settings.render.resolution_divisor = divisor;
        let mut scene = CloudScene::new(settings, 1600, 900).unwrap();
        group.bench_function(label, |b| {
            b.iter(|| {
                scene.update(1.0 / 60.0);
                scene.render_scene().unwrap();
                black_box(scene.presented().pixels.len())
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_noise, bench_generation, bench_frame);
criterion_main!(benches);

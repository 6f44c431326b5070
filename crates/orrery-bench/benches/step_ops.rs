//! Criterion micro-benchmarks for staged plugin dispatch and camera evaluation.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use orrery_bench::{camera_params, profile, DT};
use orrery_core::ParamTree;
use orrery_engine::{Environment, EnvironmentRegistry};
use orrery_render::CameraSchedule;

/// Benchmark: one full step with N plugins and no cameras.
fn bench_step_plugins(c: &mut Criterion) {
    let mut group = c.benchmark_group("step_plugins");
    for plugins in [1usize, 10, 100] {
        let registry = EnvironmentRegistry::new();
        let mut env = Environment::new(profile(plugins, 0, ParamTree::new()), &registry).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(plugins), &plugins, |b, _| {
            b.iter(|| black_box(env.step().unwrap()));
        });
    }
    group.finish();
}

/// Benchmark: one step where every camera fires (500 Hz at dt = 2 ms).
fn bench_step_cameras(c: &mut Criterion) {
    let mut group = c.benchmark_group("step_cameras");
    for (streams, cameras) in [("RGB", 1u32), ("RGB", 4), ("RGB_D_S", 4)] {
        let registry = EnvironmentRegistry::new();
        let params = camera_params(cameras, streams, 1.0 / DT, 64, 48);
        let mut env = Environment::new(profile(1, cameras, params), &registry).unwrap();
        assert_eq!(env.scheduler().len(), cameras as usize);
        group.bench_function(format!("{streams}x{cameras}"), |b| {
            b.iter(|| black_box(env.step().unwrap().cameras_fired));
        });
    }
    group.finish();
}

/// Benchmark: schedule polling on steps where the camera is not due.
fn bench_schedule_poll(c: &mut Criterion) {
    let mut schedule = CameraSchedule::new(15.0, DT, 0);
    let mut step = 0u64;
    c.bench_function("schedule_poll", |b| {
        b.iter(|| {
            step += 1;
            black_box(schedule.poll(step));
        });
    });
}

criterion_group!(
    benches,
    bench_step_plugins,
    bench_step_cameras,
    bench_schedule_poll
);
criterion_main!(benches);

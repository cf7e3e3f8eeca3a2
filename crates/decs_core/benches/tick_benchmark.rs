//! # Tick Benchmark
//!
//! Measures per-tick cost of per-entity and batch systems over a dense
//! world, plus entity allocation with every column growing.
//!
//! Run with: `cargo bench --package decs_core`

// Benchmarks don't need docs
#![allow(missing_docs)]

use bytemuck::{Pod, Zeroable};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use decs_core::{Component, ComponentMask, Engine, SystemDescriptor};

#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
#[repr(C)]
struct Position {
    x: f32,
    y: f32,
    z: f32,
}

impl Component for Position {
    const NAME: &'static str = "pos";
}

#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
#[repr(C)]
struct Velocity {
    x: f32,
    y: f32,
    z: f32,
}

impl Component for Velocity {
    const NAME: &'static str = "vel";
}

/// Every fourth entity lacks a velocity, splitting batch runs.
fn populated(count: usize, batch: bool) -> Engine {
    let mut engine = Engine::new();
    let pos = engine.register::<Position>().expect("register pos");
    let vel = engine.register::<Velocity>().expect("register vel");

    let desc = if batch {
        SystemDescriptor::batch("integrate", |world, range, ctx| {
            let (positions, velocities) =
                world.column_pair_mut::<Position, Velocity>(ctx.component(0), ctx.component(1));
            let indices = range.indices();
            for (p, v) in positions[indices.clone()].iter_mut().zip(&velocities[indices]) {
                p.x += v.x;
                p.y += v.y;
                p.z += v.z;
            }
        })
    } else {
        SystemDescriptor::new("integrate", |world, eid, ctx| {
            let v = *world.get::<Velocity>(ctx.component(1), eid);
            let p = world.get_mut::<Position>(ctx.component(0), eid);
            p.x += v.x;
            p.y += v.y;
            p.z += v.z;
        })
    };
    engine
        .register_system(desc.with_components(["pos", "vel"]))
        .expect("register system");

    for i in 0..count {
        let mask = if i % 4 == 3 {
            ComponentMask::from(pos)
        } else {
            ComponentMask::from(pos).with(vel)
        };
        let e = engine.alloc_entity(mask).expect("alloc");
        *engine.get_mut::<Velocity>(vel, e) = Velocity {
            x: 1.0,
            y: 0.5,
            z: -0.25,
        };
    }
    engine.prepare().expect("prepare");
    engine
}

fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");

    for count in [1_000, 10_000, 100_000] {
        group.bench_with_input(BenchmarkId::new("per_entity", count), &count, |b, &count| {
            let mut engine = populated(count, false);
            b.iter(|| engine.tick().expect("tick"));
        });
        group.bench_with_input(BenchmarkId::new("batch", count), &count, |b, &count| {
            let mut engine = populated(count, true);
            b.iter(|| engine.tick().expect("tick"));
        });
    }

    group.finish();
}

fn bench_alloc(c: &mut Criterion) {
    let mut group = c.benchmark_group("alloc_entity");

    for components in [1_usize, 8, 32] {
        group.bench_with_input(
            BenchmarkId::from_parameter(components),
            &components,
            |b, &components| {
                b.iter(|| {
                    let mut engine = Engine::new();
                    for i in 0..components {
                        engine
                            .register_component(format!("c{i}"), 16)
                            .expect("register");
                    }
                    for _ in 0..10_000 {
                        black_box(engine.alloc_entity(ComponentMask::EMPTY).expect("alloc"));
                    }
                    engine.world().entity_count()
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_tick, bench_alloc);
criterion_main!(benches);

//! # DECS Particle Demo
//!
//! Headless scene with three particles:
//!
//! - `physics` integrates position from velocity and runs before `render`
//! - `fade` dims every colour in contiguous batches, after `physics`
//! - `render` prints each particle's state
//!
//! ```bash
//! decs_demo                 # default configuration
//! decs_demo engine.toml     # entity_capacity / profiler / log_execution_order
//! ```

use std::process::ExitCode;

use bytemuck::{Pod, Zeroable};
use decs_core::{
    Component, ComponentMask, DecsResult, Engine, EngineConfig, EntityId, SystemContext,
    SystemDescriptor, World,
};

const PARTICLES: u16 = 3;
const TICKS: u32 = 2;

#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
#[repr(C)]
struct Physics {
    pos: [f32; 3],
    vel: [f32; 3],
}

impl Component for Physics {
    const NAME: &'static str = "phys";
}

#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
#[repr(C)]
struct Color {
    r: f32,
    g: f32,
    b: f32,
}

impl Component for Color {
    const NAME: &'static str = "color";
}

/// Seconds advanced per tick, attached to `physics`.
struct TimeStep(f32);

fn physics(world: &mut World, eid: EntityId, ctx: &mut SystemContext) {
    let dt = ctx.aux::<TimeStep>().map_or(1.0, |step| step.0);
    let phys = world.get_mut::<Physics>(ctx.component(0), eid);
    for (p, v) in phys.pos.iter_mut().zip(phys.vel) {
        *p += v * dt;
    }
}

fn render(world: &mut World, eid: EntityId, ctx: &mut SystemContext) {
    let phys = world.get::<Physics>(ctx.component(0), eid);
    let color = world.get::<Color>(ctx.component(1), eid);
    println!(
        "render({eid}): pos = ({:.3}, {:.3}, {:.3}), vel = ({:.3}, {:.3}, {:.3}), \
         color = ({:.3}, {:.3}, {:.3})",
        phys.pos[0],
        phys.pos[1],
        phys.pos[2],
        phys.vel[0],
        phys.vel[1],
        phys.vel[2],
        color.r,
        color.g,
        color.b
    );
}

fn build_scene(engine: &mut Engine) -> DecsResult<()> {
    let phys = engine.register::<Physics>()?;
    let color = engine.register::<Color>()?;

    engine.register_system(
        SystemDescriptor::new("physics", physics)
            .with_components([Physics::NAME])
            .with_aux(TimeStep(0.5))
            .with_post_deps(["render"]),
    )?;
    engine.register_system(
        SystemDescriptor::new("render", render)
            .with_components([Physics::NAME, Color::NAME]),
    )?;
    engine.register_system(
        SystemDescriptor::batch("fade", |world, range, ctx| {
            let colors = world.column_mut::<Color>(ctx.component(0));
            for c in &mut colors[range.indices()] {
                c.r *= 0.9;
                c.g *= 0.9;
                c.b *= 0.9;
            }
        })
        .with_components([Color::NAME])
        .with_pre_deps(["physics"])
        .with_post_deps(["render"]),
    )?;

    for i in 0..PARTICLES {
        let eid = engine.alloc_entity(ComponentMask::from(phys).with(color))?;
        let n = f32::from(i);
        *engine.get_mut::<Physics>(phys, eid) = Physics {
            pos: [n, n * 2.0, n * 3.0],
            vel: [n * 0.04, n * 0.05, n * 0.06],
        };
        *engine.get_mut::<Color>(color, eid) = Color {
            r: n * 0.1,
            g: n * 0.3,
            b: n * 0.2,
        };
    }
    Ok(())
}

fn run(config: EngineConfig) -> DecsResult<()> {
    let mut engine = Engine::with_config(config);
    build_scene(&mut engine)?;

    engine.tick_dryrun()?;

    for tick in 1..=TICKS {
        println!();
        println!("tick {tick}");
        engine.tick()?;
    }

    println!();
    println!("{:<10} {:>8} {:>14} {:>14}", "system", "samples", "last", "mean");
    for system in engine.systems().as_slice() {
        let record = system.perf();
        println!(
            "{:<10} {:>8} {:>14} {:>14}",
            system.name(),
            record.samples,
            record.last.instructions,
            record.mean_instructions()
        );
    }

    engine.cleanup();
    Ok(())
}

fn main() -> ExitCode {
    let config = match std::env::args().nth(1) {
        Some(path) => match EngineConfig::load(&path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("failed to load {path}: {err}");
                return ExitCode::FAILURE;
            }
        },
        None => EngineConfig::default(),
    };
    tracing::debug!("Starting demo with {:?}", config);

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("demo failed: {err}");
            ExitCode::FAILURE
        }
    }
}

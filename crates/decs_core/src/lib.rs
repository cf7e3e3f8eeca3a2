//! # DECS Core
//!
//! Data-oriented Entity Component System runtime with dependency-ordered
//! system scheduling.
//!
//! - Components live in dense, entity-indexed columns
//! - Systems select entities with a required/excluded bitmask
//! - Pre- and post-dependencies order systems within a tick
//! - Batch systems receive maximal contiguous runs of matching entities
//!
//! ## Example
//!
//! ```rust,ignore
//! use decs_core::{ComponentMask, Engine, SystemDescriptor};
//!
//! let mut engine = Engine::new();
//! let pos = engine.register_component("pos", 8)?;
//! let vel = engine.register_component("vel", 8)?;
//!
//! engine.register_system(
//!     SystemDescriptor::new("physics", |world, eid, ctx| { /* ... */ })
//!         .with_components(["pos", "vel"])
//!         .with_post_deps(["render"]),
//! )?;
//! engine.register_system(SystemDescriptor::new("render", |_, _, _| {}))?;
//!
//! engine.alloc_entity(ComponentMask::from(pos).with(vel))?;
//! engine.tick()?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod ecs;
pub mod engine;
pub mod error;
pub mod perf;
pub mod schedule;

pub use config::EngineConfig;
pub use ecs::{
    Component, ComponentHandle, ComponentId, ComponentMask, EntityId, EntityRange, Query,
    SystemContext, World,
};
pub use engine::Engine;
pub use error::{DecsError, DecsResult};
pub use perf::{
    ClockProfiler, MeasurementError, NullProfiler, PerfRecord, PerfStats, Profiler, ProfilerKind,
    ProfilingSession,
};
pub use schedule::{ExecutionPlan, SystemDescriptor, SystemId};

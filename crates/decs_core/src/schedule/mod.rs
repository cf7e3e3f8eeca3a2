//! # Scheduling
//!
//! System registration, dependency resolution and the tick loop.

mod graph;
mod scheduler;
mod system;

pub use graph::{DependencyGraph, ExecutionPlan};
pub use scheduler::Scheduler;
pub use system::{
    BatchFn, EntityFn, System, SystemDescriptor, SystemFn, SystemId, SystemRegistry,
};

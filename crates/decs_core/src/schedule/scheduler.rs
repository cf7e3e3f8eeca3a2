//! # Tick Scheduler
//!
//! Runs every registered system exactly once per tick, in plan order.
//!
//! The plan is built lazily: registering a system invalidates it, and the
//! next tick, dry-run, or explicit prepare rebuilds it.

use std::io::Write;

use super::graph::ExecutionPlan;
use super::system::{SystemId, SystemRegistry};
use crate::ecs::World;
use crate::error::DecsResult;
use crate::perf::ProfilingSession;

/// Owns the execution plan and the tick counter.
#[derive(Debug, Default)]
pub struct Scheduler {
    plan: Option<ExecutionPlan>,
    ticks: u64,
    log_execution_order: bool,
}

impl Scheduler {
    /// Creates an unprepared scheduler.
    #[must_use]
    pub const fn new(log_execution_order: bool) -> Self {
        Self {
            plan: None,
            ticks: 0,
            log_execution_order,
        }
    }

    /// Drops the current plan.
    pub fn invalidate(&mut self) {
        self.plan = None;
    }

    /// True when a valid plan exists.
    #[inline]
    #[must_use]
    pub const fn is_prepared(&self) -> bool {
        self.plan.is_some()
    }

    /// The current plan, if prepared.
    #[inline]
    #[must_use]
    pub const fn plan(&self) -> Option<&ExecutionPlan> {
        self.plan.as_ref()
    }

    /// Completed ticks.
    #[inline]
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.ticks
    }

    /// Builds the plan if needed.
    ///
    /// # Errors
    ///
    /// Returns `UnknownDependency` or `DependencyCycle`. The scheduler stays
    /// unprepared.
    pub fn prepare(&mut self, systems: &SystemRegistry) -> DecsResult<&ExecutionPlan> {
        let plan = match self.plan.take() {
            Some(plan) => plan,
            None => {
                let plan = ExecutionPlan::build(systems)?;
                tracing::info!("Execution plan built for {} systems", plan.order().len());
                if self.log_execution_order {
                    tracing::info!(
                        "Execution order: {}",
                        join_names(systems, plan.order(), " -> ")
                    );
                }
                plan
            }
        };
        Ok(self.plan.insert(plan))
    }

    /// Runs every system once.
    ///
    /// # Errors
    ///
    /// Fails only if the plan cannot be built.
    pub fn tick(
        &mut self,
        world: &mut World,
        systems: &mut SystemRegistry,
        session: &mut ProfilingSession,
    ) -> DecsResult<()> {
        let plan = self.prepare(systems)?;
        for &id in plan.order() {
            if let Some(system) = systems.get_mut(id) {
                system.run(world, session);
            }
        }
        self.ticks += 1;
        Ok(())
    }

    /// Writes the execution order without running anything.
    ///
    /// ```text
    /// System execution order:
    /// physics  (deps: )
    /// render  (deps: physics)
    /// ```
    ///
    /// # Errors
    ///
    /// Returns plan construction errors, or `Io` if writing fails.
    pub fn write_dryrun<W: Write>(
        &mut self,
        systems: &SystemRegistry,
        out: &mut W,
    ) -> DecsResult<()> {
        let plan = self.prepare(systems)?;
        writeln!(out, "System execution order:")?;
        for &id in plan.order() {
            let deps = join_names(systems, plan.graph().dependencies(id), ", ");
            if let Some(system) = systems.get(id) {
                writeln!(out, "{}  (deps: {})", system.name(), deps)?;
            }
        }
        Ok(())
    }

    /// Resets the plan and the tick counter.
    pub fn reset(&mut self) {
        self.plan = None;
        self.ticks = 0;
    }
}

fn join_names(systems: &SystemRegistry, ids: &[SystemId], sep: &str) -> String {
    ids.iter()
        .filter_map(|&id| systems.get(id).map(|s| s.name()))
        .collect::<Vec<_>>()
        .join(sep)
}

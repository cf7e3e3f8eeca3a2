//! # Engine
//!
//! Top-level handle tying together the world, the system registry, the
//! scheduler and the profiling session.
//!
//! ## Lifecycle
//!
//! ```text
//! new ─► register components ─► register systems ─► alloc entities
//!                                      │
//!                          prepare (lazy) ─► tick ─► tick ─► ... ─► cleanup
//! ```

use std::io::Write;

use bytemuck::Pod;

use crate::config::EngineConfig;
use crate::ecs::{Component, ComponentId, ComponentMask, EntityId, World};
use crate::error::DecsResult;
use crate::perf::{PerfRecord, Profiler, ProfilingSession};
use crate::schedule::{Scheduler, SystemDescriptor, SystemId, SystemRegistry};

/// The ECS runtime.
///
/// # Example
///
/// ```rust,ignore
/// let mut engine = Engine::new();
/// let pos = engine.register_component("pos", 8)?;
/// engine.register_system(
///     SystemDescriptor::new("drift", |world, eid, ctx| {
///         world.slot_mut(ctx.component(0), eid)[0] += 1;
///     })
///     .with_components(["pos"]),
/// )?;
/// engine.alloc_entity(ComponentMask::from(pos))?;
/// engine.tick()?;
/// ```
#[derive(Debug)]
pub struct Engine {
    world: World,
    systems: SystemRegistry,
    scheduler: Scheduler,
    profiler: ProfilingSession,
    config: EngineConfig,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Creates an engine with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Creates an engine from `config`, opening the backend it selects.
    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        let backend = config.profiler.build();
        Self::with_profiler(config, backend)
    }

    /// Creates an engine that measures systems with `backend`.
    ///
    /// `config.profiler` is ignored; the engine owns `backend` until
    /// [`cleanup`](Self::cleanup) or drop.
    #[must_use]
    pub fn with_profiler(config: EngineConfig, backend: Box<dyn Profiler>) -> Self {
        Self {
            world: World::with_capacity(config.entity_capacity),
            systems: SystemRegistry::new(),
            scheduler: Scheduler::new(config.log_execution_order),
            profiler: ProfilingSession::open(backend),
            config,
        }
    }

    /// The active configuration.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Registers a component type of `element_size` bytes.
    ///
    /// # Errors
    ///
    /// See [`World::register_component`].
    pub fn register_component(
        &mut self,
        name: impl Into<String>,
        element_size: usize,
    ) -> DecsResult<ComponentId> {
        self.world.register_component(name, element_size)
    }

    /// Registers a typed component.
    ///
    /// # Errors
    ///
    /// See [`World::register`].
    pub fn register<T: Component>(&mut self) -> DecsResult<ComponentId> {
        self.world.register::<T>()
    }

    /// Registers a system and invalidates the execution plan.
    ///
    /// # Errors
    ///
    /// See [`SystemRegistry::register`]. A failed registration changes
    /// nothing.
    pub fn register_system(&mut self, desc: SystemDescriptor) -> DecsResult<SystemId> {
        let id = self.systems.register(&self.world, desc)?;
        self.scheduler.invalidate();
        Ok(id)
    }

    /// Allocates an entity.
    ///
    /// # Errors
    ///
    /// See [`World::alloc_entity`].
    pub fn alloc_entity(&mut self, mask: ComponentMask) -> DecsResult<EntityId> {
        self.world.alloc_entity(mask)
    }

    // =========================================================================
    // World access
    // =========================================================================

    /// The world.
    #[inline]
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// The world, mutably.
    #[inline]
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Bytes of component `id` for `entity`.
    ///
    /// # Panics
    ///
    /// Panics if `id` or `entity` is out of range.
    #[must_use]
    pub fn slot(&self, id: ComponentId, entity: EntityId) -> &[u8] {
        self.world.slot(id, entity)
    }

    /// Mutable bytes of component `id` for `entity`.
    ///
    /// # Panics
    ///
    /// Panics if `id` or `entity` is out of range.
    pub fn slot_mut(&mut self, id: ComponentId, entity: EntityId) -> &mut [u8] {
        self.world.slot_mut(id, entity)
    }

    /// Typed value of component `id` for `entity`.
    ///
    /// # Panics
    ///
    /// Panics if `id`/`entity` is out of range or `T` does not fit.
    #[must_use]
    pub fn get<T: Pod>(&self, id: ComponentId, entity: EntityId) -> &T {
        self.world.get(id, entity)
    }

    /// Mutable typed value of component `id` for `entity`.
    ///
    /// # Panics
    ///
    /// Panics if `id`/`entity` is out of range or `T` does not fit.
    pub fn get_mut<T: Pod>(&mut self, id: ComponentId, entity: EntityId) -> &mut T {
        self.world.get_mut(id, entity)
    }

    /// The system registry.
    #[inline]
    #[must_use]
    pub const fn systems(&self) -> &SystemRegistry {
        &self.systems
    }

    // =========================================================================
    // Scheduling
    // =========================================================================

    /// Resolves dependencies and builds the execution plan if needed.
    ///
    /// # Errors
    ///
    /// Returns `UnknownDependency` or `DependencyCycle`.
    pub fn prepare(&mut self) -> DecsResult<()> {
        self.scheduler.prepare(&self.systems).map(|_| ())
    }

    /// Runs every system once, dependencies first.
    ///
    /// # Errors
    ///
    /// Fails only if the plan cannot be built.
    pub fn tick(&mut self) -> DecsResult<()> {
        self.scheduler
            .tick(&mut self.world, &mut self.systems, &mut self.profiler)
    }

    /// Prints the execution order to standard output.
    ///
    /// # Errors
    ///
    /// Returns plan construction errors, or `Io`.
    pub fn tick_dryrun(&mut self) -> DecsResult<()> {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        self.write_dryrun(&mut out)
    }

    /// Writes the execution order to `out`.
    ///
    /// # Errors
    ///
    /// Returns plan construction errors, or `Io`.
    pub fn write_dryrun<W: Write>(&mut self, out: &mut W) -> DecsResult<()> {
        self.scheduler.write_dryrun(&self.systems, out)
    }

    /// System names in execution order.
    ///
    /// # Errors
    ///
    /// Returns plan construction errors.
    pub fn execution_order(&mut self) -> DecsResult<Vec<String>> {
        let plan = self.scheduler.prepare(&self.systems)?;
        Ok(plan
            .order()
            .iter()
            .filter_map(|&id| self.systems.get(id).map(|s| s.name().to_string()))
            .collect())
    }

    /// Resolved dependencies of system `id`.
    ///
    /// # Errors
    ///
    /// Returns plan construction errors.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not registered.
    pub fn dependencies(&mut self, id: SystemId) -> DecsResult<Vec<SystemId>> {
        let plan = self.scheduler.prepare(&self.systems)?;
        Ok(plan.graph().dependencies(id).to_vec())
    }

    /// Completed ticks.
    #[inline]
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.scheduler.tick_count()
    }

    /// Accumulated measurements of system `id`.
    #[must_use]
    pub fn perf_record(&self, id: SystemId) -> Option<&PerfRecord> {
        self.systems.get(id).map(|system| system.perf())
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    /// Releases all storage, systems and the plan, and closes the profiler.
    ///
    /// The engine is empty afterwards and can be reused; measurements stay
    /// off until a new engine is created.
    pub fn cleanup(&mut self) {
        self.world.release();
        self.systems.release();
        self.scheduler.reset();
        self.profiler.close();
        tracing::debug!("Engine cleaned up");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::perf::ProfilerKind;
    use crate::DecsError;

    #[test]
    fn test_registration_invalidates_plan() {
        let mut engine = Engine::new();
        engine
            .register_system(SystemDescriptor::new("a", |_, _, _| {}))
            .unwrap();
        assert_eq!(engine.execution_order().unwrap(), ["a"]);

        engine
            .register_system(SystemDescriptor::new("b", |_, _, _| {}).with_post_deps(["a"]))
            .unwrap();
        assert_eq!(engine.execution_order().unwrap(), ["b", "a"]);
    }

    #[test]
    fn test_failed_registration_keeps_plan() {
        let mut engine = Engine::new();
        engine
            .register_system(SystemDescriptor::new("a", |_, _, _| {}))
            .unwrap();
        engine.prepare().unwrap();

        let err = engine
            .register_system(SystemDescriptor::new("b", |_, _, _| {}).with_components(["x"]))
            .unwrap_err();
        assert!(matches!(err, DecsError::UnknownComponent { .. }));
        assert_eq!(engine.systems().len(), 1);
    }

    #[test]
    fn test_clock_profiler_records_samples() {
        let mut engine = Engine::with_config(EngineConfig {
            profiler: ProfilerKind::Clock,
            ..EngineConfig::default()
        });
        let id = engine
            .register_system(SystemDescriptor::new("a", |_, _, _| {}))
            .unwrap();
        engine.tick().unwrap();
        engine.tick().unwrap();

        let record = engine.perf_record(id).unwrap();
        assert_eq!(record.samples, 2);
        assert_eq!(record.failures, 0);
    }

    #[test]
    fn test_cleanup_empties_engine() {
        let mut engine = Engine::new();
        let pos = engine.register_component("pos", 8).unwrap();
        engine.alloc_entity(ComponentMask::from(pos)).unwrap();
        engine
            .register_system(SystemDescriptor::new("a", |_, _, _| {}))
            .unwrap();
        engine.tick().unwrap();

        engine.cleanup();
        assert_eq!(engine.world().entity_count(), 0);
        assert_eq!(engine.world().component_count(), 0);
        assert!(engine.systems().is_empty());
        assert_eq!(engine.tick_count(), 0);

        // Reusable after cleanup.
        engine.register_component("pos", 8).unwrap();
        engine.tick().unwrap();
        assert_eq!(engine.tick_count(), 1);
    }
}

//! # Systems
//!
//! A system is a named function over the entities matching its query.
//! Registration resolves component and pre-dependency names immediately;
//! post-dependencies stay as names until the execution plan is built.

use std::any::Any;
use std::fmt;

use crate::ecs::{
    default_prepare, ComponentId, ComponentMask, EntityId, EntityRange, PrepareFn, Query,
    RunDetector, SystemContext, World,
};
use crate::error::{DecsError, DecsResult};
use crate::perf::{PerfRecord, ProfilingSession};

/// Identifier of a registered system: its registration index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct SystemId(u32);

impl SystemId {
    /// Creates a system id from its index.
    #[inline]
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the registration index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Per-entity system body.
pub type EntityFn = Box<dyn FnMut(&mut World, EntityId, &mut SystemContext)>;

/// Batch system body, called once per contiguous run.
pub type BatchFn = Box<dyn FnMut(&mut World, EntityRange, &mut SystemContext)>;

/// The body of a system.
pub enum SystemFn {
    /// Called once per matching entity.
    PerEntity(EntityFn),
    /// Called once per maximal contiguous run of matching entities.
    Batch(BatchFn),
}

impl SystemFn {
    /// True for batch bodies.
    #[inline]
    #[must_use]
    pub const fn is_batch(&self) -> bool {
        matches!(self, Self::Batch(_))
    }
}

impl fmt::Debug for SystemFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::PerEntity(_) => "PerEntity",
            Self::Batch(_) => "Batch",
        })
    }
}

/// Registration request for a system.
///
/// # Example
///
/// ```rust,ignore
/// let physics = SystemDescriptor::new("physics", |world, eid, ctx| {
///     let pos = ctx.component(0);
///     world.get_mut::<[f32; 2]>(pos, eid)[0] += 1.0;
/// })
/// .with_components(["pos", "vel"])
/// .with_post_deps(["render"]);
/// ```
pub struct SystemDescriptor {
    name: String,
    components: Vec<String>,
    excluded: Vec<String>,
    pre_deps: Vec<String>,
    post_deps: Vec<String>,
    func: SystemFn,
    prepare: Option<PrepareFn>,
    aux: Option<Box<dyn Any>>,
}

fn names<I>(items: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}

impl SystemDescriptor {
    fn with_fn(name: impl Into<String>, func: SystemFn) -> Self {
        Self {
            name: name.into(),
            components: Vec::new(),
            excluded: Vec::new(),
            pre_deps: Vec::new(),
            post_deps: Vec::new(),
            func,
            prepare: None,
            aux: None,
        }
    }

    /// Describes a per-entity system.
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: FnMut(&mut World, EntityId, &mut SystemContext) + 'static,
    {
        Self::with_fn(name, SystemFn::PerEntity(Box::new(func)))
    }

    /// Describes a batch system.
    pub fn batch<F>(name: impl Into<String>, func: F) -> Self
    where
        F: FnMut(&mut World, EntityRange, &mut SystemContext) + 'static,
    {
        Self::with_fn(name, SystemFn::Batch(Box::new(func)))
    }

    /// Required components, in the order the context will expose them.
    #[must_use]
    pub fn with_components<I>(mut self, components: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.components = names(components);
        self
    }

    /// Components that reject an entity when all are present.
    #[must_use]
    pub fn with_excluded<I>(mut self, excluded: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.excluded = names(excluded);
        self
    }

    /// Systems that must run before this one. They must already be registered.
    #[must_use]
    pub fn with_pre_deps<I>(mut self, deps: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.pre_deps = names(deps);
        self
    }

    /// Systems that must run after this one. They may be registered later.
    #[must_use]
    pub fn with_post_deps<I>(mut self, deps: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.post_deps = names(deps);
        self
    }

    /// Replaces the standard prepare routine.
    #[must_use]
    pub fn with_prepare<F>(mut self, prepare: F) -> Self
    where
        F: FnMut(&World, &[ComponentId], &mut SystemContext) + 'static,
    {
        self.prepare = Some(Box::new(prepare));
        self
    }

    /// Attaches an auxiliary payload, reachable through [`SystemContext::aux`]
    /// and [`SystemContext::aux_mut`]. It lives as long as the system.
    #[must_use]
    pub fn with_aux<T: Any>(mut self, aux: T) -> Self {
        self.aux = Some(Box::new(aux));
        self
    }

    /// The system name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for SystemDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemDescriptor")
            .field("name", &self.name)
            .field("components", &self.components)
            .field("excluded", &self.excluded)
            .field("pre_deps", &self.pre_deps)
            .field("post_deps", &self.post_deps)
            .field("func", &self.func)
            .finish_non_exhaustive()
    }
}

/// A registered system.
pub struct System {
    id: SystemId,
    name: String,
    required: Vec<ComponentId>,
    excluded: Vec<ComponentId>,
    query: Query,
    pre_deps: Vec<SystemId>,
    post_deps: Vec<String>,
    func: SystemFn,
    prepare: PrepareFn,
    context: SystemContext,
    perf: PerfRecord,
}

impl System {
    /// The system id.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> SystemId {
        self.id
    }

    /// The system name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolved required components, in declaration order.
    #[must_use]
    pub fn required(&self) -> &[ComponentId] {
        &self.required
    }

    /// Resolved excluded components, in declaration order.
    #[must_use]
    pub fn excluded(&self) -> &[ComponentId] {
        &self.excluded
    }

    /// The entity filter.
    #[inline]
    #[must_use]
    pub const fn query(&self) -> Query {
        self.query
    }

    /// Resolved pre-dependencies.
    #[must_use]
    pub fn pre_deps(&self) -> &[SystemId] {
        &self.pre_deps
    }

    /// Unresolved post-dependency names.
    #[must_use]
    pub fn post_deps(&self) -> &[String] {
        &self.post_deps
    }

    /// True for batch systems.
    #[inline]
    #[must_use]
    pub const fn is_batch(&self) -> bool {
        self.func.is_batch()
    }

    /// The context as of the last prepare.
    #[inline]
    #[must_use]
    pub const fn context(&self) -> &SystemContext {
        &self.context
    }

    /// Accumulated measurements.
    #[inline]
    #[must_use]
    pub const fn perf(&self) -> &PerfRecord {
        &self.perf
    }

    /// Runs the system once over `world`: prepare, measure, process, record.
    pub(crate) fn run(&mut self, world: &mut World, session: &mut ProfilingSession) {
        (self.prepare)(&*world, &self.required, &mut self.context);

        let measuring = session.is_active()
            && match session.start() {
                Ok(()) => true,
                Err(err) => {
                    tracing::warn!("System \"{}\": measurement start failed: {}", self.name, err);
                    self.perf.record_failure();
                    false
                }
            };

        let query = self.query;
        match &mut self.func {
            SystemFn::PerEntity(func) => {
                let mut index = 0;
                while index < world.entity_count() {
                    if query.matches(world.entities().mask_at(index)) {
                        func(&mut *world, EntityId::new(index as u64), &mut self.context);
                    }
                    index += 1;
                }
            }
            SystemFn::Batch(func) => {
                let mut detector = RunDetector::new();
                let mut index = 0;
                while index < world.entity_count() {
                    let matched = query.matches_run(world.entities().mask_at(index));
                    if let Some(range) = detector.feed(EntityId::new(index as u64), matched) {
                        func(&mut *world, range, &mut self.context);
                    }
                    index += 1;
                }
                if let Some(range) = detector.finish() {
                    func(&mut *world, range, &mut self.context);
                }
            }
        }

        if !measuring {
            return;
        }
        match session.end() {
            Ok(stats) => self.perf.record(stats),
            Err(err) => {
                tracing::warn!("System \"{}\": measurement end failed: {}", self.name, err);
                self.perf.record_failure();
            }
        }
    }

    fn release(&mut self) {
        self.context.release();
        self.required = Vec::new();
        self.excluded = Vec::new();
        self.pre_deps = Vec::new();
        self.post_deps = Vec::new();
    }
}

impl fmt::Debug for System {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("System")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("query", &self.query)
            .field("pre_deps", &self.pre_deps)
            .field("post_deps", &self.post_deps)
            .field("func", &self.func)
            .finish_non_exhaustive()
    }
}

/// All registered systems, in registration order.
#[derive(Debug, Default)]
pub struct SystemRegistry {
    systems: Vec<System>,
}

impl SystemRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            systems: Vec::new(),
        }
    }

    /// Registers a system against the components known to `world`.
    ///
    /// Nothing is stored unless every check passes.
    ///
    /// # Errors
    ///
    /// - `DuplicateSystem` if the name is taken
    /// - `UnknownComponent` / `UnknownDependency` for unresolved names
    /// - `BatchExclusion` for a batch system with exclusions
    pub fn register(&mut self, world: &World, desc: SystemDescriptor) -> DecsResult<SystemId> {
        let SystemDescriptor {
            name,
            components,
            excluded,
            pre_deps,
            post_deps,
            func,
            prepare,
            aux,
        } = desc;

        if self.find(&name).is_some() {
            return Err(DecsError::DuplicateSystem(name));
        }
        if func.is_batch() && !excluded.is_empty() {
            return Err(DecsError::BatchExclusion(name));
        }

        let required = resolve_components(world, &name, &components)?;
        let excluded = resolve_components(world, &name, &excluded)?;
        let pre_deps = pre_deps
            .iter()
            .map(|dep| {
                self.find(dep).ok_or_else(|| {
                    tracing::error!(
                        "System \"{}\": could not find id for dependency system name \"{}\"",
                        name,
                        dep
                    );
                    DecsError::UnknownDependency {
                        system: name.clone(),
                        dependency: dep.clone(),
                    }
                })
            })
            .collect::<DecsResult<Vec<_>>>()?;

        let query = Query::new(
            required.iter().copied().collect::<ComponentMask>(),
            excluded.iter().copied().collect::<ComponentMask>(),
        );

        #[allow(clippy::cast_possible_truncation)]
        let id = SystemId::new(self.systems.len() as u32);
        tracing::debug!(
            "Registered system \"{}\" (id {}, {} components, batch: {})",
            name,
            id.index(),
            required.len(),
            func.is_batch()
        );

        self.systems.push(System {
            id,
            name,
            context: SystemContext::new(required.len(), aux),
            required,
            excluded,
            query,
            pre_deps,
            post_deps,
            func,
            prepare: prepare.unwrap_or_else(|| Box::new(default_prepare)),
            perf: PerfRecord::default(),
        });
        Ok(id)
    }

    /// Looks up a system id by name (linear scan).
    #[must_use]
    pub fn find(&self, name: &str) -> Option<SystemId> {
        self.systems
            .iter()
            .find(|system| system.name == name)
            .map(System::id)
    }

    /// The system with `id`, if registered.
    #[inline]
    #[must_use]
    pub fn get(&self, id: SystemId) -> Option<&System> {
        self.systems.get(id.index())
    }

    pub(crate) fn get_mut(&mut self, id: SystemId) -> Option<&mut System> {
        self.systems.get_mut(id.index())
    }

    /// All systems, in registration order.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[System] {
        &self.systems
    }

    /// Number of registered systems.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.systems.len()
    }

    /// True when no system is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// Releases every system's context and edge lists, then drops them.
    pub fn release(&mut self) {
        for system in &mut self.systems {
            system.release();
        }
        self.systems = Vec::new();
    }
}

fn resolve_components(
    world: &World,
    system: &str,
    names: &[String],
) -> DecsResult<Vec<ComponentId>> {
    names
        .iter()
        .map(|component| {
            world.component_id(component).ok_or_else(|| {
                tracing::error!(
                    "System \"{}\": could not find id for component name \"{}\"",
                    system,
                    component
                );
                DecsError::UnknownComponent {
                    system: system.to_string(),
                    component: component.clone(),
                }
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> World {
        let mut world = World::new();
        world.register_component("pos", 8).unwrap();
        world.register_component("vel", 8).unwrap();
        world
    }

    fn noop(_: &mut World, _: EntityId, _: &mut SystemContext) {}

    #[test]
    fn test_register_resolves_names() {
        let world = world();
        let mut registry = SystemRegistry::new();
        let a = registry
            .register(&world, SystemDescriptor::new("a", noop).with_components(["vel", "pos"]))
            .unwrap();
        let b = registry
            .register(&world, SystemDescriptor::new("b", noop).with_pre_deps(["a"]))
            .unwrap();

        let system_a = registry.get(a).unwrap();
        assert_eq!(system_a.required(), &[ComponentId::new(1), ComponentId::new(0)]);
        assert_eq!(system_a.query().required().bits(), 0b11);
        assert_eq!(registry.get(b).unwrap().pre_deps(), &[a]);
        assert_eq!(registry.find("b"), Some(b));
    }

    #[test]
    fn test_unknown_component_leaves_registry_unchanged() {
        let world = world();
        let mut registry = SystemRegistry::new();
        let err = registry
            .register(&world, SystemDescriptor::new("a", noop).with_components(["pos", "acc"]))
            .unwrap_err();
        assert_eq!(
            err,
            DecsError::UnknownComponent {
                system: "a".to_string(),
                component: "acc".to_string(),
            }
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_pre_dep_must_exist() {
        let world = world();
        let mut registry = SystemRegistry::new();
        let err = registry
            .register(&world, SystemDescriptor::new("a", noop).with_pre_deps(["later"]))
            .unwrap_err();
        assert!(matches!(err, DecsError::UnknownDependency { .. }));
    }

    #[test]
    fn test_post_deps_stay_unresolved() {
        let world = world();
        let mut registry = SystemRegistry::new();
        let a = registry
            .register(&world, SystemDescriptor::new("a", noop).with_post_deps(["later"]))
            .unwrap();
        assert_eq!(registry.get(a).unwrap().post_deps(), &["later".to_string()]);
    }

    #[test]
    fn test_duplicate_system() {
        let world = world();
        let mut registry = SystemRegistry::new();
        registry.register(&world, SystemDescriptor::new("a", noop)).unwrap();
        assert_eq!(
            registry.register(&world, SystemDescriptor::new("a", noop)),
            Err(DecsError::DuplicateSystem("a".to_string()))
        );
    }

    #[test]
    fn test_batch_exclusion_rejected() {
        let world = world();
        let mut registry = SystemRegistry::new();
        let desc = SystemDescriptor::batch("b", |_, _, _| {})
            .with_components(["pos"])
            .with_excluded(["vel"]);
        assert_eq!(
            registry.register(&world, desc),
            Err(DecsError::BatchExclusion("b".to_string()))
        );
    }

    #[test]
    fn test_run_records_perf() {
        let mut world = world();
        world.alloc_entity(ComponentMask::from_bits(0b01)).unwrap();
        let mut registry = SystemRegistry::new();
        let id = registry
            .register(&world, SystemDescriptor::new("a", noop).with_components(["pos"]))
            .unwrap();

        let mut session = ProfilingSession::null();
        let system = registry.get_mut(id).unwrap();
        system.run(&mut world, &mut session);
        assert_eq!(system.perf().samples, 1);
        assert_eq!(system.context().entity_count(), 1);
    }
}

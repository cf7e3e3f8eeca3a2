//! # Dependency Graph
//!
//! Edges are built in two passes over the registry:
//!
//! 1. Each system's resolved pre-dependencies become its own edges.
//! 2. For every post-dependency `Y` declared by `X`, `X` is appended to
//!    `Y`'s edges, so `X` runs before `Y`.
//!
//! The execution order is a depth-first walk seeded in registration order:
//! a system is emitted after all of its dependencies, each exactly once.
//!
//! ```text
//! registered:  a   b(pre: a)   c(post: a)
//! edges:       a: [c]   b: [a]   c: []
//! order:       c, a, b
//! ```

use super::system::{SystemId, SystemRegistry};
use crate::error::{DecsError, DecsResult};

/// Resolved "runs after" edges, indexed by system id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    edges: Vec<Vec<SystemId>>,
}

impl DependencyGraph {
    /// Builds the edges of every registered system.
    ///
    /// # Errors
    ///
    /// Returns `UnknownDependency` if a post-dependency names no system.
    pub fn build(systems: &SystemRegistry) -> DecsResult<Self> {
        // Phase 1: pre-dependencies, already resolved at registration.
        let mut edges: Vec<Vec<SystemId>> = systems
            .as_slice()
            .iter()
            .map(|system| system.pre_deps().to_vec())
            .collect();

        // Phase 2: post-dependencies become edges on their target.
        for system in systems.as_slice() {
            for name in system.post_deps() {
                let target = systems.find(name).ok_or_else(|| {
                    tracing::error!(
                        "System \"{}\": could not find id for dependency system name \"{}\"",
                        system.name(),
                        name
                    );
                    DecsError::UnknownDependency {
                        system: system.name().to_string(),
                        dependency: name.clone(),
                    }
                })?;
                edges[target.index()].push(system.id());
            }
        }

        Ok(Self { edges })
    }

    /// Systems that must complete before `id` begins, in edge order.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not part of the graph.
    #[inline]
    #[must_use]
    pub fn dependencies(&self, id: SystemId) -> &[SystemId] {
        &self.edges[id.index()]
    }

    /// Number of systems in the graph.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// True when the graph holds no system.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// The dependency graph plus the linear order it induces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionPlan {
    graph: DependencyGraph,
    order: Vec<SystemId>,
}

impl ExecutionPlan {
    /// Resolves dependencies and orders every registered system.
    ///
    /// # Errors
    ///
    /// - `UnknownDependency` if a post-dependency names no system
    /// - `DependencyCycle` if the edges form a cycle
    pub fn build(systems: &SystemRegistry) -> DecsResult<Self> {
        let graph = DependencyGraph::build(systems)?;
        let mut marks = vec![Mark::Unvisited; graph.len()];
        let mut order = Vec::with_capacity(graph.len());
        let mut path = Vec::new();

        for index in 0..graph.len() {
            #[allow(clippy::cast_possible_truncation)]
            let id = SystemId::new(index as u32);
            if marks[index] == Mark::Unvisited {
                if let Some(cycle) = visit(&graph, id, &mut marks, &mut path, &mut order) {
                    let cycle = cycle
                        .iter()
                        .filter_map(|&id| systems.get(id).map(|s| s.name().to_string()))
                        .collect::<Vec<_>>()
                        .join(" -> ");
                    tracing::error!("Dependency cycle detected: {}", cycle);
                    return Err(DecsError::DependencyCycle { cycle });
                }
            }
        }

        Ok(Self { graph, order })
    }

    /// System ids in execution order.
    #[inline]
    #[must_use]
    pub fn order(&self) -> &[SystemId] {
        &self.order
    }

    /// The resolved graph.
    #[inline]
    #[must_use]
    pub const fn graph(&self) -> &DependencyGraph {
        &self.graph
    }
}

/// Emits `id` after its dependencies. Returns the cycle path on a back edge.
fn visit(
    graph: &DependencyGraph,
    id: SystemId,
    marks: &mut [Mark],
    path: &mut Vec<SystemId>,
    order: &mut Vec<SystemId>,
) -> Option<Vec<SystemId>> {
    marks[id.index()] = Mark::InProgress;
    path.push(id);

    for &dep in graph.dependencies(id) {
        match marks[dep.index()] {
            Mark::Done => {}
            Mark::Unvisited => {
                if let Some(cycle) = visit(graph, dep, marks, path, order) {
                    return Some(cycle);
                }
            }
            Mark::InProgress => {
                let start = path.iter().position(|&p| p == dep).unwrap_or(0);
                let mut cycle = path[start..].to_vec();
                cycle.push(dep);
                return Some(cycle);
            }
        }
    }

    path.pop();
    marks[id.index()] = Mark::Done;
    order.push(id);
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::{EntityId, SystemContext, World};
    use crate::schedule::SystemDescriptor;

    fn noop(_: &mut World, _: EntityId, _: &mut SystemContext) {}

    fn registry(descs: Vec<SystemDescriptor>) -> SystemRegistry {
        let world = World::new();
        let mut registry = SystemRegistry::new();
        for desc in descs {
            registry.register(&world, desc).unwrap();
        }
        registry
    }

    fn names(registry: &SystemRegistry, plan: &ExecutionPlan) -> Vec<String> {
        plan.order()
            .iter()
            .map(|&id| registry.get(id).unwrap().name().to_string())
            .collect()
    }

    #[test]
    fn test_registration_order_without_edges() {
        let reg = registry(vec![
            SystemDescriptor::new("a", noop),
            SystemDescriptor::new("b", noop),
            SystemDescriptor::new("c", noop),
        ]);
        let plan = ExecutionPlan::build(&reg).unwrap();
        assert_eq!(names(&reg, &plan), ["a", "b", "c"]);
    }

    #[test]
    fn test_post_dep_runs_declarer_first() {
        let reg = registry(vec![
            SystemDescriptor::new("a", noop).with_post_deps(["b"]),
            SystemDescriptor::new("b", noop),
        ]);
        let plan = ExecutionPlan::build(&reg).unwrap();
        assert_eq!(names(&reg, &plan), ["a", "b"]);
        assert_eq!(plan.graph().dependencies(SystemId::new(1)), &[SystemId::new(0)]);
    }

    #[test]
    fn test_post_dep_to_earlier_system() {
        let reg = registry(vec![
            SystemDescriptor::new("render", noop),
            SystemDescriptor::new("physics", noop).with_post_deps(["render"]),
        ]);
        let plan = ExecutionPlan::build(&reg).unwrap();
        assert_eq!(names(&reg, &plan), ["physics", "render"]);
    }

    #[test]
    fn test_post_edges_follow_pre_deps() {
        let reg = registry(vec![
            SystemDescriptor::new("a", noop),
            SystemDescriptor::new("b", noop).with_pre_deps(["a"]),
            SystemDescriptor::new("c", noop).with_post_deps(["b"]),
            SystemDescriptor::new("d", noop).with_post_deps(["b"]),
        ]);
        let graph = DependencyGraph::build(&reg).unwrap();
        assert_eq!(
            graph.dependencies(SystemId::new(1)),
            &[SystemId::new(0), SystemId::new(2), SystemId::new(3)]
        );
    }

    #[test]
    fn test_shared_dependency_emitted_once() {
        let reg = registry(vec![
            SystemDescriptor::new("base", noop),
            SystemDescriptor::new("x", noop).with_pre_deps(["base"]),
            SystemDescriptor::new("y", noop).with_pre_deps(["base", "x"]),
        ]);
        let plan = ExecutionPlan::build(&reg).unwrap();
        assert_eq!(names(&reg, &plan), ["base", "x", "y"]);
    }

    #[test]
    fn test_unknown_post_dep() {
        let reg = registry(vec![SystemDescriptor::new("a", noop).with_post_deps(["ghost"])]);
        assert_eq!(
            ExecutionPlan::build(&reg),
            Err(DecsError::UnknownDependency {
                system: "a".to_string(),
                dependency: "ghost".to_string(),
            })
        );
    }

    #[test]
    fn test_cycle_is_reported() {
        let reg = registry(vec![
            SystemDescriptor::new("a", noop).with_post_deps(["b"]),
            SystemDescriptor::new("b", noop).with_post_deps(["a"]),
        ]);
        match ExecutionPlan::build(&reg) {
            Err(DecsError::DependencyCycle { cycle }) => assert_eq!(cycle, "a -> b -> a"),
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_self_cycle() {
        let reg = registry(vec![SystemDescriptor::new("a", noop).with_post_deps(["a"])]);
        assert!(matches!(
            ExecutionPlan::build(&reg),
            Err(DecsError::DependencyCycle { .. })
        ));
    }
}

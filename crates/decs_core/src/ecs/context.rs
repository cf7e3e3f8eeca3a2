//! # System Context
//!
//! Each system owns one [`SystemContext`]. Before the system runs in a tick,
//! its prepare function refreshes the context from the world: one
//! [`ComponentHandle`] per required component, in declaration order, plus
//! the entity count at preparation time. An optional auxiliary payload is
//! attached at registration and survives across ticks.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::component::ComponentId;
use super::world::World;

/// Prepare hook: `(world, required component ids, context)`.
pub type PrepareFn = Box<dyn FnMut(&World, &[ComponentId], &mut SystemContext)>;

/// Handle to one required component's column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentHandle {
    id: ComponentId,
    name: Arc<str>,
    element_size: usize,
}

impl ComponentHandle {
    /// The component id, usable with the world's column accessors.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> ComponentId {
        self.id
    }

    /// The component name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size of one element in bytes.
    #[inline]
    #[must_use]
    pub const fn element_size(&self) -> usize {
        self.element_size
    }
}

/// Per-system context handed to every system invocation.
#[derive(Default)]
pub struct SystemContext {
    aux: Option<Box<dyn Any>>,
    components: Vec<ComponentHandle>,
    entity_count: usize,
}

impl SystemContext {
    pub(crate) fn new(capacity: usize, aux: Option<Box<dyn Any>>) -> Self {
        Self {
            aux,
            components: Vec::with_capacity(capacity),
            entity_count: 0,
        }
    }

    /// Handles of the required components, in declaration order.
    #[inline]
    #[must_use]
    pub fn components(&self) -> &[ComponentHandle] {
        &self.components
    }

    /// Id of the `index`-th required component.
    ///
    /// # Panics
    ///
    /// Panics if the system declared fewer than `index + 1` components.
    #[inline]
    #[must_use]
    pub fn component(&self, index: usize) -> ComponentId {
        self.components[index].id
    }

    /// Id of the required component called `name`.
    #[must_use]
    pub fn component_named(&self, name: &str) -> Option<ComponentId> {
        self.components
            .iter()
            .find(|handle| &*handle.name == name)
            .map(ComponentHandle::id)
    }

    /// Entity count when the context was prepared.
    #[inline]
    #[must_use]
    pub const fn entity_count(&self) -> usize {
        self.entity_count
    }

    /// The auxiliary payload, if present and of type `T`.
    #[must_use]
    pub fn aux<T: Any>(&self) -> Option<&T> {
        self.aux.as_deref().and_then(|aux| aux.downcast_ref::<T>())
    }

    /// The auxiliary payload, mutably, if present and of type `T`.
    ///
    /// Writes persist into the next invocation and the next tick.
    #[must_use]
    pub fn aux_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.aux.as_deref_mut().and_then(|aux| aux.downcast_mut::<T>())
    }

    /// True when an auxiliary payload is attached.
    #[inline]
    #[must_use]
    pub fn has_aux(&self) -> bool {
        self.aux.is_some()
    }

    /// Drops the previous handles, keeping capacity.
    pub fn clear(&mut self) {
        self.components.clear();
    }

    /// Appends the handle of component `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not registered in `world`.
    pub fn push_component(&mut self, world: &World, id: ComponentId) {
        let component = world.component(id);
        self.components.push(ComponentHandle {
            id,
            name: component.shared_name(),
            element_size: component.element_size(),
        });
    }

    /// Sets the entity count snapshot.
    pub fn set_entity_count(&mut self, count: usize) {
        self.entity_count = count;
    }

    pub(crate) fn release(&mut self) {
        self.components = Vec::new();
        self.aux = None;
    }
}

impl fmt::Debug for SystemContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemContext")
            .field("has_aux", &self.aux.is_some())
            .field("components", &self.components)
            .field("entity_count", &self.entity_count)
            .finish()
    }
}

/// Standard prepare routine: one handle per required component.
pub fn default_prepare(world: &World, ids: &[ComponentId], ctx: &mut SystemContext) {
    ctx.clear();
    for &id in ids {
        ctx.push_component(world, id);
    }
    ctx.set_entity_count(world.entity_count());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::ComponentMask;

    #[test]
    fn test_default_prepare_keeps_declaration_order() {
        let mut world = World::new();
        let pos = world.register_component("pos", 8).unwrap();
        let vel = world.register_component("vel", 8).unwrap();
        world.alloc_entity(ComponentMask::EMPTY.with(pos)).unwrap();

        let mut ctx = SystemContext::new(2, None);
        default_prepare(&world, &[vel, pos], &mut ctx);

        assert_eq!(ctx.component(0), vel);
        assert_eq!(ctx.component(1), pos);
        assert_eq!(ctx.components()[0].name(), "vel");
        assert_eq!(ctx.component_named("pos"), Some(pos));
        assert_eq!(ctx.entity_count(), 1);

        // Preparing again replaces, never appends.
        default_prepare(&world, &[pos], &mut ctx);
        assert_eq!(ctx.components().len(), 1);
    }

    #[test]
    fn test_aux_downcast() {
        let ctx = SystemContext::new(0, Some(Box::new(42_u32)));
        assert!(ctx.has_aux());
        assert_eq!(ctx.aux::<u32>(), Some(&42));
        assert_eq!(ctx.aux::<i64>(), None);

        let empty = SystemContext::new(0, None);
        assert_eq!(empty.aux::<u32>(), None);
    }

    #[test]
    fn test_aux_mut_writes_through() {
        let mut ctx = SystemContext::new(0, Some(Box::new(vec![1_u8])));
        ctx.aux_mut::<Vec<u8>>().unwrap().push(2);
        assert_eq!(ctx.aux::<Vec<u8>>(), Some(&vec![1, 2]));
        assert!(ctx.aux_mut::<u32>().is_none());
    }
}

//! # ECS World
//!
//! The central container for all entities and components.
//!
//! # Dense storage invariant
//!
//! Every component column has a slot for every existing entity, whether or
//! not the entity's mask selects that component. Allocating an entity grows
//! *all* columns. This trades memory for O(1) indexed access and makes
//! contiguous batch ranges directly sliceable in every column.

use std::sync::Arc;

use bytemuck::Pod;

use super::component::{Component, ComponentId, ComponentType};
use super::entity::{EntityId, EntityTable};
use super::mask::{ComponentMask, MAX_COMPONENTS};
use super::storage::STORAGE_ALIGN;
use crate::error::{DecsError, DecsResult};

/// The ECS World - component registry plus entity table.
///
/// # Example
///
/// ```rust,ignore
/// let mut world = World::new();
/// let pos = world.register_component("pos", 8)?;
///
/// let entity = world.alloc_entity(ComponentMask::from(pos))?;
/// world.slot_mut(pos, entity).copy_from_slice(&[0; 8]);
/// ```
#[derive(Debug, Default)]
pub struct World {
    /// Registered component types, index = component id.
    components: Vec<ComponentType>,
    /// Entity masks, index = entity id.
    entities: EntityTable,
    /// Reservation hint applied to new columns.
    capacity_hint: usize,
}

impl World {
    /// Creates an empty world.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty world that reserves room for `capacity` entities up
    /// front, in the entity table and in every column registered later.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let mut entities = EntityTable::new();
        entities.reserve(capacity);
        Self {
            components: Vec::new(),
            entities,
            capacity_hint: capacity,
        }
    }

    // =========================================================================
    // Component registry
    // =========================================================================

    /// Registers a component type of `element_size` bytes.
    ///
    /// Ids are handed out in registration order. The new column is sized to
    /// the current entity count right away.
    ///
    /// # Errors
    ///
    /// - `DuplicateComponent` if the name is taken
    /// - `TooManyComponents` past [`MAX_COMPONENTS`]
    /// - `AllocationFailed` if the column cannot be allocated
    pub fn register_component(
        &mut self,
        name: impl Into<String>,
        element_size: usize,
    ) -> DecsResult<ComponentId> {
        let name: String = name.into();
        if self.component_id(&name).is_some() {
            return Err(DecsError::DuplicateComponent(name));
        }
        if self.components.len() >= MAX_COMPONENTS {
            return Err(DecsError::TooManyComponents {
                limit: MAX_COMPONENTS,
            });
        }

        #[allow(clippy::cast_possible_truncation)]
        let id = ComponentId::new(self.components.len() as u32);
        let mut component = ComponentType::new(id, Arc::from(name), element_size);

        let entity_count = self.entities.len();
        component
            .storage_mut()
            .try_reserve(entity_count.max(self.capacity_hint))
            .map_err(|err| {
                tracing::error!("Column for component \"{}\": {}", component.name(), err);
                DecsError::AllocationFailed {
                    entities: entity_count,
                }
            })?;
        component.storage_mut().grow_to(entity_count);
        // Masks may name this bit before the type exists.
        let carried = self
            .entities
            .as_slice()
            .iter()
            .filter(|mask| mask.contains(id))
            .count();
        component.set_active_count(carried);

        tracing::debug!(
            "Registered component \"{}\" (id {}, {} bytes)",
            component.name(),
            id.index(),
            element_size
        );
        self.components.push(component);
        Ok(id)
    }

    /// Registers a typed component under [`Component::NAME`].
    ///
    /// # Errors
    ///
    /// Same as [`register_component`](Self::register_component), plus
    /// `UnsupportedAlignment` if `T` needs more than 8-byte alignment.
    pub fn register<T: Component>(&mut self) -> DecsResult<ComponentId> {
        let align = std::mem::align_of::<T>();
        if align > STORAGE_ALIGN {
            return Err(DecsError::UnsupportedAlignment {
                component: T::NAME.to_string(),
                align,
                supported: STORAGE_ALIGN,
            });
        }
        self.register_component(T::NAME, std::mem::size_of::<T>())
    }

    /// Looks up a component id by name (linear scan).
    #[must_use]
    pub fn component_id(&self, name: &str) -> Option<ComponentId> {
        self.components
            .iter()
            .find(|c| c.name() == name)
            .map(ComponentType::id)
    }

    /// Id of a typed component.
    #[must_use]
    pub fn id_of<T: Component>(&self) -> Option<ComponentId> {
        self.component_id(T::NAME)
    }

    /// Column bytes of the component called `name` (linear scan).
    #[must_use]
    pub fn storage_base(&self, name: &str) -> Option<&[u8]> {
        self.components
            .iter()
            .find(|c| c.name() == name)
            .map(|c| c.storage().as_bytes())
    }

    /// Builds a mask from component names.
    ///
    /// # Errors
    ///
    /// Returns `UnknownComponent` for the first unregistered name.
    pub fn mask_of<S: AsRef<str>>(&self, names: &[S]) -> DecsResult<ComponentMask> {
        names.iter().try_fold(ComponentMask::EMPTY, |mask, name| {
            let name = name.as_ref();
            self.component_id(name)
                .map(|id| mask.with(id))
                .ok_or_else(|| DecsError::UnknownComponent {
                    system: String::new(),
                    component: name.to_string(),
                })
        })
    }

    /// Metadata and column of component `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not handed out by this world.
    #[inline]
    #[must_use]
    pub fn component(&self, id: ComponentId) -> &ComponentType {
        &self.components[id.index() as usize]
    }

    /// Mutable metadata and column of component `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not handed out by this world.
    #[inline]
    pub fn component_mut(&mut self, id: ComponentId) -> &mut ComponentType {
        &mut self.components[id.index() as usize]
    }

    /// All registered component types, in id order.
    #[inline]
    #[must_use]
    pub fn components(&self) -> &[ComponentType] {
        &self.components
    }

    /// Number of registered component types.
    #[inline]
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    // =========================================================================
    // Entities
    // =========================================================================

    /// Allocates an entity with `mask` and grows every column to match.
    ///
    /// Room is reserved in the table and in every column before anything is
    /// committed, so a failed allocation leaves the world unchanged.
    ///
    /// # Errors
    ///
    /// Returns `AllocationFailed` if any column cannot grow.
    pub fn alloc_entity(&mut self, mask: ComponentMask) -> DecsResult<EntityId> {
        let new_count = self.entities.len() + 1;
        let failed = DecsError::AllocationFailed {
            entities: new_count,
        };

        self.entities
            .try_reserve_one()
            .map_err(|_| failed.clone())?;
        for component in &mut self.components {
            component
                .storage_mut()
                .try_reserve(new_count)
                .map_err(|_| failed.clone())?;
        }

        let id = self.entities.push(mask);
        for component in &mut self.components {
            component.storage_mut().grow_to(new_count);
            if mask.contains(component.id()) {
                component.mark_active();
            }
        }

        tracing::trace!("Allocated entity {} with {:?}", id, mask);
        Ok(id)
    }

    /// Number of allocated entities.
    #[inline]
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Mask of `entity`, if it exists.
    #[inline]
    #[must_use]
    pub fn entity_mask(&self, entity: EntityId) -> Option<ComponentMask> {
        self.entities.mask(entity)
    }

    /// The entity table.
    #[inline]
    #[must_use]
    pub const fn entities(&self) -> &EntityTable {
        &self.entities
    }

    // =========================================================================
    // Slot access
    // =========================================================================

    /// Bytes of component `id` for `entity`.
    ///
    /// The slot starts at the column base plus `entity × element_size`.
    ///
    /// # Panics
    ///
    /// Panics if `id` or `entity` is out of range.
    #[inline]
    #[must_use]
    pub fn slot(&self, id: ComponentId, entity: EntityId) -> &[u8] {
        self.component(id).storage().slot(entity.index())
    }

    /// Mutable bytes of component `id` for `entity`.
    ///
    /// # Panics
    ///
    /// Panics if `id` or `entity` is out of range.
    #[inline]
    pub fn slot_mut(&mut self, id: ComponentId, entity: EntityId) -> &mut [u8] {
        self.component_mut(id).storage_mut().slot_mut(entity.index())
    }

    /// Typed column of component `id`.
    ///
    /// # Errors
    ///
    /// Returns `LayoutMismatch` if `T` does not fit the column.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not handed out by this world.
    pub fn try_column<T: Pod>(&self, id: ComponentId) -> DecsResult<&[T]> {
        self.component(id).try_view()
    }

    /// Mutable typed column of component `id`.
    ///
    /// # Errors
    ///
    /// Returns `LayoutMismatch` if `T` does not fit the column.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not handed out by this world.
    pub fn try_column_mut<T: Pod>(&mut self, id: ComponentId) -> DecsResult<&mut [T]> {
        self.component_mut(id).try_view_mut()
    }

    /// Typed column of component `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` is unknown or `T` does not fit the column.
    #[must_use]
    pub fn column<T: Pod>(&self, id: ComponentId) -> &[T] {
        match self.try_column(id) {
            Ok(column) => column,
            Err(err) => panic!("{err}"),
        }
    }

    /// Mutable typed column of component `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` is unknown or `T` does not fit the column.
    pub fn column_mut<T: Pod>(&mut self, id: ComponentId) -> &mut [T] {
        match self.try_column_mut(id) {
            Ok(column) => column,
            Err(err) => panic!("{err}"),
        }
    }

    /// Typed value of component `id` for `entity`.
    ///
    /// # Panics
    ///
    /// Panics if `id`/`entity` is out of range or `T` does not fit.
    #[inline]
    #[must_use]
    pub fn get<T: Pod>(&self, id: ComponentId, entity: EntityId) -> &T {
        &self.column(id)[entity.index()]
    }

    /// Mutable typed value of component `id` for `entity`.
    ///
    /// # Panics
    ///
    /// Panics if `id`/`entity` is out of range or `T` does not fit.
    #[inline]
    pub fn get_mut<T: Pod>(&mut self, id: ComponentId, entity: EntityId) -> &mut T {
        &mut self.column_mut(id)[entity.index()]
    }

    /// Mutable column of `write` alongside a shared column of `read`.
    ///
    /// # Panics
    ///
    /// Panics if the ids are equal or unknown, or a type does not fit.
    pub fn column_pair_mut<W: Pod, R: Pod>(
        &mut self,
        write: ComponentId,
        read: ComponentId,
    ) -> (&mut [W], &[R]) {
        let (w, r) = (write.index() as usize, read.index() as usize);
        assert_ne!(w, r, "column_pair_mut needs two distinct components");

        let (write_comp, read_comp) = if w < r {
            let (head, tail) = self.components.split_at_mut(r);
            (&mut head[w], &tail[0])
        } else {
            let (head, tail) = self.components.split_at_mut(w);
            (&mut tail[0], &head[r])
        };

        let read_view = match read_comp.try_view::<R>() {
            Ok(view) => view,
            Err(err) => panic!("{err}"),
        };
        let write_view = match write_comp.try_view_mut::<W>() {
            Ok(view) => view,
            Err(err) => panic!("{err}"),
        };
        (write_view, read_view)
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    /// Releases every column and the entity table. Registered component
    /// types are dropped as well.
    pub fn release(&mut self) {
        for component in &mut self.components {
            component.release();
        }
        self.components = Vec::new();
        self.entities.release();
    }
}

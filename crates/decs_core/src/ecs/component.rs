//! # Component Types
//!
//! Components are plain fixed-size data records. Each registered type gets a
//! stable numeric id, a name, and one dense column owned by the world.

use std::fmt;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};

use super::storage::ComponentStorage;
use crate::error::{DecsError, DecsResult};

/// Stable identifier of a registered component type.
///
/// Ids are handed out in registration order and never reused. The id is
/// also the component's bit position in a [`ComponentMask`](super::ComponentMask).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ComponentId(u32);

impl ComponentId {
    /// Creates a component id from its index.
    #[inline]
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the index of this component type.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }

    /// Returns the mask bit for this component type.
    #[inline]
    #[must_use]
    pub const fn bit(self) -> u64 {
        1 << self.0
    }
}

impl fmt::Debug for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentId({})", self.0)
    }
}

/// Marker trait for typed components.
///
/// Components must be:
/// - `Pod`: Plain old data, safe to view from raw column bytes
/// - `Zeroable`: Fresh slots are zero-filled
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Clone, Copy, Default, Pod, Zeroable)]
/// #[repr(C)]
/// struct Position {
///     x: f32,
///     y: f32,
/// }
///
/// impl Component for Position {
///     const NAME: &'static str = "pos";
/// }
/// ```
pub trait Component: Pod + Zeroable + 'static {
    /// Registry key for this component type.
    const NAME: &'static str;
}

/// Registered component type: metadata plus its dense column.
#[derive(Debug, Clone)]
pub struct ComponentType {
    id: ComponentId,
    name: Arc<str>,
    /// Number of entities whose mask selects this type.
    active_count: usize,
    storage: ComponentStorage,
}

impl ComponentType {
    pub(crate) fn new(id: ComponentId, name: Arc<str>, element_size: usize) -> Self {
        Self {
            id,
            name,
            active_count: 0,
            storage: ComponentStorage::new(element_size),
        }
    }

    /// The component's id.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> ComponentId {
        self.id
    }

    /// The component's registry name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn shared_name(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    /// Size of one element in bytes.
    #[inline]
    #[must_use]
    pub const fn element_size(&self) -> usize {
        self.storage.element_size()
    }

    /// Number of entities carrying this component.
    #[inline]
    #[must_use]
    pub const fn active_count(&self) -> usize {
        self.active_count
    }

    pub(crate) fn mark_active(&mut self) {
        self.active_count += 1;
    }

    pub(crate) fn set_active_count(&mut self, count: usize) {
        self.active_count = count;
    }

    /// The dense column.
    #[inline]
    #[must_use]
    pub const fn storage(&self) -> &ComponentStorage {
        &self.storage
    }

    /// The dense column, mutably.
    #[inline]
    pub fn storage_mut(&mut self) -> &mut ComponentStorage {
        &mut self.storage
    }

    fn check_layout<T: Pod>(&self) -> DecsResult<()> {
        if std::mem::size_of::<T>() == self.element_size() {
            Ok(())
        } else {
            Err(self.layout_error::<T>())
        }
    }

    fn layout_error<T: Pod>(&self) -> DecsError {
        DecsError::LayoutMismatch {
            component: self.name.to_string(),
            element_size: self.element_size(),
            type_size: std::mem::size_of::<T>(),
        }
    }

    /// Typed view of the whole column.
    ///
    /// # Errors
    ///
    /// Returns `LayoutMismatch` if `T` does not match the element size or
    /// the column alignment.
    pub fn try_view<T: Pod>(&self) -> DecsResult<&[T]> {
        self.check_layout::<T>()?;
        self.storage.try_cast().map_err(|_| self.layout_error::<T>())
    }

    /// Mutable typed view of the whole column.
    ///
    /// # Errors
    ///
    /// Returns `LayoutMismatch` if `T` does not match the element size or
    /// the column alignment.
    pub fn try_view_mut<T: Pod>(&mut self) -> DecsResult<&mut [T]> {
        self.check_layout::<T>()?;
        let name = &self.name;
        let element_size = self.storage.element_size();
        self.storage
            .try_cast_mut()
            .map_err(|_| DecsError::LayoutMismatch {
                component: name.to_string(),
                element_size,
                type_size: std::mem::size_of::<T>(),
            })
    }

    pub(crate) fn release(&mut self) {
        self.storage.release();
        self.active_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
    #[repr(C)]
    struct Vec2 {
        x: f32,
        y: f32,
    }

    fn make(element_size: usize) -> ComponentType {
        ComponentType::new(ComponentId::new(3), Arc::from("vec2"), element_size)
    }

    #[test]
    fn test_component_id_bit() {
        assert_eq!(ComponentId::new(0).bit(), 1);
        assert_eq!(ComponentId::new(5).bit(), 32);
        assert_eq!(ComponentId::new(63).bit(), 1 << 63);
    }

    #[test]
    fn test_typed_view() {
        let mut comp = make(8);
        comp.storage_mut().grow_to(2);
        comp.try_view_mut::<Vec2>().unwrap()[1] = Vec2 { x: 1.0, y: 2.0 };

        let view = comp.try_view::<Vec2>().unwrap();
        assert_eq!(view[0], Vec2::default());
        assert_eq!(view[1], Vec2 { x: 1.0, y: 2.0 });
    }

    #[test]
    fn test_layout_mismatch() {
        let mut comp = make(8);
        comp.storage_mut().grow_to(2);
        let err = comp.try_view::<f32>().unwrap_err();
        assert_eq!(
            err,
            DecsError::LayoutMismatch {
                component: "vec2".to_string(),
                element_size: 8,
                type_size: 4,
            }
        );
    }
}

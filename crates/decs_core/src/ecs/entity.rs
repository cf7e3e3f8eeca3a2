//! # Entity Management
//!
//! Entities are plain indices into the entity table. There is no removal,
//! so ids never need a generation counter: an id stays valid for the life
//! of the world.

use std::collections::TryReserveError;
use std::fmt;

use super::mask::ComponentMask;

/// Identifier of an entity: its index in the entity table.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct EntityId(u64);

impl EntityId {
    /// Creates an entity id from a table index.
    #[inline]
    #[must_use]
    pub const fn new(index: u64) -> Self {
        Self(index)
    }

    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Returns the id as a column index.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Append-only table of entity component masks.
///
/// Index = entity id.
#[derive(Debug, Clone, Default)]
pub struct EntityTable {
    masks: Vec<ComponentMask>,
}

impl EntityTable {
    /// Creates an empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self { masks: Vec::new() }
    }

    /// Number of entities.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.masks.len()
    }

    /// True when no entity has been allocated.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.masks.is_empty()
    }

    /// Reserves room for one more entity.
    pub(crate) fn try_reserve_one(&mut self) -> Result<(), TryReserveError> {
        self.masks.try_reserve(1)
    }

    /// Reserves room for `additional` more entities.
    pub(crate) fn reserve(&mut self, additional: usize) {
        self.masks.reserve(additional);
    }

    /// Appends an entity and returns its id.
    pub(crate) fn push(&mut self, mask: ComponentMask) -> EntityId {
        let id = EntityId::new(self.masks.len() as u64);
        self.masks.push(mask);
        id
    }

    /// Mask of entity `id`, if it exists.
    #[inline]
    #[must_use]
    pub fn mask(&self, id: EntityId) -> Option<ComponentMask> {
        self.masks.get(id.index()).copied()
    }

    /// Mask at table index `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    #[inline]
    #[must_use]
    pub fn mask_at(&self, index: usize) -> ComponentMask {
        self.masks[index]
    }

    /// All masks, in id order.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[ComponentMask] {
        &self.masks
    }

    /// Iterates over `(id, mask)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, ComponentMask)> + '_ {
        self.masks
            .iter()
            .enumerate()
            .map(|(i, &mask)| (EntityId::new(i as u64), mask))
    }

    pub(crate) fn release(&mut self) {
        self.masks = Vec::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_ids_are_indices() {
        let mut table = EntityTable::new();
        let a = table.push(ComponentMask::from_bits(0b01));
        let b = table.push(ComponentMask::from_bits(0b10));

        assert_eq!(a.raw(), 0);
        assert_eq!(b.raw(), 1);
        assert_eq!(table.len(), 2);
        assert_eq!(table.mask(b), Some(ComponentMask::from_bits(0b10)));
        assert_eq!(table.mask(EntityId::new(2)), None);
    }

    #[test]
    fn test_iter_in_id_order() {
        let mut table = EntityTable::new();
        for bits in [3, 1, 2] {
            table.push(ComponentMask::from_bits(bits));
        }
        let bits: Vec<u64> = table.iter().map(|(_, m)| m.bits()).collect();
        assert_eq!(bits, vec![3, 1, 2]);
    }
}

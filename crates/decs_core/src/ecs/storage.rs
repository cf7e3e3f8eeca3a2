//! # Component Storage
//!
//! Dense, entity-indexed byte columns.
//!
//! The storage uses a dense array strategy:
//! - Every column holds one slot per existing entity, used or not
//! - Access is O(1) via entity index
//! - Iteration is cache-friendly (contiguous memory)
//!
//! Columns are backed by `u64` words so that typed views of any `Pod` type
//! with alignment up to 8 can be cast in place.

use std::collections::TryReserveError;

use bytemuck::{Pod, PodCastError};
use thiserror::Error;

/// Alignment guaranteed for the start of every column.
pub const STORAGE_ALIGN: usize = std::mem::align_of::<u64>();

const WORD_SIZE: usize = std::mem::size_of::<u64>();

/// Why a column could not reserve room.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// `slots * element_size` does not fit in `usize`.
    #[error("{slots} slots of {element_size} bytes overflow the address space")]
    SizeOverflow {
        /// Requested slot count.
        slots: usize,
        /// Size of one slot in bytes.
        element_size: usize,
    },

    /// The allocator refused the request.
    #[error(transparent)]
    Reserve(#[from] TryReserveError),
}

/// Dense storage for a single component type.
///
/// Slot `i` starts at byte `i * element_size` of the column. New slots are
/// zero-filled.
#[derive(Debug, Clone)]
pub struct ComponentStorage {
    /// Backing words. May hold a few trailing padding bytes.
    words: Vec<u64>,
    /// Size of one slot in bytes.
    element_size: usize,
    /// Number of slots.
    len: usize,
}

impl ComponentStorage {
    /// Creates an empty column for elements of `element_size` bytes.
    #[must_use]
    pub const fn new(element_size: usize) -> Self {
        Self {
            words: Vec::new(),
            element_size,
            len: 0,
        }
    }

    /// Size of one slot in bytes.
    #[inline]
    #[must_use]
    pub const fn element_size(&self) -> usize {
        self.element_size
    }

    /// Number of slots.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// True when the column holds no slots.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Size of the used part of the column in bytes.
    #[inline]
    #[must_use]
    pub const fn byte_len(&self) -> usize {
        self.len * self.element_size
    }

    /// Backing words needed for `slots` slots, or `None` on overflow.
    #[inline]
    fn words_for(&self, slots: usize) -> Option<usize> {
        slots
            .checked_mul(self.element_size)
            .map(|bytes| bytes.div_ceil(WORD_SIZE))
    }

    /// Reserves room for `slots` slots in total without changing the length.
    ///
    /// # Errors
    ///
    /// - `SizeOverflow` if the column size does not fit in `usize`
    /// - `Reserve` if the memory cannot be obtained
    pub fn try_reserve(&mut self, slots: usize) -> Result<(), StorageError> {
        let words = self.words_for(slots).ok_or(StorageError::SizeOverflow {
            slots,
            element_size: self.element_size,
        })?;
        self.words.try_reserve(words.saturating_sub(self.words.len()))?;
        Ok(())
    }

    /// Grows the column to exactly `slots` slots, zero-filling new ones.
    ///
    /// Columns never shrink; a smaller `slots` is ignored. Call
    /// [`try_reserve`](Self::try_reserve) first to get allocation failures
    /// as errors.
    ///
    /// # Panics
    ///
    /// Panics if the column size overflows `usize` or the allocation fails.
    pub fn grow_to(&mut self, slots: usize) {
        if slots <= self.len {
            return;
        }
        let Some(words) = self.words_for(slots) else {
            panic!(
                "{slots} slots of {} bytes overflow the address space",
                self.element_size
            );
        };
        self.words.resize(words, 0);
        self.len = slots;
    }

    /// The whole column as bytes.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &bytemuck::cast_slice::<u64, u8>(&self.words)[..self.byte_len()]
    }

    /// The whole column as mutable bytes.
    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        let byte_len = self.byte_len();
        &mut bytemuck::cast_slice_mut::<u64, u8>(&mut self.words)[..byte_len]
    }

    /// Bytes of slot `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    #[inline]
    #[must_use]
    pub fn slot(&self, index: usize) -> &[u8] {
        let start = index * self.element_size;
        &self.as_bytes()[start..start + self.element_size]
    }

    /// Mutable bytes of slot `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    #[inline]
    pub fn slot_mut(&mut self, index: usize) -> &mut [u8] {
        let start = index * self.element_size;
        let size = self.element_size;
        &mut self.as_bytes_mut()[start..start + size]
    }

    /// Casts the column to a typed slice.
    ///
    /// The caller checks that `T` matches the element size; this only
    /// checks that the cast itself is sound.
    ///
    /// # Errors
    ///
    /// Returns the cast error on size or alignment mismatch.
    #[inline]
    pub fn try_cast<T: Pod>(&self) -> Result<&[T], PodCastError> {
        bytemuck::try_cast_slice(self.as_bytes())
    }

    /// Casts the column to a mutable typed slice.
    ///
    /// # Errors
    ///
    /// Returns the cast error on size or alignment mismatch.
    #[inline]
    pub fn try_cast_mut<T: Pod>(&mut self) -> Result<&mut [T], PodCastError> {
        bytemuck::try_cast_slice_mut(self.as_bytes_mut())
    }

    /// Releases all memory held by the column.
    pub fn release(&mut self) {
        self.words = Vec::new();
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_grows_zeroed() {
        let mut storage = ComponentStorage::new(12);
        storage.grow_to(3);
        assert_eq!(storage.len(), 3);
        assert_eq!(storage.byte_len(), 36);
        assert!(storage.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_slot_offsets() {
        let mut storage = ComponentStorage::new(8);
        storage.grow_to(4);
        let base = storage.as_bytes().as_ptr();
        for i in 0..4 {
            assert_eq!(storage.slot(i).as_ptr(), base.wrapping_add(i * 8));
            assert_eq!(storage.slot(i).len(), 8);
        }
    }

    #[test]
    fn test_slot_write_survives_growth() {
        let mut storage = ComponentStorage::new(4);
        storage.grow_to(1);
        storage.slot_mut(0).copy_from_slice(&7u32.to_ne_bytes());
        storage.grow_to(100);
        assert_eq!(storage.slot(0), &7u32.to_ne_bytes());
        assert_eq!(storage.slot(99), &[0, 0, 0, 0]);
    }

    #[test]
    fn test_typed_cast() {
        let mut storage = ComponentStorage::new(4);
        storage.grow_to(3);
        storage.try_cast_mut::<f32>().unwrap()[2] = 1.5;
        assert_eq!(storage.try_cast::<f32>().unwrap(), &[0.0, 0.0, 1.5]);
    }

    #[test]
    fn test_never_shrinks() {
        let mut storage = ComponentStorage::new(2);
        storage.grow_to(5);
        storage.grow_to(2);
        assert_eq!(storage.len(), 5);
    }

    #[test]
    fn test_oversized_reserve_is_an_error() {
        let mut storage = ComponentStorage::new(1 << 55);
        assert_eq!(
            storage.try_reserve(1024),
            Err(StorageError::SizeOverflow {
                slots: 1024,
                element_size: 1 << 55,
            })
        );
        assert!(matches!(
            ComponentStorage::new(8).try_reserve(usize::MAX / 8),
            Err(StorageError::Reserve(_))
        ));
        assert!(storage.is_empty());
    }

    #[test]
    fn test_release() {
        let mut storage = ComponentStorage::new(16);
        storage.grow_to(10);
        storage.release();
        assert!(storage.is_empty());
        assert!(storage.as_bytes().is_empty());
    }
}

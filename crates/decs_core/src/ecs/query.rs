//! # Entity Queries
//!
//! Bitmask selection of the entities a system processes, and detection of
//! maximal contiguous id runs for batch systems.
//!
//! ```text
//! ids:     0  1  2  3  4  5  6  7  8
//! match:   M  M  _  M  _  _  M  M  M
//! runs:   [0,2)    [3,1)    [6,3)
//! ```

use std::ops::Range;

use super::entity::EntityId;
use super::mask::ComponentMask;

/// Required/excluded component filter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Query {
    required: ComponentMask,
    excluded: ComponentMask,
}

impl Query {
    /// Creates a query.
    #[inline]
    #[must_use]
    pub const fn new(required: ComponentMask, excluded: ComponentMask) -> Self {
        Self { required, excluded }
    }

    /// Components an entity must carry.
    #[inline]
    #[must_use]
    pub const fn required(&self) -> ComponentMask {
        self.required
    }

    /// Components that reject an entity when carried together.
    #[inline]
    #[must_use]
    pub const fn excluded(&self) -> ComponentMask {
        self.excluded
    }

    /// Tests an entity mask.
    ///
    /// The entity must carry every required component. It is rejected only
    /// when it carries *all* excluded components; carrying a subset of them
    /// is fine.
    #[inline]
    #[must_use]
    pub const fn matches(&self, mask: ComponentMask) -> bool {
        mask.contains_all(self.required)
            && (self.excluded.is_empty() || !mask.contains_all(self.excluded))
    }

    /// Tests an entity mask for batch membership: every required
    /// component must be present. Exclusions do not apply to runs.
    #[inline]
    #[must_use]
    pub const fn matches_run(&self, mask: ComponentMask) -> bool {
        mask.contains_all(self.required)
    }
}

/// A contiguous range of entity ids handed to a batch system.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntityRange {
    /// First id of the run.
    pub start: EntityId,
    /// Number of ids in the run.
    pub len: u64,
}

impl EntityRange {
    /// Creates a range.
    #[inline]
    #[must_use]
    pub const fn new(start: EntityId, len: u64) -> Self {
        Self { start, len }
    }

    /// The run as column indices, for slicing typed columns.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn indices(&self) -> Range<usize> {
        let start = self.start.index();
        start..start + self.len as usize
    }

    /// Iterates over the ids in the run.
    pub fn ids(&self) -> impl Iterator<Item = EntityId> {
        let start = self.start.raw();
        (start..start + self.len).map(EntityId::new)
    }
}

/// Incremental run detector.
///
/// Feed it one match result per id in ascending order; it emits a range each
/// time an open run is closed by a non-matching id. Call
/// [`finish`](Self::finish) at the end of the table to flush an open run.
#[derive(Clone, Copy, Debug, Default)]
pub struct RunDetector {
    start: u64,
    len: u64,
}

impl RunDetector {
    /// Creates a detector with no open run.
    #[must_use]
    pub const fn new() -> Self {
        Self { start: 0, len: 0 }
    }

    /// Records the match result for `id`.
    pub fn feed(&mut self, id: EntityId, matched: bool) -> Option<EntityRange> {
        if matched {
            if self.len == 0 {
                self.start = id.raw();
            }
            self.len += 1;
            None
        } else {
            self.take()
        }
    }

    /// Flushes the open run, if any.
    pub fn finish(&mut self) -> Option<EntityRange> {
        self.take()
    }

    fn take(&mut self) -> Option<EntityRange> {
        if self.len == 0 {
            return None;
        }
        let range = EntityRange::new(EntityId::new(self.start), self.len);
        self.len = 0;
        Some(range)
    }
}

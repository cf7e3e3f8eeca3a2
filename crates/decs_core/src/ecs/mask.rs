//! # Component Masks
//!
//! Fixed-width bit-set keyed by component id. Bit *k* set means the entity
//! carries meaningful data in component *k*'s dense column.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

use super::component::ComponentId;

/// Maximum number of component types a mask can address.
pub const MAX_COMPONENTS: usize = u64::BITS as usize;

/// Bitmask of component types (up to 64 component types).
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ComponentMask(u64);

impl ComponentMask {
    /// The empty mask.
    pub const EMPTY: Self = Self(0);

    /// Creates a mask from raw bits.
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Returns the raw bits.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Returns a copy of this mask with `id` set.
    #[inline]
    #[must_use]
    pub const fn with(self, id: ComponentId) -> Self {
        Self(self.0 | id.bit())
    }

    /// Sets the bit for `id`.
    #[inline]
    pub fn insert(&mut self, id: ComponentId) {
        self.0 |= id.bit();
    }

    /// Checks whether the bit for `id` is set.
    #[inline]
    #[must_use]
    pub const fn contains(self, id: ComponentId) -> bool {
        self.0 & id.bit() != 0
    }

    /// Checks whether every bit of `other` is also set here.
    #[inline]
    #[must_use]
    pub const fn contains_all(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// True when no bit is set.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of component types in the mask.
    #[inline]
    #[must_use]
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterates over the component ids in ascending order.
    pub fn iter(self) -> impl Iterator<Item = ComponentId> {
        let mut bits = self.0;
        std::iter::from_fn(move || {
            if bits == 0 {
                return None;
            }
            let index = bits.trailing_zeros();
            bits &= bits - 1;
            Some(ComponentId::new(index))
        })
    }
}

impl FromIterator<ComponentId> for ComponentMask {
    fn from_iter<I: IntoIterator<Item = ComponentId>>(iter: I) -> Self {
        iter.into_iter().fold(Self::EMPTY, Self::with)
    }
}

impl BitOr for ComponentMask {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOr<ComponentId> for ComponentMask {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: ComponentId) -> Self {
        self.with(rhs)
    }
}

impl BitOrAssign<ComponentId> for ComponentMask {
    #[inline]
    fn bitor_assign(&mut self, rhs: ComponentId) {
        self.insert(rhs);
    }
}

impl BitAnd for ComponentMask {
    type Output = Self;

    #[inline]
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl From<ComponentId> for ComponentMask {
    fn from(id: ComponentId) -> Self {
        Self::EMPTY.with(id)
    }
}

impl fmt::Debug for ComponentMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentMask({:#b})", self.0)
    }
}

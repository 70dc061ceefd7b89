//! Identifier types for runtime entities.
//!
//! These types provide type-safe identifiers for the core runtime entities:
//! index spaces, field spaces, regions, tasks, and phase barriers. Each
//! wraps a generation-counted arena index, so stale handles are detectable
//! rather than silently aliasing reused slots. Field identifiers are the
//! one exception: they are dense small integers scoped to a field space.

use crate::util::ArenaIndex;
use core::fmt;

/// A unique identifier for a logical region.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId(pub(crate) ArenaIndex);

impl RegionId {
    #[inline]
    pub(crate) const fn from_arena(index: ArenaIndex) -> Self {
        Self(index)
    }

    #[inline]
    pub(crate) const fn arena_index(self) -> ArenaIndex {
        self.0
    }
}

impl fmt::Debug for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RegionId({}:{})", self.0.index(), self.0.generation())
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.0.index())
    }
}

/// A unique identifier for an index space.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndexSpaceId(pub(crate) ArenaIndex);

impl IndexSpaceId {
    #[inline]
    pub(crate) const fn from_arena(index: ArenaIndex) -> Self {
        Self(index)
    }

    #[inline]
    pub(crate) const fn arena_index(self) -> ArenaIndex {
        self.0
    }
}

impl fmt::Debug for IndexSpaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IndexSpaceId({}:{})", self.0.index(), self.0.generation())
    }
}

impl fmt::Display for IndexSpaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "I{}", self.0.index())
    }
}

/// A unique identifier for a field space.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldSpaceId(pub(crate) ArenaIndex);

impl FieldSpaceId {
    #[inline]
    pub(crate) const fn from_arena(index: ArenaIndex) -> Self {
        Self(index)
    }

    #[inline]
    pub(crate) const fn arena_index(self) -> ArenaIndex {
        self.0
    }
}

impl fmt::Debug for FieldSpaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldSpaceId({}:{})", self.0.index(), self.0.generation())
    }
}

impl fmt::Display for FieldSpaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "F{}", self.0.index())
    }
}

/// A field identifier within a field space.
///
/// Fields are allocated densely from zero, matching the convention of
/// application code that pins field ids with an enum.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(pub u32);

impl FieldId {
    /// Returns the raw field number.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldId({})", self.0)
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f{}", self.0)
    }
}

/// A unique identifier for a submitted task.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub(crate) ArenaIndex);

impl TaskId {
    #[inline]
    pub(crate) const fn from_arena(index: ArenaIndex) -> Self {
        Self(index)
    }

    #[inline]
    pub(crate) const fn arena_index(self) -> ArenaIndex {
        self.0
    }
}

impl fmt::Debug for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TaskId({}:{})", self.0.index(), self.0.generation())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0.index())
    }
}

/// A unique identifier for a phase barrier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BarrierId(pub(crate) ArenaIndex);

impl BarrierId {
    #[inline]
    pub(crate) const fn from_arena(index: ArenaIndex) -> Self {
        Self(index)
    }

    #[inline]
    pub(crate) const fn arena_index(self) -> ArenaIndex {
        self.0
    }
}

impl fmt::Debug for BarrierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BarrierId({}:{})", self.0.index(), self.0.generation())
    }
}

impl fmt::Display for BarrierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "B{}", self.0.index())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_compact() {
        let region = RegionId::from_arena(ArenaIndex::new(3, 1));
        let task = TaskId::from_arena(ArenaIndex::new(7, 0));
        assert_eq!(region.to_string(), "R3");
        assert_eq!(task.to_string(), "T7");
        assert_eq!(format!("{region:?}"), "RegionId(3:1)");
    }

    #[test]
    fn field_ids_order_by_index() {
        assert!(FieldId(0) < FieldId(1));
        assert_eq!(FieldId(2).to_string(), "f2");
    }
}

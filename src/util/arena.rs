//! Generation-counted arena.
//!
//! Every runtime entity (region, task, barrier) lives in an arena and is
//! addressed by an [`ArenaIndex`] carrying both a slot index and a
//! generation. Removing an entry bumps the slot's generation, so a stale
//! handle can never silently alias a newer entry in the same slot.

use core::fmt;

/// An index into an [`Arena`].
///
/// Pairs a slot index with the generation that slot had when the entry was
/// inserted. Lookups with a stale generation return `None`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArenaIndex {
    index: u32,
    generation: u32,
}

impl ArenaIndex {
    /// Creates an arena index from raw parts.
    #[inline]
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Returns the slot index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Returns the generation.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for ArenaIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArenaIndex({}:{})", self.index, self.generation)
    }
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// A growable arena with generation-checked removal.
#[derive(Debug)]
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
}

impl<T> Arena<T> {
    /// Creates an empty arena.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Inserts a value and returns its index.
    pub fn insert(&mut self, value: T) -> ArenaIndex {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            debug_assert!(slot.value.is_none());
            slot.value = Some(value);
            ArenaIndex::new(index, slot.generation)
        } else {
            let index = u32::try_from(self.slots.len()).expect("arena slot count overflow");
            self.slots.push(Slot {
                generation: 0,
                value: Some(value),
            });
            ArenaIndex::new(index, 0)
        }
    }

    /// Returns a reference to the entry at `index`, if it is still live.
    #[must_use]
    pub fn get(&self, index: ArenaIndex) -> Option<&T> {
        self.slots
            .get(index.index as usize)
            .filter(|slot| slot.generation == index.generation)
            .and_then(|slot| slot.value.as_ref())
    }

    /// Returns a mutable reference to the entry at `index`, if still live.
    pub fn get_mut(&mut self, index: ArenaIndex) -> Option<&mut T> {
        self.slots
            .get_mut(index.index as usize)
            .filter(|slot| slot.generation == index.generation)
            .and_then(|slot| slot.value.as_mut())
    }

    /// Removes and returns the entry at `index`.
    ///
    /// The slot's generation is bumped so the removed index is dead forever.
    pub fn remove(&mut self, index: ArenaIndex) -> Option<T> {
        let slot = self.slots.get_mut(index.index as usize)?;
        if slot.generation != index.generation || slot.value.is_none() {
            return None;
        }
        let value = slot.value.take();
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index.index);
        value
    }

    /// Returns the number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Returns true if the arena holds no live entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over live entries with their indices.
    pub fn iter(&self) -> impl Iterator<Item = (ArenaIndex, &T)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.value
                .as_ref()
                .map(|v| (ArenaIndex::new(i as u32, slot.generation), v))
        })
    }

    /// Iterates mutably over live entries with their indices.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ArenaIndex, &mut T)> {
        self.slots.iter_mut().enumerate().filter_map(|(i, slot)| {
            let generation = slot.generation;
            slot.value
                .as_mut()
                .map(move |v| (ArenaIndex::new(i as u32, generation), v))
        })
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

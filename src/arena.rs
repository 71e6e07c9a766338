//! Generational tile handles.
//!
//! A tile keeps its identity while it is in flight for its absorb animation, after it has
//! already left the grid. Handles carry a generation so a stale id from a recycled slot
//! never aliases a newer tile.

/// Stable identity of one gem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId {
    index: u32,
    generation: u32,
}

impl TileId {
    #[inline]
    pub fn index(self) -> u32 {
        self.index
    }

    #[inline]
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl std::fmt::Display for TileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// Who currently holds a live tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileState {
    /// Sitting in a grid slot.
    Resident,
    /// Removed from the grid, waiting for its absorb animation to report back.
    InFlight,
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    state: Option<TileState>,
}

/// Allocator for `TileId`s with slot reuse.
#[derive(Debug, Clone, Default)]
pub struct TileArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl TileArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh resident tile.
    pub fn alloc(&mut self) -> TileId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.state = Some(TileState::Resident);
            return TileId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            state: Some(TileState::Resident),
        });
        TileId {
            index,
            generation: 0,
        }
    }

    fn slot(&self, id: TileId) -> Option<&Slot> {
        self.slots
            .get(id.index as usize)
            .filter(|s| s.generation == id.generation && s.state.is_some())
    }

    #[inline]
    pub fn contains(&self, id: TileId) -> bool {
        self.slot(id).is_some()
    }

    pub fn state(&self, id: TileId) -> Option<TileState> {
        self.slot(id).and_then(|s| s.state)
    }

    /// Change the holder of a live tile. Returns false for stale ids.
    pub fn set_state(&mut self, id: TileId, state: TileState) -> bool {
        match self.slots.get_mut(id.index as usize) {
            Some(slot) if slot.generation == id.generation && slot.state.is_some() => {
                slot.state = Some(state);
                true
            }
            _ => false,
        }
    }

    /// Destroy a tile; its slot is reused with a bumped generation.
    /// Returns false if the id was already released.
    pub fn release(&mut self, id: TileId) -> bool {
        match self.slots.get_mut(id.index as usize) {
            Some(slot) if slot.generation == id.generation && slot.state.is_some() => {
                slot.state = None;
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(id.index);
                self.live -= 1;
                true
            }
            _ => false,
        }
    }

    /// Number of live tiles (resident + in flight).
    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn count_in(&self, state: TileState) -> usize {
        self.slots
            .iter()
            .filter(|s| s.state == Some(state))
            .count()
    }

    /// Drop every tile at once.
    pub fn clear(&mut self) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.state.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index as u32);
            }
        }
        self.live = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn released_ids_go_stale() {
        let mut arena = TileArena::new();
        let a = arena.alloc();
        assert!(arena.release(a));
        assert!(!arena.contains(a));
        assert!(!arena.release(a));

        let b = arena.alloc();
        assert_eq!(b.index(), a.index());
        assert_ne!(b, a);
        assert!(arena.contains(b));
        assert!(!arena.set_state(a, TileState::InFlight));
    }

    #[test]
    fn tracks_holder() {
        let mut arena = TileArena::new();
        let a = arena.alloc();
        let _b = arena.alloc();
        assert_eq!(arena.state(a), Some(TileState::Resident));
        assert!(arena.set_state(a, TileState::InFlight));
        assert_eq!(arena.count_in(TileState::InFlight), 1);
        assert_eq!(arena.count_in(TileState::Resident), 1);
        assert_eq!(arena.len(), 2);
        arena.clear();
        assert!(arena.is_empty());
        assert!(!arena.contains(a));
    }
}

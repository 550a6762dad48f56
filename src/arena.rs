//! Stable-index storage for `Vehicle`, `Road`, and `Junction`.
//!
//! Roads and junctions hold indices into each other's arenas instead of
//! owned or reference-counted pointers, so moving a vehicle between roads
//! is a pair of `Vec` splices rather than a graph mutation.

/// A handle into an [`Arena<T>`]. Never reused once issued: removal is not
/// supported, matching the simulator's append-only lifecycle (vehicles are
/// marked `Arrived` and left in place rather than deallocated).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct Index(pub usize);

#[derive(Debug)]
pub struct Arena<T> {
    items: Vec<T>,
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn insert(&mut self, item: T) -> Index {
        let idx = Index(self.items.len());
        self.items.push(item);
        idx
    }

    pub fn get(&self, idx: impl Into<Index>) -> &T {
        &self.items[idx.into().0]
    }

    pub fn get_mut(&mut self, idx: impl Into<Index>) -> &mut T {
        &mut self.items[idx.into().0]
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Index, &T)> {
        self.items.iter().enumerate().map(|(i, v)| (Index(i), v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Index, &mut T)> {
        self.items.iter_mut().enumerate().map(|(i, v)| (Index(i), v))
    }

    pub fn indices(&self) -> impl Iterator<Item = Index> {
        (0..self.items.len()).map(Index)
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Splits `a` and `b` into mutable references when the indices differ.
/// Panics on `a == b`, which should never occur in this kernel (a vehicle is
/// never its own preceding vehicle).
pub fn get_two_mut<T>(arena: &mut Arena<T>, a: Index, b: Index) -> (&mut T, &mut T) {
    assert_ne!(a.0, b.0, "get_two_mut called with identical indices");
    if a.0 < b.0 {
        let (left, right) = arena.items.split_at_mut(b.0);
        (&mut left[a.0], &mut right[0])
    } else {
        let (left, right) = arena.items.split_at_mut(a.0);
        (&mut right[0], &mut left[b.0])
    }
}

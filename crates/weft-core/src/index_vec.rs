//! Arena storage indexed by typed ids.

use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

/// Types usable as an [`IndexVec`] key.
pub trait Idx: Copy + Eq {
    fn new(raw: u32) -> Self;
    fn index(self) -> usize;
}

/// A `Vec` that can only be indexed by its own id type.
///
/// Entries are never removed: a detached declaration keeps its slot so that
/// stale ids still resolve (to the detached node) instead of aliasing a
/// newer allocation.
#[derive(Debug, Clone)]
pub struct IndexVec<I: Idx, T> {
    raw: Vec<T>,
    _marker: PhantomData<fn(I) -> I>,
}

impl<I: Idx, T> Default for IndexVec<I, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: Idx, T> IndexVec<I, T> {
    pub fn new() -> Self {
        Self {
            raw: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Push a value and return its id.
    pub fn push(&mut self, value: T) -> I {
        let idx = I::new(self.raw.len() as u32);
        self.raw.push(value);
        idx
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn get(&self, idx: I) -> Option<&T> {
        self.raw.get(idx.index())
    }

    pub fn get_mut(&mut self, idx: I) -> Option<&mut T> {
        self.raw.get_mut(idx.index())
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.raw.iter()
    }

    pub fn iter_enumerated(&self) -> impl Iterator<Item = (I, &T)> {
        self.raw
            .iter()
            .enumerate()
            .map(|(i, v)| (I::new(i as u32), v))
    }

    /// All ids currently allocated, in allocation order.
    pub fn indices(&self) -> impl Iterator<Item = I> {
        (0..self.raw.len() as u32).map(I::new)
    }

    /// The id the next `push` will return.
    pub fn next_idx(&self) -> I {
        I::new(self.raw.len() as u32)
    }
}

impl<I: Idx, T> Index<I> for IndexVec<I, T> {
    type Output = T;

    fn index(&self, idx: I) -> &T {
        &self.raw[idx.index()]
    }
}

impl<I: Idx, T> IndexMut<I> for IndexVec<I, T> {
    fn index_mut(&mut self, idx: I) -> &mut T {
        &mut self.raw[idx.index()]
    }
}

macro_rules! impl_idx {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Idx for $ty {
                fn new(raw: u32) -> Self {
                    Self(raw)
                }
                fn index(self) -> usize {
                    self.0 as usize
                }
            }
        )*
    };
}

impl_idx!(
    crate::ids::DeclId,
    crate::ids::ContainerId,
    crate::ids::ValueId,
    crate::ids::TypeParamId,
);

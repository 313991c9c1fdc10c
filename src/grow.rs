use std::ops::Index;
use std::slice;

use crate::error::Result;

pub const GROW_SHADERS: usize = 16;
pub const GROW_SURFACES: usize = 16;
pub const GROW_VERTEXES: usize = 1024;
pub const GROW_INDEXES: usize = 1024;
pub const GROW_ARRAYS: usize = 8;
pub const GROW_FACES: usize = 256;

/// A buffer that never shrinks and grows its capacity in fixed increments.
///
/// The logical length only moves up: writing past the end zero-fills
/// (`T::default()`) every slot in between.
#[derive(Debug, Clone)]
pub struct GrowableArray<T> {
    items: Vec<T>,
    capacity: usize,
    increment: usize,
}

impl<T> GrowableArray<T> {
    pub fn new(increment: usize) -> Self {
        GrowableArray {
            items: Vec::new(),
            capacity: 0,
            increment: increment.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn increment(&self) -> usize {
        self.increment
    }

    /// Grows the capacity to `capacity + k * increment` for the smallest `k`
    /// that covers `requested`. Does nothing when the capacity already suffices.
    pub fn ensure_capacity(&mut self, requested: usize) -> Result<()> {
        if requested <= self.capacity {
            return Ok(());
        }
        let steps = (requested - self.capacity + self.increment - 1) / self.increment;
        let new_capacity = self.capacity + steps * self.increment;
        self.items.try_reserve_exact(new_capacity - self.items.len())?;
        self.capacity = new_capacity;
        Ok(())
    }

    pub fn push(&mut self, value: T) -> Result<usize> {
        let index = self.items.len();
        self.ensure_capacity(index + 1)?;
        self.items.push(value);
        Ok(index)
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index)
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.items
    }

    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> slice::IterMut<'_, T> {
        self.items.iter_mut()
    }
}

impl<T: Default> GrowableArray<T> {
    /// Raises the logical length to at least `len`, zero-filling new slots.
    pub fn grow_to(&mut self, len: usize) -> Result<()> {
        if len <= self.items.len() {
            return Ok(());
        }
        self.ensure_capacity(len)?;
        self.items.resize_with(len, T::default);
        Ok(())
    }

    pub fn set(&mut self, index: usize, value: T) -> Result<()> {
        self.grow_to(index + 1)?;
        self.items[index] = value;
        Ok(())
    }
}

impl<T> Index<usize> for GrowableArray<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.items[index]
    }
}

impl<'a, T> IntoIterator for &'a GrowableArray<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

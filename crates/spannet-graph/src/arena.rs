//! Generational arena backing the network store.
//!
//! Slots are reused after removal, but every reuse bumps the slot's
//! generation. A key remembers the generation it was issued with, so a key
//! to a removed element can never alias the element that later takes its
//! slot: looking it up simply yields `None`.

use std::marker::PhantomData;

/// A handle into an [`Arena`].
pub trait ArenaKey: Copy + Eq {
    /// Build a key from a slot index and generation.
    fn from_parts(index: u32, generation: u32) -> Self;
    /// Slot index.
    fn index(&self) -> u32;
    /// Generation the key was issued with.
    fn generation(&self) -> u32;
}

macro_rules! arena_key {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name {
            index: u32,
            generation: u32,
        }

        impl $crate::arena::ArenaKey for $name {
            fn from_parts(index: u32, generation: u32) -> Self {
                Self { index, generation }
            }

            fn index(&self) -> u32 {
                self.index
            }

            fn generation(&self) -> u32 {
                self.generation
            }
        }
    };
}

pub(crate) use arena_key;

#[derive(Clone, Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Slot storage with generation-checked keys.
#[derive(Clone, Debug)]
pub struct Arena<K, T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
    _key: PhantomData<K>,
}

impl<K: ArenaKey, T> Default for Arena<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ArenaKey, T> Arena<K, T> {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
            _key: PhantomData,
        }
    }

    /// Number of live values.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when no value is live.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Store a value and return its key.
    pub fn insert(&mut self, value: T) -> K {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            return K::from_parts(index, slot.generation);
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        K::from_parts(index, 0)
    }

    /// Remove and return the value behind `key`, if it is still live.
    pub fn remove(&mut self, key: K) -> Option<T> {
        let slot = self.slots.get_mut(key.index() as usize)?;
        if slot.generation != key.generation() {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(key.index());
        self.len -= 1;
        Some(value)
    }

    /// True when `key` still refers to a live value.
    pub fn contains(&self, key: K) -> bool {
        self.get(key).is_some()
    }

    /// Borrow the value behind `key`.
    pub fn get(&self, key: K) -> Option<&T> {
        let slot = self.slots.get(key.index() as usize)?;
        if slot.generation != key.generation() {
            return None;
        }
        slot.value.as_ref()
    }

    /// Mutably borrow the value behind `key`.
    pub fn get_mut(&mut self, key: K) -> Option<&mut T> {
        let slot = self.slots.get_mut(key.index() as usize)?;
        if slot.generation != key.generation() {
            return None;
        }
        slot.value.as_mut()
    }

    /// Mutably borrow two distinct values at once.
    pub fn get2_mut(&mut self, a: K, b: K) -> Option<(&mut T, &mut T)> {
        if a.index() == b.index() {
            return None;
        }
        if !self.contains(a) || !self.contains(b) {
            return None;
        }
        let (ia, ib) = (a.index() as usize, b.index() as usize);
        let (lo, hi) = if ia < ib { (ia, ib) } else { (ib, ia) };
        let (left, right) = self.slots.split_at_mut(hi);
        let lo_value = left[lo].value.as_mut()?;
        let hi_value = right[0].value.as_mut()?;
        if ia < ib {
            Some((lo_value, hi_value))
        } else {
            Some((hi_value, lo_value))
        }
    }

    /// Iterate over live values in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (K, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value
                .as_ref()
                .map(|value| (K::from_parts(index as u32, slot.generation), value))
        })
    }
}

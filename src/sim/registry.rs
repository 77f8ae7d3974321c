//! Entity arenas with generation-checked handles
//!
//! Iteration is newest-first: an entity added during a pass is visited
//! before everything that already existed, and a removed handle never
//! resolves again.

use slotmap::{Key, SlotMap, new_key_type};

new_key_type! {
    /// Handle to a character
    pub struct ActorId;
    /// Handle to a transient physics object
    pub struct MobId;
    /// Handle to static scenery or a pickup
    pub struct ObjectId;
}

/// Arena plus insertion order
#[derive(Debug, Clone)]
pub struct Registry<K: Key, V> {
    slots: SlotMap<K, V>,
    order: Vec<K>,
}

impl<K: Key, V> Default for Registry<K, V> {
    fn default() -> Self {
        Self {
            slots: SlotMap::with_key(),
            order: Vec::new(),
        }
    }
}

impl<K: Key, V> Registry<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, value: V) -> K {
        let key = self.slots.insert(value);
        self.order.push(key);
        key
    }

    /// Insert a value that needs to know its own handle
    pub fn insert_with_key(&mut self, f: impl FnOnce(K) -> V) -> K {
        let key = self.slots.insert_with_key(f);
        self.order.push(key);
        key
    }

    pub fn remove(&mut self, key: K) -> Option<V> {
        let value = self.slots.remove(key)?;
        if let Some(pos) = self.order.iter().position(|k| *k == key) {
            self.order.remove(pos);
        }
        Some(value)
    }

    #[inline]
    pub fn get(&self, key: K) -> Option<&V> {
        self.slots.get(key)
    }

    #[inline]
    pub fn get_mut(&mut self, key: K) -> Option<&mut V> {
        self.slots.get_mut(key)
    }

    #[inline]
    pub fn contains(&self, key: K) -> bool {
        self.slots.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Snapshot of handles, newest first. Safe to hold while mutating.
    pub fn ids(&self) -> Vec<K> {
        self.order.iter().rev().copied().collect()
    }

    /// Entries newest first
    pub fn iter(&self) -> impl Iterator<Item = (K, &V)> + '_ {
        self.order
            .iter()
            .rev()
            .filter_map(|k| self.slots.get(*k).map(|v| (*k, v)))
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, v)| v)
    }

    /// Mutable entries in arena order, for passes that never add or remove
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> + '_ {
        self.slots.values_mut()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.order.clear();
    }
}

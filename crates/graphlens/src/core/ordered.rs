//! Id-keyed, insertion-ordered map used for graph node and link storage
//!
//! Membership is keyed by id so uniqueness is structural, and iteration follows
//! insertion order so snapshots are deterministic. Entries live in a slot
//! vector indexed by a hash map; removal leaves a tombstone that is compacted
//! away once tombstones outnumber live entries, so insertion and removal are
//! amortized O(1).

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

use serde::ser::{Serialize, SerializeSeq, Serializer};

/// Tombstones tolerated before a removal triggers compaction
const MIN_TOMBSTONES: usize = 32;

/// Insertion-ordered map keyed by entity id
#[derive(Debug, Clone)]
pub struct OrderedMap<K, V> {
    index: HashMap<K, usize>,
    slots: Vec<Option<(K, V)>>,
}

impl<K, V> Default for OrderedMap<K, V> {
    fn default() -> Self {
        Self {
            index: HashMap::new(),
            slots: Vec::new(),
        }
    }
}

impl<K: Hash + Eq + Clone, V> OrderedMap<K, V> {
    /// Create a new empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, returning the previous value for the key.
    ///
    /// Overwriting keeps the key's original position.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        if let Some(&position) = self.index.get(&key) {
            if let Some((_, slot)) = self.slots[position].as_mut() {
                return Some(std::mem::replace(slot, value));
            }
        }
        self.index.insert(key.clone(), self.slots.len());
        self.slots.push(Some((key, value)));
        None
    }

    /// Remove a key, returning its value if it was present
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let position = self.index.remove(key)?;
        let (_, value) = self.slots[position].take()?;
        self.compact_if_sparse();
        Some(value)
    }

    fn compact_if_sparse(&mut self) {
        let tombstones = self.slots.len() - self.index.len();
        if tombstones < MIN_TOMBSTONES || tombstones <= self.index.len() {
            return;
        }
        self.slots.retain(Option::is_some);
        for (position, slot) in self.slots.iter().enumerate() {
            if let Some((key, _)) = slot {
                if let Some(entry) = self.index.get_mut(key) {
                    *entry = position;
                }
            }
        }
    }

    fn live(&self) -> impl Iterator<Item = &(K, V)> {
        self.slots.iter().flatten()
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let position = *self.index.get(key)?;
        self.slots[position].as_ref().map(|(_, value)| value)
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let position = *self.index.get(key)?;
        self.slots[position].as_mut().map(|(_, value)| value)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Iterate over keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.live().map(|(key, _)| key)
    }

    /// Iterate over values in insertion order
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.live().map(|(_, value)| value)
    }

    /// Mutable access to every value, in insertion order
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.slots.iter_mut().flatten().map(|(_, value)| value)
    }

    pub fn clear(&mut self) {
        self.index.clear();
        self.slots.clear();
    }
}

impl<K, V: Serialize> Serialize for OrderedMap<K, V>
where
    K: Hash + Eq + Clone,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for value in self.values() {
            seq.serialize_element(value)?;
        }
        seq.end()
    }
}

//! Separate-chaining hash map
//!
//! Each bucket owns its chain as a `Vec` of entries. The bucket count doubles
//! and every entry is reinserted once the load factor exceeds 0.75.

use std::borrow::Borrow;
use std::collections::hash_map::RandomState;
use std::fmt;
use std::hash::{BuildHasher, Hash};

/// Initial number of buckets
pub const DEFAULT_CAPACITY: usize = 16;

/// Load factor above which the table grows
const LOAD_FACTOR_THRESHOLD: f64 = 0.75;

/// Hash map with chained collision resolution
#[derive(Clone)]
pub struct ChainedHashMap<K, V, S = RandomState> {
    buckets: Vec<Vec<(K, V)>>,
    len: usize,
    hasher: S,
}

impl<K, V> ChainedHashMap<K, V, RandomState> {
    /// Create an empty map with the default bucket count
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create an empty map with the given bucket count (minimum 1)
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, RandomState::new())
    }
}

impl<K, V, S> ChainedHashMap<K, V, S> {
    /// Create an empty map with the given bucket count and hasher
    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        let capacity = capacity.max(1);
        let mut buckets = Vec::with_capacity(capacity);
        buckets.resize_with(capacity, Vec::new);
        Self {
            buckets,
            len: 0,
            hasher,
        }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current number of buckets
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Iterate over entries in bucket-then-chain order
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.buckets
            .iter()
            .flat_map(|chain| chain.iter().map(|(k, v)| (k, v)))
    }

    /// Iterate over keys in bucket-then-chain order
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(k, _)| k)
    }

    /// Remove every entry, keeping the current bucket count
    pub fn clear(&mut self) {
        for chain in &mut self.buckets {
            chain.clear();
        }
        self.len = 0;
    }
}

impl<K: Clone, V, S> ChainedHashMap<K, V, S> {
    /// Every key across all buckets; unordered with respect to insertion
    pub fn all_keys(&self) -> Vec<K> {
        self.keys().cloned().collect()
    }
}

impl<K: Hash + Eq, V, S: BuildHasher> ChainedHashMap<K, V, S> {
    fn bucket_index<Q>(&self, key: &Q) -> usize
    where
        Q: Hash + ?Sized,
    {
        (self.hasher.hash_one(key) % self.buckets.len() as u64) as usize
    }

    /// Insert a key/value pair.
    ///
    /// Updates in place when the key is already present and returns the old
    /// value; otherwise prepends to the bucket chain.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let index = self.bucket_index(&key);
        let chain = &mut self.buckets[index];
        if let Some(slot) = chain.iter_mut().find(|(k, _)| *k == key) {
            return Some(std::mem::replace(&mut slot.1, value));
        }

        chain.insert(0, (key, value));
        self.len += 1;

        if self.len as f64 / self.buckets.len() as f64 > LOAD_FACTOR_THRESHOLD {
            self.rehash();
        }
        None
    }

    /// Look up a value by key
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let index = self.bucket_index(key);
        self.buckets[index]
            .iter()
            .find(|(k, _)| <K as Borrow<Q>>::borrow(k) == key)
            .map(|(_, v)| v)
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let index = self.bucket_index(key);
        self.buckets[index]
            .iter_mut()
            .find(|(k, _)| <K as Borrow<Q>>::borrow(k) == key)
            .map(|(_, v)| v)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key).is_some()
    }

    /// Remove an entry, returning its value
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let index = self.bucket_index(key);
        let chain = &mut self.buckets[index];
        let position = chain.iter().position(|(k, _)| <K as Borrow<Q>>::borrow(k) == key)?;
        self.len -= 1;
        Some(chain.remove(position).1)
    }

    /// Double the bucket count and reinsert every entry
    fn rehash(&mut self) {
        let new_capacity = self.buckets.len() * 2;
        let mut new_buckets: Vec<Vec<(K, V)>> = Vec::with_capacity(new_capacity);
        new_buckets.resize_with(new_capacity, Vec::new);
        let old_buckets = std::mem::replace(&mut self.buckets, new_buckets);

        for (key, value) in old_buckets.into_iter().flatten() {
            let index = self.bucket_index(&key);
            self.buckets[index].insert(0, (key, value));
        }
    }
}

impl<K, V> Default for ChainedHashMap<K, V, RandomState> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Hash + Eq, V, S: BuildHasher> Extend<(K, V)> for ChainedHashMap<K, V, S> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K: Hash + Eq, V> FromIterator<(K, V)> for ChainedHashMap<K, V, RandomState> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<K: fmt::Debug, V: fmt::Debug, S> fmt::Debug for ChainedHashMap<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut map = ChainedHashMap::new();
        assert!(map.is_empty());

        assert_eq!(map.insert("users".to_string(), 1), None);
        assert_eq!(map.insert("orders".to_string(), 2), None);

        assert_eq!(map.len(), 2);
        assert_eq!(map.get("users"), Some(&1));
        assert_eq!(map.get("orders"), Some(&2));
        assert_eq!(map.get("missing"), None);
    }

    #[test]
    fn test_insert_updates_in_place() {
        let mut map = ChainedHashMap::new();
        map.insert("a".to_string(), "x".to_string());
        let old = map.insert("a".to_string(), "y".to_string());

        assert_eq!(old, Some("x".to_string()));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("a").map(String::as_str), Some("y"));
    }

    #[test]
    fn test_growth_after_load_factor() {
        let mut map = ChainedHashMap::new();
        for i in 0..12 {
            map.insert(i, i * 10);
        }
        // 12 / 16 == 0.75 is not above the threshold
        assert_eq!(map.bucket_count(), 16);

        map.insert(12, 120);
        assert_eq!(map.bucket_count(), 32);

        for i in 0..13 {
            assert_eq!(map.get(&i), Some(&(i * 10)));
        }
    }

    #[test]
    fn test_single_bucket_chains() {
        let mut map = ChainedHashMap::with_capacity(0);
        assert_eq!(map.bucket_count(), 1);

        map.insert("k1", 1);
        map.insert("k2", 2);
        map.insert("k3", 3);

        assert_eq!(map.get(&"k1"), Some(&1));
        assert_eq!(map.get(&"k2"), Some(&2));
        assert_eq!(map.get(&"k3"), Some(&3));
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_remove() {
        let mut map: ChainedHashMap<String, i32> = ChainedHashMap::new();
        map.insert("a".to_string(), 1);
        map.insert("b".to_string(), 2);

        assert_eq!(map.remove("a"), Some(1));
        assert_eq!(map.remove("a"), None);
        assert!(!map.contains_key("a"));
        assert!(map.contains_key("b"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_all_keys_and_clone() {
        let map: ChainedHashMap<String, usize> = (0..40).map(|i| (format!("k{}", i), i)).collect();

        let mut keys = map.all_keys();
        keys.sort();
        assert_eq!(keys.len(), 40);
        assert!(keys.contains(&"k0".to_string()));
        assert!(keys.contains(&"k39".to_string()));

        let mut copy = map.clone();
        copy.insert("extra".to_string(), 99);
        assert_eq!(map.len(), 40);
        assert_eq!(copy.len(), 41);
        assert_eq!(copy.get("k7"), Some(&7));
    }

    #[test]
    fn test_get_mut() {
        let mut map = ChainedHashMap::new();
        map.insert(1, vec!["a".to_string()]);
        if let Some(values) = map.get_mut(&1) {
            values.push("b".to_string());
        }
        assert_eq!(map.get(&1).map(Vec::len), Some(2));
    }
}

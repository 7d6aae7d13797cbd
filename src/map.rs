//! The common map contract.
//!
//! These traits describe what any concurrent map strategy offers, so that harnesses can drive
//! and compare them through one interface. `ConcurrentHashTable` implements both.

use hasher::HashCode;
use interrupt::Interrupt;
use table::ConcurrentHashTable;
use Error;

/// A thread-safe map.
pub trait Map<K, V> {
    /// Get the number of entries.
    fn len(&self) -> usize;
    /// Is the map empty?
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Get a copy of the value of `key`.
    fn get(&self, key: &K) -> Option<V>;
    /// Does the map contain `key`?
    fn contains_key(&self, key: &K) -> bool;
    /// Insert a pair, replacing the value if the key is present.
    fn put(&self, key: K, val: V);
    /// Remove the entry of `key`, returning whether there was one.
    fn remove(&self, key: &K) -> bool;
    /// Remove every entry.
    fn remove_all(&self);
    /// Do the keys hash identically?
    fn is_same_hash(&self, a: &K, b: &K) -> bool;
}

/// Introspection used by tests and load harnesses.
pub trait Diagnostics<K, V>: Map<K, V> {
    /// Get the number of entries in each bucket.
    fn bucket_sizes(&self) -> Vec<usize>;
    /// Count the entries by a full scan.
    fn scan_len(&self) -> usize;
    /// Insert a pair and remove it again, atomically.
    fn insert_then_remove(&self, key: K, val: V);
    /// Hold the read lock for a while, unless interrupted.
    fn heavy_read(&self, interrupt: &Interrupt) -> Result<(), Error>;
}

impl<K: HashCode + PartialEq, V: Clone> Map<K, V> for ConcurrentHashTable<K, V> {
    fn len(&self) -> usize {
        ConcurrentHashTable::len(self)
    }

    fn is_empty(&self) -> bool {
        ConcurrentHashTable::is_empty(self)
    }

    fn get(&self, key: &K) -> Option<V> {
        ConcurrentHashTable::get(self, key)
    }

    fn contains_key(&self, key: &K) -> bool {
        ConcurrentHashTable::contains_key(self, key)
    }

    fn put(&self, key: K, val: V) {
        ConcurrentHashTable::put(self, key, val)
    }

    fn remove(&self, key: &K) -> bool {
        ConcurrentHashTable::remove(self, key)
    }

    fn remove_all(&self) {
        ConcurrentHashTable::remove_all(self)
    }

    fn is_same_hash(&self, a: &K, b: &K) -> bool {
        ConcurrentHashTable::is_same_hash(self, a, b)
    }
}

impl<K: HashCode + PartialEq + Clone, V: Clone> Diagnostics<K, V> for ConcurrentHashTable<K, V> {
    fn bucket_sizes(&self) -> Vec<usize> {
        ConcurrentHashTable::bucket_sizes(self)
    }

    fn scan_len(&self) -> usize {
        ConcurrentHashTable::scan_len(self)
    }

    fn insert_then_remove(&self, key: K, val: V) {
        ConcurrentHashTable::insert_then_remove(self, key, val)
    }

    fn heavy_read(&self, interrupt: &Interrupt) -> Result<(), Error> {
        ConcurrentHashTable::heavy_read(self, interrupt)
    }
}

//! Key-value entries.

use parking_lot::RwLock;
use std::borrow::Borrow;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::{fmt, mem};

struct Pair<K, V> {
    key: K,
    value: RwLock<V>,
}

/// A key-value entry.
///
/// The key is fixed at creation, while the value can be replaced through a shared reference.
///
/// Equality and hashing look at the key only, and the entry borrows as its key. That is what lets
/// a bucket be searched with a bare key: the key acts as a placeholder entry with the same key and
/// no particular value. These impls are not behind any trait of this crate, so there is nothing
/// to override them with.
///
/// Entries are shared handles: cloning one gives another handle to the same key and value.
pub struct Entry<K, V> {
    pair: Arc<Pair<K, V>>,
}

impl<K, V> Entry<K, V> {
    /// Create a new entry.
    pub fn new(key: K, value: V) -> Entry<K, V> {
        Entry {
            pair: Arc::new(Pair {
                key: key,
                value: RwLock::new(value),
            }),
        }
    }

    /// Get the key.
    pub fn key(&self) -> &K {
        &self.pair.key
    }

    /// Get a copy of the value.
    pub fn value(&self) -> V where V: Clone {
        self.pair.value.read().clone()
    }

    /// Replace the value, returning the old one.
    pub fn replace(&self, value: V) -> V {
        mem::replace(&mut *self.pair.value.write(), value)
    }
}

impl<K, V> Clone for Entry<K, V> {
    fn clone(&self) -> Entry<K, V> {
        Entry {
            pair: self.pair.clone(),
        }
    }
}

impl<K: PartialEq, V> PartialEq for Entry<K, V> {
    fn eq(&self, other: &Entry<K, V>) -> bool {
        self.key() == other.key()
    }
}

impl<K: Eq, V> Eq for Entry<K, V> {}

impl<K: Hash, V> Hash for Entry<K, V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state)
    }
}

impl<K, V> Borrow<K> for Entry<K, V> {
    fn borrow(&self) -> &K {
        self.key()
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Entry<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Entry")
            .field("key", self.key())
            .field("value", &*self.pair.value.read())
            .finish()
    }
}

impl<K: fmt::Display, V: fmt::Display> fmt::Display for Entry<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.key(), *self.pair.value.read())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn std_hash<T: Hash>(x: &T) -> u64 {
        let mut h = DefaultHasher::new();
        x.hash(&mut h);
        h.finish()
    }

    #[test]
    fn equality_is_by_key() {
        assert_eq!(Entry::new(1, "a"), Entry::new(1, "b"));
        assert!(Entry::new(1, "a") != Entry::new(2, "a"));
    }

    #[test]
    fn hash_is_by_key() {
        assert_eq!(std_hash(&Entry::new("k", 1)), std_hash(&Entry::new("k", 2)));
        assert_eq!(std_hash(&Entry::new("k", 1)), std_hash(&"k"));
    }

    #[test]
    fn borrow_as_key() {
        let e = Entry::new(String::from("k"), 1);
        let k: &String = e.borrow();

        assert_eq!(k, "k");
    }

    #[test]
    fn replace_is_shared() {
        let e = Entry::new(1, String::from("a"));
        let f = e.clone();

        assert_eq!(f.replace(String::from("b")), "a");
        assert_eq!(e.value(), "b");
    }

    #[test]
    fn display() {
        assert_eq!(Entry::new(1, "a").to_string(), "1: a");
        assert_eq!(format!("{:?}", Entry::new(1, "a")), "Entry { key: 1, value: \"a\" }");
    }
}

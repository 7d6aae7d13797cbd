//! The concurrent hash table.
//!
//! # Locking
//!
//! There are two tiers of locks. The table lock (`ConcurrentHashTable::table`) is taken by every
//! operation: shared for lookups, exclusive for anything which inserts, removes or rehashes. Each
//! bucket is a `Chain`, which takes its own lock on top of that. Since the chain locks are only
//! ever taken inside the table lock, they are uncontended when the table drives them, but they
//! keep a chain safe on its own.
//!
//! # Size accounting
//!
//! The number of entries is tracked in an atomic counter next to the table lock, and adjusted in
//! the same critical section as the chain mutation it accounts for. Readers only look at it under
//! the read lock, so they can never observe a half-done insertion or removal.

use parking_lot::RwLock;
use rwchain::{self, Chain, Element};
use slog::{self, Logger};
use std::sync::atomic::{self, AtomicUsize};
use std::sync::Arc;
use std::time::Duration;
use std::{fmt, mem};
use config::Config;
use entry::Entry;
use hasher::{self, HashCode};
use interrupt::Interrupt;
use Error;

/// The atomic ordering used for the entry counter.
const ORDERING: atomic::Ordering = atomic::Ordering::SeqCst;

/// A bucket. `None` until the first entry lands in it.
type Bucket<K, V> = Option<Arc<Chain<Entry<K, V>>>>;

/// The bucket array.
struct Table<K, V> {
    /// The buckets.
    ///
    /// This is shared with iterators, which walk it without the table lock. If a bucket has to be
    /// created while an iterator holds the array, the array is copied first (see
    /// `Table::insert_front`), so the iterator keeps its view.
    buckets: Arc<Vec<Bucket<K, V>>>,
}

impl<K, V> Table<K, V> {
    fn with_capacity(cap: usize) -> Table<K, V> {
        Table {
            buckets: Arc::new(vec![None; cap]),
        }
    }

    fn capacity(&self) -> usize {
        self.buckets.len()
    }

    /// Iterate over the non-empty buckets.
    fn chains(&self) -> impl Iterator<Item = &Chain<Entry<K, V>>> {
        self.buckets.iter().filter_map(|bucket| bucket.as_ref().map(|chain| &**chain))
    }
}

impl<K: HashCode + PartialEq, V> Table<K, V> {
    fn lookup(&self, key: &K) -> Option<Element<Entry<K, V>>> {
        let index = hasher::bucket_index(key, self.capacity());

        match self.buckets[index] {
            Some(ref chain) => chain.find(key),
            None => None,
        }
    }

    /// Insert an entry at the front of bucket `index`, creating the bucket if needed.
    fn insert_front(&mut self, index: usize, entry: Entry<K, V>) {
        if let Some(ref chain) = self.buckets[index] {
            chain.push_front(entry);
            return;
        }

        Arc::make_mut(&mut self.buckets)[index] = Some(Arc::new(Chain::with_first(entry)));
    }

    fn remove(&self, key: &K) -> bool {
        let index = hasher::bucket_index(key, self.capacity());

        match self.buckets[index] {
            Some(ref chain) => chain.remove(key),
            None => false,
        }
    }
}

/// A weakly consistent iterator over a table.
///
/// The iterator walks the buckets in order and, within a bucket, the chain from front to back,
/// yielding copies of the keys and values. It does not hold the table lock: it captures the bucket
/// array when it is created and each chain when it reaches it.
///
/// If the table is mutated while it is being iterated over, entries may be missed or yielded
/// twice. In particular, a rehash or `remove_all` replaces the bucket array, so an iterator created
/// before one keeps walking the old buckets. Without concurrent mutation, every entry is yielded
/// exactly once.
pub struct Iter<K, V> {
    buckets: Arc<Vec<Bucket<K, V>>>,
    /// The next bucket to visit.
    index: usize,
    /// The cursor in the current bucket.
    chain: Option<rwchain::Iter<Entry<K, V>>>,
}

impl<K: Clone, V: Clone> Iterator for Iter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<(K, V)> {
        loop {
            if let Some(entry) = self.chain.as_mut().and_then(|chain| chain.next()) {
                return Some((entry.key().clone(), entry.value()));
            }

            // The current chain is exhausted (or we haven't started). Move on to the next bucket.
            let bucket = self.buckets.get(self.index)?;
            self.index += 1;
            self.chain = bucket.as_ref().map(|chain| chain.iter());
        }
    }
}

/// A thread-safe, resizable hash table.
///
/// Entries are kept in an array of buckets, each a linked list (`Chain`) of the entries whose key
/// hashes to it. Once the number of entries per bucket reaches the load factor, the table
/// multiplies its bucket count by its growth factor (2 by default).
///
/// The table is `Sync`; share it between threads with an `Arc`.
///
/// # Example
///
/// ```rust
/// use rwtable::ConcurrentHashTable;
///
/// let table = ConcurrentHashTable::new();
/// table.put("hey", 1);
/// table.put("hey", 2);
///
/// assert_eq!(table.len(), 1);
/// assert_eq!(table.get(&"hey"), Some(2));
/// assert!(table.remove(&"hey"));
/// assert!(table.is_empty());
/// ```
pub struct ConcurrentHashTable<K, V> {
    /// The number of entries.
    total: AtomicUsize,
    /// The buckets, under the table lock.
    table: RwLock<Table<K, V>>,
    /// The fill ratio at which the table grows.
    load_factor: f64,
    /// The factor the capacity grows by.
    growth_factor: usize,
    /// How long `heavy_read` holds the read lock.
    heavy_read_delay: Duration,
    /// The logger.
    log: Logger,
}

impl<K, V> ConcurrentHashTable<K, V> {
    /// Create a table with the default configuration.
    pub fn new() -> ConcurrentHashTable<K, V> {
        let config = Config::default();

        ConcurrentHashTable::build(&config, Logger::root(slog::Discard, o!()))
    }

    /// Create a table with `cap` initial buckets, growing at `load_factor`.
    pub fn with_capacity(cap: usize, load_factor: f64) -> Result<ConcurrentHashTable<K, V>, Error> {
        ConcurrentHashTable::with_config(Config {
            capacity: cap,
            load_factor: load_factor,
            ..Config::default()
        })
    }

    /// Create a table from a configuration.
    pub fn with_config(config: Config) -> Result<ConcurrentHashTable<K, V>, Error> {
        ConcurrentHashTable::with_config_and_logger(config, Logger::root(slog::Discard, o!()))
    }

    /// Create a table from a configuration, logging to `log`.
    pub fn with_config_and_logger(config: Config, log: Logger)
        -> Result<ConcurrentHashTable<K, V>, Error> {
        config.validate()?;

        Ok(ConcurrentHashTable::build(&config, log))
    }

    fn build(config: &Config, log: Logger) -> ConcurrentHashTable<K, V> {
        debug!(log, "creating table";
               "capacity" => config.capacity, "load_factor" => config.load_factor);

        ConcurrentHashTable {
            total: AtomicUsize::new(0),
            table: RwLock::new(Table::with_capacity(config.capacity)),
            load_factor: config.load_factor,
            growth_factor: config.growth_factor,
            heavy_read_delay: config.heavy_read_delay,
            log: log,
        }
    }

    /// Get the number of entries.
    pub fn len(&self) -> usize {
        let _lock = self.table.read();
        self.total.load(ORDERING)
    }

    /// Is the table empty?
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the number of buckets.
    pub fn capacity(&self) -> usize {
        self.table.read().capacity()
    }

    /// Get the load factor.
    pub fn load_factor(&self) -> f64 {
        self.load_factor
    }

    /// Remove every entry.
    ///
    /// The number of buckets is kept.
    pub fn remove_all(&self) {
        let old = {
            let mut lock = self.table.write();
            let cap = lock.capacity();

            debug!(self.log, "removing all entries";
                   "entries" => self.total.load(ORDERING), "capacity" => cap);

            self.total.store(0, ORDERING);
            let old = mem::replace(&mut *lock, Table::with_capacity(cap));
            old
        };
        // Tear the old buckets down outside the lock.
        drop(old);
    }

    /// Iterate over the entries.
    ///
    /// The iterator is weakly consistent; see `Iter`.
    pub fn iter(&self) -> Iter<K, V> {
        let buckets = self.table.read().buckets.clone();

        Iter {
            buckets: buckets,
            index: 0,
            chain: None,
        }
    }

    /// Get the number of entries in each bucket.
    pub fn bucket_sizes(&self) -> Vec<usize> {
        let lock = self.table.read();

        lock.buckets.iter()
            .map(|bucket| bucket.as_ref().map_or(0, |chain| chain.len()))
            .collect()
    }

    /// Count the entries by walking every bucket.
    ///
    /// Outside of an in-flight mutation, this is equal to `len()`.
    pub fn scan_len(&self) -> usize {
        self.table.read().chains().map(|chain| chain.node_count()).sum()
    }

    /// Hold the read lock for the configured delay.
    ///
    /// This simulates an expensive read, and is used to exercise writers waiting on readers. The
    /// wait can be cut short through `interrupt`, in which case `Error::Interrupted` is returned.
    pub fn heavy_read(&self, interrupt: &Interrupt) -> Result<(), Error> {
        let _lock = self.table.read();

        interrupt.sleep(self.heavy_read_delay).map_err(|err| {
            debug!(self.log, "heavy read interrupted");
            err
        })
    }
}

impl<K: HashCode + PartialEq, V> ConcurrentHashTable<K, V> {
    /// Get a copy of the value of `key`.
    pub fn get(&self, key: &K) -> Option<V> where V: Clone {
        let lock = self.table.read();
        lock.lookup(key).map(|entry| entry.value())
    }

    /// Does the table contain `key`?
    pub fn contains_key(&self, key: &K) -> bool {
        let lock = self.table.read();
        lock.lookup(key).is_some()
    }

    /// Insert a key-value pair.
    ///
    /// If the key is already in the table, its value is replaced in place, and the number of
    /// entries is unchanged. The table may grow before the pair is inserted.
    pub fn put(&self, key: K, val: V) {
        let mut lock = self.table.write();
        self.put_locked(&mut lock, key, val);
    }

    /// Remove the entry of `key`.
    ///
    /// Returns `false` if there was no such entry.
    pub fn remove(&self, key: &K) -> bool {
        let lock = self.table.write();
        self.remove_locked(&lock, key)
    }

    /// Do the keys hash identically?
    ///
    /// This only depends on the keys' hash codes, not on the capacity.
    pub fn is_same_hash(&self, a: &K, b: &K) -> bool {
        hasher::hash(a) == hasher::hash(b)
    }

    /// Insert a pair and remove it again, under a single write lock.
    ///
    /// Other threads never observe the intermediate state. The insertion may still grow the table.
    pub fn insert_then_remove(&self, key: K, val: V) where K: Clone {
        let mut lock = self.table.write();

        self.put_locked(&mut lock, key.clone(), val);
        self.remove_locked(&lock, &key);
    }

    fn put_locked(&self, table: &mut Table<K, V>, key: K, val: V) {
        self.rehash(table);

        if let Some(entry) = table.lookup(&key) {
            entry.replace(val);
            return;
        }

        let index = hasher::bucket_index(&key, table.capacity());
        table.insert_front(index, Entry::new(key, val));
        self.total.fetch_add(1, ORDERING);
    }

    fn remove_locked(&self, table: &Table<K, V>, key: &K) -> bool {
        if table.remove(key) {
            self.total.fetch_sub(1, ORDERING);
            true
        } else {
            false
        }
    }

    /// Grow the table, if it is filled up to the load factor.
    ///
    /// Every entry is moved to its bucket under the new capacity. This runs under the write lock,
    /// so no other thread sees entries placed under different capacities.
    fn rehash(&self, table: &mut Table<K, V>) {
        let cap = table.capacity();
        let total = self.total.load(ORDERING);

        if (total as f64) / (cap as f64) < self.load_factor {
            return;
        }

        let new_cap = cap.saturating_mul(self.growth_factor);
        let mut new_table = Table::with_capacity(new_cap);
        for chain in table.chains() {
            for entry in chain.to_vec() {
                let index = hasher::bucket_index(entry.key(), new_cap);
                new_table.insert_front(index, entry);
            }
        }

        debug!(self.log, "rehashed table"; "from" => cap, "to" => new_cap, "entries" => total);

        *table = new_table;
    }
}

impl<K, V> Default for ConcurrentHashTable<K, V> {
    fn default() -> ConcurrentHashTable<K, V> {
        ConcurrentHashTable::new()
    }
}

impl<'a, K: Clone, V: Clone> IntoIterator for &'a ConcurrentHashTable<K, V> {
    type Item = (K, V);
    type IntoIter = Iter<K, V>;

    fn into_iter(self) -> Iter<K, V> {
        self.iter()
    }
}

impl<K: Clone + fmt::Debug, V: Clone + fmt::Debug> fmt::Debug for ConcurrentHashTable<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Clone + fmt::Display, V: Clone + fmt::Display> fmt::Display for ConcurrentHashTable<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{{")?;
        for (n, (key, val)) in self.iter().enumerate() {
            if n != 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", key, val)?;
        }
        write!(f, "}}")
    }
}

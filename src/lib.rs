//! A thread-safe, resizable hash table with two tiers of reader/writer locks.
//!
//! `ConcurrentHashTable` is an array of buckets, each a singly linked `Chain` of entries with its
//! own lock, under a table-wide reader/writer lock. Lookups share the table lock, while
//! insertions and removals take it exclusively. When the number of entries per bucket reaches the
//! load factor, the next insertion multiplies the bucket count by the growth factor (2 by
//! default) and redistributes every entry before it inserts, all under the same exclusive lock.
//!
//! Iteration is deliberately weaker: it holds no lock across the traversal, so concurrent
//! mutations may make it miss or repeat entries. See `Iter`.
//!
//! Keys are hashed through their `HashCode`, dispersed with MurmurHash3. Keys can be absent
//! (`None` of an `Option` key), in which case they always land in the first bucket.

#[macro_use]
extern crate slog;
#[macro_use]
extern crate quick_error;
extern crate parking_lot;
extern crate rwchain;
extern crate seahash;

pub mod hasher;
mod config;
mod entry;
mod error;
mod interrupt;
mod map;
mod table;


pub use config::{Config, DEFAULT_CAPACITY, DEFAULT_LOAD_FACTOR, GROWTH_FACTOR, HEAVY_READ_DELAY};
pub use entry::Entry;
pub use error::Error;
pub use hasher::HashCode;
pub use interrupt::Interrupt;
pub use map::{Diagnostics, Map};
pub use table::{ConcurrentHashTable, Iter};

//! A singly linked list guarded by a reader/writer lock.
//!
//! `Chain` is the bucket type of `rwtable`, but it is a thread-safe container in its own right:
//! every query takes the chain's read lock and every mutation takes its write lock, so it can be
//! shared between threads without any outer synchronization.
//!
//! # Iteration
//!
//! Iteration is the exception. `Chain::iter()` only holds the read lock while it captures the
//! first node, and the traversal itself runs unlocked. Holding the lock for as long as the caller
//! keeps the iterator around would let any slow consumer block writers indefinitely, so instead
//! the iterator is _weakly consistent_: if the chain is mutated while it is being traversed, an
//! element may be skipped or observed twice, and the traversal may end early. It never observes
//! freed memory, never panics and never deadlocks, since every node is reference counted and each
//! link is its own synchronized cell.

extern crate parking_lot;


use parking_lot::{Mutex, RwLock};
use std::borrow::Borrow;
use std::iter::FromIterator;
use std::sync::atomic::{self, AtomicUsize};
use std::sync::Arc;
use std::{fmt, mem, ops};

/// The atomic ordering used for the element counter.
const ORDERING: atomic::Ordering = atomic::Ordering::SeqCst;

type Link<T> = Option<Arc<Node<T>>>;

/// A link to the next node.
///
/// The cell lock is only ever held for the duration of a pointer copy or swap, never while
/// acquiring another lock or running user code.
struct Cell<T> {
    link: Mutex<Link<T>>,
}

impl<T> Cell<T> {
    fn new(link: Link<T>) -> Cell<T> {
        Cell {
            link: Mutex::new(link),
        }
    }

    fn load(&self) -> Link<T> {
        self.link.lock().clone()
    }

    /// Swap the link, returning the old one.
    ///
    /// The old link is returned rather than dropped, so that whatever it tears down happens
    /// outside the cell lock.
    fn replace(&self, link: Link<T>) -> Link<T> {
        mem::replace(&mut *self.link.lock(), link)
    }
}

struct Node<T> {
    value: T,
    next: Cell<T>,
}

impl<T> Node<T> {
    fn new(value: T, next: Link<T>) -> Arc<Node<T>> {
        Arc::new(Node {
            value: value,
            next: Cell::new(next),
        })
    }
}

impl<T> Drop for Node<T> {
    fn drop(&mut self) {
        // Unroll the tail, so long chains don't overflow the stack through recursive drops. We
        // stop at the first node someone else (an iterator or a handle) still refers to.
        let mut next = self.next.link.get_mut().take();
        while let Some(node) = next {
            match Arc::try_unwrap(node) {
                Ok(mut node) => next = node.next.link.get_mut().take(),
                Err(_) => break,
            }
        }
    }
}

/// Is `value` equivalent to `probe`?
fn matches<T, Q: ?Sized>(value: &T, probe: &Q) -> bool
    where T: Borrow<Q>, Q: PartialEq {
    let value: &Q = value.borrow();
    value == probe
}

/// A handle to an element of a chain.
///
/// The handle keeps the element alive even if it is removed from the chain in the meantime. It
/// only gives shared access: the chain cannot be restructured through it.
pub struct Element<T> {
    node: Arc<Node<T>>,
}

impl<T> ops::Deref for Element<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.node.value
    }
}

impl<T> Clone for Element<T> {
    fn clone(&self) -> Element<T> {
        Element {
            node: self.node.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Element<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(&self.node.value, f)
    }
}

impl<T: fmt::Display> fmt::Display for Element<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.node.value, f)
    }
}

/// A weakly consistent iterator over a chain.
///
/// See the crate documentation for the guarantees. The iterator is finite and cannot be
/// restarted; call `Chain::iter()` again for a fresh traversal.
pub struct Iter<T> {
    next: Link<T>,
}

impl<T> Iterator for Iter<T> {
    type Item = Element<T>;

    fn next(&mut self) -> Option<Element<T>> {
        let node = self.next.take()?;
        self.next = node.next.load();

        Some(Element { node: node })
    }
}

/// A singly linked list guarded by its own reader/writer lock.
///
/// Lookups are done by equivalence through `Borrow`: a chain of `T` can be searched with any `Q`
/// that `T` borrows as, which is how a bucket of key-value entries is searched by key alone.
pub struct Chain<T> {
    /// The dummy head. Its link points at the first node.
    head: Cell<T>,
    /// The number of nodes reachable from the head.
    len: AtomicUsize,
    /// The lock guarding the structure of the list.
    lock: RwLock<()>,
}

impl<T> Chain<T> {
    /// Create an empty chain.
    pub fn new() -> Chain<T> {
        Chain {
            head: Cell::new(None),
            len: AtomicUsize::new(0),
            lock: RwLock::new(()),
        }
    }

    /// Create a chain holding a single element.
    pub fn with_first(value: T) -> Chain<T> {
        let chain = Chain::new();
        chain.link_front(value);
        chain
    }

    /// Get the number of elements.
    pub fn len(&self) -> usize {
        let _lock = self.lock.read();
        self.len.load(ORDERING)
    }

    /// Is the chain empty?
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the element at position `index`, counting from the front.
    pub fn get(&self, index: usize) -> Option<Element<T>> {
        let _lock = self.lock.read();
        self.cursor().nth(index)
    }

    /// Find the first element equivalent to `probe`.
    pub fn find<Q: ?Sized>(&self, probe: &Q) -> Option<Element<T>>
        where T: Borrow<Q>, Q: PartialEq {
        let _lock = self.lock.read();
        self.cursor().find(|x| matches(&x.node.value, probe))
    }

    /// Does the chain contain an element equivalent to `probe`?
    pub fn contains<Q: ?Sized>(&self, probe: &Q) -> bool
        where T: Borrow<Q>, Q: PartialEq {
        self.find(probe).is_some()
    }

    /// Get the position of the first element equivalent to `probe`.
    pub fn index_of<Q: ?Sized>(&self, probe: &Q) -> Option<usize>
        where T: Borrow<Q>, Q: PartialEq {
        let _lock = self.lock.read();
        self.cursor().position(|x| matches(&x.node.value, probe))
    }

    /// Insert an element at the front of the chain.
    pub fn push_front(&self, value: T) -> &Chain<T> {
        let _lock = self.lock.write();
        self.link_front(value);
        self
    }

    /// Insert an element at the back of the chain.
    ///
    /// This walks the whole chain to find the tail.
    pub fn push_back(&self, value: T) -> &Chain<T> {
        let _lock = self.lock.write();
        self.link_back(value);
        self
    }

    /// Replace the element at position `index`.
    ///
    /// Returns `false` if `index` is out of range. Iterators which have already reached the old
    /// node keep seeing the old element.
    pub fn set(&self, index: usize, value: T) -> bool {
        let _lock = self.lock.write();

        let mut prev: Link<T> = None;
        let mut cur = self.head.load();
        let mut remaining = index;

        while let Some(node) = cur {
            if remaining == 0 {
                let old = self.relink(&prev, Some(Node::new(value, node.next.load())));
                drop(old);

                return true;
            }

            remaining -= 1;
            cur = node.next.load();
            prev = Some(node);
        }

        false
    }

    /// Remove the first element equivalent to `probe`.
    ///
    /// Returns whether an element was removed.
    pub fn remove<Q: ?Sized>(&self, probe: &Q) -> bool
        where T: Borrow<Q>, Q: PartialEq {
        let _lock = self.lock.write();
        self.unlink(probe)
    }

    /// Remove every element.
    pub fn clear(&self) -> &Chain<T> {
        let old = {
            let _lock = self.lock.write();
            self.len.store(0, ORDERING);
            self.head.replace(None)
        };
        drop(old);

        self
    }

    /// Iterate over the chain.
    ///
    /// The read lock is released before this returns; see the crate documentation for what that
    /// means for concurrent mutation.
    pub fn iter(&self) -> Iter<T> {
        let _lock = self.lock.read();
        self.cursor()
    }

    /// Collect every element into a vector, in order.
    pub fn to_vec(&self) -> Vec<T> where T: Clone {
        let _lock = self.lock.read();
        self.cursor().map(|x| x.node.value.clone()).collect()
    }

    /// Count the nodes reachable from the head by walking them.
    ///
    /// Outside of an in-flight mutation, this is equal to `len()`.
    pub fn node_count(&self) -> usize {
        let _lock = self.lock.read();
        self.cursor().count()
    }

    /// Insert and remove `value` at both ends of the chain, under a single write lock.
    ///
    /// Other threads never observe the intermediate states.
    pub fn insert_then_remove(&self, value: T) where T: Clone + PartialEq {
        let _lock = self.lock.write();

        self.link_front(value.clone());
        self.unlink(&value);
        self.link_back(value.clone());
        self.unlink(&value);
    }

    /// A cursor at the first node. The caller is responsible for locking.
    fn cursor(&self) -> Iter<T> {
        Iter {
            next: self.head.load(),
        }
    }

    fn link_front(&self, value: T) {
        let node = Node::new(value, self.head.load());
        let old = self.head.replace(Some(node));
        // The old first node is now linked from the new one, so this only drops a reference.
        drop(old);
        self.len.fetch_add(1, ORDERING);
    }

    fn link_back(&self, value: T) {
        let node = Node::new(value, None);
        match self.cursor().last() {
            Some(tail) => tail.node.next.replace(Some(node)),
            None => self.head.replace(Some(node)),
        };
        self.len.fetch_add(1, ORDERING);
    }

    /// Point the link after `prev` (or the head, if `prev` is `None`) at `link`.
    fn relink(&self, prev: &Link<T>, link: Link<T>) -> Link<T> {
        match *prev {
            Some(ref prev) => prev.next.replace(link),
            None => self.head.replace(link),
        }
    }

    fn unlink<Q: ?Sized>(&self, probe: &Q) -> bool
        where T: Borrow<Q>, Q: PartialEq {
        let mut prev: Link<T> = None;
        let mut cur = self.head.load();

        while let Some(node) = cur {
            if matches(&node.value, probe) {
                let removed = self.relink(&prev, node.next.load());
                self.len.fetch_sub(1, ORDERING);
                drop(removed);

                return true;
            }

            cur = node.next.load();
            prev = Some(node);
        }

        false
    }
}

impl<T> Default for Chain<T> {
    fn default() -> Chain<T> {
        Chain::new()
    }
}

impl<T> FromIterator<T> for Chain<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Chain<T> {
        let chain = Chain::new();
        // Link back to front, so we never have to walk to the tail.
        let values: Vec<T> = iter.into_iter().collect();
        for value in values.into_iter().rev() {
            chain.link_front(value);
        }

        chain
    }
}

impl<'a, T> IntoIterator for &'a Chain<T> {
    type Item = Element<T>;
    type IntoIter = Iter<T>;

    fn into_iter(self) -> Iter<T> {
        self.iter()
    }
}

impl<T: fmt::Debug> fmt::Debug for Chain<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: fmt::Display> fmt::Display for Chain<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[")?;
        for (n, x) in self.iter().enumerate() {
            if n != 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", x)?;
        }
        write!(f, "]")
    }
}

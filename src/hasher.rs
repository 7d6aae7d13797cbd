//! Key hashing.
//!
//! A key is hashed in three steps:
//!
//! 1. The key's native hash code, a signed 32-bit integer (`HashCode`), is computed. The absent
//!    key has no hash code, and always hashes to 0.
//! 2. The hash code is encoded as the shortest two's complement big-endian byte string which
//!    represents it, and MurmurHash3 (x86, 32-bit) is run over those bytes. The native hash codes
//!    of many key types are poorly distributed (think small integers), and this disperses them
//!    over the full 32 bits.
//! 3. The sign bit is masked off.
//!
//! The bucket is then the hash modulo the number of buckets. MurmurHash3 is fast and well
//! distributed, but it is not collision resistant, so tables keyed by adversarial input can be
//! forced into a single bucket.
//!
//! Since the hash is a function of the hash code alone, two keys with equal hash codes always have
//! equal hashes, regardless of the table's capacity.

use seahash::SeaHasher;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use std::sync::Arc;

/// The seed of the MurmurHash3 round.
pub const SEED: u32 = 104729;

/// The hash of the absent key.
const ABSENT: u32 = 0;

/// A key with a native hash code.
///
/// Equal keys must have equal hash codes. `None` marks the _absent_ key, which is always placed
/// in the first bucket.
pub trait HashCode {
    /// Get the native hash code, or `None` for the absent key.
    fn hash_code(&self) -> Option<i32>;
}

/// Compute a hash code through the value's `Hash` implementation.
///
/// The value is fed to SeaHash, and the 64-bit digest is folded into 32 bits. This is what the
/// provided `HashCode` implementations use, and it is the easy way to implement `HashCode` for
/// your own key types.
pub fn hash_code_of<T: Hash + ?Sized>(value: &T) -> i32 {
    let mut hasher = SeaHasher::new();
    value.hash(&mut hasher);
    let digest = hasher.finish();

    (digest ^ (digest >> 32)) as i32
}

macro_rules! hash_code_from_hash {
    ($($ty:ty),*) => {
        $(
            impl HashCode for $ty {
                fn hash_code(&self) -> Option<i32> {
                    Some(hash_code_of(self))
                }
            }
        )*
    };
}

hash_code_from_hash!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, bool, char,
                     (), str, String);

impl<T: Hash> HashCode for [T] {
    fn hash_code(&self) -> Option<i32> {
        Some(hash_code_of(self))
    }
}

impl<T: Hash> HashCode for Vec<T> {
    fn hash_code(&self) -> Option<i32> {
        Some(hash_code_of(self))
    }
}

impl<A: Hash, B: Hash> HashCode for (A, B) {
    fn hash_code(&self) -> Option<i32> {
        Some(hash_code_of(self))
    }
}

impl<A: Hash, B: Hash, C: Hash> HashCode for (A, B, C) {
    fn hash_code(&self) -> Option<i32> {
        Some(hash_code_of(self))
    }
}

impl<T: HashCode> HashCode for Option<T> {
    fn hash_code(&self) -> Option<i32> {
        match *self {
            Some(ref x) => x.hash_code(),
            None => None,
        }
    }
}

impl<'a, T: HashCode + ?Sized> HashCode for &'a T {
    fn hash_code(&self) -> Option<i32> {
        (**self).hash_code()
    }
}

impl<T: HashCode + ?Sized> HashCode for Box<T> {
    fn hash_code(&self) -> Option<i32> {
        (**self).hash_code()
    }
}

impl<T: HashCode + ?Sized> HashCode for Rc<T> {
    fn hash_code(&self) -> Option<i32> {
        (**self).hash_code()
    }
}

impl<T: HashCode + ?Sized> HashCode for Arc<T> {
    fn hash_code(&self) -> Option<i32> {
        (**self).hash_code()
    }
}

/// Hash a key.
///
/// The result is always non-negative when read as an `i32`, i.e. less than `2^31`.
pub fn hash<K: HashCode + ?Sized>(key: &K) -> u32 {
    match key.hash_code() {
        Some(code) => {
            let (buf, start) = minimal_bytes(code);
            murmur3_32(&buf[start..], SEED) & 0x7FFF_FFFF
        }
        None => ABSENT,
    }
}

/// Get the bucket of a key in a table with `capacity` buckets.
pub fn bucket_index<K: HashCode + ?Sized>(key: &K, capacity: usize) -> usize {
    hash(key) as usize % capacity
}

/// Encode an integer as its shortest two's complement big-endian representation.
///
/// The encoding is `&buf[start..]`: leading bytes which merely repeat the sign are dropped, but
/// one is kept when the next byte's top bit would otherwise flip the sign. So `0` is `[00]`, `128`
/// is `[00 80]` and `-1` is `[ff]`.
fn minimal_bytes(x: i32) -> ([u8; 4], usize) {
    let buf = [(x >> 24) as u8, (x >> 16) as u8, (x >> 8) as u8, x as u8];

    let mut start = 0;
    while start < 3 {
        let redundant = match buf[start] {
            0x00 => buf[start + 1] & 0x80 == 0,
            0xFF => buf[start + 1] & 0x80 != 0,
            _ => false,
        };

        if !redundant {
            break;
        }
        start += 1;
    }

    (buf, start)
}

/// MurmurHash3, x86 32-bit variant.
pub fn murmur3_32(data: &[u8], seed: u32) -> u32 {
    const C1: u32 = 0xcc9e_2d51;
    const C2: u32 = 0x1b87_3593;

    let mut h = seed;

    let mut blocks = data.chunks_exact(4);
    for block in &mut blocks {
        let k = u32::from_le_bytes([block[0], block[1], block[2], block[3]]);

        h ^= k.wrapping_mul(C1).rotate_left(15).wrapping_mul(C2);
        h = h.rotate_left(13).wrapping_mul(5).wrapping_add(0xe654_6b64);
    }

    let tail = blocks.remainder();
    let mut k = 0u32;
    if tail.len() >= 3 {
        k ^= (tail[2] as u32) << 16;
    }
    if tail.len() >= 2 {
        k ^= (tail[1] as u32) << 8;
    }
    if !tail.is_empty() {
        k ^= tail[0] as u32;
        h ^= k.wrapping_mul(C1).rotate_left(15).wrapping_mul(C2);
    }

    h ^= data.len() as u32;

    // Final avalanche.
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;

    h
}

//! Hash function seam for the hash index.

use std::hash::Hasher;
use std::marker::PhantomData;

use oxbow_common::types::Storable;
use siphasher::sip::SipHasher13;

/// Maps keys to 64-bit hash values.
///
/// The index derives both the bucket and the starting slot from this hash,
/// so implementations must be deterministic across process restarts for
/// the persistent layout to remain readable.
pub trait HashFunction<K>: Send + Sync {
    /// Hashes a key.
    fn hash_key(&self, key: &K) -> u64;
}

/// SipHash-1-3 over the key's encoded bytes, with fixed seeds.
///
/// The seeds are constants (not per-process randomness) so that hash
/// placement is stable across restarts.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultHashFunction<K> {
    _marker: PhantomData<fn(K) -> K>,
}

impl<K> DefaultHashFunction<K> {
    const SEED_K0: u64 = 0x6f78_626f_7768_6173;
    const SEED_K1: u64 = 0x1bd1_1bda_a9fc_1a22;

    /// Creates the hash function.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<K: Storable> HashFunction<K> for DefaultHashFunction<K> {
    fn hash_key(&self, key: &K) -> u64 {
        let mut buf = vec![0u8; K::LEN];
        key.write_to(&mut buf);

        let mut hasher = SipHasher13::new_with_keys(Self::SEED_K0, Self::SEED_K1);
        hasher.write(&buf);
        hasher.finish()
    }
}

/// Hash function that maps integer keys to their own value.
///
/// Bucket placement becomes a direct function of the key, which makes
/// collision behavior predictable; useful for diagnostics and tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityHashFunction;

impl HashFunction<i32> for IdentityHashFunction {
    fn hash_key(&self, key: &i32) -> u64 {
        *key as u32 as u64
    }
}

impl HashFunction<u32> for IdentityHashFunction {
    fn hash_key(&self, key: &u32) -> u64 {
        u64::from(*key)
    }
}

impl HashFunction<i64> for IdentityHashFunction {
    fn hash_key(&self, key: &i64) -> u64 {
        *key as u64
    }
}

impl HashFunction<u64> for IdentityHashFunction {
    fn hash_key(&self, key: &u64) -> u64 {
        *key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxbow_common::types::Key8;

    #[test]
    fn test_default_hash_is_deterministic() {
        let f = DefaultHashFunction::<i32>::new();
        assert_eq!(f.hash_key(&42), f.hash_key(&42));
        assert_ne!(f.hash_key(&42), f.hash_key(&43));
    }

    #[test]
    fn test_default_hash_over_generic_keys() {
        let f = DefaultHashFunction::<Key8>::new();
        let a = Key8::from_bytes(b"alpha");
        let b = Key8::from_bytes(b"bravo");
        assert_ne!(f.hash_key(&a), f.hash_key(&b));
    }

    #[test]
    fn test_identity_hash() {
        let f = IdentityHashFunction;
        assert_eq!(f.hash_key(&7i32), 7);
        assert_eq!(f.hash_key(&7u64), 7);
        // Negative keys map through their unsigned representation.
        assert_eq!(f.hash_key(&-1i32), u64::from(u32::MAX));
    }
}

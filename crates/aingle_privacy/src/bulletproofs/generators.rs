//! Deterministic bulletproof generators
//!
//! Generators are hashed to the curve from a public seed and their index, so a
//! table built for `m` values is a prefix of any larger table from the same
//! seed. [`BulletproofGensStore`] hands out immutable snapshots and grows by
//! swapping in a larger one; callers holding an older snapshot are unaffected.

use std::sync::Arc;

use curve25519_dalek::ristretto::RistrettoPoint;
use parking_lot::RwLock;
use rayon::prelude::*;
use tracing::debug;

use crate::transcript::hash_to_point;
use crate::vector::pad;

/// Bits per range-proof value
pub const MAX_EXP: usize = 64;

/// Immutable generator table for up to `capacity` aggregated values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulletproofGens {
    seed: Vec<u8>,
    capacity: usize,
    g: Vec<RistrettoPoint>,
    h: Vec<RistrettoPoint>,
    u: RistrettoPoint,
}

fn label(seed: &[u8], tag: &[u8]) -> Vec<u8> {
    let mut label = seed.to_vec();
    label.push(b'/');
    label.extend_from_slice(tag);
    label
}

fn derive(seed: &[u8], tag: &[u8], range: std::ops::Range<usize>) -> Vec<RistrettoPoint> {
    let label = label(seed, tag);
    range
        .into_par_iter()
        .map(|i| hash_to_point(&label, i as u64))
        .collect()
}

impl BulletproofGens {
    /// Build a table for `capacity` values (rounded up to a power of two)
    pub fn new(seed: &[u8], capacity: usize) -> Self {
        let capacity = pad(capacity);
        let len = MAX_EXP * capacity;
        Self {
            seed: seed.to_vec(),
            capacity,
            g: derive(seed, b"G", 0..len),
            h: derive(seed, b"H", 0..len),
            u: hash_to_point(&label(seed, b"U"), 0),
        }
    }

    /// A new table holding this one's points followed by freshly derived ones
    pub fn extended(&self, capacity: usize) -> Self {
        let capacity = pad(capacity);
        if capacity <= self.capacity {
            return self.clone();
        }
        let old_len = self.g.len();
        let new_len = MAX_EXP * capacity;

        let mut g = self.g.clone();
        g.extend(derive(&self.seed, b"G", old_len..new_len));
        let mut h = self.h.clone();
        h.extend(derive(&self.seed, b"H", old_len..new_len));

        Self {
            seed: self.seed.clone(),
            capacity,
            g,
            h,
            u: self.u,
        }
    }

    /// Number of values this table can aggregate
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// First `n` G generators
    pub fn g(&self, n: usize) -> &[RistrettoPoint] {
        &self.g[..n.min(self.g.len())]
    }

    /// First `n` H generators
    pub fn h(&self, n: usize) -> &[RistrettoPoint] {
        &self.h[..n.min(self.h.len())]
    }

    /// Auxiliary generator for the inner product term
    pub fn u(&self) -> RistrettoPoint {
        self.u
    }
}

/// Shared, append-only holder of the current generator snapshot
#[derive(Debug)]
pub struct BulletproofGensStore {
    current: RwLock<Arc<BulletproofGens>>,
}

impl BulletproofGensStore {
    /// Store seeded with a table for `initial_capacity` values
    pub fn new(seed: &[u8], initial_capacity: usize) -> Self {
        Self {
            current: RwLock::new(Arc::new(BulletproofGens::new(seed, initial_capacity))),
        }
    }

    /// Current capacity
    pub fn capacity(&self) -> usize {
        self.current.read().capacity()
    }

    /// A snapshot large enough for `m` values, growing the table if needed
    ///
    /// New points are derived with no lock held; the write lock only covers
    /// the swap.
    pub fn get(&self, m: usize) -> Arc<BulletproofGens> {
        let snapshot = Arc::clone(&self.current.read());
        if snapshot.capacity() >= m {
            return snapshot;
        }

        let grown = Arc::new(snapshot.extended(m));
        let mut current = self.current.write();
        // another caller may have swapped in a larger table meanwhile
        if current.capacity() < grown.capacity() {
            debug!(
                from = current.capacity(),
                to = grown.capacity(),
                "growing bulletproof generators"
            );
            *current = grown;
        }
        Arc::clone(&current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_size() {
        let gens = BulletproofGens::new(b"seed", 3);
        assert_eq!(gens.capacity(), 4);
        assert_eq!(gens.g(usize::MAX).len(), 4 * MAX_EXP);
        assert_eq!(gens.h(usize::MAX).len(), 4 * MAX_EXP);
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(BulletproofGens::new(b"seed", 2), BulletproofGens::new(b"seed", 2));
        assert_ne!(
            BulletproofGens::new(b"seed", 1).g(1),
            BulletproofGens::new(b"other", 1).g(1)
        );
    }

    #[test]
    fn test_extension_is_append_only() {
        let small = BulletproofGens::new(b"seed", 1);
        let grown = small.extended(4);
        let fresh = BulletproofGens::new(b"seed", 4);

        assert_eq!(grown, fresh);
        assert_eq!(&grown.g(MAX_EXP)[..], small.g(MAX_EXP));
        assert_eq!(&grown.h(MAX_EXP)[..], small.h(MAX_EXP));
        assert_eq!(grown.u(), small.u());
    }

    #[test]
    fn test_store_growth_keeps_old_snapshots() {
        let store = BulletproofGensStore::new(b"seed", 1);
        let before = store.get(1);
        assert_eq!(before.capacity(), 1);

        let after = store.get(3);
        assert_eq!(after.capacity(), 4);
        assert_eq!(store.capacity(), 4);

        // old snapshot unchanged
        assert_eq!(before.capacity(), 1);
        assert_eq!(before.g(MAX_EXP), &after.g(MAX_EXP)[..]);

        // smaller requests reuse the current table
        assert!(Arc::ptr_eq(&store.get(2), &after));
    }

    #[test]
    fn test_concurrent_growth() {
        let store = Arc::new(BulletproofGensStore::new(b"seed", 1));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.get(8).capacity())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), 8);
        }
        assert_eq!(store.capacity(), 8);
    }

    #[test]
    fn test_growth_from_rayon_workers() {
        let store = BulletproofGensStore::new(b"seed", 1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(2)
            .build()
            .unwrap();
        let grown = pool.install(|| {
            (1..=16usize)
                .into_par_iter()
                .all(|m| store.get(m).capacity() >= m)
        });
        assert!(grown);
        assert_eq!(store.capacity(), 16);
    }
}

//! Access to published coin commitments
//!
//! Verification needs exactly two lookups from ledger state, expressed by
//! [`CommitmentLedger`]. [`InMemoryLedger`] implements it for tests and for
//! embedding the engine without a database.

use std::collections::HashMap;

use curve25519_dalek::ristretto::RistrettoPoint;
use parking_lot::RwLock;
use rand::{rngs::OsRng, seq::index::sample, Rng};
use serde::{Deserialize, Serialize};

use crate::error::{PrivacyError, Result};

/// Identifier of the asset a coin is denominated in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AssetId(pub [u8; 32]);

impl AssetId {
    /// The chain's native asset
    pub const NATIVE: AssetId = AssetId([0u8; 32]);

    /// Hex form for logs
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// Read-only view of the commitments published for each asset and shard
pub trait CommitmentLedger {
    /// Commitment stored at `index`
    fn commitment_by_index(
        &self,
        asset: &AssetId,
        index: u64,
        shard_id: u8,
    ) -> Result<RistrettoPoint>;

    /// Index at which `commitment` is stored
    fn commitment_index(
        &self,
        asset: &AssetId,
        commitment: &RistrettoPoint,
        shard_id: u8,
    ) -> Result<u64>;
}

/// Commitments sampled from the ledger for one spent coin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampledRing {
    /// Ledger index of each member
    pub indices: Vec<u64>,
    /// Member commitments in the same order
    pub commitments: Vec<RistrettoPoint>,
    /// Position of the spent coin in the ring
    pub position: usize,
}

#[derive(Debug, Default)]
struct ShardCommitments {
    list: Vec<RistrettoPoint>,
    index: HashMap<[u8; 32], u64>,
}

/// Commitment ledger held in memory
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    shards: RwLock<HashMap<(AssetId, u8), ShardCommitments>>,
}

impl InMemoryLedger {
    /// Empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a commitment and return its index
    pub fn insert(&self, asset: &AssetId, shard_id: u8, commitment: RistrettoPoint) -> u64 {
        let mut shards = self.shards.write();
        let shard = shards.entry((*asset, shard_id)).or_default();
        let index = shard.list.len() as u64;
        shard.list.push(commitment);
        shard
            .index
            .entry(commitment.compress().to_bytes())
            .or_insert(index);
        index
    }

    /// Number of commitments for an asset and shard
    pub fn len(&self, asset: &AssetId, shard_id: u8) -> usize {
        self.shards
            .read()
            .get(&(*asset, shard_id))
            .map_or(0, |s| s.list.len())
    }

    /// True if nothing is stored for an asset and shard
    pub fn is_empty(&self, asset: &AssetId, shard_id: u8) -> bool {
        self.len(asset, shard_id) == 0
    }

    /// Pick `ring_size - 1` random decoys around the commitment at
    /// `real_index`, placing it at a random position
    pub fn sample_ring(
        &self,
        asset: &AssetId,
        shard_id: u8,
        real_index: u64,
        ring_size: usize,
    ) -> Result<SampledRing> {
        let shards = self.shards.read();
        let shard = shards.get(&(*asset, shard_id)).ok_or_else(|| {
            PrivacyError::Ledger(format!("no commitments for shard {}", shard_id))
        })?;
        let len = shard.list.len();
        if (real_index as usize) >= len {
            return Err(PrivacyError::Ledger(format!(
                "index {} beyond {} commitments",
                real_index, len
            )));
        }
        if len < ring_size {
            return Err(PrivacyError::Ledger(format!(
                "{} commitments cannot fill a ring of {}",
                len, ring_size
            )));
        }

        let mut rng = OsRng;
        let position = rng.gen_range(0..ring_size);
        let mut decoys = sample(&mut rng, len, ring_size)
            .into_iter()
            .filter(|i| *i as u64 != real_index)
            .take(ring_size - 1);

        let mut indices = Vec::with_capacity(ring_size);
        for slot in 0..ring_size {
            if slot == position {
                indices.push(real_index);
            } else {
                let decoy = decoys
                    .next()
                    .ok_or_else(|| PrivacyError::Ledger("ran out of decoys".into()))?;
                indices.push(decoy as u64);
            }
        }
        let commitments = indices.iter().map(|i| shard.list[*i as usize]).collect();
        Ok(SampledRing {
            indices,
            commitments,
            position,
        })
    }
}

impl CommitmentLedger for InMemoryLedger {
    fn commitment_by_index(
        &self,
        asset: &AssetId,
        index: u64,
        shard_id: u8,
    ) -> Result<RistrettoPoint> {
        self.shards
            .read()
            .get(&(*asset, shard_id))
            .and_then(|s| s.list.get(index as usize).copied())
            .ok_or_else(|| {
                PrivacyError::Ledger(format!(
                    "no commitment at index {} for asset {} shard {}",
                    index,
                    asset.to_hex(),
                    shard_id
                ))
            })
    }

    fn commitment_index(
        &self,
        asset: &AssetId,
        commitment: &RistrettoPoint,
        shard_id: u8,
    ) -> Result<u64> {
        self.shards
            .read()
            .get(&(*asset, shard_id))
            .and_then(|s| s.index.get(commitment.compress().as_bytes()).copied())
            .ok_or_else(|| {
                PrivacyError::Ledger(format!(
                    "unknown commitment for asset {} shard {}",
                    asset.to_hex(),
                    shard_id
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn filled(n: usize) -> InMemoryLedger {
        let ledger = InMemoryLedger::new();
        for _ in 0..n {
            ledger.insert(&AssetId::NATIVE, 0, RistrettoPoint::random(&mut OsRng));
        }
        ledger
    }

    #[test]
    fn test_lookups() {
        let ledger = InMemoryLedger::new();
        let c = RistrettoPoint::random(&mut OsRng);
        ledger.insert(&AssetId::NATIVE, 1, RistrettoPoint::random(&mut OsRng));
        let index = ledger.insert(&AssetId::NATIVE, 1, c);
        assert_eq!(index, 1);
        assert_eq!(ledger.commitment_by_index(&AssetId::NATIVE, 1, 1).unwrap(), c);
        assert_eq!(ledger.commitment_index(&AssetId::NATIVE, &c, 1).unwrap(), 1);
    }

    #[test]
    fn test_shards_and_assets_are_separate() {
        let ledger = filled(3);
        assert!(ledger.commitment_by_index(&AssetId::NATIVE, 0, 1).is_err());
        assert!(ledger.commitment_by_index(&AssetId([1u8; 32]), 0, 0).is_err());
        assert_eq!(ledger.len(&AssetId::NATIVE, 0), 3);
        assert!(ledger.is_empty(&AssetId::NATIVE, 5));
    }

    #[test]
    fn test_sample_ring() {
        let ledger = filled(20);
        let ring = ledger.sample_ring(&AssetId::NATIVE, 0, 13, 8).unwrap();
        assert_eq!(ring.indices.len(), 8);
        assert_eq!(ring.indices[ring.position], 13);
        let unique: HashSet<u64> = ring.indices.iter().copied().collect();
        assert_eq!(unique.len(), 8);
        for (index, commitment) in ring.indices.iter().zip(ring.commitments.iter()) {
            assert_eq!(
                ledger.commitment_by_index(&AssetId::NATIVE, *index, 0).unwrap(),
                *commitment
            );
        }
    }

    #[test]
    fn test_sample_ring_too_small() {
        let ledger = filled(5);
        assert!(ledger.sample_ring(&AssetId::NATIVE, 0, 1, 8).is_err());
        assert!(ledger.sample_ring(&AssetId::NATIVE, 0, 9, 4).is_err());
        assert!(ledger.sample_ring(&AssetId::NATIVE, 3, 0, 4).is_err());
    }
}

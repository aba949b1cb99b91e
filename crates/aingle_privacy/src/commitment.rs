//! Pedersen commitments over an indexed generator set
//!
//! Every coin field is committed against its own generator, with a shared
//! blinding generator:
//!
//! `CommitAtIndex(v, r, i) = v*G_i + r*G_rand`
//!
//! Commitments at the same index are additively homomorphic:
//! `Commit(a, ra) + Commit(b, rb) = Commit(a + b, ra + rb)`.

use curve25519_dalek::{
    constants::RISTRETTO_BASEPOINT_POINT,
    ristretto::RistrettoPoint,
    scalar::Scalar,
    traits::{Identity, MultiscalarMul},
};

use crate::error::{PrivacyError, Result};
use crate::transcript::hash_to_point;

/// Number of generators in the Pedersen table
pub const GENERATOR_COUNT: usize = 5;

const GENERATOR_LABEL: &[u8] = b"aingle_privacy_pedersen";

/// Semantic slot of a generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeneratorIndex {
    /// Secret key (also the base of public keys and serial numbers)
    SecretKey = 0,
    /// Coin value
    Value = 1,
    /// Serial number derivator
    Snd = 2,
    /// Shard id
    ShardId = 3,
    /// Blinding randomness
    Randomness = 4,
}

impl GeneratorIndex {
    /// All slots in table order
    pub const ALL: [GeneratorIndex; GENERATOR_COUNT] = [
        Self::SecretKey,
        Self::Value,
        Self::Snd,
        Self::ShardId,
        Self::Randomness,
    ];

    /// Position in the generator table
    pub fn as_usize(self) -> usize {
        self as usize
    }
}

impl TryFrom<usize> for GeneratorIndex {
    type Error = PrivacyError;

    fn try_from(index: usize) -> Result<Self> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or(PrivacyError::GeneratorIndex(index))
    }
}

/// Fixed Pedersen generator table
///
/// `G_sk` is the Ristretto basepoint; every other generator is hashed to the
/// curve from a public label so no discrete-log relation is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PedersenGens {
    generators: [RistrettoPoint; GENERATOR_COUNT],
}

impl Default for PedersenGens {
    fn default() -> Self {
        Self::new()
    }
}

impl PedersenGens {
    /// Derive the generator table
    pub fn new() -> Self {
        let mut generators = [RistrettoPoint::identity(); GENERATOR_COUNT];
        generators[0] = RISTRETTO_BASEPOINT_POINT;
        for (i, g) in generators.iter_mut().enumerate().skip(1) {
            *g = hash_to_point(GENERATOR_LABEL, i as u64);
        }
        Self { generators }
    }

    /// Generator for a slot
    pub fn generator(&self, index: GeneratorIndex) -> RistrettoPoint {
        self.generators[index.as_usize()]
    }

    /// Generator by raw table position
    pub fn get(&self, index: usize) -> Result<RistrettoPoint> {
        self.generators
            .get(index)
            .copied()
            .ok_or(PrivacyError::GeneratorIndex(index))
    }

    /// The blinding generator `G_rand`
    pub fn blinding(&self) -> RistrettoPoint {
        self.generator(GeneratorIndex::Randomness)
    }

    /// The whole table in slot order
    pub fn as_slice(&self) -> &[RistrettoPoint] {
        &self.generators
    }

    /// `value*G_index + blind*G_rand`
    pub fn commit_at_index(
        &self,
        value: &Scalar,
        blind: &Scalar,
        index: GeneratorIndex,
    ) -> RistrettoPoint {
        RistrettoPoint::multiscalar_mul([*value, *blind], [self.generator(index), self.blinding()])
    }

    /// Same as [`commit_at_index`](Self::commit_at_index) for a raw table position
    pub fn commit_at(&self, value: &Scalar, blind: &Scalar, index: usize) -> Result<RistrettoPoint> {
        let index = GeneratorIndex::try_from(index)?;
        Ok(self.commit_at_index(value, blind, index))
    }

    /// Commit to one opening per generator: `Σ openings_i * G_i`
    pub fn commit_all(&self, openings: &[Scalar; GENERATOR_COUNT]) -> RistrettoPoint {
        RistrettoPoint::multiscalar_mul(openings.iter(), self.generators.iter())
    }

    /// Verify that `commitment` opens to `(value, blind)` at `index`
    pub fn verify_opening(
        &self,
        commitment: &RistrettoPoint,
        value: &Scalar,
        blind: &Scalar,
        index: GeneratorIndex,
    ) -> bool {
        *commitment == self.commit_at_index(value, blind, index)
    }
}

/// Homomorphic sum of commitments
pub fn sum_commitments<'a>(commitments: impl IntoIterator<Item = &'a RistrettoPoint>) -> RistrettoPoint {
    commitments
        .into_iter()
        .fold(RistrettoPoint::identity(), |acc, c| acc + c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn test_generators_distinct() {
        let gens = PedersenGens::new();
        let slice = gens.as_slice();
        for i in 0..GENERATOR_COUNT {
            for j in (i + 1)..GENERATOR_COUNT {
                assert_ne!(slice[i], slice[j]);
            }
        }
        assert_eq!(gens.generator(GeneratorIndex::SecretKey), RISTRETTO_BASEPOINT_POINT);
    }

    #[test]
    fn test_generators_deterministic() {
        assert_eq!(PedersenGens::new(), PedersenGens::new());
    }

    #[test]
    fn test_homomorphic_addition() {
        let gens = PedersenGens::new();
        let (a, ra) = (Scalar::random(&mut OsRng), Scalar::random(&mut OsRng));
        let (b, rb) = (Scalar::random(&mut OsRng), Scalar::random(&mut OsRng));

        for index in GeneratorIndex::ALL {
            let ca = gens.commit_at_index(&a, &ra, index);
            let cb = gens.commit_at_index(&b, &rb, index);
            let sum = gens.commit_at_index(&(a + b), &(ra + rb), index);
            assert_eq!(ca + cb, sum);
        }
    }

    #[test]
    fn test_rejects_out_of_range_index() {
        let gens = PedersenGens::new();
        let one = Scalar::ONE;
        assert!(matches!(
            gens.commit_at(&one, &one, GENERATOR_COUNT),
            Err(PrivacyError::GeneratorIndex(5))
        ));
        assert!(gens.get(99).is_err());
        assert!(gens.commit_at(&one, &one, 1).is_ok());
    }

    #[test]
    fn test_commit_all_matches_sum() {
        let gens = PedersenGens::new();
        let openings = [
            Scalar::from(1u64),
            Scalar::from(2u64),
            Scalar::from(3u64),
            Scalar::from(4u64),
            Scalar::from(5u64),
        ];
        let expected = sum_commitments(
            &gens
                .as_slice()
                .iter()
                .zip(openings.iter())
                .map(|(g, s)| g * s)
                .collect::<Vec<_>>(),
        );
        assert_eq!(gens.commit_all(&openings), expected);
    }

    #[test]
    fn test_verify_opening() {
        let gens = PedersenGens::new();
        let v = Scalar::from(42u64);
        let r = Scalar::random(&mut OsRng);
        let c = gens.commit_at_index(&v, &r, GeneratorIndex::Value);
        assert!(gens.verify_opening(&c, &v, &r, GeneratorIndex::Value));
        assert!(!gens.verify_opening(&c, &Scalar::from(43u64), &r, GeneratorIndex::Value));
    }
}

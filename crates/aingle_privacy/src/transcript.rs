//! Fiat-Shamir helpers
//!
//! The range proof and inner product argument run over a merlin [`Transcript`];
//! the sigma protocols (one-out-of-many, serial number proofs) hash their
//! transcript with SHA-512 through [`ChallengeHasher`]

use curve25519_dalek::{
    ristretto::{CompressedRistretto, RistrettoPoint},
    scalar::Scalar,
};
use merlin::Transcript;
use sha2::{Digest, Sha512};

/// Protocol-specific operations on a merlin transcript
pub trait TranscriptProtocol {
    /// Domain separator for an aggregated range proof over `m` values of `n` bits
    fn rangeproof_domain_sep(&mut self, n: u64, m: u64);
    /// Domain separator for an inner product argument of length `n`
    fn innerproduct_domain_sep(&mut self, n: u64);
    /// Append a compressed point
    fn append_point(&mut self, label: &'static [u8], point: &CompressedRistretto);
    /// Append a scalar
    fn append_scalar(&mut self, label: &'static [u8], scalar: &Scalar);
    /// Draw a challenge scalar
    fn challenge_scalar(&mut self, label: &'static [u8]) -> Scalar;
}

impl TranscriptProtocol for Transcript {
    fn rangeproof_domain_sep(&mut self, n: u64, m: u64) {
        self.append_message(b"dom-sep", b"aggregated-rangeproof v1");
        self.append_u64(b"n", n);
        self.append_u64(b"m", m);
    }

    fn innerproduct_domain_sep(&mut self, n: u64) {
        self.append_message(b"dom-sep", b"ipp v1");
        self.append_u64(b"n", n);
    }

    fn append_point(&mut self, label: &'static [u8], point: &CompressedRistretto) {
        self.append_message(label, point.as_bytes());
    }

    fn append_scalar(&mut self, label: &'static [u8], scalar: &Scalar) {
        self.append_message(label, scalar.as_bytes());
    }

    fn challenge_scalar(&mut self, label: &'static [u8]) -> Scalar {
        let mut buf = [0u8; 64];
        self.challenge_bytes(label, &mut buf);
        Scalar::from_bytes_mod_order_wide(&buf)
    }
}

/// Map a label and index to a curve point with no known discrete log
pub fn hash_to_point(label: &[u8], index: u64) -> RistrettoPoint {
    let mut hasher = Sha512::new();
    hasher.update(label);
    hasher.update(index.to_le_bytes());
    RistrettoPoint::from_uniform_bytes(&hasher.finalize().into())
}

/// Incremental SHA-512 challenge over points and scalars
#[derive(Clone)]
pub struct ChallengeHasher {
    hasher: Sha512,
}

impl ChallengeHasher {
    /// Start a challenge under a domain label
    pub fn new(domain: &[u8]) -> Self {
        let mut hasher = Sha512::new();
        hasher.update((domain.len() as u64).to_le_bytes());
        hasher.update(domain);
        Self { hasher }
    }

    /// Absorb a point
    pub fn point(mut self, point: &RistrettoPoint) -> Self {
        self.hasher.update(point.compress().as_bytes());
        self
    }

    /// Absorb a list of points
    pub fn points<'a>(mut self, points: impl IntoIterator<Item = &'a RistrettoPoint>) -> Self {
        for point in points {
            self.hasher.update(point.compress().as_bytes());
        }
        self
    }

    /// Absorb a scalar
    pub fn scalar(mut self, scalar: &Scalar) -> Self {
        self.hasher.update(scalar.as_bytes());
        self
    }

    /// Finish and reduce to a scalar
    pub fn finish(self) -> Scalar {
        let digest: [u8; 64] = self.hasher.finalize().into();
        Scalar::from_bytes_mod_order_wide(&digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_challenges_are_deterministic() {
        let mut t1 = Transcript::new(b"test");
        let mut t2 = Transcript::new(b"test");
        t1.append_scalar(b"s", &Scalar::from(7u64));
        t2.append_scalar(b"s", &Scalar::from(7u64));
        assert_eq!(t1.challenge_scalar(b"x"), t2.challenge_scalar(b"x"));
    }

    #[test]
    fn test_transcript_binds_messages() {
        let mut t1 = Transcript::new(b"test");
        let mut t2 = Transcript::new(b"test");
        t1.append_scalar(b"s", &Scalar::from(7u64));
        t2.append_scalar(b"s", &Scalar::from(8u64));
        assert_ne!(t1.challenge_scalar(b"x"), t2.challenge_scalar(b"x"));
    }

    #[test]
    fn test_hash_to_point_distinct_indices() {
        let a = hash_to_point(b"label", 0);
        let b = hash_to_point(b"label", 1);
        assert_ne!(a, b);
        assert_eq!(a, hash_to_point(b"label", 0));
    }

    #[test]
    fn test_challenge_hasher_domain_separation() {
        let p = hash_to_point(b"p", 0);
        let x1 = ChallengeHasher::new(b"one").point(&p).finish();
        let x2 = ChallengeHasher::new(b"two").point(&p).finish();
        assert_ne!(x1, x2);
        assert_eq!(x1, ChallengeHasher::new(b"one").point(&p).finish());
    }
}

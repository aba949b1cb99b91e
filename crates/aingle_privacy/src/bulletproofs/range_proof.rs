//! Aggregated 64-bit range proofs
//!
//! Proves that each of `m` committed values `V_j = v_j*G_value + γ_j*G_rand`
//! lies in `[0, 2^64)`. The value count is padded to `m' = pad(m)` with
//! zero-value, zero-blind entries whose commitments are the identity.
//!
//! ## Protocol
//!
//! ```text
//! A  = α*h + <aL, G> + <aR, H>          aL = bits(v), aR = aL - 1
//! S  = ρ*h + <sL, G> + <sR, H>
//! y, z  <- transcript(A, S)
//! l(X) = aL - z + sL*X
//! r(X) = y^nm ∘ (aR + z + sR*X) + z^(2+j) * 2^n   (per block j)
//! T1 = t1*G_value + τ1*h,  T2 = t2*G_value + τ2*h
//! x  <- transcript(T1, T2)
//! τx = τ2*x² + τ1*x + Σ z^(2+j)*γ_j,   μ = α + ρ*x
//! ```
//!
//! The verifier checks
//! `tHat*G_value + τx*h == Σ z^(2+j)*V_j + δ(y,z)*G_value + x*T1 + x²*T2`
//! and then the inner product argument for `(l, r)` on `(G, H')` with
//! `H'_i = y^-i * H_i`.

use curve25519_dalek::{
    ristretto::RistrettoPoint,
    scalar::Scalar,
    traits::{Identity, MultiscalarMul, VartimeMultiscalarMul},
};
use merlin::Transcript;
use rand::rngs::OsRng;
use rayon::prelude::*;
use tracing::{debug, trace};

use super::generators::MAX_EXP;
use super::inner_product::InnerProductProof;
use crate::commitment::GeneratorIndex;
use crate::encoding::{count_u8, ByteReader, ByteWriter, POINT_SIZE, SCALAR_SIZE};
use crate::error::{PrivacyError, Result};
use crate::params::PrivacyParams;
use crate::transcript::TranscriptProtocol;
use crate::vector::{
    add_scalar, add_vectors, hadamard, inner_product, pad, power_vector, scale_points,
    scale_vector, sum_of_powers, to_bits,
};

const TRANSCRIPT_LABEL: &[u8] = b"aingle_privacy_range_proof";

/// Values and blinding factors to prove in range
#[derive(Clone)]
pub struct AggregatedRangeWitness {
    values: Vec<u64>,
    blinds: Vec<Scalar>,
}

impl std::fmt::Debug for AggregatedRangeWitness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregatedRangeWitness")
            .field("count", &self.values.len())
            .finish_non_exhaustive()
    }
}

/// Aggregated range proof over `m` value commitments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedRangeProof {
    commitments: Vec<RistrettoPoint>,
    a: RistrettoPoint,
    s: RistrettoPoint,
    t1: RistrettoPoint,
    t2: RistrettoPoint,
    tau_x: Scalar,
    t_hat: Scalar,
    mu: Scalar,
    ipp: InnerProductProof,
}

/// `z^(2+j) * 2^i` laid out block by block
fn z_two_vector(z: &Scalar, m: usize) -> Vec<Scalar> {
    let two_n = power_vector(&Scalar::from(2u64), MAX_EXP);
    let z_sq = z * z;
    (0..m)
        .flat_map(|j| {
            let zj = z_sq * power_of(z, j);
            two_n.iter().map(move |p| zj * p).collect::<Vec<_>>()
        })
        .collect()
}

fn power_of(base: &Scalar, exp: usize) -> Scalar {
    let mut acc = Scalar::ONE;
    for _ in 0..exp {
        acc *= base;
    }
    acc
}

/// `δ(y, z) = (z - z²)*<1, y^nm> - Σ_j z^(3+j)*<1, 2^n>`
fn delta(y: &Scalar, z: &Scalar, m: usize) -> Scalar {
    let nm = MAX_EXP * m;
    let z_sq = z * z;
    let sum_two = Scalar::from(u64::MAX);
    let sum_z: Scalar = (0..m).map(|j| z_sq * z * power_of(z, j)).sum();
    (z - z_sq) * sum_of_powers(y, nm) - sum_z * sum_two
}

/// Absorb the context, the commitments, `A` and `S`, and draw `(y, z)`
fn challenges(
    transcript: &mut Transcript,
    context: &[u8],
    commitments: &[RistrettoPoint],
    m: usize,
    a: &RistrettoPoint,
    s: &RistrettoPoint,
) -> (Scalar, Scalar) {
    transcript.rangeproof_domain_sep(MAX_EXP as u64, m as u64);
    transcript.append_message(b"context", context);
    for j in 0..m {
        let v = commitments
            .get(j)
            .copied()
            .unwrap_or_else(RistrettoPoint::identity);
        transcript.append_point(b"V", &v.compress());
    }
    transcript.append_point(b"A", &a.compress());
    transcript.append_point(b"S", &s.compress());
    let y = transcript.challenge_scalar(b"y");
    let z = transcript.challenge_scalar(b"z");
    (y, z)
}

impl AggregatedRangeWitness {
    /// Pair each value with its blinding factor
    pub fn new(values: Vec<u64>, blinds: Vec<Scalar>) -> Result<Self> {
        if values.is_empty() {
            return Err(PrivacyError::InvalidWitness(
                "range witness needs at least one value".into(),
            ));
        }
        if values.len() != blinds.len() {
            return Err(PrivacyError::InvalidWitness(format!(
                "{} values but {} blinding factors",
                values.len(),
                blinds.len()
            )));
        }
        Ok(Self { values, blinds })
    }

    /// Number of values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false; a witness holds at least one value
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Build the aggregated proof
    pub fn prove(&self, params: &PrivacyParams) -> Result<AggregatedRangeProof> {
        self.prove_with_context(params, &[])
    }

    /// Build the aggregated proof with `context` absorbed into every challenge
    ///
    /// The proof only verifies under the same context bytes.
    pub fn prove_with_context(
        &self,
        params: &PrivacyParams,
        context: &[u8],
    ) -> Result<AggregatedRangeProof> {
        let m = self.values.len();
        let bp_gens = params.bulletproof_gens(m)?;
        let pc = params.pedersen();
        let h_blind = pc.blinding();

        let mp = pad(m);
        let nm = MAX_EXP * mp;
        let g = bp_gens.g(nm);
        let h = bp_gens.h(nm);

        let mut values = self.values.clone();
        values.resize(mp, 0);
        let mut blinds = self.blinds.clone();
        blinds.resize(mp, Scalar::ZERO);

        let commitments: Vec<RistrettoPoint> = values[..m]
            .iter()
            .zip(blinds.iter())
            .map(|(v, r)| pc.commit_at_index(&Scalar::from(*v), r, GeneratorIndex::Value))
            .collect();

        let a_l: Vec<Scalar> = values.iter().flat_map(|v| to_bits(*v, MAX_EXP)).collect();
        let a_r = add_scalar(&a_l, &-Scalar::ONE);

        let mut rng = OsRng;
        let alpha = Scalar::random(&mut rng);
        let rho = Scalar::random(&mut rng);
        let s_l: Vec<Scalar> = (0..nm).map(|_| Scalar::random(&mut rng)).collect();
        let s_r: Vec<Scalar> = (0..nm).map(|_| Scalar::random(&mut rng)).collect();

        let a_point = RistrettoPoint::multiscalar_mul(
            std::iter::once(&alpha).chain(a_l.iter()).chain(a_r.iter()),
            std::iter::once(&h_blind).chain(g.iter()).chain(h.iter()),
        );
        let s_point = RistrettoPoint::multiscalar_mul(
            std::iter::once(&rho).chain(s_l.iter()).chain(s_r.iter()),
            std::iter::once(&h_blind).chain(g.iter()).chain(h.iter()),
        );

        let mut transcript = Transcript::new(TRANSCRIPT_LABEL);
        let (y, z) = challenges(
            &mut transcript,
            context,
            &commitments,
            mp,
            &a_point,
            &s_point,
        );

        let y_n = power_vector(&y, nm);
        let z_two = z_two_vector(&z, mp);

        // l(X) = l0 + l1*X, r(X) = r0 + r1*X
        let l0 = add_scalar(&a_l, &-z);
        let l1 = s_l;
        let r0 = add_vectors(&hadamard(&y_n, &add_scalar(&a_r, &z))?, &z_two)?;
        let r1 = hadamard(&y_n, &s_r)?;

        let t1 = inner_product(&l0, &r1)? + inner_product(&l1, &r0)?;
        let t2 = inner_product(&l1, &r1)?;

        let tau1 = Scalar::random(&mut rng);
        let tau2 = Scalar::random(&mut rng);
        let t1_point = pc.commit_at_index(&t1, &tau1, GeneratorIndex::Value);
        let t2_point = pc.commit_at_index(&t2, &tau2, GeneratorIndex::Value);

        transcript.append_point(b"T1", &t1_point.compress());
        transcript.append_point(b"T2", &t2_point.compress());
        let x = transcript.challenge_scalar(b"x");

        let l = add_vectors(&l0, &scale_vector(&l1, &x))?;
        let r = add_vectors(&r0, &scale_vector(&r1, &x))?;
        let t_hat = inner_product(&l, &r)?;

        let z_sq = z * z;
        let blind_sum: Scalar = blinds
            .iter()
            .enumerate()
            .map(|(j, gamma)| z_sq * power_of(&z, j) * gamma)
            .sum();
        let tau_x = tau2 * x * x + tau1 * x + blind_sum;
        let mu = alpha + rho * x;

        transcript.append_scalar(b"tau_x", &tau_x);
        transcript.append_scalar(b"t_hat", &t_hat);
        transcript.append_scalar(b"mu", &mu);
        let w = transcript.challenge_scalar(b"w");
        let u = bp_gens.u() * w;

        let y_inv_n = power_vector(&y.invert(), nm);
        let h_prime = scale_points(h, &y_inv_n)?;

        let ipp = InnerProductProof::prove(&mut transcript, g, &h_prime, &u, &l, &r)?;
        trace!(values = m, padded = mp, "range proof built");

        Ok(AggregatedRangeProof {
            commitments,
            a: a_point,
            s: s_point,
            t1: t1_point,
            t2: t2_point,
            tau_x,
            t_hat,
            mu,
            ipp,
        })
    }
}

impl AggregatedRangeProof {
    /// The value commitments this proof is about, in witness order
    pub fn commitments(&self) -> &[RistrettoPoint] {
        &self.commitments
    }

    /// Verify the proof
    ///
    /// Returns `Ok(false)` when an equation fails and `Err` when the proof's
    /// shape is unusable (no values, or more than the configured maximum).
    pub fn verify(&self, params: &PrivacyParams) -> Result<bool> {
        self.verify_with_context(params, &[])
    }

    /// Verify a proof built by [`AggregatedRangeWitness::prove_with_context`]
    pub fn verify_with_context(&self, params: &PrivacyParams, context: &[u8]) -> Result<bool> {
        let m = self.commitments.len();
        let bp_gens = params.bulletproof_gens(m)?;
        let pc = params.pedersen();
        let h_blind = pc.blinding();
        let g_value = pc.generator(GeneratorIndex::Value);

        let mp = pad(m);
        let nm = MAX_EXP * mp;
        let g = bp_gens.g(nm);
        let h = bp_gens.h(nm);

        let mut transcript = Transcript::new(TRANSCRIPT_LABEL);
        let (y, z) = challenges(
            &mut transcript,
            context,
            &self.commitments,
            mp,
            &self.a,
            &self.s,
        );
        transcript.append_point(b"T1", &self.t1.compress());
        transcript.append_point(b"T2", &self.t2.compress());
        let x = transcript.challenge_scalar(b"x");
        transcript.append_scalar(b"tau_x", &self.tau_x);
        transcript.append_scalar(b"t_hat", &self.t_hat);
        transcript.append_scalar(b"mu", &self.mu);
        let w = transcript.challenge_scalar(b"w");

        // tHat*G + τx*h == Σ z^(2+j)*V_j + δ*G + x*T1 + x²*T2
        let z_sq = z * z;
        let z_weights: Vec<Scalar> = (0..m).map(|j| z_sq * power_of(&z, j)).collect();
        let lhs = pc.commit_at_index(&self.t_hat, &self.tau_x, GeneratorIndex::Value);
        let rhs = RistrettoPoint::vartime_multiscalar_mul(
            z_weights
                .iter()
                .copied()
                .chain([delta(&y, &z, mp), x, x * x]),
            self.commitments
                .iter()
                .copied()
                .chain([g_value, self.t1, self.t2]),
        );
        if lhs != rhs {
            debug!("range proof polynomial check failed");
            return Ok(false);
        }

        let y_inv_n = power_vector(&y.invert(), nm);
        let h_prime = scale_points(h, &y_inv_n)?;
        let u = bp_gens.u() * w;

        // P = A + x*S - z*<1,G> + <z*y^nm + z_two, H'> - μ*h + tHat*U
        let h_weights = add_vectors(&scale_vector(&power_vector(&y, nm), &z), &z_two_vector(&z, mp))?;
        let neg_z = -z;
        let p = RistrettoPoint::vartime_multiscalar_mul(
            [Scalar::ONE, x, -self.mu, self.t_hat]
                .into_iter()
                .chain(std::iter::repeat(neg_z).take(nm))
                .chain(h_weights),
            [self.a, self.s, h_blind, u]
                .into_iter()
                .chain(g.iter().copied())
                .chain(h_prime.iter().copied()),
        );

        Ok(self.ipp.verify(&mut transcript, g, &h_prime, &u, &p))
    }

    /// Verify many proofs on the rayon pool
    pub fn verify_batch(proofs: &[AggregatedRangeProof], params: &PrivacyParams) -> Vec<bool> {
        proofs
            .par_iter()
            .map(|proof| proof.verify(params).unwrap_or(false))
            .collect()
    }

    /// Encoded size in bytes
    pub fn serialized_size(&self) -> usize {
        1 + (self.commitments.len() + 4) * POINT_SIZE + 3 * SCALAR_SIZE + self.ipp.serialized_size()
    }

    /// Serialize: `m`, `V_j`, `A, S, T1, T2`, `τx, tHat, μ`, inner product proof
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut w = ByteWriter::with_capacity(self.serialized_size());
        w.write_u8(count_u8(self.commitments.len(), "range commitments")?);
        w.write_points(&self.commitments);
        w.write_points(&[self.a, self.s, self.t1, self.t2]);
        w.write_scalars(&[self.tau_x, self.t_hat, self.mu]);
        self.ipp.write_to(&mut w);
        Ok(w.into_bytes())
    }

    /// Deserialize from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(bytes);
        let m = reader.read_u8()? as usize;
        if m == 0 {
            return Err(PrivacyError::Decode("range proof without commitments".into()));
        }
        let commitments = reader.read_points(m)?;
        let a = reader.read_point()?;
        let s = reader.read_point()?;
        let t1 = reader.read_point()?;
        let t2 = reader.read_point()?;
        let tau_x = reader.read_scalar()?;
        let t_hat = reader.read_scalar()?;
        let mu = reader.read_scalar()?;
        let ipp = InnerProductProof::read_from(&mut reader)?;
        reader.finish()?;
        Ok(Self {
            commitments,
            a,
            s,
            t1,
            t2,
            tau_x,
            t_hat,
            mu,
            ipp,
        })
    }

    #[cfg(test)]
    pub(crate) fn commitments_mut(&mut self) -> &mut Vec<RistrettoPoint> {
        &mut self.commitments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PrivacyConfig;
    use pretty_assertions::assert_eq;

    fn params() -> &'static PrivacyParams {
        PrivacyParams::global()
    }

    fn random_blinds(n: usize) -> Vec<Scalar> {
        (0..n).map(|_| Scalar::random(&mut OsRng)).collect()
    }

    fn prove(values: &[u64]) -> AggregatedRangeProof {
        let witness =
            AggregatedRangeWitness::new(values.to_vec(), random_blinds(values.len())).unwrap();
        witness.prove(params()).unwrap()
    }

    #[test]
    fn test_single_value() {
        let proof = prove(&[42]);
        assert!(proof.verify(params()).unwrap());
    }

    #[test]
    fn test_boundaries() {
        assert!(prove(&[0]).verify(params()).unwrap());
        assert!(prove(&[u64::MAX]).verify(params()).unwrap());
        assert!(prove(&[0, u64::MAX]).verify(params()).unwrap());
    }

    #[test]
    fn test_aggregated_with_padding() {
        for values in [vec![1u64, 2], vec![5, 6, 7], vec![10, 20, 30, 40, 50]] {
            let proof = prove(&values);
            assert_eq!(proof.commitments().len(), values.len());
            assert!(proof.verify(params()).unwrap());
        }
    }

    #[test]
    fn test_commitments_open_to_values() {
        let blinds = random_blinds(2);
        let witness = AggregatedRangeWitness::new(vec![3, 9], blinds.clone()).unwrap();
        let proof = witness.prove(params()).unwrap();
        let pc = params().pedersen();
        assert!(pc.verify_opening(
            &proof.commitments()[1],
            &Scalar::from(9u64),
            &blinds[1],
            GeneratorIndex::Value
        ));
    }

    #[test]
    fn test_out_of_range_commitment_rejected() {
        // same proof, commitment swapped for v + 2^64
        let blinds = random_blinds(1);
        let witness = AggregatedRangeWitness::new(vec![7], blinds.clone()).unwrap();
        let mut proof = witness.prove(params()).unwrap();

        let two_64 = Scalar::from(u64::MAX) + Scalar::ONE;
        let out_of_range = Scalar::from(7u64) + two_64;
        proof.commitments_mut()[0] =
            params()
                .pedersen()
                .commit_at_index(&out_of_range, &blinds[0], GeneratorIndex::Value);
        assert!(!proof.verify(params()).unwrap());
    }

    #[test]
    fn test_wrong_commitment_rejected() {
        let mut proof = prove(&[11, 12]);
        let other = prove(&[13]);
        proof.commitments_mut()[0] = other.commitments()[0];
        assert!(!proof.verify(params()).unwrap());
    }

    #[test]
    fn test_witness_shape_errors() {
        assert!(AggregatedRangeWitness::new(vec![], vec![]).is_err());
        assert!(AggregatedRangeWitness::new(vec![1, 2], random_blinds(1)).is_err());
    }

    #[test]
    fn test_too_many_values() {
        let params = PrivacyParams::new(PrivacyConfig::testing()).unwrap();
        let witness = AggregatedRangeWitness::new(vec![1; 17], random_blinds(17)).unwrap();
        assert!(witness.prove(&params).is_err());
    }

    #[test]
    fn test_bytes_roundtrip() {
        let proof = prove(&[1, 2, 3]);
        let bytes = proof.to_bytes().unwrap();
        assert_eq!(bytes.len(), proof.serialized_size());
        let decoded = AggregatedRangeProof::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, proof);
        assert!(decoded.verify(params()).unwrap());
    }

    #[test]
    fn test_byte_flips_rejected() {
        let proof = prove(&[100]);
        let bytes = proof.to_bytes().unwrap();
        // one byte in every point and scalar field, skipping the count byte
        for offset in (1..bytes.len()).step_by(29) {
            let mut tampered = bytes.clone();
            tampered[offset] ^= 0x01;
            let accepted = AggregatedRangeProof::from_bytes(&tampered)
                .map(|p| p.verify(params()).unwrap_or(false))
                .unwrap_or(false);
            assert!(!accepted, "flip at offset {} accepted", offset);
        }
    }

    #[test]
    fn test_context_is_bound() {
        let witness = AggregatedRangeWitness::new(vec![42, 7], random_blinds(2)).unwrap();
        let proof = witness.prove_with_context(params(), b"outputs").unwrap();
        assert!(proof.verify_with_context(params(), b"outputs").unwrap());
        assert!(!proof.verify_with_context(params(), b"outputz").unwrap());
        assert!(!proof.verify(params()).unwrap());
    }

    #[test]
    fn test_truncated_bytes() {
        let bytes = prove(&[5]).to_bytes().unwrap();
        assert!(AggregatedRangeProof::from_bytes(&bytes[..bytes.len() - 1]).is_err());
        assert!(AggregatedRangeProof::from_bytes(&[0]).is_err());
    }

    #[test]
    fn test_verify_batch() {
        let mut proofs = vec![prove(&[1]), prove(&[2, 3]), prove(&[4])];
        let other = prove(&[99]);
        proofs[2].commitments_mut()[0] = other.commitments()[0];
        assert_eq!(
            AggregatedRangeProof::verify_batch(&proofs, params()),
            vec![true, true, false]
        );
    }
}

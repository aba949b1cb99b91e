//! Inner product argument
//!
//! Proves knowledge of `a, b` with
//! `P = <a, G> + <b, H> + <a, b>*U`
//! in `2*log2(n)` points and two scalars. Each round halves the vectors:
//!
//! ```text
//! L = <a_lo, G_hi> + <b_hi, H_lo> + <a_lo, b_hi>*U
//! R = <a_hi, G_lo> + <b_lo, H_hi> + <a_hi, b_lo>*U
//! a' = x*a_lo + x^-1*a_hi      G' = x^-1*G_lo + x*G_hi
//! b' = x^-1*b_lo + x*b_hi      H' = x*H_lo + x^-1*H_hi
//! P' = x^2*L + P + x^-2*R
//! ```

use curve25519_dalek::{
    ristretto::RistrettoPoint,
    scalar::Scalar,
    traits::{MultiscalarMul, VartimeMultiscalarMul},
};
use merlin::Transcript;
use tracing::trace;

use crate::encoding::{ByteReader, ByteWriter, POINT_SIZE, SCALAR_SIZE};
use crate::error::{PrivacyError, Result};
use crate::transcript::TranscriptProtocol;
use crate::vector::{fold_points, fold_scalars, inner_product};

/// Largest number of folding rounds an encoding may claim
const MAX_ROUNDS: usize = 32;

/// Logarithmic-size inner product proof
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerProductProof {
    l: Vec<RistrettoPoint>,
    r: Vec<RistrettoPoint>,
    a: Scalar,
    b: Scalar,
}

fn check_shape(n: usize, g: usize, h: usize) -> Result<()> {
    if n == 0 || !n.is_power_of_two() {
        return Err(PrivacyError::InvalidInput(format!(
            "inner product length {} is not a power of two",
            n
        )));
    }
    if g != n || h != n {
        return Err(PrivacyError::InvalidInput(format!(
            "generator lengths {}/{} do not match vector length {}",
            g, h, n
        )));
    }
    Ok(())
}

impl InnerProductProof {
    /// Prove the opening `(a, b)` of `<a, G> + <b, H> + <a, b>*U`
    pub fn prove(
        transcript: &mut Transcript,
        g: &[RistrettoPoint],
        h: &[RistrettoPoint],
        u: &RistrettoPoint,
        a: &[Scalar],
        b: &[Scalar],
    ) -> Result<Self> {
        let mut n = a.len();
        check_shape(n, g.len(), h.len())?;
        if b.len() != n {
            return Err(PrivacyError::InvalidInput(format!(
                "vector lengths differ: {} != {}",
                n,
                b.len()
            )));
        }

        let c = inner_product(a, b)?;
        let p = RistrettoPoint::multiscalar_mul(
            a.iter().chain(b.iter()).chain(std::iter::once(&c)),
            g.iter().chain(h.iter()).chain(std::iter::once(u)),
        );
        transcript.innerproduct_domain_sep(n as u64);
        transcript.append_point(b"P", &p.compress());

        let mut a = a.to_vec();
        let mut b = b.to_vec();
        let mut g = g.to_vec();
        let mut h = h.to_vec();
        let rounds = n.trailing_zeros() as usize;
        let mut l_vec = Vec::with_capacity(rounds);
        let mut r_vec = Vec::with_capacity(rounds);

        while n > 1 {
            n /= 2;
            let (a_lo, a_hi) = a.split_at(n);
            let (b_lo, b_hi) = b.split_at(n);
            let (g_lo, g_hi) = g.split_at(n);
            let (h_lo, h_hi) = h.split_at(n);

            let c_l = inner_product(a_lo, b_hi)?;
            let c_r = inner_product(a_hi, b_lo)?;

            let l = RistrettoPoint::multiscalar_mul(
                a_lo.iter().chain(b_hi.iter()).chain(std::iter::once(&c_l)),
                g_hi.iter().chain(h_lo.iter()).chain(std::iter::once(u)),
            );
            let r = RistrettoPoint::multiscalar_mul(
                a_hi.iter().chain(b_lo.iter()).chain(std::iter::once(&c_r)),
                g_lo.iter().chain(h_hi.iter()).chain(std::iter::once(u)),
            );

            transcript.append_point(b"L", &l.compress());
            transcript.append_point(b"R", &r.compress());
            let x = transcript.challenge_scalar(b"x");
            let x_inv = x.invert();
            trace!(remaining = n, "inner product round");

            let next_a = fold_scalars(a_lo, a_hi, &x, &x_inv)?;
            let next_b = fold_scalars(b_lo, b_hi, &x_inv, &x)?;
            let next_g = fold_points(g_lo, g_hi, &x_inv, &x)?;
            let next_h = fold_points(h_lo, h_hi, &x, &x_inv)?;
            a = next_a;
            b = next_b;
            g = next_g;
            h = next_h;

            l_vec.push(l);
            r_vec.push(r);
        }

        Ok(Self {
            l: l_vec,
            r: r_vec,
            a: a[0],
            b: b[0],
        })
    }

    /// Check the proof against the public commitment `p`
    ///
    /// Replays the folding on the generators alone and tests
    /// `a*G' + b*H' + (a*b)*U == P'`.
    pub fn verify(
        &self,
        transcript: &mut Transcript,
        g: &[RistrettoPoint],
        h: &[RistrettoPoint],
        u: &RistrettoPoint,
        p: &RistrettoPoint,
    ) -> bool {
        let mut n = g.len();
        if check_shape(n, g.len(), h.len()).is_err()
            || self.l.len() != n.trailing_zeros() as usize
            || self.r.len() != self.l.len()
        {
            return false;
        }

        transcript.innerproduct_domain_sep(n as u64);
        transcript.append_point(b"P", &p.compress());

        let mut g = g.to_vec();
        let mut h = h.to_vec();
        let mut p = *p;

        for (l, r) in self.l.iter().zip(self.r.iter()) {
            n /= 2;
            transcript.append_point(b"L", &l.compress());
            transcript.append_point(b"R", &r.compress());
            let x = transcript.challenge_scalar(b"x");
            let x_inv = x.invert();
            let x_sq = x * x;
            let x_inv_sq = x_inv * x_inv;

            let (g_lo, g_hi) = g.split_at(n);
            let (h_lo, h_hi) = h.split_at(n);
            let (next_g, next_h) = match (
                fold_points(g_lo, g_hi, &x_inv, &x),
                fold_points(h_lo, h_hi, &x, &x_inv),
            ) {
                (Ok(next_g), Ok(next_h)) => (next_g, next_h),
                _ => return false,
            };
            g = next_g;
            h = next_h;
            p = RistrettoPoint::vartime_multiscalar_mul([x_sq, Scalar::ONE, x_inv_sq], [*l, p, *r]);
        }

        let expected = RistrettoPoint::vartime_multiscalar_mul(
            [self.a, self.b, self.a * self.b],
            [g[0], h[0], *u],
        );
        expected == p
    }

    /// Number of folding rounds
    pub fn rounds(&self) -> usize {
        self.l.len()
    }

    /// Encoded size in bytes
    pub fn serialized_size(&self) -> usize {
        1 + 2 * self.l.len() * POINT_SIZE + 2 * SCALAR_SIZE
    }

    /// Write into an encoder
    pub fn write_to(&self, w: &mut ByteWriter) {
        // rounds never exceed MAX_ROUNDS
        w.write_u8(self.l.len() as u8);
        w.write_points(&self.l);
        w.write_points(&self.r);
        w.write_scalar(&self.a);
        w.write_scalar(&self.b);
    }

    /// Serialize to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = ByteWriter::with_capacity(self.serialized_size());
        self.write_to(&mut w);
        w.into_bytes()
    }

    /// Read from a decoder, consuming exactly the proof
    pub fn read_from(reader: &mut ByteReader<'_>) -> Result<Self> {
        let rounds = reader.read_u8()? as usize;
        if rounds > MAX_ROUNDS {
            return Err(PrivacyError::Decode(format!(
                "inner product proof claims {} rounds",
                rounds
            )));
        }
        let l = reader.read_points(rounds)?;
        let r = reader.read_points(rounds)?;
        let a = reader.read_scalar()?;
        let b = reader.read_scalar()?;
        Ok(Self { l, r, a, b })
    }

    /// Deserialize from bytes
    ///
    /// The length must be exactly `1 + 64*rounds + 64`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let rounds = *bytes
            .first()
            .ok_or_else(|| PrivacyError::Decode("empty inner product proof".into()))?
            as usize;
        let expected = 1 + 2 * rounds * POINT_SIZE + 2 * SCALAR_SIZE;
        if bytes.len() != expected {
            return Err(PrivacyError::Decode(format!(
                "inner product proof length {} does not match {} rounds ({} bytes)",
                bytes.len(),
                rounds,
                expected
            )));
        }
        let mut reader = ByteReader::new(bytes);
        let proof = Self::read_from(&mut reader)?;
        reader.finish()?;
        Ok(proof)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::hash_to_point;
    use rand::rngs::OsRng;

    fn setup(n: usize) -> (Vec<RistrettoPoint>, Vec<RistrettoPoint>, RistrettoPoint) {
        let g = (0..n).map(|i| hash_to_point(b"ipa-test-g", i as u64)).collect();
        let h = (0..n).map(|i| hash_to_point(b"ipa-test-h", i as u64)).collect();
        (g, h, hash_to_point(b"ipa-test-u", 0))
    }

    fn commitment(
        g: &[RistrettoPoint],
        h: &[RistrettoPoint],
        u: &RistrettoPoint,
        a: &[Scalar],
        b: &[Scalar],
    ) -> RistrettoPoint {
        let c = inner_product(a, b).unwrap();
        RistrettoPoint::multiscalar_mul(
            a.iter().chain(b.iter()).chain(std::iter::once(&c)),
            g.iter().chain(h.iter()).chain(std::iter::once(u)),
        )
    }

    fn random_vec(n: usize) -> Vec<Scalar> {
        (0..n).map(|_| Scalar::random(&mut OsRng)).collect()
    }

    #[test]
    fn test_prove_verify_sizes() {
        for n in [1usize, 2, 4, 16, 64] {
            let (g, h, u) = setup(n);
            let (a, b) = (random_vec(n), random_vec(n));
            let p = commitment(&g, &h, &u, &a, &b);

            let proof =
                InnerProductProof::prove(&mut Transcript::new(b"ipa"), &g, &h, &u, &a, &b).unwrap();
            assert_eq!(proof.rounds(), n.trailing_zeros() as usize);
            assert!(proof.verify(&mut Transcript::new(b"ipa"), &g, &h, &u, &p));
        }
    }

    #[test]
    fn test_wrong_commitment_fails() {
        let n = 8;
        let (g, h, u) = setup(n);
        let (a, b) = (random_vec(n), random_vec(n));
        let p = commitment(&g, &h, &u, &a, &b);

        let proof =
            InnerProductProof::prove(&mut Transcript::new(b"ipa"), &g, &h, &u, &a, &b).unwrap();
        let wrong = p + u;
        assert!(!proof.verify(&mut Transcript::new(b"ipa"), &g, &h, &u, &wrong));
        // transcript label mismatch
        assert!(!proof.verify(&mut Transcript::new(b"other"), &g, &h, &u, &p));
    }

    #[test]
    fn test_wrong_generator_count_fails() {
        let (g, h, u) = setup(8);
        let (a, b) = (random_vec(8), random_vec(8));
        let p = commitment(&g, &h, &u, &a, &b);
        let proof =
            InnerProductProof::prove(&mut Transcript::new(b"ipa"), &g, &h, &u, &a, &b).unwrap();
        assert!(!proof.verify(&mut Transcript::new(b"ipa"), &g[..4], &h[..4], &u, &p));
    }

    #[test]
    fn test_rejects_bad_shapes() {
        let (g, h, u) = setup(3);
        let (a, b) = (random_vec(3), random_vec(3));
        assert!(InnerProductProof::prove(&mut Transcript::new(b"ipa"), &g, &h, &u, &a, &b).is_err());

        let (g, h, u) = setup(4);
        let (a, b) = (random_vec(4), random_vec(2));
        assert!(InnerProductProof::prove(&mut Transcript::new(b"ipa"), &g, &h, &u, &a, &b).is_err());
    }

    #[test]
    fn test_bytes_roundtrip() {
        let n = 16;
        let (g, h, u) = setup(n);
        let (a, b) = (random_vec(n), random_vec(n));
        let proof =
            InnerProductProof::prove(&mut Transcript::new(b"ipa"), &g, &h, &u, &a, &b).unwrap();

        let bytes = proof.to_bytes();
        assert_eq!(bytes.len(), proof.serialized_size());
        assert_eq!(bytes.len(), 1 + 4 * 64 + 64);
        assert_eq!(InnerProductProof::from_bytes(&bytes).unwrap(), proof);
    }

    #[test]
    fn test_malformed_length() {
        let n = 4;
        let (g, h, u) = setup(n);
        let (a, b) = (random_vec(n), random_vec(n));
        let proof =
            InnerProductProof::prove(&mut Transcript::new(b"ipa"), &g, &h, &u, &a, &b).unwrap();
        let mut bytes = proof.to_bytes();
        bytes.pop();
        assert!(matches!(
            InnerProductProof::from_bytes(&bytes),
            Err(PrivacyError::Decode(_))
        ));
        assert!(InnerProductProof::from_bytes(&[]).is_err());
    }

    #[test]
    fn test_tampered_scalar_fails() {
        let n = 8;
        let (g, h, u) = setup(n);
        let (a, b) = (random_vec(n), random_vec(n));
        let p = commitment(&g, &h, &u, &a, &b);
        let mut proof =
            InnerProductProof::prove(&mut Transcript::new(b"ipa"), &g, &h, &u, &a, &b).unwrap();
        proof.a += Scalar::ONE;
        assert!(!proof.verify(&mut Transcript::new(b"ipa"), &g, &h, &u, &p));
    }
}

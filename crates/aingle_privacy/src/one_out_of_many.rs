//! One-out-of-many membership proofs
//!
//! Shows that one commitment in a ring of `N = 2^n` opens to zero
//! (`C_l = rand*G_rand`) without revealing `l`. For every bit `j` of `l`:
//!
//! ```text
//! cl_j = Com(l_j, r_j)   ca_j = Com(a_j, s_j)   cb_j = Com(l_j*a_j, t_j)
//! ```
//!
//! and for every power `k < n`:
//!
//! ```text
//! cd_k = Σ_i p_{i,k}*C_i + Com(0, u_k)
//! ```
//!
//! where `p_{i,k}` is the coefficient of `x^k` in `Π_j f_{j,i_j}(x)`, with
//! `f_{j,1} = l_j*x + a_j` and `f_{j,0} = x - f_{j,1}`. The challenge chains
//! `x = H(x, cl_j, ca_j, cb_j, cd_j)` one bit at a time.

use curve25519_dalek::{
    ristretto::RistrettoPoint,
    scalar::Scalar,
    traits::{MultiscalarMul, VartimeMultiscalarMul},
};
use rand::rngs::OsRng;
use rayon::prelude::*;
use tracing::debug;

use crate::commitment::{GeneratorIndex, PedersenGens};
use crate::encoding::{ByteReader, ByteWriter, POINT_SIZE, SCALAR_SIZE};
use crate::error::{PrivacyError, Result};
use crate::params::PrivacyParams;
use crate::transcript::ChallengeHasher;
use crate::vector::{bit, power_vector};

const DOMAIN: &[u8] = b"aingle_privacy_one_out_of_many";

/// The ring being proven over
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneOutOfManyStatement {
    /// Ring commitments, exactly `N` of them
    pub commitments: Vec<RistrettoPoint>,
}

/// Secret opening of one ring member
#[derive(Clone)]
pub struct OneOutOfManyWitness {
    statement: OneOutOfManyStatement,
    rand: Scalar,
    index: usize,
}

/// Membership proof
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneOutOfManyProof {
    cl: Vec<RistrettoPoint>,
    ca: Vec<RistrettoPoint>,
    cb: Vec<RistrettoPoint>,
    cd: Vec<RistrettoPoint>,
    f: Vec<Scalar>,
    za: Vec<Scalar>,
    zb: Vec<Scalar>,
    zd: Scalar,
}

fn commit(pc: &PedersenGens, value: &Scalar, blind: &Scalar) -> RistrettoPoint {
    pc.commit_at_index(value, blind, GeneratorIndex::SecretKey)
}

fn check_ring(params: &PrivacyParams, len: usize) -> Result<()> {
    if len != params.ring_size() {
        return Err(PrivacyError::InvalidInput(format!(
            "ring holds {} commitments, expected {}",
            len,
            params.ring_size()
        )));
    }
    Ok(())
}

/// Chain the per-bit challenge over the ring and every bit's commitments
fn challenge(
    ring: &[RistrettoPoint],
    cl: &[RistrettoPoint],
    ca: &[RistrettoPoint],
    cb: &[RistrettoPoint],
    cd: &[RistrettoPoint],
) -> Scalar {
    let mut x = ChallengeHasher::new(DOMAIN).points(ring).finish();
    for j in 0..cl.len() {
        x = ChallengeHasher::new(DOMAIN)
            .scalar(&x)
            .point(&cl[j])
            .point(&ca[j])
            .point(&cb[j])
            .point(&cd[j])
            .finish();
    }
    x
}

/// Multiply a polynomial (low degree first) by `c1*x + c0`
fn mul_linear(poly: &[Scalar], c1: &Scalar, c0: &Scalar) -> Vec<Scalar> {
    let mut out = vec![Scalar::ZERO; poly.len() + 1];
    for (k, coeff) in poly.iter().enumerate() {
        out[k] += coeff * c0;
        out[k + 1] += coeff * c1;
    }
    out
}

impl OneOutOfManyStatement {
    /// Wrap a ring
    pub fn new(commitments: Vec<RistrettoPoint>) -> Self {
        Self { commitments }
    }
}

impl OneOutOfManyWitness {
    /// The member at `index` must equal `rand*G_rand`
    pub fn new(statement: OneOutOfManyStatement, rand: Scalar, index: usize) -> Self {
        Self {
            statement,
            rand,
            index,
        }
    }

    /// Public part of the witness
    pub fn statement(&self) -> &OneOutOfManyStatement {
        &self.statement
    }

    /// Build the proof
    pub fn prove(&self, params: &PrivacyParams) -> Result<OneOutOfManyProof> {
        let ring = &self.statement.commitments;
        check_ring(params, ring.len())?;
        let n = params.ring_size_exp();
        let ring_size = params.ring_size();
        if self.index >= ring_size {
            return Err(PrivacyError::InvalidWitness(format!(
                "ring index {} outside ring of {}",
                self.index, ring_size
            )));
        }
        let pc = params.pedersen();
        let mut rng = OsRng;

        let mut random = |len: usize| -> Vec<Scalar> {
            (0..len).map(|_| Scalar::random(&mut rng)).collect()
        };
        let r = random(n);
        let a = random(n);
        let s = random(n);
        let t = random(n);
        let u = random(n);

        let l: Vec<Scalar> = (0..n)
            .map(|j| Scalar::from(bit(self.index, j) as u64))
            .collect();

        let cl: Vec<RistrettoPoint> = (0..n).map(|j| commit(pc, &l[j], &r[j])).collect();
        let ca: Vec<RistrettoPoint> = (0..n).map(|j| commit(pc, &a[j], &s[j])).collect();
        let cb: Vec<RistrettoPoint> = (0..n)
            .map(|j| commit(pc, &(l[j] * a[j]), &t[j]))
            .collect();

        // coefficients p_{i,k} of Π_j f_{j,i_j}(x)
        let coefficients: Vec<Vec<Scalar>> = (0..ring_size)
            .into_par_iter()
            .map(|i| {
                (0..n).fold(vec![Scalar::ONE], |poly, j| {
                    if bit(i, j) {
                        mul_linear(&poly, &l[j], &a[j])
                    } else {
                        mul_linear(&poly, &(Scalar::ONE - l[j]), &-a[j])
                    }
                })
            })
            .collect();

        let g_rand = pc.blinding();
        let cd: Vec<RistrettoPoint> = (0..n)
            .into_par_iter()
            .map(|k| {
                RistrettoPoint::multiscalar_mul(
                    coefficients
                        .iter()
                        .map(|p| p[k])
                        .chain(std::iter::once(u[k])),
                    ring.iter().chain(std::iter::once(&g_rand)),
                )
            })
            .collect();

        let x = challenge(ring, &cl, &ca, &cb, &cd);

        let f: Vec<Scalar> = (0..n).map(|j| l[j] * x + a[j]).collect();
        let za: Vec<Scalar> = (0..n).map(|j| r[j] * x + s[j]).collect();
        let zb: Vec<Scalar> = (0..n).map(|j| r[j] * (x - f[j]) + t[j]).collect();

        let x_pow = power_vector(&x, n + 1);
        let u_sum: Scalar = u.iter().zip(x_pow.iter()).map(|(uk, xk)| uk * xk).sum();
        let zd = self.rand * x_pow[n] - u_sum;

        Ok(OneOutOfManyProof {
            cl,
            ca,
            cb,
            cd,
            f,
            za,
            zb,
            zd,
        })
    }
}

impl OneOutOfManyProof {
    /// Ring size exponent this proof was built for
    pub fn ring_size_exp(&self) -> usize {
        self.cl.len()
    }

    /// Check membership against `statement`
    ///
    /// A ring whose length is not exactly `N` fails.
    pub fn verify(&self, params: &PrivacyParams, statement: &OneOutOfManyStatement) -> bool {
        let ring = &statement.commitments;
        let n = params.ring_size_exp();
        if check_ring(params, ring.len()).is_err() || self.cl.len() != n {
            debug!(
                ring = ring.len(),
                bits = self.cl.len(),
                "one-out-of-many shape mismatch"
            );
            return false;
        }
        let pc = params.pedersen();
        let x = challenge(ring, &self.cl, &self.ca, &self.cb, &self.cd);

        for j in 0..n {
            // x*cl + ca == Com(f, za)
            if self.cl[j] * x + self.ca[j] != commit(pc, &self.f[j], &self.za[j]) {
                return false;
            }
            // (x - f)*cl + cb == Com(0, zb)
            if self.cl[j] * (x - self.f[j]) + self.cb[j] != commit(pc, &Scalar::ZERO, &self.zb[j]) {
                return false;
            }
        }

        // Σ_i (Π_j f_{j,i_j})*C_i - Σ_k x^k*cd_k == Com(0, zd)
        let products: Vec<Scalar> = (0..ring.len())
            .into_par_iter()
            .map(|i| {
                (0..n)
                    .map(|j| if bit(i, j) { self.f[j] } else { x - self.f[j] })
                    .product()
            })
            .collect();
        let x_pow = power_vector(&x, n);
        let lhs = RistrettoPoint::vartime_multiscalar_mul(
            products
                .iter()
                .copied()
                .chain(x_pow.iter().map(|xk| -xk)),
            ring.iter().chain(self.cd.iter()),
        );
        lhs == commit(pc, &Scalar::ZERO, &self.zd)
    }

    /// Encoded size for a ring size exponent
    pub fn serialized_size_for(n: usize) -> usize {
        4 * n * POINT_SIZE + (3 * n + 1) * SCALAR_SIZE
    }

    /// Serialize: `cl, ca, cb, cd`, then `f, za, zb`, then `zd`
    pub fn to_bytes(&self) -> Vec<u8> {
        let n = self.cl.len();
        let mut w = ByteWriter::with_capacity(Self::serialized_size_for(n));
        w.write_points(&self.cl);
        w.write_points(&self.ca);
        w.write_points(&self.cb);
        w.write_points(&self.cd);
        w.write_scalars(&self.f);
        w.write_scalars(&self.za);
        w.write_scalars(&self.zb);
        w.write_scalar(&self.zd);
        w.into_bytes()
    }

    /// Deserialize, inferring the ring size exponent from the length
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let words = bytes.len() / POINT_SIZE;
        if bytes.len() % POINT_SIZE != 0 || words < 8 || (words - 1) % 7 != 0 {
            return Err(PrivacyError::Decode(format!(
                "one-out-of-many proof length {} is not (7n + 1) * 32",
                bytes.len()
            )));
        }
        let n = (words - 1) / 7;
        let mut reader = ByteReader::new(bytes);
        let proof = Self {
            cl: reader.read_points(n)?,
            ca: reader.read_points(n)?,
            cb: reader.read_points(n)?,
            cd: reader.read_points(n)?,
            f: reader.read_scalars(n)?,
            za: reader.read_scalars(n)?,
            zb: reader.read_scalars(n)?,
            zd: reader.read_scalar()?,
        };
        reader.finish()?;
        Ok(proof)
    }
}

//! Serial number proofs
//!
//! A coin's serial number is `sn = (sk + snd)^-1 * G_sk`. Revealing it marks
//! the coin spent without naming the coin. Two proofs bind `sn` to its inputs:
//!
//! - [`SnPrivacyProof`]: `sk` and `snd` stay hidden behind Pedersen
//!   commitments (`comSK`, `comSND1` at `G_snd`, `comSND2` at `G_sk`).
//! - [`SnNoPrivacyProof`]: the public key `sk*G_sk` and `snd` are revealed,
//!   only `sk` stays secret.
//!
//! The two encodings have different fixed sizes and never decode as each other.

use curve25519_dalek::{
    ristretto::RistrettoPoint,
    scalar::Scalar,
    traits::VartimeMultiscalarMul,
};
use rand::rngs::OsRng;

use crate::commitment::{GeneratorIndex, PedersenGens};
use crate::encoding::{ByteReader, ByteWriter, POINT_SIZE};
use crate::error::{PrivacyError, Result};
use crate::transcript::ChallengeHasher;

const PRIVACY_DOMAIN: &[u8] = b"aingle_privacy_sn_privacy";
const NO_PRIVACY_DOMAIN: &[u8] = b"aingle_privacy_sn_no_privacy";

/// Encoded size of [`SnPrivacyProof`]
pub const SN_PRIVACY_PROOF_SIZE: usize = 13 * POINT_SIZE;

/// Encoded size of [`SnNoPrivacyProof`]
pub const SN_NO_PRIVACY_PROOF_SIZE: usize = 6 * POINT_SIZE;

/// `sn = (sk + snd)^-1 * G_sk`
pub fn derive_serial_number(pc: &PedersenGens, sk: &Scalar, snd: &Scalar) -> Result<RistrettoPoint> {
    let sum = sk + snd;
    if sum == Scalar::ZERO {
        return Err(PrivacyError::InvalidWitness(
            "secret key and derivator sum to zero".into(),
        ));
    }
    Ok(pc.generator(GeneratorIndex::SecretKey) * sum.invert())
}

/// Public inputs of the privacy serial number proof
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnPrivacyStatement {
    /// Serial number
    pub sn: RistrettoPoint,
    /// `sk*G_sk + r_sk*G_rand`
    pub com_sk: RistrettoPoint,
    /// `snd*G_snd + r_snd1*G_rand`
    pub com_snd1: RistrettoPoint,
    /// `snd*G_sk + r_snd2*G_rand`
    pub com_snd2: RistrettoPoint,
}

/// Openings for [`SnPrivacyStatement`]
#[derive(Clone)]
pub struct SnPrivacyWitness {
    statement: SnPrivacyStatement,
    sk: Scalar,
    r_sk: Scalar,
    snd: Scalar,
    r_snd1: Scalar,
    r_snd2: Scalar,
}

/// Serial number proof over committed key and derivator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnPrivacyProof {
    statement: SnPrivacyStatement,
    t_sk: RistrettoPoint,
    t_snd1: RistrettoPoint,
    t_snd2: RistrettoPoint,
    t_e: RistrettoPoint,
    z_sk: Scalar,
    z_rsk: Scalar,
    z_snd: Scalar,
    z_rsnd1: Scalar,
    z_rsnd2: Scalar,
}

fn privacy_challenge(
    pc: &PedersenGens,
    stmt: &SnPrivacyStatement,
    t: [&RistrettoPoint; 4],
) -> Scalar {
    ChallengeHasher::new(PRIVACY_DOMAIN)
        .points(pc.as_slice())
        .point(&stmt.sn)
        .point(&stmt.com_sk)
        .point(&stmt.com_snd1)
        .point(&stmt.com_snd2)
        .points(t)
        .finish()
}

impl SnPrivacyWitness {
    /// Build the statement from the coin's key and derivator and their
    /// existing blinds; `com_snd2` gets a fresh blind.
    pub fn new(
        pc: &PedersenGens,
        sk: Scalar,
        r_sk: Scalar,
        snd: Scalar,
        r_snd1: Scalar,
    ) -> Result<Self> {
        let r_snd2 = Scalar::random(&mut OsRng);
        let statement = SnPrivacyStatement {
            sn: derive_serial_number(pc, &sk, &snd)?,
            com_sk: pc.commit_at_index(&sk, &r_sk, GeneratorIndex::SecretKey),
            com_snd1: pc.commit_at_index(&snd, &r_snd1, GeneratorIndex::Snd),
            com_snd2: pc.commit_at_index(&snd, &r_snd2, GeneratorIndex::SecretKey),
        };
        Ok(Self {
            statement,
            sk,
            r_sk,
            snd,
            r_snd1,
            r_snd2,
        })
    }

    /// Public part of the witness
    pub fn statement(&self) -> &SnPrivacyStatement {
        &self.statement
    }

    /// Build the proof
    pub fn prove(&self, pc: &PedersenGens) -> SnPrivacyProof {
        let mut rng = OsRng;
        let e_sk = Scalar::random(&mut rng);
        let e_snd = Scalar::random(&mut rng);
        let d_sk = Scalar::random(&mut rng);
        let d_snd1 = Scalar::random(&mut rng);
        let d_snd2 = Scalar::random(&mut rng);

        let t_sk = pc.commit_at_index(&e_sk, &d_sk, GeneratorIndex::SecretKey);
        let t_snd1 = pc.commit_at_index(&e_snd, &d_snd1, GeneratorIndex::Snd);
        let t_snd2 = pc.commit_at_index(&e_snd, &d_snd2, GeneratorIndex::SecretKey);
        let t_e = self.statement.sn * (e_sk + e_snd);

        let x = privacy_challenge(pc, &self.statement, [&t_sk, &t_snd1, &t_snd2, &t_e]);

        SnPrivacyProof {
            statement: self.statement.clone(),
            t_sk,
            t_snd1,
            t_snd2,
            t_e,
            z_sk: e_sk + x * self.sk,
            z_rsk: d_sk + x * self.r_sk,
            z_snd: e_snd + x * self.snd,
            z_rsnd1: d_snd1 + x * self.r_snd1,
            z_rsnd2: d_snd2 + x * self.r_snd2,
        }
    }
}

impl SnPrivacyProof {
    /// Statement carried by the proof
    pub fn statement(&self) -> &SnPrivacyStatement {
        &self.statement
    }

    /// Check the four sigma equations
    pub fn verify(&self, pc: &PedersenGens) -> bool {
        let stmt = &self.statement;
        let g_sk = pc.generator(GeneratorIndex::SecretKey);
        let x = privacy_challenge(pc, stmt, [&self.t_sk, &self.t_snd1, &self.t_snd2, &self.t_e]);

        let sk_ok = pc.commit_at_index(&self.z_sk, &self.z_rsk, GeneratorIndex::SecretKey)
            == stmt.com_sk * x + self.t_sk;
        let snd1_ok = pc.commit_at_index(&self.z_snd, &self.z_rsnd1, GeneratorIndex::Snd)
            == stmt.com_snd1 * x + self.t_snd1;
        let snd2_ok = pc.commit_at_index(&self.z_snd, &self.z_rsnd2, GeneratorIndex::SecretKey)
            == stmt.com_snd2 * x + self.t_snd2;
        // sn*(sk + snd) = G_sk
        let sn_ok = stmt.sn * (self.z_sk + self.z_snd)
            == RistrettoPoint::vartime_multiscalar_mul([x, Scalar::ONE], [g_sk, self.t_e]);

        sk_ok && snd1_ok && snd2_ok && sn_ok
    }

    /// Serialize to the fixed 416-byte layout
    pub fn to_bytes(&self) -> Vec<u8> {
        let stmt = &self.statement;
        let mut w = ByteWriter::with_capacity(SN_PRIVACY_PROOF_SIZE);
        w.write_points(&[stmt.sn, stmt.com_sk, stmt.com_snd1, stmt.com_snd2]);
        w.write_points(&[self.t_sk, self.t_snd1, self.t_snd2, self.t_e]);
        w.write_scalars(&[self.z_sk, self.z_rsk, self.z_snd, self.z_rsnd1, self.z_rsnd2]);
        w.into_bytes()
    }

    /// Deserialize from the fixed 416-byte layout
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != SN_PRIVACY_PROOF_SIZE {
            return Err(PrivacyError::Decode(format!(
                "serial number proof must be {} bytes, got {}",
                SN_PRIVACY_PROOF_SIZE,
                bytes.len()
            )));
        }
        let mut r = ByteReader::new(bytes);
        let statement = SnPrivacyStatement {
            sn: r.read_point()?,
            com_sk: r.read_point()?,
            com_snd1: r.read_point()?,
            com_snd2: r.read_point()?,
        };
        let proof = Self {
            statement,
            t_sk: r.read_point()?,
            t_snd1: r.read_point()?,
            t_snd2: r.read_point()?,
            t_e: r.read_point()?,
            z_sk: r.read_scalar()?,
            z_rsk: r.read_scalar()?,
            z_snd: r.read_scalar()?,
            z_rsnd1: r.read_scalar()?,
            z_rsnd2: r.read_scalar()?,
        };
        r.finish()?;
        Ok(proof)
    }
}

/// Public inputs of the no-privacy serial number proof
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnNoPrivacyStatement {
    /// Serial number
    pub sn: RistrettoPoint,
    /// Public key `sk*G_sk`
    pub vkey: RistrettoPoint,
    /// Serial number derivator
    pub snd: Scalar,
}

/// Secret key for [`SnNoPrivacyStatement`]
#[derive(Clone)]
pub struct SnNoPrivacyWitness {
    statement: SnNoPrivacyStatement,
    sk: Scalar,
}

/// Serial number proof with revealed key and derivator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnNoPrivacyProof {
    statement: SnNoPrivacyStatement,
    t_seed: RistrettoPoint,
    t_output: RistrettoPoint,
    z_seed: Scalar,
}

fn no_privacy_challenge(
    pc: &PedersenGens,
    stmt: &SnNoPrivacyStatement,
    t_seed: &RistrettoPoint,
    t_output: &RistrettoPoint,
) -> Scalar {
    ChallengeHasher::new(NO_PRIVACY_DOMAIN)
        .point(&pc.generator(GeneratorIndex::SecretKey))
        .point(&stmt.sn)
        .point(&stmt.vkey)
        .scalar(&stmt.snd)
        .point(t_seed)
        .point(t_output)
        .finish()
}

impl SnNoPrivacyWitness {
    /// Derive the statement from the secret key and derivator
    pub fn new(pc: &PedersenGens, sk: Scalar, snd: Scalar) -> Result<Self> {
        let statement = SnNoPrivacyStatement {
            sn: derive_serial_number(pc, &sk, &snd)?,
            vkey: pc.generator(GeneratorIndex::SecretKey) * sk,
            snd,
        };
        Ok(Self { statement, sk })
    }

    /// Public part of the witness
    pub fn statement(&self) -> &SnNoPrivacyStatement {
        &self.statement
    }

    /// Build the proof
    pub fn prove(&self, pc: &PedersenGens) -> SnNoPrivacyProof {
        let e = Scalar::random(&mut OsRng);
        let t_seed = pc.generator(GeneratorIndex::SecretKey) * e;
        let t_output = self.statement.sn * e;
        let x = no_privacy_challenge(pc, &self.statement, &t_seed, &t_output);
        SnNoPrivacyProof {
            statement: self.statement.clone(),
            t_seed,
            t_output,
            z_seed: e + x * self.sk,
        }
    }
}

impl SnNoPrivacyProof {
    /// Statement carried by the proof
    pub fn statement(&self) -> &SnNoPrivacyStatement {
        &self.statement
    }

    /// Check `z*G_sk == x*vKey + tSeed` and `z*sn == x*(G_sk - snd*sn) + tOutput`
    pub fn verify(&self, pc: &PedersenGens) -> bool {
        let stmt = &self.statement;
        let g_sk = pc.generator(GeneratorIndex::SecretKey);
        let x = no_privacy_challenge(pc, stmt, &self.t_seed, &self.t_output);

        let key_ok = g_sk * self.z_seed == stmt.vkey * x + self.t_seed;
        let sn_ok = stmt.sn * self.z_seed
            == RistrettoPoint::vartime_multiscalar_mul(
                [x, -(x * stmt.snd), Scalar::ONE],
                [g_sk, stmt.sn, self.t_output],
            );
        key_ok && sn_ok
    }

    /// Serialize to the fixed 192-byte layout
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = ByteWriter::with_capacity(SN_NO_PRIVACY_PROOF_SIZE);
        w.write_point(&self.statement.sn);
        w.write_point(&self.statement.vkey);
        w.write_scalar(&self.statement.snd);
        w.write_point(&self.t_seed);
        w.write_point(&self.t_output);
        w.write_scalar(&self.z_seed);
        w.into_bytes()
    }

    /// Deserialize from the fixed 192-byte layout
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != SN_NO_PRIVACY_PROOF_SIZE {
            return Err(PrivacyError::Decode(format!(
                "serial number no-privacy proof must be {} bytes, got {}",
                SN_NO_PRIVACY_PROOF_SIZE,
                bytes.len()
            )));
        }
        let mut r = ByteReader::new(bytes);
        let statement = SnNoPrivacyStatement {
            sn: r.read_point()?,
            vkey: r.read_point()?,
            snd: r.read_scalar()?,
        };
        let proof = Self {
            statement,
            t_seed: r.read_point()?,
            t_output: r.read_point()?,
            z_seed: r.read_scalar()?,
        };
        r.finish()?;
        Ok(proof)
    }
}

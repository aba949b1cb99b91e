//! Payment proof bundle, wire format and verification

use curve25519_dalek::{ristretto::RistrettoPoint, scalar::Scalar};
use subtle::ConstantTimeEq;
use tracing::{debug, trace};

use crate::bulletproofs::range_proof::AggregatedRangeProof;
use crate::coin::{InputCoin, OutputCoin};
use crate::commitment::{sum_commitments, GeneratorIndex};
use crate::config::MAX_RING_SIZE_EXP;
use crate::encoding::{count_u8, ByteReader, ByteWriter, POINT_SIZE};
use crate::error::{PrivacyError, ProofCheck, Result};
use crate::ledger::{AssetId, CommitmentLedger};
use crate::one_out_of_many::{OneOutOfManyProof, OneOutOfManyStatement};
use crate::params::PrivacyParams;
use crate::serial_number::{SnNoPrivacyProof, SnPrivacyProof};

/// Wire format version written first in every encoded payment proof
pub const PAYMENT_PROOF_VERSION: u8 = 1;

/// Proof that a payment spends coins it owns and conserves value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentProof {
    /// One membership proof per input (privacy)
    pub one_of_many: Vec<OneOutOfManyProof>,
    /// One serial number proof per input (privacy)
    pub serial_number: Vec<SnPrivacyProof>,
    /// One serial number proof per input (no privacy)
    pub serial_number_no_privacy: Vec<SnNoPrivacyProof>,
    /// Range proof over every output value (privacy)
    pub range: Option<AggregatedRangeProof>,
    /// Spent coins, concealed down to their serial numbers under privacy
    pub input_coins: Vec<InputCoin>,
    /// Created coins, without value and randomness under privacy
    pub output_coins: Vec<OutputCoin>,
    /// `value*G_value + r*G_rand` per output
    pub com_output_value: Vec<RistrettoPoint>,
    /// `snd*G_snd + r*G_rand` per output
    pub com_output_snd: Vec<RistrettoPoint>,
    /// `shard*G_shard + r*G_rand` per output
    pub com_output_shard: Vec<RistrettoPoint>,
    /// Sender's secret key commitment
    pub com_input_sk: Option<RistrettoPoint>,
    /// `value*G_value + r*G_rand` per input
    pub com_input_value: Vec<RistrettoPoint>,
    /// `snd*G_snd + r*G_rand` per input
    pub com_input_snd: Vec<RistrettoPoint>,
    /// Sender's shard commitment
    pub com_input_shard: Option<RistrettoPoint>,
    /// Ledger index of every ring member, `N` per input
    pub commitment_indices: Vec<u64>,
}

fn fail(check: ProofCheck) -> PrivacyError {
    debug!(%check, "payment proof rejected");
    PrivacyError::Verification(check)
}

fn points_eq(a: &RistrettoPoint, b: &RistrettoPoint) -> bool {
    a.compress()
        .as_bytes()
        .ct_eq(b.compress().as_bytes())
        .into()
}

/// Output coins as absorbed into the range proof transcript
///
/// Binds every revealed output field (owner, commitment, derivator, memo)
/// to the range proof, so none can be swapped after proving.
pub(crate) fn output_binding(outputs: &[OutputCoin]) -> Result<Vec<u8>> {
    let mut w = ByteWriter::new();
    for coin in outputs {
        w.write_u16_prefixed(&coin.to_bytes()?)?;
    }
    Ok(w.into_bytes())
}

fn write_point_list(w: &mut ByteWriter, points: &[RistrettoPoint], what: &str) -> Result<()> {
    w.write_u8(count_u8(points.len(), what)?);
    for point in points {
        w.write_u8(POINT_SIZE as u8);
        w.write_point(point);
    }
    Ok(())
}

fn write_optional_point(w: &mut ByteWriter, point: Option<&RistrettoPoint>) {
    match point {
        Some(p) => {
            w.write_u8(POINT_SIZE as u8);
            w.write_point(p);
        }
        None => w.write_u8(0),
    }
}

fn read_prefixed_point(r: &mut ByteReader<'_>) -> Result<RistrettoPoint> {
    let len = r.read_u8()? as usize;
    if len != POINT_SIZE {
        return Err(PrivacyError::Decode(format!("point field of {} bytes", len)));
    }
    r.read_point()
}

fn read_point_list(r: &mut ByteReader<'_>) -> Result<Vec<RistrettoPoint>> {
    let count = r.read_u8()? as usize;
    (0..count).map(|_| read_prefixed_point(r)).collect()
}

fn read_optional_point(r: &mut ByteReader<'_>) -> Result<Option<RistrettoPoint>> {
    match r.read_u8()? as usize {
        0 => Ok(None),
        POINT_SIZE => Ok(Some(r.read_point()?)),
        len => Err(PrivacyError::Decode(format!("point field of {} bytes", len))),
    }
}

impl PaymentProof {
    /// Serialize with the versioned wire layout
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut w = ByteWriter::new();
        w.write_u8(PAYMENT_PROOF_VERSION);

        w.write_u8(count_u8(self.one_of_many.len(), "one-out-of-many proofs")?);
        for proof in &self.one_of_many {
            w.write_u16_prefixed(&proof.to_bytes())?;
        }
        w.write_u8(count_u8(self.serial_number.len(), "serial number proofs")?);
        for proof in &self.serial_number {
            w.write_u16_prefixed(&proof.to_bytes())?;
        }
        w.write_u8(count_u8(
            self.serial_number_no_privacy.len(),
            "serial number no-privacy proofs",
        )?);
        for proof in &self.serial_number_no_privacy {
            w.write_u8_prefixed(&proof.to_bytes())?;
        }

        match &self.range {
            Some(range) => w.write_u16_prefixed(&range.to_bytes()?)?,
            None => w.write_u16(0),
        }

        w.write_u8(count_u8(self.input_coins.len(), "input coins")?);
        for coin in &self.input_coins {
            w.write_u16_prefixed(&coin.to_bytes()?)?;
        }
        w.write_u8(count_u8(self.output_coins.len(), "output coins")?);
        for coin in &self.output_coins {
            w.write_u16_prefixed(&coin.to_bytes()?)?;
        }

        write_point_list(&mut w, &self.com_output_value, "output value commitments")?;
        write_point_list(&mut w, &self.com_output_snd, "output derivator commitments")?;
        write_point_list(&mut w, &self.com_output_shard, "output shard commitments")?;
        write_optional_point(&mut w, self.com_input_sk.as_ref());
        write_point_list(&mut w, &self.com_input_value, "input value commitments")?;
        write_point_list(&mut w, &self.com_input_snd, "input derivator commitments")?;
        write_optional_point(&mut w, self.com_input_shard.as_ref());

        for index in &self.commitment_indices {
            w.write_u64(*index);
        }
        Ok(w.into_bytes())
    }

    /// Deserialize; the ring size is read off the membership proofs
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut r = ByteReader::new(bytes);
        let version = r.read_u8()?;
        if version != PAYMENT_PROOF_VERSION {
            return Err(PrivacyError::Decode(format!(
                "unsupported payment proof version {}",
                version
            )));
        }

        let count = r.read_u8()?;
        let one_of_many = (0..count)
            .map(|_| OneOutOfManyProof::from_bytes(r.read_u16_prefixed()?))
            .collect::<Result<Vec<_>>>()?;
        let count = r.read_u8()?;
        let serial_number = (0..count)
            .map(|_| SnPrivacyProof::from_bytes(r.read_u16_prefixed()?))
            .collect::<Result<Vec<_>>>()?;
        let count = r.read_u8()?;
        let serial_number_no_privacy = (0..count)
            .map(|_| SnNoPrivacyProof::from_bytes(r.read_u8_prefixed()?))
            .collect::<Result<Vec<_>>>()?;

        let range_bytes = r.read_u16_prefixed()?;
        let range = if range_bytes.is_empty() {
            None
        } else {
            Some(AggregatedRangeProof::from_bytes(range_bytes)?)
        };

        let count = r.read_u8()?;
        let input_coins = (0..count)
            .map(|_| InputCoin::from_bytes(r.read_u16_prefixed()?))
            .collect::<Result<Vec<_>>>()?;
        let count = r.read_u8()?;
        let output_coins = (0..count)
            .map(|_| OutputCoin::from_bytes(r.read_u16_prefixed()?))
            .collect::<Result<Vec<_>>>()?;

        let com_output_value = read_point_list(&mut r)?;
        let com_output_snd = read_point_list(&mut r)?;
        let com_output_shard = read_point_list(&mut r)?;
        let com_input_sk = read_optional_point(&mut r)?;
        let com_input_value = read_point_list(&mut r)?;
        let com_input_snd = read_point_list(&mut r)?;
        let com_input_shard = read_optional_point(&mut r)?;

        let ring_size = match one_of_many.first() {
            Some(first) => {
                let exp = first.ring_size_exp();
                if exp > usize::from(MAX_RING_SIZE_EXP) {
                    return Err(PrivacyError::Decode(format!(
                        "membership proof for a ring of 2^{}",
                        exp
                    )));
                }
                if one_of_many.iter().any(|p| p.ring_size_exp() != exp) {
                    return Err(PrivacyError::Decode(
                        "membership proofs use different ring sizes".into(),
                    ));
                }
                1usize << exp
            }
            None => 0,
        };
        let index_count = one_of_many.len() * ring_size;
        if r.remaining() != index_count * 8 {
            return Err(PrivacyError::Decode(format!(
                "expected {} ring indices, found {} trailing bytes",
                index_count,
                r.remaining()
            )));
        }
        let commitment_indices = (0..index_count)
            .map(|_| r.read_u64())
            .collect::<Result<Vec<_>>>()?;
        r.finish()?;

        Ok(Self {
            one_of_many,
            serial_number,
            serial_number_no_privacy,
            range,
            input_coins,
            output_coins,
            com_output_value,
            com_output_snd,
            com_output_shard,
            com_input_sk,
            com_input_value,
            com_input_snd,
            com_input_shard,
            commitment_indices,
        })
    }

    /// blake3 digest of the encoding
    pub fn digest(&self) -> Result<[u8; 32]> {
        Ok(*blake3::hash(&self.to_bytes()?).as_bytes())
    }

    /// Verify against ledger state
    ///
    /// Returns `Ok(true)` when every check passes. A failed check is reported
    /// as [`PrivacyError::Verification`] naming it; a failed ledger lookup as
    /// [`PrivacyError::Ledger`].
    #[allow(clippy::too_many_arguments)]
    pub fn verify<L: CommitmentLedger + ?Sized>(
        &self,
        params: &PrivacyParams,
        has_privacy: bool,
        public_key: &RistrettoPoint,
        fee: u64,
        ledger: &L,
        shard_id: u8,
        asset: &AssetId,
    ) -> Result<bool> {
        if has_privacy {
            self.verify_privacy(params, fee, ledger, shard_id, asset)
        } else {
            self.verify_no_privacy(params, public_key, fee, ledger, shard_id, asset)
        }
    }

    /// Accept or reject, without the reason
    #[allow(clippy::too_many_arguments)]
    pub fn is_valid<L: CommitmentLedger + ?Sized>(
        &self,
        params: &PrivacyParams,
        has_privacy: bool,
        public_key: &RistrettoPoint,
        fee: u64,
        ledger: &L,
        shard_id: u8,
        asset: &AssetId,
    ) -> bool {
        matches!(
            self.verify(params, has_privacy, public_key, fee, ledger, shard_id, asset),
            Ok(true)
        )
    }

    fn verify_privacy<L: CommitmentLedger + ?Sized>(
        &self,
        params: &PrivacyParams,
        fee: u64,
        ledger: &L,
        shard_id: u8,
        asset: &AssetId,
    ) -> Result<bool> {
        let n_in = self.input_coins.len();
        let n_out = self.output_coins.len();
        if n_in == 0 || n_out == 0 || self.one_of_many.is_empty() {
            return Err(fail(ProofCheck::EmptyProof));
        }
        let ring_size = params.ring_size();
        let shape_ok = self.one_of_many.len() == n_in
            && self.serial_number.len() == n_in
            && self.serial_number_no_privacy.is_empty()
            && self.com_input_value.len() == n_in
            && self.com_input_snd.len() == n_in
            && self.commitment_indices.len() == n_in * ring_size
            && self.com_output_value.len() == n_out
            && self.com_output_snd.len() == n_out
            && self.com_output_shard.len() == n_out;
        let (com_sk, com_shard, range) =
            match (self.com_input_sk, self.com_input_shard, self.range.as_ref()) {
                (Some(sk), Some(shard), Some(range)) if shape_ok => (sk, shard, range),
                _ => return Err(fail(ProofCheck::ShapeMismatch)),
            };

        for i in 0..n_in {
            let com_sum = com_sk + self.com_input_value[i] + self.com_input_snd[i] + com_shard;

            let mut ring = Vec::with_capacity(ring_size);
            for &index in &self.commitment_indices[i * ring_size..(i + 1) * ring_size] {
                let commitment = ledger.commitment_by_index(asset, index, shard_id)?;
                if ledger.commitment_index(asset, &commitment, shard_id)? != index {
                    return Err(fail(ProofCheck::RingIndex { input: i }));
                }
                ring.push(commitment - com_sum);
            }
            let statement = OneOutOfManyStatement::new(ring);
            if !self.one_of_many[i].verify(params, &statement) {
                return Err(fail(ProofCheck::OneOutOfMany { input: i }));
            }

            let sn_proof = &self.serial_number[i];
            let stmt = sn_proof.statement();
            let bound = points_eq(&stmt.com_sk, &com_sk)
                && points_eq(&stmt.com_snd1, &self.com_input_snd[i])
                && self.input_coins[i]
                    .coin
                    .serial_number
                    .is_some_and(|sn| points_eq(&sn, &stmt.sn));
            if !bound || !sn_proof.verify(params.pedersen()) {
                return Err(fail(ProofCheck::SerialNumberPrivacy { input: i }));
            }
            trace!(input = i, "input verified");
        }

        for (j, output) in self.output_coins.iter().enumerate() {
            let coin = &output.coin;
            let expected = coin.public_key.map(|pk| {
                pk + self.com_output_value[j] + self.com_output_snd[j] + self.com_output_shard[j]
            });
            match (expected, coin.commitment) {
                (Some(expected), Some(actual)) if points_eq(&expected, &actual) => {}
                _ => return Err(fail(ProofCheck::OutputCoinCommitment { output: j })),
            }
        }

        if range.commitments() != self.com_output_value.as_slice() {
            return Err(fail(ProofCheck::RangeCommitments));
        }
        if !range.verify_with_context(params, &output_binding(&self.output_coins)?)? {
            return Err(fail(ProofCheck::RangeProof));
        }

        // Σ inputs == Σ outputs + fee*G_value
        let fee_commitment = params.pedersen().commit_at_index(
            &Scalar::from(fee),
            &Scalar::ZERO,
            GeneratorIndex::Value,
        );
        let inputs = sum_commitments(&self.com_input_value);
        let outputs = sum_commitments(&self.com_output_value) + fee_commitment;
        if !points_eq(&inputs, &outputs) {
            return Err(fail(ProofCheck::Conservation));
        }

        debug!(inputs = n_in, outputs = n_out, "payment proof verified");
        Ok(true)
    }

    fn verify_no_privacy<L: CommitmentLedger + ?Sized>(
        &self,
        params: &PrivacyParams,
        public_key: &RistrettoPoint,
        fee: u64,
        ledger: &L,
        shard_id: u8,
        asset: &AssetId,
    ) -> Result<bool> {
        let n_in = self.input_coins.len();
        if n_in == 0 || self.output_coins.is_empty() {
            return Err(fail(ProofCheck::EmptyProof));
        }
        if self.serial_number_no_privacy.len() != n_in
            || !self.one_of_many.is_empty()
            || !self.serial_number.is_empty()
            || self.range.is_some()
        {
            return Err(fail(ProofCheck::ShapeMismatch));
        }

        let pc = params.pedersen();
        let mut input_total: u64 = 0;
        for (i, (input, proof)) in self
            .input_coins
            .iter()
            .zip(&self.serial_number_no_privacy)
            .enumerate()
        {
            let coin = &input.coin;
            let stmt = proof.statement();
            let bound = coin.public_key.is_some_and(|pk| {
                points_eq(&pk, public_key) && points_eq(&pk, &stmt.vkey)
            }) && coin.serial_number.is_some_and(|sn| points_eq(&sn, &stmt.sn))
                && coin.snd == Some(stmt.snd);
            if !bound || !proof.verify(pc) {
                return Err(fail(ProofCheck::SerialNumberNoPrivacy { input: i }));
            }

            let commitment = match (coin.recompute_commitment(params), coin.commitment) {
                (Ok(expected), Some(actual)) if points_eq(&expected, &actual) => actual,
                _ => return Err(fail(ProofCheck::InputCoinCommitment { input: i })),
            };
            // the coin must exist on the ledger
            ledger.commitment_index(asset, &commitment, shard_id)?;

            input_total = input_total
                .checked_add(coin.value)
                .ok_or(PrivacyError::Overflow)?;
        }

        let mut output_total: u64 = 0;
        for (j, output) in self.output_coins.iter().enumerate() {
            let coin = &output.coin;
            match (coin.recompute_commitment(params), coin.commitment) {
                (Ok(expected), Some(actual)) if points_eq(&expected, &actual) => {}
                _ => return Err(fail(ProofCheck::OutputCoinCommitment { output: j })),
            }
            output_total = output_total
                .checked_add(coin.value)
                .ok_or(PrivacyError::Overflow)?;
        }
        let output_total = output_total.checked_add(fee).ok_or(PrivacyError::Overflow)?;

        if input_total != output_total {
            return Err(fail(ProofCheck::Conservation));
        }
        debug!(inputs = n_in, "payment proof verified (no privacy)");
        Ok(true)
    }
}

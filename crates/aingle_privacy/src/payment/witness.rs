//! Payment witness construction and proving

use curve25519_dalek::{ristretto::RistrettoPoint, scalar::Scalar};
use rand::rngs::OsRng;
use rayon::prelude::*;
use tracing::{debug, trace, warn};

use super::proof::{output_binding, PaymentProof};
use crate::bulletproofs::range_proof::AggregatedRangeWitness;
use crate::coin::{last_byte, public_key, InputCoin, OutputCoin};
use crate::commitment::GeneratorIndex;
use crate::error::{PrivacyError, Result};
use crate::one_out_of_many::{OneOutOfManyStatement, OneOutOfManyWitness};
use crate::params::PrivacyParams;
use crate::serial_number::{SnNoPrivacyWitness, SnPrivacyWitness};

/// Everything the sender supplies to build a payment proof
#[derive(Clone)]
pub struct PaymentWitnessParams {
    /// Hide amounts, owners and the spent coins
    pub has_privacy: bool,
    /// Sender's secret key
    pub private_key: Scalar,
    /// Coins being spent, with serial numbers set
    pub input_coins: Vec<InputCoin>,
    /// Coins being created
    pub output_coins: Vec<OutputCoin>,
    /// Ring commitments, `N` per input in input order (privacy only)
    pub commitments: Vec<RistrettoPoint>,
    /// Ledger index of every ring commitment (privacy only)
    pub commitment_indices: Vec<u64>,
    /// Position of each spent coin inside its ring (privacy only)
    pub my_commitment_indices: Vec<usize>,
    /// Transaction fee
    pub fee: u64,
}

/// Private state for one payment proof
///
/// Created by [`PaymentWitness::init`] and consumed by
/// [`PaymentWitness::prove`]; never serialized.
pub struct PaymentWitness<'a> {
    params: &'a PrivacyParams,
    has_privacy: bool,
    input_coins: Vec<InputCoin>,
    output_coins: Vec<OutputCoin>,
    commitment_indices: Vec<u64>,

    one_of_many: Vec<OneOutOfManyWitness>,
    serial_number: Vec<SnPrivacyWitness>,
    serial_number_no_privacy: Vec<SnNoPrivacyWitness>,
    range: Option<AggregatedRangeWitness>,

    com_output_value: Vec<RistrettoPoint>,
    com_output_snd: Vec<RistrettoPoint>,
    com_output_shard: Vec<RistrettoPoint>,
    com_input_sk: Option<RistrettoPoint>,
    com_input_value: Vec<RistrettoPoint>,
    com_input_snd: Vec<RistrettoPoint>,
    com_input_shard: Option<RistrettoPoint>,
}

fn invalid(msg: impl Into<String>) -> PrivacyError {
    PrivacyError::InvalidWitness(msg.into())
}

impl<'a> PaymentWitness<'a> {
    /// Derive every commitment and sub-proof witness for a payment
    pub fn init(params: &'a PrivacyParams, witness: PaymentWitnessParams) -> Result<Self> {
        let config = params.config();
        let n_in = witness.input_coins.len();
        let n_out = witness.output_coins.len();
        if n_in == 0 || n_in > config.max_inputs {
            return Err(invalid(format!(
                "{} input coins, expected 1..={}",
                n_in, config.max_inputs
            )));
        }
        if n_out == 0 || n_out > config.max_outputs {
            return Err(invalid(format!(
                "{} output coins, expected 1..={}",
                n_out, config.max_outputs
            )));
        }

        let input_total: u128 = witness.input_coins.iter().map(|c| u128::from(c.coin.value)).sum();
        let output_total: u128 = witness.output_coins.iter().map(|c| u128::from(c.coin.value)).sum();
        if input_total != output_total + u128::from(witness.fee) {
            warn!(
                inputs = n_in,
                outputs = n_out,
                "input amounts do not cover outputs plus fee; the proof will not verify"
            );
        }

        let pc = params.pedersen();
        let sk = witness.private_key;
        let sender = public_key(pc, &sk);

        let mut this = Self {
            params,
            has_privacy: witness.has_privacy,
            input_coins: witness.input_coins,
            output_coins: witness.output_coins,
            commitment_indices: Vec::new(),
            one_of_many: Vec::new(),
            serial_number: Vec::new(),
            serial_number_no_privacy: Vec::new(),
            range: None,
            com_output_value: Vec::new(),
            com_output_snd: Vec::new(),
            com_output_shard: Vec::new(),
            com_input_sk: None,
            com_input_value: Vec::new(),
            com_input_snd: Vec::new(),
            com_input_shard: None,
        };

        if !witness.has_privacy {
            this.init_no_privacy(&sk, &sender)?;
            debug!(inputs = n_in, outputs = n_out, "payment witness ready (no privacy)");
            return Ok(this);
        }

        let ring_size = params.ring_size();
        if witness.commitments.len() != n_in * ring_size
            || witness.commitment_indices.len() != n_in * ring_size
        {
            return Err(invalid(format!(
                "expected {} ring commitments and indices, got {} and {}",
                n_in * ring_size,
                witness.commitments.len(),
                witness.commitment_indices.len()
            )));
        }
        if witness.my_commitment_indices.len() != n_in {
            return Err(invalid(format!(
                "{} ring positions for {} inputs",
                witness.my_commitment_indices.len(),
                n_in
            )));
        }
        this.commitment_indices = witness.commitment_indices;

        let mut rng = OsRng;
        let shard = Scalar::from(params.shard_id(last_byte(&sender)));
        let rand_sk = Scalar::random(&mut rng);
        let rand_shard = Scalar::random(&mut rng);
        let com_input_sk = pc.commit_at_index(&sk, &rand_sk, GeneratorIndex::SecretKey);
        let com_input_shard = pc.commit_at_index(&shard, &rand_shard, GeneratorIndex::ShardId);

        let mut input_value_blind_sum = Scalar::ZERO;
        for (i, input) in this.input_coins.iter().enumerate() {
            let coin = &input.coin;
            let snd = coin.require_snd()?;
            let randomness = coin.require_randomness()?;
            let commitment = coin.require_commitment()?;
            let serial_number = coin.require_serial_number()?;

            let position = witness.my_commitment_indices[i];
            if position >= ring_size {
                return Err(invalid(format!(
                    "ring position {} of input {} outside ring of {}",
                    position, i, ring_size
                )));
            }
            let ring = &witness.commitments[i * ring_size..(i + 1) * ring_size];
            if ring[position] != commitment {
                return Err(invalid(format!(
                    "ring of input {} does not hold its commitment at position {}",
                    i, position
                )));
            }

            let rand_value = Scalar::random(&mut rng);
            let rand_snd = Scalar::random(&mut rng);
            let com_value =
                pc.commit_at_index(&Scalar::from(coin.value), &rand_value, GeneratorIndex::Value);
            let com_snd = pc.commit_at_index(&snd, &rand_snd, GeneratorIndex::Snd);
            input_value_blind_sum += rand_value;

            // ring_j - (comSK + comValue + comSND + comShard) opens to zero at `position`
            let com_sum = com_input_sk + com_value + com_snd + com_input_shard;
            let rand_sum = rand_sk + rand_value + rand_snd + rand_shard;
            let shifted: Vec<RistrettoPoint> = ring.iter().map(|c| c - com_sum).collect();
            this.one_of_many.push(OneOutOfManyWitness::new(
                OneOutOfManyStatement::new(shifted),
                randomness - rand_sum,
                position,
            ));

            let sn_witness = SnPrivacyWitness::new(pc, sk, rand_sk, snd, rand_snd)?;
            if sn_witness.statement().sn != serial_number {
                return Err(invalid(format!(
                    "serial number of input {} does not match the secret key",
                    i
                )));
            }
            this.serial_number.push(sn_witness);
            this.com_input_value.push(com_value);
            this.com_input_snd.push(com_snd);
            trace!(input = i, "input witness ready");
        }
        this.com_input_sk = Some(com_input_sk);
        this.com_input_shard = Some(com_input_shard);

        // the last value blind closes Σ input blinds == Σ output blinds
        let mut output_value_blinds = Vec::with_capacity(n_out);
        let mut output_blind_sum = Scalar::ZERO;
        for j in 0..n_out {
            let blind = if j + 1 == n_out {
                input_value_blind_sum - output_blind_sum
            } else {
                Scalar::random(&mut rng)
            };
            output_blind_sum += blind;
            output_value_blinds.push(blind);
        }

        let mut output_values = Vec::with_capacity(n_out);
        for (j, output) in this.output_coins.iter_mut().enumerate() {
            let coin = &mut output.coin;
            let receiver = coin.require_public_key()?;
            let snd = coin.require_snd()?;
            let shard = Scalar::from(params.shard_id(last_byte(&receiver)));
            let rand_value = output_value_blinds[j];
            let rand_snd = Scalar::random(&mut rng);
            let rand_shard = Scalar::random(&mut rng);

            let com_value =
                pc.commit_at_index(&Scalar::from(coin.value), &rand_value, GeneratorIndex::Value);
            let com_snd = pc.commit_at_index(&snd, &rand_snd, GeneratorIndex::Snd);
            let com_shard = pc.commit_at_index(&shard, &rand_shard, GeneratorIndex::ShardId);

            coin.commitment = Some(receiver + com_value + com_snd + com_shard);
            coin.randomness = Some(rand_value + rand_snd + rand_shard);
            output_values.push(coin.value);

            this.com_output_value.push(com_value);
            this.com_output_snd.push(com_snd);
            this.com_output_shard.push(com_shard);
        }
        this.range = Some(AggregatedRangeWitness::new(output_values, output_value_blinds)?);

        debug!(inputs = n_in, outputs = n_out, "payment witness ready");
        Ok(this)
    }

    fn init_no_privacy(&mut self, sk: &Scalar, sender: &RistrettoPoint) -> Result<()> {
        let params = self.params;
        let pc = params.pedersen();
        for (i, input) in self.input_coins.iter().enumerate() {
            let coin = &input.coin;
            if coin.require_public_key()? != *sender {
                return Err(invalid(format!("input {} is not owned by the sender", i)));
            }
            let sn_witness = SnNoPrivacyWitness::new(pc, *sk, coin.require_snd()?)?;
            if sn_witness.statement().sn != coin.require_serial_number()? {
                return Err(invalid(format!(
                    "serial number of input {} does not match the secret key",
                    i
                )));
            }
            self.serial_number_no_privacy.push(sn_witness);
        }

        let mut rng = OsRng;
        for output in self.output_coins.iter_mut() {
            let coin = &mut output.coin;
            coin.randomness = Some(Scalar::random(&mut rng));
            coin.commitment = Some(coin.recompute_commitment(params)?);
        }
        Ok(())
    }

    /// Output coins with their commitments and randomness filled in
    pub fn output_coins(&self) -> &[OutputCoin] {
        &self.output_coins
    }

    /// Build every sub-proof and bundle them
    ///
    /// Fails as a whole if any sub-proof fails; no partial proof is returned.
    pub fn prove(&self, has_privacy: bool) -> Result<PaymentProof> {
        if has_privacy != self.has_privacy {
            return Err(PrivacyError::InvalidInput(format!(
                "witness built with has_privacy = {}, proving with {}",
                self.has_privacy, has_privacy
            )));
        }
        let pc = self.params.pedersen();

        if !has_privacy {
            let proof = PaymentProof {
                serial_number_no_privacy: self
                    .serial_number_no_privacy
                    .iter()
                    .map(|w| w.prove(pc))
                    .collect(),
                input_coins: self.input_coins.clone(),
                output_coins: self.output_coins.clone(),
                ..PaymentProof::default()
            };
            return Ok(proof);
        }

        let one_of_many = self
            .one_of_many
            .par_iter()
            .map(|w| w.prove(self.params))
            .collect::<Result<Vec<_>>>()?;
        let serial_number = self.serial_number.iter().map(|w| w.prove(pc)).collect();
        let output_coins: Vec<OutputCoin> =
            self.output_coins.iter().map(OutputCoin::conceal).collect();
        let range = self
            .range
            .as_ref()
            .ok_or_else(|| invalid("range witness missing"))?
            .prove_with_context(self.params, &output_binding(&output_coins)?)?;

        let proof = PaymentProof {
            one_of_many,
            serial_number,
            serial_number_no_privacy: Vec::new(),
            range: Some(range),
            input_coins: self.input_coins.iter().map(InputCoin::conceal).collect(),
            output_coins,
            com_output_value: self.com_output_value.clone(),
            com_output_snd: self.com_output_snd.clone(),
            com_output_shard: self.com_output_shard.clone(),
            com_input_sk: self.com_input_sk,
            com_input_value: self.com_input_value.clone(),
            com_input_snd: self.com_input_snd.clone(),
            com_input_shard: self.com_input_shard,
            commitment_indices: self.commitment_indices.clone(),
        };
        debug!(
            inputs = proof.input_coins.len(),
            outputs = proof.output_coins.len(),
            "payment proof built"
        );
        Ok(proof)
    }
}

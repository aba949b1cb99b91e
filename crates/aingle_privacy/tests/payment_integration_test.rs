//! Integration tests for payment proofs

use aingle_privacy::{
    coin::{last_byte, public_key},
    AssetId, Coin, InMemoryLedger, InputCoin, OutputCoin, PaymentProof, PaymentWitness,
    PaymentWitnessParams, PrivacyConfig, PrivacyError, PrivacyParams, ProofCheck,
    PAYMENT_PROOF_VERSION,
};
use curve25519_dalek::{ristretto::RistrettoPoint, scalar::Scalar};
use pretty_assertions::assert_eq;
use rand::rngs::OsRng;
use rayon::prelude::*;

const ASSET: AssetId = AssetId([7u8; 32]);

struct Wallet {
    sk: Scalar,
    pk: RistrettoPoint,
    shard: u8,
}

impl Wallet {
    fn new(params: &PrivacyParams) -> Self {
        let sk = Scalar::random(&mut OsRng);
        let pk = public_key(params.pedersen(), &sk);
        let shard = params.shard_id(last_byte(&pk));
        Self { sk, pk, shard }
    }

    /// Mint coins straight onto the ledger, surrounded by unrelated commitments
    fn mint(
        &self,
        params: &PrivacyParams,
        ledger: &InMemoryLedger,
        values: &[u64],
    ) -> (Vec<InputCoin>, Vec<u64>) {
        for _ in 0..params.ring_size() {
            ledger.insert(&ASSET, self.shard, RistrettoPoint::random(&mut OsRng));
        }
        let mut coins = Vec::new();
        let mut indices = Vec::new();
        for value in values {
            let coin = Coin::new(
                params,
                self.pk,
                *value,
                Scalar::random(&mut OsRng),
                Scalar::random(&mut OsRng),
            );
            indices.push(ledger.insert(&ASSET, self.shard, coin.commitment.unwrap()));
            coins.push(InputCoin::new(params, coin, &self.sk).unwrap());
        }
        (coins, indices)
    }

    fn pay(
        &self,
        params: &PrivacyParams,
        ledger: &InMemoryLedger,
        inputs: &[InputCoin],
        indices: &[u64],
        outputs: &[u64],
        fee: u64,
    ) -> PaymentProof {
        let mut commitments = Vec::new();
        let mut commitment_indices = Vec::new();
        let mut positions = Vec::new();
        for index in indices {
            let ring = ledger
                .sample_ring(&ASSET, self.shard, *index, params.ring_size())
                .unwrap();
            commitments.extend(ring.commitments);
            commitment_indices.extend(ring.indices);
            positions.push(ring.position);
        }
        let witness = PaymentWitness::init(
            params,
            PaymentWitnessParams {
                has_privacy: true,
                private_key: self.sk,
                input_coins: inputs.to_vec(),
                output_coins: outputs
                    .iter()
                    .map(|v| OutputCoin::new(Wallet::new(params).pk, *v))
                    .collect(),
                commitments,
                commitment_indices,
                my_commitment_indices: positions,
                fee,
            },
        )
        .unwrap();
        witness.prove(true).unwrap()
    }
}

fn setup() -> (PrivacyParams, InMemoryLedger, Wallet) {
    let params = PrivacyParams::new(PrivacyConfig::testing()).unwrap();
    let wallet = Wallet::new(&params);
    (params, InMemoryLedger::new(), wallet)
}

#[test]
fn test_payment_survives_the_wire() {
    let (params, ledger, wallet) = setup();
    let (inputs, indices) = wallet.mint(&params, &ledger, &[5, 7]);
    let proof = wallet.pay(&params, &ledger, &inputs, &indices, &[11], 1);

    let bytes = proof.to_bytes().unwrap();
    assert_eq!(bytes[0], PAYMENT_PROOF_VERSION);
    let decoded = PaymentProof::from_bytes(&bytes).unwrap();
    assert_eq!(decoded, proof);
    assert_eq!(decoded.digest().unwrap(), proof.digest().unwrap());
    assert!(decoded
        .verify(&params, true, &wallet.pk, 1, &ledger, wallet.shard, &ASSET)
        .unwrap());
}

#[test]
fn test_unknown_version_rejected() {
    let (params, ledger, wallet) = setup();
    let (inputs, indices) = wallet.mint(&params, &ledger, &[3]);
    let proof = wallet.pay(&params, &ledger, &inputs, &indices, &[3], 0);

    let mut bytes = proof.to_bytes().unwrap();
    bytes[0] = PAYMENT_PROOF_VERSION + 1;
    assert!(matches!(
        PaymentProof::from_bytes(&bytes),
        Err(PrivacyError::Decode(_))
    ));

    let mut bytes = proof.to_bytes().unwrap();
    bytes.push(0);
    assert!(PaymentProof::from_bytes(&bytes).is_err());
    bytes.truncate(bytes.len() - 9);
    assert!(PaymentProof::from_bytes(&bytes).is_err());
}

#[test]
fn test_every_flipped_byte_is_rejected() {
    let (params, ledger, wallet) = setup();
    let (inputs, indices) = wallet.mint(&params, &ledger, &[5, 7]);
    let proof = wallet.pay(&params, &ledger, &inputs, &indices, &[11], 1);
    let bytes = proof.to_bytes().unwrap();

    // a stride of 31 lands in every 32-byte point and scalar field
    let offsets: Vec<usize> = (0..bytes.len()).step_by(31).chain([bytes.len() - 1]).collect();
    let accepted: Vec<usize> = offsets
        .par_iter()
        .copied()
        .filter(|&offset| {
            let mut tampered = bytes.clone();
            tampered[offset] ^= 0x01;
            PaymentProof::from_bytes(&tampered)
                .map(|p| p.is_valid(&params, true, &wallet.pk, 1, &ledger, wallet.shard, &ASSET))
                .unwrap_or(false)
        })
        .collect();
    assert_eq!(accepted, Vec::<usize>::new());
}

#[test]
fn test_output_derivator_swap_rejected() {
    let (params, ledger, wallet) = setup();
    let (inputs, indices) = wallet.mint(&params, &ledger, &[5, 7]);
    let mut proof = wallet.pay(&params, &ledger, &inputs, &indices, &[11], 1);

    proof.output_coins[0].coin.snd = Some(Scalar::random(&mut OsRng));
    let decoded = PaymentProof::from_bytes(&proof.to_bytes().unwrap()).unwrap();
    let err = decoded
        .verify(&params, true, &wallet.pk, 1, &ledger, wallet.shard, &ASSET)
        .unwrap_err();
    assert_eq!(err.failed_check(), Some(ProofCheck::RangeProof));
}

#[test]
fn test_multiple_outputs_with_zero_value() {
    let (params, ledger, wallet) = setup();
    let (inputs, indices) = wallet.mint(&params, &ledger, &[100]);
    let proof = wallet.pay(&params, &ledger, &inputs, &indices, &[60, 0, 38], 2);
    assert!(proof
        .verify(&params, true, &wallet.pk, 2, &ledger, wallet.shard, &ASSET)
        .unwrap());
}

#[test]
fn test_output_value_tampering_rejected() {
    let (params, ledger, wallet) = setup();
    let (inputs, indices) = wallet.mint(&params, &ledger, &[5, 7]);
    let mut proof = wallet.pay(&params, &ledger, &inputs, &indices, &[11], 1);

    // move one unit into the output while keeping the coin commitment consistent
    let g_value = params
        .pedersen()
        .generator(aingle_privacy::GeneratorIndex::Value);
    proof.com_output_value[0] += g_value;
    let commitment = proof.output_coins[0].coin.commitment.unwrap();
    proof.output_coins[0].coin.commitment = Some(commitment + g_value);

    let err = proof
        .verify(&params, true, &wallet.pk, 1, &ledger, wallet.shard, &ASSET)
        .unwrap_err();
    assert_eq!(err.failed_check(), Some(ProofCheck::RangeCommitments));
}

#[test]
fn test_spending_the_same_coin_twice_reveals_the_serial_number() {
    let (params, ledger, wallet) = setup();
    let (inputs, indices) = wallet.mint(&params, &ledger, &[8]);
    let first = wallet.pay(&params, &ledger, &inputs, &indices, &[8], 0);
    let second = wallet.pay(&params, &ledger, &inputs, &indices, &[4, 4], 0);

    assert_eq!(
        first.input_coins[0].coin.serial_number,
        second.input_coins[0].coin.serial_number
    );
    assert_ne!(first.com_input_sk, second.com_input_sk);
}

#[test]
fn test_wrong_ledger_fails_lookup() {
    let (params, ledger, wallet) = setup();
    let (inputs, indices) = wallet.mint(&params, &ledger, &[1]);
    let proof = wallet.pay(&params, &ledger, &inputs, &indices, &[1], 0);

    let empty = InMemoryLedger::new();
    assert!(matches!(
        proof.verify(&params, true, &wallet.pk, 0, &empty, wallet.shard, &ASSET),
        Err(PrivacyError::Ledger(_))
    ));
}

#[test]
fn test_parallel_verification_shares_params() {
    let (params, ledger, wallet) = setup();
    let proofs: Vec<PaymentProof> = (1..=4u64)
        .map(|v| {
            let (inputs, indices) = wallet.mint(&params, &ledger, &[v * 10]);
            wallet.pay(&params, &ledger, &inputs, &indices, &[v * 10 - 1], 1)
        })
        .collect();

    let results: Vec<bool> = proofs
        .par_iter()
        .map(|p| p.is_valid(&params, true, &wallet.pk, 1, &ledger, wallet.shard, &ASSET))
        .collect();
    assert_eq!(results, vec![true; 4]);
}

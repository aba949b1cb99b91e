#![doc = include_str!("../README.md")]
//! # AIngle Privacy - Confidential Payment Proofs
//!
//! Zero-knowledge proofs that let a sender spend coins without revealing
//! which coins, how much, or to whom.
//!
//! ## Features
//!
//! - **Pedersen Commitments**: Five indexed generators plus a blinding generator
//! - **Range Proofs**: Aggregated 64-bit Bulletproofs over any number of outputs
//! - **Inner Product Argument**: Logarithmic-size argument backing the range proof
//! - **One-out-of-many Proofs**: Prove a commitment in a ring of `2^n` opens to zero
//! - **Serial Number Proofs**: Bind a spent coin's serial number to its owner
//! - **Payment Proofs**: Bundle everything, with a versioned wire format
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       AIngle Privacy                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │                 payment (witness ─▶ proof)                   │
//! ├──────────────┬────────────────┬──────────────┬──────────────┤
//! │ one_out_of_  │ serial_number  │ bulletproofs │ coin, ledger │
//! │ many         │                │              │              │
//! └──────────────┴────────────────┴──────────────┴──────────────┘
//!          │               │               │
//!          └───────────────┴───────────────┴─ commitment, vector,
//!                                             transcript, encoding
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use aingle_privacy::{AggregatedRangeWitness, GeneratorIndex, PrivacyParams};
//! use curve25519_dalek::scalar::Scalar;
//! use rand::rngs::OsRng;
//!
//! let params = PrivacyParams::global();
//!
//! // 1. Commit to a value at an indexed generator
//! let blind = Scalar::random(&mut OsRng);
//! let commitment = params
//!     .pedersen()
//!     .commit_at_index(&Scalar::from(42u64), &blind, GeneratorIndex::Value);
//!
//! // 2. Prove it lies in [0, 2^64)
//! let witness = AggregatedRangeWitness::new(vec![42], vec![blind]).unwrap();
//! let proof = witness.prove(params).unwrap();
//! assert_eq!(proof.commitments()[0], commitment);
//! assert!(proof.verify(params).unwrap());
//! ```
//!
//! ## Security Considerations
//!
//! - Blinding factors come from `OsRng` and are never reused
//! - Proofs are non-interactive through Merlin transcripts (range proof,
//!   inner product) and SHA-512 challenges (sigma protocols)
//! - Provers are not constant-time; verification compares points with `subtle`

pub mod bulletproofs;
pub mod coin;
pub mod commitment;
pub mod config;
pub mod encoding;
pub mod error;
pub mod ledger;
pub mod one_out_of_many;
pub mod params;
pub mod payment;
pub mod serial_number;
pub mod transcript;
pub mod vector;

// Re-export main types
pub use bulletproofs::{AggregatedRangeProof, AggregatedRangeWitness, InnerProductProof};
pub use coin::{Coin, InputCoin, OutputCoin};
pub use commitment::{GeneratorIndex, PedersenGens};
pub use config::PrivacyConfig;
pub use error::{PrivacyError, ProofCheck, Result};
pub use ledger::{AssetId, CommitmentLedger, InMemoryLedger, SampledRing};
pub use one_out_of_many::{OneOutOfManyProof, OneOutOfManyStatement, OneOutOfManyWitness};
pub use params::PrivacyParams;
pub use payment::{PaymentProof, PaymentWitness, PaymentWitnessParams, PAYMENT_PROOF_VERSION};
pub use serial_number::{
    derive_serial_number, SnNoPrivacyProof, SnNoPrivacyStatement, SnNoPrivacyWitness,
    SnPrivacyProof, SnPrivacyStatement, SnPrivacyWitness,
};

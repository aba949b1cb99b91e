//! Payment proofs
//!
//! A sender builds a [`PaymentWitness`] from its key, the coins it spends and
//! the coins it creates, then proves it into a [`PaymentProof`]. Validators
//! check the proof against their [`CommitmentLedger`](crate::ledger::CommitmentLedger).
//!
//! With privacy on, the proof carries for each input a one-out-of-many proof
//! over a ring of ledger commitments and a serial number proof over
//! committed key and derivator, plus one aggregated range proof covering every
//! output value. Without privacy, inputs are revealed and only the serial
//! number binding is proven.

pub mod proof;
pub mod witness;

pub use proof::{PaymentProof, PAYMENT_PROOF_VERSION};
pub use witness::{PaymentWitness, PaymentWitnessParams};

//! Bulletproof range proofs
//!
//! [`generators`] holds the deterministic generator tables,
//! [`inner_product`] the logarithmic inner product argument, and
//! [`range_proof`] the aggregated 64-bit range proof built on both.

pub mod generators;
pub mod inner_product;
pub mod range_proof;

pub use generators::{BulletproofGens, BulletproofGensStore, MAX_EXP};
pub use inner_product::InnerProductProof;
pub use range_proof::{AggregatedRangeProof, AggregatedRangeWitness};

//! Error types for privacy proofs

use std::fmt;

use thiserror::Error;

/// Result type for privacy operations
pub type Result<T> = std::result::Result<T, PrivacyError>;

/// The verification check that rejected a payment proof
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofCheck {
    /// A privacy proof carried no sub-proofs at all
    EmptyProof,
    /// Sub-proof counts disagree with the number of coins
    ShapeMismatch,
    /// Ring index does not map back to the fetched commitment
    RingIndex { input: usize },
    /// One-out-of-many membership proof
    OneOutOfMany { input: usize },
    /// Serial number proof with hidden key and derivator
    SerialNumberPrivacy { input: usize },
    /// Serial number proof with revealed key and derivator
    SerialNumberNoPrivacy { input: usize },
    /// Recomputed input coin commitment
    InputCoinCommitment { input: usize },
    /// Recomputed output coin commitment
    OutputCoinCommitment { output: usize },
    /// Range proof commitments differ from the output value commitments
    RangeCommitments,
    /// Aggregated range proof equations
    RangeProof,
    /// Sum of inputs against sum of outputs plus fee
    Conservation,
}

impl fmt::Display for ProofCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyProof => write!(f, "empty proof"),
            Self::ShapeMismatch => write!(f, "sub-proof count mismatch"),
            Self::RingIndex { input } => write!(f, "ring index of input {}", input),
            Self::OneOutOfMany { input } => write!(f, "one-out-of-many proof of input {}", input),
            Self::SerialNumberPrivacy { input } => {
                write!(f, "serial number proof of input {}", input)
            }
            Self::SerialNumberNoPrivacy { input } => {
                write!(f, "serial number no-privacy proof of input {}", input)
            }
            Self::InputCoinCommitment { input } => {
                write!(f, "commitment of input coin {}", input)
            }
            Self::OutputCoinCommitment { output } => {
                write!(f, "commitment of output coin {}", output)
            }
            Self::RangeCommitments => write!(f, "range proof commitments"),
            Self::RangeProof => write!(f, "range proof"),
            Self::Conservation => write!(f, "value conservation"),
        }
    }
}

/// Privacy proof errors
#[derive(Debug, Error)]
pub enum PrivacyError {
    /// Malformed bytes
    #[error("Decode error: {0}")]
    Decode(String),

    /// Witness data that cannot produce a proof
    #[error("Invalid witness: {0}")]
    InvalidWitness(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A verification equation did not hold
    #[error("Verification failed: {0}")]
    Verification(ProofCheck),

    /// The commitment ledger could not answer a lookup
    #[error("Ledger lookup failed: {0}")]
    Ledger(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Generator index outside the generator table
    #[error("Generator index {0} out of range")]
    GeneratorIndex(usize),

    /// Amount arithmetic overflowed
    #[error("Amount overflow")]
    Overflow,
}

impl PrivacyError {
    /// The failed check, if this is a verification failure
    pub fn failed_check(&self) -> Option<ProofCheck> {
        match self {
            Self::Verification(check) => Some(*check),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_check() {
        let err = PrivacyError::Verification(ProofCheck::Conservation);
        assert_eq!(err.failed_check(), Some(ProofCheck::Conservation));
        assert!(PrivacyError::Overflow.failed_check().is_none());
    }

    #[test]
    fn test_display_names_input() {
        let err = PrivacyError::Verification(ProofCheck::OneOutOfMany { input: 2 });
        assert_eq!(
            err.to_string(),
            "Verification failed: one-out-of-many proof of input 2"
        );
    }
}

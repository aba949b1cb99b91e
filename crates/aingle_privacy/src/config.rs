//! Configuration for the privacy proof engine

use serde::{Deserialize, Serialize};

use crate::error::{PrivacyError, Result};

/// Largest supported ring size exponent (ring of 1024 commitments)
pub const MAX_RING_SIZE_EXP: u8 = 10;

/// Protocol parameters shared by provers and verifiers
///
/// Both sides of a payment must run with the same values; a proof built for a
/// ring of 8 does not verify against a ring of 16
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrivacyConfig {
    /// Ring size exponent `n`; rings hold `2^n` commitments
    pub ring_size_exp: u8,
    /// Maximum number of input coins in one payment
    pub max_inputs: usize,
    /// Maximum number of output coins (and aggregated range values)
    pub max_outputs: usize,
    /// Number of shards; a key lives in shard `last_byte % max_shards`
    pub max_shards: u8,
    /// Public seed for the bulletproof generators
    pub bulletproof_seed: String,
    /// Number of aggregated values the generator table is built for up front
    pub initial_range_capacity: usize,
}

impl Default for PrivacyConfig {
    fn default() -> Self {
        Self {
            ring_size_exp: 3,
            max_inputs: 254,
            max_outputs: 254,
            max_shards: 8,
            bulletproof_seed: "aingle_privacy_bulletproof".to_string(),
            initial_range_capacity: 1,
        }
    }
}

impl PrivacyConfig {
    /// Small rings for fast tests
    pub fn testing() -> Self {
        Self {
            ring_size_exp: 2,
            max_inputs: 16,
            max_outputs: 16,
            ..Self::default()
        }
    }

    /// Rings of 32 commitments for a larger anonymity set
    pub fn high_anonymity() -> Self {
        Self {
            ring_size_exp: 5,
            ..Self::default()
        }
    }

    /// Number of commitments in a ring
    pub fn ring_size(&self) -> usize {
        1usize << self.ring_size_exp
    }

    /// Parse from JSON, then validate
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| PrivacyError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| PrivacyError::Config(e.to_string()))
    }

    /// Check every field is inside the range the wire format can carry
    pub fn validate(&self) -> Result<()> {
        if self.ring_size_exp == 0 || self.ring_size_exp > MAX_RING_SIZE_EXP {
            return Err(PrivacyError::Config(format!(
                "ring_size_exp must be in 1..={}, got {}",
                MAX_RING_SIZE_EXP, self.ring_size_exp
            )));
        }
        // counts are written as a single byte
        if self.max_inputs == 0 || self.max_inputs > u8::MAX as usize {
            return Err(PrivacyError::Config(format!(
                "max_inputs must be in 1..=255, got {}",
                self.max_inputs
            )));
        }
        if self.max_outputs == 0 || self.max_outputs > u8::MAX as usize {
            return Err(PrivacyError::Config(format!(
                "max_outputs must be in 1..=255, got {}",
                self.max_outputs
            )));
        }
        if self.max_shards == 0 {
            return Err(PrivacyError::Config("max_shards must be positive".into()));
        }
        if self.bulletproof_seed.is_empty() {
            return Err(PrivacyError::Config(
                "bulletproof_seed must not be empty".into(),
            ));
        }
        if self.initial_range_capacity > self.max_outputs {
            return Err(PrivacyError::Config(format!(
                "initial_range_capacity {} exceeds max_outputs {}",
                self.initial_range_capacity, self.max_outputs
            )));
        }
        Ok(())
    }
}

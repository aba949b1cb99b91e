//! Shared proving and verification context
//!
//! [`PrivacyParams`] freezes a [`PrivacyConfig`] together with the generator
//! tables derived from it. Every prove and verify call takes one by reference.

use std::sync::Arc;

use once_cell::sync::Lazy;
use tracing::debug;

use crate::bulletproofs::generators::{BulletproofGens, BulletproofGensStore};
use crate::commitment::PedersenGens;
use crate::config::PrivacyConfig;
use crate::error::{PrivacyError, Result};

static GLOBAL: Lazy<PrivacyParams> = Lazy::new(|| PrivacyParams::build(PrivacyConfig::default()));

/// Immutable protocol context
#[derive(Debug)]
pub struct PrivacyParams {
    config: PrivacyConfig,
    pedersen: PedersenGens,
    bulletproof: BulletproofGensStore,
}

impl PrivacyParams {
    /// Validate `config` and derive its generator tables
    pub fn new(config: PrivacyConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: PrivacyConfig) -> Self {
        debug!(
            ring_size = config.ring_size(),
            max_outputs = config.max_outputs,
            "initializing privacy parameters"
        );
        let bulletproof = BulletproofGensStore::new(
            config.bulletproof_seed.as_bytes(),
            config.initial_range_capacity.max(1),
        );
        Self {
            pedersen: PedersenGens::new(),
            bulletproof,
            config,
        }
    }

    /// Process-wide context built from the default configuration
    pub fn global() -> &'static PrivacyParams {
        &GLOBAL
    }

    /// The configuration this context was built from
    pub fn config(&self) -> &PrivacyConfig {
        &self.config
    }

    /// Pedersen generator table
    pub fn pedersen(&self) -> &PedersenGens {
        &self.pedersen
    }

    /// Ring size `N`
    pub fn ring_size(&self) -> usize {
        self.config.ring_size()
    }

    /// Ring size exponent `n` with `N = 2^n`
    pub fn ring_size_exp(&self) -> usize {
        self.config.ring_size_exp as usize
    }

    /// Shard owning a key with the given last byte
    pub fn shard_id(&self, last_byte: u8) -> u8 {
        last_byte % self.config.max_shards
    }

    /// Bulletproof generators for `m` aggregated values
    pub fn bulletproof_gens(&self, m: usize) -> Result<Arc<BulletproofGens>> {
        if m == 0 || m > self.config.max_outputs {
            return Err(PrivacyError::InvalidInput(format!(
                "range proof over {} values, limit is {}",
                m, self.config.max_outputs
            )));
        }
        Ok(self.bulletproof.get(m))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_is_default() {
        let params = PrivacyParams::global();
        assert_eq!(params.config(), &PrivacyConfig::default());
        assert_eq!(params.ring_size(), 8);
        assert_eq!(params.ring_size_exp(), 3);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = PrivacyConfig::default();
        config.max_shards = 0;
        assert!(PrivacyParams::new(config).is_err());
    }

    #[test]
    fn test_bulletproof_gens_capacity() {
        let params = PrivacyParams::new(PrivacyConfig::testing()).unwrap();
        assert_eq!(params.bulletproof_gens(3).unwrap().capacity(), 4);
        assert!(params.bulletproof_gens(0).is_err());
        assert!(params.bulletproof_gens(17).is_err());
    }

    #[test]
    fn test_shard_id() {
        let params = PrivacyParams::global();
        assert_eq!(params.shard_id(0), 0);
        assert_eq!(params.shard_id(9), 1);
        assert_eq!(params.shard_id(255), 7);
    }
}

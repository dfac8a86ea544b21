//! Coupon Generation Configuration
//!
//! Claimer, admin key, tiers and secret codes for the coupon commands.

use alloy::primitives::Address;

use crate::eth_signing::AdminKey;
use crate::nonce::nonce_digest;

use super::{address, list, optional, parse, process_env, required, ConfigError, Lookup};

#[derive(Debug)]
pub struct CouponConfig {
    /// MC_CLAIMER_ADDR
    pub claimer: Address,
    /// MC_ADMIN_PKEY
    pub admin_key: AdminKey,
    /// MC_ADMIN_ADDR, when the role holder differs from the signing key's address
    pub admin_address: Option<Address>,
    /// MC_TIERS (space separated), falling back to MC_TIER
    pub tiers: Vec<String>,
    /// MC_NONCE_CODES
    pub nonce_codes: Vec<String>,
    /// MC_NONCE_CODE
    pub nonce_code: Option<String>,
    /// MC_NONCES
    pub nonces: Vec<String>,
}

impl CouponConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&process_env)
    }

    pub fn from_lookup(env: &impl Lookup) -> Result<Self, ConfigError> {
        let claimer = address("MC_CLAIMER_ADDR", &required(env, "MC_CLAIMER_ADDR")?)?;
        let admin_key = parse("MC_ADMIN_PKEY", &required(env, "MC_ADMIN_PKEY")?)?;
        let admin_address = optional(env, "MC_ADMIN_ADDR")
            .map(|v| address("MC_ADMIN_ADDR", &v))
            .transpose()?;

        let mut tiers = list(env, "MC_TIERS");
        if tiers.is_empty() {
            tiers = list(env, "MC_TIER");
        }
        if tiers.is_empty() {
            return Err(ConfigError::Missing("MC_TIERS".to_string()));
        }

        Ok(Self {
            claimer,
            admin_key,
            admin_address,
            tiers,
            nonce_codes: list(env, "MC_NONCE_CODES"),
            nonce_code: optional(env, "MC_NONCE_CODE"),
            nonces: list(env, "MC_NONCES"),
        })
    }

    /// Secret codes for the batch commands
    pub fn require_nonce_codes(&self) -> Result<&[String], ConfigError> {
        if self.nonce_codes.is_empty() {
            return Err(ConfigError::Missing("MC_NONCE_CODES".to_string()));
        }
        Ok(&self.nonce_codes)
    }

    /// Nonce for a single coupon: digest of MC_NONCE_CODE, else first of MC_NONCES
    pub fn single_nonce(&self) -> Result<String, ConfigError> {
        if let Some(code) = &self.nonce_code {
            return Ok(nonce_digest(code));
        }
        self.nonces
            .first()
            .cloned()
            .ok_or_else(|| ConfigError::Missing("MC_NONCE_CODE or MC_NONCES".to_string()))
    }

    /// Address expected to hold the magic coupon admin role
    pub fn role_holder(&self) -> Address {
        self.admin_address.unwrap_or_else(|| self.admin_key.address())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::from_pairs;

    const KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
    const CLAIMER: &str = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed";

    #[test]
    fn loads_batch_settings() {
        let env = from_pairs(&[
            ("MC_CLAIMER_ADDR", CLAIMER),
            ("MC_ADMIN_PKEY", KEY),
            ("MC_TIER", "fan"),
            ("MC_NONCE_CODES", "abc def"),
        ]);
        let cfg = CouponConfig::from_lookup(&env).unwrap();
        assert_eq!(cfg.tiers, vec!["fan"]);
        assert_eq!(cfg.require_nonce_codes().unwrap(), ["abc", "def"]);
        assert_eq!(cfg.role_holder(), cfg.admin_key.address());
    }

    #[test]
    fn tiers_list_wins_over_single_tier() {
        let env = from_pairs(&[
            ("MC_CLAIMER_ADDR", CLAIMER),
            ("MC_ADMIN_PKEY", KEY),
            ("MC_TIER", "fan"),
            ("MC_TIERS", "moon planet"),
        ]);
        let cfg = CouponConfig::from_lookup(&env).unwrap();
        assert_eq!(cfg.tiers, vec!["moon", "planet"]);
        assert!(cfg.require_nonce_codes().is_err());
    }

    #[test]
    fn single_nonce_sources() {
        let base = [
            ("MC_CLAIMER_ADDR", CLAIMER),
            ("MC_ADMIN_PKEY", KEY),
            ("MC_TIERS", "fan"),
        ];
        let mut with_code = base.to_vec();
        with_code.push(("MC_NONCE_CODE", "abc"));
        with_code.push(("MC_NONCES", "n1 n2"));
        let cfg = CouponConfig::from_lookup(&from_pairs(&with_code)).unwrap();
        assert_eq!(cfg.single_nonce().unwrap(), "900150983cd24fb0d6963f7d28e17f72");

        let mut with_list = base.to_vec();
        with_list.push(("MC_NONCES", "n1 n2"));
        let cfg = CouponConfig::from_lookup(&from_pairs(&with_list)).unwrap();
        assert_eq!(cfg.single_nonce().unwrap(), "n1");

        let cfg = CouponConfig::from_lookup(&from_pairs(&base)).unwrap();
        assert!(cfg.single_nonce().is_err());
    }

    #[test]
    fn reports_missing_and_invalid_values() {
        let err = CouponConfig::from_lookup(&from_pairs(&[("MC_ADMIN_PKEY", KEY)])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(ref k) if k == "MC_CLAIMER_ADDR"));

        let err = CouponConfig::from_lookup(&from_pairs(&[
            ("MC_CLAIMER_ADDR", CLAIMER),
            ("MC_ADMIN_PKEY", "0x12"),
            ("MC_TIERS", "fan"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "MC_ADMIN_PKEY"));

        let err = CouponConfig::from_lookup(&from_pairs(&[
            ("MC_CLAIMER_ADDR", CLAIMER),
            ("MC_ADMIN_PKEY", KEY),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing(ref k) if k == "MC_TIERS"));
    }
}

//! Environment-driven configuration for the coupon tools.

pub mod contract;
pub mod coupon;

pub use contract::{ContractConfig, NetworkConfig};
pub use coupon::CouponConfig;

use std::str::FromStr;

use alloy::primitives::Address;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(String),
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Source of configuration values, normally the process environment
pub trait Lookup {
    fn get(&self, key: &str) -> Option<String>;
}

impl<F: Fn(&str) -> Option<String>> Lookup for F {
    fn get(&self, key: &str) -> Option<String> {
        self(key)
    }
}

pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Set and non-blank
pub(crate) fn optional(lookup: &impl Lookup, key: &str) -> Option<String> {
    lookup
        .get(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) fn required(lookup: &impl Lookup, key: &str) -> Result<String, ConfigError> {
    optional(lookup, key).ok_or_else(|| ConfigError::Missing(key.to_string()))
}

pub(crate) fn parse<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>().map_err(|e| ConfigError::Invalid {
        var: key.to_string(),
        reason: e.to_string(),
    })
}

/// Hex address; mixed-case input must carry a valid EIP-55 checksum
pub(crate) fn address(key: &str, raw: &str) -> Result<Address, ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        var: key.to_string(),
        reason,
    };
    let body = raw.strip_prefix("0x").unwrap_or(raw);
    let mixed_case = body.chars().any(|c| c.is_ascii_uppercase())
        && body.chars().any(|c| c.is_ascii_lowercase());
    if mixed_case {
        Address::parse_checksummed(format!("0x{body}"), None).map_err(|e| invalid(e.to_string()))
    } else {
        raw.parse::<Address>().map_err(|e| invalid(e.to_string()))
    }
}

/// Whitespace-separated list; empty when unset. Repeated separators
/// never yield empty items.
pub(crate) fn list(lookup: &impl Lookup, key: &str) -> Vec<String> {
    optional(lookup, key)
        .map(|v| v.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

#[cfg(test)]
pub(crate) fn from_pairs(pairs: &[(&str, &str)]) -> impl Lookup {
    let map: std::collections::HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key: &str| map.get(key).cloned()
}

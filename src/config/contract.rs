//! Contract and network configuration for the on-chain commands.

use std::collections::BTreeMap;

use alloy::primitives::Address;

use crate::eth_signing::AdminKey;
use crate::external_rpc::RpcConfig;

use super::{address, list, optional, parse, process_env, required, ConfigError, Lookup};

/// Polygon Mumbai testnet
pub const DEFAULT_RPC_URL: &str = "https://rpc-mumbai.maticvigil.com";
pub const DEFAULT_CHAIN_ID: u64 = 80001;

#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// MC_RPC_URL
    pub rpc_url: String,
    /// MC_CHAIN_ID
    pub chain_id: u64,
    /// MC_CONTRACT_ADDR
    pub contract: Address,
    /// MC_RPC_TIMEOUT_MS
    pub timeout_ms: Option<u64>,
}

impl NetworkConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&process_env)
    }

    pub fn from_lookup(env: &impl Lookup) -> Result<Self, ConfigError> {
        let chain_id = match optional(env, "MC_CHAIN_ID") {
            Some(v) => parse("MC_CHAIN_ID", &v)?,
            None => DEFAULT_CHAIN_ID,
        };
        let timeout_ms = optional(env, "MC_RPC_TIMEOUT_MS")
            .map(|v| parse("MC_RPC_TIMEOUT_MS", &v))
            .transpose()?;
        Ok(Self {
            rpc_url: optional(env, "MC_RPC_URL").unwrap_or_else(|| DEFAULT_RPC_URL.to_string()),
            chain_id,
            contract: address("MC_CONTRACT_ADDR", &required(env, "MC_CONTRACT_ADDR")?)?,
            timeout_ms,
        })
    }

    pub fn rpc(&self) -> RpcConfig {
        RpcConfig {
            rpc_url: self.rpc_url.clone(),
            timeout_ms: self.timeout_ms,
        }
    }
}

/// Settings for contract reconciliation
#[derive(Debug)]
pub struct ContractConfig {
    pub network: NetworkConfig,
    /// MC_ADMIN_PKEY, signs every corrective transaction
    pub admin_key: AdminKey,
    /// MC_ADMINS
    pub admins: Vec<Address>,
    /// MC_{CURRENCY}_ADDR per currency symbol
    pub currencies: BTreeMap<String, Address>,
}

impl ContractConfig {
    pub fn from_env(currencies: &[&str]) -> Result<Self, ConfigError> {
        Self::from_lookup(&process_env, currencies)
    }

    pub fn from_lookup(env: &impl Lookup, currencies: &[&str]) -> Result<Self, ConfigError> {
        let network = NetworkConfig::from_lookup(env)?;
        let admin_key = parse("MC_ADMIN_PKEY", &required(env, "MC_ADMIN_PKEY")?)?;

        let admins = list(env, "MC_ADMINS")
            .iter()
            .map(|a| address("MC_ADMINS", a))
            .collect::<Result<Vec<Address>, _>>()?;
        if admins.is_empty() {
            return Err(ConfigError::Missing("MC_ADMINS".to_string()));
        }

        let mut currency_addrs = BTreeMap::new();
        for symbol in currencies {
            let var = currency_var(symbol);
            let addr = address(&var, &required(env, &var)?)?;
            currency_addrs.insert(symbol.to_string(), addr);
        }

        Ok(Self {
            network,
            admin_key,
            admins,
            currencies: currency_addrs,
        })
    }

}

pub fn currency_var(symbol: &str) -> String {
    format!("MC_{symbol}_ADDR")
}

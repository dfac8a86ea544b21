//! Provider for the coupon contract's network.
//!
//! The HTTP transport is a plain `reqwest` client with the configured
//! timeout; nonce, gas and chain id filling plus signing come from the
//! provider's fillers and the admin wallet.

use std::time::Duration;

use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::client::RpcClient;
use alloy::sol_types::decode_revert_reason;
use alloy::transports::http::Http;
use alloy::transports::TransportError;
use anyhow::{Context, Result};
use reqwest::{Client, Url};

use crate::eth_signing::AdminKey;

pub const DEFAULT_TIMEOUT_MS: u64 = 8000;
/// Interval between receipt polls while a write is pending
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// RPC endpoint configuration
#[derive(Debug, Clone)]
pub struct RpcConfig {
    pub rpc_url: String,
    pub timeout_ms: Option<u64>,
}

/// Provider that signs with `signer` and talks to `cfg.rpc_url`
pub fn connect(cfg: &RpcConfig, signer: &AdminKey) -> Result<DynProvider> {
    let url: Url = cfg
        .rpc_url
        .parse()
        .with_context(|| format!("Invalid RPC url {}", cfg.rpc_url))?;
    let timeout = cfg.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS);
    let http = Client::builder()
        .timeout(Duration::from_millis(timeout))
        .build()?;

    let client = RpcClient::new(Http::with_client(http, url), false).with_poll_interval(POLL_INTERVAL);
    let provider = ProviderBuilder::new()
        .wallet(signer.wallet()?)
        .connect_client(client);
    tracing::debug!(url = %cfg.rpc_url, timeout_ms = timeout, signer = %signer.address(), "RPC provider ready");
    Ok(provider.erased())
}

/// Revert reason when the node rejected a call because execution reverted.
///
/// Nodes signal this with code 3 or a message mentioning the revert; the
/// reason comes from the revert payload when present, else the message.
pub fn revert_reason(err: &TransportError) -> Option<String> {
    let payload = err.as_error_resp()?;
    let reverted =
        payload.code == 3 || payload.message.to_ascii_lowercase().contains("revert");
    if !reverted {
        return None;
    }
    let reason = payload
        .as_revert_data()
        .and_then(|data| decode_revert_reason(&data))
        .unwrap_or_else(|| payload.message.to_string());
    Some(reason)
}

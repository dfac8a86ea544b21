//! Binding for the coupon/pricing contract entry points the tools use.

use std::time::Duration;

use alloy::network::ReceiptResponse;
use alloy::primitives::{keccak256, Address, Bytes, B256, U256};
use alloy::providers::{DynProvider, PendingTransactionError, Provider};
use alloy::rpc::types::TransactionRequest;
use alloy::sol;
use alloy::sol_types::{SolCall, SolType};
use alloy::transports::TransportError;
use async_trait::async_trait;
use thiserror::Error;

use crate::external_rpc::revert_reason;

pub use alloy::primitives::TxHash;

/// Upper bound on waiting for a sent write to be mined
const RECEIPT_TIMEOUT: Duration = Duration::from_secs(180);

sol! {
    interface ICouponContract {
        struct Coupon {
            string code;
            uint256 discount;
            uint256 limit;
            uint256 expiry;
            string tier;
        }

        function hasRole(bytes32 role, address account) external view returns (bool);
        function grantRole(bytes32 role, address account) external;
        function getCoupon(string code) external view returns (Coupon memory);
        function addCoupon(string code, uint256 discount, uint256 limit, uint256 expiry, string tier) external;
        function calcPrice(string coupon, address currency, string tier) external view returns (uint256);
        function addPrice(address currency, string tier, uint256 price) external;
    }
}

#[derive(Debug, Error)]
pub enum ContractError {
    #[error("execution reverted: {reason}")]
    Reverted { reason: String },
    #[error(transparent)]
    Transport(TransportError),
    #[error(transparent)]
    Pending(#[from] PendingTransactionError),
    #[error("undecodable {method} return data: {source}")]
    Decode {
        method: &'static str,
        #[source]
        source: alloy::sol_types::Error,
    },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ContractError {
    pub fn is_revert(&self) -> bool {
        matches!(self, ContractError::Reverted { .. })
    }
}

impl From<TransportError> for ContractError {
    fn from(err: TransportError) -> Self {
        match revert_reason(&err) {
            Some(reason) => ContractError::Reverted { reason },
            None => ContractError::Transport(err),
        }
    }
}

/// Access-control role id: keccak256 of the role name
pub fn role_id(name: &str) -> B256 {
    keccak256(name.as_bytes())
}

/// Coupon as stored by the contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouponRecord {
    pub code: String,
    pub discount: U256,
    /// Third `addCoupon` argument (25 for presale coupons)
    pub limit: U256,
    /// Fourth `addCoupon` argument (0 for presale coupons)
    pub expiry: U256,
    pub tier: String,
}

impl From<ICouponContract::Coupon> for CouponRecord {
    fn from(c: ICouponContract::Coupon) -> Self {
        Self {
            code: c.code,
            discount: c.discount,
            limit: c.limit,
            expiry: c.expiry,
            tier: c.tier,
        }
    }
}

impl CouponRecord {
    /// Decode a `getCoupon` reply, either as a returned struct (leading
    /// offset word of 32) or as the same fields returned flat.
    pub fn decode(data: &[u8]) -> Result<Self, ContractError> {
        type Fields = ICouponContract::Coupon;
        let wrapped = data
            .get(..32)
            .and_then(U256::try_from_be_slice)
            .is_some_and(|first| first == U256::from(32));
        let decoded = if wrapped {
            <Fields as SolType>::abi_decode(data)
        } else {
            <Fields as SolType>::abi_decode_params(data)
        };
        decoded.map(Self::from).map_err(|source| ContractError::Decode {
            method: ICouponContract::getCouponCall::SIGNATURE,
            source,
        })
    }
}

/// Entry points of the deployed coupon contract.
///
/// Reads are `eth_call`s; writes are sent and waited on.
#[async_trait]
pub trait CouponContract: Send {
    async fn has_role(&mut self, role: &B256, account: &Address) -> Result<bool, ContractError>;
    async fn grant_role(&mut self, role: &B256, account: &Address) -> Result<TxHash, ContractError>;
    async fn get_coupon(&mut self, code: &str) -> Result<CouponRecord, ContractError>;
    async fn add_coupon(&mut self, coupon: &CouponRecord) -> Result<TxHash, ContractError>;
    async fn calc_price(&mut self, coupon: &str, currency: &Address, tier: &str) -> Result<U256, ContractError>;
    async fn add_price(&mut self, currency: &Address, tier: &str, price: U256) -> Result<TxHash, ContractError>;
}

/// [`CouponContract`] over JSON-RPC, writing with the provider's wallet
pub struct RpcCouponContract {
    provider: DynProvider,
    address: Address,
    /// Sender for calls and writes
    from: Address,
}

impl RpcCouponContract {
    pub fn new(provider: DynProvider, address: Address, from: Address) -> Self {
        Self {
            provider,
            address,
            from,
        }
    }

    fn request<C: SolCall>(&self, call: &C) -> TransactionRequest {
        TransactionRequest::default()
            .from(self.from)
            .to(self.address)
            .input(Bytes::from(call.abi_encode()).into())
    }

    async fn read_raw<C: SolCall>(&self, call: &C) -> Result<Bytes, ContractError> {
        Ok(self.provider.call(self.request(call)).await?)
    }

    async fn read<C: SolCall>(&self, call: &C) -> Result<C::Return, ContractError> {
        let out = self.read_raw(call).await?;
        C::abi_decode_returns(&out).map_err(|source| ContractError::Decode {
            method: C::SIGNATURE,
            source,
        })
    }

    async fn write<C: SolCall>(&self, call: &C) -> Result<TxHash, ContractError> {
        let pending = self.provider.send_transaction(self.request(call)).await?;
        let tx_hash = *pending.tx_hash();
        tracing::info!(method = C::SIGNATURE, %tx_hash, "Transaction sent");

        let receipt = pending
            .with_timeout(Some(RECEIPT_TIMEOUT))
            .get_receipt()
            .await?;
        if !receipt.status() {
            return Err(ContractError::Reverted {
                reason: format!(
                    "transaction {tx_hash} failed in block {}",
                    receipt.block_number.unwrap_or_default()
                ),
            });
        }
        tracing::debug!(%tx_hash, block = ?receipt.block_number, gas_used = receipt.gas_used, "Transaction mined");
        Ok(tx_hash)
    }
}

#[async_trait]
impl CouponContract for RpcCouponContract {
    async fn has_role(&mut self, role: &B256, account: &Address) -> Result<bool, ContractError> {
        self.read(&ICouponContract::hasRoleCall {
            role: *role,
            account: *account,
        })
        .await
    }

    async fn grant_role(&mut self, role: &B256, account: &Address) -> Result<TxHash, ContractError> {
        self.write(&ICouponContract::grantRoleCall {
            role: *role,
            account: *account,
        })
        .await
    }

    async fn get_coupon(&mut self, code: &str) -> Result<CouponRecord, ContractError> {
        let out = self
            .read_raw(&ICouponContract::getCouponCall { code: code.to_string() })
            .await?;
        CouponRecord::decode(&out)
    }

    async fn add_coupon(&mut self, coupon: &CouponRecord) -> Result<TxHash, ContractError> {
        self.write(&add_coupon_call(coupon)).await
    }

    async fn calc_price(&mut self, coupon: &str, currency: &Address, tier: &str) -> Result<U256, ContractError> {
        self.read(&ICouponContract::calcPriceCall {
            coupon: coupon.to_string(),
            currency: *currency,
            tier: tier.to_string(),
        })
        .await
    }

    async fn add_price(&mut self, currency: &Address, tier: &str, price: U256) -> Result<TxHash, ContractError> {
        self.write(&ICouponContract::addPriceCall {
            currency: *currency,
            tier: tier.to_string(),
            price,
        })
        .await
    }
}

fn add_coupon_call(coupon: &CouponRecord) -> ICouponContract::addCouponCall {
    ICouponContract::addCouponCall {
        code: coupon.code.clone(),
        discount: coupon.discount,
        limit: coupon.limit,
        expiry: coupon.expiry,
        tier: coupon.tier.clone(),
    }
}

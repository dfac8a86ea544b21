//! Magic coupon tooling for the coupon/pricing contract.
//!
//! Coupons are `nonce || base64(sig)`, where the admin key signs
//! `keccak256(claimer || tier || nonce)` as an Ethereum personal message.
//! The rest of the crate is the plumbing the two binaries need: nonce
//! derivation, a registry audit, a contract binding over an alloy provider
//! and the role/coupon/price reconciliation.

pub mod config;
pub mod contract;
pub mod coupon;
pub mod eth_signing;
pub mod external_rpc;
pub mod logging;
pub mod nonce;
pub mod reconcile;
pub mod registry;

pub use alloy::primitives::Address;
pub use coupon::{magic_coupon, AuditReport, CouponIssuer, MagicCoupon};
pub use eth_signing::AdminKey;
pub use nonce::{derive_nonces, Nonce, NonceVariant};
pub use registry::KnownRegistry;

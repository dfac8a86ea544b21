//! Reconciliation of on-chain roles, presale coupons and prices against the
//! desired tables.
//!
//! Every check-then-write pair stands alone; nothing is atomic across the
//! run. A `calcPrice` revert counts as "no price set".

use std::collections::BTreeMap;
use std::fmt;

use alloy::primitives::{Address, U256};
use anyhow::{anyhow, Context, Result};

use crate::contract::{role_id, ContractError, CouponContract, CouponRecord};

pub const MAGIC_COUPON_ADMIN_ROLE: &str = "MAGIC_COUPON_ADMIN_ROLE";

pub const ROLES: [&str; 4] = [
    "COUPON_ADMIN_ROLE",
    "PRICE_ADMIN_ROLE",
    MAGIC_COUPON_ADMIN_ROLE,
    "MINTER_ADMIN_ROLE",
];

pub const CURRENCIES: [&str; 3] = ["COMN", "BTCC1", "BTCC2"];

/// Discount percent of the presale coupon per tier; "" is the tierless coupon
pub const COUPON_DISCOUNTS: [(&str, u64); 8] = [
    ("", 15),
    ("fan", 25),
    ("player", 20),
    ("playerx", 30),
    ("producer", 40),
    ("producerx", 50),
    ("moon", 50),
    ("planet", 50),
];

pub const PRESALE_COUPON_LIMIT: u64 = 25;
pub const PRESALE_COUPON_EXPIRY: u64 = 0;

const TOKEN_DECIMALS: u64 = 18;

/// Whole tokens in base units
pub fn token_units(whole: u64) -> U256 {
    U256::from(whole) * U256::from(10u64).pow(U256::from(TOKEN_DECIMALS))
}

/// Tier price in whole tokens, in [`CURRENCIES`] order
pub const PRICES: [(&str, [u64; 3]); 7] = [
    ("fan", [30, 45, 60]),
    ("player", [100, 150, 200]),
    ("playerx", [200, 300, 400]),
    ("producer", [1_000, 1_500, 2_000]),
    ("producerx", [2_000, 3_000, 4_000]),
    ("moon", [15_000, 21_000, 30_000]),
    ("planet", [50_000, 75_000, 100_000]),
];

pub fn presale_coupon(tier: &str, discount: u64) -> CouponRecord {
    CouponRecord {
        code: format!("PRESALE{discount}{}", tier.to_uppercase()),
        discount: U256::from(discount),
        limit: U256::from(PRESALE_COUPON_LIMIT),
        expiry: U256::from(PRESALE_COUPON_EXPIRY),
        tier: tier.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceEntry {
    pub tier: String,
    pub currency: String,
    /// Base units (18 decimals)
    pub price: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredState {
    pub roles: Vec<String>,
    pub coupons: Vec<CouponRecord>,
    pub prices: Vec<PriceEntry>,
}

impl DesiredState {
    /// The presale configuration
    pub fn presale() -> Self {
        let prices = PRICES
            .iter()
            .flat_map(|(tier, amounts)| {
                CURRENCIES.iter().zip(amounts).map(move |(currency, whole)| PriceEntry {
                    tier: tier.to_string(),
                    currency: currency.to_string(),
                    price: token_units(*whole),
                })
            })
            .collect();
        Self {
            roles: ROLES.iter().map(|r| r.to_string()).collect(),
            coupons: COUPON_DISCOUNTS
                .iter()
                .map(|(tier, discount)| presale_coupon(tier, *discount))
                .collect(),
            prices,
        }
    }
}

/// What `calcPrice` reported before a price write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriceObservation {
    Differs(U256),
    Reverted(String),
}

/// A corrective write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    GrantRole {
        role: String,
        admin: Address,
    },
    AddCoupon {
        coupon: CouponRecord,
        observed: CouponRecord,
    },
    AddPrice {
        entry: PriceEntry,
        currency: Address,
        observed: PriceObservation,
    },
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::GrantRole { role, admin } => write!(f, "granting role {role} to {admin}"),
            Action::AddCoupon { coupon, observed } => write!(
                f,
                "adding coupon {} (code={:?}, discount={}, limit={}, expiry={}, tier={:?})",
                coupon.code, observed.code, observed.discount, observed.limit, observed.expiry, observed.tier
            ),
            Action::AddPrice { entry, .. } => {
                write!(f, "adding price {} {}", entry.currency, entry.tier)
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReconcileReport {
    pub checks: usize,
    pub actions: Vec<Action>,
    /// Actions whose write was sent and mined
    pub applied: usize,
}

impl ReconcileReport {
    pub fn summary(&self) -> String {
        format!(
            "{} corrections out of {} checks, {} applied",
            self.actions.len(),
            self.checks,
            self.applied
        )
    }
}

pub struct Reconciler<'a, C: CouponContract> {
    contract: &'a mut C,
    dry_run: bool,
}

impl<'a, C: CouponContract> Reconciler<'a, C> {
    pub fn new(contract: &'a mut C) -> Self {
        Self {
            contract,
            dry_run: false,
        }
    }

    /// Perform every read, report writes without sending them
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Bring the contract in line with `desired`. `on_action` sees each
    /// correction before its write is sent.
    pub async fn run(
        &mut self,
        desired: &DesiredState,
        admins: &[Address],
        currencies: &BTreeMap<String, Address>,
        mut on_action: impl FnMut(&Action),
    ) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::default();

        for role in &desired.roles {
            let id = role_id(role);
            for admin in admins {
                report.checks += 1;
                let granted = self
                    .contract
                    .has_role(&id, admin)
                    .await
                    .with_context(|| format!("hasRole({role}, {admin})"))?;
                if granted {
                    continue;
                }
                let action = Action::GrantRole {
                    role: role.clone(),
                    admin: *admin,
                };
                on_action(&action);
                if !self.dry_run {
                    self.contract
                        .grant_role(&id, admin)
                        .await
                        .with_context(|| format!("grantRole({role}, {admin})"))?;
                    report.applied += 1;
                }
                report.actions.push(action);
            }
        }

        for coupon in &desired.coupons {
            report.checks += 1;
            let observed = self
                .contract
                .get_coupon(&coupon.code)
                .await
                .with_context(|| format!("getCoupon({})", coupon.code))?;
            if observed.tier == coupon.tier && observed.discount == coupon.discount {
                continue;
            }
            let action = Action::AddCoupon {
                coupon: coupon.clone(),
                observed,
            };
            on_action(&action);
            if !self.dry_run {
                self.contract
                    .add_coupon(coupon)
                    .await
                    .with_context(|| format!("addCoupon({})", coupon.code))?;
                report.applied += 1;
            }
            report.actions.push(action);
        }

        for entry in &desired.prices {
            report.checks += 1;
            let currency = *currencies
                .get(&entry.currency)
                .ok_or_else(|| anyhow!("No address configured for currency {}", entry.currency))?;
            let observed = match self.contract.calc_price("", &currency, &entry.tier).await {
                Ok(price) if price == entry.price => continue,
                Ok(price) => PriceObservation::Differs(price),
                Err(ContractError::Reverted { reason }) => {
                    tracing::warn!(
                        tier = %entry.tier,
                        currency = %entry.currency,
                        %reason,
                        "calcPrice reverted, treating price as unset"
                    );
                    PriceObservation::Reverted(reason)
                }
                Err(e) => {
                    return Err(anyhow::Error::new(e)
                        .context(format!("calcPrice({}, {})", entry.currency, entry.tier)))
                }
            };
            let action = Action::AddPrice {
                entry: entry.clone(),
                currency,
                observed,
            };
            on_action(&action);
            if !self.dry_run {
                self.contract
                    .add_price(&currency, &entry.tier, entry.price)
                    .await
                    .with_context(|| format!("addPrice({}, {})", entry.currency, entry.tier))?;
                report.applied += 1;
            }
            report.actions.push(action);
        }

        tracing::info!(
            checks = report.checks,
            corrections = report.actions.len(),
            applied = report.applied,
            dry_run = self.dry_run,
            "Reconciliation finished"
        );
        Ok(report)
    }
}

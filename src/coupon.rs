//! Magic coupon derivation, signing and registry audit.
//!
//! A coupon is `nonce || base64(sig)` where `sig` is the admin's 65-byte
//! personal-message signature over `keccak256(claimer || tier || nonce)`.

use std::fmt;
use std::fs;
use std::path::Path;

use alloy::primitives::{keccak256, Address, B256};
use alloy::sol_types::SolValue;
use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;

use crate::eth_signing::{to_hex_prefixed, AdminKey};
use crate::nonce::{derive_nonces, nonce_digest, Nonce};
use crate::registry::KnownRegistry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MagicCoupon {
    pub tier: String,
    pub nonce: String,
    pub hash: B256,
    pub code: String,
}

impl MagicCoupon {
    pub fn hash_hex(&self) -> String {
        to_hex_prefixed(&self.hash)
    }
}

/// keccak256(abi.encodePacked(claimer, tier + nonce))
pub fn coupon_hash(claimer: &Address, tier: &str, nonce: &str) -> B256 {
    keccak256((*claimer, format!("{tier}{nonce}")).abi_encode_packed())
}

pub fn magic_coupon(
    claimer: &Address,
    admin: &AdminKey,
    tier: &str,
    nonce: &str,
) -> Result<MagicCoupon> {
    let hash = coupon_hash(claimer, tier, nonce);
    let sig = admin
        .sign_message(hash.as_slice())
        .with_context(|| format!("Failed to sign coupon for nonce {nonce}"))?;
    let code = format!("{}{}", nonce, STANDARD.encode(sig.to_bytes()));
    Ok(MagicCoupon {
        tier: tier.to_string(),
        nonce: nonce.to_string(),
        hash,
        code,
    })
}

/// One line of audit output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditEvent {
    MissingNonce(Nonce),
    MissingHash { hash: String, nonce: String },
    MissingCoupon(String),
}

impl fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditEvent::MissingNonce(n) => write!(f, "{}=\"{}\",", n.variant.label(), n.value),
            AuditEvent::MissingHash { hash, nonce } => {
                write!(f, "hash=\"{hash}\" for nonce={nonce}")
            }
            AuditEvent::MissingCoupon(code) => write!(f, "magicCoupon=\"{code}\","),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AuditReport {
    pub events: Vec<AuditEvent>,
    pub coupons: Vec<MagicCoupon>,
    pub failed: usize,
    pub total: usize,
}

impl AuditReport {
    pub fn missing_hashes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.events.iter().filter_map(|e| match e {
            AuditEvent::MissingHash { hash, nonce } => Some((hash.as_str(), nonce.as_str())),
            _ => None,
        })
    }

    pub fn summary(&self) -> String {
        format!("failed {} out of {}", self.failed, self.total)
    }
}

/// Signs coupons for one claimer and checks them against a registry
pub struct CouponIssuer<'a> {
    claimer: Address,
    admin: &'a AdminKey,
    registry: &'a KnownRegistry,
}

impl<'a> CouponIssuer<'a> {
    pub fn new(claimer: Address, admin: &'a AdminKey, registry: &'a KnownRegistry) -> Self {
        Self {
            claimer,
            admin,
            registry,
        }
    }

    /// Generate one coupon; a hash absent from the registry is reported, never fatal.
    pub fn issue(&self, tier: &str, nonce: &str, report: &mut AuditReport) -> Result<MagicCoupon> {
        let coupon = magic_coupon(&self.claimer, self.admin, tier, nonce)?;
        let hash = coupon.hash_hex();
        if !self.registry.contains(&hash) {
            tracing::debug!(%hash, nonce, tier, "Coupon hash not in registry");
            report.events.push(AuditEvent::MissingHash {
                hash,
                nonce: nonce.to_string(),
            });
        }
        Ok(coupon)
    }

    /// Derive both nonce variants per secret and sign a coupon for each tier.
    pub fn audit(&self, secrets: &[String], tiers: &[String]) -> Result<AuditReport> {
        let mut report = AuditReport::default();
        let mut nonces = Vec::with_capacity(secrets.len() * 2);
        for secret in secrets {
            for nonce in derive_nonces(secret) {
                if !self.registry.contains(&nonce.value) {
                    report.events.push(AuditEvent::MissingNonce(nonce.clone()));
                }
                nonces.push(nonce);
            }
        }

        for nonce in &nonces {
            for tier in tiers {
                report.total += 1;
                let coupon = self.issue(tier, &nonce.value, &mut report)?;
                if !self.registry.contains(&coupon.code) {
                    report.failed += 1;
                    report.events.push(AuditEvent::MissingCoupon(coupon.code.clone()));
                }
                report.coupons.push(coupon);
            }
        }

        tracing::info!(
            secrets = secrets.len(),
            tiers = tiers.len(),
            failed = report.failed,
            total = report.total,
            "Coupon audit finished"
        );
        Ok(report)
    }
}

/// Raw nonces followed by one coupon per (nonce, tier), in that order.
pub fn export_entries(
    claimer: &Address,
    admin: &AdminKey,
    secrets: &[String],
    tiers: &[String],
) -> Result<Vec<String>> {
    let nonces: Vec<String> = secrets.iter().map(|s| nonce_digest(s)).collect();
    let mut entries = nonces.clone();
    for nonce in &nonces {
        for tier in tiers {
            entries.push(magic_coupon(claimer, admin, tier, nonce)?.code);
        }
    }
    Ok(entries)
}

/// Write the export list as JSON indented by four spaces; the file loads
/// back as a [`KnownRegistry`].
pub fn write_export(path: &Path, entries: &[String]) -> Result<()> {
    write_json_4(path, &entries)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), entries = entries.len(), "Wrote nonces and coupons");
    Ok(())
}

fn write_json_4<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    fs::write(path, buf)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
    const CLAIMER: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

    fn setup() -> (Address, AdminKey) {
        (CLAIMER.parse().unwrap(), KEY.parse().unwrap())
    }

    #[test]
    fn coupon_layout() {
        let (claimer, admin) = setup();
        let c = magic_coupon(&claimer, &admin, "fan", "900150983cd24fb0d6963f7d28e17f72").unwrap();
        assert!(c.code.starts_with("900150983cd24fb0d6963f7d28e17f72"));
        let sig = STANDARD.decode(&c.code[32..]).unwrap();
        assert_eq!(sig.len(), 65);
        // 65 bytes -> 88 base64 chars with padding
        assert_eq!(c.code.len(), 32 + 88);
        assert_eq!(c.hash_hex().len(), 66);
    }

    #[test]
    fn missing_hash_event_format() {
        let ev = AuditEvent::MissingHash {
            hash: "0xab".into(),
            nonce: "n1".into(),
        };
        assert_eq!(ev.to_string(), "hash=\"0xab\" for nonce=n1");
        assert_eq!(
            AuditEvent::MissingCoupon("c".into()).to_string(),
            "magicCoupon=\"c\","
        );
    }

    #[test]
    fn export_orders_nonces_before_coupons() {
        let (claimer, admin) = setup();
        let secrets = vec!["abc".to_string(), "def".to_string()];
        let tiers = vec!["fan".to_string(), "moon".to_string()];
        let entries = export_entries(&claimer, &admin, &secrets, &tiers).unwrap();
        assert_eq!(entries.len(), 2 + 4);
        assert_eq!(entries[0], "900150983cd24fb0d6963f7d28e17f72");
        assert!(entries[2].starts_with(&entries[0]));
        assert!(entries[4].starts_with(&entries[1]));
    }

    #[test]
    fn export_file_is_four_space_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nonces_coupons.json");
        write_export(&path, &["a".to_string(), "b".to_string()]).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "[\n    \"a\",\n    \"b\"\n]");
    }
}

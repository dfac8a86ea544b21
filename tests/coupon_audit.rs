//! Coupon generation properties and registry audit reporting.

use alloy::primitives::{eip191_hash_message, keccak256};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use magic_coupon::coupon::{coupon_hash, export_entries, write_export, AuditEvent};
use magic_coupon::eth_signing::Signature65;
use magic_coupon::{derive_nonces, magic_coupon, Address, AdminKey, CouponIssuer, KnownRegistry};

const ADMIN_KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
const CLAIMER: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
const OTHER_CLAIMER: &str = "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf";

fn admin() -> AdminKey {
    ADMIN_KEY.parse().unwrap()
}

fn claimer() -> Address {
    CLAIMER.parse().unwrap()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn coupon_is_deterministic() {
    let admin = admin();
    let a = magic_coupon(&claimer(), &admin, "fan", "900150983cd24fb0d6963f7d28e17f72").unwrap();
    let b = magic_coupon(&claimer(), &admin, "fan", "900150983cd24fb0d6963f7d28e17f72").unwrap();
    assert_eq!(a, b);
}

#[test]
fn coupon_signature_recovers_admin() {
    let admin = admin();
    let nonce = "r00150983cd24fb0d6963f7d28e17f72";
    let coupon = magic_coupon(&claimer(), &admin, "moon", nonce).unwrap();

    let encoded = coupon.code.strip_prefix(nonce).unwrap();
    let sig = Signature65::from_bytes(&STANDARD.decode(encoded).unwrap()).unwrap();
    let signer = sig.recover(&eip191_hash_message(coupon.hash)).unwrap();
    assert_eq!(signer, admin.address());
}

#[test]
fn every_input_changes_the_hash() {
    let base = coupon_hash(&claimer(), "fan", "abc");
    let other: Address = OTHER_CLAIMER.parse().unwrap();
    assert_ne!(base, coupon_hash(&other, "fan", "abc"));
    assert_ne!(base, coupon_hash(&claimer(), "player", "abc"));
    assert_ne!(base, coupon_hash(&claimer(), "fan", "abd"));
}

#[test]
fn hash_matches_packed_layout() {
    let mut packed = claimer().as_slice().to_vec();
    packed.extend_from_slice(b"fan900150983cd24fb0d6963f7d28e17f72");
    assert_eq!(
        coupon_hash(&claimer(), "fan", "900150983cd24fb0d6963f7d28e17f72"),
        keccak256(&packed)
    );
}

#[test]
fn missing_hash_reported_once_per_nonce() {
    let admin = admin();
    let registry = KnownRegistry::default();
    let issuer = CouponIssuer::new(claimer(), &admin, &registry);
    let report = issuer.audit(&strings(&["abc"]), &strings(&["fan"])).unwrap();

    let missing: Vec<_> = report.missing_hashes().collect();
    assert_eq!(missing.len(), 2);
    let [raw, marked] = derive_nonces("abc");
    assert_eq!(missing[0].1, raw.value);
    assert_eq!(missing[1].1, marked.value);
    assert_eq!(report.total, 2);
    assert_eq!(report.failed, 2);
    assert_eq!(report.summary(), "failed 2 out of 2");
}

#[test]
fn known_entries_are_silent() {
    let admin = admin();
    let secrets = strings(&["abc"]);
    let tiers = strings(&["fan"]);

    // first pass over an empty registry yields everything to record
    let empty = KnownRegistry::default();
    let first = CouponIssuer::new(claimer(), &admin, &empty)
        .audit(&secrets, &tiers)
        .unwrap();
    let mut known: Vec<String> = derive_nonces("abc").iter().map(|n| n.value.clone()).collect();
    for coupon in &first.coupons {
        known.push(coupon.hash_hex());
        known.push(coupon.code.clone());
    }

    let registry: KnownRegistry = known.into_iter().collect();
    let report = CouponIssuer::new(claimer(), &admin, &registry)
        .audit(&secrets, &tiers)
        .unwrap();
    assert!(report.events.is_empty());
    assert_eq!(report.failed, 0);
    assert_eq!(report.summary(), "failed 0 out of 2");
}

#[test]
fn partial_registry_reports_only_the_gap() {
    let admin = admin();
    let [raw, marked] = derive_nonces("abc");
    let known_hash = magic_coupon(&claimer(), &admin, "fan", &raw.value).unwrap().hash_hex();
    let registry: KnownRegistry = vec![raw.value.clone(), known_hash].into_iter().collect();

    let report = CouponIssuer::new(claimer(), &admin, &registry)
        .audit(&strings(&["abc"]), &strings(&["fan"]))
        .unwrap();

    assert_eq!(report.events[0], AuditEvent::MissingNonce(marked.clone()));
    let missing: Vec<_> = report.missing_hashes().map(|(_, n)| n.to_string()).collect();
    assert_eq!(missing, vec![marked.value.clone()]);
    assert_eq!(report.events[0].to_string(), format!("_nonce2=\"{}\",", marked.value));
}

#[test]
fn audit_covers_every_tier() {
    let admin = admin();
    let registry = KnownRegistry::default();
    let report = CouponIssuer::new(claimer(), &admin, &registry)
        .audit(&strings(&["abc", "xyz"]), &strings(&["fan", "moon", "planet"]))
        .unwrap();
    assert_eq!(report.total, 2 * 2 * 3);
    assert_eq!(report.coupons.len(), 12);
    assert_eq!(report.missing_hashes().count(), 12);
}

#[test]
fn exported_file_feeds_the_audit() {
    let admin = admin();
    let secrets = strings(&["abc", "xyz"]);
    let tiers = strings(&["fan", "moon"]);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nonces_coupons.json");

    let entries = export_entries(&claimer(), &admin, &secrets, &tiers).unwrap();
    write_export(&path, &entries).unwrap();
    let registry = KnownRegistry::load(&path).unwrap();
    assert_eq!(registry.len(), 2 + 4);

    let report = CouponIssuer::new(claimer(), &admin, &registry)
        .audit(&secrets, &tiers)
        .unwrap();

    // raw nonces and their coupons are known; only the marked variants remain
    let raw: Vec<String> = secrets.iter().map(|s| derive_nonces(s)[0].value.clone()).collect();
    for event in &report.events {
        match event {
            AuditEvent::MissingNonce(n) => assert!(!raw.contains(&n.value)),
            AuditEvent::MissingCoupon(code) => assert!(!raw.iter().any(|n| code.starts_with(n.as_str()))),
            AuditEvent::MissingHash { .. } => {}
        }
    }
    let raw_coupons = report
        .coupons
        .iter()
        .filter(|c| raw.contains(&c.nonce))
        .filter(|c| !registry.contains(&c.code))
        .count();
    assert_eq!(raw_coupons, 0);
    assert_eq!(report.total, 2 * 2 * 2);
    assert_eq!(report.summary(), "failed 4 out of 8");
}

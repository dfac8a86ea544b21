use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use magic_coupon::config::{CouponConfig, NetworkConfig};
use magic_coupon::contract::{role_id, CouponContract, RpcCouponContract};
use magic_coupon::coupon::{export_entries, magic_coupon, write_export, CouponIssuer};
use magic_coupon::eth_signing::to_hex_prefixed;
use magic_coupon::external_rpc;
use magic_coupon::reconcile::MAGIC_COUPON_ADMIN_ROLE;
use magic_coupon::{logging, KnownRegistry};

// ========= CLI =========

#[derive(Parser, Debug)]
#[command(name = "make-magic-coupons", version, about = "Magic coupon generator")]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sign coupons for every MC_NONCE_CODES secret (both nonce variants) and
    /// report anything missing from the known registry
    Audit {
        /// Known registry JSON (object keys or array of strings)
        #[arg(long, default_value = "data.json")]
        registry: PathBuf,
    },

    /// Write raw nonces followed by their coupons for every tier as a JSON array
    Export {
        /// Output path
        #[arg(long, default_value = "nonces_coupons.json")]
        out: PathBuf,
    },

    /// Sign one coupon for the first tier (nonce from MC_NONCE_CODE or MC_NONCES)
    Sign {
        /// Skip the on-chain MAGIC_COUPON_ADMIN_ROLE check
        #[arg(long, default_value_t = false)]
        offline: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();
    let cfg = CouponConfig::from_env()?;
    tracing::debug!(claimer = %cfg.claimer, admin = %cfg.admin_key.address(), tiers = ?cfg.tiers, "Coupon config loaded");

    match cli.cmd {
        Commands::Audit { registry } => {
            let registry = KnownRegistry::load(&registry)?;
            if registry.is_empty() {
                tracing::warn!("Known registry is empty, every entry will be reported");
            }
            let issuer = CouponIssuer::new(cfg.claimer, &cfg.admin_key, &registry);
            let report = issuer.audit(cfg.require_nonce_codes()?, &cfg.tiers)?;
            for event in &report.events {
                println!("{event}");
            }
            println!("{}", report.summary());
        }

        Commands::Export { out } => {
            let entries = export_entries(
                &cfg.claimer,
                &cfg.admin_key,
                cfg.require_nonce_codes()?,
                &cfg.tiers,
            )?;
            write_export(&out, &entries)?;
        }

        Commands::Sign { offline } => {
            let tier = &cfg.tiers[0];
            let nonce = cfg.single_nonce()?;
            let role = role_id(MAGIC_COUPON_ADMIN_ROLE);
            println!("_magicCouponRole {}", to_hex_prefixed(&role));

            if !offline {
                let network = NetworkConfig::from_env()?;
                let provider = external_rpc::connect(&network.rpc(), &cfg.admin_key)?;
                let mut contract =
                    RpcCouponContract::new(provider, network.contract, cfg.admin_key.address());
                let holder = cfg.role_holder();
                if !contract
                    .has_role(&role, &holder)
                    .await
                    .with_context(|| format!("hasRole({MAGIC_COUPON_ADMIN_ROLE}, {holder})"))?
                {
                    tracing::warn!(
                        account = %holder,
                        "the specified account doesn't have the role required to perform this action"
                    );
                    return Ok(());
                }
            }

            let coupon = magic_coupon(&cfg.claimer, &cfg.admin_key, tier, &nonce)?;
            println!(
                "_claimerAddr {} _magicCoupon {} _tier {} _nonce {}",
                cfg.claimer, coupon.code, coupon.tier, coupon.nonce
            );
        }
    }

    Ok(())
}

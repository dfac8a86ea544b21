use alloy::providers::Provider;
use anyhow::Result;
use clap::Parser;

use magic_coupon::config::ContractConfig;
use magic_coupon::contract::RpcCouponContract;
use magic_coupon::external_rpc;
use magic_coupon::logging;
use magic_coupon::reconcile::{DesiredState, Reconciler, CURRENCIES};

#[derive(Parser, Debug)]
#[command(
    name = "update-contract",
    version,
    about = "Grant admin roles and set presale coupons and prices on the coupon contract"
)]
struct Cli {
    /// Read on-chain state and print the corrections without sending transactions
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();
    let cfg = ContractConfig::from_env(&CURRENCIES)?;

    let provider = external_rpc::connect(&cfg.network.rpc(), &cfg.admin_key)?;
    let chain_id = provider.get_chain_id().await?;
    if chain_id != cfg.network.chain_id {
        anyhow::bail!(
            "RPC endpoint {} is on chain {}, expected {}",
            cfg.network.rpc_url,
            chain_id,
            cfg.network.chain_id
        );
    }
    tracing::info!(
        contract = %cfg.network.contract,
        signer = %cfg.admin_key.address(),
        chain_id,
        admins = cfg.admins.len(),
        "Reconciling contract state"
    );

    let mut contract =
        RpcCouponContract::new(provider, cfg.network.contract, cfg.admin_key.address());
    let report = Reconciler::new(&mut contract)
        .dry_run(cli.dry_run)
        .run(
            &DesiredState::presale(),
            &cfg.admins,
            &cfg.currencies,
            |action| println!("{action}"),
        )
        .await?;
    println!("{}", report.summary());
    Ok(())
}

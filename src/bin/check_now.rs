//! Run one resolution check against the configured chain and exit.
//!
//! Usage: check_now [config.toml]

use std::env;
use std::sync::Arc;

use anyhow::Context;

use agririsk_keeper::clock::SystemClock;
use agririsk_keeper::config::Config;
use agririsk_keeper::contracts::ChainContractService;
use agririsk_keeper::logging;
use agririsk_keeper::service::{AutoResolutionService, MarketService};
use agririsk_keeper::strategy::SimulatedOracle;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let path = env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let cfg = Config::load(&path).with_context(|| format!("Failed to load {}", path))?;
    logging::init(&cfg.general.log_level);

    let contracts = ChainContractService::connect(
        &cfg.rpc_url()?,
        cfg.private_key()?,
        cfg.network.chain_id,
        cfg.contract_addresses()?,
    )
    .await?;

    let markets = Arc::new(MarketService::with_options(
        Arc::new(contracts),
        cfg.cache_duration(),
        Arc::new(SystemClock),
    ));
    let resolver = AutoResolutionService::new(markets, Arc::new(SimulatedOracle::new()), cfg.resolution_config());

    let report = resolver
        .trigger_check()
        .await
        .context("a check was already in flight")?;

    println!("Examined: {}", report.examined);
    println!("Expired:  {:?}", report.expired);
    for (market_id, outcome) in &report.resolved {
        println!("Resolved: market {} -> {}", market_id, outcome);
    }
    if !report.failed.is_empty() {
        println!("Failed:   {:?}", report.failed);
    }
    Ok(())
}

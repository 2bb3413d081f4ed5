use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use agririsk_keeper::clock::SystemClock;
use agririsk_keeper::config::Config;
use agririsk_keeper::contracts::{ChainContractService, ContractService};
use agririsk_keeper::events::Event;
use agririsk_keeper::logging;
use agririsk_keeper::service::{AutoResolutionService, MarketService};
use agririsk_keeper::strategy::SimulatedOracle;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = Config::load("config.toml").context("Failed to load config")?;
    logging::init(&cfg.general.log_level);
    info!("Loaded config: {:?}", cfg);

    let rpc_url = cfg.rpc_url()?;
    let contracts = ChainContractService::connect(
        &rpc_url,
        cfg.private_key()?,
        cfg.network.chain_id,
        cfg.contract_addresses()?,
    )
    .await
    .context("Failed to bind contracts")?;
    info!("Keeper account: {}", contracts.signer_address());

    let contracts: Arc<dyn ContractService> = Arc::new(contracts);
    match contracts.check_linkage().await {
        Ok(linkage) if !linkage.is_complete() => {
            warn!("Contracts are not fully linked: {:?}", linkage);
        }
        Ok(_) => {}
        Err(e) => warn!("Unable to verify contract linkage: {}", e),
    }

    let markets = Arc::new(MarketService::with_options(
        contracts,
        cfg.cache_duration(),
        Arc::new(SystemClock),
    ));
    let stats = markets.get_dashboard_stats().await;
    info!(
        "{} markets ({} open, {} resolving, {} closed), {} staked",
        stats.active_markets,
        stats.open_markets,
        stats.resolving_markets,
        stats.closed_markets,
        stats.total_staked_display
    );

    // Create the event channel
    let (tx, mut rx) = mpsc::channel::<Event>(100);

    let resolver = Arc::new(
        AutoResolutionService::new(
            Arc::clone(&markets),
            Arc::new(SimulatedOracle::new()),
            cfg.resolution_config(),
        )
        .with_events(tx.clone()),
    );
    resolver.start();

    let shutdown_tx = tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(Event::Shutdown).await;
        }
    });
    drop(tx);

    // Main event loop
    info!("Keeper running (Ctrl+C to quit)");
    while let Some(event) = rx.recv().await {
        match event {
            Event::CheckCompleted {
                examined,
                expired,
                resolved,
                failed,
            } => {
                info!(
                    "Check done: {} markets, {} expired, {} resolved, {} failed",
                    examined, expired, resolved, failed
                );
            }
            Event::CheckSkipped => {}
            Event::MarketResolved {
                market_id,
                outcome,
                tx_hash,
            } => {
                info!("Market {} resolved {} ({})", market_id, outcome, tx_hash);
            }
            Event::ResolutionFailed { market_id, error } => {
                error!("Market {} not resolved: {}", market_id, error);
            }
            Event::Shutdown => {
                info!("Shutting down...");
                break;
            }
        }
    }

    resolver.stop();
    Ok(())
}

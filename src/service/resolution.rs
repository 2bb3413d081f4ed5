use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::MarketService;
use crate::clock::{Clock, SystemClock};
use crate::contracts::{ContractError, ContractService, TxHash};
use crate::events::Event;
use crate::state::{Market, MarketStatus};
use crate::strategy::{
    decide_outcome, Basis, Oracle, OracleError, Outcome, ResolutionConfig, ResolutionConfigUpdate,
};

/// Shortest period the timer runs at; shorter configured intervals are raised to it.
pub const MIN_CHECK_INTERVAL: time::Duration = time::Duration::from_secs(1);

/// Summary of one check pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckReport {
    /// Markets looked at
    pub examined: usize,
    /// Open markets past their end time
    pub expired: Vec<u64>,
    pub resolved: Vec<(u64, Outcome)>,
    pub failed: Vec<u64>,
}

#[derive(Debug, Error)]
enum ResolveError {
    #[error(transparent)]
    Oracle(#[from] OracleError),
    #[error(transparent)]
    Contract(#[from] ContractError),
}

/// Clears the in-flight flag when a check ends, however it ends.
struct FlightGuard<'a>(&'a AtomicBool);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Periodically resolves open markets whose end time has passed.
///
/// Stopped until `start`. At most one check runs at a time: a tick or manual
/// trigger that arrives while a check is in flight is skipped. A failed
/// resolution is not retried within the pass; the market is still open and
/// expired on the next tick, so it is picked up again then.
pub struct AutoResolutionService {
    markets: Arc<MarketService>,
    contracts: Arc<dyn ContractService>,
    oracle: Arc<dyn Oracle>,
    clock: Arc<dyn Clock>,
    config: RwLock<ResolutionConfig>,
    in_flight: AtomicBool,
    events: Option<mpsc::Sender<Event>>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl AutoResolutionService {
    pub fn new(markets: Arc<MarketService>, oracle: Arc<dyn Oracle>, config: ResolutionConfig) -> Self {
        let contracts = Arc::clone(markets.contracts());
        Self {
            markets,
            contracts,
            oracle,
            clock: Arc::new(SystemClock),
            config: RwLock::new(config),
            in_flight: AtomicBool::new(false),
            events: None,
            timer: Mutex::new(None),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Report check results and resolutions on `tx`.
    pub fn with_events(mut self, tx: mpsc::Sender<Event>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Start the timer. Returns `false` if it was already running.
    pub fn start(self: &Arc<Self>) -> bool {
        let mut timer = self.timer.lock().unwrap_or_else(|e| e.into_inner());
        if timer.as_ref().is_some_and(|h| !h.is_finished()) {
            info!("Auto-resolution service already running");
            return false;
        }

        let mut period = self.config().check_interval;
        if period < MIN_CHECK_INTERVAL {
            warn!(
                "Check interval {:?} is too short, using {:?}",
                period, MIN_CHECK_INTERVAL
            );
            period = MIN_CHECK_INTERVAL;
        }
        info!("Starting auto-resolution service (interval: {:?})", period);

        let weak = Arc::downgrade(self);
        *timer = Some(tokio::spawn(Self::tick_loop(weak, period)));
        true
    }

    /// Stop the timer. A check already in flight runs to completion.
    pub fn stop(&self) -> bool {
        let handle = self.timer.lock().unwrap_or_else(|e| e.into_inner()).take();
        match handle {
            Some(h) => {
                h.abort();
                info!("Auto-resolution service stopped");
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.timer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// A check is in flight right now.
    pub fn is_checking(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Run one check now, whatever the timer state.
    ///
    /// Returns `None` if another check was already in flight.
    pub async fn trigger_check(&self) -> Option<CheckReport> {
        self.run_check().await
    }

    pub fn config(&self) -> ResolutionConfig {
        self.config.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Apply a partial config update. A running timer picks up a new interval.
    pub fn update_config(self: &Arc<Self>, update: ResolutionConfigUpdate) {
        let (old_interval, new_config) = {
            let mut config = self.config.write().unwrap_or_else(|e| e.into_inner());
            let old = config.check_interval;
            config.apply(update);
            (old, config.clone())
        };
        info!("Auto-resolution config updated: {:?}", new_config);

        if new_config.check_interval != old_interval && self.stop() {
            self.start();
        }
    }

    async fn tick_loop(service: Weak<Self>, period: time::Duration) {
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval.tick().await; // first tick is immediate; first check waits a full period

        loop {
            interval.tick().await;
            let Some(service) = service.upgrade() else {
                break;
            };
            // Own task so that stopping the timer leaves the check alone.
            tokio::spawn(async move {
                service.run_check().await;
            });
        }
    }

    async fn run_check(&self) -> Option<CheckReport> {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            warn!("Previous check still in progress, skipping");
            self.emit(Event::CheckSkipped).await;
            return None;
        }
        let _guard = FlightGuard(&self.in_flight);

        let config = self.config();
        if !config.enabled {
            debug!("Auto-resolution disabled, nothing to do");
            return Some(CheckReport::default());
        }

        info!("Checking for expired markets...");
        let markets = self.markets.get_all_markets().await;
        let now = self.clock.now();
        let mut report = CheckReport {
            examined: markets.len(),
            ..Default::default()
        };

        let expired = markets
            .iter()
            .filter(|m| m.status == MarketStatus::Open && m.is_expired(now));

        for market in expired {
            report.expired.push(market.id);

            if !config.auto_resolve_on_expiry {
                info!("Market {} has expired (auto-resolve off)", market.id);
                continue;
            }

            info!("Market {} has expired, attempting resolution...", market.id);
            match self.resolve(market, &config).await {
                Ok((outcome, tx_hash)) => {
                    info!("Market {} resolved as {} ({})", market.id, outcome, tx_hash);
                    report.resolved.push((market.id, outcome));
                    self.markets.clear_cache().await;
                    self.emit(Event::MarketResolved {
                        market_id: market.id,
                        outcome,
                        tx_hash: tx_hash.to_string(),
                    })
                    .await;
                }
                Err(e) => {
                    error!("Failed to resolve market {}: {}", market.id, e);
                    report.failed.push(market.id);
                    self.emit(Event::ResolutionFailed {
                        market_id: market.id,
                        error: e.to_string(),
                    })
                    .await;
                }
            }
        }

        info!(
            "Check complete: {} markets, {} expired, {} resolved, {} failed",
            report.examined,
            report.expired.len(),
            report.resolved.len(),
            report.failed.len()
        );
        self.emit(Event::CheckCompleted {
            examined: report.examined,
            expired: report.expired.len(),
            resolved: report.resolved.len(),
            failed: report.failed.len(),
        })
        .await;

        Some(report)
    }

    async fn resolve(
        &self,
        market: &Market,
        config: &ResolutionConfig,
    ) -> Result<(Outcome, TxHash), ResolveError> {
        let decision = decide_outcome(market, config, self.oracle.as_ref()).await?;
        debug!("Market {} decision: {:?}", market.id, decision);

        if decision.outcome == Outcome::Cancel {
            // No cancel entrypoint on the resolution contract.
            warn!(
                "Market {} has no clear outcome ({:?}); submitting as No",
                market.id, decision.basis
            );
        } else if decision.basis == Basis::Oracle {
            warn!("Market {} resolved from oracle data", market.id);
        }

        let tx_hash = self
            .contracts
            .resolve_market(market.id, decision.outcome.to_chain())
            .await?;
        Ok((decision.outcome, tx_hash))
    }

    async fn emit(&self, event: Event) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event).await;
        }
    }
}

impl Drop for AutoResolutionService {
    fn drop(&mut self) {
        if let Some(handle) = self.timer.get_mut().unwrap_or_else(|e| e.into_inner()).take() {
            handle.abort();
        }
    }
}

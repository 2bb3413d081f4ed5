use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::contracts::{self, ContractError, ContractService, CreatedMarket, MarketStakes, NewMarket, TxHash};
use crate::events::Side;
use crate::state::{DashboardStats, Market, MarketStatus, MarketType};

/// How long a fetched market list is served before the contracts are re-read.
pub const DEFAULT_CACHE_DURATION: Duration = Duration::from_secs(30);

/// Market counts above this are treated as a bad read, not fetched.
pub const MAX_MARKETS: u64 = 10_000;

#[derive(Default)]
struct Cache {
    markets: Arc<Vec<Market>>,
    fetched_at: Option<Instant>,
}

/// Read view of every market, cached for a bounded time.
///
/// The cache only limits how often the contracts are read. It may be up to
/// `cache_duration` stale unless cleared.
pub struct MarketService {
    contracts: Arc<dyn ContractService>,
    clock: Arc<dyn Clock>,
    cache_duration: Duration,
    cache: Mutex<Cache>,
}

impl MarketService {
    pub fn new(contracts: Arc<dyn ContractService>) -> Self {
        Self::with_options(contracts, DEFAULT_CACHE_DURATION, Arc::new(SystemClock))
    }

    pub fn with_options(
        contracts: Arc<dyn ContractService>,
        cache_duration: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            contracts,
            clock,
            cache_duration,
            cache: Mutex::new(Cache::default()),
        }
    }

    /// All markets, from cache when fresh.
    ///
    /// Markets whose read fails are left out. If the market count itself
    /// cannot be read, the previous list (possibly empty) is returned.
    pub async fn get_all_markets(&self) -> Arc<Vec<Market>> {
        let mut cache = self.cache.lock().await;

        if let Some(fetched_at) = cache.fetched_at {
            if !cache.markets.is_empty() && fetched_at.elapsed() < self.cache_duration {
                return Arc::clone(&cache.markets);
            }
        }

        match self.fetch_all().await {
            Ok(markets) => {
                debug!("Fetched {} markets", markets.len());
                cache.markets = Arc::new(markets);
                cache.fetched_at = Some(Instant::now());
            }
            Err(e) => {
                error!("Failed to fetch markets, serving previous list: {}", e);
            }
        }

        Arc::clone(&cache.markets)
    }

    /// Drop the cached list; the next read goes to the contracts.
    pub async fn clear_cache(&self) {
        let mut cache = self.cache.lock().await;
        *cache = Cache::default();
    }

    pub async fn get_market_by_id(&self, id: u64) -> Option<Market> {
        self.get_all_markets().await.iter().find(|m| m.id == id).cloned()
    }

    pub async fn get_markets_by_status(&self, status: MarketStatus) -> Vec<Market> {
        self.filtered(|m| m.status == status).await
    }

    pub async fn get_markets_by_type(&self, market_type: MarketType) -> Vec<Market> {
        self.filtered(|m| m.market_type == market_type).await
    }

    pub async fn get_markets_by_region(&self, region: &str) -> Vec<Market> {
        self.filtered(|m| m.region == region).await
    }

    pub async fn get_dashboard_stats(&self) -> DashboardStats {
        DashboardStats::from_markets(&self.get_all_markets().await)
    }

    /// Stake through the contracts, then invalidate the cache.
    pub async fn place_stake(&self, market_id: u64, side: Side, amount: Decimal) -> contracts::Result<TxHash> {
        let tx_hash = self.contracts.place_stake(market_id, side, amount).await?;
        info!(market_id, ?side, %amount, %tx_hash, "Stake placed");
        self.clear_cache().await;
        Ok(tx_hash)
    }

    /// Create through the contracts, then invalidate the cache.
    pub async fn create_market(&self, market: NewMarket) -> contracts::Result<CreatedMarket> {
        let created = self.contracts.create_market(market).await?;
        self.clear_cache().await;
        Ok(created)
    }

    pub fn contracts(&self) -> &Arc<dyn ContractService> {
        &self.contracts
    }

    async fn filtered(&self, keep: impl Fn(&Market) -> bool) -> Vec<Market> {
        self.get_all_markets()
            .await
            .iter()
            .filter(|m| keep(m))
            .cloned()
            .collect()
    }

    async fn fetch_all(&self) -> contracts::Result<Vec<Market>> {
        let total = self.contracts.get_total_markets().await?;
        if total > MAX_MARKETS {
            return Err(ContractError::Rpc(format!(
                "implausible market count {} (max {})",
                total, MAX_MARKETS
            )));
        }
        let mut markets = Vec::with_capacity(total as usize);

        for id in 1..=total {
            let chain = match self.contracts.get_market(id).await {
                Ok(m) => m,
                Err(e) => {
                    warn!("Skipping market {}: {}", id, e);
                    continue;
                }
            };

            let stakes = match self.contracts.get_market_stakes(id).await {
                Ok(s) => s,
                Err(e) => {
                    warn!("No stakes for market {}, showing zero: {}", id, e);
                    MarketStakes::default()
                }
            };

            markets.push(Market::from_chain(&chain, &stakes, self.clock.now()));
        }

        Ok(markets)
    }
}

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use rust_decimal::Decimal;

use super::{
    ChainMarket, ContractError, ContractService, CreatedMarket, Linkage, MarketStakes, NewMarket,
    Result, TxHash,
};
use crate::events::Side;
use crate::state::{MarketStatus, MarketType, OracleType};

/// In-memory stand-in for the three contracts.
#[derive(Default)]
pub struct MockContracts {
    markets: Mutex<BTreeMap<u64, (ChainMarket, MarketStakes)>>,
    failing_markets: Mutex<HashSet<u64>>,
    failing_stakes: Mutex<HashSet<u64>>,
    failing_resolves: Mutex<HashSet<u64>>,
    fail_count: AtomicBool,
    total: Mutex<Option<u64>>,
    resolve_delay: Mutex<Option<Duration>>,
    count_calls: AtomicUsize,
    resolutions: Mutex<Vec<(u64, bool)>>,
}

/// Build a market/stake pair with the given yes/no stakes.
pub fn market(
    id: u64,
    market_type: MarketType,
    end_time: i64,
    yes: Decimal,
    no: Decimal,
) -> (ChainMarket, MarketStakes) {
    let chain = ChainMarket {
        id,
        title: format!("Market {id}"),
        description: format!("Description of market {id}"),
        market_type,
        region: "Gauteng".to_string(),
        end_time,
        oracle_type: OracleType::Manual,
        status: MarketStatus::Open,
        creator: Address::ZERO,
        created_at: 0,
        resolved: false,
        outcome: false,
    };
    let stakes = MarketStakes {
        total_staked: yes + no,
        yes_stake: yes,
        no_stake: no,
        participant_count: 2,
    };
    (chain, stakes)
}

impl MockContracts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, (market, stakes): (ChainMarket, MarketStakes)) {
        self.markets.lock().unwrap().insert(market.id, (market, stakes));
    }

    pub fn fail_market(&self, id: u64) {
        self.failing_markets.lock().unwrap().insert(id);
    }

    pub fn fail_stakes(&self, id: u64) {
        self.failing_stakes.lock().unwrap().insert(id);
    }

    pub fn fail_resolve(&self, id: u64) {
        self.failing_resolves.lock().unwrap().insert(id);
    }

    pub fn heal_resolve(&self, id: u64) {
        self.failing_resolves.lock().unwrap().remove(&id);
    }

    pub fn set_fail_count(&self, fail: bool) {
        self.fail_count.store(fail, Ordering::SeqCst);
    }

    /// Report `total` from `get_total_markets` instead of the real count.
    pub fn set_total(&self, total: Option<u64>) {
        *self.total.lock().unwrap() = total;
    }

    pub fn set_resolve_delay(&self, delay: Duration) {
        *self.resolve_delay.lock().unwrap() = Some(delay);
    }

    pub fn set_status(&self, id: u64, status: MarketStatus) {
        if let Some((m, _)) = self.markets.lock().unwrap().get_mut(&id) {
            m.status = status;
        }
    }

    /// Times `get_total_markets` has been called.
    pub fn count_calls(&self) -> usize {
        self.count_calls.load(Ordering::SeqCst)
    }

    pub fn resolutions(&self) -> Vec<(u64, bool)> {
        self.resolutions.lock().unwrap().clone()
    }

    fn tx(id: u64) -> TxHash {
        B256::with_last_byte(id as u8)
    }
}

#[async_trait]
impl ContractService for MockContracts {
    async fn create_market(&self, new: NewMarket) -> Result<CreatedMarket> {
        let mut markets = self.markets.lock().unwrap();
        let id = markets.len() as u64 + 1;
        let chain = ChainMarket {
            id,
            title: new.title,
            description: new.description,
            market_type: new.market_type,
            region: new.region,
            end_time: new.end_time,
            oracle_type: new.oracle_type,
            status: MarketStatus::Open,
            creator: Address::ZERO,
            created_at: 0,
            resolved: false,
            outcome: false,
        };
        markets.insert(id, (chain, MarketStakes::default()));
        Ok(CreatedMarket {
            market_id: Some(id),
            tx_hash: Self::tx(id),
        })
    }

    async fn place_stake(&self, market_id: u64, side: Side, amount: Decimal) -> Result<TxHash> {
        let mut markets = self.markets.lock().unwrap();
        let (market, stakes) = markets
            .get_mut(&market_id)
            .ok_or(ContractError::MarketNotFound(market_id))?;
        if market.status != MarketStatus::Open {
            return Err(ContractError::MarketNotOpen(market_id));
        }
        match side {
            Side::Yes => stakes.yes_stake += amount,
            Side::No => stakes.no_stake += amount,
        }
        stakes.total_staked += amount;
        stakes.participant_count += 1;
        Ok(Self::tx(market_id))
    }

    async fn resolve_market(&self, market_id: u64, outcome: bool) -> Result<TxHash> {
        let delay = *self.resolve_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing_resolves.lock().unwrap().contains(&market_id) {
            return Err(ContractError::Reverted("Market not open".to_string()));
        }

        let mut markets = self.markets.lock().unwrap();
        let (market, _) = markets
            .get_mut(&market_id)
            .ok_or(ContractError::MarketNotFound(market_id))?;
        market.status = MarketStatus::Closed;
        market.resolved = true;
        market.outcome = outcome;
        self.resolutions.lock().unwrap().push((market_id, outcome));
        Ok(Self::tx(market_id))
    }

    async fn get_market(&self, market_id: u64) -> Result<ChainMarket> {
        if self.failing_markets.lock().unwrap().contains(&market_id) {
            return Err(ContractError::Rpc("timeout".to_string()));
        }
        self.markets
            .lock()
            .unwrap()
            .get(&market_id)
            .map(|(m, _)| m.clone())
            .ok_or(ContractError::MarketNotFound(market_id))
    }

    async fn get_market_stakes(&self, market_id: u64) -> Result<MarketStakes> {
        if self.failing_stakes.lock().unwrap().contains(&market_id) {
            return Err(ContractError::Rpc("timeout".to_string()));
        }
        self.markets
            .lock()
            .unwrap()
            .get(&market_id)
            .map(|(_, s)| s.clone())
            .ok_or(ContractError::MarketNotFound(market_id))
    }

    async fn get_total_markets(&self) -> Result<u64> {
        self.count_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_count.load(Ordering::SeqCst) {
            return Err(ContractError::Rpc("connection refused".to_string()));
        }
        if let Some(total) = *self.total.lock().unwrap() {
            return Ok(total);
        }
        Ok(self.markets.lock().unwrap().len() as u64)
    }

    async fn is_market_resolved(&self, market_id: u64) -> Result<bool> {
        Ok(self.get_market(market_id).await?.resolved)
    }

    async fn is_market_open(&self, market_id: u64) -> Result<bool> {
        Ok(self.get_market(market_id).await?.status == MarketStatus::Open)
    }

    async fn get_user_stake(&self, _market_id: u64, _user: Address) -> Result<Decimal> {
        Ok(Decimal::ZERO)
    }

    async fn get_market_outcome(&self, market_id: u64) -> Result<bool> {
        Ok(self.get_market(market_id).await?.outcome)
    }

    async fn check_linkage(&self) -> Result<Linkage> {
        Ok(Linkage {
            market_factory_linked: true,
            resolution_contract_linked: true,
        })
    }

    async fn link_market_factory(&self) -> Result<TxHash> {
        Ok(TxHash::ZERO)
    }

    async fn link_resolution_contract(&self) -> Result<TxHash> {
        Ok(TxHash::ZERO)
    }
}

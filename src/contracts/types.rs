use alloy_primitives::{Address, B256};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::state::{MarketStatus, MarketType, OracleType};

pub type TxHash = B256;

/// A market as stored by the MarketFactory contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainMarket {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub market_type: MarketType,
    pub region: String,
    /// Unix seconds
    pub end_time: i64,
    pub oracle_type: OracleType,
    pub status: MarketStatus,
    pub creator: Address,
    /// Unix seconds
    pub created_at: i64,
    pub resolved: bool,
    pub outcome: bool,
}

/// Stake tally from the StakingContract, amounts in ether.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MarketStakes {
    pub total_staked: Decimal,
    pub yes_stake: Decimal,
    pub no_stake: Decimal,
    pub participant_count: u64,
}

/// Input for `create_market`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMarket {
    pub title: String,
    pub description: String,
    pub market_type: MarketType,
    pub region: String,
    /// Unix seconds, must be in the future
    pub end_time: i64,
    pub oracle_type: OracleType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedMarket {
    /// From the `MarketCreated` event, when the receipt carries one
    pub market_id: Option<u64>,
    pub tx_hash: TxHash,
}

/// Whether the StakingContract knows its sibling contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Linkage {
    pub market_factory_linked: bool,
    pub resolution_contract_linked: bool,
}

impl Linkage {
    pub fn is_complete(&self) -> bool {
        self.market_factory_linked && self.resolution_contract_linked
    }
}

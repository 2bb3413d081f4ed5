//! Contract access layer.
//!
//! `ContractService` is the boundary the rest of the crate talks to. The
//! on-chain implementation lives in `chain`; tests use an in-memory mock.

pub mod bindings;
mod chain;
mod error;
#[cfg(test)]
pub(crate) mod mock;
mod types;

pub use chain::ChainContractService;
pub use error::{ContractError, Result};
pub use types::{ChainMarket, CreatedMarket, Linkage, MarketStakes, NewMarket, TxHash};

use alloy_primitives::Address;
use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::events::Side;

/// Typed access to the MarketFactory, StakingContract and ResolutionContract.
///
/// Every method returns; failures come back as `ContractError`.
#[async_trait]
pub trait ContractService: Send + Sync {
    /// Create a market. Owner-only on the factory.
    async fn create_market(&self, market: NewMarket) -> Result<CreatedMarket>;

    /// Stake `amount` ether on one side of an open market.
    async fn place_stake(&self, market_id: u64, side: Side, amount: Decimal) -> Result<TxHash>;

    /// Fix the outcome of a market (`true` = Yes).
    async fn resolve_market(&self, market_id: u64, outcome: bool) -> Result<TxHash>;

    async fn get_market(&self, market_id: u64) -> Result<ChainMarket>;

    async fn get_market_stakes(&self, market_id: u64) -> Result<MarketStakes>;

    /// Number of markets created so far. Ids run from 1 to this value.
    async fn get_total_markets(&self) -> Result<u64>;

    async fn is_market_resolved(&self, market_id: u64) -> Result<bool>;

    async fn is_market_open(&self, market_id: u64) -> Result<bool>;

    /// Stake of `user` in a market, in ether.
    async fn get_user_stake(&self, market_id: u64, user: Address) -> Result<Decimal>;

    /// Recorded outcome of a resolved market.
    async fn get_market_outcome(&self, market_id: u64) -> Result<bool>;

    async fn check_linkage(&self) -> Result<Linkage>;

    /// Point the StakingContract at the MarketFactory (admin).
    async fn link_market_factory(&self) -> Result<TxHash>;

    /// Point the StakingContract at the ResolutionContract (admin).
    async fn link_resolution_contract(&self) -> Result<TxHash>;
}

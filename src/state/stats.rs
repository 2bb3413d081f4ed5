use rust_decimal::Decimal;
use serde::Serialize;

use super::market::{format_millions, Market, MarketStatus};

/// Headline figures for the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
    /// Sum of all stakes, in ether
    pub total_staked: Decimal,
    /// `R1.2M` form of `total_staked`
    pub total_staked_display: String,
    pub total_participants: u64,
    /// Every market known to the factory, whatever its status
    pub active_markets: usize,
    pub open_markets: usize,
    pub resolving_markets: usize,
    pub closed_markets: usize,
}

impl DashboardStats {
    pub fn from_markets(markets: &[Market]) -> Self {
        let total_staked: Decimal = markets.iter().map(|m| m.total_staked).sum();
        let count = |status: MarketStatus| markets.iter().filter(|m| m.status == status).count();

        Self {
            total_staked,
            total_staked_display: format_millions(total_staked),
            total_participants: markets.iter().map(|m| m.participants).sum(),
            active_markets: markets.len(),
            open_markets: count(MarketStatus::Open),
            resolving_markets: count(MarketStatus::Resolving),
            closed_markets: count(MarketStatus::Closed),
        }
    }
}

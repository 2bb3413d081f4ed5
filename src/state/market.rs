use std::fmt;
use std::str::FromStr;

use chrono::DateTime;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::contracts::{ChainMarket, MarketStakes};
use crate::events::Side;

/// What a market is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketType {
    Weather,
    Crop,
    Price,
    Trade,
    Policy,
}

/// Lifecycle state as shown to users. `Cancelled` on-chain displays as `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketStatus {
    Open,
    Resolving,
    Closed,
}

/// Where the outcome of a market comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OracleType {
    Manual,
    Chainlink,
    SawsApi,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl MarketType {
    /// Decode the contract's `uint8`. Unknown values fall back to `Weather`.
    pub fn from_chain(raw: u8) -> Self {
        match raw {
            1 => Self::Crop,
            2 => Self::Price,
            3 => Self::Trade,
            4 => Self::Policy,
            _ => Self::Weather,
        }
    }

    pub fn to_chain(self) -> u8 {
        match self {
            Self::Weather => 0,
            Self::Crop => 1,
            Self::Price => 2,
            Self::Trade => 3,
            Self::Policy => 4,
        }
    }

    /// Types whose outcome depends on real-world observations.
    pub fn needs_oracle(self) -> bool {
        matches!(self, Self::Weather | Self::Crop)
    }
}

impl FromStr for MarketType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "weather" => Ok(Self::Weather),
            "crop" => Ok(Self::Crop),
            "price" => Ok(Self::Price),
            "trade" => Ok(Self::Trade),
            "policy" => Ok(Self::Policy),
            _ => Err(ParseEnumError {
                kind: "market type",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for MarketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Weather => "weather",
            Self::Crop => "crop",
            Self::Price => "price",
            Self::Trade => "trade",
            Self::Policy => "policy",
        };
        f.write_str(name)
    }
}

impl MarketStatus {
    /// Decode the contract's `uint8` (Open, Resolving, Closed, Cancelled).
    /// Unknown values fall back to `Open`.
    pub fn from_chain(raw: u8) -> Self {
        match raw {
            1 => Self::Resolving,
            2 | 3 => Self::Closed,
            _ => Self::Open,
        }
    }
}

impl fmt::Display for MarketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Open => "Open",
            Self::Resolving => "Resolving",
            Self::Closed => "Closed",
        };
        f.write_str(name)
    }
}

impl OracleType {
    /// Unknown values fall back to `Manual`.
    pub fn from_chain(raw: u8) -> Self {
        match raw {
            1 => Self::Chainlink,
            2 => Self::SawsApi,
            _ => Self::Manual,
        }
    }

    pub fn to_chain(self) -> u8 {
        match self {
            Self::Manual => 0,
            Self::Chainlink => 1,
            Self::SawsApi => 2,
        }
    }
}

impl FromStr for OracleType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "manual" => Ok(Self::Manual),
            "chainlink" => Ok(Self::Chainlink),
            "saws_api" | "saws api" => Ok(Self::SawsApi),
            _ => Err(ParseEnumError {
                kind: "oracle type",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for OracleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Manual => "Manual",
            Self::Chainlink => "Chainlink",
            Self::SawsApi => "SAWS API",
        };
        f.write_str(name)
    }
}

/// Display model of one market: contract state plus derived fields.
///
/// Read-mostly projection. Stake figures come from the staking contract and
/// are never adjusted locally.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Market {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub market_type: MarketType,
    pub region: String,
    pub status: MarketStatus,
    pub resolution_source: OracleType,
    /// Stakes in ether
    pub total_staked: Decimal,
    pub yes_stake: Decimal,
    pub no_stake: Decimal,
    pub participants: u64,
    pub yes_percentage: u8,
    pub no_percentage: u8,
    pub yes_odds: Decimal,
    pub no_odds: Decimal,
    pub time_left: String,
    /// `YYYY-MM-DD`
    pub created_at: String,
    /// `YYYY-MM-DD`
    pub end_date: String,
    /// Unix seconds
    pub end_time: i64,
}

impl Market {
    /// Build the display model from contract reads at time `now` (unix secs).
    pub fn from_chain(market: &ChainMarket, stakes: &MarketStakes, now: i64) -> Self {
        let total = stakes.total_staked;
        let yes_percentage = percentage(stakes.yes_stake, total);

        Self {
            id: market.id,
            title: market.title.clone(),
            description: market.description.clone(),
            market_type: market.market_type,
            region: market.region.clone(),
            status: market.status,
            resolution_source: market.oracle_type,
            total_staked: total,
            yes_stake: stakes.yes_stake,
            no_stake: stakes.no_stake,
            participants: stakes.participant_count,
            yes_percentage,
            no_percentage: 100 - yes_percentage,
            yes_odds: odds(stakes.yes_stake, total),
            no_odds: odds(stakes.no_stake, total),
            time_left: time_left(market.end_time, now),
            created_at: format_date(market.created_at),
            end_date: format_date(market.end_time),
            end_time: market.end_time,
        }
    }

    /// End time has been reached.
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.end_time
    }

    pub fn percentage(&self, side: Side) -> u8 {
        match side {
            Side::Yes => self.yes_percentage,
            Side::No => self.no_percentage,
        }
    }

    pub fn odds(&self, side: Side) -> Decimal {
        match side {
            Side::Yes => self.yes_odds,
            Side::No => self.no_odds,
        }
    }

    pub fn stake(&self, side: Side) -> Decimal {
        match side {
            Side::Yes => self.yes_stake,
            Side::No => self.no_stake,
        }
    }

    /// Return on `amount` staked on `side` if it wins, at the current split.
    ///
    /// `None` when the side holds 0% of the pool.
    pub fn potential_payout(&self, side: Side, amount: Decimal) -> Option<Decimal> {
        payout(amount, self.percentage(side))
    }

    /// Payout minus the stake itself.
    pub fn potential_profit(&self, side: Side, amount: Decimal) -> Option<Decimal> {
        self.potential_payout(side, amount).map(|p| p - amount)
    }
}

/// `amount * 100 / side_percentage`, rounded to cents.
pub fn payout(amount: Decimal, side_percentage: u8) -> Option<Decimal> {
    if side_percentage == 0 {
        return None;
    }
    let payout = amount * dec!(100) / Decimal::from(side_percentage);
    Some(payout.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}

/// Share of `total` held by one side, as a whole percentage.
///
/// 50 when nothing has been staked.
pub fn percentage(side_stake: Decimal, total: Decimal) -> u8 {
    if total.is_zero() {
        return 50;
    }
    (side_stake * dec!(100) / total)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u8()
        .unwrap_or(100)
        .min(100)
}

/// Decimal payout odds for one side, rounded to cents. 2.0 when the side is empty.
pub fn odds(side_stake: Decimal, total: Decimal) -> Decimal {
    if side_stake.is_zero() {
        return dec!(2.0);
    }
    (total / side_stake).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Human-readable time until `end_time`, both in unix seconds.
pub fn time_left(end_time: i64, now: i64) -> String {
    let remaining = end_time - now;
    if remaining <= 0 {
        return "Expired".to_string();
    }

    let days = remaining / 86_400;
    let hours = (remaining % 86_400) / 3_600;

    if days > 0 {
        format!("{} day{} left", days, if days > 1 { "s" } else { "" })
    } else if hours > 0 {
        format!("{} hour{} left", hours, if hours > 1 { "s" } else { "" })
    } else {
        "Less than 1 hour left".to_string()
    }
}

/// Unix seconds to `YYYY-MM-DD` (UTC).
pub fn format_date(ts: i64) -> String {
    DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// `R1,234.5` style amount: thousands separators, at most three decimals.
pub fn format_currency(amount: Decimal) -> String {
    let rounded = amount
        .round_dp_with_strategy(3, RoundingStrategy::MidpointAwayFromZero)
        .normalize();
    let text = rounded.abs().to_string();
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (text.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    match frac_part {
        Some(f) => format!("{sign}R{grouped}.{f}"),
        None => format!("{sign}R{grouped}"),
    }
}

/// `R1.2M` style amount for headline figures.
pub fn format_millions(amount: Decimal) -> String {
    let millions = (amount / dec!(1_000_000))
        .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero);
    format!("R{:.1}M", millions)
}

mod market;
mod stats;

pub use market::{
    format_currency, format_date, format_millions, odds, payout, percentage, time_left, Market,
    MarketStatus, MarketType, OracleType, ParseEnumError,
};
pub use stats::DashboardStats;

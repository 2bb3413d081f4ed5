use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::oracle::{Oracle, OracleError};
use super::ResolutionConfig;
use crate::events::Side;
use crate::state::{Market, ParseEnumError};

/// What the keeper decides an expired market resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Yes,
    No,
    /// No clear outcome
    Cancel,
}

impl Outcome {
    /// Boolean submitted to `resolveMarket`.
    ///
    /// The resolution contract has no cancel path, so `Cancel` is submitted
    /// as No. This conflates "no consensus" with "outcome is no".
    pub fn to_chain(self) -> bool {
        match self {
            Outcome::Yes => true,
            Outcome::No | Outcome::Cancel => false,
        }
    }
}

impl From<Side> for Outcome {
    fn from(side: Side) -> Self {
        match side {
            Side::Yes => Outcome::Yes,
            Side::No => Outcome::No,
        }
    }
}

impl FromStr for Outcome {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "yes" => Ok(Outcome::Yes),
            "no" => Ok(Outcome::No),
            "cancel" => Ok(Outcome::Cancel),
            _ => Err(ParseEnumError {
                kind: "outcome",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Outcome::Yes => "yes",
            Outcome::No => "no",
            Outcome::Cancel => "cancel",
        };
        f.write_str(name)
    }
}

/// How an outcome was arrived at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Basis {
    /// One side held at least the majority threshold of stake
    Majority,
    /// Delegated to the oracle (weather and crop markets)
    Oracle,
    /// Nothing conclusive; configured default
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub outcome: Outcome,
    pub basis: Basis,
}

/// Side holding at least `threshold` percent of the stake, Yes checked first.
pub fn majority(market: &Market, threshold: u8) -> Option<Side> {
    if market.yes_percentage >= threshold {
        Some(Side::Yes)
    } else if market.no_percentage >= threshold {
        Some(Side::No)
    } else {
        None
    }
}

/// Decide the outcome of an expired market.
///
/// Evaluated in order: stake majority, oracle for weather/crop markets,
/// then the configured default.
pub async fn decide_outcome(
    market: &Market,
    config: &ResolutionConfig,
    oracle: &dyn Oracle,
) -> Result<Decision, OracleError> {
    if let Some(side) = majority(market, config.majority_threshold) {
        return Ok(Decision {
            outcome: side.into(),
            basis: Basis::Majority,
        });
    }

    if market.market_type.needs_oracle() {
        let outcome = oracle.outcome(market).await?;
        return Ok(Decision {
            outcome,
            basis: Basis::Oracle,
        });
    }

    Ok(Decision {
        outcome: config.default_outcome,
        basis: Basis::Default,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::mock;
    use crate::state::MarketType;
    use crate::strategy::oracle::FixedOracle;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn display(market_type: MarketType, yes: Decimal, no: Decimal) -> Market {
        let (chain, stakes) = mock::market(1, market_type, 0, yes, no);
        Market::from_chain(&chain, &stakes, 100)
    }

    #[test]
    fn test_cancel_maps_to_no() {
        // No on-chain cancel path: Cancel is submitted as No on purpose.
        assert!(!Outcome::Cancel.to_chain());
        assert!(!Outcome::No.to_chain());
        assert!(Outcome::Yes.to_chain());
    }

    #[test]
    fn test_majority() {
        assert_eq!(majority(&display(MarketType::Price, dec!(65), dec!(35)), 60), Some(Side::Yes));
        assert_eq!(majority(&display(MarketType::Price, dec!(40), dec!(60)), 60), Some(Side::No));
        assert_eq!(majority(&display(MarketType::Price, dec!(55), dec!(45)), 60), None);
        // Empty market is 50/50
        assert_eq!(majority(&display(MarketType::Price, dec!(0), dec!(0)), 60), None);
    }

    #[tokio::test]
    async fn test_majority_wins_before_oracle() {
        let config = ResolutionConfig::default();
        let oracle = FixedOracle(Outcome::No);
        let market = display(MarketType::Weather, dec!(65), dec!(35));

        let decision = decide_outcome(&market, &config, &oracle).await.unwrap();
        assert_eq!(decision.outcome, Outcome::Yes);
        assert_eq!(decision.basis, Basis::Majority);
    }

    #[tokio::test]
    async fn test_weather_and_crop_use_oracle() {
        let config = ResolutionConfig::default();
        let oracle = FixedOracle(Outcome::Yes);

        for market_type in [MarketType::Weather, MarketType::Crop] {
            let market = display(market_type, dec!(50), dec!(50));
            let decision = decide_outcome(&market, &config, &oracle).await.unwrap();
            assert_eq!(decision.basis, Basis::Oracle);
            assert_eq!(decision.outcome, Outcome::Yes);
        }
    }

    #[tokio::test]
    async fn test_inconclusive_falls_back_to_cancel() {
        let config = ResolutionConfig::default();
        let oracle = FixedOracle(Outcome::Yes);

        for market_type in [MarketType::Price, MarketType::Trade, MarketType::Policy] {
            let market = display(market_type, dec!(55), dec!(45));
            let decision = decide_outcome(&market, &config, &oracle).await.unwrap();
            assert_eq!(decision.basis, Basis::Default);
            assert_eq!(decision.outcome, Outcome::Cancel);
            // Questionable but intentional: cancel lands on-chain as No.
            assert!(!decision.outcome.to_chain());
        }
    }

    #[test]
    fn test_parse_outcome() {
        assert_eq!("Cancel".parse::<Outcome>(), Ok(Outcome::Cancel));
        assert!("maybe".parse::<Outcome>().is_err());
    }
}

use std::sync::Mutex;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::warn;

use super::Outcome;
use crate::state::Market;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OracleError {
    #[error("oracle unavailable: {0}")]
    Unavailable(String),
}

/// Source of real-world outcomes for markets the stake split cannot settle.
#[async_trait]
pub trait Oracle: Send + Sync {
    async fn outcome(&self, market: &Market) -> Result<Outcome, OracleError>;
}

/// Coin-flip stand-in for weather and crop data feeds.
///
/// This is a simulation, not an oracle: every call is an unweighted random
/// Yes/No. It stays until a real data integration replaces it.
pub struct SimulatedOracle {
    rng: Mutex<StdRng>,
}

impl SimulatedOracle {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic sequence, for tests and replays.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for SimulatedOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Oracle for SimulatedOracle {
    async fn outcome(&self, market: &Market) -> Result<Outcome, OracleError> {
        let yes = self
            .rng
            .lock()
            .map_err(|_| OracleError::Unavailable("rng poisoned".to_string()))?
            .gen_bool(0.5);
        let outcome = if yes { Outcome::Yes } else { Outcome::No };

        warn!(
            market_id = market.id,
            market_type = %market.market_type,
            %outcome,
            "Simulated oracle used: outcome is a coin flip, not observed data"
        );
        Ok(outcome)
    }
}

/// Always answers the same thing.
#[cfg(test)]
pub struct FixedOracle(pub Outcome);

#[cfg(test)]
#[async_trait]
impl Oracle for FixedOracle {
    async fn outcome(&self, _market: &Market) -> Result<Outcome, OracleError> {
        Ok(self.0)
    }
}

use serde::{Deserialize, Serialize};

use crate::strategy::Outcome;

// What the keeper reports back to whoever is listening (the main loop).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // A check pass finished
    CheckCompleted {
        examined: usize,
        expired: usize,
        resolved: usize,
        failed: usize,
    },

    // A check was requested while the previous one was still in flight
    CheckSkipped,

    // Resolution transaction confirmed
    MarketResolved {
        market_id: u64,
        outcome: Outcome,
        tx_hash: String,
    },

    // Resolution attempt failed; retried on the next tick
    ResolutionFailed { market_id: u64, error: String },

    // Ctrl+C or kill signal
    Shutdown,
}

/// The two sides of a yes/no market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Yes,
    No,
}

impl Side {
    /// Boolean encoding used by the contracts (`true` = Yes).
    pub fn as_bool(&self) -> bool {
        matches!(self, Side::Yes)
    }
}

impl From<bool> for Side {
    fn from(prediction: bool) -> Self {
        if prediction {
            Side::Yes
        } else {
            Side::No
        }
    }
}

mod oracle;
mod outcome;

pub use oracle::{Oracle, OracleError, SimulatedOracle};
pub use outcome::{decide_outcome, majority, Basis, Decision, Outcome};

#[cfg(test)]
pub(crate) use oracle::FixedOracle;

use std::time::Duration;

/// Auto-resolution configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionConfig {
    /// Master switch; a disabled service still ticks but does nothing
    pub enabled: bool,
    /// Time between scheduled checks
    pub check_interval: Duration,
    /// Submit resolutions for expired markets (otherwise only report them)
    pub auto_resolve_on_expiry: bool,
    /// Outcome when neither the stake split nor an oracle decides
    pub default_outcome: Outcome,
    /// Stake share (percent) at which one side wins outright
    pub majority_threshold: u8,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            check_interval: Duration::from_secs(60), // every minute
            auto_resolve_on_expiry: true,
            default_outcome: Outcome::Cancel,
            majority_threshold: 60, // 60%
        }
    }
}

/// Partial update for `ResolutionConfig`; `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionConfigUpdate {
    pub enabled: Option<bool>,
    pub check_interval: Option<Duration>,
    pub auto_resolve_on_expiry: Option<bool>,
    pub default_outcome: Option<Outcome>,
    pub majority_threshold: Option<u8>,
}

impl ResolutionConfig {
    pub fn apply(&mut self, update: ResolutionConfigUpdate) {
        if let Some(v) = update.enabled {
            self.enabled = v;
        }
        if let Some(v) = update.check_interval {
            self.check_interval = v;
        }
        if let Some(v) = update.auto_resolve_on_expiry {
            self.auto_resolve_on_expiry = v;
        }
        if let Some(v) = update.default_outcome {
            self.default_outcome = v;
        }
        if let Some(v) = update.majority_threshold {
            self.majority_threshold = v;
        }
    }
}

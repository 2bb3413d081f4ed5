use thiserror::Error;

use crate::state::ParseEnumError;

pub type Result<T> = std::result::Result<T, ContractError>;

/// Everything a contract call can fail with.
///
/// Callers surface the message and keep their prior state; nothing here is
/// fatal to a running client.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContractError {
    #[error("no wallet available")]
    WalletUnavailable,

    #[error("user rejected the request")]
    UserRejected,

    #[error("contracts are not deployed on chain {0}")]
    NetworkUnavailable(u64),

    #[error("no contract code found at {0}")]
    NotDeployed(String),

    #[error("only the contract owner can create markets")]
    NotOwner,

    #[error("market {0} is not open for staking")]
    MarketNotOpen(u64),

    #[error("market {0} does not exist or is not accessible")]
    MarketNotFound(u64),

    #[error("contracts are not linked: {0}")]
    NotLinked(&'static str),

    #[error("transaction reverted: {0}")]
    Reverted(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("rpc error: {0}")]
    Rpc(String),
}

impl ContractError {
    /// Classify a provider/contract error message.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_ascii_lowercase();

        if lower.contains("user rejected") || lower.contains("user denied") || has_error_code(&lower, 4001) {
            Self::UserRejected
        } else if lower.contains("revert") {
            Self::Reverted(message)
        } else {
            Self::Rpc(message)
        }
    }

    /// Failures that may succeed if simply retried later.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Rpc(_))
    }
}

/// `code` appears as a JSON-RPC error code, not just as digits somewhere in the text.
fn has_error_code(lower: &str, code: i64) -> bool {
    [
        format!("error code {code}:"),
        format!("code: {code}"),
        format!("\"code\":{code}"),
        format!("\"code\": {code}"),
    ]
    .iter()
    .any(|pattern| {
        lower.match_indices(pattern.as_str()).any(|(at, _)| {
            !lower[at + pattern.len()..].starts_with(|c: char| c.is_ascii_digit())
        })
    })
}

impl From<ParseEnumError> for ContractError {
    fn from(err: ParseEnumError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

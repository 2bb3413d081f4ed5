//! Browser-style wallet session: connection, network switching and the
//! persisted explicit-disconnect flag.

mod provider;
mod session;
mod store;

pub use provider::{HttpWalletProvider, ProviderError, WalletProvider};
pub use session::{parse_chain_id, WalletError, WalletEvent, WalletSession, WalletState};
pub use store::DisconnectFlag;

#[cfg(test)]
pub(crate) use store::scratch_dir;

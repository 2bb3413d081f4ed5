use std::sync::{Arc, RwLock};

use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::provider::{ProviderError, WalletProvider, REQUEST_PENDING, UNRECOGNIZED_CHAIN, USER_REJECTED};
use super::store::DisconnectFlag;
use crate::network::{network_for, NetworkConfig};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WalletError {
    #[error("No wallet found. Please install MetaMask or another Web3 wallet.")]
    Unavailable,
    #[error("User rejected the connection request")]
    UserRejected,
    #[error("Connection request already pending. Please check your wallet.")]
    RequestPending,
    #[error("Unknown network: chain {0}")]
    UnknownNetwork(u64),
    #[error("unexpected wallet response: {0}")]
    UnexpectedResponse(String),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl WalletError {
    fn from_provider(e: ProviderError) -> Self {
        match e.code {
            USER_REJECTED => Self::UserRejected,
            REQUEST_PENDING => Self::RequestPending,
            _ => Self::Provider(e),
        }
    }
}

/// Connection state shown to the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WalletState {
    pub is_connected: bool,
    pub account: Option<String>,
    pub chain_id: Option<u64>,
    pub is_loading: bool,
    pub error: Option<String>,
}

/// Notifications pushed by the wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    AccountsChanged(Vec<String>),
    /// Hex chain id, e.g. `"0x7d1"`
    ChainChanged(String),
}

/// Tracks one wallet connection and the user's explicit-disconnect choice.
pub struct WalletSession {
    provider: Option<Arc<dyn WalletProvider>>,
    flag: DisconnectFlag,
    state: RwLock<WalletState>,
}

impl WalletSession {
    pub fn new(provider: Option<Arc<dyn WalletProvider>>, flag: DisconnectFlag) -> Self {
        Self {
            provider,
            flag,
            state: RwLock::new(WalletState::default()),
        }
    }

    pub fn state(&self) -> WalletState {
        self.read().clone()
    }

    /// Silently restore a previous connection.
    ///
    /// Returns false when there is no wallet, when the user disconnected
    /// explicitly, or when no account is authorized.
    pub async fn check_connection(&self) -> Result<bool, WalletError> {
        let Some(provider) = &self.provider else {
            return Ok(false);
        };
        if self.flag.is_set() {
            debug!("Wallet was disconnected by the user, not reconnecting");
            return Ok(false);
        }

        let accounts = accounts(provider.request("eth_accounts", json!([])).await?)?;
        let Some(account) = accounts.into_iter().next() else {
            return Ok(false);
        };
        let chain_id = self.remote_chain_id(provider.as_ref()).await?;

        self.set_connected(account, chain_id);
        Ok(true)
    }

    /// Ask the wallet for account access.
    pub async fn connect(&self) -> Result<(), WalletError> {
        let Some(provider) = self.provider.clone() else {
            return Err(self.fail(WalletError::Unavailable));
        };

        {
            let mut state = self.write();
            state.is_loading = true;
            state.error = None;
        }

        let result = async {
            let accounts = accounts(
                provider
                    .request("eth_requestAccounts", json!([]))
                    .await
                    .map_err(WalletError::from_provider)?,
            )?;
            let account = accounts
                .into_iter()
                .next()
                .ok_or_else(|| WalletError::UnexpectedResponse("no accounts returned".to_string()))?;
            let chain_id = self.remote_chain_id(provider.as_ref()).await?;
            Ok::<_, WalletError>((account, chain_id))
        }
        .await;

        match result {
            Ok((account, chain_id)) => {
                info!("Wallet connected: {} on chain {}", account, chain_id);
                self.set_connected(account, chain_id);
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Forget the connection and stay disconnected until `connect`.
    pub async fn disconnect(&self) {
        *self.write() = WalletState::default();
        if let Err(e) = self.flag.set() {
            warn!("Failed to persist wallet disconnect: {}", e);
        }

        if let Some(provider) = &self.provider {
            if provider.is_metamask() {
                let params = json!([{ "eth_accounts": {} }]);
                if let Err(e) = provider.request("wallet_revokePermissions", params).await {
                    debug!("Wallet did not revoke permissions: {}", e);
                }
            }
        }
        info!("Wallet disconnected");
    }

    /// Switch the wallet to `chain_id`, registering the chain first if the
    /// wallet does not know it.
    pub async fn switch_chain(&self, chain_id: u64) -> Result<(), WalletError> {
        let Some(provider) = self.provider.clone() else {
            return Err(self.fail(WalletError::Unavailable));
        };

        let params = json!([{ "chainId": format!("{:#x}", chain_id) }]);
        match provider.request("wallet_switchEthereumChain", params.clone()).await {
            Ok(_) => {}
            Err(e) if e.code == UNRECOGNIZED_CHAIN => {
                debug!("Chain {} unknown to wallet, adding it", chain_id);
                if let Err(e) = self.add_network(chain_id).await {
                    warn!("Failed to add network {}: {}", chain_id, e);
                    self.write().error = Some("Failed to add network to wallet".to_string());
                    return Err(e);
                }
                if let Err(e) = provider.request("wallet_switchEthereumChain", params).await {
                    return Err(self.fail_with(WalletError::from_provider(e), "Failed to switch network"));
                }
            }
            Err(e) => {
                return Err(self.fail_with(WalletError::from_provider(e), "Failed to switch network"));
            }
        }

        self.write().chain_id = Some(chain_id);
        Ok(())
    }

    /// Register a known network with the wallet.
    pub async fn add_network(&self, chain_id: u64) -> Result<(), WalletError> {
        let provider = self.provider.as_ref().ok_or(WalletError::Unavailable)?;
        let network: &NetworkConfig = network_for(chain_id).ok_or(WalletError::UnknownNetwork(chain_id))?;

        provider
            .request("wallet_addEthereumChain", network.add_chain_params())
            .await
            .map_err(WalletError::from_provider)?;
        info!("Added {} to wallet", network.chain_name);
        Ok(())
    }

    pub async fn handle_event(&self, event: WalletEvent) {
        match event {
            WalletEvent::AccountsChanged(accounts) => match accounts.into_iter().next() {
                None => self.disconnect().await,
                Some(account) => {
                    debug!("Active account changed to {}", account);
                    self.write().account = Some(account);
                }
            },
            WalletEvent::ChainChanged(hex) => match parse_chain_id(&hex) {
                Some(chain_id) => {
                    debug!("Wallet switched to chain {}", chain_id);
                    self.write().chain_id = Some(chain_id);
                }
                None => warn!("Ignoring malformed chain id {:?}", hex),
            },
        }
    }

    /// Apply wallet events until every sender is dropped.
    pub async fn run_events(&self, mut events: mpsc::Receiver<WalletEvent>) {
        while let Some(event) = events.recv().await {
            self.handle_event(event).await;
        }
        debug!("Wallet event stream closed");
    }

    async fn remote_chain_id(&self, provider: &dyn WalletProvider) -> Result<u64, WalletError> {
        let value = provider.request("eth_chainId", json!([])).await?;
        value
            .as_str()
            .and_then(parse_chain_id)
            .ok_or_else(|| WalletError::UnexpectedResponse(format!("bad chain id {}", value)))
    }

    fn set_connected(&self, account: String, chain_id: u64) {
        *self.write() = WalletState {
            is_connected: true,
            account: Some(account),
            chain_id: Some(chain_id),
            is_loading: false,
            error: None,
        };
        if let Err(e) = self.flag.clear() {
            warn!("Failed to clear wallet disconnect flag: {}", e);
        }
    }

    fn fail(&self, e: WalletError) -> WalletError {
        let message = e.to_string();
        self.fail_with(e, &message)
    }

    fn fail_with(&self, e: WalletError, message: &str) -> WalletError {
        let mut state = self.write();
        state.is_loading = false;
        state.error = Some(message.to_string());
        e
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, WalletState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, WalletState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn accounts(value: Value) -> Result<Vec<String>, WalletError> {
    serde_json::from_value(value).map_err(|e| WalletError::UnexpectedResponse(e.to_string()))
}

/// Parse a `0x`-prefixed hex chain id.
pub fn parse_chain_id(hex: &str) -> Option<u64> {
    let digits = hex.strip_prefix("0x").or_else(|| hex.strip_prefix("0X"))?;
    u64::from_str_radix(digits, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::BLOCKDAG_TESTNET;
    use crate::wallet::store::scratch_dir;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const TESTNET: u64 = BLOCKDAG_TESTNET.chain_id;
    const ACCOUNT: &str = "0x00000000000000000000000000000000000000aa";

    /// Scripted wallet: each method answers from a queue, falling back to a default.
    #[derive(Default)]
    struct ScriptedWallet {
        answers: Mutex<HashMap<String, Vec<Result<Value, ProviderError>>>>,
        calls: Mutex<Vec<(String, Value)>>,
        metamask: bool,
    }

    impl ScriptedWallet {
        fn answer(&self, method: &str, result: Result<Value, ProviderError>) {
            self.answers
                .lock()
                .unwrap()
                .entry(method.to_string())
                .or_default()
                .push(result);
        }

        fn methods(&self) -> Vec<String> {
            self.calls.lock().unwrap().iter().map(|(m, _)| m.clone()).collect()
        }
    }

    #[async_trait]
    impl WalletProvider for ScriptedWallet {
        async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
            self.calls.lock().unwrap().push((method.to_string(), params));
            let mut answers = self.answers.lock().unwrap();
            if let Some(queue) = answers.get_mut(method) {
                if !queue.is_empty() {
                    return queue.remove(0);
                }
            }
            match method {
                "eth_accounts" | "eth_requestAccounts" => Ok(json!([ACCOUNT])),
                "eth_chainId" => Ok(json!("0x7d1")),
                _ => Ok(Value::Null),
            }
        }

        fn is_metamask(&self) -> bool {
            self.metamask
        }
    }

    fn session(name: &str, wallet: ScriptedWallet) -> (WalletSession, Arc<ScriptedWallet>) {
        let wallet = Arc::new(wallet);
        let session = WalletSession::new(
            Some(Arc::clone(&wallet) as Arc<dyn WalletProvider>),
            DisconnectFlag::new(scratch_dir(name)),
        );
        (session, wallet)
    }

    #[test]
    fn test_parse_chain_id() {
        assert_eq!(parse_chain_id("0x7d1"), Some(2001));
        assert_eq!(parse_chain_id("0x413"), Some(1043));
        assert_eq!(parse_chain_id("2001"), None);
        assert_eq!(parse_chain_id("0xzz"), None);
    }

    #[tokio::test]
    async fn test_connect() {
        let (session, _) = session("connect", ScriptedWallet::default());
        session.connect().await.unwrap();

        let state = session.state();
        assert!(state.is_connected);
        assert_eq!(state.account.as_deref(), Some(ACCOUNT));
        assert_eq!(state.chain_id, Some(TESTNET));
        assert!(!state.is_loading);
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn test_connect_without_wallet() {
        let session = WalletSession::new(None, DisconnectFlag::new(scratch_dir("no-wallet")));

        assert_eq!(session.connect().await, Err(WalletError::Unavailable));
        assert!(!session.check_connection().await.unwrap());
        assert!(session.state().error.unwrap().starts_with("No wallet found"));
    }

    #[tokio::test]
    async fn test_connect_error_codes() {
        let wallet = ScriptedWallet::default();
        wallet.answer("eth_requestAccounts", Err(ProviderError::new(USER_REJECTED, "denied")));
        wallet.answer("eth_requestAccounts", Err(ProviderError::new(REQUEST_PENDING, "pending")));
        let (session, _) = session("connect-codes", wallet);

        assert_eq!(session.connect().await, Err(WalletError::UserRejected));
        assert_eq!(
            session.state().error.as_deref(),
            Some("User rejected the connection request")
        );
        assert!(!session.state().is_loading);

        assert_eq!(session.connect().await, Err(WalletError::RequestPending));
        assert!(!session.state().is_connected);
    }

    #[tokio::test]
    async fn test_disconnect_blocks_silent_reconnect() {
        let wallet = ScriptedWallet {
            metamask: true,
            ..Default::default()
        };
        let (session, wallet) = session("disconnect", wallet);

        assert!(session.check_connection().await.unwrap());
        session.disconnect().await;
        assert_eq!(session.state(), WalletState::default());
        assert!(wallet.methods().contains(&"wallet_revokePermissions".to_string()));

        assert!(!session.check_connection().await.unwrap());

        // An explicit connect clears the flag
        session.connect().await.unwrap();
        session.disconnect().await;
        session.connect().await.unwrap();
        assert!(session.check_connection().await.unwrap());
    }

    #[tokio::test]
    async fn test_check_connection_without_accounts() {
        let wallet = ScriptedWallet::default();
        wallet.answer("eth_accounts", Ok(json!([])));
        let (session, _) = session("no-accounts", wallet);

        assert!(!session.check_connection().await.unwrap());
        assert!(!session.state().is_connected);
    }

    #[tokio::test]
    async fn test_switch_chain_adds_unknown_network() {
        let wallet = ScriptedWallet::default();
        wallet.answer(
            "wallet_switchEthereumChain",
            Err(ProviderError::new(UNRECOGNIZED_CHAIN, "Unrecognized chain ID")),
        );
        let (session, wallet) = session("switch-add", wallet);

        session.switch_chain(TESTNET).await.unwrap();

        assert_eq!(
            wallet.methods(),
            vec![
                "wallet_switchEthereumChain",
                "wallet_addEthereumChain",
                "wallet_switchEthereumChain"
            ]
        );
        let calls = wallet.calls.lock().unwrap();
        assert_eq!(calls[0].1, json!([{ "chainId": "0x7d1" }]));
        assert_eq!(calls[1].1[0]["chainId"], json!("0x7d1"));
        drop(calls);
        assert_eq!(session.state().chain_id, Some(TESTNET));
    }

    #[tokio::test]
    async fn test_switch_chain_add_failure() {
        let wallet = ScriptedWallet::default();
        wallet.answer(
            "wallet_switchEthereumChain",
            Err(ProviderError::new(UNRECOGNIZED_CHAIN, "Unrecognized chain ID")),
        );
        wallet.answer(
            "wallet_addEthereumChain",
            Err(ProviderError::new(USER_REJECTED, "denied")),
        );
        let (session, _) = session("switch-add-fail", wallet);

        assert_eq!(session.switch_chain(TESTNET).await, Err(WalletError::UserRejected));
        assert_eq!(
            session.state().error.as_deref(),
            Some("Failed to add network to wallet")
        );
    }

    #[tokio::test]
    async fn test_add_unknown_network() {
        let (session, wallet) = session("add-unknown", ScriptedWallet::default());

        assert_eq!(session.add_network(1).await, Err(WalletError::UnknownNetwork(1)));
        assert!(wallet.methods().is_empty());
    }

    #[tokio::test]
    async fn test_events() {
        let (session, _) = session("events", ScriptedWallet::default());
        session.connect().await.unwrap();

        let (tx, rx) = mpsc::channel(8);
        tx.send(WalletEvent::ChainChanged("0x413".to_string())).await.unwrap();
        tx.send(WalletEvent::AccountsChanged(vec!["0xbb".to_string()])).await.unwrap();
        drop(tx);
        session.run_events(rx).await;

        let state = session.state();
        assert_eq!(state.chain_id, Some(1043));
        assert_eq!(state.account.as_deref(), Some("0xbb"));

        session.handle_event(WalletEvent::AccountsChanged(vec![])).await;
        assert!(!session.state().is_connected);
        assert!(!session.check_connection().await.unwrap());
    }
}

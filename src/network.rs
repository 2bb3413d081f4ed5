use alloy_primitives::{address, Address};
use serde::Serialize;

/// Native currency descriptor, as passed to `wallet_addEthereumChain`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NativeCurrency {
    pub name: &'static str,
    pub symbol: &'static str,
    pub decimals: u8,
}

/// Static description of a chain the contracts can live on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    pub chain_id: u64,
    pub chain_name: &'static str,
    pub native_currency: NativeCurrency,
    pub rpc_urls: &'static [&'static str],
    pub block_explorer_urls: &'static [&'static str],
    pub faucet_url: Option<&'static str>,
}

const BDAG: NativeCurrency = NativeCurrency {
    name: "BDAG",
    symbol: "BDAG",
    decimals: 18,
};

pub const AWAKENING_TESTNET: NetworkConfig = NetworkConfig {
    chain_id: 1043,
    chain_name: "Awakening Testnet",
    native_currency: BDAG,
    rpc_urls: &[
        "https://rpc.awakening.bdagscan.com",
        "relay.awakening.bdagscan.com",
    ],
    block_explorer_urls: &["https://awakening.bdagscan.com/"],
    faucet_url: Some("https://awakening.bdagscan.com/faucet"),
};

pub const BLOCKDAG_TESTNET: NetworkConfig = NetworkConfig {
    chain_id: 2001,
    chain_name: "BlockDAG Testnet",
    native_currency: BDAG,
    rpc_urls: &["https://rpc.testnet.bdagscan.com"],
    block_explorer_urls: &["https://testnet.bdagscan.com/"],
    faucet_url: None,
};

pub const BLOCKDAG_MAINNET: NetworkConfig = NetworkConfig {
    chain_id: 2000,
    chain_name: "BlockDAG Mainnet",
    native_currency: BDAG,
    rpc_urls: &["https://rpc.mainnet.bdagscan.com"],
    block_explorer_urls: &["https://bdagscan.com/"],
    faucet_url: None,
};

/// Default chain for new sessions and the keeper.
pub const DEFAULT_CHAIN_ID: u64 = AWAKENING_TESTNET.chain_id;

const NETWORKS: [&NetworkConfig; 3] = [&AWAKENING_TESTNET, &BLOCKDAG_TESTNET, &BLOCKDAG_MAINNET];

impl NetworkConfig {
    /// Chain id in the `0x`-prefixed hex form wallets expect.
    pub fn chain_id_hex(&self) -> String {
        format!("{:#x}", self.chain_id)
    }

    /// Parameters for a `wallet_addEthereumChain` request.
    pub fn add_chain_params(&self) -> serde_json::Value {
        serde_json::json!([{
            "chainId": self.chain_id_hex(),
            "chainName": self.chain_name,
            "nativeCurrency": self.native_currency,
            "rpcUrls": self.rpc_urls,
            "blockExplorerUrls": self.block_explorer_urls,
        }])
    }
}

/// Look up a known network by chain id.
pub fn network_for(chain_id: u64) -> Option<&'static NetworkConfig> {
    NETWORKS.iter().copied().find(|n| n.chain_id == chain_id)
}

/// Deployed contract addresses on one chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractAddresses {
    pub market_factory: Address,
    pub staking: Address,
    pub resolution: Address,
}

impl ContractAddresses {
    /// All three contracts have a non-zero address.
    pub fn is_deployed(&self) -> bool {
        !self.market_factory.is_zero() && !self.staking.is_zero() && !self.resolution.is_zero()
    }
}

// Same deployment is registered for every BlockDAG network.
const BLOCKDAG_DEPLOYMENT: ContractAddresses = ContractAddresses {
    market_factory: address!("8BF1Df0361AadC2B316E224EF0Bae4b327034380"),
    staking: address!("4f186F7d8CcD66D5FD4630527f40BdA238b009d2"),
    resolution: address!("020209A91755158aCD616D9f4dFF1E9b8F6031d7"),
};

/// Contract addresses for a chain.
///
/// Returns `None` when the chain is unknown or any contract is still at the
/// zero address.
pub fn addresses_for(chain_id: u64) -> Option<ContractAddresses> {
    let addresses = match chain_id {
        1043 | 2001 | 2000 => BLOCKDAG_DEPLOYMENT,
        _ => return None,
    };
    addresses.is_deployed().then_some(addresses)
}

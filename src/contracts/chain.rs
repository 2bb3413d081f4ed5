use std::str::FromStr;

use alloy::primitives::utils::{format_ether, parse_ether};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionReceipt;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;
use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use super::bindings::{MarketFactory, ResolutionContract, StakingContract};
use super::{
    ChainMarket, ContractError, ContractService, CreatedMarket, Linkage, MarketStakes, NewMarket,
    Result, TxHash,
};
use crate::events::Side;
use crate::network::{addresses_for, ContractAddresses};
use crate::state::{MarketStatus, MarketType, OracleType};

type FactoryInstance = MarketFactory::MarketFactoryInstance<DynProvider>;
type StakingInstance = StakingContract::StakingContractInstance<DynProvider>;
type ResolutionInstance = ResolutionContract::ResolutionContractInstance<DynProvider>;

/// `ContractService` backed by a JSON-RPC endpoint and a local signer.
pub struct ChainContractService {
    provider: DynProvider,
    signer_address: Address,
    chain_id: u64,
    addresses: ContractAddresses,
}

impl ChainContractService {
    /// Connect to `rpc_url` and bind the contracts deployed on `chain_id`.
    ///
    /// `addresses` overrides the built-in deployment table.
    pub async fn connect(
        rpc_url: &str,
        private_key: &str,
        chain_id: u64,
        addresses: Option<ContractAddresses>,
    ) -> Result<Self> {
        let addresses = addresses
            .filter(ContractAddresses::is_deployed)
            .or_else(|| addresses_for(chain_id))
            .ok_or(ContractError::NetworkUnavailable(chain_id))?;

        let signer = PrivateKeySigner::from_str(private_key)
            .map_err(|e| ContractError::InvalidInput(format!("private key: {}", e)))?
            .with_chain_id(Some(chain_id));
        let signer_address = signer.address();

        let url: reqwest::Url = rpc_url
            .parse()
            .map_err(|e| ContractError::InvalidInput(format!("rpc url {}: {}", rpc_url, e)))?;

        let provider = ProviderBuilder::new().wallet(signer).connect_http(url).erased();

        let remote_chain = provider
            .get_chain_id()
            .await
            .map_err(|e| ContractError::from_message(e.to_string()))?;
        if remote_chain != chain_id {
            warn!(
                "RPC endpoint serves chain {} but chain {} was configured",
                remote_chain, chain_id
            );
            return Err(ContractError::NetworkUnavailable(remote_chain));
        }

        info!(
            chain_id,
            signer = %signer_address,
            factory = %addresses.market_factory,
            staking = %addresses.staking,
            resolution = %addresses.resolution,
            "Contracts bound"
        );

        Ok(Self {
            provider,
            signer_address,
            chain_id,
            addresses,
        })
    }

    pub fn signer_address(&self) -> Address {
        self.signer_address
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn factory(&self) -> FactoryInstance {
        MarketFactory::new(self.addresses.market_factory, self.provider.clone())
    }

    fn staking(&self) -> StakingInstance {
        StakingContract::new(self.addresses.staking, self.provider.clone())
    }

    fn resolution(&self) -> ResolutionInstance {
        ResolutionContract::new(self.addresses.resolution, self.provider.clone())
    }

    /// Whether any bytecode lives at `address`.
    async fn has_code(&self, address: Address) -> bool {
        match self.provider.get_code_at(address).await {
            Ok(code) => !code.is_empty(),
            Err(e) => {
                warn!("Failed to read code at {}: {}", address, e);
                false
            }
        }
    }
}

fn call_error(err: alloy::contract::Error) -> ContractError {
    ContractError::from_message(err.to_string())
}

fn receipt_error(err: impl std::fmt::Display) -> ContractError {
    ContractError::from_message(err.to_string())
}

fn ensure_success(receipt: &TransactionReceipt) -> Result<TxHash> {
    if receipt.status() {
        Ok(receipt.transaction_hash)
    } else {
        Err(ContractError::Reverted(format!(
            "transaction {} failed",
            receipt.transaction_hash
        )))
    }
}

fn to_u64(value: U256) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}

fn to_unix(value: U256) -> i64 {
    i64::try_from(to_u64(value)).unwrap_or(i64::MAX)
}

/// Wei to ether.
fn wei_to_ether(value: U256) -> Result<Decimal> {
    let text = format_ether(value);
    Decimal::from_str(&text)
        .map(|d| d.normalize())
        .map_err(|e| ContractError::Rpc(format!("amount {} out of range: {}", text, e)))
}

/// Ether to wei.
fn ether_to_wei(amount: Decimal) -> Result<U256> {
    parse_ether(&amount.normalize().to_string())
        .map_err(|e| ContractError::InvalidInput(format!("amount {}: {}", amount, e)))
}

#[async_trait]
impl ContractService for ChainContractService {
    async fn create_market(&self, market: NewMarket) -> Result<CreatedMarket> {
        if market.end_time <= Utc::now().timestamp() {
            return Err(ContractError::InvalidInput(
                "End time must be a future timestamp".to_string(),
            ));
        }

        let factory = self.factory();

        match factory.owner().call().await {
            Ok(owner) if owner != self.signer_address => return Err(ContractError::NotOwner),
            Ok(_) => {}
            Err(e) => warn!("Owner preflight skipped: {}", e),
        }

        let end_time = U256::from(market.end_time as u64);
        let receipt = factory
            .createMarket(
                market.title,
                market.description,
                market.market_type.to_chain(),
                market.region,
                end_time,
                market.oracle_type.to_chain(),
            )
            .send()
            .await
            .map_err(call_error)?
            .get_receipt()
            .await
            .map_err(receipt_error)?;
        let tx_hash = ensure_success(&receipt)?;

        let market_id = receipt
            .inner
            .logs()
            .iter()
            .find_map(|log| log.log_decode::<MarketFactory::MarketCreated>().ok())
            .map(|log| to_u64(log.inner.data.marketId));

        info!(?market_id, %tx_hash, "Market created");
        Ok(CreatedMarket { market_id, tx_hash })
    }

    async fn place_stake(&self, market_id: u64, side: Side, amount: Decimal) -> Result<TxHash> {
        if amount <= Decimal::ZERO {
            return Err(ContractError::InvalidInput(
                "stake amount must be positive".to_string(),
            ));
        }
        let value = ether_to_wei(amount)?;
        let staking = self.staking();
        let id = U256::from(market_id);

        debug!(market_id, ?side, %amount, %value, "Placing stake");

        let linked_factory = staking.marketFactory().call().await.map_err(call_error)?;
        if linked_factory.is_zero() {
            return Err(ContractError::NotLinked("MarketFactory is not set on StakingContract"));
        }

        if let Err(e) = staking.getMarketStakes(id).call().await {
            debug!("Stake preflight for market {} failed: {}", market_id, e);
            return Err(ContractError::MarketNotFound(market_id));
        }

        if !self.is_market_open(market_id).await? {
            return Err(ContractError::MarketNotOpen(market_id));
        }

        let receipt = staking
            .placeStake(id, side.as_bool())
            .value(value)
            .send()
            .await
            .map_err(call_error)?
            .get_receipt()
            .await
            .map_err(receipt_error)?;

        ensure_success(&receipt)
    }

    async fn resolve_market(&self, market_id: u64, outcome: bool) -> Result<TxHash> {
        let receipt = self
            .resolution()
            .resolveMarket(U256::from(market_id), outcome)
            .send()
            .await
            .map_err(call_error)?
            .get_receipt()
            .await
            .map_err(receipt_error)?;

        ensure_success(&receipt)
    }

    async fn get_market(&self, market_id: u64) -> Result<ChainMarket> {
        let m = self
            .factory()
            .getMarket(U256::from(market_id))
            .call()
            .await
            .map_err(call_error)?;

        Ok(ChainMarket {
            id: to_u64(m.id),
            title: m.title,
            description: m.description,
            market_type: MarketType::from_chain(m.marketType),
            region: m.region,
            end_time: to_unix(m.endTime),
            oracle_type: OracleType::from_chain(m.oracleType),
            status: MarketStatus::from_chain(m.status),
            creator: m.creator,
            created_at: to_unix(m.createdAt),
            resolved: m.resolved,
            outcome: m.outcome,
        })
    }

    async fn get_market_stakes(&self, market_id: u64) -> Result<MarketStakes> {
        let s = self
            .staking()
            .getMarketStakes(U256::from(market_id))
            .call()
            .await
            .map_err(call_error)?;

        Ok(MarketStakes {
            total_staked: wei_to_ether(s.totalStaked)?,
            yes_stake: wei_to_ether(s.yesStake)?,
            no_stake: wei_to_ether(s.noStake)?,
            participant_count: to_u64(s.participantCount),
        })
    }

    async fn get_total_markets(&self) -> Result<u64> {
        let factory_address = self.addresses.market_factory;
        if !self.has_code(factory_address).await {
            return Err(ContractError::NotDeployed(factory_address.to_string()));
        }

        let count = self
            .factory()
            .getTotalMarkets()
            .call()
            .await
            .map_err(call_error)?;
        Ok(to_u64(count))
    }

    async fn is_market_resolved(&self, market_id: u64) -> Result<bool> {
        self.resolution()
            .isMarketResolved(U256::from(market_id))
            .call()
            .await
            .map_err(call_error)
    }

    async fn is_market_open(&self, market_id: u64) -> Result<bool> {
        self.factory()
            .isMarketOpen(U256::from(market_id))
            .call()
            .await
            .map_err(call_error)
    }

    async fn get_user_stake(&self, market_id: u64, user: Address) -> Result<Decimal> {
        let stake = self
            .staking()
            .getUserStake(U256::from(market_id), user)
            .call()
            .await
            .map_err(call_error)?;
        wei_to_ether(stake)
    }

    async fn get_market_outcome(&self, market_id: u64) -> Result<bool> {
        self.resolution()
            .getMarketOutcome(U256::from(market_id))
            .call()
            .await
            .map_err(call_error)
    }

    async fn check_linkage(&self) -> Result<Linkage> {
        let staking_address = self.addresses.staking;
        if !self.has_code(staking_address).await {
            return Err(ContractError::NotDeployed(staking_address.to_string()));
        }

        let staking = self.staking();
        let factory = staking.marketFactory().call().await.map_err(call_error)?;
        let resolution = staking.resolutionContract().call().await.map_err(call_error)?;

        Ok(Linkage {
            market_factory_linked: !factory.is_zero(),
            resolution_contract_linked: !resolution.is_zero(),
        })
    }

    async fn link_market_factory(&self) -> Result<TxHash> {
        info!(factory = %self.addresses.market_factory, "Linking MarketFactory in StakingContract");
        let receipt = self
            .staking()
            .setMarketFactory(self.addresses.market_factory)
            .send()
            .await
            .map_err(call_error)?
            .get_receipt()
            .await
            .map_err(receipt_error)?;

        ensure_success(&receipt)
    }

    async fn link_resolution_contract(&self) -> Result<TxHash> {
        info!(resolution = %self.addresses.resolution, "Linking ResolutionContract in StakingContract");
        let receipt = self
            .staking()
            .setResolutionContract(self.addresses.resolution)
            .send()
            .await
            .map_err(call_error)?
            .get_receipt()
            .await
            .map_err(receipt_error)?;

        ensure_success(&receipt)
    }
}

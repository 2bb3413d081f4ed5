use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use alloy_primitives::Address;
use anyhow::{bail, Context};
use serde::Deserialize;

use crate::access::{AdminPolicy, Environment};
use crate::network::{ContractAddresses, DEFAULT_CHAIN_ID};
use crate::strategy::{Outcome, ResolutionConfig};
use crate::wallet::DisconnectFlag;

/// Environment variable holding the keeper's signing key.
pub const PRIVATE_KEY_VAR: &str = "AGRIRISK_PRIVATE_KEY";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: General,
    pub network: Network,
    pub cache: Cache,
    pub resolution: Resolution,
    pub access: Access,
    pub credentials: Credentials,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct General {
    pub log_level: String,
    /// Where small persisted flags (wallet disconnect) live
    pub state_dir: PathBuf,
}

impl Default for General {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            state_dir: PathBuf::from(".agririsk"),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Network {
    pub chain_id: u64,
    /// Falls back to the first RPC URL of the known network
    pub rpc_url: Option<String>,
    pub addresses: Option<Addresses>,
}

impl Default for Network {
    fn default() -> Self {
        Self {
            chain_id: DEFAULT_CHAIN_ID,
            rpc_url: None,
            addresses: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Addresses {
    pub market_factory: String,
    pub staking: String,
    pub resolution: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Cache {
    pub duration_secs: u64,
}

impl Default for Cache {
    fn default() -> Self {
        Self { duration_secs: 30 }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Resolution {
    pub enabled: bool,
    pub check_interval_secs: u64,
    pub auto_resolve_on_expiry: bool,
    pub default_outcome: Outcome,
    pub majority_threshold: u8,
}

impl Default for Resolution {
    fn default() -> Self {
        let defaults = ResolutionConfig::default();
        Self {
            enabled: defaults.enabled,
            check_interval_secs: defaults.check_interval.as_secs(),
            auto_resolve_on_expiry: defaults.auto_resolve_on_expiry,
            default_outcome: defaults.default_outcome,
            majority_threshold: defaults.majority_threshold,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Access {
    pub environment: Environment,
    pub admin_role: String,
}

impl Default for Access {
    fn default() -> Self {
        let defaults = AdminPolicy::default();
        Self {
            environment: defaults.environment,
            admin_role: defaults.admin_role,
        }
    }
}

#[derive(Default, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub private_key: Option<String>,
}

// Keep the key out of `{:?}` output.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Config {
    /// Read `path` (missing file means all defaults), then apply `.env` and
    /// the process environment.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            Self::parse(&contents).with_context(|| format!("parsing {}", path.display()))?
        } else {
            Self::default()
        };

        dotenvy::dotenv().ok();
        if let Ok(key) = env::var(PRIVATE_KEY_VAR) {
            config.credentials.private_key = Some(key);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.resolution.majority_threshold > 100 {
            bail!(
                "resolution.majority_threshold must be a percentage, got {}",
                self.resolution.majority_threshold
            );
        }
        if self.resolution.check_interval_secs == 0 {
            bail!("resolution.check_interval_secs must be positive");
        }
        Ok(())
    }

    pub fn private_key(&self) -> anyhow::Result<&str> {
        self.credentials
            .private_key
            .as_deref()
            .with_context(|| format!("no private key: set {} or [credentials] private_key", PRIVATE_KEY_VAR))
    }

    pub fn cache_duration(&self) -> Duration {
        Duration::from_secs(self.cache.duration_secs)
    }

    pub fn resolution_config(&self) -> ResolutionConfig {
        ResolutionConfig {
            enabled: self.resolution.enabled,
            check_interval: Duration::from_secs(self.resolution.check_interval_secs),
            auto_resolve_on_expiry: self.resolution.auto_resolve_on_expiry,
            default_outcome: self.resolution.default_outcome,
            majority_threshold: self.resolution.majority_threshold,
        }
    }

    /// Wallet-disconnect flag stored under `general.state_dir`.
    pub fn disconnect_flag(&self) -> DisconnectFlag {
        DisconnectFlag::new(&self.general.state_dir)
    }

    pub fn admin_policy(&self) -> AdminPolicy {
        AdminPolicy::new(self.access.environment, self.access.admin_role.clone())
    }

    /// Explicit contract addresses, if configured.
    pub fn contract_addresses(&self) -> anyhow::Result<Option<ContractAddresses>> {
        let Some(addrs) = &self.network.addresses else {
            return Ok(None);
        };
        let parse = |name: &str, value: &str| -> anyhow::Result<Address> {
            value
                .parse()
                .with_context(|| format!("network.addresses.{} is not an address: {}", name, value))
        };
        Ok(Some(ContractAddresses {
            market_factory: parse("market_factory", &addrs.market_factory)?,
            staking: parse("staking", &addrs.staking)?,
            resolution: parse("resolution", &addrs.resolution)?,
        }))
    }

    /// Configured RPC URL, or the known network's first one.
    pub fn rpc_url(&self) -> anyhow::Result<String> {
        if let Some(url) = &self.network.rpc_url {
            return Ok(url.clone());
        }
        crate::network::network_for(self.network.chain_id)
            .and_then(|n| n.rpc_urls.first())
            .map(|url| url.to_string())
            .with_context(|| format!("no rpc_url configured for unknown chain {}", self.network.chain_id))
    }
}

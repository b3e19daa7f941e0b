use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use crate::{
    hbar::{Hbar, HbarError},
    id::AccountId,
    key::{Key, KeyError, PrivateKey},
    network::{FeeSchedule, in_memory::GenesisAccount},
};

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "LEDGER_SCENARIOS_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read `{path}`: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("At least one account is required")]
    NoAccounts,
    #[error("Account {0} is configured more than once")]
    DuplicateAccount(AccountId),
    #[error("Private key of account {account_id} is invalid: {source}")]
    InvalidKey {
        account_id: AccountId,
        source: KeyError,
    },
    #[error("Initial balance of account {account_id} is invalid: {source}")]
    InvalidBalance {
        account_id: AccountId,
        source: HbarError,
    },
    #[error("Initial balance of account {0} must not be negative")]
    NegativeBalance(AccountId),
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountConfig {
    pub id: AccountId,
    pub private_key: String,
    /// Whole hbars the account starts with on a local network.
    #[serde(default)]
    pub initial_hbar: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// Fixed wait before reading from the mirror node.
    pub settle_ms: u64,
    /// How long the local mirror node lags behind consensus.
    pub ingest_delay_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            settle_ms: 4_000,
            ingest_delay_ms: 0,
            request_timeout_ms: 10_000,
        }
    }
}

impl MirrorConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn ingest_delay(&self) -> Duration {
        Duration::from_millis(self.ingest_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Parsed and validated configuration file. The first account acts as
/// treasury and default operator.
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioConfig {
    pub accounts: Vec<AccountConfig>,
    #[serde(default)]
    pub mirror: MirrorConfig,
    #[serde(default)]
    pub fees: FeeSchedule,
}

/// Configured account with its key parsed.
#[derive(Debug, Clone)]
pub struct ConfiguredAccount {
    pub account_id: AccountId,
    pub private_key: PrivateKey,
    pub initial_balance: Hbar,
}

impl ScenarioConfig {
    /// Loads the file named by [`CONFIG_PATH_ENV`], falling back to `default_path`.
    pub fn load(default_path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| default_path.as_ref().to_path_buf());
        Self::from_file(&path)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.accounts()?;
        Ok(config)
    }

    /// Accounts with parsed keys and balances, in file order.
    pub fn accounts(&self) -> Result<Vec<ConfiguredAccount>, ConfigError> {
        if self.accounts.is_empty() {
            return Err(ConfigError::NoAccounts);
        }
        let mut seen = HashSet::new();
        self.accounts
            .iter()
            .map(|account| {
                let account_id = account.id;
                if !seen.insert(account_id) {
                    return Err(ConfigError::DuplicateAccount(account_id));
                }
                let private_key = PrivateKey::from_str_ed25519(&account.private_key)
                    .map_err(|source| ConfigError::InvalidKey { account_id, source })?;
                let initial_balance = Hbar::from_decimal(account.initial_hbar)
                    .map_err(|source| ConfigError::InvalidBalance { account_id, source })?;
                if initial_balance.is_negative() {
                    return Err(ConfigError::NegativeBalance(account_id));
                }
                Ok(ConfiguredAccount {
                    account_id,
                    private_key,
                    initial_balance,
                })
            })
            .collect()
    }

    pub fn genesis(&self) -> Result<Vec<GenesisAccount>, ConfigError> {
        Ok(self
            .accounts()?
            .into_iter()
            .map(|account| GenesisAccount {
                account_id: account.account_id,
                key: Key::from(&account.private_key),
                balance: account.initial_balance,
            })
            .collect())
    }
}

//! Configuration management for bch-msg-wallet

use crate::error::{Result, WalletError};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    #[serde(default = "default_rest_url")]
    pub rest_url: String,
    #[serde(default = "default_explorer_url")]
    pub explorer_url: String,
    /// Maximum number of history entries a signal scan looks at.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    #[serde(default = "default_fee_rate")]
    pub fee_rate_sats_per_byte: u64,
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
    /// Pause before the UTXO refresh that funds a signal.
    #[serde(default = "default_utxo_settle_ms")]
    pub utxo_settle_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_relay_url")]
    pub url: String,
    #[serde(default = "default_relay_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_wallets_dir")]
    pub wallets_dir: String,
    #[serde(default = "default_file_staging_url")]
    pub file_staging_url: String,
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rest_url: default_rest_url(),
            explorer_url: default_explorer_url(),
            history_limit: default_history_limit(),
            fee_rate_sats_per_byte: default_fee_rate(),
            http_timeout_secs: default_http_timeout(),
            utxo_settle_ms: default_utxo_settle_ms(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            url: default_relay_url(),
            timeout_secs: default_relay_timeout(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            delay_ms: default_delay_ms(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            wallets_dir: default_wallets_dir(),
            file_staging_url: default_file_staging_url(),
            max_file_size_mb: default_max_file_size_mb(),
        }
    }
}

impl Config {
    pub fn relay_timeout(&self) -> Duration {
        Duration::from_secs(self.relay.timeout_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.chain.http_timeout_secs)
    }

    /// Wallets directory with a leading `~/` expanded to the home directory.
    pub fn wallets_dir(&self) -> PathBuf {
        expand_home(&self.storage.wallets_dir)
    }

    /// Explorer link for a transaction id.
    pub fn explorer_link(&self, txid: &str) -> String {
        format!("{}/{}", self.chain.explorer_url.trim_end_matches('/'), txid)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chain.rest_url.trim().is_empty() {
            return Err(WalletError::Config("chain.rest_url must be set".to_string()));
        }
        if self.relay.url.trim().is_empty() {
            return Err(WalletError::Config("relay.url must be set".to_string()));
        }
        if !(self.relay.url.starts_with("ws://") || self.relay.url.starts_with("wss://")) {
            return Err(WalletError::Config(format!(
                "relay.url must use ws:// or wss://, got {}",
                self.relay.url
            )));
        }
        if self.relay.timeout_secs == 0 {
            return Err(WalletError::Config(
                "relay.timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.retry.attempts == 0 {
            return Err(WalletError::Config(
                "retry.attempts must be at least 1".to_string(),
            ));
        }
        if self.chain.history_limit == 0 {
            return Err(WalletError::Config(
                "chain.history_limit must be at least 1".to_string(),
            ));
        }
        if self.storage.wallets_dir.trim().is_empty() {
            return Err(WalletError::Config(
                "storage.wallets_dir must be set".to_string(),
            ));
        }
        Ok(())
    }
}

fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}

/// Loads the configuration file, falling back to defaults when it is absent.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
    let config_str = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => {
            return Err(WalletError::Config(format!(
                "failed to read {}: {}",
                path.display(),
                e
            )))
        }
    };

    let config: Config = if config_str.trim().is_empty() {
        Config::default()
    } else {
        toml::from_str(&config_str)?
    };

    config.validate()?;
    Ok(config)
}

fn default_rest_url() -> String {
    "https://free-bch.fullstack.cash".to_string()
}

fn default_explorer_url() -> String {
    "https://bch.loping.net/tx".to_string()
}

fn default_history_limit() -> usize {
    20
}

fn default_fee_rate() -> u64 {
    1
}

fn default_http_timeout() -> u64 {
    20
}

fn default_utxo_settle_ms() -> u64 {
    2000
}

fn default_relay_url() -> String {
    "wss://nostr-relay.psfoundation.info".to_string()
}

fn default_relay_timeout() -> u64 {
    30
}

fn default_attempts() -> u32 {
    5
}

fn default_delay_ms() -> u64 {
    1000
}

fn default_wallets_dir() -> String {
    "~/.bch-msg-wallet/wallets".to_string()
}

fn default_file_staging_url() -> String {
    "https://file-stage.fullstack.cash".to_string()
}

fn default_max_file_size_mb() -> u64 {
    100
}

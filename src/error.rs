//! Error types for bch-msg-wallet

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum WalletError {
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Upstream service unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("Address has no transaction history: {0}")]
    AddressHasNoHistory(String),
    #[error("Content not found on relay: {0}")]
    ContentNotFound(String),
    #[error("Message not found: {0}")]
    MessageNotFound(String),
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),
    #[error("Relay unreachable: {0}")]
    RelayUnreachable(String),
    #[error("Relay rejected event: {0}")]
    RelayRejected(String),
    #[error("Insufficient funds: need {needed} sats, have {available} sats")]
    InsufficientFunds { needed: u64, available: u64 },
    #[error("Broadcast rejected: {0}")]
    BroadcastRejected(String),
    #[error("Encoding too large: {size} bytes exceeds the {max} byte limit")]
    EncodingTooLarge { size: usize, max: usize },
    #[error("Cryptographic error: {0}")]
    Crypto(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl WalletError {
    /// Errors a read-only call may be retried on.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            WalletError::UpstreamUnavailable(_) | WalletError::RelayUnreachable(_)
        )
    }
}

impl From<std::io::Error> for WalletError {
    fn from(err: std::io::Error) -> Self {
        WalletError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for WalletError {
    fn from(err: serde_json::Error) -> Self {
        WalletError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for WalletError {
    fn from(err: toml::de::Error) -> Self {
        WalletError::Config(err.to_string())
    }
}

impl From<reqwest::Error> for WalletError {
    fn from(err: reqwest::Error) -> Self {
        WalletError::UpstreamUnavailable(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, WalletError>;

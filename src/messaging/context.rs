//! Per-operation context handed to the orchestrators

use crate::chain::service::WalletService;
use crate::config::Config;
use crate::encryption::EncryptionAdapter;
use crate::relay::transport::RelayTransport;
use crate::resilience::RetryPolicy;
use std::time::Duration;

/// Everything one send or receive needs, built at the start of a command.
pub struct MessagingContext<'a, W: WalletService, T: RelayTransport> {
    pub wallet: &'a W,
    pub relay: &'a T,
    pub relay_url: String,
    pub relay_timeout: Duration,
    pub history_limit: usize,
    pub retry: RetryPolicy,
    /// Pause before refreshing UTXOs so the indexer sees recent spends.
    pub settle_delay: Duration,
    pub encryption: EncryptionAdapter,
}

impl<'a, W: WalletService, T: RelayTransport> MessagingContext<'a, W, T> {
    pub fn new(wallet: &'a W, relay: &'a T, config: &Config) -> Self {
        Self {
            wallet,
            relay,
            relay_url: config.relay.url.clone(),
            relay_timeout: config.relay_timeout(),
            history_limit: config.chain.history_limit,
            retry: RetryPolicy::from(&config.retry),
            settle_delay: Duration::from_millis(config.chain.utxo_settle_ms),
            encryption: EncryptionAdapter::new(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn with_relay_timeout(mut self, timeout: Duration) -> Self {
        self.relay_timeout = timeout;
        self
    }
}

//! Recipient public key lookup

use crate::chain::address;
use crate::chain::service::WalletService;
use crate::error::Result;
use crate::resilience::RetryPolicy;
use tracing::debug;

/// Resolves an address to the public key revealed by its past spends.
pub struct KeyResolver<'a, W: WalletService> {
    wallet: &'a W,
    retry: RetryPolicy,
}

impl<'a, W: WalletService> KeyResolver<'a, W> {
    pub fn new(wallet: &'a W, retry: RetryPolicy) -> Self {
        Self { wallet, retry }
    }

    /// Fails with `AddressHasNoHistory` when the address never spent. Lookup
    /// failures from the indexer are retried under the policy.
    pub async fn resolve(&self, recipient: &str) -> Result<String> {
        let recipient = address::normalize(recipient)?;
        let pubkey = self
            .retry
            .run("public key lookup", || self.wallet.get_public_key(&recipient))
            .await?;
        debug!(%recipient, "recipient public key resolved");
        Ok(pubkey)
    }
}

//! Publishes message ciphertext to a relay

use crate::error::{Result, WalletError};
use crate::relay::event::NostrKeys;
use crate::relay::transport::{RelayConnection, RelayTransport};
use tracing::info;

pub struct RelayPublisher<'a, T: RelayTransport> {
    transport: &'a T,
    url: String,
    keys: NostrKeys,
}

impl<'a, T: RelayTransport> RelayPublisher<'a, T> {
    /// The relay identity is derived from the wallet key, so a wallet always
    /// posts under the same relay public key.
    pub fn new(transport: &'a T, url: &str, private_key_wif: &str) -> Result<Self> {
        Ok(Self {
            transport,
            url: url.to_string(),
            keys: NostrKeys::from_wif(private_key_wif)?,
        })
    }

    pub fn relay_public_key(&self) -> String {
        self.keys.public_key_hex()
    }

    /// Posts `ciphertext_hex` as a signed note and returns its content id.
    pub async fn publish(&self, ciphertext_hex: &str) -> Result<String> {
        if ciphertext_hex.is_empty() {
            return Err(WalletError::Validation("ciphertext is empty".to_string()));
        }
        let event = self.keys.text_note(ciphertext_hex);

        let mut connection = self.transport.connect(&self.url).await?;
        let result = connection.publish(&event).await;
        connection.close().await;

        let content_id = result?;
        info!(relay = %self.url, %content_id, "ciphertext published");
        Ok(content_id)
    }
}

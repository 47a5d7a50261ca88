//! Fetches message ciphertext from a relay by content id

use crate::error::{Result, WalletError};
use crate::relay::transport::{RelayConnection, RelayTransport};
use std::time::Duration;
use tracing::debug;

pub struct RelayReader<'a, T: RelayTransport> {
    transport: &'a T,
    url: String,
    timeout: Duration,
}

impl<'a, T: RelayTransport> RelayReader<'a, T> {
    pub fn new(transport: &'a T, url: &str, timeout: Duration) -> Self {
        Self {
            transport,
            url: url.to_string(),
            timeout,
        }
    }

    /// One subscribe round trip: waits for the first matching event, then
    /// disconnects. Returns the event content.
    pub async fn fetch(&self, content_id: &str) -> Result<String> {
        if content_id.trim().is_empty() {
            return Err(WalletError::Validation("content id is empty".to_string()));
        }

        let mut connection = self.transport.connect(&self.url).await?;
        let result = connection.subscribe_once(content_id, self.timeout).await;
        connection.close().await;

        let event = result?;
        debug!(relay = %self.url, content_id, bytes = event.content.len(), "ciphertext fetched");
        Ok(event.content)
    }
}

//! Listing and reading messages addressed to the local wallet

use crate::chain::address;
use crate::chain::service::WalletService;
use crate::error::{Result, WalletError};
use crate::messaging::context::MessagingContext;
use crate::payload::Payload;
use crate::relay::reader::RelayReader;
use crate::relay::transport::RelayTransport;
use crate::signal::codec::MESSAGE_MARKER;
use crate::signal::scanner::{signal_from_record, SignalScanner};
use crate::signal::Signal;
use std::cmp::Ordering;
use tracing::{debug, info};

/// One received signal as shown in a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    pub sender: String,
    pub subject: String,
    pub signal_txid: String,
    pub content_id: String,
    pub height: Option<u64>,
}

impl From<Signal> for MessageRecord {
    fn from(signal: Signal) -> Self {
        Self {
            sender: signal.sender,
            subject: signal.subject,
            signal_txid: signal.txid,
            content_id: signal.content_id,
            height: signal.height,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedMessage {
    pub sender: String,
    pub subject: String,
    pub payload: Payload,
}

/// Unconfirmed first, then by height descending. Ties keep history order.
fn most_recent_first(a: &MessageRecord, b: &MessageRecord) -> Ordering {
    match (a.height, b.height) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => y.cmp(&x),
    }
}

pub struct MessageReceiveOrchestrator<'a, W: WalletService, T: RelayTransport> {
    ctx: MessagingContext<'a, W, T>,
}

impl<'a, W: WalletService, T: RelayTransport> MessageReceiveOrchestrator<'a, W, T> {
    pub fn new(ctx: MessagingContext<'a, W, T>) -> Self {
        Self { ctx }
    }

    /// Signals in the wallet's own history that someone else sent.
    pub async fn check(&self) -> Result<Vec<MessageRecord>> {
        let own = address::normalize(self.ctx.wallet.address())?;
        let scanner = SignalScanner::new(self.ctx.wallet, self.ctx.history_limit, self.ctx.retry);
        let signals = scanner.scan(&own, MESSAGE_MARKER).await?;

        let mut records: Vec<MessageRecord> = signals
            .iter()
            .filter(|signal| {
                address::normalize(&signal.sender)
                    .map(|sender| sender != own)
                    .unwrap_or(true)
            })
            .map(MessageRecord::from)
            .collect();
        records.sort_by(most_recent_first);

        info!(
            scanned = signals.scanned(),
            received = records.len(),
            "message check complete"
        );
        Ok(records)
    }

    /// Fetches, decrypts and decodes the content a signal points at.
    pub async fn read(&self, signal: &Signal) -> Result<ReceivedMessage> {
        let reader = RelayReader::new(self.ctx.relay, &self.ctx.relay_url, self.ctx.relay_timeout);
        let ciphertext = self
            .ctx
            .retry
            .run("relay content fetch", || reader.fetch(&signal.content_id))
            .await
            .map_err(|e| match e {
                WalletError::ContentNotFound(_) => WalletError::MessageNotFound(format!(
                    "content {} referenced by {} is not on the relay",
                    signal.content_id, signal.txid
                )),
                other => other,
            })?;

        let plaintext = self
            .ctx
            .encryption
            .decrypt(self.ctx.wallet.private_key_wif(), &ciphertext)?;
        debug!(txid = %signal.txid, bytes = plaintext.len(), "message decrypted");

        Ok(ReceivedMessage {
            sender: signal.sender.clone(),
            subject: signal.subject.clone(),
            payload: Payload::decode(&plaintext),
        })
    }

    /// Reads the message signalled by a given transaction.
    pub async fn read_txid(&self, txid: &str) -> Result<ReceivedMessage> {
        let txid = txid.trim();
        if txid.len() != 64 || !txid.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(WalletError::Validation(format!(
                "transaction id must be 64 hex characters, got '{}'",
                txid
            )));
        }

        let record = self
            .ctx
            .retry
            .run("transaction lookup", || self.ctx.wallet.get_transaction(txid))
            .await?;
        let signal = signal_from_record(&record, MESSAGE_MARKER).ok_or_else(|| {
            WalletError::MessageNotFound(format!("transaction {} carries no message signal", txid))
        })?;
        self.read(&signal).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(txid: &str, height: Option<u64>) -> MessageRecord {
        MessageRecord {
            sender: "s".to_string(),
            subject: "x".to_string(),
            signal_txid: txid.to_string(),
            content_id: "c".to_string(),
            height,
        }
    }

    #[test]
    fn test_most_recent_first() {
        let mut records = vec![
            record("a", Some(10)),
            record("b", None),
            record("c", Some(30)),
            record("d", Some(10)),
            record("e", None),
        ];
        records.sort_by(most_recent_first);
        let order: Vec<&str> = records.iter().map(|r| r.signal_txid.as_str()).collect();
        assert_eq!(order, vec!["b", "e", "c", "a", "d"]);
    }
}

//! Scans an address history for message signals

use crate::chain::script::address_from_script;
use crate::chain::service::{TxRecord, WalletService};
use crate::error::Result;
use crate::resilience::RetryPolicy;
use crate::signal::codec::decode_signal;
use crate::signal::Signal;
use tracing::debug;

pub struct SignalScanner<'a, W: WalletService> {
    wallet: &'a W,
    history_limit: usize,
    retry: RetryPolicy,
}

/// The history fetched by one scan. Iterating decodes lazily and can be
/// repeated; every pass yields the same signals in history order.
#[derive(Debug, Clone)]
pub struct Signals {
    marker: String,
    history: Vec<TxRecord>,
}

impl Signals {
    pub fn new(marker: &str, history: Vec<TxRecord>) -> Self {
        Self {
            marker: marker.to_string(),
            history,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Signal> + '_ {
        self.history
            .iter()
            .filter_map(move |record| signal_from_record(record, &self.marker))
    }

    /// Number of transactions looked at, matching or not.
    pub fn scanned(&self) -> usize {
        self.history.len()
    }
}

/// First output of `record` carrying a `marker` signal, with its sender.
pub fn signal_from_record(record: &TxRecord, marker: &str) -> Option<Signal> {
    let body = record
        .outputs
        .iter()
        .find_map(|output| decode_signal(&output.script, marker))?;
    let sender = record.sender()?;
    let recipient = record
        .outputs
        .iter()
        .find_map(|output| address_from_script(&output.script))
        .map(|addr| addr.encode());

    Some(Signal {
        txid: record.txid.clone(),
        marker: marker.to_string(),
        subject: body.subject,
        content_id: body.content_id,
        sender,
        recipient,
        height: record.height,
    })
}

impl<'a, W: WalletService> SignalScanner<'a, W> {
    pub fn new(wallet: &'a W, history_limit: usize, retry: RetryPolicy) -> Self {
        Self {
            wallet,
            history_limit,
            retry,
        }
    }

    pub async fn scan(&self, address: &str, marker: &str) -> Result<Signals> {
        let history = self
            .retry
            .run("transaction history", || {
                self.wallet.get_transaction_history(address, self.history_limit)
            })
            .await?;
        debug!(address, scanned = history.len(), "history fetched for signal scan");
        Ok(Signals::new(marker, history))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::script::{op_return, p2pkh};
    use crate::chain::service::{InputRecord, OutputRecord};
    use crate::signal::codec::{encode_signal, MESSAGE_MARKER};

    const SENDER: &str = "bitcoincash:qr6m7j9njldwwzlg9v7v53unlr4jkmx6eylep8ekg2";

    fn record(txid: &str, scripts: Vec<Vec<u8>>) -> TxRecord {
        TxRecord {
            txid: txid.to_string(),
            height: Some(100),
            inputs: vec![InputRecord {
                address: Some(SENDER.to_string()),
            }],
            outputs: scripts
                .into_iter()
                .map(|script| OutputRecord { value: 0, script })
                .collect(),
        }
    }

    fn signal_record(txid: &str, id: &str, subject: &str) -> TxRecord {
        record(
            txid,
            vec![
                encode_signal(MESSAGE_MARKER, id, subject).unwrap(),
                p2pkh(&[4u8; 20]),
            ],
        )
    }

    #[test]
    fn test_n_matching_among_m_others() {
        let history = vec![
            signal_record("t1", "c1", "first"),
            record("t2", vec![p2pkh(&[1u8; 20])]),
            signal_record("t3", "c3", "second"),
            record("t4", vec![op_return(&[b"unrelated"])]),
            record("t5", vec![vec![0xff, 0x00]]),
            signal_record("t6", "c6", "third"),
            record("t7", vec![encode_signal("MSG IPFS", "cid", "x").unwrap()]),
        ];
        let signals = Signals::new(MESSAGE_MARKER, history);

        let found: Vec<Signal> = signals.iter().collect();
        assert_eq!(found.len(), 3);
        let ids: Vec<&str> = found.iter().map(|s| s.txid.as_str()).collect();
        assert_eq!(ids, vec!["t1", "t3", "t6"]);
        assert_eq!(signals.scanned(), 7);
    }

    #[test]
    fn test_iteration_is_restartable() {
        let signals = Signals::new(
            MESSAGE_MARKER,
            vec![signal_record("t1", "c1", "a"), signal_record("t2", "c2", "b")],
        );
        let first: Vec<Signal> = signals.iter().collect();
        let second: Vec<Signal> = signals.iter().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_extracts_fields() {
        let rec = signal_record("t1", "evt123", "test");
        let signal = signal_from_record(&rec, MESSAGE_MARKER).unwrap();
        assert_eq!(signal.sender, SENDER);
        assert_eq!(signal.subject, "test");
        assert_eq!(signal.content_id, "evt123");
        assert_eq!(signal.marker, MESSAGE_MARKER);

        let recipient = crate::chain::CashAddress::p2pkh([4u8; 20]).encode();
        assert_eq!(signal.recipient, Some(recipient));
    }

    #[test]
    fn test_skips_signal_without_sender() {
        let mut rec = signal_record("t1", "c1", "s");
        rec.inputs.clear();
        assert!(signal_from_record(&rec, MESSAGE_MARKER).is_none());
    }
}

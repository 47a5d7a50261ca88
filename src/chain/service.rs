//! Wallet service interface consumed by the messaging core

use crate::chain::address;
use crate::chain::transaction::TxOutput;
use crate::error::Result;

/// One transaction as seen by the indexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRecord {
    pub txid: String,
    /// Block height, `None` while unconfirmed.
    pub height: Option<u64>,
    pub inputs: Vec<InputRecord>,
    pub outputs: Vec<OutputRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputRecord {
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRecord {
    pub value: u64,
    pub script: Vec<u8>,
}

impl TxRecord {
    /// Address of the first input, normalized to `bitcoincash:` form when possible.
    pub fn sender(&self) -> Option<String> {
        let raw = self.inputs.first()?.address.as_deref()?;
        Some(address::normalize(raw).unwrap_or_else(|_| raw.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utxo {
    pub txid: String,
    pub vout: u32,
    pub value: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Balance {
    pub confirmed: u64,
    pub unconfirmed: i64,
}

impl Balance {
    pub fn total(&self) -> i64 {
        self.confirmed as i64 + self.unconfirmed
    }
}

/// Wallet operations backed by a chain indexer.
///
/// `get_public_key`, `get_transaction_history` and `get_transaction` are
/// read-only and safe to repeat. `build_and_broadcast` spends funds and must
/// be called at most once per intended transaction.
#[allow(async_fn_in_trait)]
pub trait WalletService {
    /// Own cash address.
    fn address(&self) -> &str;

    fn private_key_wif(&self) -> &str;

    async fn get_public_key(&self, address: &str) -> Result<String>;

    /// Most recent first, at most `limit` entries.
    async fn get_transaction_history(&self, address: &str, limit: usize) -> Result<Vec<TxRecord>>;

    async fn get_transaction(&self, txid: &str) -> Result<TxRecord>;

    async fn refresh_utxos(&self) -> Result<()>;

    async fn build_and_broadcast(&self, outputs: &[TxOutput]) -> Result<String>;

    async fn get_balance(&self) -> Result<Balance>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sender_uses_first_input() {
        let record = TxRecord {
            txid: "aa".into(),
            height: Some(1),
            inputs: vec![
                InputRecord {
                    address: Some("qr6m7j9njldwwzlg9v7v53unlr4jkmx6eylep8ekg2".into()),
                },
                InputRecord {
                    address: Some("other".into()),
                },
            ],
            outputs: vec![],
        };
        assert_eq!(
            record.sender().as_deref(),
            Some("bitcoincash:qr6m7j9njldwwzlg9v7v53unlr4jkmx6eylep8ekg2")
        );
    }

    #[test]
    fn test_sender_missing() {
        let record = TxRecord {
            txid: "aa".into(),
            height: None,
            inputs: vec![],
            outputs: vec![],
        };
        assert!(record.sender().is_none());
    }
}

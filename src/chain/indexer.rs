//! REST client for the chain indexer
//!
//! All endpoints are `POST` with JSON bodies. Transport failures, timeouts,
//! rate limiting and 5xx responses surface as `UpstreamUnavailable` so read
//! calls can be retried by their callers.

use crate::chain::service::{Balance, InputRecord, OutputRecord, TxRecord, Utxo};
use crate::error::{Result, WalletError};
use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

/// Largest batch the `txData` endpoint accepts.
const TX_DATA_BATCH: usize = 20;
const SATS_PER_BCH: f64 = 100_000_000.0;

#[derive(Debug, Clone)]
pub struct IndexerClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct PubKeyResponse {
    #[serde(default)]
    success: bool,
    pubkey: Option<PubKeyBody>,
}

#[derive(Debug, Deserialize)]
struct PubKeyBody {
    #[serde(rename = "publicKey")]
    public_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    txs: Vec<HistoryEntry>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HistoryEntry {
    tx_hash: String,
    #[serde(default)]
    height: i64,
}

#[derive(Debug, Deserialize)]
struct TxDataResponse {
    #[serde(default)]
    success: bool,
    #[serde(rename = "txData", default)]
    tx_data: Vec<RawTx>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawTx {
    txid: String,
    #[serde(default)]
    vin: Vec<RawVin>,
    #[serde(default)]
    vout: Vec<RawVout>,
    blockheight: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RawVin {
    address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawVout {
    /// BCH, as reported by the node.
    #[serde(default)]
    value: f64,
    #[serde(rename = "scriptPubKey")]
    script_pub_key: RawScript,
}

#[derive(Debug, Deserialize)]
struct RawScript {
    #[serde(default)]
    hex: String,
}

#[derive(Debug, Deserialize)]
struct UtxoResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    utxos: Vec<RawUtxo>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawUtxo {
    tx_hash: String,
    tx_pos: u32,
    value: u64,
}

#[derive(Debug, Deserialize)]
struct BalanceResponse {
    #[serde(default)]
    success: bool,
    balance: Option<RawBalance>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawBalance {
    #[serde(default)]
    confirmed: u64,
    #[serde(default)]
    unconfirmed: i64,
}

#[derive(Debug, Deserialize)]
struct BroadcastResponse {
    #[serde(default)]
    success: bool,
    txid: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

impl RawTx {
    fn into_record(self) -> TxRecord {
        TxRecord {
            txid: self.txid,
            height: self.blockheight.filter(|h| *h > 0).map(|h| h as u64),
            inputs: self
                .vin
                .into_iter()
                .map(|v| InputRecord { address: v.address })
                .collect(),
            outputs: self
                .vout
                .into_iter()
                .map(|v| OutputRecord {
                    value: (v.value * SATS_PER_BCH).round() as u64,
                    // undecodable scripts become empty and are skipped by scanners
                    script: hex::decode(&v.script_pub_key.hex).unwrap_or_default(),
                })
                .collect(),
        }
    }
}

impl IndexerClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WalletError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "indexer request");

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| WalletError::UpstreamUnavailable(format!("{}: {}", path, e)))?;

        let status = response.status();
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            warn!(%url, %status, "indexer unavailable");
            return Err(WalletError::UpstreamUnavailable(format!(
                "{} returned {}",
                path, status
            )));
        }

        // 4xx responses still carry a JSON body with `success: false`
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            WalletError::UpstreamUnavailable(format!("{}: unexpected response ({})", path, e))
        })
    }

    pub async fn public_key(&self, address: &str) -> Result<String> {
        let response: PubKeyResponse = self.post("/bch/pubkey", &json!({ "address": address })).await?;
        match response.pubkey.and_then(|p| p.public_key) {
            Some(key) if response.success && !key.is_empty() => Ok(key),
            _ => Err(WalletError::AddressHasNoHistory(address.to_string())),
        }
    }

    /// Transaction ids with heights, most recent first. Unconfirmed entries lead.
    pub async fn history(&self, address: &str) -> Result<Vec<(String, Option<u64>)>> {
        let response: HistoryResponse = self.post("/bch/txHistory", &json!({ "address": address })).await?;
        if !response.success {
            return Err(WalletError::UpstreamUnavailable(
                response
                    .message
                    .unwrap_or_else(|| "transaction history unavailable".to_string()),
            ));
        }

        let mut entries: Vec<(String, Option<u64>)> = response
            .txs
            .into_iter()
            .map(|e| (e.tx_hash, (e.height > 0).then_some(e.height as u64)))
            .collect();
        entries.sort_by_key(|(_, height)| std::cmp::Reverse(height.unwrap_or(u64::MAX)));
        Ok(entries)
    }

    pub async fn tx_data(&self, txids: &[String]) -> Result<Vec<TxRecord>> {
        let mut records = Vec::with_capacity(txids.len());
        for chunk in txids.chunks(TX_DATA_BATCH) {
            let response: TxDataResponse = self.post("/bch/txData", &json!({ "txids": chunk })).await?;
            if !response.success {
                return Err(WalletError::UpstreamUnavailable(
                    response
                        .message
                        .unwrap_or_else(|| "transaction data unavailable".to_string()),
                ));
            }
            records.extend(response.tx_data.into_iter().map(RawTx::into_record));
        }

        // keep the caller's ordering regardless of how the indexer returned them
        let mut ordered = Vec::with_capacity(records.len());
        for txid in txids {
            if let Some(pos) = records.iter().position(|r| &r.txid == txid) {
                ordered.push(records.swap_remove(pos));
            }
        }
        Ok(ordered)
    }

    pub async fn utxos(&self, address: &str) -> Result<Vec<Utxo>> {
        let response: UtxoResponse = self.post("/bch/utxos", &json!({ "address": address })).await?;
        if !response.success {
            return Err(WalletError::UpstreamUnavailable(
                response.message.unwrap_or_else(|| "utxos unavailable".to_string()),
            ));
        }
        Ok(response
            .utxos
            .into_iter()
            .map(|u| Utxo {
                txid: u.tx_hash,
                vout: u.tx_pos,
                value: u.value,
            })
            .collect())
    }

    pub async fn balance(&self, address: &str) -> Result<Balance> {
        let response: BalanceResponse = self.post("/bch/balance", &json!({ "address": address })).await?;
        match response.balance {
            Some(b) if response.success => Ok(Balance {
                confirmed: b.confirmed,
                unconfirmed: b.unconfirmed,
            }),
            _ => Err(WalletError::UpstreamUnavailable(
                response.message.unwrap_or_else(|| "balance unavailable".to_string()),
            )),
        }
    }

    pub async fn broadcast(&self, tx_hex: &str) -> Result<String> {
        let response: BroadcastResponse = self.post("/bch/broadcast", &json!({ "hex": tx_hex })).await?;
        match response.txid {
            Some(txid) if response.success => Ok(txid),
            _ => Err(WalletError::BroadcastRejected(
                response
                    .message
                    .or(response.error)
                    .unwrap_or_else(|| "transaction refused by the network".to_string()),
            )),
        }
    }
}

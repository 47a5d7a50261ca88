//! Indexer-backed wallet: coin selection, signing and broadcast

use crate::chain::indexer::IndexerClient;
use crate::chain::script::{p2pkh, OP_RETURN};
use crate::chain::service::{Balance, TxRecord, Utxo, WalletService};
use crate::chain::transaction::{estimate_size, OutPoint, Transaction, TxOutput};
use crate::chain::DUST_LIMIT;
use crate::crypto::KeyPair;
use crate::error::{Result, WalletError};
use parking_lot::RwLock;
use tracing::{debug, info};

pub struct ChainWallet {
    keys: KeyPair,
    address: String,
    wif: String,
    indexer: IndexerClient,
    fee_rate: u64,
    utxos: RwLock<Vec<Utxo>>,
}

/// Result of coin selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub inputs: Vec<Utxo>,
    pub fee: u64,
    /// Zero when the remainder is below dust and left to the miner.
    pub change: u64,
}

/// Largest-first selection that covers `outputs` plus fee at `fee_rate` sats/byte.
pub fn select_coins(utxos: &[Utxo], outputs: &[TxOutput], fee_rate: u64) -> Result<Selection> {
    let target = outputs
        .iter()
        .try_fold(0u64, |sum, o| sum.checked_add(o.value))
        .ok_or_else(|| WalletError::Validation("output total exceeds the maximum amount".to_string()))?;
    let mut sorted: Vec<Utxo> = utxos.to_vec();
    sorted.sort_by(|a, b| b.value.cmp(&a.value));

    // size with a change output, the common case
    let mut with_change = outputs.to_vec();
    with_change.push(TxOutput {
        value: 0,
        script: p2pkh(&[0u8; 20]),
    });
    let fee_for = |inputs: usize| (estimate_size(inputs, &with_change) as u64).saturating_mul(fee_rate);

    let mut total = 0u64;
    let mut inputs = Vec::new();
    for utxo in sorted {
        total = total.saturating_add(utxo.value);
        inputs.push(utxo);

        let fee = fee_for(inputs.len());
        let Some(required) = target.checked_add(fee) else {
            break;
        };
        if total >= required {
            let remainder = total - required;
            let change = if remainder >= DUST_LIMIT { remainder } else { 0 };
            let fee = if change == 0 { total - target } else { fee };
            return Ok(Selection { inputs, fee, change });
        }
    }

    Err(WalletError::InsufficientFunds {
        needed: target.saturating_add(fee_for(inputs.len().max(1))),
        available: total,
    })
}

impl ChainWallet {
    pub fn new(keys: KeyPair, indexer: IndexerClient, fee_rate: u64) -> Self {
        let address = keys.cash_address().encode();
        let wif = keys.to_wif();
        Self {
            keys,
            address,
            wif,
            indexer,
            fee_rate,
            utxos: RwLock::new(Vec::new()),
        }
    }

    pub fn from_wif(wif: &str, indexer: IndexerClient, fee_rate: u64) -> Result<Self> {
        Ok(Self::new(KeyPair::from_wif(wif)?, indexer, fee_rate))
    }

    pub fn keypair(&self) -> &KeyPair {
        &self.keys
    }

    fn validate_outputs(outputs: &[TxOutput]) -> Result<()> {
        if outputs.is_empty() {
            return Err(WalletError::Validation("transaction has no outputs".to_string()));
        }
        for output in outputs {
            let is_data = output.script.first() == Some(&OP_RETURN);
            if !is_data && output.value < DUST_LIMIT {
                return Err(WalletError::Validation(format!(
                    "output of {} sats is below the {} sat dust limit",
                    output.value, DUST_LIMIT
                )));
            }
        }
        Ok(())
    }
}

impl WalletService for ChainWallet {
    fn address(&self) -> &str {
        &self.address
    }

    fn private_key_wif(&self) -> &str {
        &self.wif
    }

    async fn get_public_key(&self, address: &str) -> Result<String> {
        self.indexer.public_key(address).await
    }

    async fn get_transaction_history(&self, address: &str, limit: usize) -> Result<Vec<TxRecord>> {
        let txids: Vec<String> = self
            .indexer
            .history(address)
            .await?
            .into_iter()
            .take(limit)
            .map(|(txid, _)| txid)
            .collect();
        debug!(address, count = txids.len(), "fetching transaction data");
        self.indexer.tx_data(&txids).await
    }

    async fn get_transaction(&self, txid: &str) -> Result<TxRecord> {
        self.indexer
            .tx_data(&[txid.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| WalletError::MessageNotFound(format!("transaction {} not found", txid)))
    }

    async fn refresh_utxos(&self) -> Result<()> {
        let fresh = self.indexer.utxos(&self.address).await?;
        debug!(count = fresh.len(), "utxo set refreshed");
        *self.utxos.write() = fresh;
        Ok(())
    }

    async fn build_and_broadcast(&self, outputs: &[TxOutput]) -> Result<String> {
        Self::validate_outputs(outputs)?;

        let selection = {
            let utxos = self.utxos.read();
            select_coins(&utxos, outputs, self.fee_rate)?
        };

        let mut tx = Transaction::new();
        for utxo in &selection.inputs {
            tx.add_input(OutPoint::from_txid(&utxo.txid, utxo.vout)?, utxo.value);
        }
        for output in outputs {
            tx.add_output(output.value, output.script.clone());
        }
        if selection.change > 0 {
            tx.add_output(selection.change, p2pkh(&self.keys.pubkey_hash()));
        }
        tx.sign_p2pkh(&self.keys)?;

        let txid = self.indexer.broadcast(&tx.to_hex()).await?;
        info!(%txid, fee = selection.fee, inputs = selection.inputs.len(), "transaction broadcast");

        self.utxos
            .write()
            .retain(|u| !selection.inputs.iter().any(|s| s.txid == u.txid && s.vout == u.vout));
        Ok(txid)
    }

    async fn get_balance(&self) -> Result<Balance> {
        self.indexer.balance(&self.address).await
    }
}

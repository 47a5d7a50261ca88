//! Builds and broadcasts signal transactions

use crate::chain::address::CashAddress;
use crate::chain::script::locking_script;
use crate::chain::service::WalletService;
use crate::chain::transaction::TxOutput;
use crate::chain::DUST_LIMIT;
use crate::error::Result;
use crate::signal::codec::encode_signal;
use tracing::info;

pub struct SignalWriter<'a, W: WalletService> {
    wallet: &'a W,
    marker: String,
}

impl<'a, W: WalletService> SignalWriter<'a, W> {
    pub fn new(wallet: &'a W, marker: &str) -> Self {
        Self {
            wallet,
            marker: marker.to_string(),
        }
    }

    /// Outputs of a signal: the data output, then dust to the recipient.
    pub fn outputs(&self, recipient: &str, subject: &str, content_id: &str) -> Result<Vec<TxOutput>> {
        let recipient = CashAddress::decode(recipient)?;
        let script = encode_signal(&self.marker, content_id, subject)?;
        Ok(vec![
            TxOutput { value: 0, script },
            TxOutput {
                value: DUST_LIMIT,
                script: locking_script(&recipient),
            },
        ])
    }

    /// Broadcasts the signal and returns its txid.
    ///
    /// Encoding problems are reported before any network call. The broadcast
    /// is attempted once; a failure here is never retried.
    pub async fn write(&self, recipient: &str, subject: &str, content_id: &str) -> Result<String> {
        let outputs = self.outputs(recipient, subject, content_id)?;

        self.wallet.refresh_utxos().await?;
        let txid = self.wallet.build_and_broadcast(&outputs).await?;

        info!(%txid, recipient, content_id, "signal broadcast");
        Ok(txid)
    }
}

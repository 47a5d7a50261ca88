//! In-memory chain and relay shared by the integration tests

#![allow(dead_code)]

use bchmsg::chain::script::address_from_script;
use bchmsg::chain::service::{Balance, InputRecord, OutputRecord, TxRecord, WalletService};
use bchmsg::chain::TxOutput;
use bchmsg::config::Config;
use bchmsg::crypto::KeyPair;
use bchmsg::error::{Result, WalletError};
use bchmsg::messaging::MessagingContext;
use bchmsg::relay::{Event, RelayConnection, RelayTransport};
use bchmsg::resilience::RetryPolicy;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

/// Ordered record of collaborator calls, shared between chain and relay.
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, call: &str) {
        self.0.lock().push(call.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.0.lock().iter().filter(|c| c.as_str() == call).count()
    }

    pub fn position(&self, call: &str) -> Option<usize> {
        self.0.lock().iter().position(|c| c == call)
    }
}

#[derive(Default)]
pub struct Ledger {
    /// Newest first.
    pub txs: Vec<TxRecord>,
    pub pubkeys: HashMap<String, String>,
    pub fail_broadcast: bool,
    /// Number of upcoming public key lookups that fail as unavailable.
    pub pubkey_outages: u32,
    next_txid: u64,
}

impl Ledger {
    pub fn confirm(&mut self, txid: &str, height: u64) {
        if let Some(tx) = self.txs.iter_mut().find(|t| t.txid == txid) {
            tx.height = Some(height);
        }
    }

    fn involves(tx: &TxRecord, address: &str) -> bool {
        tx.inputs.iter().any(|i| i.address.as_deref() == Some(address))
            || tx
                .outputs
                .iter()
                .filter_map(|o| address_from_script(&o.script))
                .any(|a| a.encode() == address)
    }
}

pub type SharedLedger = Arc<Mutex<Ledger>>;

pub fn ledger() -> SharedLedger {
    Arc::new(Mutex::new(Ledger::default()))
}

/// Wallet over the shared ledger.
pub struct MemoryChain {
    address: String,
    wif: String,
    ledger: SharedLedger,
    log: CallLog,
}

impl MemoryChain {
    /// A wallet whose public key the indexer already knows.
    pub fn new(ledger: &SharedLedger, log: &CallLog) -> Self {
        let chain = Self::without_history(ledger, log);
        let keys = KeyPair::from_wif(&chain.wif).expect("own wif");
        ledger
            .lock()
            .pubkeys
            .insert(chain.address.clone(), keys.public_key_hex());
        chain
    }

    /// A wallet that never spent, so its public key cannot be looked up.
    pub fn without_history(ledger: &SharedLedger, log: &CallLog) -> Self {
        let keys = KeyPair::generate();
        Self {
            address: keys.cash_address().encode(),
            wif: keys.to_wif(),
            ledger: ledger.clone(),
            log: log.clone(),
        }
    }
}

impl WalletService for MemoryChain {
    fn address(&self) -> &str {
        &self.address
    }

    fn private_key_wif(&self) -> &str {
        &self.wif
    }

    async fn get_public_key(&self, address: &str) -> Result<String> {
        self.log.push("get_public_key");
        let mut ledger = self.ledger.lock();
        if ledger.pubkey_outages > 0 {
            ledger.pubkey_outages -= 1;
            return Err(WalletError::UpstreamUnavailable("indexer down".to_string()));
        }
        ledger
            .pubkeys
            .get(address)
            .cloned()
            .ok_or_else(|| WalletError::AddressHasNoHistory(address.to_string()))
    }

    async fn get_transaction_history(&self, address: &str, limit: usize) -> Result<Vec<TxRecord>> {
        self.log.push("get_transaction_history");
        let ledger = self.ledger.lock();
        Ok(ledger
            .txs
            .iter()
            .filter(|tx| Ledger::involves(tx, address))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn get_transaction(&self, txid: &str) -> Result<TxRecord> {
        self.log.push("get_transaction");
        self.ledger
            .lock()
            .txs
            .iter()
            .find(|tx| tx.txid == txid)
            .cloned()
            .ok_or_else(|| WalletError::MessageNotFound(txid.to_string()))
    }

    async fn refresh_utxos(&self) -> Result<()> {
        self.log.push("refresh_utxos");
        Ok(())
    }

    async fn build_and_broadcast(&self, outputs: &[TxOutput]) -> Result<String> {
        self.log.push("broadcast");
        let mut ledger = self.ledger.lock();
        if ledger.fail_broadcast {
            return Err(WalletError::BroadcastRejected("mempool conflict".to_string()));
        }
        ledger.next_txid += 1;
        let txid = format!("{:064x}", ledger.next_txid);
        let record = TxRecord {
            txid: txid.clone(),
            height: None,
            inputs: vec![InputRecord {
                address: Some(self.address.clone()),
            }],
            outputs: outputs
                .iter()
                .map(|o| OutputRecord {
                    value: o.value,
                    script: o.script.clone(),
                })
                .collect(),
        };
        ledger.txs.insert(0, record);
        Ok(txid)
    }

    async fn get_balance(&self) -> Result<Balance> {
        Ok(Balance {
            confirmed: 100_000,
            unconfirmed: 0,
        })
    }
}

#[derive(Default)]
pub struct RelayState {
    pub events: HashMap<String, Event>,
    /// Ids handed out by the next publishes instead of the event id.
    pub assign_ids: VecDeque<String>,
    pub reject: bool,
    pub unreachable: bool,
    /// Number of upcoming connects that fail as unreachable.
    pub connect_outages: u32,
    /// Number of upcoming fetches that drop the connection mid-request.
    pub fetch_outages: u32,
    pub connects: usize,
    pub closes: usize,
}

#[derive(Clone)]
pub struct MemoryRelay {
    pub state: Arc<Mutex<RelayState>>,
    log: CallLog,
}

impl MemoryRelay {
    pub fn new(log: &CallLog) -> Self {
        Self {
            state: Arc::new(Mutex::new(RelayState::default())),
            log: log.clone(),
        }
    }

    pub fn assign_id(&self, id: &str) {
        self.state.lock().assign_ids.push_back(id.to_string());
    }
}

pub struct MemoryConnection {
    state: Arc<Mutex<RelayState>>,
    log: CallLog,
}

impl RelayTransport for MemoryRelay {
    type Connection = MemoryConnection;

    async fn connect(&self, url: &str) -> Result<MemoryConnection> {
        let mut state = self.state.lock();
        if state.unreachable {
            return Err(WalletError::RelayUnreachable(url.to_string()));
        }
        if state.connect_outages > 0 {
            state.connect_outages -= 1;
            return Err(WalletError::RelayUnreachable(url.to_string()));
        }
        state.connects += 1;
        Ok(MemoryConnection {
            state: self.state.clone(),
            log: self.log.clone(),
        })
    }
}

impl RelayConnection for MemoryConnection {
    async fn publish(&mut self, event: &Event) -> Result<String> {
        self.log.push("publish");
        let mut state = self.state.lock();
        if state.reject {
            return Err(WalletError::RelayRejected("blocked: spam".to_string()));
        }
        let id = state
            .assign_ids
            .pop_front()
            .unwrap_or_else(|| event.id.clone());
        state.events.insert(id.clone(), event.clone());
        Ok(id)
    }

    async fn subscribe_once(&mut self, event_id: &str, _timeout: Duration) -> Result<Event> {
        self.log.push("fetch");
        let mut state = self.state.lock();
        if state.fetch_outages > 0 {
            state.fetch_outages -= 1;
            return Err(WalletError::RelayUnreachable("connection reset".to_string()));
        }
        state
            .events
            .get(event_id)
            .cloned()
            .ok_or_else(|| WalletError::ContentNotFound(event_id.to_string()))
    }

    async fn close(&mut self) {
        self.state.lock().closes += 1;
    }
}

/// Context with no waits and a single attempt per call.
pub fn context<'a>(wallet: &'a MemoryChain, relay: &'a MemoryRelay) -> MessagingContext<'a, MemoryChain, MemoryRelay> {
    let mut config = Config::default();
    config.relay.url = "ws://relay.test".to_string();
    MessagingContext::new(wallet, relay, &config)
        .with_retry(RetryPolicy::once())
        .with_settle_delay(Duration::ZERO)
}

/// Runs a test body with an upper bound on its duration.
pub async fn bounded<F: std::future::Future>(future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(10), future)
        .await
        .expect("test timed out")
}

//! Bitcoin Cash chain access: addresses, scripts, transactions and the indexer

pub mod address;
pub mod indexer;
pub mod script;
pub mod service;
pub mod transaction;
pub mod wallet;

pub use address::CashAddress;
pub use service::{Balance, TxRecord, Utxo, WalletService};
pub use transaction::TxOutput;
pub use wallet::ChainWallet;

/// Smallest non-data output standard nodes relay.
pub const DUST_LIMIT: u64 = 546;

pub const SATS_PER_BCH: u64 = 100_000_000;
/// Total supply, the largest amount any output can carry.
pub const MAX_MONEY: u64 = 21_000_000 * SATS_PER_BCH;

/// Formats satoshis as a BCH amount with eight decimals.
pub fn format_bch(sats: i64) -> String {
    let sign = if sats < 0 { "-" } else { "" };
    let abs = sats.unsigned_abs();
    format!("{}{}.{:08}", sign, abs / SATS_PER_BCH, abs % SATS_PER_BCH)
}

/// Parses a BCH amount with up to eight decimals into satoshis.
pub fn parse_bch(amount: &str) -> Option<u64> {
    let amount = amount.trim();
    let (whole, frac) = match amount.split_once('.') {
        Some((w, f)) => (w, f),
        None => (amount, ""),
    };
    if frac.len() > 8 || (whole.is_empty() && frac.is_empty()) {
        return None;
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let whole: u64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let frac: u64 = if frac.is_empty() {
        0
    } else {
        format!("{:0<8}", frac).parse().ok()?
    };
    let sats = whole.checked_mul(SATS_PER_BCH)?.checked_add(frac)?;
    (sats <= MAX_MONEY).then_some(sats)
}

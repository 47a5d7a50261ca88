//! CLI commands and shared terminal helpers
//!
//! Every command validates its flags before any network access, reports
//! failures on stderr and returns whether it succeeded.

pub mod files;
pub mod message;
pub mod sign;
pub mod wallet;

use crate::chain::indexer::IndexerClient;
use crate::chain::ChainWallet;
use crate::config::Config;
use crate::error::{Result, WalletError};
use crate::wallet_store::WalletStore;
use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::Color as TableColor;
use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing::error;

pub fn print_error(message: &str) {
    eprintln!("{} {}", "❌ Error:".red().bold(), message.red());
}

pub fn print_success(message: &str) {
    println!("{}", message.bright_green());
}

/// Logs and prints a command failure, then reports the outcome as a bool.
pub fn report(command: &str, result: Result<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            error!(command, error = %e, "command failed");
            print_error(&e.to_string());
            false
        }
    }
}

/// Rejects a missing or blank flag value.
pub fn require<'a>(value: Option<&'a str>, flag: &str, what: &str) -> Result<&'a str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(WalletError::Validation(format!(
            "You must specify {} with the {} flag.",
            what, flag
        ))),
    }
}

pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(message.to_string());
    pb
}

/// UTF-8 table with bold cyan headers.
pub fn table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            headers
                .iter()
                .map(|h| {
                    Cell::new(h)
                        .fg(TableColor::Cyan)
                        .add_attribute(Attribute::Bold)
                })
                .collect::<Vec<Cell>>(),
        );
    table
}

pub fn wallet_store(config: &Config) -> WalletStore {
    WalletStore::new(config.wallets_dir())
}

/// Loads a named wallet and connects it to the configured indexer.
pub fn open_wallet(config: &Config, name: &str) -> Result<ChainWallet> {
    let info = wallet_store(config).load(name)?;
    let indexer = IndexerClient::new(&config.chain.rest_url, config.http_timeout())?;
    ChainWallet::from_wif(&info.wif, indexer, config.chain.fee_rate_sats_per_byte)
}

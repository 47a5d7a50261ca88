//! Wallet management and plain BCH transfers

use super::{open_wallet, print_success, report, require, spinner, table, wallet_store};
use crate::chain::address::CashAddress;
use crate::chain::script::locking_script;
use crate::chain::{format_bch, parse_bch, TxOutput, WalletService, DUST_LIMIT};
use crate::config::Config;
use crate::error::{Result, WalletError};
use colored::*;

pub fn create(config: &Config, name: Option<&str>, description: Option<&str>) -> bool {
    report("wallet-create", run_create(config, name, description))
}

fn run_create(config: &Config, name: Option<&str>, description: Option<&str>) -> Result<()> {
    let name = require(name, "-n", "a wallet name")?;
    let info = wallet_store(config).create(name, description.unwrap_or(""))?;

    print_success(&format!("✅ Wallet '{}' created", info.name));
    println!("{} {}", "📍 Address:".cyan(), info.cash_address.bright_white());
    println!(
        "{} {}",
        "📁 File:".cyan(),
        wallet_store(config).path_for(name)?.display()
    );
    Ok(())
}

pub fn list(config: &Config) -> bool {
    report("wallet-list", run_list(config))
}

fn run_list(config: &Config) -> Result<()> {
    let wallets = wallet_store(config).list()?;
    if wallets.is_empty() {
        println!("{}", "No wallets found.".yellow());
        println!("{}", "💡 Run 'wallet-create -n <name>' to create one".yellow());
        return Ok(());
    }

    let mut t = table(&["Name", "Address", "Description"]);
    for w in &wallets {
        t.add_row(vec![w.name.clone(), w.cash_address.clone(), w.description.clone()]);
    }
    println!("{t}");
    Ok(())
}

pub fn addrs(config: &Config, name: Option<&str>) -> bool {
    report("wallet-addrs", run_addrs(config, name))
}

fn run_addrs(config: &Config, name: Option<&str>) -> Result<()> {
    let name = require(name, "-n", "a wallet name")?;
    let info = wallet_store(config).load(name)?;

    println!("{} {}", "Cash Address:".cyan(), info.cash_address);
    println!("{} {}", "Public Key:  ".cyan(), info.public_key);
    Ok(())
}

pub async fn balance(config: &Config, name: Option<&str>) -> bool {
    report("wallet-balance", run_balance(config, name).await)
}

async fn run_balance(config: &Config, name: Option<&str>) -> Result<()> {
    let name = require(name, "-n", "a wallet name")?;
    let wallet = open_wallet(config, name)?;

    let pb = spinner("Fetching balance...");
    let balance = wallet.get_balance().await;
    pb.finish_and_clear();
    let balance = balance?;

    println!("{} {}", "📍 Address:".cyan(), wallet.address());
    println!();
    println!(
        "Confirmed:   {} sats ({} BCH)",
        balance.confirmed,
        format_bch(balance.confirmed as i64)
    );
    println!(
        "Unconfirmed: {} sats ({} BCH)",
        balance.unconfirmed,
        format_bch(balance.unconfirmed)
    );
    println!(
        "{}",
        format!("Total:       {} BCH", format_bch(balance.total())).bright_green()
    );
    Ok(())
}

pub async fn send_bch(
    config: &Config,
    name: Option<&str>,
    addr: Option<&str>,
    qty: Option<&str>,
) -> bool {
    report("send-bch", run_send_bch(config, name, addr, qty).await)
}

async fn run_send_bch(
    config: &Config,
    name: Option<&str>,
    addr: Option<&str>,
    qty: Option<&str>,
) -> Result<()> {
    let name = require(name, "-n", "a wallet name")?;
    let addr = require(addr, "-a", "an address to send to")?;
    let qty = require(qty, "-q", "a quantity of BCH")?;

    let recipient = CashAddress::decode(addr)?;
    let sats = parse_bch(qty)
        .ok_or_else(|| WalletError::Validation(format!("'{}' is not a valid BCH amount", qty)))?;
    if sats < DUST_LIMIT {
        return Err(WalletError::Validation(format!(
            "amount must be at least {} sats",
            DUST_LIMIT
        )));
    }

    let wallet = open_wallet(config, name)?;
    let pb = spinner("Sending BCH...");
    let result = async {
        wallet.refresh_utxos().await?;
        wallet
            .build_and_broadcast(&[TxOutput {
                value: sats,
                script: locking_script(&recipient),
            }])
            .await
    }
    .await;
    pb.finish_and_clear();
    let txid = result?;

    print_success(&format!("✅ Sent {} BCH to {}", format_bch(sats as i64), recipient));
    println!("TXID: {}", txid);
    println!();
    println!("View this transaction on a block explorer:");
    println!("{}", config.explorer_link(&txid).bright_blue());
    Ok(())
}

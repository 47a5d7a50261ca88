//! Bitcoin signed-message commands

use super::{report, require, wallet_store};
use crate::chain::address;
use crate::config::Config;
use crate::crypto::verify_message;
use crate::error::Result;
use colored::*;

pub fn msg_sign(config: &Config, name: Option<&str>, msg: Option<&str>) -> bool {
    report("msg-sign", run_sign(config, name, msg))
}

fn run_sign(config: &Config, name: Option<&str>, msg: Option<&str>) -> Result<()> {
    let name = require(name, "-n", "a wallet name")?;
    let msg = require(msg, "-m", "a message to sign")?;
    let info = wallet_store(config).load(name)?;
    let signature = info.keypair()?.sign_message(msg);

    println!("Signed message with key associated with address: {}", info.cash_address);
    println!("Input message: {}", msg);
    println!("Signature:");
    println!("{}", signature.bright_white());
    Ok(())
}

pub fn msg_verify(addr: Option<&str>, msg: Option<&str>, sig: Option<&str>) -> bool {
    report("msg-verify", run_verify(addr, msg, sig))
}

fn run_verify(addr: Option<&str>, msg: Option<&str>, sig: Option<&str>) -> Result<()> {
    let addr = require(addr, "-a", "an address")?;
    let msg = require(msg, "-m", "a message to verify")?;
    let sig = require(sig, "-s", "a signature")?;
    let addr = address::normalize(addr)?;

    let valid = verify_message(&addr, sig, msg)?;
    let verdict = if valid {
        "true".bright_green()
    } else {
        "false".red()
    };
    println!("Message: {}", msg);
    println!("Signature: {}", sig);
    println!(
        "Signature was generated by private key associated with address {}: {}",
        addr, verdict
    );
    Ok(())
}

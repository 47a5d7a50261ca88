//! Encrypted messaging commands

use super::{open_wallet, print_success, report, require, spinner, table};
use crate::config::Config;
use crate::error::{Result, WalletError};
use crate::messaging::{
    validate_request, MessageReceiveOrchestrator, MessageSendOrchestrator, MessagingContext,
    ReceivedMessage, SendRequest,
};
use crate::payload::Payload;
use crate::relay::WsRelay;
use colored::*;
use std::path::Path;
use tracing::warn;

pub const DEFAULT_SUBJECT: &str = "no subject";

/// Text from `-m`, or a JSON object read from the `-j` file.
pub fn payload_from_flags(msg: Option<&str>, json_file: Option<&Path>) -> Result<Payload> {
    match (msg.map(str::trim).filter(|m| !m.is_empty()), json_file) {
        (Some(_), Some(_)) => Err(WalletError::Validation(
            "Use either -m or -j, not both.".to_string(),
        )),
        (Some(text), None) => Ok(Payload::raw(text)),
        (None, Some(path)) => {
            let contents = std::fs::read_to_string(path).map_err(|e| {
                WalletError::Validation(format!("cannot read {}: {}", path.display(), e))
            })?;
            Payload::from_json_str(&contents).ok_or_else(|| {
                WalletError::Validation(format!("{} does not hold a JSON object", path.display()))
            })
        }
        (None, None) => Err(WalletError::Validation(
            "You must specify a message with the -m flag.".to_string(),
        )),
    }
}

pub async fn nostr_send(
    config: &Config,
    name: Option<&str>,
    addr: Option<&str>,
    msg: Option<&str>,
    json_file: Option<&Path>,
    subject: Option<&str>,
) -> bool {
    report(
        "msg-nostr-send",
        run_send(config, name, addr, msg, json_file, subject).await,
    )
}

async fn run_send(
    config: &Config,
    name: Option<&str>,
    addr: Option<&str>,
    msg: Option<&str>,
    json_file: Option<&Path>,
    subject: Option<&str>,
) -> Result<()> {
    let name = require(name, "-n", "a wallet name")?;
    let addr = require(addr, "-a", "an address to send to")?;
    let payload = payload_from_flags(msg, json_file)?;
    let subject = subject
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_SUBJECT);

    let request = SendRequest {
        recipient: addr.to_string(),
        subject: subject.to_string(),
        payload,
    };
    validate_request(&request)?;

    let wallet = open_wallet(config, name)?;
    let relay = WsRelay::new(config.relay_timeout());
    let mut orchestrator =
        MessageSendOrchestrator::new(MessagingContext::new(&wallet, &relay, config));

    let pb = spinner("Encrypting and sending message...");
    let result = orchestrator.send(&request).await;
    pb.finish_and_clear();

    match result {
        Ok(sent) => {
            print_success("✅ Message sent successfully!");
            println!("Message signal TXID: {}", sent.txid);
            println!(
                "Encrypted message uploaded as Nostr event ID: {}",
                sent.content_id
            );
            println!("{}", config.explorer_link(&sent.txid).bright_blue());
            Ok(())
        }
        Err(failure) => {
            if let Some(content_id) = &failure.content_id {
                warn!(%content_id, "ciphertext published without a signal");
                eprintln!(
                    "{} {}",
                    "⚠️  Encrypted message is on the relay but no signal was sent. Event ID:"
                        .yellow(),
                    content_id
                );
            }
            Err(failure.error)
        }
    }
}

pub async fn nostr_check(config: &Config, name: Option<&str>) -> bool {
    report("msg-nostr-check", run_check(config, name).await)
}

async fn run_check(config: &Config, name: Option<&str>) -> Result<()> {
    let name = require(name, "-n", "a wallet name")?;
    let wallet = open_wallet(config, name)?;
    let relay = WsRelay::new(config.relay_timeout());
    let receiver = MessageReceiveOrchestrator::new(MessagingContext::new(&wallet, &relay, config));

    let pb = spinner("Scanning transaction history for messages...");
    let records = receiver.check().await;
    pb.finish_and_clear();
    let records = records?;

    if records.is_empty() {
        println!("{}", "No Messages Found!".yellow());
        return Ok(());
    }

    let mut t = table(&["Subject", "Sender", "Transaction ID"]);
    for r in &records {
        t.add_row(vec![r.subject.clone(), r.sender.clone(), r.signal_txid.clone()]);
    }
    println!("{t}");
    Ok(())
}

pub async fn nostr_read(config: &Config, name: Option<&str>, txid: Option<&str>, show_data: bool) -> bool {
    report("msg-nostr-read", run_read(config, name, txid, show_data).await)
}

async fn run_read(
    config: &Config,
    name: Option<&str>,
    txid: Option<&str>,
    show_data: bool,
) -> Result<()> {
    let name = require(name, "-n", "a wallet name")?;
    let txid = require(txid, "-t", "a TXID representing a message")?;

    let wallet = open_wallet(config, name)?;
    let relay = WsRelay::new(config.relay_timeout());
    let receiver = MessageReceiveOrchestrator::new(MessagingContext::new(&wallet, &relay, config));

    let pb = spinner("Fetching and decrypting message...");
    let message = receiver.read_txid(txid).await;
    pb.finish_and_clear();
    let message = message?;

    println!("{}", render_message(&message, show_data));
    Ok(())
}

/// Sender, subject, text and a note about attached data.
pub fn render_message(message: &ReceivedMessage, show_data: bool) -> String {
    let mut out = format!(
        "\nSender: {}\nSubject: {}\n\nMessage:\n{}\n\n",
        message.sender,
        message.subject,
        message.payload.display_text()
    );
    match message.payload.data() {
        None => out.push_str("Data: No data attached to the message."),
        Some(_) if !show_data => out.push_str(
            "Data: There is data attached to the message. Use the -d flag to display it.",
        ),
        Some(data) => {
            let pretty = serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string());
            out.push_str("Data:\n");
            out.push_str(&pretty);
        }
    }
    out
}

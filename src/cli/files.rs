//! File staging and text helpers

use super::{print_success, report, require, spinner};
use crate::config::Config;
use crate::error::{Result, WalletError};
use crate::payload::Payload;
use crate::staging::FileStager;
use std::path::Path;

pub async fn file_stage(config: &Config, file: Option<&str>) -> bool {
    report("file-stage", run_stage(config, file).await)
}

async fn run_stage(config: &Config, file: Option<&str>) -> Result<()> {
    let file = require(file, "-f", "a file path")?;
    let path = Path::new(file);
    let stager = FileStager::new(
        &config.storage.file_staging_url,
        config.storage.max_file_size_mb,
        config.http_timeout(),
    )?;
    stager.check(path)?;

    println!("Uploading file: {}", path.display());
    let pb = spinner("Uploading...");
    let staged = stager.stage(path).await;
    pb.finish_and_clear();
    let staged = staged?;

    print_success("✅ File uploaded successfully. CID:");
    println!("{}", staged.cid);
    println!("File size: {} MB", staged.size_mb);
    Ok(())
}

pub fn txt_2_json(file: Option<&str>) -> bool {
    report("txt-2-json", run_txt_2_json(file))
}

/// Pretty `{ "message": <file text> }`, ready for `msg-nostr-send -j`.
pub fn text_to_json(text: &str) -> Result<String> {
    let value: serde_json::Value = serde_json::from_slice(&Payload::from_text(text).encode())?;
    Ok(serde_json::to_string_pretty(&value)?)
}

fn run_txt_2_json(file: Option<&str>) -> Result<()> {
    let file = require(file, "-f", "a file path")?;
    let text = std::fs::read_to_string(file)
        .map_err(|e| WalletError::Validation(format!("cannot read {}: {}", file, e)))?;
    println!("{}", text_to_json(&text)?);
    Ok(())
}

//! Upload of files to a file staging server

use crate::error::{Result, WalletError};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::info;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Deserialize)]
struct UploadResponse {
    cid: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StagedFile {
    pub cid: String,
    pub size_mb: f64,
}

/// File size in MB, rounded up to two decimals.
pub fn size_in_mb(bytes: u64) -> f64 {
    (bytes as f64 / BYTES_PER_MB * 100.0).ceil() / 100.0
}

pub struct FileStager {
    client: reqwest::Client,
    base_url: String,
    max_size_mb: u64,
}

impl FileStager {
    pub fn new(base_url: &str, max_size_mb: u64, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WalletError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_size_mb,
        })
    }

    /// Checks the file exists and is within the size limit.
    pub fn check(&self, path: &Path) -> Result<f64> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            WalletError::Validation(format!("cannot read {}: {}", path.display(), e))
        })?;
        if !metadata.is_file() {
            return Err(WalletError::Validation(format!(
                "{} is not a file",
                path.display()
            )));
        }
        let size_mb = size_in_mb(metadata.len());
        if size_mb > self.max_size_mb as f64 {
            return Err(WalletError::Validation(format!(
                "file size must be less than {}MB, got {} MB",
                self.max_size_mb, size_mb
            )));
        }
        Ok(size_mb)
    }

    pub async fn stage(&self, path: &Path) -> Result<StagedFile> {
        let size_mb = self.check(path)?;
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();

        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name);
        let form = reqwest::multipart::Form::new().part("file", part);
        let url = format!("{}/ipfs/upload", self.base_url);

        let response = self.client.post(&url).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(WalletError::UpstreamUnavailable(format!(
                "file staging server returned {}",
                status
            )));
        }
        let body: UploadResponse = response.json().await?;
        let cid = body.cid.filter(|c| !c.is_empty()).ok_or_else(|| {
            WalletError::UpstreamUnavailable("file staging response has no cid".to_string())
        })?;

        info!(%cid, size_mb, "file staged");
        Ok(StagedFile { cid, size_mb })
    }
}

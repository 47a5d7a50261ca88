//! Named wallet files on disk
//!
//! Each wallet lives in `<dir>/<name>.json` and holds the WIF private key in
//! plain text, so files are written with owner-only permissions on unix.

use crate::crypto::KeyPair;
use crate::error::{Result, WalletError};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

const MAX_NAME_LENGTH: usize = 64;
const WALLET_EXTENSION: &str = "json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WalletInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub wif: String,
    pub cash_address: String,
    pub public_key: String,
    /// RFC3339 creation time
    pub created: String,
}

impl WalletInfo {
    pub fn keypair(&self) -> Result<KeyPair> {
        KeyPair::from_wif(&self.wif)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WalletFile {
    wallet: WalletInfo,
}

#[derive(Debug, Clone)]
pub struct WalletStore {
    dir: PathBuf,
}

impl WalletStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.dir.join(format!("{}.{}", name, WALLET_EXTENSION)))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).map(|p| p.exists()).unwrap_or(false)
    }

    /// Generates a fresh key and writes a new wallet file.
    pub fn create(&self, name: &str, description: &str) -> Result<WalletInfo> {
        self.import(name, description, KeyPair::generate())
    }

    /// Writes a new wallet file for an existing key.
    pub fn import(&self, name: &str, description: &str, keys: KeyPair) -> Result<WalletInfo> {
        let path = self.path_for(name)?;
        if path.exists() {
            return Err(WalletError::Validation(format!(
                "wallet '{}' already exists at {}",
                name,
                path.display()
            )));
        }

        let info = WalletInfo {
            name: name.to_string(),
            description: description.trim().to_string(),
            wif: keys.to_wif(),
            cash_address: keys.cash_address().encode(),
            public_key: keys.public_key_hex(),
            created: chrono::Utc::now().to_rfc3339(),
        };

        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(&WalletFile {
            wallet: info.clone(),
        })?;
        write_private(&path, json.as_bytes())?;

        info!(wallet = name, address = %info.cash_address, "wallet created");
        Ok(info)
    }

    pub fn load(&self, name: &str) -> Result<WalletInfo> {
        let path = self.path_for(name)?;
        let contents = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(WalletError::Validation(format!(
                    "wallet '{}' not found in {}",
                    name,
                    self.dir.display()
                )))
            }
            Err(e) => return Err(e.into()),
        };
        let file: WalletFile = serde_json::from_str(&contents)?;
        Ok(file.wallet)
    }

    /// All readable wallets, sorted by name. Unparseable files are skipped.
    pub fn list(&self) -> Result<Vec<WalletInfo>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut wallets = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(WALLET_EXTENSION) {
                continue;
            }
            let Ok(contents) = fs::read_to_string(&path) else {
                continue;
            };
            if let Ok(file) = serde_json::from_str::<WalletFile>(&contents) {
                wallets.push(file.wallet);
            }
        }
        wallets.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(wallets)
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(WalletError::Validation(
            "wallet name cannot be empty".to_string(),
        ));
    }
    if name.len() > MAX_NAME_LENGTH {
        return Err(WalletError::Validation(format!(
            "wallet name too long (max {} characters)",
            MAX_NAME_LENGTH
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(WalletError::Validation(format!(
            "wallet name '{}' may only contain letters, digits, '-' and '_'",
            name
        )));
    }
    Ok(())
}

fn open_private(path: &Path) -> std::io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)
}

/// Temp file, fsync, rename.
fn write_private(path: &Path, contents: &[u8]) -> Result<()> {
    let temp_path = path.with_extension("tmp");
    let mut file = open_private(&temp_path)?;
    file.write_all(contents)?;
    file.sync_all()?;
    drop(file);

    fs::rename(&temp_path, path)?;
    Ok(())
}

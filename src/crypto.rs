//! Cryptographic primitives for bch-msg-wallet

use crate::chain::address::{hash160, CashAddress};
use crate::error::WalletError;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use secp256k1::{
    constants::{PUBLIC_KEY_SIZE, SECRET_KEY_SIZE},
    ecdsa::{RecoverableSignature, RecoveryId, Signature},
    All, Message, PublicKey, Secp256k1, SecretKey,
};
use sha2::{Digest, Sha256};

/// A thread-safe, lazily initialized Secp256k1 context.
pub(crate) static SECP256K1_CONTEXT: Lazy<Secp256k1<All>> = Lazy::new(Secp256k1::new);

const WIF_MAINNET: u8 = 0x80;
const WIF_TESTNET: u8 = 0xef;
const WIF_COMPRESSED_FLAG: u8 = 0x01;

const SIGNED_MESSAGE_MAGIC: &[u8] = b"\x18Bitcoin Signed Message:\n";
const RECOVERABLE_SIGNATURE_SIZE: usize = 65;

/// SHA-256 applied twice.
pub fn sha256d(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    Sha256::digest(first).into()
}

/// Appends a Bitcoin-style variable length integer.
pub fn write_varint(out: &mut Vec<u8>, n: u64) {
    match n {
        0..=0xfc => out.push(n as u8),
        0xfd..=0xffff => {
            out.push(0xfd);
            out.extend_from_slice(&(n as u16).to_le_bytes());
        }
        0x1_0000..=0xffff_ffff => {
            out.push(0xfe);
            out.extend_from_slice(&(n as u32).to_le_bytes());
        }
        _ => {
            out.push(0xff);
            out.extend_from_slice(&n.to_le_bytes());
        }
    }
}

/// Parses a compressed or uncompressed public key from hex.
pub fn public_key_from_hex(hex_str: &str) -> Result<PublicKey, WalletError> {
    let bytes = hex::decode(hex_str.trim())
        .map_err(|e| WalletError::Crypto(format!("Invalid public key hex: {}", e)))?;
    PublicKey::from_slice(&bytes)
        .map_err(|e| WalletError::Crypto(format!("Invalid public key: {}", e)))
}

#[derive(Debug, Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generates a new random KeyPair using the OS random number generator.
    pub fn generate() -> Self {
        let secret_key = SecretKey::new(&mut OsRng);
        Self::from_secret_key(secret_key)
    }

    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let public_key = PublicKey::from_secret_key(&SECP256K1_CONTEXT, &secret_key);
        KeyPair {
            secret_key,
            public_key,
        }
    }

    /// Creates a KeyPair from raw secret key bytes.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, WalletError> {
        let secret_key = SecretKey::from_slice(bytes).map_err(|e| {
            if bytes.len() != SECRET_KEY_SIZE {
                WalletError::Crypto(format!(
                    "Secret key must be {} bytes, got {}",
                    SECRET_KEY_SIZE,
                    bytes.len()
                ))
            } else {
                WalletError::Crypto(format!("Invalid secret key bytes: {}", e))
            }
        })?;

        Ok(Self::from_secret_key(secret_key))
    }

    /// Imports a compressed-key WIF string.
    pub fn from_wif(wif: &str) -> Result<Self, WalletError> {
        let payload = bs58::decode(wif.trim())
            .with_check(None)
            .into_vec()
            .map_err(|e| WalletError::Crypto(format!("Invalid WIF: {}", e)))?;

        match payload.first() {
            Some(&WIF_MAINNET) | Some(&WIF_TESTNET) => {}
            _ => return Err(WalletError::Crypto("Invalid WIF version byte".to_string())),
        }
        if payload.len() != SECRET_KEY_SIZE + 2 || payload[SECRET_KEY_SIZE + 1] != WIF_COMPRESSED_FLAG
        {
            return Err(WalletError::Crypto(
                "Only compressed-key WIF strings are supported".to_string(),
            ));
        }

        Self::from_secret_bytes(&payload[1..=SECRET_KEY_SIZE])
    }

    /// Mainnet compressed-key WIF.
    pub fn to_wif(&self) -> String {
        let mut payload = Vec::with_capacity(SECRET_KEY_SIZE + 2);
        payload.push(WIF_MAINNET);
        payload.extend_from_slice(&self.secret_key.secret_bytes());
        payload.push(WIF_COMPRESSED_FLAG);
        bs58::encode(payload).with_check().into_string()
    }

    /// Returns the KeyPair's public key as a compressed byte array.
    pub fn public_key_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.public_key.serialize()
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key_bytes())
    }

    pub fn pubkey_hash(&self) -> [u8; 20] {
        hash160(&self.public_key_bytes())
    }

    pub fn cash_address(&self) -> CashAddress {
        CashAddress::p2pkh(self.pubkey_hash())
    }

    /// Signs a 32-byte digest without further hashing.
    pub fn sign_digest(&self, digest: [u8; 32]) -> Signature {
        let message = Message::from_digest(digest);
        SECP256K1_CONTEXT.sign_ecdsa(&message, &self.secret_key)
    }

    /// Signs a text message in the Bitcoin signed-message format, returning base64.
    pub fn sign_message(&self, message: &str) -> String {
        let digest = signed_message_digest(message);
        let signature = SECP256K1_CONTEXT
            .sign_ecdsa_recoverable(&Message::from_digest(digest), &self.secret_key);
        let (recovery_id, compact) = signature.serialize_compact();

        let mut out = Vec::with_capacity(RECOVERABLE_SIGNATURE_SIZE);
        // 27 + recovery id, plus 4 for a compressed key
        out.push(27 + 4 + recovery_id.to_i32() as u8);
        out.extend_from_slice(&compact);
        BASE64.encode(out)
    }
}

fn signed_message_digest(message: &str) -> [u8; 32] {
    let mut data = Vec::with_capacity(SIGNED_MESSAGE_MAGIC.len() + message.len() + 9);
    data.extend_from_slice(SIGNED_MESSAGE_MAGIC);
    write_varint(&mut data, message.len() as u64);
    data.extend_from_slice(message.as_bytes());
    sha256d(&data)
}

/// Verifies a base64 signed-message signature against a cash address.
///
/// Returns `Ok(false)` when the signature is well formed but was produced by a
/// different key, and an error when the inputs cannot be parsed.
pub fn verify_message(address: &str, signature_b64: &str, message: &str) -> Result<bool, WalletError> {
    let address = CashAddress::decode(address)?;
    let raw = BASE64
        .decode(signature_b64.trim())
        .map_err(|e| WalletError::Crypto(format!("Invalid signature encoding: {}", e)))?;
    if raw.len() != RECOVERABLE_SIGNATURE_SIZE {
        return Err(WalletError::Crypto(format!(
            "Signature must be exactly {} bytes, got {}",
            RECOVERABLE_SIGNATURE_SIZE,
            raw.len()
        )));
    }

    let header = raw[0];
    if !(27..=34).contains(&header) {
        return Err(WalletError::Crypto(format!(
            "Invalid signature header byte {}",
            header
        )));
    }
    let compressed = header >= 31;
    let recovery_id = RecoveryId::from_i32(((header - 27) & 3) as i32)
        .map_err(|e| WalletError::Crypto(format!("Invalid recovery id: {}", e)))?;
    let signature = RecoverableSignature::from_compact(&raw[1..], recovery_id)
        .map_err(|e| WalletError::Crypto(format!("Invalid signature: {}", e)))?;

    let digest = signed_message_digest(message);
    let recovered = match SECP256K1_CONTEXT.recover_ecdsa(&Message::from_digest(digest), &signature) {
        Ok(key) => key,
        Err(_) => return Ok(false),
    };

    let hash = if compressed {
        hash160(&recovered.serialize())
    } else {
        hash160(&recovered.serialize_uncompressed())
    };
    Ok(hash == *address.hash())
}

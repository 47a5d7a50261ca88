//! Asymmetric encryption of message bodies to a recipient's chain key
//!
//! The [`Cipher`] trait is the raw primitive over bytes. [`EncryptionAdapter`]
//! puts the hex boundary and key parsing around it: public keys come in as
//! hex from the indexer, private keys as WIF from the wallet, and ciphertext
//! travels as hex through the relay.
//!
//! The default primitive, [`Ecies`], is ephemeral-static secp256k1 ECDH with
//! AES-256-GCM:
//!
//! ```text
//! ephemeral compressed pubkey (33) || nonce (12) || ciphertext + tag
//! ```

use crate::crypto::{public_key_from_hex, KeyPair, SECP256K1_CONTEXT};
use crate::error::{Result, WalletError};
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use rand::{rngs::OsRng, RngCore};
use secp256k1::{ecdh::SharedSecret, PublicKey, SecretKey};
use sha2::{Digest, Sha256};

const NONCE_SIZE: usize = 12;
const EPHEMERAL_KEY_SIZE: usize = 33;
const TAG_SIZE: usize = 16;
const KDF_LABEL: &[u8] = b"bch-msg-wallet/ecies/v1";

pub trait Cipher {
    fn encrypt(&self, recipient: &PublicKey, plaintext: &[u8]) -> Result<Vec<u8>>;
    fn decrypt(&self, secret: &SecretKey, ciphertext: &[u8]) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Ecies;

fn derive_key(shared: &SharedSecret, ephemeral: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(KDF_LABEL);
    hasher.update(shared.secret_bytes());
    hasher.update(ephemeral);
    hasher.finalize().into()
}

impl Cipher for Ecies {
    fn encrypt(&self, recipient: &PublicKey, plaintext: &[u8]) -> Result<Vec<u8>> {
        let ephemeral_secret = SecretKey::new(&mut OsRng);
        let ephemeral_public = PublicKey::from_secret_key(&SECP256K1_CONTEXT, &ephemeral_secret);
        let ephemeral_bytes = ephemeral_public.serialize();

        let shared = SharedSecret::new(recipient, &ephemeral_secret);
        let key = derive_key(&shared, &ephemeral_bytes);
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));

        let mut nonce = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce);
        let sealed = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|e| WalletError::Crypto(format!("Encryption failed: {}", e)))?;

        let mut out = Vec::with_capacity(EPHEMERAL_KEY_SIZE + NONCE_SIZE + sealed.len());
        out.extend_from_slice(&ephemeral_bytes);
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    fn decrypt(&self, secret: &SecretKey, ciphertext: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.len() < EPHEMERAL_KEY_SIZE + NONCE_SIZE + TAG_SIZE {
            return Err(WalletError::DecryptionFailed(format!(
                "ciphertext too short ({} bytes)",
                ciphertext.len()
            )));
        }
        let (ephemeral_bytes, rest) = ciphertext.split_at(EPHEMERAL_KEY_SIZE);
        let (nonce, sealed) = rest.split_at(NONCE_SIZE);

        let ephemeral = PublicKey::from_slice(ephemeral_bytes)
            .map_err(|e| WalletError::DecryptionFailed(format!("bad ephemeral key: {}", e)))?;
        let shared = SharedSecret::new(&ephemeral, secret);
        let key = derive_key(&shared, ephemeral_bytes);
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));

        cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| WalletError::DecryptionFailed("authentication tag mismatch".to_string()))
    }
}

/// Hex-in, hex-out wrapper over a [`Cipher`].
#[derive(Debug, Clone, Default)]
pub struct EncryptionAdapter<C = Ecies> {
    cipher: C,
}

impl EncryptionAdapter<Ecies> {
    pub fn new() -> Self {
        Self { cipher: Ecies }
    }
}

impl<C: Cipher> EncryptionAdapter<C> {
    pub fn with_cipher(cipher: C) -> Self {
        Self { cipher }
    }

    pub fn encrypt(&self, pubkey_hex: &str, plaintext: &[u8]) -> Result<String> {
        let recipient = public_key_from_hex(pubkey_hex)?;
        Ok(hex::encode(self.cipher.encrypt(&recipient, plaintext)?))
    }

    /// Any failure after key parsing is reported as `DecryptionFailed`.
    pub fn decrypt(&self, private_key_wif: &str, ciphertext_hex: &str) -> Result<Vec<u8>> {
        let keys = KeyPair::from_wif(private_key_wif)?;
        let ciphertext = hex::decode(ciphertext_hex.trim())
            .map_err(|e| WalletError::DecryptionFailed(format!("ciphertext is not hex: {}", e)))?;
        self.cipher.decrypt(&keys.secret_key, &ciphertext).map_err(|e| match e {
            WalletError::DecryptionFailed(_) => e,
            other => WalletError::DecryptionFailed(other.to_string()),
        })
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::payload::Payload;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_decrypt_inverts_encrypt(plaintext in prop::collection::vec(any::<u8>(), 0..2048)) {
            let keys = KeyPair::generate();
            let adapter = EncryptionAdapter::new();
            let ciphertext = adapter.encrypt(&keys.public_key_hex(), &plaintext)?;
            prop_assert_eq!(adapter.decrypt(&keys.to_wif(), &ciphertext)?, plaintext);
        }

        #[test]
        fn prop_payload_survives_encryption(message in ".*", text in ".*") {
            let keys = KeyPair::generate();
            let adapter = EncryptionAdapter::new();
            let payload = Payload::from_text(&message);
            let ciphertext = adapter.encrypt(&keys.public_key_hex(), &payload.encode())?;
            let opened = adapter.decrypt(&keys.to_wif(), &ciphertext)?;
            prop_assert_eq!(Payload::decode(&opened), payload);

            prop_assume!(!matches!(serde_json::from_str::<serde_json::Value>(&text), Ok(serde_json::Value::Object(_))));
            let raw = Payload::raw(text);
            let ciphertext = adapter.encrypt(&keys.public_key_hex(), &raw.encode())?;
            prop_assert_eq!(Payload::decode(&adapter.decrypt(&keys.to_wif(), &ciphertext)?), raw);
        }
    }
}

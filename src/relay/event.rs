//! Nostr events (NIP-01) and the wallet-derived relay identity

use crate::crypto::{KeyPair, SECP256K1_CONTEXT};
use crate::error::{Result, WalletError};
use secp256k1::{schnorr, Keypair, Message, SecretKey, XOnlyPublicKey};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};

/// Short text note; the kind message ciphertext is posted under.
pub const KIND_TEXT_NOTE: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub pubkey: String,
    pub created_at: i64,
    pub kind: u32,
    pub tags: Vec<Vec<String>>,
    pub content: String,
    pub sig: String,
}

/// Event id: SHA-256 of `[0, pubkey, created_at, kind, tags, content]`.
pub fn compute_event_id(
    pubkey: &str,
    created_at: i64,
    kind: u32,
    tags: &[Vec<String>],
    content: &str,
) -> [u8; 32] {
    let serialized = json!([0, pubkey, created_at, kind, tags, content]).to_string();
    Sha256::digest(serialized.as_bytes()).into()
}

impl Event {
    /// Checks that the id matches the content and the signature matches the id.
    pub fn verify(&self) -> Result<()> {
        let expected = compute_event_id(
            &self.pubkey,
            self.created_at,
            self.kind,
            &self.tags,
            &self.content,
        );
        if hex::encode(expected) != self.id {
            return Err(WalletError::Crypto(format!("event id mismatch for {}", self.id)));
        }

        let pubkey_bytes = hex::decode(&self.pubkey)
            .map_err(|e| WalletError::Crypto(format!("Invalid event pubkey: {}", e)))?;
        let pubkey = XOnlyPublicKey::from_slice(&pubkey_bytes)
            .map_err(|e| WalletError::Crypto(format!("Invalid event pubkey: {}", e)))?;
        let sig_bytes = hex::decode(&self.sig)
            .map_err(|e| WalletError::Crypto(format!("Invalid event signature: {}", e)))?;
        let signature = schnorr::Signature::from_slice(&sig_bytes)
            .map_err(|e| WalletError::Crypto(format!("Invalid event signature: {}", e)))?;

        SECP256K1_CONTEXT
            .verify_schnorr(&signature, &Message::from_digest(expected), &pubkey)
            .map_err(|_| WalletError::Crypto("Event signature verification failed".to_string()))
    }
}

/// Relay identity derived from the wallet key: the same secret scalar, used
/// through its x-only public key.
#[derive(Debug, Clone)]
pub struct NostrKeys {
    keypair: Keypair,
    public_key: XOnlyPublicKey,
}

impl NostrKeys {
    pub fn from_secret_key(secret_key: &SecretKey) -> Self {
        let keypair = Keypair::from_secret_key(&SECP256K1_CONTEXT, secret_key);
        let (public_key, _parity) = keypair.x_only_public_key();
        Self {
            keypair,
            public_key,
        }
    }

    pub fn from_wif(wif: &str) -> Result<Self> {
        let keys = KeyPair::from_wif(wif)?;
        Ok(Self::from_secret_key(&keys.secret_key))
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key.serialize())
    }

    pub fn sign_event(
        &self,
        kind: u32,
        tags: Vec<Vec<String>>,
        content: &str,
        created_at: i64,
    ) -> Event {
        let pubkey = self.public_key_hex();
        let id = compute_event_id(&pubkey, created_at, kind, &tags, content);
        let signature = SECP256K1_CONTEXT.sign_schnorr(&Message::from_digest(id), &self.keypair);

        Event {
            id: hex::encode(id),
            pubkey,
            created_at,
            kind,
            tags,
            content: content.to_string(),
            sig: signature.to_string(),
        }
    }

    /// Signs a kind-1 note stamped with the current time.
    pub fn text_note(&self, content: &str) -> Event {
        self.sign_event(
            KIND_TEXT_NOTE,
            Vec::new(),
            content,
            chrono::Utc::now().timestamp(),
        )
    }
}

//! bch-msg-wallet - A Bitcoin Cash wallet with end-to-end encrypted messaging
//!
//! Messages are encrypted to the recipient's public key, published to a Nostr
//! relay, and announced with a small on-chain signal transaction that points
//! at the relay content.
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Messaging Protocol
//! - [`messaging`] - Send and receive orchestrators, recipient key lookup
//! - [`signal`] - On-chain signal encoding, writing and scanning
//! - [`payload`] - Plaintext payload codec (raw text or structured JSON)
//! - [`encryption`] - Public key encryption of payloads
//!
//! ## Chain
//! - [`chain`] - Cash addresses, scripts, transactions, indexer client and wallet
//!
//! ## Relay
//! - [`relay`] - Nostr events, relay transport, publisher and reader
//!
//! ## Cryptography
//! - [`crypto`] - Key pairs, WIF and signed messages (secp256k1)
//!
//! ## Storage
//! - [`wallet_store`] - Named wallet files on disk
//! - [`staging`] - File upload to a staging server
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types
//! - [`logging`] - Tracing subscriber setup
//! - [`resilience`] - Retry for idempotent reads
//! - [`cli`] - CLI commands

#![forbid(unsafe_code)]

// ============================================================================
// Messaging Protocol
// ============================================================================
pub mod encryption;
pub mod messaging;
pub mod payload;
pub mod signal;

// ============================================================================
// Chain
// ============================================================================
pub mod chain;

// ============================================================================
// Relay
// ============================================================================
pub mod relay;

// ============================================================================
// Cryptography
// ============================================================================
pub mod crypto;

// ============================================================================
// Storage
// ============================================================================
pub mod staging;
pub mod wallet_store;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod resilience;

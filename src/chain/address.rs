//! CashAddr encoding for Bitcoin Cash addresses

use crate::error::WalletError;
use secp256k1::hashes::{ripemd160, Hash};
use sha2::{Digest, Sha256};
use std::fmt;

pub const MAINNET_PREFIX: &str = "bitcoincash";

const CHARSET: &[u8; 32] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";
const CHECKSUM_LEN: usize = 8;
const HASH160_SIZE: usize = 20;

/// RIPEMD-160 of SHA-256.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    let sha = Sha256::digest(data);
    ripemd160::Hash::hash(&sha).to_byte_array()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    P2pkh,
    P2sh,
}

impl AddressKind {
    fn type_bits(self) -> u8 {
        match self {
            AddressKind::P2pkh => 0,
            AddressKind::P2sh => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CashAddress {
    prefix: String,
    kind: AddressKind,
    hash: [u8; HASH160_SIZE],
}

impl CashAddress {
    pub fn p2pkh(hash: [u8; HASH160_SIZE]) -> Self {
        Self {
            prefix: MAINNET_PREFIX.to_string(),
            kind: AddressKind::P2pkh,
            hash,
        }
    }

    pub fn p2sh(hash: [u8; HASH160_SIZE]) -> Self {
        Self {
            prefix: MAINNET_PREFIX.to_string(),
            kind: AddressKind::P2sh,
            hash,
        }
    }

    pub fn kind(&self) -> AddressKind {
        self.kind
    }

    pub fn hash(&self) -> &[u8; HASH160_SIZE] {
        &self.hash
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Encodes as `prefix:payload`.
    pub fn encode(&self) -> String {
        let mut payload = Vec::with_capacity(HASH160_SIZE + 1);
        // size bits are zero for a 160-bit hash
        payload.push(self.kind.type_bits() << 3);
        payload.extend_from_slice(&self.hash);

        let mut data = convert_bits(&payload, 8, 5, true).unwrap_or_default();
        let checksum = checksum(&self.prefix, &data);
        data.extend_from_slice(&checksum);

        let body: String = data.iter().map(|&d| CHARSET[d as usize] as char).collect();
        format!("{}:{}", self.prefix, body)
    }

    /// Decodes an address with or without its prefix. Mixed case is rejected.
    pub fn decode(input: &str) -> Result<Self, WalletError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(WalletError::Validation("address is empty".to_string()));
        }
        let has_lower = input.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = input.chars().any(|c| c.is_ascii_uppercase());
        if has_lower && has_upper {
            return Err(invalid(input, "mixed case"));
        }
        let lowered = input.to_ascii_lowercase();

        let (prefix, body) = match lowered.split_once(':') {
            Some((prefix, body)) => (prefix.to_string(), body),
            None => (MAINNET_PREFIX.to_string(), lowered.as_str()),
        };
        if body.len() <= CHECKSUM_LEN {
            return Err(invalid(input, "too short"));
        }

        let mut data = Vec::with_capacity(body.len());
        for c in body.bytes() {
            let value = CHARSET
                .iter()
                .position(|&x| x == c)
                .ok_or_else(|| invalid(input, "bad character"))?;
            data.push(value as u8);
        }

        if polymod(&checksum_input(&prefix, &data)) != 0 {
            return Err(invalid(input, "checksum mismatch"));
        }

        let payload = convert_bits(&data[..data.len() - CHECKSUM_LEN], 5, 8, false)
            .ok_or_else(|| invalid(input, "bad padding"))?;
        if payload.len() != HASH160_SIZE + 1 {
            return Err(invalid(input, "unsupported hash size"));
        }

        let version = payload[0];
        if version & 0x07 != 0 {
            return Err(invalid(input, "unsupported hash size"));
        }
        let kind = match version >> 3 {
            0 => AddressKind::P2pkh,
            1 => AddressKind::P2sh,
            _ => return Err(invalid(input, "unsupported address type")),
        };

        let mut hash = [0u8; HASH160_SIZE];
        hash.copy_from_slice(&payload[1..]);
        Ok(Self { prefix, kind, hash })
    }
}

impl fmt::Display for CashAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}

/// Canonical `bitcoincash:` form of an address string, used for equality checks.
pub fn normalize(address: &str) -> Result<String, WalletError> {
    Ok(CashAddress::decode(address)?.encode())
}

fn invalid(input: &str, reason: &str) -> WalletError {
    WalletError::Validation(format!("invalid cash address {} ({})", input, reason))
}

fn checksum_input(prefix: &str, data: &[u8]) -> Vec<u8> {
    let mut values: Vec<u8> = prefix.bytes().map(|b| b & 0x1f).collect();
    values.push(0);
    values.extend_from_slice(data);
    values
}

fn checksum(prefix: &str, data: &[u8]) -> [u8; CHECKSUM_LEN] {
    let mut values = checksum_input(prefix, data);
    values.extend_from_slice(&[0u8; CHECKSUM_LEN]);
    let poly = polymod(&values);

    let mut out = [0u8; CHECKSUM_LEN];
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = ((poly >> (5 * (7 - i))) & 0x1f) as u8;
    }
    out
}

fn polymod(values: &[u8]) -> u64 {
    let mut c: u64 = 1;
    for &d in values {
        let c0 = (c >> 35) as u8;
        c = ((c & 0x07_ffff_ffff) << 5) ^ d as u64;
        if c0 & 0x01 != 0 {
            c ^= 0x98_f2bc_8e61;
        }
        if c0 & 0x02 != 0 {
            c ^= 0x79_b76d_99e2;
        }
        if c0 & 0x04 != 0 {
            c ^= 0xf3_3e5f_b3c4;
        }
        if c0 & 0x08 != 0 {
            c ^= 0xae_2eab_e2a8;
        }
        if c0 & 0x10 != 0 {
            c ^= 0x1e_4f43_e470;
        }
    }
    c ^ 1
}

fn convert_bits(data: &[u8], from: u32, to: u32, pad: bool) -> Option<Vec<u8>> {
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    let max_value = (1u32 << to) - 1;
    let mut out = Vec::with_capacity(data.len() * from as usize / to as usize + 1);

    for &value in data {
        let value = value as u32;
        if value >> from != 0 {
            return None;
        }
        acc = (acc << from) | value;
        bits += from;
        while bits >= to {
            bits -= to;
            out.push(((acc >> bits) & max_value) as u8);
        }
    }

    if pad {
        if bits > 0 {
            out.push(((acc << (to - bits)) & max_value) as u8);
        }
    } else if bits >= from || ((acc << (to - bits)) & max_value) != 0 {
        return None;
    }
    Some(out)
}

//! Bitcoin Cash transaction model, serialization and P2PKH signing

use crate::chain::script::{p2pkh, push_data};
use crate::crypto::{sha256d, write_varint, KeyPair};
use crate::error::{Result, WalletError};

pub const SIGHASH_ALL: u32 = 0x01;
pub const SIGHASH_FORKID: u32 = 0x40;
pub const DEFAULT_SEQUENCE: u32 = 0xffff_ffff;

/// Upper bound of a signed P2PKH input with a compressed key.
pub const P2PKH_INPUT_SIZE: usize = 148;
const TX_OVERHEAD_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutPoint {
    /// Transaction hash in internal (little-endian) byte order.
    pub hash: [u8; 32],
    pub vout: u32,
}

impl OutPoint {
    /// Builds an outpoint from a display-order txid.
    pub fn from_txid(txid: &str, vout: u32) -> Result<Self> {
        let mut bytes = hex::decode(txid)
            .map_err(|e| WalletError::Validation(format!("invalid txid {}: {}", txid, e)))?;
        if bytes.len() != 32 {
            return Err(WalletError::Validation(format!(
                "txid must be 32 bytes, got {}",
                bytes.len()
            )));
        }
        bytes.reverse();
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&bytes);
        Ok(Self { hash, vout })
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.hash);
        out.extend_from_slice(&self.vout.to_le_bytes());
    }
}

#[derive(Debug, Clone)]
pub struct TxInput {
    pub outpoint: OutPoint,
    /// Value of the spent output, committed to by the sighash.
    pub value: u64,
    pub script_sig: Vec<u8>,
    pub sequence: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutput {
    pub value: u64,
    pub script: Vec<u8>,
}

impl TxOutput {
    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.value.to_le_bytes());
        write_varint(out, self.script.len() as u64);
        out.extend_from_slice(&self.script);
    }

    pub fn serialized_size(&self) -> usize {
        let mut buf = Vec::new();
        self.write(&mut buf);
        buf.len()
    }
}

#[derive(Debug, Clone)]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub lock_time: u32,
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

impl Transaction {
    pub fn new() -> Self {
        Self {
            version: 2,
            inputs: Vec::new(),
            outputs: Vec::new(),
            lock_time: 0,
        }
    }

    pub fn add_input(&mut self, outpoint: OutPoint, value: u64) {
        self.inputs.push(TxInput {
            outpoint,
            value,
            script_sig: Vec::new(),
            sequence: DEFAULT_SEQUENCE,
        });
    }

    pub fn add_output(&mut self, value: u64, script: Vec<u8>) {
        self.outputs.push(TxOutput { value, script });
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.version.to_le_bytes());
        write_varint(&mut out, self.inputs.len() as u64);
        for input in &self.inputs {
            input.outpoint.write(&mut out);
            write_varint(&mut out, input.script_sig.len() as u64);
            out.extend_from_slice(&input.script_sig);
            out.extend_from_slice(&input.sequence.to_le_bytes());
        }
        write_varint(&mut out, self.outputs.len() as u64);
        for output in &self.outputs {
            output.write(&mut out);
        }
        out.extend_from_slice(&self.lock_time.to_le_bytes());
        out
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.serialize())
    }

    /// Display-order transaction id.
    pub fn txid(&self) -> String {
        let mut hash = sha256d(&self.serialize());
        hash.reverse();
        hex::encode(hash)
    }

    /// Signature hash for one input (BIP143 layout with SIGHASH_FORKID).
    pub fn signature_hash(&self, index: usize, script_code: &[u8], sighash_type: u32) -> Result<[u8; 32]> {
        let input = self.inputs.get(index).ok_or_else(|| {
            WalletError::Validation(format!("input index {} out of range", index))
        })?;

        let mut prevouts = Vec::with_capacity(self.inputs.len() * 36);
        let mut sequences = Vec::with_capacity(self.inputs.len() * 4);
        for i in &self.inputs {
            i.outpoint.write(&mut prevouts);
            sequences.extend_from_slice(&i.sequence.to_le_bytes());
        }
        let mut outputs = Vec::new();
        for o in &self.outputs {
            o.write(&mut outputs);
        }

        let mut preimage = Vec::with_capacity(256);
        preimage.extend_from_slice(&self.version.to_le_bytes());
        preimage.extend_from_slice(&sha256d(&prevouts));
        preimage.extend_from_slice(&sha256d(&sequences));
        input.outpoint.write(&mut preimage);
        write_varint(&mut preimage, script_code.len() as u64);
        preimage.extend_from_slice(script_code);
        preimage.extend_from_slice(&input.value.to_le_bytes());
        preimage.extend_from_slice(&input.sequence.to_le_bytes());
        preimage.extend_from_slice(&sha256d(&outputs));
        preimage.extend_from_slice(&self.lock_time.to_le_bytes());
        preimage.extend_from_slice(&sighash_type.to_le_bytes());

        Ok(sha256d(&preimage))
    }

    /// Signs every input as a P2PKH spend of `keypair`.
    pub fn sign_p2pkh(&mut self, keypair: &KeyPair) -> Result<()> {
        let sighash_type = SIGHASH_ALL | SIGHASH_FORKID;
        let script_code = p2pkh(&keypair.pubkey_hash());
        let pubkey = keypair.public_key_bytes();

        for index in 0..self.inputs.len() {
            let digest = self.signature_hash(index, &script_code, sighash_type)?;
            let mut signature = keypair.sign_digest(digest).serialize_der().to_vec();
            signature.push(sighash_type as u8);

            let mut script_sig = Vec::with_capacity(signature.len() + pubkey.len() + 2);
            push_data(&mut script_sig, &signature);
            push_data(&mut script_sig, &pubkey);
            self.inputs[index].script_sig = script_sig;
        }
        Ok(())
    }
}

/// Size estimate for a P2PKH-funded transaction with the given outputs.
pub fn estimate_size(input_count: usize, outputs: &[TxOutput]) -> usize {
    TX_OVERHEAD_SIZE
        + input_count * P2PKH_INPUT_SIZE
        + outputs.iter().map(TxOutput::serialized_size).sum::<usize>()
}

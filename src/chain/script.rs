//! Locking scripts and OP_RETURN data pushes

use crate::chain::address::{AddressKind, CashAddress};

pub const OP_RETURN: u8 = 0x6a;
pub const OP_DUP: u8 = 0x76;
pub const OP_HASH160: u8 = 0xa9;
pub const OP_EQUAL: u8 = 0x87;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_CHECKSIG: u8 = 0xac;
pub const OP_PUSHDATA1: u8 = 0x4c;
pub const OP_PUSHDATA2: u8 = 0x4d;
pub const OP_PUSHDATA4: u8 = 0x4e;

/// Largest OP_RETURN script relayed by standard nodes.
pub const MAX_OP_RETURN_SIZE: usize = 223;

pub fn p2pkh(hash: &[u8; 20]) -> Vec<u8> {
    let mut script = Vec::with_capacity(25);
    script.extend_from_slice(&[OP_DUP, OP_HASH160, 20]);
    script.extend_from_slice(hash);
    script.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);
    script
}

pub fn p2sh(hash: &[u8; 20]) -> Vec<u8> {
    let mut script = Vec::with_capacity(23);
    script.extend_from_slice(&[OP_HASH160, 20]);
    script.extend_from_slice(hash);
    script.push(OP_EQUAL);
    script
}

pub fn locking_script(address: &CashAddress) -> Vec<u8> {
    match address.kind() {
        AddressKind::P2pkh => p2pkh(address.hash()),
        AddressKind::P2sh => p2sh(address.hash()),
    }
}

/// Recovers the address a standard locking script pays to.
pub fn address_from_script(script: &[u8]) -> Option<CashAddress> {
    let mut hash = [0u8; 20];
    match script {
        [OP_DUP, OP_HASH160, 20, body @ .., OP_EQUALVERIFY, OP_CHECKSIG] if body.len() == 20 => {
            hash.copy_from_slice(body);
            Some(CashAddress::p2pkh(hash))
        }
        [OP_HASH160, 20, body @ .., OP_EQUAL] if body.len() == 20 => {
            hash.copy_from_slice(body);
            Some(CashAddress::p2sh(hash))
        }
        _ => None,
    }
}

/// Appends a minimal data push.
pub fn push_data(out: &mut Vec<u8>, data: &[u8]) {
    let len = data.len();
    if len < OP_PUSHDATA1 as usize {
        out.push(len as u8);
    } else if len <= 0xff {
        out.push(OP_PUSHDATA1);
        out.push(len as u8);
    } else if len <= 0xffff {
        out.push(OP_PUSHDATA2);
        out.extend_from_slice(&(len as u16).to_le_bytes());
    } else {
        out.push(OP_PUSHDATA4);
        out.extend_from_slice(&(len as u32).to_le_bytes());
    }
    out.extend_from_slice(data);
}

/// Builds `OP_RETURN <push>...`.
pub fn op_return(pushes: &[&[u8]]) -> Vec<u8> {
    let mut script = vec![OP_RETURN];
    for push in pushes {
        push_data(&mut script, push);
    }
    script
}

/// Splits an OP_RETURN script into its data pushes.
///
/// Returns `None` for anything that is not `OP_RETURN` followed only by
/// well-formed pushes.
pub fn parse_op_return(script: &[u8]) -> Option<Vec<Vec<u8>>> {
    let (&first, mut rest) = script.split_first()?;
    if first != OP_RETURN {
        return None;
    }

    let mut pushes = Vec::new();
    while let Some((&opcode, tail)) = rest.split_first() {
        let (len, tail) = match opcode {
            0x01..=0x4b => (opcode as usize, tail),
            OP_PUSHDATA1 => {
                let (&n, tail) = tail.split_first()?;
                (n as usize, tail)
            }
            OP_PUSHDATA2 => {
                if tail.len() < 2 {
                    return None;
                }
                (u16::from_le_bytes([tail[0], tail[1]]) as usize, &tail[2..])
            }
            OP_PUSHDATA4 => {
                if tail.len() < 4 {
                    return None;
                }
                let n = u32::from_le_bytes([tail[0], tail[1], tail[2], tail[3]]) as usize;
                (n, &tail[4..])
            }
            _ => return None,
        };
        if tail.len() < len {
            return None;
        }
        pushes.push(tail[..len].to_vec());
        rest = &tail[len..];
    }
    Some(pushes)
}

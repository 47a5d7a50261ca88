//! OP_RETURN encoding of message signals
//!
//! A signal output is `OP_RETURN <6d02> <"<marker> <content id> <subject>">`.
//! The subject is cleartext and may contain spaces; the content id may not.

use crate::chain::script::{op_return, parse_op_return, MAX_OP_RETURN_SIZE};
use crate::error::{Result, WalletError};

/// Marker identifying encrypted-message signals.
pub const MESSAGE_MARKER: &str = "MSG NOSTR";

/// Leading push used by memo-style posts.
pub const MEMO_POST_PREFIX: [u8; 2] = [0x6d, 0x02];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalBody {
    pub content_id: String,
    pub subject: String,
}

pub fn encode_signal(marker: &str, content_id: &str, subject: &str) -> Result<Vec<u8>> {
    if marker.trim().is_empty() {
        return Err(WalletError::Validation("signal marker is empty".to_string()));
    }
    if content_id.is_empty() || content_id.chars().any(char::is_whitespace) {
        return Err(WalletError::Validation(format!(
            "content id must be non-empty without whitespace: {:?}",
            content_id
        )));
    }

    let text = if subject.is_empty() {
        format!("{} {}", marker, content_id)
    } else {
        format!("{} {} {}", marker, content_id, subject)
    };
    let script = op_return(&[&MEMO_POST_PREFIX, text.as_bytes()]);
    if script.len() > MAX_OP_RETURN_SIZE {
        return Err(WalletError::EncodingTooLarge {
            size: script.len(),
            max: MAX_OP_RETURN_SIZE,
        });
    }
    Ok(script)
}

/// Decodes a signal with `marker` from one output script.
pub fn decode_signal(script: &[u8], marker: &str) -> Option<SignalBody> {
    let pushes = parse_op_return(script)?;
    let [prefix, body] = pushes.as_slice() else {
        return None;
    };
    if prefix.as_slice() != MEMO_POST_PREFIX {
        return None;
    }

    let text = std::str::from_utf8(body).ok()?;
    let rest = text.strip_prefix(marker)?.strip_prefix(' ')?;
    let (content_id, subject) = match rest.split_once(' ') {
        Some((id, subject)) => (id, subject),
        None => (rest, ""),
    };
    if content_id.is_empty() {
        return None;
    }
    Some(SignalBody {
        content_id: content_id.to_string(),
        subject: subject.to_string(),
    })
}

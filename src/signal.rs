//! On-chain message signals: a small transaction pointing at relay content

pub mod codec;
pub mod scanner;
pub mod writer;

pub use codec::{MEMO_POST_PREFIX, MESSAGE_MARKER};
pub use scanner::{SignalScanner, Signals};
pub use writer::SignalWriter;

/// A decoded signal. Identified by the txid carrying it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signal {
    pub txid: String,
    pub marker: String,
    pub subject: String,
    pub content_id: String,
    /// Address of the first input.
    pub sender: String,
    /// First standard output address, normally the recipient's dust output.
    pub recipient: Option<String>,
    pub height: Option<u64>,
}

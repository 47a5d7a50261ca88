//! Sending an encrypted message: key lookup, encryption, relay publish, signal

use crate::chain::address;
use crate::chain::service::WalletService;
use crate::error::{Result, WalletError};
use crate::messaging::context::MessagingContext;
use crate::messaging::resolver::KeyResolver;
use crate::payload::Payload;
use crate::relay::publisher::RelayPublisher;
use crate::relay::transport::RelayTransport;
use crate::signal::codec::{encode_signal, MESSAGE_MARKER};
use crate::signal::writer::SignalWriter;
use std::fmt;
use thiserror::Error;
use tracing::{error, info};

/// Length of a relay event id, used to size-check the signal up front.
const CONTENT_ID_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStage {
    Validating,
    ResolvingKey,
    Encrypting,
    Publishing,
    Signaling,
}

impl fmt::Display for SendStage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SendStage::Validating => write!(f, "validating request"),
            SendStage::ResolvingKey => write!(f, "resolving recipient key"),
            SendStage::Encrypting => write!(f, "encrypting"),
            SendStage::Publishing => write!(f, "publishing to relay"),
            SendStage::Signaling => write!(f, "broadcasting signal"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendState {
    Idle,
    Validating,
    ResolvingKey,
    Encrypting,
    Publishing,
    Signaling,
    Done(SentMessage),
    Failed { at: SendStage, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub txid: String,
    pub content_id: String,
}

#[derive(Debug, Clone)]
pub struct SendRequest {
    pub recipient: String,
    pub subject: String,
    pub payload: Payload,
}

/// A send that stopped part way. When `content_id` is set the ciphertext is
/// already on the relay without a signal pointing at it.
#[derive(Debug, Clone, Error)]
#[error("message send failed while {stage}: {error}")]
pub struct SendFailure {
    pub stage: SendStage,
    pub content_id: Option<String>,
    pub error: WalletError,
}

/// Checks a request without touching the network: the recipient must be a
/// valid address and the signal must fit with a full-length content id.
pub fn validate_request(request: &SendRequest) -> Result<()> {
    address::normalize(&request.recipient)?;
    encode_signal(MESSAGE_MARKER, &"0".repeat(CONTENT_ID_LEN), &request.subject)?;
    Ok(())
}

pub struct MessageSendOrchestrator<'a, W: WalletService, T: RelayTransport> {
    ctx: MessagingContext<'a, W, T>,
    state: SendState,
    transitions: Vec<SendState>,
}

impl<'a, W: WalletService, T: RelayTransport> MessageSendOrchestrator<'a, W, T> {
    pub fn new(ctx: MessagingContext<'a, W, T>) -> Self {
        Self {
            ctx,
            state: SendState::Idle,
            transitions: Vec::new(),
        }
    }

    pub fn state(&self) -> &SendState {
        &self.state
    }

    /// Every state entered by the last `send`, in order.
    pub fn transitions(&self) -> &[SendState] {
        &self.transitions
    }

    fn enter(&mut self, state: SendState) {
        info!(from = ?self.state, to = ?state, "send state");
        self.transitions.push(state.clone());
        self.state = state;
    }

    fn fail(&mut self, stage: SendStage, content_id: Option<String>, error: WalletError) -> SendFailure {
        error!(%stage, error = %error, "message send failed");
        self.enter(SendState::Failed {
            at: stage,
            reason: error.to_string(),
        });
        SendFailure {
            stage,
            content_id,
            error,
        }
    }

    pub async fn send(&mut self, request: &SendRequest) -> std::result::Result<SentMessage, SendFailure> {
        self.transitions.clear();
        self.state = SendState::Idle;

        self.enter(SendState::Validating);
        if let Err(e) = validate_request(request) {
            return Err(self.fail(SendStage::Validating, None, e));
        }

        self.enter(SendState::ResolvingKey);
        let resolver = KeyResolver::new(self.ctx.wallet, self.ctx.retry);
        let pubkey = match resolver.resolve(&request.recipient).await {
            Ok(key) => key,
            Err(e) => return Err(self.fail(SendStage::ResolvingKey, None, e)),
        };

        self.enter(SendState::Encrypting);
        let ciphertext = match self.ctx.encryption.encrypt(&pubkey, &request.payload.encode()) {
            Ok(c) => c,
            Err(e) => return Err(self.fail(SendStage::Encrypting, None, e)),
        };

        self.enter(SendState::Publishing);
        let published = match RelayPublisher::new(
            self.ctx.relay,
            &self.ctx.relay_url,
            self.ctx.wallet.private_key_wif(),
        ) {
            Ok(publisher) => publisher.publish(&ciphertext).await,
            Err(e) => Err(e),
        };
        let content_id = match published {
            Ok(id) => id,
            Err(e) => return Err(self.fail(SendStage::Publishing, None, e)),
        };

        if !self.ctx.settle_delay.is_zero() {
            tokio::time::sleep(self.ctx.settle_delay).await;
        }

        self.enter(SendState::Signaling);
        let writer = SignalWriter::new(self.ctx.wallet, MESSAGE_MARKER);
        let txid = match writer
            .write(&request.recipient, &request.subject, &content_id)
            .await
        {
            Ok(txid) => txid,
            Err(e) => return Err(self.fail(SendStage::Signaling, Some(content_id), e)),
        };

        let sent = SentMessage { txid, content_id };
        self.enter(SendState::Done(sent.clone()));
        Ok(sent)
    }
}

//! End-to-end encrypted messaging over relay content and chain signals

pub mod context;
pub mod receive;
pub mod resolver;
pub mod send;

pub use context::MessagingContext;
pub use receive::{MessageReceiveOrchestrator, MessageRecord, ReceivedMessage};
pub use resolver::KeyResolver;
pub use send::{
    validate_request, MessageSendOrchestrator, SendFailure, SendRequest, SendStage, SendState,
    SentMessage,
};

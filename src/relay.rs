//! Nostr relay access: event signing, publishing and fetching

pub mod event;
pub mod publisher;
pub mod reader;
pub mod transport;

pub use event::{Event, NostrKeys};
pub use publisher::RelayPublisher;
pub use reader::RelayReader;
pub use transport::{RelayConnection, RelayTransport, WsRelay};

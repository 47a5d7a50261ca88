//! Relay connections over WebSocket
//!
//! A connection is opened for exactly one publish or one fetch and closed by
//! the caller afterwards. Waits are bounded: publishing waits for the relay's
//! `OK`, fetching waits for the matching `EVENT` or `EOSE`.

use crate::error::{Result, WalletError};
use crate::relay::event::Event;
use futures_util::{SinkExt, StreamExt};
use rand::RngCore;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

#[allow(async_fn_in_trait)]
pub trait RelayConnection {
    /// Submits a signed event and waits for the relay's acknowledgement.
    async fn publish(&mut self, event: &Event) -> Result<String>;

    /// Waits at most `timeout` for the event with `event_id`.
    async fn subscribe_once(&mut self, event_id: &str, timeout: Duration) -> Result<Event>;

    async fn close(&mut self);
}

#[allow(async_fn_in_trait)]
pub trait RelayTransport {
    type Connection: RelayConnection;

    async fn connect(&self, url: &str) -> Result<Self::Connection>;
}

/// Messages a relay sends to a client.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayMessage {
    Ok {
        event_id: String,
        accepted: bool,
        message: String,
    },
    Event {
        subscription: String,
        event: Event,
    },
    Eose {
        subscription: String,
    },
    Closed {
        subscription: String,
        message: String,
    },
    Notice(String),
}

impl RelayMessage {
    /// Parses a relay frame; unknown or malformed frames yield `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(text).ok()?;
        let items = value.as_array()?;
        let str_at = |i: usize| items.get(i).and_then(Value::as_str).map(str::to_string);

        match items.first()?.as_str()? {
            "OK" => Some(RelayMessage::Ok {
                event_id: str_at(1)?,
                accepted: items.get(2)?.as_bool()?,
                message: str_at(3).unwrap_or_default(),
            }),
            "EVENT" => Some(RelayMessage::Event {
                subscription: str_at(1)?,
                event: serde_json::from_value(items.get(2)?.clone()).ok()?,
            }),
            "EOSE" => Some(RelayMessage::Eose {
                subscription: str_at(1)?,
            }),
            "CLOSED" => Some(RelayMessage::Closed {
                subscription: str_at(1)?,
                message: str_at(2).unwrap_or_default(),
            }),
            "NOTICE" => Some(RelayMessage::Notice(str_at(1).unwrap_or_default())),
            _ => None,
        }
    }
}

/// Connects to real relays with tokio-tungstenite.
#[derive(Debug, Clone)]
pub struct WsRelay {
    ack_timeout: Duration,
}

impl WsRelay {
    pub fn new(ack_timeout: Duration) -> Self {
        Self { ack_timeout }
    }
}

pub struct WsConnection {
    url: String,
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    ack_timeout: Duration,
}

impl RelayTransport for WsRelay {
    type Connection = WsConnection;

    async fn connect(&self, url: &str) -> Result<WsConnection> {
        let connecting = tokio::time::timeout(self.ack_timeout, connect_async(url));
        let (stream, _response) = connecting
            .await
            .map_err(|_| WalletError::RelayUnreachable(format!("{}: connect timed out", url)))?
            .map_err(|e| WalletError::RelayUnreachable(format!("{}: {}", url, e)))?;
        debug!(url, "relay connected");

        Ok(WsConnection {
            url: url.to_string(),
            stream,
            ack_timeout: self.ack_timeout,
        })
    }
}

impl WsConnection {
    async fn send_json(&mut self, value: Value) -> Result<()> {
        self.stream
            .send(Message::Text(value.to_string()))
            .await
            .map_err(|e| WalletError::RelayUnreachable(format!("{}: {}", self.url, e)))
    }

    /// Next relay frame before `deadline`; `Ok(None)` once the deadline passes.
    async fn next_frame(&mut self, deadline: Instant) -> Result<Option<RelayMessage>> {
        loop {
            let frame = match tokio::time::timeout_at(deadline, self.stream.next()).await {
                Err(_) => return Ok(None),
                Ok(None) => {
                    return Err(WalletError::RelayUnreachable(format!(
                        "{}: connection closed",
                        self.url
                    )))
                }
                Ok(Some(Err(e))) => {
                    return Err(WalletError::RelayUnreachable(format!("{}: {}", self.url, e)))
                }
                Ok(Some(Ok(frame))) => frame,
            };

            match frame {
                Message::Text(text) => match RelayMessage::parse(&text) {
                    Some(RelayMessage::Notice(notice)) => {
                        debug!(url = %self.url, %notice, "relay notice");
                    }
                    Some(message) => return Ok(Some(message)),
                    None => debug!(url = %self.url, "ignoring unrecognised relay frame"),
                },
                Message::Close(_) => {
                    return Err(WalletError::RelayUnreachable(format!(
                        "{}: relay closed the connection",
                        self.url
                    )))
                }
                _ => {}
            }
        }
    }
}

fn subscription_id() -> String {
    let mut bytes = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

impl RelayConnection for WsConnection {
    async fn publish(&mut self, event: &Event) -> Result<String> {
        self.send_json(json!(["EVENT", event])).await?;

        let deadline = Instant::now() + self.ack_timeout;
        loop {
            match self.next_frame(deadline).await? {
                None => {
                    return Err(WalletError::RelayUnreachable(format!(
                        "{}: no acknowledgement for event {}",
                        self.url, event.id
                    )))
                }
                Some(RelayMessage::Ok {
                    event_id,
                    accepted,
                    message,
                }) if event_id == event.id => {
                    return if accepted {
                        Ok(event_id)
                    } else {
                        Err(WalletError::RelayRejected(message))
                    };
                }
                Some(_) => continue,
            }
        }
    }

    async fn subscribe_once(&mut self, event_id: &str, timeout: Duration) -> Result<Event> {
        let sub = subscription_id();
        self.send_json(json!(["REQ", sub, { "ids": [event_id] }])).await?;

        let deadline = Instant::now() + timeout;
        let outcome = loop {
            match self.next_frame(deadline).await {
                Err(e) => break Err(e),
                Ok(None) => {
                    break Err(WalletError::ContentNotFound(format!(
                        "{} (no event within {}s)",
                        event_id,
                        timeout.as_secs()
                    )))
                }
                Ok(Some(RelayMessage::Event { subscription, event })) if subscription == sub => {
                    if event.id != event_id {
                        continue;
                    }
                    match event.verify() {
                        Ok(()) => break Ok(event),
                        Err(e) => warn!(url = %self.url, error = %e, "discarding invalid event"),
                    }
                }
                Ok(Some(RelayMessage::Eose { subscription })) if subscription == sub => {
                    break Err(WalletError::ContentNotFound(event_id.to_string()))
                }
                Ok(Some(RelayMessage::Closed { subscription, message })) if subscription == sub => {
                    break Err(WalletError::ContentNotFound(format!("{} ({})", event_id, message)))
                }
                Ok(Some(_)) => continue,
            }
        };

        if outcome.is_ok() || matches!(outcome, Err(WalletError::ContentNotFound(_))) {
            // best effort; the connection is closed right after anyway
            let _ = self.send_json(json!(["CLOSE", sub])).await;
        }
        outcome
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            debug!(url = %self.url, error = %e, "relay close");
        }
    }
}

//! Cleartext message payloads and their byte encoding

use serde_json::{Map, Value};

/// The cleartext carried inside an encrypted message.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Plain UTF-8 text.
    Raw(String),
    /// A JSON object with an optional display `message` and optional `data`.
    Structured {
        message: Option<String>,
        data: Option<Value>,
    },
}

impl Payload {
    pub fn raw(text: impl Into<String>) -> Self {
        Payload::Raw(text.into())
    }

    pub fn structured(message: impl Into<String>, data: Option<Value>) -> Self {
        Payload::Structured {
            message: Some(message.into()),
            data,
        }
    }

    /// Wraps free text into `{ "message": text }`.
    pub fn from_text(text: &str) -> Self {
        Payload::Structured {
            message: Some(text.to_string()),
            data: None,
        }
    }

    /// Text shown to the reader.
    pub fn display_text(&self) -> &str {
        match self {
            Payload::Raw(text) => text,
            Payload::Structured { message, .. } => message.as_deref().unwrap_or(""),
        }
    }

    /// Attached data, if the payload carries any.
    pub fn data(&self) -> Option<&Value> {
        match self {
            Payload::Raw(_) => None,
            Payload::Structured { data, .. } => data.as_ref(),
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, Payload::Structured { .. })
    }

    /// Canonical bytes: the raw UTF-8, or the compact JSON object.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Payload::Raw(text) => text.as_bytes().to_vec(),
            Payload::Structured { message, data } => {
                let mut obj = Map::new();
                if let Some(message) = message {
                    obj.insert("message".to_string(), Value::String(message.clone()));
                }
                if let Some(data) = data {
                    obj.insert("data".to_string(), data.clone());
                }
                Value::Object(obj).to_string().into_bytes()
            }
        }
    }

    /// Never fails: anything that is not a JSON object decodes as raw text.
    pub fn decode(bytes: &[u8]) -> Self {
        let text = String::from_utf8_lossy(bytes);
        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(mut obj)) => {
                let message = obj.remove("message").map(|m| match m {
                    Value::String(s) => s,
                    other => other.to_string(),
                });
                let data = obj.remove("data").filter(|d| !d.is_null());
                Payload::Structured { message, data }
            }
            _ => Payload::Raw(text.into_owned()),
        }
    }

    /// Parses user-supplied JSON into a structured payload.
    pub fn from_json_str(json: &str) -> Option<Self> {
        match serde_json::from_str::<Value>(json) {
            Ok(Value::Object(_)) => Some(Self::decode(json.as_bytes())),
            _ => None,
        }
    }
}

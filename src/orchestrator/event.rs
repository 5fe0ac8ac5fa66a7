use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Response,
}

/// Outbound message for the transport that owns `channel`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    pub channel: String,
    pub payload: Vec<String>,
}

impl Event {
    pub fn response(channel: impl Into<String>, payload: Vec<String>) -> Self {
        Self {
            kind: EventKind::Response,
            channel: channel.into(),
            payload,
        }
    }

    /// Single-slot response carrying a user-facing error
    pub fn error(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::response(channel, vec![message.into()])
    }
}

//! Chat message model and the JSON frames exchanged with the chat server.
//!
//! The server owns the message list. Every frame it sends is the complete,
//! ordered list; the client never merges or appends on its own.

use std::fmt;

use anyhow::Result;
use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Directive understood by the server as "drop every stored message".
pub const CLEAR_ALL: &str = "clearAll";

/// Long day, month name, year and a 12-hour clock, e.g. `19 October 2026, 09:05 AM`.
///
/// Fixed English wording; only the timezone comes from the client, not the locale.
const TIMESTAMP_FORMAT: &str = "%-d %B %Y, %I:%M %p";

/// A single chat entry as it travels over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub name: String,
    pub message: String,
    pub date: String,
    pub sending: bool,
}

impl ChatMessage {
    /// Build a message at submission time.
    ///
    /// The body is kept exactly as typed (no trimming) and the display date is
    /// fixed here, in the submitting client's timezone.
    pub fn compose<Tz: TimeZone>(author: &str, body: &str, now: &DateTime<Tz>) -> Self
    where
        Tz::Offset: fmt::Display,
    {
        Self {
            id: Uuid::new_v4().to_string(),
            name: author.to_string(),
            message: body.to_string(),
            date: format_timestamp(now),
            sending: true,
        }
    }

    /// The copy that is actually transmitted: never marked as pending.
    pub fn for_wire(&self) -> Self {
        Self {
            sending: false,
            ..self.clone()
        }
    }
}

pub fn format_timestamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: fmt::Display,
{
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Outbound frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientFrame {
    Message(ChatMessage),
    ClearAll,
}

impl ClientFrame {
    pub fn encode(&self) -> Result<String> {
        let text = match self {
            ClientFrame::Message(message) => serde_json::to_string(&message.for_wire())?,
            ClientFrame::ClearAll => serde_json::to_string(CLEAR_ALL)?,
        };
        Ok(text)
    }
}

/// Decode an inbound frame: the full, authoritative message list.
pub fn decode_server_frame(payload: &str) -> Result<Vec<ChatMessage>> {
    let messages: Vec<ChatMessage> = serde_json::from_str(payload)?;
    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 21, 5, 0).unwrap()
    }

    #[test]
    fn test_compose_keeps_raw_body_and_marks_pending() {
        let msg = ChatMessage::compose("Alice", "  hello  ", &fixed_time());
        assert_eq!(msg.name, "Alice");
        assert_eq!(msg.message, "  hello  ");
        assert!(msg.sending);
        assert!(Uuid::parse_str(&msg.id).is_ok());
    }

    #[test]
    fn test_compose_generates_unique_ids() {
        let now = fixed_time();
        let a = ChatMessage::compose("Alice", "hi", &now);
        let b = ChatMessage::compose("Alice", "hi", &now);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(&fixed_time()), "19 October 2026, 09:05 PM");
    }

    #[test]
    fn test_encode_message_forces_sending_false() {
        let msg = ChatMessage::compose("Alice", "hi", &fixed_time());
        let text = ClientFrame::Message(msg.clone()).encode().unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["id"], msg.id.as_str());
        assert_eq!(value["name"], "Alice");
        assert_eq!(value["message"], "hi");
        assert_eq!(value["date"], "19 October 2026, 09:05 PM");
        assert_eq!(value["sending"], false);
        assert_eq!(value.as_object().unwrap().len(), 5);
    }

    #[test]
    fn test_encode_clear_all_is_bare_json_string() {
        assert_eq!(ClientFrame::ClearAll.encode().unwrap(), "\"clearAll\"");
    }

    #[test]
    fn test_decode_server_frame_preserves_order() {
        let payload = r#"[
            {"id":"2","name":"Bob","message":"second","date":"d","sending":false},
            {"id":"1","name":"Ann","message":"first","date":"d","sending":true}
        ]"#;
        let list = decode_server_frame(payload).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, "2");
        assert_eq!(list[1].id, "1");
        assert!(list[1].sending);
    }

    #[test]
    fn test_decode_server_frame_rejects_non_array() {
        assert!(decode_server_frame("\"clearAll\"").is_err());
        assert!(decode_server_frame("not json").is_err());
        assert!(decode_server_frame(r#"[{"id":"1"}]"#).is_err());
    }
}

//! Realtime wire protocol shared by both channel variants.
//!
//! The socket channel exchanges JSON text frames `{ "type": ..., "data": ... }`
//! plus the bare liveness tokens [`PING_TOKEN`] and [`PONG_TOKEN`]. The
//! server-push channel carries the same events as named SSE events whose
//! payload may or may not be wrapped in a `data` envelope. Both are
//! normalized here to [`InboundEvent`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Liveness probe token, sent as a plain (non-JSON) text frame.
pub const PING_TOKEN: &str = "ping";
/// Reply to [`PING_TOKEN`].
pub const PONG_TOKEN: &str = "pong";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InboundEventKind {
    Connected,
    MerchantMessage,
    Ping,
    Pong,
}

impl InboundEventKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "connected" => Some(InboundEventKind::Connected),
            "merchant_message" => Some(InboundEventKind::MerchantMessage),
            "ping" => Some(InboundEventKind::Ping),
            "pong" => Some(InboundEventKind::Pong),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InboundEventKind::Connected => "connected",
            InboundEventKind::MerchantMessage => "merchant_message",
            InboundEventKind::Ping => "ping",
            InboundEventKind::Pong => "pong",
        }
    }

    /// Probes are answered inside the channel and never dispatched.
    pub fn is_probe(&self) -> bool {
        matches!(self, InboundEventKind::Ping | InboundEventKind::Pong)
    }
}

/// An event delivered by a realtime channel to its owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundEvent {
    #[serde(rename = "type")]
    pub kind: InboundEventKind,
    pub data: Value,
}

impl InboundEvent {
    /// Build an event; a missing or `null` payload becomes an empty object.
    pub fn new(kind: InboundEventKind, data: Value) -> Self {
        let data = match data {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };
        Self { kind, data }
    }

    /// Decode the payload of a `merchant_message` event.
    pub fn merchant_message(&self) -> Option<MerchantMessagePayload> {
        if self.kind != InboundEventKind::MerchantMessage {
            return None;
        }
        serde_json::from_value(self.data.clone()).ok()
    }
}

/// Payload of a `merchant_message` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MerchantMessagePayload {
    #[serde(alias = "text", alias = "content")]
    pub message: String,
    #[serde(default, alias = "senderName", skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    #[serde(default, alias = "createdAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    Ping,
    Pong,
}

/// A decoded socket frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Probe(Probe),
    Event(InboundEvent),
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("frame is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown event type `{0}`")]
    UnknownType(String),
}

#[derive(Deserialize)]
struct WireFrame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

/// Decode one socket text frame. Liveness tokens are recognised before any
/// JSON parsing is attempted.
pub fn parse_frame(text: &str) -> Result<Frame, ProtocolError> {
    match text.trim() {
        PING_TOKEN => return Ok(Frame::Probe(Probe::Ping)),
        PONG_TOKEN => return Ok(Frame::Probe(Probe::Pong)),
        _ => {}
    }

    let frame: WireFrame = serde_json::from_str(text)?;
    let kind =
        InboundEventKind::from_name(&frame.kind).ok_or(ProtocolError::UnknownType(frame.kind))?;

    Ok(match kind {
        InboundEventKind::Ping => Frame::Probe(Probe::Ping),
        InboundEventKind::Pong => Frame::Probe(Probe::Pong),
        _ => Frame::Event(InboundEvent::new(kind, frame.data)),
    })
}

/// Strip one `{ "data": {...} }` envelope if present, otherwise return the
/// value unchanged.
pub fn unwrap_payload(value: Value) -> Value {
    match value {
        Value::Object(mut map) => match map.remove("data") {
            Some(inner @ Value::Object(_)) => inner,
            Some(other) => {
                map.insert("data".to_string(), other);
                Value::Object(map)
            }
            None => Value::Object(map),
        },
        other => other,
    }
}

/// Normalize a named server-push event.
///
/// Returns `Ok(None)` for probe events. The default SSE event name
/// (`message`) is expected to carry a complete `{type, data}` frame.
pub fn parse_named_event(name: &str, data: &str) -> Result<Option<InboundEvent>, ProtocolError> {
    if name.is_empty() || name == "message" {
        return match parse_frame(data)? {
            Frame::Probe(_) => Ok(None),
            Frame::Event(event) => Ok(Some(event)),
        };
    }

    let kind =
        InboundEventKind::from_name(name).ok_or_else(|| ProtocolError::UnknownType(name.to_string()))?;
    if kind.is_probe() {
        return Ok(None);
    }

    let payload = if data.trim().is_empty() {
        Value::Null
    } else {
        unwrap_payload(serde_json::from_str(data)?)
    };
    Ok(Some(InboundEvent::new(kind, payload)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn liveness_tokens_skip_json() {
        assert_eq!(parse_frame("ping").unwrap(), Frame::Probe(Probe::Ping));
        assert_eq!(parse_frame("pong\n").unwrap(), Frame::Probe(Probe::Pong));
    }

    #[test]
    fn json_probe_frames_are_probes() {
        assert_eq!(
            parse_frame(r#"{"type":"ping"}"#).unwrap(),
            Frame::Probe(Probe::Ping)
        );
    }

    #[test]
    fn merchant_message_frame() {
        let frame = parse_frame(r#"{"type":"merchant_message","data":{"message":"Hi!"}}"#).unwrap();
        let Frame::Event(event) = frame else {
            panic!("expected event, got {frame:?}");
        };
        assert_eq!(event.kind, InboundEventKind::MerchantMessage);
        assert_eq!(event.merchant_message().unwrap().message, "Hi!");
    }

    #[test]
    fn missing_data_becomes_empty_object() {
        let Frame::Event(event) = parse_frame(r#"{"type":"connected"}"#).unwrap() else {
            panic!("expected event");
        };
        assert_eq!(event.data, json!({}));
    }

    #[test]
    fn malformed_and_unknown_frames_error() {
        assert!(matches!(parse_frame("{nope"), Err(ProtocolError::Json(_))));
        assert!(matches!(
            parse_frame(r#"{"type":"typing"}"#),
            Err(ProtocolError::UnknownType(t)) if t == "typing"
        ));
    }

    #[test]
    fn unwrap_payload_handles_both_shapes() {
        assert_eq!(
            unwrap_payload(json!({"data": {"message": "a"}})),
            json!({"message": "a"})
        );
        assert_eq!(unwrap_payload(json!({"message": "a"})), json!({"message": "a"}));
        assert_eq!(
            unwrap_payload(json!({"data": "scalar"})),
            json!({"data": "scalar"})
        );
    }

    #[test]
    fn named_events_normalize_to_the_same_shape() {
        let wrapped = parse_named_event("merchant_message", r#"{"data":{"text":"hello"}}"#)
            .unwrap()
            .unwrap();
        let raw = parse_named_event("merchant_message", r#"{"text":"hello"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(wrapped, raw);
        assert_eq!(raw.merchant_message().unwrap().message, "hello");
    }

    #[test]
    fn named_probe_and_default_events() {
        assert_eq!(parse_named_event("ping", "").unwrap(), None);
        let event = parse_named_event("message", r#"{"type":"connected","data":{"session_id":"s1"}}"#)
            .unwrap()
            .unwrap();
        assert_eq!(event.kind, InboundEventKind::Connected);
        let connected = parse_named_event("connected", "").unwrap().unwrap();
        assert_eq!(connected.data, json!({}));
    }
}

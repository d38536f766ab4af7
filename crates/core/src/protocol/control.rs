//! JSON control channel messages
//!
//! Control messages ride the transport's text frames, as opposed to terminal
//! output which rides binary frames. Inbound messages are decoded once at the
//! boundary into a closed tagged union; anything malformed or unrecognized is
//! dropped without mutating session state (control messages are best-effort).

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Inbound control message (relay → client)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    /// Remote geometry change to apply to the terminal surface
    Resize { cols: u16, rows: u16 },

    /// Metadata about the remote agent, drives history-replay suppression
    AgentMetadata { metadata: AgentMetadata },

    /// History replay finished; suppression can end early
    HistoryComplete,

    /// Relay-reported error, surfaced but not fatal to the transport
    Error { message: String },

    /// Remote session terminated; no reconnect
    SessionEnded,

    /// Recognized JSON with an unrecognized type tag
    #[serde(other)]
    Unknown,
}

impl ControlMessage {
    /// Parse one inbound text message
    ///
    /// Returns `None` for malformed JSON or known tags with missing/invalid
    /// fields; unknown tags parse to [`ControlMessage::Unknown`].
    pub fn parse(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }
}

/// Remote agent metadata carried by `agent_metadata`
///
/// Unknown fields are ignored so the relay can extend the payload freely.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct AgentMetadata {
    /// Declared history policy; `"replay"` enables suppression
    #[serde(default)]
    pub history_policy: Option<String>,

    /// Agent identity (e.g. `claude-code`)
    #[serde(default)]
    pub agent: Option<String>,

    /// Hosting application identity
    #[serde(default)]
    pub app: Option<String>,
}

/// Outbound control message (client → relay)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Attach to a session after the transport opens
    JoinSession { session_id: String },

    /// Keystroke data, with geometry included opportunistically
    Input {
        data: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        cols: Option<u16>,
        #[serde(skip_serializing_if = "Option::is_none")]
        rows: Option<u16>,
    },

    /// Local geometry change
    ResizeRequest { cols: u16, rows: u16 },
}

impl ClientMessage {
    /// Create a join message
    pub fn join_session(session_id: impl Into<String>) -> Self {
        Self::JoinSession {
            session_id: session_id.into(),
        }
    }

    /// Create an input message, attaching geometry when known
    pub fn input(data: impl Into<String>, geometry: Option<(u16, u16)>) -> Self {
        let (cols, rows) = match geometry {
            Some((c, r)) => (Some(c), Some(r)),
            None => (None, None),
        };
        Self::Input {
            data: data.into(),
            cols,
            rows,
        }
    }

    /// Create a resize request
    pub fn resize_request(cols: u16, rows: u16) -> Self {
        Self::ResizeRequest { cols, rows }
    }

    /// Serialize for the transport's text channel
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_resize() {
        let msg = ControlMessage::parse(r#"{"type":"resize","cols":120,"rows":40}"#).unwrap();
        assert_eq!(msg, ControlMessage::Resize { cols: 120, rows: 40 });
    }

    #[test]
    fn test_parse_agent_metadata() {
        let msg = ControlMessage::parse(
            r#"{"type":"agent_metadata","metadata":{"agent":"claude-code","history_policy":"replay","extra":true}}"#,
        )
        .unwrap();
        match msg {
            ControlMessage::AgentMetadata { metadata } => {
                assert_eq!(metadata.agent.as_deref(), Some("claude-code"));
                assert_eq!(metadata.history_policy.as_deref(), Some("replay"));
                assert_eq!(metadata.app, None);
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_parse_lifecycle_messages() {
        assert_eq!(
            ControlMessage::parse(r#"{"type":"history_complete"}"#),
            Some(ControlMessage::HistoryComplete)
        );
        assert_eq!(
            ControlMessage::parse(r#"{"type":"session_ended"}"#),
            Some(ControlMessage::SessionEnded)
        );
        assert_eq!(
            ControlMessage::parse(r#"{"type":"error","message":"boom"}"#),
            Some(ControlMessage::Error {
                message: "boom".to_string()
            })
        );
    }

    #[test]
    fn test_unknown_type_is_ignored_not_an_error() {
        assert_eq!(
            ControlMessage::parse(r#"{"type":"telemetry","cpu":0.5}"#),
            Some(ControlMessage::Unknown)
        );
    }

    #[test]
    fn test_malformed_messages_dropped() {
        // Not JSON at all.
        assert_eq!(ControlMessage::parse("not json"), None);
        // Known tag with missing fields.
        assert_eq!(ControlMessage::parse(r#"{"type":"resize","cols":80}"#), None);
        // Known tag with out-of-range geometry.
        assert_eq!(
            ControlMessage::parse(r#"{"type":"resize","cols":-1,"rows":10}"#),
            None
        );
        // No tag.
        assert_eq!(ControlMessage::parse(r#"{"cols":80,"rows":24}"#), None);
    }

    #[test]
    fn test_join_session_wire_format() {
        let json = ClientMessage::join_session("abc").to_json().unwrap();
        assert_eq!(json, r#"{"type":"join_session","session_id":"abc"}"#);
    }

    #[test]
    fn test_input_omits_unknown_geometry() {
        let json = ClientMessage::input("ls\n", None).to_json().unwrap();
        assert_eq!(json, r#"{"type":"input","data":"ls\n"}"#);

        let json = ClientMessage::input("x", Some((80, 24))).to_json().unwrap();
        assert_eq!(json, r#"{"type":"input","data":"x","cols":80,"rows":24}"#);
    }

    #[test]
    fn test_resize_request_wire_format() {
        let json = ClientMessage::resize_request(132, 43).to_json().unwrap();
        assert_eq!(json, r#"{"type":"resize_request","cols":132,"rows":43}"#);
    }
}

//! Wire-level payloads and inbound event classification.
//!
//! The board protocol is deliberately thin.  Clients send opaque text
//! payloads (in practice JSON drawing events such as `{"x":10,"y":20}`) and
//! the server stores and rebroadcasts them byte-for-byte.  The only input the
//! server interprets is the literal control token `CLEAR`.
//!
//! The three constants below are part of the interoperability contract with
//! existing browser clients and must not change, including whitespace.
//!
//! ```text
//! Client → Server:  <any text>   → stored + broadcast verbatim
//!                   CLEAR        → history reset, {"type":"CLEAR"} broadcast
//! Server → Client:  {"type":"INFO", "content":"Connection established."}
//!                   (sent once, directly, to a newly opened connection)
//! ```

/// The reserved control token.  Matched exactly and case-sensitively; it is
/// a bare string, not a JSON envelope.
pub const CLEAR_TOKEN: &str = "CLEAR";

/// Payload broadcast to every connection in place of [`CLEAR_TOKEN`].
pub const CLEAR_NOTIFICATION: &str = r#"{"type":"CLEAR"}"#;

/// Informational greeting sent to a connection as soon as it opens.
///
/// Note the space after the comma: existing clients receive exactly this
/// byte sequence.
pub const GREETING: &str = r#"{"type":"INFO", "content":"Connection established."}"#;

/// One inbound event, classified.
///
/// Events carry no sender identity; the broadcast is anonymous from the
/// recipients' point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventMessage {
    /// An opaque drawing/application payload.  Appended to history and
    /// broadcast unchanged.
    Data(String),
    /// The control token.  Resets history; [`CLEAR_NOTIFICATION`] is
    /// broadcast instead of the token itself.
    Clear,
}

impl EventMessage {
    /// Classifies a raw inbound payload.
    ///
    /// Only an exact match of [`CLEAR_TOKEN`] is a clear request.  `"clear"`,
    /// `" CLEAR"` and `{"type":"CLEAR"}` are all ordinary data.
    ///
    /// # Example
    ///
    /// ```rust
    /// use board_server::domain::EventMessage;
    ///
    /// assert_eq!(EventMessage::parse("CLEAR"), EventMessage::Clear);
    /// assert_eq!(
    ///     EventMessage::parse(r#"{"x":1,"y":1}"#),
    ///     EventMessage::Data(r#"{"x":1,"y":1}"#.to_string())
    /// );
    /// ```
    pub fn parse(raw: &str) -> Self {
        if raw == CLEAR_TOKEN {
            EventMessage::Clear
        } else {
            EventMessage::Data(raw.to_string())
        }
    }

    /// Returns the payload that is delivered to connections for this event.
    pub fn outbound_payload(&self) -> &str {
        match self {
            EventMessage::Data(payload) => payload,
            EventMessage::Clear => CLEAR_NOTIFICATION,
        }
    }

    /// Short type name for log lines, so payload bodies stay out of
    /// info-level output.
    pub fn kind(&self) -> &'static str {
        match self {
            EventMessage::Data(_) => "DATA",
            EventMessage::Clear => "CLEAR",
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_exact_token_is_clear() {
        assert_eq!(EventMessage::parse("CLEAR"), EventMessage::Clear);
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        // Arrange / Act
        let lower = EventMessage::parse("clear");
        let mixed = EventMessage::parse("Clear");

        // Assert: neither is the control token
        assert_eq!(lower, EventMessage::Data("clear".to_string()));
        assert_eq!(mixed, EventMessage::Data("Clear".to_string()));
    }

    #[test]
    fn test_parse_does_not_trim_whitespace() {
        assert_eq!(
            EventMessage::parse("CLEAR\n"),
            EventMessage::Data("CLEAR\n".to_string())
        );
        assert_eq!(
            EventMessage::parse(" CLEAR"),
            EventMessage::Data(" CLEAR".to_string())
        );
    }

    #[test]
    fn test_parse_json_envelope_is_data() {
        // A client echoing the clear notification back is not a clear request.
        let msg = EventMessage::parse(CLEAR_NOTIFICATION);
        assert_eq!(msg, EventMessage::Data(CLEAR_NOTIFICATION.to_string()));
    }

    #[test]
    fn test_parse_empty_string_is_data() {
        assert_eq!(EventMessage::parse(""), EventMessage::Data(String::new()));
    }

    #[test]
    fn test_outbound_payload_for_data_is_verbatim() {
        let raw = r#"{"x":10,"y":20}"#;
        assert_eq!(EventMessage::parse(raw).outbound_payload(), raw);
    }

    #[test]
    fn test_outbound_payload_for_clear_is_notification() {
        assert_eq!(
            EventMessage::Clear.outbound_payload(),
            r#"{"type":"CLEAR"}"#
        );
    }

    #[test]
    fn test_greeting_bytes_are_exact() {
        assert_eq!(
            GREETING,
            "{\"type\":\"INFO\", \"content\":\"Connection established.\"}"
        );
    }

    #[test]
    fn test_wire_notices_are_valid_json() {
        // Arrange / Act
        let greeting: serde_json::Value = serde_json::from_str(GREETING).unwrap();
        let clear: serde_json::Value = serde_json::from_str(CLEAR_NOTIFICATION).unwrap();

        // Assert
        assert_eq!(greeting["type"], "INFO");
        assert_eq!(greeting["content"], "Connection established.");
        assert_eq!(clear["type"], "CLEAR");
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(EventMessage::Clear.kind(), "CLEAR");
        assert_eq!(EventMessage::Data("x".into()).kind(), "DATA");
    }
}

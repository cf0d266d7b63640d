//! Outbound message assembly.
//!
//! Combines the DEC112 header set, a multipart body (location document,
//! plus the identity document on session start) and the free chat text
//! into one outbound unit. The free text is the message's primary content
//! and travels beside the multipart parts, per the transport's
//! instant-message contract.

use chrono::Local;

use super::{
    build_headers, identity_document, location_document, HeaderSet, MessageType,
    FALLBACK_GIVEN, FALLBACK_PHONE, FALLBACK_SURNAME, LOCATION_CONTENT_ID,
};
use crate::config::SessionConfig;
use crate::error::Result;

/// Timestamp format used inside the start/stop chat texts.
const TEXT_TIME_FORMAT: &str = "%m/%d/%Y, %I:%M:%S %p";

/// One part of the multipart message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyPart {
    /// MIME content type of the part.
    pub content_type: String,
    /// Optional `Content-ID` part header.
    pub content_id: Option<String>,
    /// Part content.
    pub content: String,
}

/// One assembled outbound chat message.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    /// Destination address (request target).
    pub target: String,
    /// Routing URI the transport should prefer over the target: the
    /// emergency service URN before the first reply, the remote's reply
    /// target thereafter. Absent when neither is known.
    pub route: Option<String>,
    /// Free chat text, the primary content.
    pub text: String,
    /// DEC112 message-type tag.
    pub message_type: MessageType,
    /// Protocol headers in wire order.
    pub headers: HeaderSet,
    /// Multipart body parts; container subtype is always `mixed`.
    pub parts: Vec<BodyPart>,
}

impl OutboundMessage {
    /// Multipart container subtype.
    pub fn multipart_subtype(&self) -> &'static str {
        "mixed"
    }
}

/// Assemble one outbound message for the given type and target.
///
/// Always attaches the PIDF-LO location part with the `Content-ID`
/// matching the `Geolocation` header reference; a session start
/// additionally carries the identity document.
pub fn assemble(
    config: &SessionConfig,
    text: &str,
    message_type: MessageType,
    target: &str,
    route: Option<&str>,
) -> Result<OutboundMessage> {
    let headers = build_headers(config, message_type);

    let entity = config.account_uri.as_deref().unwrap_or_default();
    let pidf = location_document(&config.lat, &config.lon, config.radius, entity)?;

    let mut parts = vec![BodyPart {
        content_type: "application/pidf+xml".to_string(),
        content_id: Some(LOCATION_CONTENT_ID.to_string()),
        content: pidf,
    }];

    if message_type == MessageType::Start {
        parts.push(BodyPart {
            content_type: "application/addCallSub+xml".to_string(),
            content_id: None,
            content: identity_document(config),
        });
    }

    Ok(OutboundMessage {
        target: target.to_string(),
        route: route.map(str::to_string),
        text: text.to_string(),
        message_type,
        headers,
        parts,
    })
}

/// Chat text announcing the session start.
pub fn start_text(config: &SessionConfig) -> String {
    format!(
        "{} {} (Phone: {}) has initiated an emergency chat at {}. \
         Current position is Lat: N {}; Lon: E {}",
        config.surname.as_deref().unwrap_or(FALLBACK_SURNAME),
        config.given.as_deref().unwrap_or(FALLBACK_GIVEN),
        config.phone.as_deref().unwrap_or(FALLBACK_PHONE),
        Local::now().format(TEXT_TIME_FORMAT),
        config.lat,
        config.lon,
    )
}

/// Chat text announcing the session end.
pub fn stop_text(config: &SessionConfig) -> String {
    format!(
        "{} {} (Phone: {}) has ended the emergency chat at {}.",
        config.surname.as_deref().unwrap_or(FALLBACK_SURNAME),
        config.given.as_deref().unwrap_or(FALLBACK_GIVEN),
        config.phone.as_deref().unwrap_or(FALLBACK_PHONE),
        Local::now().format(TEXT_TIME_FORMAT),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SessionConfig {
        let mut config = SessionConfig::default();
        config.lat = "48.2".to_string();
        config.lon = "16.3".to_string();
        config.account_uri = Some("sip:alice@example.org".to_string());
        config
    }

    #[test]
    fn test_start_message_carries_identity_part() {
        let msg =
            assemble(&config(), "help", MessageType::Start, "sip:112@example.org", None).unwrap();
        assert_eq!(msg.parts.len(), 2);
        assert_eq!(msg.parts[0].content_type, "application/pidf+xml");
        assert_eq!(msg.parts[0].content_id.as_deref(), Some(LOCATION_CONTENT_ID));
        assert_eq!(msg.parts[1].content_type, "application/addCallSub+xml");
        assert_eq!(msg.parts[1].content_id, None);
        assert_eq!(msg.multipart_subtype(), "mixed");
    }

    #[test]
    fn test_continuation_carries_location_only() {
        let msg =
            assemble(&config(), "still here", MessageType::Continue, "sip:x@y", None).unwrap();
        assert_eq!(msg.parts.len(), 1);
        assert_eq!(msg.parts[0].content_type, "application/pidf+xml");
        assert!(msg.parts[0].content.contains("<pos>48.2 16.3</pos>"));
    }

    #[test]
    fn test_text_rides_beside_parts() {
        let msg =
            assemble(&config(), "free text", MessageType::Continue, "sip:x@y", None).unwrap();
        assert_eq!(msg.text, "free text");
        assert!(msg.parts.iter().all(|p| !p.content.contains("free text")));
    }

    #[test]
    fn test_route_rides_on_message() {
        let msg = assemble(
            &config(),
            "help",
            MessageType::Start,
            "sip:112@example.org",
            Some("urn:service:sos.ecall"),
        )
        .unwrap();
        assert_eq!(msg.route.as_deref(), Some("urn:service:sos.ecall"));

        let msg = assemble(&config(), "help", MessageType::Start, "sip:112@example.org", None)
            .unwrap();
        assert_eq!(msg.route, None);
    }

    #[test]
    fn test_start_text_fallback_identity() {
        let text = start_text(&config());
        assert!(text.starts_with("Dow John (Phone: 0012345555555) has initiated"));
        assert!(text.ends_with("Current position is Lat: N 48.2; Lon: E 16.3"));
    }

    #[test]
    fn test_stop_text_shape() {
        let text = stop_text(&config());
        assert!(text.starts_with("Dow John (Phone: 0012345555555) has ended"));
        assert!(text.ends_with("."));
    }
}

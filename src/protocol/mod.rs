//! DEC112 wire contract: constants, message typing and the
//! header/document/body construction rules.
//!
//! The DEC112 profile rides on a generic instant-messaging transport and
//! correlates a chat session through `Call-Info` headers carrying
//! `urn:dec112:uid:...` values, each tagged with a fixed `purpose`
//! parameter. A session is a sequence of typed messages:
//!
//! | Code | Meaning              | Extra body part          |
//! |------|----------------------|--------------------------|
//! | 21   | session start        | identity document        |
//! | 22   | continuation         | —                        |
//! | 23   | session stop         | —                        |
//! | 19   | remote teardown (inbound only, via `Call-Info`) | — |
//!
//! Every outbound message carries a PIDF-LO location document referenced
//! by a fixed `Geolocation` content id. These shapes must stay
//! byte-compatible with existing DEC112-speaking endpoints.

pub mod documents;
pub mod headers;
pub mod inbound;
pub mod message;

pub use documents::{identity_document, location_document};
pub use headers::{build_headers, HeaderSet};
pub use inbound::InboundSignal;
pub use message::{assemble, start_text, stop_text, BodyPart, OutboundMessage};

/// `purpose` tag of the session call-id `Call-Info` entry.
pub const PURPOSE_CALL_ID: &str = "dec112-CallId";
/// `purpose` tag of the message-id `Call-Info` entry.
pub const PURPOSE_MESSAGE_ID: &str = "dec112-MessageId";
/// `purpose` tag of the device-id `Call-Info` entry.
pub const PURPOSE_DEVICE_ID: &str = "dec112-DeviceId";
/// `purpose` tag of the registration-id `Call-Info` entry.
pub const PURPOSE_REG_ID: &str = "dec112-RegID";
/// `purpose` tag of the subscriber-info dereference `Call-Info` entry.
pub const PURPOSE_SUBSCRIBER_INFO: &str = "dec112-SubscriberInfo";
/// `purpose` tag of the message-type `Call-Info` entry.
pub const PURPOSE_MESSAGE_TYPE: &str = "dec112-MessageTyp";
/// `purpose` tag of the device-entity dereference `Call-Info` entry.
pub const PURPOSE_DID: &str = "EmergencyCallData.DID";

/// Name of the optional test marker header.
pub const TEST_HEADER_NAME: &str = "X-DEC112-Test";
/// Value of the optional test marker header.
pub const TEST_HEADER_VALUE: &str = "True";

/// Token inside an inbound `Call-Info` message-type value that signals a
/// remote-initiated session teardown.
pub const MSGTYPE_TEARDOWN: &str = "msgtype:19";

/// Service suffix of every `urn:dec112:uid:...` identifier.
pub const URN_SERVICE: &str = "service.dec112.at";

/// Fixed `Geolocation` content-id reference.
pub const GEOLOCATION_CID: &str = "<cid:DebhEr9UuGigk4nr@dec112.app>";
/// `Content-ID` of the location body part; matches [`GEOLOCATION_CID`].
pub const LOCATION_CONTENT_ID: &str = "<DebhEr9UuGigk4nr@dec112.app>";

/// Identity fallbacks used when a person field is not configured.
pub const FALLBACK_SURNAME: &str = "Dow";
/// Given-name fallback.
pub const FALLBACK_GIVEN: &str = "John";
/// Phone fallback.
pub const FALLBACK_PHONE: &str = "0012345555555";
/// Email fallback.
pub const FALLBACK_EMAIL: &str = "john.dow@mail.cc";
/// Street fallback.
pub const FALLBACK_STREET: &str = "Main Street 123";
/// Locality fallback.
pub const FALLBACK_LOCALITY: &str = "Somewhere";
/// Postal-code fallback.
pub const FALLBACK_CODE: &str = "2323";

/// Tagged message kind of an outbound chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    /// Session start (code 21); carries the identity document.
    Start = 21,
    /// Continuation (code 22).
    Continue = 22,
    /// Session stop (code 23).
    Stop = 23,
}

impl MessageType {
    /// Numeric DEC112 message-type code.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Descriptive name for logging.
    pub fn name(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Continue => "continuation",
            Self::Stop => "stop",
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

/// Expand `${name}` placeholders in one pass.
///
/// The resolver returns the replacement for a placeholder name; unknown
/// placeholders are reproduced verbatim. Used for the identity document
/// template and the subscriber-info reference template.
pub(crate) fn expand_template<'a, F>(template: &str, resolve: F) -> String
where
    F: Fn(&str) -> Option<&'a str>,
{
    let mut out = String::with_capacity(template.len() + 64);
    let mut rest = template;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 2..];
        match tail.find('}') {
            Some(end) => {
                let key = &tail[..end];
                match resolve(key) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push_str("${");
                        out.push_str(key);
                        out.push('}');
                    },
                }
                rest = &tail[end + 1..];
            },
            None => {
                // Unterminated placeholder, keep literally.
                out.push_str(&rest[start..]);
                rest = "";
            },
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_type_codes() {
        assert_eq!(MessageType::Start.code(), 21);
        assert_eq!(MessageType::Continue.code(), 22);
        assert_eq!(MessageType::Stop.code(), 23);
    }

    #[test]
    fn test_expand_template() {
        let out = expand_template("a ${x} b ${y}", |key| match key {
            "x" => Some("1"),
            "y" => Some("2"),
            _ => None,
        });
        assert_eq!(out, "a 1 b 2");
    }

    #[test]
    fn test_expand_template_unknown_key_kept() {
        let out = expand_template("keep ${unknown} as-is", |_| None);
        assert_eq!(out, "keep ${unknown} as-is");
    }

    #[test]
    fn test_expand_template_repeated_key() {
        let out = expand_template("${n} ${n}", |_| Some("x"));
        assert_eq!(out, "x x");
    }
}

//! DEC112 protocol header construction.
//!
//! The header set is an ordered list; several entries legally share the
//! `Call-Info` name and must be kept as separate entries in insertion
//! order, never merged.

use chrono::Local;

use super::{
    MessageType, GEOLOCATION_CID, PURPOSE_DID, PURPOSE_MESSAGE_ID, PURPOSE_MESSAGE_TYPE,
    PURPOSE_REG_ID, TEST_HEADER_NAME, TEST_HEADER_VALUE, URN_SERVICE,
};
use crate::config::SessionConfig;

/// Ordered header list with duplicate names preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSet {
    entries: Vec<(String, String)>,
}

impl HeaderSet {
    /// Empty header set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one header entry, preserving insertion order.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// First value under `name` (case-insensitive), if any.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.all(name).next()
    }

    /// All values under `name` (case-insensitive), in insertion order.
    pub fn all<'a, 'b>(&'a self, name: &'b str) -> impl Iterator<Item = &'a str> + use<'a, 'b> {
        self.entries
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no entry is present.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Build the DEC112 header set for one outbound message.
///
/// `Call-Info` entries appear in a fixed order: call-id, device-id,
/// subscriber-info URL and registration/device-entity ids are emitted only
/// when configured; the message-type and message-id entries are always
/// present. The message-id embeds a minute-resolution timestamp, so two
/// messages sent within the same minute share a message-id; receivers
/// correlate on the call-id, which stays unique per session.
pub fn build_headers(config: &SessionConfig, message_type: MessageType) -> HeaderSet {
    let mut headers = HeaderSet::new();

    if let Some(call_id) = &config.call_id {
        headers.push("Call-Info", call_id);
    }
    if let Some(device_id) = &config.device_id {
        headers.push("Call-Info", device_id);
    }
    if let Some(subscriber_info) = &config.subscriber_info {
        headers.push("Call-Info", subscriber_info);
    }
    if let Some(rid) = &config.registration_id {
        headers.push(
            "Call-Info",
            format!("<urn:dec112:uid:regid:{rid}:{URN_SERVICE}>;purpose={PURPOSE_REG_ID}"),
        );
    }
    if let Some(dei) = &config.device_entity {
        headers.push("Call-Info", format!("<{dei}>;purpose={PURPOSE_DID}"));
    }

    headers.push(
        "Call-Info",
        format!(
            "<urn:dec112:uid:msgtype:{}:{URN_SERVICE}>;purpose={PURPOSE_MESSAGE_TYPE}",
            message_type.code()
        ),
    );

    let stamp = Local::now().format("%Y%m%d%H%M");
    headers.push(
        "Call-Info",
        format!("<urn:dec112:uid:msgid:{stamp}:{URN_SERVICE}>;purpose={PURPOSE_MESSAGE_ID}"),
    );

    headers.push("Geolocation-Routing", "yes");
    headers.push("Geolocation", GEOLOCATION_CID);

    if config.test_header {
        headers.push(TEST_HEADER_NAME, TEST_HEADER_VALUE);
    }

    headers
}

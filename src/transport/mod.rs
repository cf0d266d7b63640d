//! Transport collaborator contract.
//!
//! The engine treats the SIP-like instant-messaging transport as an
//! external collaborator: it asks for registration, hands over assembled
//! messages, and receives asynchronous notifications back through the
//! session event channel. Connection establishment, retransmission and
//! authentication challenges are the transport's business.

pub mod loopback;

pub use loopback::LoopbackTransport;

use url::Url;

use crate::error::Result;
use crate::protocol::OutboundMessage;

/// Transport kind selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransportKind {
    /// Plain TCP (default).
    #[default]
    Tcp,
    /// TLS.
    Tls,
}

impl TransportKind {
    /// Descriptive name for logging.
    pub fn name(self) -> &'static str {
        match self {
            Self::Tcp => "TCP",
            Self::Tls => "TLS",
        }
    }
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Account identity handed to the transport for registration.
#[derive(Debug, Clone, Default)]
pub struct AccountIdentity {
    /// Account URI (`sip:user@domain`).
    pub uri: String,
    /// Credential realm.
    pub domain: String,
    /// Credential user name.
    pub user: String,
    /// Credential password.
    pub password: String,
    /// Registrar / outbound proxy URI.
    pub proxy: String,
}

/// Local queuing status of one send attempt.
///
/// The transport guarantees at most the attempt, not delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    /// Accepted for transmission.
    Queued,
    /// Rejected locally.
    Failed,
}

impl SendStatus {
    /// True when the message was accepted for transmission.
    pub fn is_success(self) -> bool {
        self == Self::Queued
    }
}

/// Pluggable instant-messaging transport.
///
/// Implementations deliver their asynchronous notifications
/// (registration changed, message received) as [`SessionEvent`]s over
/// the channel handed to them at construction.
///
/// [`SessionEvent`]: crate::session::SessionEvent
pub trait Transport: Send + Sync {
    /// Start registration for the account. The outcome arrives later as
    /// a `RegistrationChanged` event.
    fn register(&self, account: &AccountIdentity) -> Result<()>;

    /// Queue one assembled message. Returns the local queuing status
    /// only.
    fn send_message(&self, message: &OutboundMessage) -> Result<SendStatus>;

    /// Syntactic validation of a target address before any send.
    fn verify_address(&self, uri: &str) -> bool {
        verify_sip_uri(uri)
    }
}

/// Check that `uri` parses and carries a SIP scheme.
pub fn verify_sip_uri(uri: &str) -> bool {
    match Url::parse(uri) {
        Ok(url) => matches!(url.scheme(), "sip" | "sips") && !url.path().is_empty(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_sip_uri() {
        assert!(verify_sip_uri("sip:112@service.dec112.at"));
        assert!(verify_sip_uri("sips:center@example.org;transport=tls"));
        assert!(!verify_sip_uri("http://example.org"));
        assert!(!verify_sip_uri("not a uri"));
        assert!(!verify_sip_uri(""));
    }

    #[test]
    fn test_send_status() {
        assert!(SendStatus::Queued.is_success());
        assert!(!SendStatus::Failed.is_success());
    }

    #[test]
    fn test_transport_kind_names() {
        assert_eq!(TransportKind::default(), TransportKind::Tcp);
        assert_eq!(TransportKind::Tls.to_string(), "TLS");
    }
}

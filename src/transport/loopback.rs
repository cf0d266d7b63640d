//! In-process loopback transport.
//!
//! Acknowledges registration immediately and answers every outbound
//! message with a synthetic reply carrying a `Reply-To` header, which is
//! enough to exercise the whole session state machine without a SIP
//! peer. Used by the integration tests and for local dry runs.

use tracing::debug;

use super::{AccountIdentity, SendStatus, Transport, TransportKind};
use crate::error::{ChatError, Result};
use crate::protocol::{HeaderSet, InboundSignal, OutboundMessage, PURPOSE_MESSAGE_TYPE, URN_SERVICE};
use crate::session::{EventSender, SessionEvent};

/// Loopback transport echoing replies to the session.
#[derive(Debug, Clone)]
pub struct LoopbackTransport {
    events: EventSender,
    reply_to: String,
    kind: TransportKind,
}

impl LoopbackTransport {
    /// Default synthetic reply target.
    pub const DEFAULT_REPLY_TO: &'static str = "sip:loopback@localhost";

    /// Create a loopback transport feeding the given event channel.
    ///
    /// The kind has no wire effect here, but it is recorded and logged
    /// so the selection is observable end to end.
    pub fn new(events: EventSender, kind: TransportKind) -> Self {
        Self {
            events,
            reply_to: Self::DEFAULT_REPLY_TO.to_string(),
            kind,
        }
    }

    /// Selected transport kind.
    pub fn kind(&self) -> TransportKind {
        self.kind
    }

    /// Use a custom `Reply-To` value in the synthetic replies.
    pub fn with_reply_to(mut self, reply_to: impl Into<String>) -> Self {
        self.reply_to = reply_to.into();
        self
    }

    fn emit(&self, event: SessionEvent) -> Result<()> {
        self.events
            .send(event)
            .map_err(|_| ChatError::Transport("event channel closed".to_string()))
    }
}

impl Transport for LoopbackTransport {
    fn register(&self, account: &AccountIdentity) -> Result<()> {
        debug!(uri = %account.uri, kind = %self.kind, "loopback registration");
        self.emit(SessionEvent::RegistrationChanged(true))
    }

    fn send_message(&self, message: &OutboundMessage) -> Result<SendStatus> {
        let mut headers = HeaderSet::new();
        headers.push("Reply-To", &self.reply_to);
        headers.push(
            "Call-Info",
            format!(
                "<urn:dec112:uid:msgtype:{}:{URN_SERVICE}>;purpose={PURPOSE_MESSAGE_TYPE}",
                message.message_type.code()
            ),
        );
        self.emit(SessionEvent::MessageReceived(InboundSignal {
            from: self.reply_to.clone(),
            body: message.text.clone(),
            headers,
        }))?;
        Ok(SendStatus::Queued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::protocol::{assemble, MessageType};
    use crate::session::event_channel;

    #[tokio::test]
    async fn test_loopback_echoes_with_reply_to() {
        let (tx, mut rx) = event_channel();
        let transport = LoopbackTransport::new(tx, TransportKind::Tcp);

        transport.register(&AccountIdentity::default()).unwrap();
        match rx.recv().await.unwrap() {
            SessionEvent::RegistrationChanged(ok) => assert!(ok),
            other => panic!("unexpected event: {other:?}"),
        }

        let mut config = SessionConfig::default();
        config.lat = "48.2".into();
        config.lon = "16.3".into();
        let message = assemble(&config, "hello", MessageType::Continue, "sip:x@y", None).unwrap();
        let status = transport.send_message(&message).unwrap();
        assert!(status.is_success());

        match rx.recv().await.unwrap() {
            SessionEvent::MessageReceived(signal) => {
                assert_eq!(signal.body, "hello");
                assert_eq!(
                    signal.headers.first("Reply-To"),
                    Some(LoopbackTransport::DEFAULT_REPLY_TO)
                );
            },
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_loopback_closed_channel_is_transport_error() {
        let (tx, rx) = event_channel();
        drop(rx);
        let transport = LoopbackTransport::new(tx, TransportKind::Tcp);
        assert!(transport.register(&AccountIdentity::default()).is_err());
    }

    #[tokio::test]
    async fn test_loopback_records_transport_kind() {
        let (tx, _rx) = event_channel();
        let transport = LoopbackTransport::new(tx, TransportKind::Tls);
        assert_eq!(transport.kind(), TransportKind::Tls);
    }
}

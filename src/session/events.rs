//! Callback-to-controller event bridge.
//!
//! The transport delivers notifications (registration changed, message
//! received) from its own context. Each notification travels as one
//! message over an unbounded channel; the controller drains the channel
//! and applies events to [`SessionShared`] on its own task, so no state
//! is mutated from the transport's context. Bounded waits are
//! deadline-guarded receives.

use tokio::sync::mpsc;
use tokio::time::{timeout, Instant};

use std::time::Duration;

use super::SessionShared;
use crate::config::SessionConfig;
use crate::protocol::{inbound, InboundSignal};
use tracing::{debug, info};

/// One transport notification.
#[derive(Debug)]
pub enum SessionEvent {
    /// Registration state changed (true = registered).
    RegistrationChanged(bool),
    /// An instant message arrived.
    MessageReceived(InboundSignal),
}

/// Sending half handed to the transport at construction.
pub type EventSender = mpsc::UnboundedSender<SessionEvent>;
/// Receiving half owned by the supervisor.
pub type EventReceiver = mpsc::UnboundedReceiver<SessionEvent>;

/// Create the notification channel.
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Bridges asynchronous transport notifications into bounded waits.
#[derive(Debug)]
pub struct Supervisor {
    rx: EventReceiver,
}

impl Supervisor {
    /// Wrap the receiving half of the notification channel.
    pub fn new(rx: EventReceiver) -> Self {
        Self { rx }
    }

    /// Apply one event to the session state.
    pub fn dispatch(config: &SessionConfig, shared: &mut SessionShared, event: SessionEvent) {
        match event {
            SessionEvent::RegistrationChanged(ok) => {
                info!(registered = ok, "registration state changed");
                shared.registered = ok;
            },
            SessionEvent::MessageReceived(signal) => {
                inbound::apply(config, shared, &signal);
            },
        }
    }

    /// Apply all pending events without blocking.
    pub fn drain(&mut self, config: &SessionConfig, shared: &mut SessionShared) {
        while let Ok(event) = self.rx.try_recv() {
            Self::dispatch(config, shared, event);
        }
    }

    /// Wait until `pred` holds or the deadline expires.
    ///
    /// Returns whether the predicate held. Expiry is not cancellation:
    /// the caller records a timeout flag and proceeds with degraded
    /// guarantees. A timed-out wait is never retried.
    pub async fn wait_for<F>(
        &mut self,
        config: &SessionConfig,
        shared: &mut SessionShared,
        deadline: Duration,
        pred: F,
    ) -> bool
    where
        F: Fn(&SessionShared) -> bool,
    {
        let end = Instant::now() + deadline;
        self.drain(config, shared);

        while !pred(shared) {
            let now = Instant::now();
            if now >= end {
                debug!(?deadline, "bounded wait expired");
                return false;
            }
            match timeout(end - now, self.rx.recv()).await {
                Ok(Some(event)) => Self::dispatch(config, shared, event),
                // Channel closed: no more notifications will ever come.
                Ok(None) => return pred(shared),
                Err(_) => {
                    debug!(?deadline, "bounded wait expired");
                    return false;
                },
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::HeaderSet;

    fn signal(body: &str) -> InboundSignal {
        InboundSignal {
            from: "sip:remote@example.org".to_string(),
            body: body.to_string(),
            headers: HeaderSet::new(),
        }
    }

    #[tokio::test]
    async fn test_wait_for_unblocks_on_event() {
        let config = SessionConfig::default();
        let mut shared = SessionShared::default();
        let (tx, rx) = event_channel();
        let mut supervisor = Supervisor::new(rx);

        tx.send(SessionEvent::RegistrationChanged(true)).unwrap();
        let ok = supervisor
            .wait_for(&config, &mut shared, Duration::from_millis(200), |s| {
                s.registered
            })
            .await;
        assert!(ok);
        assert!(shared.registered);
    }

    #[tokio::test]
    async fn test_wait_for_deadline_expiry() {
        let config = SessionConfig::default();
        let mut shared = SessionShared::default();
        let (_tx, rx) = event_channel();
        let mut supervisor = Supervisor::new(rx);

        let ok = supervisor
            .wait_for(&config, &mut shared, Duration::from_millis(20), |s| {
                s.registered
            })
            .await;
        assert!(!ok);
        assert!(!shared.registered);
    }

    #[tokio::test]
    async fn test_drain_applies_pending_events() {
        let config = SessionConfig::default();
        let mut shared = SessionShared::default();
        let (tx, rx) = event_channel();
        let mut supervisor = Supervisor::new(rx);

        tx.send(SessionEvent::RegistrationChanged(true)).unwrap();
        tx.send(SessionEvent::MessageReceived(signal("hello"))).unwrap();
        supervisor.drain(&config, &mut shared);

        assert!(shared.registered);
        assert!(shared.message_received);
    }

    #[tokio::test]
    async fn test_wait_for_channel_close() {
        let config = SessionConfig::default();
        let mut shared = SessionShared::default();
        let (tx, rx) = event_channel();
        let mut supervisor = Supervisor::new(rx);
        drop(tx);

        let ok = supervisor
            .wait_for(&config, &mut shared, Duration::from_secs(5), |s| {
                s.message_received
            })
            .await;
        assert!(!ok);
    }
}

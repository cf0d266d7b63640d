//! The session controller state machine.
//!
//! Drives one emergency chat end to end: registration wait, start
//! message, reply wait, one of the three messaging modes, stop message.
//! Timed-out waits are recorded in the `ErrorFlags` bitmask and degrade
//! the session; only document construction and transport setup failures
//! abort.

use std::path::Path;
use std::time::Duration;

use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{info, warn};

use super::{
    wait_deadline, EventReceiver, SessionMode, SessionShared, SessionState, Supervisor,
};
use crate::config::SessionConfig;
use crate::error::{ChatError, ErrorFlags, Result};
use crate::protocol::{assemble, start_text, stop_text, MessageType};
use crate::transport::{AccountIdentity, Transport};

/// Orchestrates one chat session over a transport.
pub struct SessionController<T: Transport> {
    config: SessionConfig,
    transport: T,
    supervisor: Supervisor,
    shared: SessionShared,
    state: SessionState,
    deadline: Duration,
    route: Option<String>,
}

impl<T: Transport> SessionController<T> {
    /// Create a controller over the transport and its notification
    /// channel.
    pub fn new(config: SessionConfig, transport: T, events: EventReceiver) -> Self {
        Self {
            config,
            transport,
            supervisor: Supervisor::new(events),
            shared: SessionShared::default(),
            state: SessionState::Created,
            deadline: wait_deadline(),
            route: None,
        }
    }

    /// Override the bounded-wait deadline (test hook).
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Route outbound messages through the emergency service URN until
    /// the remote's reply target takes over.
    pub fn with_service(mut self, service: Option<String>) -> Self {
        self.route = service;
        self
    }

    /// Current controller state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Run the session against `target`, returning the accumulated
    /// degradation flags as the process outcome.
    pub async fn run(mut self, target: &str, mode: SessionMode) -> Result<ErrorFlags> {
        if !self.transport.verify_address(target) {
            return Err(ChatError::InvalidTarget(target.to_string()));
        }

        self.state = SessionState::Registering;
        let account = self.account();
        self.transport.register(&account)?;

        let registered = self
            .supervisor
            .wait_for(&self.config, &mut self.shared, self.deadline, |s| {
                s.registered
            })
            .await;
        if !registered {
            warn!("timeout on registration request");
        }
        if !self.shared.registered {
            self.shared.flags.set(ErrorFlags::REGISTRATION_FAILED);
            warn!("registration failed");
            self.state = SessionState::Terminated;
            return Ok(self.shared.flags);
        }

        // The first exchange is validated unless a message file drives
        // the session (file lines arm validation per line instead).
        let file_driven = matches!(mode, SessionMode::FileDriven { .. });
        if !file_driven && self.config.expected_reply.is_some() {
            self.shared.validation_armed = true;
        }

        self.state = SessionState::AwaitingFirstReply;
        let text = start_text(&self.config);
        self.shared.message_received = false;
        self.send(&text, MessageType::Start, target)?;

        let replied = self
            .supervisor
            .wait_for(&self.config, &mut self.shared, self.deadline, |s| {
                s.reply_target.is_some()
            })
            .await;
        if !replied {
            warn!("timeout on first request message");
        }
        let Some(reply_target) = self.shared.reply_target.clone() else {
            self.shared.flags.set(ErrorFlags::NO_REPLY);
            warn!("Reply-To header missing");
            self.state = SessionState::Terminated;
            return Ok(self.shared.flags);
        };
        // From here on the remote's reply target takes over routing.
        self.route = Some(reply_target.clone());

        self.state = SessionState::Messaging;
        match mode {
            SessionMode::Automatic { count, interval } => {
                self.run_automatic(&reply_target, &text, count, interval)
                    .await?;
            },
            SessionMode::FileDriven { path } => {
                self.run_file_driven(&reply_target, &path).await?;
            },
            SessionMode::Interactive { lines } => {
                self.run_interactive(&reply_target, lines).await?;
            },
        }

        self.state = SessionState::Terminated;
        info!(flags = %self.shared.flags, "session terminated");
        Ok(self.shared.flags)
    }

    /// Timed re-sends: `count − 1` continuations spaced by `interval`,
    /// then one stop message.
    async fn run_automatic(
        &mut self,
        target: &str,
        text: &str,
        count: u32,
        interval: Duration,
    ) -> Result<()> {
        if count > 1 {
            for i in 2..=count {
                sleep(interval).await;
                self.supervisor.drain(&self.config, &mut self.shared);
                info!(n = i, "sending continuation");
                self.shared.message_received = false;
                self.send(text, MessageType::Continue, target)?;
            }
            sleep(interval).await;
        }
        self.shared.message_received = false;
        self.send(text, MessageType::Stop, target)?;
        Ok(())
    }

    /// File-driven batch sending with per-line validation marker and a
    /// bounded acknowledgement wait after each send.
    async fn run_file_driven(&mut self, target: &str, path: &Path) -> Result<()> {
        let file = tokio::fs::File::open(path).await?;
        let reader = tokio::io::BufReader::new(file);
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await? {
            if line.len() < 2 {
                continue;
            }
            let mut text = line;
            if text.ends_with('*') {
                // Marker arms validation for this single exchange.
                self.shared.validation_armed = true;
                text.pop();
                text.push(' ');
            }
            info!(text = %text, "sending message from file");
            self.shared.message_received = false;
            self.send(&text, MessageType::Continue, target)?;

            let acked = self
                .supervisor
                .wait_for(&self.config, &mut self.shared, self.deadline, |s| {
                    s.message_received
                })
                .await;
            if !acked {
                self.shared.flags.set(ErrorFlags::TIMEOUT);
                warn!("timeout on remote message request");
            }
        }

        let stop = stop_text(&self.config);
        self.send(&stop, MessageType::Stop, target)?;
        Ok(())
    }

    /// Interactive line-by-line sending until the exit keyword or a
    /// remote teardown.
    ///
    /// A remote teardown ends the loop without a stop message (the
    /// remote is already gone); a user-typed exit sends one.
    async fn run_interactive(
        &mut self,
        target: &str,
        mut lines: mpsc::Receiver<String>,
    ) -> Result<()> {
        while let Some(line) = lines.recv().await {
            self.supervisor.drain(&self.config, &mut self.shared);
            if !self.shared.registered {
                info!("remote close, exiting");
                break;
            }
            if line.contains("exit") {
                let stop = stop_text(&self.config);
                self.send(&stop, MessageType::Stop, target)?;
                break;
            }
            self.send(&line, MessageType::Continue, target)?;
        }
        Ok(())
    }

    /// Assemble and hand one message to the transport.
    ///
    /// Send failures are logged and do not set an error flag; only the
    /// absence of the expected follow-on effect does, via the bounded
    /// waits.
    fn send(&self, text: &str, message_type: MessageType, target: &str) -> Result<()> {
        let message = assemble(&self.config, text, message_type, target, self.route.as_deref())?;
        info!(kind = %message_type, target, "MESSAGE sending");
        match self.transport.send_message(&message) {
            Ok(status) if status.is_success() => {},
            Ok(status) => warn!(?status, "MESSAGE sending failed"),
            Err(e) => warn!(error = %e, "MESSAGE sending failed"),
        }
        Ok(())
    }

    fn account(&self) -> AccountIdentity {
        AccountIdentity {
            uri: self.config.account_uri.clone().unwrap_or_default(),
            domain: self.config.domain.clone().unwrap_or_default(),
            user: self.config.user.clone().unwrap_or_default(),
            password: self.config.password.clone().unwrap_or_default(),
            proxy: self.config.proxy.clone().unwrap_or_default(),
        }
    }
}

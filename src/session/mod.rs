//! Session lifecycle: state machine, runtime state and the controller
//! that drives a chat from registration to termination.
//!
//! # State Machine
//!
//! ```text
//!  [Created] ──start──> [Registering] ──registered / bound expired──>
//!  [AwaitingFirstReply] ──reply target──> [Messaging] ──stop──> [Terminated]
//!                        └─no reply────────────────────────────> [Terminated]
//! ```
//!
//! The messaging phase runs exactly one of three mutually exclusive
//! modes: timed automatic re-sends, file-driven batch sending, or
//! interactive line-by-line sending.

pub mod controller;
pub mod events;

pub use controller::SessionController;
pub use events::{event_channel, EventReceiver, EventSender, SessionEvent, Supervisor};

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::error::ErrorFlags;

/// Interval of one bounded-wait slice.
pub const POLL_INTERVAL: Duration = Duration::from_millis(1000);
/// Maximum number of slices per bounded wait.
pub const POLL_MAX_COUNT: u32 = 32;

/// Total deadline of one bounded wait (interval × count).
pub fn wait_deadline() -> Duration {
    POLL_INTERVAL * POLL_MAX_COUNT
}

/// Session controller states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Not started yet.
    Created,
    /// Registration issued, waiting for the registered flag.
    Registering,
    /// Start message sent, waiting for a reply target.
    AwaitingFirstReply,
    /// One of the three messaging modes is running.
    Messaging,
    /// Session over; `ErrorFlags` are final.
    Terminated,
}

/// Messaging phase selection.
#[derive(Debug)]
pub enum SessionMode {
    /// `count − 1` timed continuations followed by one stop message.
    Automatic {
        /// Total message count including the start message.
        count: u32,
        /// Spacing between sends.
        interval: Duration,
    },
    /// Each usable line of a text file becomes one continuation.
    FileDriven {
        /// Path to the message source file.
        path: PathBuf,
    },
    /// Lines from an external input source until the exit keyword.
    Interactive {
        /// Line source; closing the channel ends the session.
        lines: mpsc::Receiver<String>,
    },
}

/// Runtime session state, owned by the controller.
///
/// All mutation happens on the controller task while draining the event
/// channel; the transport's notification context never touches this
/// record directly.
#[derive(Debug, Default)]
pub struct SessionShared {
    /// Registration currently valid.
    pub registered: bool,
    /// Reply target extracted from the last inbound `Reply-To`.
    pub reply_target: Option<String>,
    /// An inbound message arrived since the mark was last cleared.
    pub message_received: bool,
    /// Validation armed for the next inbound message.
    pub validation_armed: bool,
    /// Accumulated degradations.
    pub flags: ErrorFlags,
}

//! # DEC112 Emergency-Chat Session Engine
//!
//! Implements the DEC112 emergency-services messaging profile over a
//! generic SIP-like instant-messaging transport: a sequence of tagged
//! messages (start, continuation, stop) carrying machine-readable caller
//! identity and location documents, correlated via custom `Call-Info`
//! headers, with reply routing and bounded-time failure detection.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                 SessionController                    │
//! │   Created → Registering → AwaitingFirstReply →       │
//! │   {Automatic | FileDriven | Interactive} → Terminated│
//! └───────┬───────────────────────────────▲──────────────┘
//!         │ assemble()                    │ SessionEvent channel
//!         ▼                               │ (bounded waits)
//! ┌───────────────┐              ┌────────┴────────┐
//! │ Header Builder│              │   Supervisor    │
//! │ Doc Generators│              │ Inbound Interp. │
//! │ Msg Assembler │              └────────▲────────┘
//! └───────┬───────┘                       │ notifications
//!         ▼                               │
//! ┌──────────────────────────────────────────────────────┐
//! │               Transport (collaborator)               │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Message Types
//!
//! | Code | Meaning      | Body parts                        |
//! |------|--------------|-----------------------------------|
//! | 21   | start        | location + identity document      |
//! | 22   | continuation | location document                 |
//! | 23   | stop         | location document                 |
//!
//! Every outbound message carries a PIDF-LO location part referenced by
//! a fixed `Geolocation` content id; the session start additionally
//! carries the SubscriberInfo identity card.
//!
//! ## Outcome
//!
//! A session never aborts on timeouts: degradations accumulate in an
//! [`ErrorFlags`] bitmask (`TIMEOUT=1`, `REGISTRATION_FAILED=2`,
//! `NO_REPLY=4`, `VALIDATION_MISMATCH=8`) which becomes the process exit
//! status, so automated callers can inspect the failure kinds bitwise.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use dec112_chat::{
//!     config::SessionConfig,
//!     session::{event_channel, SessionController, SessionMode},
//!     transport::{LoopbackTransport, TransportKind},
//! };
//! use std::time::Duration;
//!
//! let mut config = SessionConfig::from_file("config.toml")?;
//! config.finalize();
//!
//! let (tx, rx) = event_channel();
//! let transport = LoopbackTransport::new(tx, TransportKind::Tcp);
//! let controller = SessionController::new(config, transport, rx);
//!
//! let flags = controller
//!     .run(
//!         "sip:112@service.dec112.at",
//!         SessionMode::Automatic { count: 3, interval: Duration::from_secs(5) },
//!     )
//!     .await?;
//! assert!(flags.is_clean());
//! ```

pub mod config;
pub mod error;
pub mod protocol;
pub mod session;
pub mod transport;

// Re-exports for convenience
pub use config::SessionConfig;
pub use error::{ChatError, ErrorFlags, Result};
pub use protocol::{
    assemble, build_headers, identity_document, location_document, HeaderSet, InboundSignal,
    MessageType, OutboundMessage,
};
pub use session::{
    event_channel, SessionController, SessionEvent, SessionMode, SessionState, Supervisor,
};
pub use transport::{AccountIdentity, LoopbackTransport, SendStatus, Transport, TransportKind};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Inbound message interpretation.
//!
//! Every message the transport delivers passes through [`apply`], which
//! updates the session's runtime state: validation outcome, reply target,
//! remote teardown detection and the received-mark the bounded waits
//! observe.

use tracing::{debug, info, warn};

use super::{HeaderSet, MSGTYPE_TEARDOWN, PURPOSE_CALL_ID, PURPOSE_MESSAGE_TYPE};
use crate::config::SessionConfig;
use crate::error::ErrorFlags;
use crate::session::SessionShared;

/// One inbound message as delivered by the transport.
#[derive(Debug, Clone)]
pub struct InboundSignal {
    /// Sender address.
    pub from: String,
    /// Message body text.
    pub body: String,
    /// Header snapshot of the request.
    pub headers: HeaderSet,
}

/// Interpret one inbound signal against the session state.
///
/// Ordering matters and mirrors the wire contract:
/// 1. an armed validation compares the body prefix against the expected
///    text exactly once, then disarms regardless of outcome;
/// 2. the first `Reply-To` value becomes the reply target verbatim, and
///    its absence clears any previous target;
/// 3. every `Call-Info` occurrence is scanned, and a message-type value
///    containing the teardown token clears the registered flag;
/// 4. the received-mark is set so a pending bounded wait unblocks.
pub fn apply(config: &SessionConfig, shared: &mut SessionShared, signal: &InboundSignal) {
    info!(from = %signal.from, "message received");
    debug!(body = %signal.body, "inbound body");

    if shared.validation_armed {
        if let Some(expected) = &config.expected_reply {
            if !signal.body.starts_with(expected.as_str()) {
                shared.flags.set(ErrorFlags::VALIDATION_MISMATCH);
                warn!(expected = %expected, got = %signal.body, "validation mismatch");
            }
        }
        shared.validation_armed = false;
    }

    // Each inbound signal resets the reply target; there is no
    // keep-previous fallback.
    shared.reply_target = signal.headers.first("Reply-To").map(str::to_string);
    if let Some(target) = &shared.reply_target {
        debug!(reply_to = %target, "reply target updated");
    }

    for value in signal.headers.all("Call-Info") {
        if value.contains(PURPOSE_CALL_ID) {
            debug!(call_info = %value, "remote call id");
        } else if value.contains(PURPOSE_MESSAGE_TYPE) {
            debug!(call_info = %value, "remote message type");
            if value.contains(MSGTYPE_TEARDOWN) {
                info!("remote session teardown signalled");
                shared.registered = false;
            }
        }
    }

    shared.message_received = true;
}

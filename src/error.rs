//! DEC112 chat error types.
//!
//! Two kinds of failure live here and they are deliberately distinct:
//!
//! - [`ChatError`]: hard failures that abort the current operation
//!   (document construction, configuration, transport plumbing).
//! - [`ErrorFlags`]: session degradations (timeouts, validation
//!   mismatches) that are accumulated across the run and returned as the
//!   process exit status instead of aborting anything.

use thiserror::Error;

/// DEC112 chat errors.
#[derive(Error, Debug)]
pub enum ChatError {
    /// XML document construction failed. Fatal for the send that needed it.
    #[error("Document error: {0}")]
    Document(String),

    /// Configuration could not be read or parsed.
    #[error("Config error: {0}")]
    Config(String),

    /// Transport-level error (queuing, event channel).
    #[error("Transport error: {0}")]
    Transport(String),

    /// Target address failed syntactic validation.
    #[error("Invalid target address: {0}")]
    InvalidTarget(String),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for DEC112 chat operations
pub type Result<T> = std::result::Result<T, ChatError>;

impl From<toml::de::Error> for ChatError {
    fn from(err: toml::de::Error) -> Self {
        ChatError::Config(err.to_string())
    }
}

/// Accumulated session degradation bitmask.
///
/// Flags are only ever set, never cleared; the final byte is the process
/// exit status, so an automated caller can distinguish a clean run (0)
/// from any combination of degradations by bitwise inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ErrorFlags(u8);

impl ErrorFlags {
    /// Clean run.
    pub const NONE: ErrorFlags = ErrorFlags(0x00);
    /// A bounded wait for a remote acknowledgement expired.
    pub const TIMEOUT: ErrorFlags = ErrorFlags(0x01);
    /// Registration did not complete within the bound.
    pub const REGISTRATION_FAILED: ErrorFlags = ErrorFlags(0x02);
    /// No reply target appeared after the session start message.
    pub const NO_REPLY: ErrorFlags = ErrorFlags(0x04);
    /// An armed validation saw an unexpected reply body.
    pub const VALIDATION_MISMATCH: ErrorFlags = ErrorFlags(0x08);

    /// Record a degradation.
    pub fn set(&mut self, flag: ErrorFlags) {
        self.0 |= flag.0;
    }

    /// Check whether a degradation has been recorded.
    pub fn contains(self, flag: ErrorFlags) -> bool {
        self.0 & flag.0 == flag.0
    }

    /// Raw bitmask byte, used as the process exit status.
    pub fn bits(self) -> u8 {
        self.0
    }

    /// True when no degradation has been recorded.
    pub fn is_clean(self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for ErrorFlags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_clean() {
            return write!(f, "none");
        }
        let names = [
            (ErrorFlags::TIMEOUT, "timeout"),
            (ErrorFlags::REGISTRATION_FAILED, "registration-failed"),
            (ErrorFlags::NO_REPLY, "no-reply"),
            (ErrorFlags::VALIDATION_MISMATCH, "validation-mismatch"),
        ];
        let mut first = true;
        for (flag, name) in names {
            if self.contains(flag) {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{name}")?;
                first = false;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_accumulate() {
        let mut flags = ErrorFlags::NONE;
        assert!(flags.is_clean());

        flags.set(ErrorFlags::TIMEOUT);
        flags.set(ErrorFlags::VALIDATION_MISMATCH);
        assert_eq!(flags.bits(), 0x09);
        assert!(flags.contains(ErrorFlags::TIMEOUT));
        assert!(flags.contains(ErrorFlags::VALIDATION_MISMATCH));
        assert!(!flags.contains(ErrorFlags::REGISTRATION_FAILED));
    }

    #[test]
    fn test_flags_never_clear() {
        let mut flags = ErrorFlags::NONE;
        flags.set(ErrorFlags::NO_REPLY);
        flags.set(ErrorFlags::NONE);
        assert_eq!(flags.bits(), 0x04);
    }

    #[test]
    fn test_flags_display() {
        let mut flags = ErrorFlags::NONE;
        assert_eq!(flags.to_string(), "none");
        flags.set(ErrorFlags::REGISTRATION_FAILED);
        flags.set(ErrorFlags::NO_REPLY);
        assert_eq!(flags.to_string(), "registration-failed|no-reply");
    }
}

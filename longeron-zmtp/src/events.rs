//! Handshake failure reporting.
//!
//! The mechanism never logs a failure: it emits exactly one event through
//! this channel and returns the error to its caller. Recovery policy
//! belongs to the session on the receiving end.

use crate::error::ZmtpError;
use std::fmt;

/// Events the mechanism reports to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeEvent {
    /// The handshake failed; the session should tear the connection down.
    Failure {
        endpoint: String,
        error: ZmtpError,
    },
}

impl fmt::Display for HandshakeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failure { endpoint, error } => {
                write!(f, "Handshake failed on {endpoint}: {error}")
            }
        }
    }
}

/// Handle for receiving handshake events.
pub type HandshakeMonitor = flume::Receiver<HandshakeEvent>;

/// Sender half held by the mechanism.
pub type HandshakeEventSender = flume::Sender<HandshakeEvent>;

/// Creates a new monitoring channel pair.
#[must_use]
pub fn handshake_monitor() -> (HandshakeEventSender, HandshakeMonitor) {
    flume::unbounded()
}

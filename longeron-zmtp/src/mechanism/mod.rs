pub mod plain_client;

use longeron_core::msg::Msg;

use crate::error::{Result, ZmtpError};

pub use plain_client::PlainClient;

/// Handshake progress as seen by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MechanismStatus {
    /// Commands still need to flow in one or both directions.
    Handshaking,
    /// Handshake complete; application traffic may flow.
    Ready,
    /// The peer rejected the handshake.
    Error,
}

/// Trait implemented by each security mechanism (PLAIN now; this is the
/// seam where CURVE or NULL would slot in).
///
/// The mechanism is responsible for:
/// - emitting outbound handshake command messages in state order
/// - validating inbound command messages during the handshake
/// - reporting failures to the session through the event sink
pub trait Mechanism {
    /// Produce the next outbound handshake command.
    ///
    /// Returns [`ZmtpError::WouldBlock`] when the state machine is waiting
    /// on the peer and has nothing to transmit; the session retries after
    /// the next inbound command.
    fn next_handshake_command(&mut self) -> Result<Msg>;

    /// Consume an inbound handshake command.
    ///
    /// On success the message is replaced with an empty one so the session
    /// can reuse it.
    fn process_handshake_command(&mut self, msg: &mut Msg) -> Result<()>;

    /// Current handshake status.
    fn status(&self) -> MechanismStatus;
}

/// During the handshake any non-command frame is a violation.
#[inline]
pub fn require_command(msg: &Msg) -> Result<()> {
    if msg.is_command() {
        Ok(())
    } else {
        Err(ZmtpError::UnexpectedCommand)
    }
}

/// PLAIN credentials, drawn from configuration.
///
/// PLAIN sends these in cleartext; only use it over loopback, trusted
/// networks, or an encrypted transport.
#[derive(Debug, Clone)]
pub struct PlainCredentials {
    pub username: String,
    pub password: String,
}

impl PlainCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

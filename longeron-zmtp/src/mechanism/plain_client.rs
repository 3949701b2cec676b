//! PLAIN client mechanism (RFC 23).
//!
//! Client-side command flow:
//!
//! ```text
//! C -> S  HELLO     username + password, length-prefixed
//! S -> C  WELCOME   exactly 8 bytes
//! C -> S  INITIATE  metadata properties
//! S -> C  READY     metadata properties
//! S -> C  ERROR     reason string, at either await point
//! ```
//!
//! Each command body starts with a length-prefixed ASCII name
//! (`\x05HELLO`, `\x07WELCOME`, ...).

use bytes::Bytes;
use longeron_core::msg::Msg;
use tracing::debug;

use crate::command::parse_command;
use crate::error::{Result, ZmtpError};
use crate::events::{HandshakeEvent, HandshakeEventSender};
use crate::mechanism::{require_command, Mechanism, MechanismStatus, PlainCredentials};
use crate::utils::put_property;

const HELLO_PREFIX: &[u8] = b"\x05HELLO";
const WELCOME_PREFIX: &[u8] = b"\x07WELCOME";
const INITIATE_PREFIX: &[u8] = b"\x08INITIATE";
const READY_PREFIX: &[u8] = b"\x05READY";
const ERROR_PREFIX: &[u8] = b"\x05ERROR";

/// An ERROR body is the name prefix plus one reason-length byte.
const ERROR_MIN_SIZE: usize = ERROR_PREFIX.len() + 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// HELLO not yet produced.
    SendingHello,
    /// HELLO sent; expecting WELCOME (or ERROR).
    AwaitingWelcome,
    /// WELCOME accepted; INITIATE not yet produced.
    SendingInitiate,
    /// INITIATE sent; expecting READY (or ERROR).
    AwaitingReady,
    /// Handshake complete.
    Ready,
    /// The server sent ERROR. Terminal.
    ErrorReceived,
}

/// Client half of the PLAIN handshake.
///
/// Sans-IO: the session pulls outbound commands with
/// [`next_handshake_command`](Mechanism::next_handshake_command) and
/// pushes inbound ones through
/// [`process_handshake_command`](Mechanism::process_handshake_command),
/// polling [`status`](Mechanism::status) to learn when traffic may flow.
#[derive(Debug)]
pub struct PlainClient {
    state: State,
    username: String,
    password: String,
    endpoint: String,
    /// Properties sent in INITIATE (e.g. `Socket-Type`, `Identity`).
    metadata: Vec<(String, Bytes)>,
    /// Properties captured from the server's READY, owned.
    peer_metadata: Vec<(Bytes, Bytes)>,
    error_reason: Option<String>,
    events: Option<HandshakeEventSender>,
}

impl PlainClient {
    /// Create a client for `endpoint` with the given credentials.
    ///
    /// # Errors
    ///
    /// [`ZmtpError::CredentialsTooLong`] when either credential does not
    /// fit a one-byte length prefix.
    pub fn new(endpoint: impl Into<String>, credentials: PlainCredentials) -> Result<Self> {
        if credentials.username.len() > 255 || credentials.password.len() > 255 {
            return Err(ZmtpError::CredentialsTooLong);
        }
        Ok(Self {
            state: State::SendingHello,
            username: credentials.username,
            password: credentials.password,
            endpoint: endpoint.into(),
            metadata: Vec::new(),
            peer_metadata: Vec::new(),
            error_reason: None,
            events: None,
        })
    }

    /// Attach the session's failure sink. Every handshake failure emits
    /// exactly one event there before the error is returned.
    #[must_use]
    pub fn with_events(mut self, events: HandshakeEventSender) -> Self {
        self.events = Some(events);
        self
    }

    /// Add a metadata property to send in INITIATE.
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Bytes>) -> Self {
        self.metadata.push((name.into(), value.into()));
        self
    }

    /// Server-supplied READY metadata, populated once the handshake is
    /// complete.
    #[must_use]
    pub fn peer_metadata(&self) -> &[(Bytes, Bytes)] {
        &self.peer_metadata
    }

    /// Look up one READY property by name.
    #[must_use]
    pub fn peer_property(&self, name: &[u8]) -> Option<&[u8]> {
        self.peer_metadata
            .iter()
            .find(|(n, _)| n.as_ref() == name)
            .map(|(_, v)| v.as_ref())
    }

    /// Reason carried by the server's ERROR command, if one arrived.
    #[must_use]
    pub fn error_reason(&self) -> Option<&str> {
        self.error_reason.as_deref()
    }

    fn build_hello(&self) -> Msg {
        let mut body =
            Vec::with_capacity(HELLO_PREFIX.len() + 2 + self.username.len() + self.password.len());
        body.extend_from_slice(HELLO_PREFIX);
        body.push(self.username.len() as u8);
        body.extend_from_slice(self.username.as_bytes());
        body.push(self.password.len() as u8);
        body.extend_from_slice(self.password.as_bytes());
        Msg::owned(body, Msg::COMMAND)
    }

    fn build_initiate(&self) -> Msg {
        let mut body = INITIATE_PREFIX.to_vec();
        for (name, value) in &self.metadata {
            put_property(&mut body, name, value);
        }
        Msg::owned(body, Msg::COMMAND)
    }

    fn process_welcome(&mut self, data: &[u8]) -> Result<()> {
        if data.len() != WELCOME_PREFIX.len() {
            return Err(ZmtpError::MalformedWelcome);
        }
        debug!(endpoint = %self.endpoint, "WELCOME accepted");
        self.state = State::SendingInitiate;
        Ok(())
    }

    fn process_ready(&mut self, data: &[u8]) -> Result<()> {
        let cmd = parse_command(data)?;
        debug_assert_eq!(cmd.name, b"READY");

        self.peer_metadata = cmd
            .props
            .iter()
            .map(|p| {
                (
                    Bytes::copy_from_slice(p.name),
                    Bytes::copy_from_slice(p.value),
                )
            })
            .collect();

        debug!(endpoint = %self.endpoint, "READY accepted, handshake complete");
        self.state = State::Ready;
        Ok(())
    }

    fn process_error(&mut self, data: &[u8]) -> Result<()> {
        if data.len() < ERROR_MIN_SIZE {
            return Err(ZmtpError::MalformedError);
        }
        let reason_len = data[ERROR_PREFIX.len()] as usize;
        if reason_len > data.len() - ERROR_MIN_SIZE {
            return Err(ZmtpError::MalformedError);
        }
        let reason =
            String::from_utf8_lossy(&data[ERROR_MIN_SIZE..ERROR_MIN_SIZE + reason_len])
                .into_owned();

        debug!(endpoint = %self.endpoint, reason = %reason, "ERROR received from peer");
        self.error_reason = Some(reason);
        self.state = State::ErrorReceived;
        Ok(())
    }

    /// Emit the failure event, then hand the error back for propagation.
    fn fail(&self, error: ZmtpError) -> ZmtpError {
        if let Some(events) = &self.events {
            let _ = events.send(HandshakeEvent::Failure {
                endpoint: self.endpoint.clone(),
                error: error.clone(),
            });
        }
        error
    }
}

impl Mechanism for PlainClient {
    fn next_handshake_command(&mut self) -> Result<Msg> {
        match self.state {
            State::SendingHello => {
                debug!(endpoint = %self.endpoint, username = %self.username, "sending HELLO");
                self.state = State::AwaitingWelcome;
                Ok(self.build_hello())
            }
            State::SendingInitiate => {
                debug!(endpoint = %self.endpoint, "sending INITIATE");
                self.state = State::AwaitingReady;
                Ok(self.build_initiate())
            }
            _ => Err(ZmtpError::WouldBlock),
        }
    }

    fn process_handshake_command(&mut self, msg: &mut Msg) -> Result<()> {
        let outcome = match require_command(msg) {
            Err(e) => Err(e),
            Ok(()) => {
                let data = msg.data();
                match self.state {
                    State::AwaitingWelcome | State::AwaitingReady
                        if data.starts_with(ERROR_PREFIX) =>
                    {
                        self.process_error(data)
                    }
                    State::AwaitingWelcome if data.starts_with(WELCOME_PREFIX) => {
                        self.process_welcome(data)
                    }
                    State::AwaitingReady if data.starts_with(READY_PREFIX) => {
                        self.process_ready(data)
                    }
                    _ => Err(ZmtpError::UnexpectedCommand),
                }
            }
        };

        match outcome {
            Ok(()) => {
                *msg = Msg::new();
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn status(&self) -> MechanismStatus {
        match self.state {
            State::Ready => MechanismStatus::Ready,
            State::ErrorReceived => MechanismStatus::Error,
            _ => MechanismStatus::Handshaking,
        }
    }
}

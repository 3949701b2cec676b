use thiserror::Error;

/// Protocol errors surfaced by the decoder and the security mechanism.
///
/// Every kind is terminal for the current frame or handshake except
/// [`WouldBlock`](ZmtpError::WouldBlock); recovery policy belongs to the
/// session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ZmtpError {
    /// Frame size exceeds the configured or addressable limit.
    #[error("frame of {size} bytes exceeds the {max} byte limit")]
    TooLarge { size: u64, max: u64 },

    /// Payload allocation failed.
    #[error("failed to allocate {0} bytes for a frame payload")]
    OutOfMemory(usize),

    /// A handshake command arrived in a state that does not accept it.
    #[error("unexpected handshake command")]
    UnexpectedCommand,

    /// WELCOME must be exactly 8 bytes.
    #[error("malformed WELCOME command")]
    MalformedWelcome,

    /// ERROR body shorter than its own framing claims.
    #[error("malformed ERROR command")]
    MalformedError,

    /// Command metadata failed to parse.
    #[error("invalid command metadata")]
    InvalidMetadata,

    /// Username or password does not fit a one-byte length prefix.
    #[error("credentials longer than 255 bytes")]
    CredentialsTooLong,

    /// The mechanism has nothing to transmit in its current state.
    #[error("no handshake command pending")]
    WouldBlock,
}

/// Result type alias for protocol operations
pub type Result<T> = std::result::Result<T, ZmtpError>;

impl ZmtpError {
    /// Whether the caller may simply retry later.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::WouldBlock)
    }
}

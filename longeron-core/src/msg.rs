use bytes::Bytes;

/// In-memory representation of one wire frame: a payload plus flag bits.
///
/// The payload is either empty, an exclusive allocation (reassembled from
/// fragmented input or copied off the wire), or a shared view into a
/// receive arena chunk. A shared payload holds one reference on its chunk
/// and releases it on drop, so the chunk always outlives the message.
#[derive(Debug, Clone, Default)]
pub struct Msg {
    flags: u8,
    payload: Payload,
}

#[derive(Debug, Clone, Default)]
enum Payload {
    #[default]
    Empty,
    Owned(Vec<u8>),
    Shared(Bytes),
}

impl Msg {
    /// Further frames of the same logical message follow.
    pub const MORE: u8 = 0x01;
    /// The frame is a protocol command, not application data.
    pub const COMMAND: u8 = 0x04;

    /// An empty message with no flags.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            flags: 0,
            payload: Payload::Empty,
        }
    }

    /// An empty message carrying `flags`.
    #[must_use]
    pub const fn with_flags(flags: u8) -> Self {
        Self {
            flags,
            payload: Payload::Empty,
        }
    }

    /// A message with an exclusively owned payload.
    #[must_use]
    pub const fn owned(data: Vec<u8>, flags: u8) -> Self {
        Self {
            flags,
            payload: Payload::Owned(data),
        }
    }

    /// A message sharing a refcounted arena view.
    #[must_use]
    pub const fn shared(data: Bytes, flags: u8) -> Self {
        Self {
            flags,
            payload: Payload::Shared(data),
        }
    }

    #[must_use]
    pub fn data(&self) -> &[u8] {
        match &self.payload {
            Payload::Empty => &[],
            Payload::Owned(v) => v,
            Payload::Shared(b) => b,
        }
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.data().len()
    }

    #[must_use]
    pub const fn flags(&self) -> u8 {
        self.flags
    }

    pub fn set_flags(&mut self, flags: u8) {
        self.flags |= flags;
    }

    pub fn clear_flags(&mut self, flags: u8) {
        self.flags &= !flags;
    }

    #[inline]
    #[must_use]
    pub const fn more(&self) -> bool {
        (self.flags & Self::MORE) != 0
    }

    #[inline]
    #[must_use]
    pub const fn is_command(&self) -> bool {
        (self.flags & Self::COMMAND) != 0
    }

    /// Whether the payload is a shared arena view rather than owned or
    /// empty.
    #[must_use]
    pub const fn is_shared(&self) -> bool {
        matches!(self.payload, Payload::Shared(_))
    }

    /// Consume the message into a refcounted payload view.
    ///
    /// Shared payloads convert without copying; owned payloads transfer
    /// their allocation.
    #[must_use]
    pub fn into_data(self) -> Bytes {
        match self.payload {
            Payload::Empty => Bytes::new(),
            Payload::Owned(v) => Bytes::from(v),
            Payload::Shared(b) => b,
        }
    }
}

use longeron_core::buffer::RecvQueue;
use longeron_core::msg::Msg;

use crate::error::{Result, ZmtpError};
use crate::utils::{WIRE_COMMAND, WIRE_LARGE, WIRE_MORE};

/// Decoder limits and behavior switches.
#[derive(Debug, Clone)]
pub struct DecoderOptions {
    /// Maximum accepted payload size in bytes; `None` means unlimited.
    pub max_msg_size: Option<usize>,

    /// Hand out arena views instead of copying when a payload already
    /// sits inside a single receive segment.
    pub zero_copy: bool,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            max_msg_size: None, // No limit
            zero_copy: true,
        }
    }
}

impl DecoderOptions {
    /// Create decoder options with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum payload size.
    #[must_use]
    pub fn with_max_msg_size(mut self, size: Option<usize>) -> Self {
        self.max_msg_size = size;
        self
    }

    /// Enable or disable zero-copy extraction.
    #[must_use]
    pub fn with_zero_copy(mut self, enabled: bool) -> Self {
        self.zero_copy = enabled;
        self
    }
}

/// Decode stages. The active stage pins exactly how many bytes must be
/// consumed before the next transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    /// Waiting for the flags byte.
    Flags,
    /// Waiting for the one-byte size header.
    OneByteSize,
    /// Accumulating the eight-byte size header; `filled` bytes of the
    /// scratch buffer are valid.
    EightByteSize { filled: usize },
    /// Copying an owned payload; `remaining` bytes still to arrive.
    Payload { remaining: usize },
}

/// Streaming ZMTP v2 frame decoder.
///
/// Wire format of one frame:
///
/// ```text
/// flags:u8   [MORE=0x01 | LARGE=0x02 | COMMAND=0x04]
/// size       u8, or u64 big-endian when LARGE is set
/// payload    size bytes
/// ```
///
/// Feed bytes through a [`RecvQueue`] and pull completed messages:
/// - `Ok(Some(msg))` - a frame completed; call again, more input may be
///   buffered
/// - `Ok(None)` - everything consumable was consumed; read more input
/// - `Err(_)` - terminal for the current frame; the session decides
///   whether to [`reset`](Self::reset) and reconnect
///
/// With zero-copy enabled, a payload that lies entirely inside the front
/// segment of the queue is handed out as a shared view of that arena
/// chunk. A payload that straddles segments is always reassembled into an
/// owned allocation, because a segment boundary is a refcount boundary.
pub struct V2Decoder {
    stage: Stage,
    pending_flags: u8,
    scratch: [u8; 8],
    staging: Vec<u8>,
    opts: DecoderOptions,
}

impl V2Decoder {
    #[must_use]
    pub fn new(opts: DecoderOptions) -> Self {
        Self {
            stage: Stage::Flags,
            pending_flags: 0,
            scratch: [0u8; 8],
            staging: Vec::new(),
            opts,
        }
    }

    /// Whether the decoder is in the middle of a frame.
    #[inline]
    #[must_use]
    pub const fn has_more(&self) -> bool {
        !matches!(self.stage, Stage::Flags)
    }

    /// Abandon any frame in progress and return to the initial stage.
    pub fn reset(&mut self) {
        self.stage = Stage::Flags;
        self.pending_flags = 0;
        self.staging = Vec::new();
    }

    /// Decode a single message from `src`.
    pub fn decode(&mut self, src: &mut RecvQueue) -> Result<Option<Msg>> {
        loop {
            match self.stage {
                Stage::Flags => {
                    if src.pop_into(&mut self.scratch[..1]) == 0 {
                        return Ok(None);
                    }
                    let wire = self.scratch[0];

                    // Bits outside the three known flags are ignored for
                    // forward compatibility.
                    self.pending_flags = 0;
                    if wire & WIRE_MORE != 0 {
                        self.pending_flags |= Msg::MORE;
                    }
                    if wire & WIRE_COMMAND != 0 {
                        self.pending_flags |= Msg::COMMAND;
                    }

                    self.stage = if wire & WIRE_LARGE != 0 {
                        Stage::EightByteSize { filled: 0 }
                    } else {
                        Stage::OneByteSize
                    };
                }

                Stage::OneByteSize => {
                    if src.pop_into(&mut self.scratch[..1]) == 0 {
                        return Ok(None);
                    }
                    let size = u64::from(self.scratch[0]);
                    if let Some(msg) = self.size_ready(size, src)? {
                        return Ok(Some(msg));
                    }
                }

                Stage::EightByteSize { filled } => {
                    let filled = filled + src.pop_into(&mut self.scratch[filled..]);
                    if filled < 8 {
                        self.stage = Stage::EightByteSize { filled };
                        return Ok(None);
                    }
                    let size = u64::from_be_bytes(self.scratch);
                    if let Some(msg) = self.size_ready(size, src)? {
                        return Ok(Some(msg));
                    }
                }

                Stage::Payload { remaining } => {
                    let take = remaining.min(src.len());
                    if take > 0 {
                        if let Some(bytes) = src.take_bytes(take) {
                            self.staging.extend_from_slice(&bytes);
                        }
                    }

                    let remaining = remaining - take;
                    if remaining > 0 {
                        self.stage = Stage::Payload { remaining };
                        return Ok(None);
                    }

                    self.stage = Stage::Flags;
                    let payload = std::mem::take(&mut self.staging);
                    return Ok(Some(Msg::owned(payload, self.pending_flags)));
                }
            }
        }
    }

    /// The full size header has been decoded: enforce limits and pick the
    /// payload strategy.
    fn size_ready(&mut self, size: u64, src: &mut RecvQueue) -> Result<Option<Msg>> {
        if let Some(max) = self.opts.max_msg_size {
            if size > max as u64 {
                self.stage = Stage::Flags;
                return Err(ZmtpError::TooLarge {
                    size,
                    max: max as u64,
                });
            }
        }
        let Ok(size) = usize::try_from(size) else {
            self.stage = Stage::Flags;
            return Err(ZmtpError::TooLarge {
                size,
                max: usize::MAX as u64,
            });
        };

        if size == 0 {
            self.stage = Stage::Flags;
            return Ok(Some(Msg::with_flags(self.pending_flags)));
        }

        if self.opts.zero_copy && src.front_len() >= size {
            // The whole payload already sits in one arena segment.
            let payload = src
                .take_bytes(size)
                .expect("front segment covers the payload");
            self.stage = Stage::Flags;
            return Ok(Some(Msg::shared(payload, self.pending_flags)));
        }

        let mut staging = Vec::new();
        if staging.try_reserve_exact(size).is_err() {
            self.stage = Stage::Flags;
            return Err(ZmtpError::OutOfMemory(size));
        }
        self.staging = staging;
        self.stage = Stage::Payload { remaining: size };
        Ok(None)
    }
}

use bytes::{Buf, Bytes, BytesMut};
use std::collections::VecDeque;

/// An ordered queue of frozen receive segments.
///
/// Each segment is one arena fill pushed by the transport. Extraction is
/// zero-copy whenever the requested bytes sit inside the front segment
/// (just a refcount increment on the underlying `Bytes`). Bytes spanning
/// a segment boundary are copied: a segment boundary is an arena-refill
/// boundary, and a single view across it would have to pin two chunks.
#[derive(Debug, Default)]
pub struct RecvQueue {
    segs: VecDeque<Bytes>,
    len: usize,
}

impl RecvQueue {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            segs: VecDeque::new(),
            len: 0,
        }
    }

    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn push(&mut self, bytes: Bytes) {
        if bytes.is_empty() {
            return;
        }
        self.len += bytes.len();
        self.segs.push_back(bytes);
    }

    /// Length of the front segment, 0 when empty.
    ///
    /// This is the current zero-copy window: a payload of at most this
    /// many bytes can be extracted without copying.
    #[inline]
    #[must_use]
    pub fn front_len(&self) -> usize {
        self.segs.front().map_or(0, Bytes::len)
    }

    /// Copy up to `dst.len()` bytes into `dst`, consuming them.
    ///
    /// Returns the number of bytes copied (short only when the queue runs
    /// dry).
    pub fn pop_into(&mut self, dst: &mut [u8]) -> usize {
        let mut copied = 0;
        while copied < dst.len() {
            let Some(front) = self.segs.front_mut() else {
                break;
            };
            let take = (dst.len() - copied).min(front.len());
            dst[copied..copied + take].copy_from_slice(&front[..take]);
            front.advance(take);
            if front.is_empty() {
                self.segs.pop_front();
            }
            copied += take;
        }
        self.len -= copied;
        copied
    }

    /// Advance the queue by `n` bytes, dropping fully-consumed segments.
    ///
    /// # Panics
    ///
    /// Panics if `n > self.len()`.
    pub fn advance(&mut self, mut n: usize) {
        assert!(n <= self.len);
        self.len -= n;

        while n > 0 {
            let Some(mut front) = self.segs.pop_front() else {
                break;
            };
            if n >= front.len() {
                n -= front.len();
                continue;
            }
            // partially consumed
            front.advance(n);
            self.segs.push_front(front);
            break;
        }
    }

    /// Take exactly `n` bytes from the front of the queue.
    ///
    /// If the front segment contains all `n` bytes, this is zero-copy.
    /// If the bytes span multiple segments, this copies into a contiguous
    /// buffer. Returns `None` when fewer than `n` bytes are queued.
    pub fn take_bytes(&mut self, n: usize) -> Option<Bytes> {
        if n == 0 {
            return Some(Bytes::new());
        }
        if n > self.len {
            return None;
        }

        let front = self.segs.front_mut()?;
        if front.len() >= n {
            self.len -= n;
            let out = front.split_to(n);
            if front.is_empty() {
                self.segs.pop_front();
            }
            return Some(out);
        }

        // Spans segments: copy.
        let mut out = BytesMut::with_capacity(n);
        let mut remaining = n;
        while remaining > 0 {
            let Some(seg) = self.segs.pop_front() else {
                break;
            };
            let take = remaining.min(seg.len());
            out.extend_from_slice(&seg[..take]);
            remaining -= take;
            self.len -= take;
            if take < seg.len() {
                let mut rest = seg;
                rest.advance(take);
                self.segs.push_front(rest);
            }
        }

        Some(out.freeze())
    }
}

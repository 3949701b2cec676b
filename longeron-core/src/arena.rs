//! Allocation primitives for the receive path.
//!
//! This module is the ONLY place where unsafe memory manipulation is
//! allowed. All invariants are enforced here so the rest of the system
//! can remain 100% safe.

#![allow(unsafe_code)]

use bytes::Bytes;
use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::ptr::NonNull;
use std::sync::Arc;

/// Size of one receive chunk.
/// Tuned for cache locality and amortized allocation cost.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Cache-line alignment to avoid false sharing.
const CHUNK_ALIGN: usize = 128;

/// A receive chunk: a pinned, zero-initialized block of memory.
///
/// Invariant:
/// - Memory is allocated once and never moved.
/// - Freed only when the last `Arc<Chunk>` is dropped.
struct Chunk {
    ptr: NonNull<u8>,
}

unsafe impl Send for Chunk {}
unsafe impl Sync for Chunk {}

impl Chunk {
    fn alloc() -> Arc<Self> {
        unsafe {
            let layout = Layout::from_size_align_unchecked(CHUNK_SIZE, CHUNK_ALIGN);
            let ptr = alloc_zeroed(layout);
            if ptr.is_null() {
                std::alloc::handle_alloc_error(layout);
            }
            Arc::new(Self {
                ptr: NonNull::new_unchecked(ptr),
            })
        }
    }
}

impl Drop for Chunk {
    fn drop(&mut self) {
        unsafe {
            let layout = Layout::from_size_align_unchecked(CHUNK_SIZE, CHUNK_ALIGN);
            dealloc(self.ptr.as_ptr(), layout);
        }
    }
}

/// Owner passed into `Bytes::from_owner` when a slab is frozen.
///
/// This guarantees:
/// - The backing chunk stays alive as long as any `Bytes` view exists.
/// - No mutable access occurs after freeze (slabs never overlap).
struct ChunkOwner {
    chunk: Arc<Chunk>,
}

impl AsRef<[u8]> for ChunkOwner {
    fn as_ref(&self) -> &[u8] {
        // SAFETY: the chunk is zero-initialized at allocation, pinned, and
        // lives as long as this owner.
        unsafe { std::slice::from_raw_parts(self.chunk.ptr.as_ptr(), CHUNK_SIZE) }
    }
}

/// Writable region the transport reads into.
///
/// Covers `[ptr, ptr + cap)` inside its chunk; the first `len` bytes are
/// filled. `RecvArena` hands out non-overlapping regions, so the mutable
/// access cannot alias another slab or a frozen view.
pub struct WriteSlab {
    chunk: Arc<Chunk>,
    ptr: NonNull<u8>,
    cap: usize,
    len: usize,
}

unsafe impl Send for WriteSlab {}

impl WriteSlab {
    /// The unfilled tail of the slab. The transport reads into this and
    /// then calls [`advance`](Self::advance) with the byte count.
    pub fn spare(&mut self) -> &mut [u8] {
        // SAFETY: the region is inside a zero-initialized chunk and this
        // slab has exclusive access to it.
        unsafe {
            std::slice::from_raw_parts_mut(self.ptr.as_ptr().add(self.len), self.cap - self.len)
        }
    }

    /// Mark `n` more bytes as filled.
    ///
    /// # Panics
    ///
    /// Panics if `n` exceeds the spare capacity.
    pub fn advance(&mut self, n: usize) {
        assert!(n <= self.cap - self.len);
        self.len += n;
    }

    /// Copy `src` into the slab, returning how many bytes fit.
    pub fn write(&mut self, src: &[u8]) -> usize {
        let n = src.len().min(self.cap - self.len);
        self.spare()[..n].copy_from_slice(&src[..n]);
        self.len += n;
        n
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.cap
    }

    /// Freeze the filled region into an immutable, refcounted view.
    ///
    /// The returned `Bytes` (and every clone or slice of it) holds one
    /// reference on the backing chunk; the chunk is freed only after the
    /// arena and all views have released it.
    #[must_use]
    pub fn freeze(self) -> Bytes {
        let Self {
            chunk, ptr, len, ..
        } = self;

        let offset = unsafe { ptr.as_ptr().offset_from(chunk.ptr.as_ptr()) } as usize;
        debug_assert!(offset + len <= CHUNK_SIZE);

        let owner = ChunkOwner { chunk };

        // Create a Bytes covering the whole chunk, then slice.
        let full = Bytes::from_owner(owner);
        full.slice(offset..offset + len)
    }
}

/// Arena feeding the receive path of one connection.
///
/// Not thread-safe: one arena per decoder. Shared ownership is expressed
/// through the chunk refcount, which IS atomic, so frozen views may
/// outlive the arena on any thread.
pub struct RecvArena {
    current: Option<Arc<Chunk>>,
    offset: usize,
}

impl Default for RecvArena {
    fn default() -> Self {
        Self::new()
    }
}

impl RecvArena {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            current: None,
            offset: CHUNK_SIZE, // force alloc on first use
        }
    }

    /// Allocate a writable slab for a single transport read.
    ///
    /// This guarantees:
    /// - Stable memory address
    /// - No reallocation
    /// - No aliasing with other slabs
    ///
    /// # Panics
    ///
    /// Panics if `size > CHUNK_SIZE`.
    pub fn alloc(&mut self, size: usize) -> WriteSlab {
        assert!(size <= CHUNK_SIZE);

        if self.offset + size > CHUNK_SIZE {
            self.current = None;
            self.offset = 0;
        }
        let chunk = Arc::clone(self.current.get_or_insert_with(Chunk::alloc));

        let ptr = unsafe { NonNull::new_unchecked(chunk.ptr.as_ptr().add(self.offset)) };
        self.offset += size;

        WriteSlab {
            chunk,
            ptr,
            cap: size,
            len: 0,
        }
    }

    /// Number of live references to the current chunk.
    ///
    /// Reads 1 while the arena is the sole owner; every outstanding slab
    /// or frozen view adds one, and the count returns to 1 once they all
    /// drop.
    #[must_use]
    pub fn live_refs(&self) -> usize {
        self.current.as_ref().map_or(0, Arc::strong_count)
    }
}

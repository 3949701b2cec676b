//! Longeron Core
//!
//! Runtime-agnostic building blocks for the Longeron ZMTP engine:
//! - Pinned receive arena with refcounted views (`arena`)
//! - Segmented receive queue feeding the decoder (`buffer`)
//! - Message object with owned or arena-shared payloads (`msg`)

#![deny(unsafe_code)]
// Allow some pedantic lints that are intentional in this crate
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod arena;
pub mod buffer;
pub mod msg;

// Optional: a small prelude to make downstream crates ergonomic.
// Keep it minimal to avoid API lock-in.
pub mod prelude {
    pub use crate::arena::{RecvArena, WriteSlab};
    pub use crate::buffer::RecvQueue;
    pub use crate::msg::Msg;
}

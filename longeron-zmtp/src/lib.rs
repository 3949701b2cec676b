//! # Longeron ZMTP
//!
//! Sans-IO ZMTP v2 protocol engine: the framing decoder that turns an
//! inbound byte stream into discrete messages, and the PLAIN client
//! mechanism that authenticates a session before application traffic
//! flows.
//!
//! The transport reads into a [`longeron_core::arena::RecvArena`] slab,
//! freezes it, and pushes the segment into a
//! [`longeron_core::buffer::RecvQueue`]. [`V2Decoder`] consumes the queue
//! and yields [`longeron_core::msg::Msg`] values, zero-copy whenever a
//! payload sits inside a single arena segment. [`PlainClient`] produces
//! and consumes the HELLO/WELCOME/INITIATE/READY command messages that
//! authenticate the connection.
//!
//! Neither component owns a thread or blocks: `Ok(None)` from the decoder
//! and [`ZmtpError::WouldBlock`] from the mechanism bounce control back to
//! the reactor driving them.

// Allow some pedantic lints
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)] // Will add gradually
#![allow(clippy::doc_markdown)] // Too many false positives

pub mod command;
pub mod decoder;
pub mod error;
pub mod events;
pub mod mechanism;
pub mod utils;

// Re-export the main types for clean API
pub use decoder::{DecoderOptions, V2Decoder};
pub use error::{Result, ZmtpError};
pub use mechanism::plain_client::PlainClient;
pub use mechanism::{Mechanism, MechanismStatus, PlainCredentials};

/// Prelude module for convenient imports
///
/// ```rust
/// use longeron_zmtp::prelude::*;
/// ```
pub mod prelude {
    pub use super::decoder::{DecoderOptions, V2Decoder};
    pub use super::error::ZmtpError;
    pub use super::mechanism::plain_client::PlainClient;
    pub use super::mechanism::{Mechanism, MechanismStatus, PlainCredentials};
    pub use bytes::Bytes;
    pub use longeron_core::msg::Msg;
}

//! Wire protocol for Mapcast.
//!
//! This crate defines the "language" the map server and its browser
//! clients speak over the real-time channel:
//!
//! - **Types** ([`ActivityId`], [`ClientMessage`], [`ServerMessage`],
//!   [`Frame`]): the messages that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`PipeCodec`]): how those messages are
//!   turned into text frames and back.
//! - **Errors** ([`ProtocolError`]): why an inbound frame was not
//!   understood.
//!
//! # Frame format
//!
//! Every frame is UTF-8 text, fields separated by `|`, the first field
//! always being the integer activity code:
//!
//! ```text
//! 1|<sessionToken>                               client → server
//! 101|<id>|<name>|<url>|<lat>|<lng>               server → client
//! 105|<id>|<name>|<description>|<geometryJson>    server → client
//! ```
//!
//! The protocol layer knows nothing about connections or sessions; it only
//! converts between frames and typed messages.

mod codec;
mod error;
mod types;

pub use codec::{Codec, PipeCodec};
pub use error::ProtocolError;
pub use types::{ActivityId, ClientMessage, Frame, ServerMessage, FIELD_SEPARATOR};

//! Wire protocol for felt.
//!
//! This crate defines what travels between a table server and its
//! clients:
//!
//! - **Types** ([`Packet`], [`ErrorCode`], [`PlayerId`], [`Recipient`]):
//!   the messages and identifiers.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how a packet becomes
//!   bytes and back.
//! - **Framing** ([`encode_frame`], [`FrameBuffer`]): how those bytes are
//!   delimited on a stream socket.
//!
//! The server core only relies on "a packet can be cloned and handed to
//! the sender"; everything byte-level lives here.

mod codec;
mod error;
mod frame;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use frame::{encode_frame, FrameBuffer, DEFAULT_MAX_FRAME_LEN};
pub use types::{
    ErrorCode, Packet, PlayerId, Recipient, SessionId, PROTOCOL_VERSION,
};

//! # rawpanel-protocol
//!
//! Wire protocol implementation for Raw Panel control surfaces.
//!
//! This crate provides:
//! - The typed message model (inbound/outbound messages and their records)
//! - The ASCII line codec, including the multi-line graphics reassembly
//! - Binary framing with a little-endian length prefix
//!
//! A panel speaks one of two wire encodings over plain TCP: newline-delimited
//! ASCII commands, or length-prefixed binary frames carrying a serialized
//! message. Both map onto the same [`message`] model.

pub mod ascii;
pub mod error;
pub mod frame;
pub mod message;

pub use ascii::{decode_inbound, decode_outbound, encode_inbound, encode_outbound, InboundDecoder};
pub use error::ProtocolError;
pub use frame::{Decoder, Encoder, FRAME_HEADER_SIZE};
pub use message::{Command, HwcEvent, HwcState, InboundMessage, OutboundMessage};

/// Default TCP port a Raw Panel device listens on.
pub const DEFAULT_PORT: u16 = 9923;

/// Maximum accepted binary frame payload size in bytes.
///
/// A declared length at or above this is treated as garbage framing (a
/// misaligned read interpreting payload bytes as a length) and is fatal for
/// the connection attempt.
pub const MAX_FRAME_PAYLOAD: u32 = 500_000;

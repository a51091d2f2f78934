//! Binary frame format.
//!
//! Frame layout (4-byte header + payload):
//!
//! ```text
//! +--------------------+---------------------+
//! | length (u32, LE)   | payload             |
//! | 4 bytes            | length bytes        |
//! +--------------------+---------------------+
//! ```
//!
//! The payload is the JSON serialization of an [`InboundMessage`] or
//! [`OutboundMessage`]. There is no checksum or delimiter beyond the length
//! prefix, so a declared length at or above [`MAX_FRAME_PAYLOAD`](crate::MAX_FRAME_PAYLOAD)
//! is treated as misaligned framing and rejected before any allocation.

use crate::error::ProtocolError;
use crate::message::{InboundMessage, OutboundMessage};
use crate::MAX_FRAME_PAYLOAD;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Size of the frame header in bytes.
pub const FRAME_HEADER_SIZE: usize = 4;

/// Encodes a raw payload into a length-prefixed frame.
pub fn encode_frame(payload: &[u8]) -> Result<BytesMut, ProtocolError> {
    let payload_len = payload.len() as u32;
    if payload_len >= MAX_FRAME_PAYLOAD {
        return Err(ProtocolError::FrameTooLarge {
            size: payload_len,
            max: MAX_FRAME_PAYLOAD,
        });
    }

    let mut buf = BytesMut::with_capacity(FRAME_HEADER_SIZE + payload.len());
    buf.put_u32_le(payload_len);
    buf.put_slice(payload);
    Ok(buf)
}

/// Decodes a frame payload from the buffer.
///
/// Returns `Ok(Some(payload))` if a complete frame was buffered,
/// `Ok(None)` if more data is needed, or `Err` on an oversized length.
pub fn decode_frame(buf: &mut BytesMut) -> Result<Option<Bytes>, ProtocolError> {
    if buf.len() < FRAME_HEADER_SIZE {
        return Ok(None);
    }

    // Peek at the length without consuming; the cap check must happen before
    // any attempt to buffer that many bytes.
    let payload_len = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
    if payload_len >= MAX_FRAME_PAYLOAD {
        return Err(ProtocolError::FrameTooLarge {
            size: payload_len,
            max: MAX_FRAME_PAYLOAD,
        });
    }

    let total_len = FRAME_HEADER_SIZE + payload_len as usize;
    if buf.len() < total_len {
        return Ok(None);
    }

    buf.advance(FRAME_HEADER_SIZE);
    Ok(Some(buf.split_to(payload_len as usize).freeze()))
}

/// Encodes messages into binary frames.
pub struct Encoder;

impl Encoder {
    /// Encodes an inbound message into a frame.
    pub fn encode_inbound(msg: &InboundMessage) -> Result<BytesMut, ProtocolError> {
        let payload = serde_json::to_vec(msg)?;
        encode_frame(&payload)
    }

    /// Encodes an outbound message into a frame.
    pub fn encode_outbound(msg: &OutboundMessage) -> Result<BytesMut, ProtocolError> {
        let payload = serde_json::to_vec(msg)?;
        encode_frame(&payload)
    }
}

/// Incremental decoder for binary frames.
///
/// Feed raw socket bytes with [`extend`](Decoder::extend), then drain
/// complete messages until a decode call returns `Ok(None)`.
pub struct Decoder {
    buffer: BytesMut,
}

impl Decoder {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(8192),
        }
    }

    /// Appends data to the internal buffer.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Attempts to decode the next frame payload from the buffer.
    pub fn decode_frame(&mut self) -> Result<Option<Bytes>, ProtocolError> {
        decode_frame(&mut self.buffer)
    }

    /// Attempts to decode the next inbound message from the buffer.
    pub fn decode_inbound(&mut self) -> Result<Option<InboundMessage>, ProtocolError> {
        match self.decode_frame()? {
            Some(payload) => {
                let msg: InboundMessage = serde_json::from_slice(&payload)?;
                Ok(Some(msg))
            }
            None => Ok(None),
        }
    }

    /// Attempts to decode the next outbound message from the buffer.
    pub fn decode_outbound(&mut self) -> Result<Option<OutboundMessage>, ProtocolError> {
        match self.decode_frame()? {
            Some(payload) => {
                let msg: OutboundMessage = serde_json::from_slice(&payload)?;
                Ok(Some(msg))
            }
            None => Ok(None),
        }
    }

    /// Returns the number of bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Clears the internal buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{InboundFlow, OutboundFlow};

    #[test]
    fn test_frame_roundtrip() {
        let msg = InboundMessage::ping();
        let encoded = Encoder::encode_inbound(&msg).unwrap();

        // Header declares the payload length.
        let declared = u32::from_le_bytes([encoded[0], encoded[1], encoded[2], encoded[3]]);
        assert_eq!(declared as usize, encoded.len() - FRAME_HEADER_SIZE);

        let mut decoder = Decoder::new();
        decoder.extend(&encoded);
        let decoded = decoder.decode_inbound().unwrap().unwrap();
        assert_eq!(decoded.flow, InboundFlow::Ping);
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_partial_frame_decoding() {
        let msg = OutboundMessage::ack();
        let encoded = Encoder::encode_outbound(&msg).unwrap();

        let mut decoder = Decoder::new();
        decoder.extend(&encoded[..3]);
        assert!(decoder.decode_outbound().unwrap().is_none());

        decoder.extend(&encoded[3..]);
        let decoded = decoder.decode_outbound().unwrap().unwrap();
        assert_eq!(decoded.flow, OutboundFlow::Ack);
    }

    #[test]
    fn test_oversized_length_rejected_before_read() {
        // A header declaring 600,000 bytes must error immediately, without
        // waiting for (or allocating) the declared payload.
        let mut decoder = Decoder::new();
        decoder.extend(&600_000u32.to_le_bytes());
        decoder.extend(b"garbage");

        let result = decoder.decode_frame();
        assert!(matches!(result, Err(ProtocolError::FrameTooLarge { size: 600_000, .. })));
    }

    #[test]
    fn test_encode_oversized_payload() {
        let payload = vec![0u8; MAX_FRAME_PAYLOAD as usize];
        let result = encode_frame(&payload);
        assert!(matches!(result, Err(ProtocolError::FrameTooLarge { .. })));
    }

    #[test]
    fn test_multiple_frames_in_buffer() {
        let mut decoder = Decoder::new();
        decoder.extend(&Encoder::encode_inbound(&InboundMessage::ping()).unwrap());
        decoder.extend(&Encoder::encode_inbound(&InboundMessage::ack()).unwrap());

        assert_eq!(decoder.decode_inbound().unwrap().unwrap().flow, InboundFlow::Ping);
        assert_eq!(decoder.decode_inbound().unwrap().unwrap().flow, InboundFlow::Ack);
        assert!(decoder.decode_inbound().unwrap().is_none());
    }

    #[test]
    fn test_empty_payload_frame() {
        let mut buf = encode_frame(b"").unwrap();
        let payload = decode_frame(&mut buf).unwrap().unwrap();
        assert!(payload.is_empty());
    }
}

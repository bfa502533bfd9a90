//! Length-prefixed framing for stream sockets.
//!
//! Every frame is a 4-byte big-endian payload length followed by the
//! payload. A readiness wake-up can deliver half a frame or several
//! frames at once, so the receiving side accumulates bytes in a
//! [`FrameBuffer`] and pulls complete frames out of it.

use crate::ProtocolError;

/// Size of the length prefix in bytes.
const HEADER_LEN: usize = 4;

/// Default upper bound for a single frame's payload.
pub const DEFAULT_MAX_FRAME_LEN: usize = 64 * 1024;

/// Prepends the length header to a payload.
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(payload);
    frame
}

/// Accumulates received bytes and yields complete frames.
#[derive(Debug)]
pub struct FrameBuffer {
    buf: Vec<u8>,
    max_len: usize,
}

impl FrameBuffer {
    /// Creates an empty buffer that rejects payloads above `max_len`.
    pub fn new(max_len: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_len,
        }
    }

    /// Appends freshly received bytes.
    pub fn extend(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Removes and returns the next complete frame's payload.
    ///
    /// Returns `Ok(None)` while the buffered bytes don't yet hold a full
    /// frame.
    ///
    /// # Errors
    /// [`ProtocolError::FrameTooLarge`] as soon as a header announces a
    /// payload above the limit, before waiting for the payload itself.
    pub fn next_frame(&mut self) -> Result<Option<Vec<u8>>, ProtocolError> {
        let Some(header) = self.buf.get(..HEADER_LEN) else {
            return Ok(None);
        };
        let len = u32::from_be_bytes([header[0], header[1], header[2], header[3]])
            as usize;
        if len > self.max_len {
            return Err(ProtocolError::FrameTooLarge {
                len,
                max: self.max_len,
            });
        }
        if self.buf.len() < HEADER_LEN + len {
            return Ok(None);
        }
        let payload = self.buf[HEADER_LEN..HEADER_LEN + len].to_vec();
        self.buf.drain(..HEADER_LEN + len);
        Ok(Some(payload))
    }

    /// Number of buffered bytes not yet returned as frames.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_LEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_frame_prefixes_big_endian_length() {
        let frame = encode_frame(b"abc");
        assert_eq!(frame, vec![0, 0, 0, 3, b'a', b'b', b'c']);
    }

    #[test]
    fn test_next_frame_waits_for_partial_header() {
        let mut buf = FrameBuffer::default();
        buf.extend(&[0, 0]);
        assert_eq!(buf.next_frame().unwrap(), None);
        assert_eq!(buf.buffered(), 2);
    }

    #[test]
    fn test_next_frame_waits_for_partial_payload() {
        let mut buf = FrameBuffer::default();
        let frame = encode_frame(b"hello");
        buf.extend(&frame[..6]);
        assert_eq!(buf.next_frame().unwrap(), None);

        buf.extend(&frame[6..]);
        assert_eq!(buf.next_frame().unwrap(), Some(b"hello".to_vec()));
        assert_eq!(buf.buffered(), 0);
    }

    #[test]
    fn test_next_frame_splits_back_to_back_frames() {
        let mut buf = FrameBuffer::default();
        let mut bytes = encode_frame(b"one");
        bytes.extend(encode_frame(b""));
        bytes.extend(encode_frame(b"three"));
        buf.extend(&bytes);

        assert_eq!(buf.next_frame().unwrap(), Some(b"one".to_vec()));
        assert_eq!(buf.next_frame().unwrap(), Some(Vec::new()));
        assert_eq!(buf.next_frame().unwrap(), Some(b"three".to_vec()));
        assert_eq!(buf.next_frame().unwrap(), None);
    }

    #[test]
    fn test_next_frame_rejects_oversized_header_early() {
        let mut buf = FrameBuffer::new(8);
        buf.extend(&(9u32).to_be_bytes());

        let err = buf.next_frame().unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::FrameTooLarge { len: 9, max: 8 }
        ));
    }
}

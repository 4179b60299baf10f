//! IRC line codec: frames a TCP byte stream into raw protocol lines.
//!
//! Splits on `\r\n` (per RFC 2812) without interpreting the line, and
//! serializes outgoing lines truncated to the 512-byte frame limit.

use bytes::{BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Maximum frame size, terminator included (RFC 2812).
pub const MAX_FRAME_LEN: usize = 512;

/// Frame terminator.
pub const CRLF: &[u8] = b"\r\n";

/// Largest payload that fits in a frame once the terminator is appended.
pub const MAX_PAYLOAD_LEN: usize = MAX_FRAME_LEN - CRLF.len();

/// Upper bound on a buffered fragment that has not seen a terminator yet.
/// Servers with IRCv3 `message-tags` may legally send up to 8191 bytes.
const MAX_BUFFERED_LEN: usize = 8191;

/// Codec error: either an overlong inbound line or an I/O error.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("line exceeds maximum length ({MAX_BUFFERED_LEN} bytes)")]
    LineTooLong,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// One complete inbound frame, terminator included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine(Bytes);

impl RawLine {
    /// The frame bytes, including the trailing `\r\n`.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The line text without its terminator. Invalid UTF-8 is replaced.
    pub fn text(&self) -> String {
        let frame = self.as_bytes();
        let body = frame.strip_suffix(CRLF).unwrap_or(frame);
        String::from_utf8_lossy(body).into_owned()
    }
}

/// A tokio codec that frames raw lines on `\r\n` boundaries.
///
/// Any bytes after the last terminator stay in the read buffer until the
/// next read completes them, so a line is never split or dropped no matter
/// how the stream is chunked.
#[derive(Debug, Default)]
pub struct LineCodec;

impl Decoder for LineCodec {
    type Item = RawLine;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match src.windows(2).position(|w| w == CRLF) {
            Some(pos) => Ok(Some(RawLine(src.split_to(pos + CRLF.len()).freeze()))),
            None => {
                if src.len() > MAX_BUFFERED_LEN {
                    return Err(CodecError::LineTooLong);
                }
                Ok(None)
            }
        }
    }
}

impl Encoder<&str> for LineCodec {
    type Error = CodecError;

    fn encode(&mut self, item: &str, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let payload = frame_payload(item);
        dst.reserve(payload.len() + CRLF.len());
        dst.put_slice(payload.as_bytes());
        dst.put_slice(CRLF);
        Ok(())
    }
}

/// The part of `line` that goes on the wire: everything before the first
/// embedded CR or LF, cut to [`MAX_PAYLOAD_LEN`] bytes on a char boundary.
pub fn frame_payload(line: &str) -> &str {
    let line = line.split(['\r', '\n']).next().unwrap_or("");
    &line[..floor_char_boundary(line, MAX_PAYLOAD_LEN)]
}

/// Largest index `<= max` that lies on a UTF-8 char boundary of `s`.
pub fn floor_char_boundary(s: &str, max: usize) -> usize {
    if max >= s.len() {
        return s.len();
    }
    let mut idx = max;
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::error::{FrameError, Result};

/// Frame start marker.
pub const START: u8 = b'S';

/// Frame end marker.
pub const END: u8 = b'E';

/// Bound on the bytes scanned for an end marker after a start marker.
///
/// The scan window includes the terminator, so the longest payload that can
/// be emitted is `MAX_FRAME_PAYLOAD - 1` bytes. A frame that runs past the
/// window without terminating is discarded wholesale.
pub const MAX_FRAME_PAYLOAD: usize = 512;

/// Encode a payload into the wire format.
///
/// Wire format:
/// ```text
/// ┌────────────┬─────────────────────────┬────────────┐
/// │ START (1B) │ Payload (0..512 bytes)  │ END (1B)   │
/// │ 'S' 0x53   │ text, END-free          │ 'E' 0x45   │
/// └────────────┴─────────────────────────┴────────────┘
/// ```
///
/// There is no escaping: a payload containing the END byte will corrupt
/// framing on the receiving side. Callers on this link only ever send ASCII
/// decimal fields and commas, which keeps that from arising in practice.
pub fn encode_message(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() >= MAX_FRAME_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_FRAME_PAYLOAD - 1,
        });
    }
    dst.reserve(payload.len() + 2);
    dst.put_u8(START);
    dst.put_slice(payload);
    dst.put_u8(END);
    Ok(())
}

/// Decode the next message from a buffer.
///
/// Returns `None` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes (markers included) from the buffer
/// and returns the payload.
///
/// Decoding never fails. Bytes before a start marker are garbage and get
/// discarded; a frame whose payload runs past [`MAX_FRAME_PAYLOAD`] bytes
/// without an end marker is dropped and scanning resumes after it. Dropped
/// frames are a policy decision, not an error — the link stays up and the
/// decoder resynchronizes on the next start marker.
pub fn decode_message(src: &mut BytesMut) -> Option<Bytes> {
    loop {
        let start = match src.iter().position(|&b| b == START) {
            Some(index) => index,
            None => {
                // Nothing but garbage; drop it so the buffer stays bounded.
                src.clear();
                return None;
            }
        };

        let body = &src[start + 1..];
        let window = body.len().min(MAX_FRAME_PAYLOAD);

        if let Some(end) = body[..window].iter().position(|&b| b == END) {
            src.advance(start + 1);
            let payload = src.split_to(end).freeze();
            src.advance(1); // the END marker
            return Some(payload);
        }

        if body.len() >= MAX_FRAME_PAYLOAD {
            // Unterminated oversized frame: discard the whole window and
            // resume scanning for the next start marker.
            trace!(dropped = MAX_FRAME_PAYLOAD, "discarding unterminated frame");
            src.advance(start + 1 + MAX_FRAME_PAYLOAD);
            continue;
        }

        // Partial frame; keep the start marker and wait for more bytes.
        src.advance(start);
        return None;
    }
}

//! Delimiter-based text message framing for the rover control link.
//!
//! Every message on the wire is a short text payload between two marker
//! bytes: `'S' <payload> 'E'`. There is no escaping — the payload must not
//! contain the end marker. Both ends of the link agree on the markers
//! statically; nothing is negotiated.
//!
//! The decoder is deliberately lenient: bytes outside a frame are skipped,
//! and a frame that exceeds the payload bound without a terminator is
//! silently discarded so that decoding can resynchronize on the next
//! well-formed frame.

pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

pub use codec::{decode_message, encode_message, END, MAX_FRAME_PAYLOAD, START};
pub use error::{FrameError, Result};
pub use reader::MessageReader;
pub use writer::MessageWriter;

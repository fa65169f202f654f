use std::io::{ErrorKind, Write};

use bytes::BytesMut;

use crate::codec::encode_message;
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 1024;

/// Writes complete framed messages to any `Write` stream.
pub struct MessageWriter<T> {
    inner: T,
    buf: BytesMut,
}

impl<T: Write> MessageWriter<T> {
    /// Create a new message writer.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Frame and send a payload (blocking).
    pub fn send(&mut self, payload: &str) -> Result<()> {
        self.buf.clear();
        encode_message(payload.as_bytes(), &mut self.buf)?;

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::MAX_FRAME_PAYLOAD;
    use crate::reader::MessageReader;

    #[test]
    fn send_writes_framed_bytes() {
        let mut writer = MessageWriter::new(Vec::new());
        writer.send("1,128,0,64").unwrap();
        assert_eq!(writer.get_ref().as_slice(), b"S1,128,0,64E");
    }

    #[test]
    fn send_rejects_oversized_payload() {
        let mut writer = MessageWriter::new(Vec::new());
        let payload = "0".repeat(MAX_FRAME_PAYLOAD);
        let err = writer.send(&payload).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
        assert!(writer.get_ref().is_empty(), "nothing must hit the wire");
    }

    #[test]
    #[cfg(unix)]
    fn roundtrip_over_socketpair() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = MessageWriter::new(left);
        let mut reader = MessageReader::new(right);

        writer.send("0,0,0,0").unwrap();
        writer.send("1,255,1,255").unwrap();

        assert_eq!(reader.read_message().unwrap(), "0,0,0,0");
        assert_eq!(reader.read_message().unwrap(), "1,255,1,255");
    }
}

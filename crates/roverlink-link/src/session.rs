use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use roverlink_frame::{MessageReader, MessageWriter};
use roverlink_transport::LinkStream;
use tracing::debug;

/// One live connection to the peer.
///
/// The session holds the writing half and a shutdown handle; the matching
/// [`MessageReader`] is split off once at open time and moves to the receive
/// thread. The session is exclusively owned by the link manager and closed
/// exactly once — [`close`](Session::close) is idempotent and best-effort,
/// since a broken link has nothing actionable left to report.
pub struct Session {
    peer: String,
    writer: MessageWriter<LinkStream>,
    shutdown: Arc<ShutdownHandle>,
}

struct ShutdownHandle {
    stream: LinkStream,
    closed: AtomicBool,
}

impl Session {
    /// Wrap an established stream, splitting off the reader for the receive
    /// thread.
    pub fn open(stream: LinkStream) -> roverlink_transport::Result<(Self, MessageReader<LinkStream>)> {
        let peer = stream.peer_label();
        let reader = MessageReader::new(stream.try_clone()?);
        let shutdown = Arc::new(ShutdownHandle {
            stream: stream.try_clone()?,
            closed: AtomicBool::new(false),
        });
        let session = Self {
            peer,
            writer: MessageWriter::new(stream),
            shutdown,
        };
        Ok((session, reader))
    }

    /// Diagnostic label of the remote endpoint.
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Frame and write a payload (blocking).
    pub fn write(&mut self, payload: &str) -> roverlink_frame::Result<()> {
        self.writer.send(payload)
    }

    /// Close the connection, unblocking any thread reading it.
    ///
    /// Safe to call more than once; only the first call shuts the stream
    /// down, and shutdown errors are swallowed.
    pub fn close(&self) {
        if !self.shutdown.closed.swap(true, Ordering::SeqCst) {
            debug!(peer = %self.peer, "closing session");
            let _ = self.shutdown.stream.shutdown();
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::io::{Read, Write};
    use std::os::unix::net::UnixStream;

    use super::*;

    fn pair() -> (LinkStream, UnixStream) {
        let (near, far) = UnixStream::pair().unwrap();
        (LinkStream::from(near), far)
    }

    #[test]
    fn write_reaches_far_end_framed() {
        let (near, mut far) = pair();
        let (mut session, _reader) = Session::open(near).unwrap();

        session.write("1,128,0,64").unwrap();

        let mut buf = [0u8; 12];
        far.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"S1,128,0,64E");
    }

    #[test]
    fn reader_half_decodes_inbound() {
        let (near, mut far) = pair();
        let (_session, mut reader) = Session::open(near).unwrap();

        far.write_all(b"S9,9E").unwrap();
        assert_eq!(reader.read_message().unwrap(), "9,9");
    }

    #[test]
    fn close_unblocks_reader() {
        let (near, _far) = pair();
        let (session, mut reader) = Session::open(near).unwrap();

        let handle = std::thread::spawn(move || reader.read_message());
        std::thread::sleep(std::time::Duration::from_millis(50));
        session.close();

        assert!(handle.join().unwrap().is_err());
    }

    #[test]
    fn double_close_is_harmless() {
        let (near, _far) = pair();
        let (session, _reader) = Session::open(near).unwrap();
        session.close();
        session.close();
    }
}

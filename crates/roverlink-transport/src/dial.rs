use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::stream::LinkStream;

/// Address prefix selecting the Unix domain socket transport.
const UNIX_SCHEME: &str = "unix:";

/// Dial a peer address (blocking).
///
/// The address is an opaque string supplied by the caller:
/// - `unix:<path>` connects to a Unix domain socket at `<path>` (Unix only)
/// - anything else is treated as a TCP `host:port`
pub fn dial(address: &str) -> Result<LinkStream> {
    dial_inner(address, None)
}

/// Dial a peer address with a bound on the TCP connect (blocking).
///
/// A connector thread that has been abandoned by its owner should not sit
/// in a dial indefinitely; the timeout guarantees it winds down.
pub fn dial_timeout(address: &str, timeout: Duration) -> Result<LinkStream> {
    dial_inner(address, Some(timeout))
}

fn dial_inner(address: &str, timeout: Option<Duration>) -> Result<LinkStream> {
    if let Some(path) = address.strip_prefix(UNIX_SCHEME) {
        return dial_unix(address, path);
    }
    dial_tcp(address, timeout)
}

fn dial_tcp(address: &str, timeout: Option<Duration>) -> Result<LinkStream> {
    let addrs: Vec<_> = address
        .to_socket_addrs()
        .map_err(|e| TransportError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })?
        .collect();

    if addrs.is_empty() {
        return Err(TransportError::InvalidAddress {
            address: address.to_string(),
            reason: "address resolved to nothing".to_string(),
        });
    }

    let mut last_err = None;
    for addr in addrs {
        let attempt = match timeout {
            Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
            None => TcpStream::connect(addr),
        };
        match attempt {
            Ok(stream) => {
                // Keep command latency low; frames are tiny.
                let _ = stream.set_nodelay(true);
                debug!(%address, %addr, "dialed tcp peer");
                return Ok(LinkStream::from(stream));
            }
            Err(e) => last_err = Some(e),
        }
    }

    Err(TransportError::Dial {
        address: address.to_string(),
        source: last_err.unwrap_or_else(|| std::io::Error::other("dial failed")),
    })
}

#[cfg(unix)]
fn dial_unix(address: &str, path: &str) -> Result<LinkStream> {
    let stream =
        std::os::unix::net::UnixStream::connect(path).map_err(|e| TransportError::Dial {
            address: address.to_string(),
            source: e,
        })?;
    debug!(%address, "dialed unix peer");
    Ok(LinkStream::from(stream))
}

#[cfg(not(unix))]
fn dial_unix(address: &str, _path: &str) -> Result<LinkStream> {
    Err(TransportError::InvalidAddress {
        address: address.to_string(),
        reason: "unix transport is not available on this platform".to_string(),
    })
}

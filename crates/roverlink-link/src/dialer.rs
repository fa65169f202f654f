use std::time::Duration;

use roverlink_transport::{dial_timeout, LinkStream, Result};

/// The seam between the link manager and a concrete transport.
///
/// The production impl dials TCP or Unix sockets; a Bluetooth RFCOMM impl
/// would also cancel any ongoing device discovery here before dialing.
/// Tests substitute stub dialers to drive the manager's state machine.
pub trait Dialer: Send + Sync + 'static {
    /// Dial a peer address (blocking). Runs on a connector thread.
    fn dial(&self, address: &str) -> Result<LinkStream>;
}

/// Dials over the transports in `roverlink-transport` (TCP, `unix:` paths).
#[derive(Debug, Clone)]
pub struct NetDialer {
    /// Bound on the TCP connect so an abandoned connector thread winds down.
    pub connect_timeout: Duration,
}

impl Default for NetDialer {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl Dialer for NetDialer {
    fn dial(&self, address: &str) -> Result<LinkStream> {
        dial_timeout(address, self.connect_timeout)
    }
}

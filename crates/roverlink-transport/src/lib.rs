//! Byte-stream transports for the rover control link.
//!
//! A link runs over any connected, stream-oriented transport. This crate
//! provides the concrete ones: TCP everywhere, Unix domain sockets on Unix.
//! Everything above this layer only sees a [`LinkStream`].

pub mod dial;
pub mod error;
pub mod stream;

pub use dial::{dial, dial_timeout};
pub use error::{Result, TransportError};
pub use stream::LinkStream;

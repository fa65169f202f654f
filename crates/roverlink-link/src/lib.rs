//! Serial link manager for the rover remote-control client.
//!
//! The [`LinkManager`] owns one outbound connection to a peer device: it
//! dials, frames outgoing drive commands, decodes inbound status messages
//! on a dedicated receive thread, and tears everything down deterministically
//! on fault or on request. Callers observe the link through an ordered
//! [`LinkEvent`] stream and drive it through `connect` / `send` / `stop`.
//!
//! No discovery, no authentication, no reconnect policy — the caller supplies
//! an already-identified peer address and decides when to retry.

pub mod command;
pub mod dialer;
pub mod event;
pub mod manager;
pub mod session;

pub use command::{DriveCommand, ParseCommandError, Stick};
pub use dialer::{Dialer, NetDialer};
pub use event::{event_channel, EventSender, LinkEvent, LinkState, Notice};
pub use manager::LinkManager;
pub use session::Session;

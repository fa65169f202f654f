use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

use clap::{Args, Subcommand};
use roverlink_link::{event_channel, LinkEvent, LinkManager, LinkState, NetDialer, Notice};

use crate::exit::{CliError, CliResult, TIMEOUT, TRANSPORT_ERROR};
use crate::output::OutputFormat;

pub mod drive;
pub mod monitor;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect and send drive commands on a fixed cadence.
    Drive(DriveArgs),
    /// Connect and print every message the peer sends.
    Monitor(MonitorArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Drive(args) => drive::run(args, format),
        Command::Monitor(args) => monitor::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct DriveArgs {
    /// Peer address (`host:port`, or `unix:<path>`).
    pub address: String,
    /// Left motor direction (0 reverse, 1 forward).
    #[arg(long, default_value_t = 1)]
    pub left_dir: u8,
    /// Left motor speed (0-255).
    #[arg(long, default_value_t = 0)]
    pub left_speed: u8,
    /// Right motor direction (0 reverse, 1 forward).
    #[arg(long, default_value_t = 1)]
    pub right_dir: u8,
    /// Right motor speed (0-255).
    #[arg(long, default_value_t = 0)]
    pub right_speed: u8,
    /// How many times to send the command.
    #[arg(long, default_value_t = 1)]
    pub repeat: u32,
    /// Delay between sends, in milliseconds.
    #[arg(long, default_value_t = 100)]
    pub interval_ms: u64,
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// Peer address (`host:port`, or `unix:<path>`).
    pub address: String,
    /// Stop after printing this many messages.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Print extended build metadata.
    #[arg(long)]
    pub extended: bool,
}

/// Bound on waiting for the link to come up (the dialer itself times out
/// sooner).
const CONNECT_WAIT: Duration = Duration::from_secs(15);

/// Dial a peer and wait for the link to reach `Connected`.
pub(crate) fn establish(address: &str) -> CliResult<(LinkManager, Receiver<LinkEvent>)> {
    let (events, rx) = event_channel();
    let manager = LinkManager::new(NetDialer::default(), events);
    manager.connect(address);

    loop {
        match rx.recv_timeout(CONNECT_WAIT) {
            Ok(LinkEvent::StateChanged(LinkState::Connected)) => return Ok((manager, rx)),
            Ok(LinkEvent::Notice(Notice::ConnectFailed)) => {
                return Err(CliError::new(
                    TRANSPORT_ERROR,
                    format!("could not connect to {address}"),
                ));
            }
            Ok(_) => continue,
            Err(RecvTimeoutError::Timeout) => {
                return Err(CliError::new(
                    TIMEOUT,
                    format!("timed out connecting to {address}"),
                ));
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(CliError::new(
                    crate::exit::INTERNAL,
                    "link event channel closed unexpectedly",
                ));
            }
        }
    }
}

use std::time::Duration;

use roverlink_link::{DriveCommand, LinkEvent, Notice};
use tracing::info;

use crate::cmd::{establish, DriveArgs};
use crate::exit::{CliError, CliResult, SUCCESS, TRANSPORT_ERROR, USAGE};
use crate::output::{print_message, OutputFormat};

pub fn run(args: DriveArgs, format: OutputFormat) -> CliResult<i32> {
    if args.left_dir > 1 || args.right_dir > 1 {
        return Err(CliError::new(USAGE, "direction must be 0 or 1"));
    }
    if args.repeat == 0 {
        return Err(CliError::new(USAGE, "--repeat must be greater than zero"));
    }

    let command = DriveCommand::new(
        args.left_dir,
        args.left_speed,
        args.right_dir,
        args.right_speed,
    );

    let (manager, rx) = establish(&args.address)?;
    info!(address = %args.address, command = %command, repeat = args.repeat, "driving");

    for sent in 0..args.repeat {
        manager.send(&command);

        // Relay whatever the peer reported between sends.
        while let Ok(event) = rx.try_recv() {
            match event {
                LinkEvent::MessageReceived(message) => {
                    print_message(&args.address, &message, format);
                }
                LinkEvent::Notice(Notice::LinkLost) => {
                    return Err(CliError::new(TRANSPORT_ERROR, "link lost"));
                }
                _ => {}
            }
        }

        if sent + 1 < args.repeat {
            std::thread::sleep(Duration::from_millis(args.interval_ms));
        }
    }

    manager.stop();
    Ok(SUCCESS)
}

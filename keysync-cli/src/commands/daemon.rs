//! `keysync daemon`: run or talk to the background watcher.

use std::path::Path;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;

use keysync_daemon::{start_blocking, DaemonClient, DaemonError, DaemonStatus};

use crate::DirectionArg;

#[derive(Subcommand, Debug)]
pub enum DaemonCommand {
    /// Run daemon in foreground (watchers + socket server).
    Start,
    /// Request graceful daemon shutdown over Unix socket.
    Stop,
    /// Query daemon runtime status over Unix socket.
    Status,
    /// Queue one transaction on the running daemon and wait for it.
    Sync(DaemonSyncArgs),
}

#[derive(Args, Debug)]
pub struct DaemonSyncArgs {
    #[arg(long, short = 'd')]
    pub direction: DirectionArg,
}

/// `daemon status` output. A stopped daemon only reports its socket.
#[derive(Debug, Serialize)]
struct StatusView<'a> {
    running: bool,
    /// Already part of `status` when the daemon answered.
    #[serde(skip_serializing_if = "Option::is_none")]
    socket: Option<&'a Path>,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    status: Option<DaemonStatus>,
}

pub fn run(command: DaemonCommand) -> Result<()> {
    let home = dirs::home_dir().context("could not determine home directory")?;
    let client = DaemonClient::new(&home);

    match command {
        DaemonCommand::Start => {
            start_blocking(&home).context("daemon exited with error")?;
        }
        DaemonCommand::Stop => match client.stop() {
            Ok(()) => println!("daemon stop requested"),
            Err(DaemonError::NotRunning { .. }) => println!("daemon is not running"),
            Err(err) => return Err(err).context("failed to stop daemon"),
        },
        DaemonCommand::Status => {
            let status = match client.status() {
                Ok(status) => Some(status),
                Err(DaemonError::NotRunning { .. }) => None,
                Err(err) => return Err(err).context("failed to query daemon status"),
            };
            print_json(&StatusView {
                running: status.is_some(),
                socket: status.is_none().then(|| client.socket()),
                status,
            })?;
        }
        DaemonCommand::Sync(args) => {
            let summary = client
                .sync(args.direction.0)
                .with_context(|| format!("daemon {} sync failed", args.direction))?;
            print_json(&summary)?;
        }
    }

    Ok(())
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("failed to render daemon JSON")?
    );
    Ok(())
}

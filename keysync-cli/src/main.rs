//! keysync: keep an editor's keybindings and a shared keymap in step.
//!
//! # Usage
//!
//! ```text
//! keysync init --editor <id> --native <path> --shared <path> --service-url <url>
//! keysync sync [--direction native|shared|bootstrap]
//! keysync status [--json]
//! keysync daemon start|stop|status|sync --direction <native|shared|bootstrap>
//! ```

mod commands;

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{daemon::DaemonCommand, init::InitArgs, status::StatusArgs, sync::SyncArgs};
use keysync_daemon::Trigger;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "keysync",
    version,
    about = "Sync editor keybindings with a shared keymap",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write ~/.keysync/config.yaml.
    Init(InitArgs),

    /// Run one sync transaction in this process.
    Sync(SyncArgs),

    /// Show configured files, their hashes, and whether the daemon runs.
    Status(StatusArgs),

    /// Run or control the background watcher.
    Daemon {
        #[command(subcommand)]
        command: DaemonCommand,
    },
}

// ---------------------------------------------------------------------------
// Shared direction argument
// ---------------------------------------------------------------------------

/// Thin wrapper so clap can parse a [`Trigger`] from CLI args.
#[derive(Debug, Clone, Copy)]
pub struct DirectionArg(pub Trigger);

impl Default for DirectionArg {
    fn default() -> Self {
        Self(Trigger::Native)
    }
}

impl FromStr for DirectionArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "native" => Ok(Self(Trigger::Native)),
            "shared" => Ok(Self(Trigger::Shared)),
            "bootstrap" => Ok(Self(Trigger::Bootstrap)),
            other => Err(format!(
                "unknown direction '{other}'; expected: native, shared, bootstrap"
            )),
        }
    }
}

impl fmt::Display for DirectionArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Init(args) => args.run(),
        Commands::Sync(args) => args.run(),
        Commands::Status(args) => args.run(),
        Commands::Daemon { command } => commands::daemon::run(command),
    }
}

//! `keysync sync` runs one transaction in-process, without the daemon.

use std::sync::{Mutex, PoisonError};

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::{ColoredString, Colorize};

use keysync_client::HttpTranslationClient;
use keysync_core::config;
use keysync_daemon::Trigger;
use keysync_sync::{
    DiskFileAccess, SkipReason, StatusReporter, SyncCoordinator, SyncOutcome, SyncPaths,
};

use crate::DirectionArg;

/// Arguments for `keysync sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// `native` pushes the editor file to the shared keymap, `shared` pulls the
    /// shared keymap into the editor file, `bootstrap` seeds a missing shared file.
    #[arg(long, short = 'd', default_value_t = DirectionArg::default())]
    pub direction: DirectionArg,
}

/// Holds status messages until the transaction's outcome decides how they print.
#[derive(Default)]
struct ConsoleReporter {
    messages: Mutex<Vec<String>>,
}

impl ConsoleReporter {
    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.messages.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl StatusReporter for ConsoleReporter {
    fn report(&self, message: &str) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
    }
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        init_cli_tracing();
        let home = dirs::home_dir().context("could not determine home directory")?;
        let config = config::load_at(&home).context("failed to load keysync config")?;

        let coordinator = SyncCoordinator::new(
            SyncPaths {
                native: config.native_path.clone(),
                shared: config.shared_path.clone(),
            },
            config.editor.clone(),
            DiskFileAccess::new(),
            HttpTranslationClient::from_config(&config),
            ConsoleReporter::default(),
        );

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("failed to start async runtime")?;
        let outcome = runtime.block_on(async {
            match self.direction.0 {
                Trigger::Native => coordinator.on_native_file_changed().await,
                Trigger::Shared => coordinator.on_shared_file_changed().await,
                Trigger::Bootstrap => coordinator.initialize_if_needed().await,
            }
        });

        let glyph = paint(&outcome);
        for message in coordinator.reporter().take() {
            if matches!(outcome, SyncOutcome::Failed { .. }) {
                eprintln!("{glyph} {message}");
            } else {
                println!("{glyph} {message}");
            }
        }

        match outcome {
            SyncOutcome::Written { path, .. } => {
                println!("  ✎  {}", path.display());
                Ok(())
            }
            SyncOutcome::Skipped(reason) => {
                println!("{glyph} {} sync skipped: {}", self.direction, skip_detail(reason));
                Ok(())
            }
            SyncOutcome::Failed { .. } => bail!("{} sync failed", self.direction),
        }
    }
}

fn marker(outcome: &SyncOutcome) -> &'static str {
    match outcome {
        SyncOutcome::Written { .. } => "✓",
        SyncOutcome::Skipped(_) => "·",
        SyncOutcome::Failed { .. } => "✗",
    }
}

fn paint(outcome: &SyncOutcome) -> ColoredString {
    let glyph = marker(outcome);
    match outcome {
        SyncOutcome::Written { .. } => glyph.green().bold(),
        SyncOutcome::Skipped(_) => glyph.bright_black(),
        SyncOutcome::Failed { .. } => glyph.red().bold(),
    }
}

fn skip_detail(reason: SkipReason) -> &'static str {
    match reason {
        SkipReason::Busy => "another sync is in progress",
        SkipReason::Unreadable => "source file is missing or unreadable",
        SkipReason::Echo => "source file holds our last write",
        SkipReason::NoKeymap => "service returned no keymap",
        SkipReason::NoChanges => "no keybinding changes",
        SkipReason::Identical => "editor file already up to date",
        SkipReason::NotNeeded => "nothing to bootstrap",
    }
}

fn init_cli_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn marker_follows_outcome_not_message_text() {
        let written = SyncOutcome::Written {
            path: PathBuf::from("keymap.yaml"),
            summary: "Failed entries removed".to_string(),
        };
        let failed = SyncOutcome::Failed {
            message: "service unreachable".to_string(),
        };

        assert_eq!(marker(&written), "✓");
        assert_eq!(marker(&failed), "✗");
        assert_eq!(marker(&SyncOutcome::Skipped(SkipReason::Echo)), "·");
    }

    #[test]
    fn reporter_hands_back_messages_once() {
        let reporter = ConsoleReporter::default();
        reporter.report("Failed to sync shared keymap to vscode keybindings: boom");
        reporter.report("second");

        assert_eq!(reporter.take().len(), 2);
        assert!(reporter.take().is_empty());
    }
}

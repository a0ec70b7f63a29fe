//! `keysync init --editor <id> --native <path> --shared <path> --service-url <url>`

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use keysync_core::config::{self, DEFAULT_DEBOUNCE_MS, DEFAULT_TIMEOUT_SECS};
use keysync_core::{ServiceConfig, SyncConfig};

/// Write the sync configuration. An existing config is left untouched.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Editor identifier passed to the translation service (e.g. "vscode").
    #[arg(long, short = 'e')]
    pub editor: String,

    /// The editor's keybinding file.
    #[arg(long, value_name = "PATH")]
    pub native: PathBuf,

    /// The shared keymap file.
    #[arg(long, value_name = "PATH")]
    pub shared: PathBuf,

    /// Base URL of the translation service.
    #[arg(long, value_name = "URL")]
    pub service_url: String,

    /// Bearer token for the translation service.
    #[arg(long)]
    pub token: Option<String>,

    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Quiet period before a file change is synced.
    #[arg(long, default_value_t = DEFAULT_DEBOUNCE_MS)]
    pub debounce_ms: u64,
}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        let home = dirs::home_dir().context("could not determine home directory")?;
        let cwd = std::env::current_dir().context("cannot read current directory")?;

        let requested = SyncConfig {
            editor: self.editor,
            native_path: absolutize(&cwd, self.native),
            shared_path: absolutize(&cwd, self.shared),
            service: ServiceConfig {
                url: self.service_url,
                token: self.token,
                timeout_secs: self.timeout_secs,
            },
            debounce_ms: self.debounce_ms,
        };

        let already_present = config::config_path_at(&home).exists();
        let saved = config::init_at(&home, requested).context("failed to write config")?;

        if already_present {
            println!(
                "Config already exists at {}; left unchanged",
                config::config_path_at(&home).display()
            );
        } else {
            println!("✓ Configured '{}' keybindings", saved.editor);
            println!("  native: {}", saved.native_path.display());
            println!("  shared: {}", saved.shared_path.display());
            println!("  Saved to: {}", config::config_path_at(&home).display());
        }
        Ok(())
    }
}

fn absolutize(cwd: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        cwd.join(path)
    }
}

//! `keysync status`: configured files, their content hashes, and daemon state.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use keysync_core::{config, SyncConfig};
use keysync_daemon::DaemonClient;
use keysync_sync::ContentHash;

/// Arguments for `keysync status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let home: PathBuf = dirs::home_dir().context("could not determine home directory")?;
        let config = config::load_at(&home).context("failed to load keysync config")?;

        let report = build_report(&home, &config)?;
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize status JSON")?
            );
            return Ok(());
        }

        print_table(report);
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct StatusReport {
    editor: String,
    service_url: String,
    files: Vec<FileStatus>,
    daemon: DaemonState,
}

#[derive(Debug, Serialize)]
struct FileStatus {
    role: &'static str,
    path: String,
    exists: bool,
    hash: Option<String>,
    /// Set when the file exists but is not readable UTF-8 text.
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct DaemonState {
    running: bool,
    socket: String,
}

#[derive(Tabled)]
struct FileTableRow {
    #[tabled(rename = "file")]
    role: String,
    #[tabled(rename = "path")]
    path: String,
    #[tabled(rename = "sha256")]
    hash: String,
}

fn build_report(home: &Path, config: &SyncConfig) -> Result<StatusReport> {
    let files = vec![
        file_status("native", &config.native_path),
        file_status("shared", &config.shared_path),
    ];
    let daemon = DaemonClient::new(home);

    Ok(StatusReport {
        editor: config.editor.clone(),
        service_url: config.service.url.clone(),
        files,
        daemon: DaemonState {
            running: daemon.is_running(),
            socket: daemon.socket().display().to_string(),
        },
    })
}

fn file_status(role: &'static str, path: &Path) -> FileStatus {
    let exists = path.is_file();
    let (hash, error) = if exists {
        match fs::read_to_string(path) {
            Ok(content) => (Some(ContentHash::of(&content).to_string()), None),
            Err(err) => (None, Some(err.to_string())),
        }
    } else {
        (None, None)
    };
    FileStatus {
        role,
        path: path.display().to_string(),
        exists,
        hash,
        error,
    }
}

fn print_table(report: StatusReport) {
    println!(
        "keysync v{} | editor {} | service {}",
        env!("CARGO_PKG_VERSION"),
        report.editor.bold(),
        report.service_url,
    );

    let rows: Vec<FileTableRow> = report
        .files
        .into_iter()
        .map(|file| FileTableRow {
            role: file.role.to_string(),
            path: file.path,
            hash: match (file.hash, file.exists) {
                (Some(hash), _) => short_hash(&hash).to_string(),
                (None, true) => "unreadable".red().to_string(),
                (None, false) => "missing".to_string(),
            },
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    if report.daemon.running {
        println!("daemon: {}", "running".green().bold());
    } else {
        println!("daemon: {} ({})", "stopped".bright_black().bold(), report.daemon.socket);
        println!("Run 'keysync daemon start' to sync on every save.");
    }
}

fn short_hash(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}

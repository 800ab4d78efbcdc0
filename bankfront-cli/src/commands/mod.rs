//! CLI command implementations

pub mod logs;
pub mod serve;
pub mod token;
pub mod validate;

use std::path::PathBuf;

use anyhow::{Context, Result};
use bankfront_core::config::Config;
use bankfront_core::services::{EntryPoint, EventLogService};

/// Open the event log for CLI operations
///
/// Returns None if the log fails to open (shouldn't block commands)
pub fn get_event_log() -> Option<EventLogService> {
    let dir = get_bankfront_dir().ok()?;
    let platform = Config::load(None).ok().and_then(|c| c.platform);
    EventLogService::new(&dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION"), platform).ok()
}

/// Record a command invocation, ignoring any errors
pub fn log_command(log: &Option<EventLogService>, command: &str) {
    if let Some(l) = log {
        let _ = l.log_command(command);
    }
}

/// Get the bankfront directory from BANKFRONT_DIR or `~/.bankfront`
pub fn get_bankfront_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("BANKFRONT_DIR") {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir().context("Could not find home directory")?;
    Ok(home.join(".bankfront"))
}

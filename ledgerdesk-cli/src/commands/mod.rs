//! CLI command implementations

pub mod account;
pub mod auth;
pub mod backend;
pub mod dashboard;
pub mod demo;
pub mod doctor;
pub mod logs;
pub mod transfer;
pub mod user;

use std::path::PathBuf;

use anyhow::{Context, Result};
use dialoguer::{Confirm, Input};
use ledgerdesk_core::config::Backend;
use ledgerdesk_core::services::{EntryPoint, LogEvent, LoggingService};
use ledgerdesk_core::LedgerContext;

use crate::output;

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let data_dir = get_data_dir().ok()?;
    std::fs::create_dir_all(&data_dir).ok()?;
    LoggingService::new(&data_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Data directory from `LEDGERDESK_DIR`, or `~/.ledgerdesk`
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("LEDGERDESK_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".ledgerdesk"))
        .context("Could not find home directory")
}

/// Get or create the ledgerdesk context
pub fn get_context() -> Result<LedgerContext> {
    let data_dir = get_data_dir()?;
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory: {:?}", data_dir))?;

    LedgerContext::new(&data_dir).context("Failed to initialize ledgerdesk context")
}

/// Run a repository call, with a spinner when it goes over the network
pub fn remote<T>(ctx: &LedgerContext, message: &str, work: impl FnOnce() -> T) -> T {
    output::with_spinner(ctx.config.backend == Backend::Rest, message, work)
}

/// Flag value, or an interactive prompt when it was not given
pub fn prompt_text(value: Option<String>, prompt: &str) -> Result<String> {
    match value {
        Some(v) => Ok(v),
        None => Ok(Input::new().with_prompt(prompt).interact_text()?),
    }
}

/// Like `prompt_text`, parsing the answer
pub fn prompt_parsed<T>(value: Option<T>, prompt: &str) -> Result<T>
where
    T: Clone + std::str::FromStr + ToString,
    <T as std::str::FromStr>::Err: std::fmt::Debug + ToString,
{
    match value {
        Some(v) => Ok(v),
        None => Ok(Input::<T>::new().with_prompt(prompt).interact_text()?),
    }
}

/// Ask before a destructive operation unless `--force` was given
pub fn confirm(force: bool, prompt: &str) -> Result<bool> {
    if force {
        return Ok(true);
    }
    Ok(Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()?)
}

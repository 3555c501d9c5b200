//! Output formatting utilities

use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Color, ContentArrangement, Table};
use indicatif::{ProgressBar, ProgressStyle};
use rust_decimal::Decimal;
use serde::Serialize;

use ledgerdesk_core::{OperationResult, TransferStatus, ValidationErrors};

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// One line per offending field
pub fn field_errors(errors: &ValidationErrors) {
    error("Los datos no son válidos:");
    for (field, message) in errors.iter() {
        eprintln!("  {} {}", format!("{}:", field).bold(), message);
    }
}

/// Print a core result as an `OperationResult` envelope.
/// Failures exit with status 1 after printing.
pub fn json_result<T: Serialize>(result: ledgerdesk_core::domain::result::Result<T>) -> Result<()> {
    let failed = result.is_err();
    let envelope: OperationResult<T> = result.into();
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    if failed {
        std::process::exit(1);
    }
    Ok(())
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Two decimals with thousands separators: 12,500.75
pub fn format_money(amount: Decimal) -> String {
    let rounded = amount.round_dp(2);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::new();
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{}${}.{}", if negative { "-" } else { "" }, grouped, frac_part)
}

pub fn format_date(date: Option<DateTime<Utc>>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub fn status_cell(status: TransferStatus) -> Cell {
    let color = match status {
        TransferStatus::Pending => Color::Yellow,
        TransferStatus::Completed => Color::Green,
        TransferStatus::Rejected => Color::Red,
    };
    Cell::new(status.label()).fg(color)
}

pub fn active_cell(active: bool) -> Cell {
    if active {
        Cell::new("Activa").fg(Color::Green)
    } else {
        Cell::new("Inactiva").fg(Color::DarkGrey)
    }
}

/// Spinner on stderr while `work` runs. Skipped when stderr is not a terminal.
pub fn with_spinner<T>(enabled: bool, message: &str, work: impl FnOnce() -> T) -> T {
    if !enabled || atty::isnt(atty::Stream::Stderr) {
        return work();
    }

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));

    let result = work();
    spinner.finish_and_clear();
    result
}

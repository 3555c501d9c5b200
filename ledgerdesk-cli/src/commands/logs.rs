//! Logs command - inspect the event log by entity

use anyhow::Result;
use chrono::{Duration, TimeZone, Utc};
use clap::{Subcommand, ValueEnum};
use colored::Colorize;
use comfy_table::{Cell, CellAlignment};

use ledgerdesk_core::services::{EntitySummary, EntryPoint, LogEntry, LoggingService};

use super::{confirm, get_data_dir};
use crate::output;

/// Record kinds commands are logged against
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogEntity {
    User,
    Account,
    Transfer,
    Session,
}

impl LogEntity {
    fn as_str(self) -> &'static str {
        match self {
            LogEntity::User => "user",
            LogEntity::Account => "account",
            LogEntity::Transfer => "transfer",
            LogEntity::Session => "session",
        }
    }
}

#[derive(Subcommand)]
pub enum LogsCommands {
    /// Show recent events
    List {
        /// Only events for this kind of record
        #[arg(long, value_enum)]
        entity: Option<LogEntity>,
        /// Only failed commands
        #[arg(long)]
        errors: bool,
        #[arg(short, long, default_value = "50")]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
    /// Delete events older than N days
    Clear {
        #[arg(long, default_value = "30")]
        days: i64,
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
        #[arg(long)]
        json: bool,
    },
    /// Events and failures per entity
    Stats {
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: LogsCommands) -> Result<()> {
    let data_dir = get_data_dir()?;
    std::fs::create_dir_all(&data_dir)?;
    let service = LoggingService::new(&data_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION"))?;

    match command {
        LogsCommands::List {
            entity,
            errors,
            limit,
            json,
        } => {
            let entries = match entity {
                Some(entity) => service.get_for_entity(entity.as_str(), errors, limit)?,
                None if errors => service.get_errors(limit)?,
                None => service.get_recent(limit)?,
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
                return Ok(());
            }
            print_entries(&entries);
        }
        LogsCommands::Clear { days, force, json } => {
            let prompt = format!("¿Eliminar los eventos de hace más de {} días?", days);
            if !json && !confirm(force, &prompt)? {
                println!("{}", "Cancelado".dimmed());
                return Ok(());
            }
            let cutoff = (Utc::now() - Duration::days(days)).timestamp_millis();
            let deleted = service.delete_before(cutoff)?;
            if json {
                println!("{}", serde_json::json!({ "deleted": deleted }));
            } else {
                output::success(&format!("{} evento(s) eliminados", deleted));
            }
        }
        LogsCommands::Stats { json } => {
            let summary = service.entity_summary()?;
            let total = service.count()?;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "total": total,
                        "entities": summary,
                        "databasePath": service.db_path().to_string_lossy(),
                    }))?
                );
                return Ok(());
            }
            print_summary(&summary, total);
            println!("{}", service.db_path().display().to_string().dimmed());
        }
    }

    Ok(())
}

fn format_timestamp(timestamp_ms: i64) -> String {
    Utc.timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp_ms.to_string())
}

/// Error category plus the offending fields for validation failures
fn describe_failure(entry: &LogEntry) -> String {
    match (&entry.error_message, &entry.error_details) {
        (Some(kind), Some(fields)) => format!("{} ({})", kind, fields),
        (Some(kind), None) => kind.clone(),
        _ => String::new(),
    }
}

fn print_entries(entries: &[LogEntry]) {
    if entries.is_empty() {
        println!("{}", "No hay eventos registrados".dimmed());
        return;
    }
    let mut table = output::create_table();
    table.set_header(vec!["Hora", "Comando", "Entidad", "Evento", "Fallo"]);
    for entry in entries {
        let failure = describe_failure(entry);
        table.add_row(vec![
            Cell::new(format_timestamp(entry.timestamp)),
            Cell::new(entry.command.as_deref().unwrap_or("-")),
            Cell::new(entry.entity.as_deref().unwrap_or("-")),
            Cell::new(&entry.event),
            Cell::new(failure.red()),
        ]);
    }
    println!("{}", table);
}

fn print_summary(summary: &[EntitySummary], total: u64) {
    if summary.is_empty() {
        println!("{}", "No hay eventos registrados".dimmed());
        return;
    }
    let mut table = output::create_table();
    table.set_header(vec!["Entidad", "Eventos", "Fallos"]);
    for row in summary {
        let failures = if row.failures > 0 {
            row.failures.to_string().red().to_string()
        } else {
            row.failures.to_string()
        };
        table.add_row(vec![
            Cell::new(row.entity.as_deref().unwrap_or("(general)")),
            Cell::new(row.events).set_alignment(CellAlignment::Right),
            Cell::new(failures).set_alignment(CellAlignment::Right),
        ]);
    }
    println!("{}", table);
    println!("{} evento(s) en total", total);
}

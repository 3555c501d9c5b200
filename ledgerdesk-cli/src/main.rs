//! ledgerdesk CLI - bank back office in your terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{account, auth, backend, dashboard, demo, doctor, logs, transfer, user};
use ledgerdesk_core::config::Backend;
use ledgerdesk_core::services::{LogEvent, SettlementMode};
use ledgerdesk_core::Error;

/// ledgerdesk - users, accounts and transfers from the terminal
#[derive(Parser)]
#[command(name = "ld", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show totals, transfers by status and recent activity
    Dashboard {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage users
    User {
        #[command(subcommand)]
        command: user::UserCommands,
    },

    /// Manage bank accounts
    Account {
        #[command(subcommand)]
        command: account::AccountCommands,
    },

    /// Send and manage transfers
    Transfer {
        #[command(subcommand)]
        command: transfer::TransferCommands,
    },

    /// Log in as a user
    Login {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// End the current session
    Logout,

    /// Show the logged-in user
    Whoami {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show or change the storage backend
    Backend {
        /// local or rest
        backend: Option<Backend>,
        /// Base URL of the REST collaborator
        #[arg(long)]
        url: Option<String>,
        /// immediate or deferred
        #[arg(long)]
        settlement: Option<SettlementMode>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage demo mode
    Demo {
        #[command(subcommand)]
        command: Option<demo::DemoCommands>,
    },

    /// Run database health checks
    Doctor {
        /// Show verbose output
        #[arg(long, short)]
        verbose: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// View and manage application logs
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

impl Commands {
    /// Command name for the event log; never includes arguments
    fn name(&self) -> &'static str {
        match self {
            Commands::Dashboard { .. } => "dashboard",
            Commands::User { .. } => "user",
            Commands::Account { .. } => "account",
            Commands::Transfer { .. } => "transfer",
            Commands::Login { .. } => "login",
            Commands::Logout => "logout",
            Commands::Whoami { .. } => "whoami",
            Commands::Backend { .. } => "backend",
            Commands::Demo { .. } => "demo",
            Commands::Doctor { .. } => "doctor",
            Commands::Logs { .. } => "logs",
        }
    }

    /// Kind of record the command works on, if any
    fn entity(&self) -> Option<&'static str> {
        match self {
            Commands::User { .. } => Some("user"),
            Commands::Account { .. } => Some("account"),
            Commands::Transfer { .. } => Some("transfer"),
            Commands::Login { .. } | Commands::Logout | Commands::Whoami { .. } => {
                Some("session")
            }
            _ => None,
        }
    }
}

fn command_event(event: &str, command: &'static str, entity: Option<&'static str>) -> LogEvent {
    let log_event = LogEvent::new(event).with_command(command);
    match entity {
        Some(entity) => log_event.with_entity(entity),
        None => log_event,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let command = cli.command.name();
    let entity = cli.command.entity();
    let logger = commands::get_logger();
    commands::log_event(&logger, command_event("command_executed", command, entity));

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<Error>() {
                Some(Error::Validation(fields)) => {
                    let names: Vec<&str> = fields.iter().map(|(field, _)| field).collect();
                    commands::log_event(
                        &logger,
                        command_event("command_failed", command, entity)
                            .with_error("validation")
                            .with_error_details(names.join(",")),
                    );
                    output::field_errors(fields);
                }
                _ => {
                    commands::log_event(
                        &logger,
                        command_event("command_failed", command, entity)
                            .with_error(error_kind(&e)),
                    );
                    output::error(&format!("Error: {:#}", e));
                }
            }
            ExitCode::FAILURE
        }
    }
}

/// Error category for the event log; messages are never logged
fn error_kind(e: &anyhow::Error) -> &'static str {
    match e.downcast_ref::<Error>() {
        Some(Error::Database(_)) => "database",
        Some(Error::NotFound(_)) => "not_found",
        Some(Error::Validation(_)) => "validation",
        Some(Error::InvalidTransition(_)) => "invalid_transition",
        Some(Error::Http(_)) => "http",
        Some(Error::Auth(_)) => "auth",
        Some(Error::Config(_)) => "config",
        Some(Error::Io(_)) => "io",
        Some(Error::Json(_)) => "json",
        Some(Error::Other(_)) | None => "other",
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Dashboard { json } => dashboard::run(json),
        Commands::User { command } => user::run(command),
        Commands::Account { command } => account::run(command),
        Commands::Transfer { command } => transfer::run(command),
        Commands::Login {
            email,
            password,
            json,
        } => auth::login(email, password, json),
        Commands::Logout => auth::logout(),
        Commands::Whoami { json } => auth::whoami(json),
        Commands::Backend {
            backend,
            url,
            settlement,
            json,
        } => backend::run(backend, url, settlement, json),
        Commands::Demo { command } => demo::run(command),
        Commands::Doctor { verbose, json } => doctor::run(verbose, json),
        Commands::Logs { command } => logs::run(command),
    }
}

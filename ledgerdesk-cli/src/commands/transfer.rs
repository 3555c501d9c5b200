//! Transfer commands - move money between accounts and manage pending transfers

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use comfy_table::{Cell, CellAlignment};
use rust_decimal::Decimal;

use ledgerdesk_core::services::SettlementMode;
use ledgerdesk_core::{Transfer, TransferDraft, TransferFilter, TransferStatus};

use super::{get_context, prompt_parsed, prompt_text, remote};
use crate::output::{self, format_date, format_money, status_cell};

#[derive(Subcommand)]
pub enum TransferCommands {
    /// List transfers
    List {
        /// pendiente, completada or rechazada
        #[arg(long)]
        status: Option<TransferStatus>,
        /// Filter by concept, ID or amount
        #[arg(long, short)]
        search: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one transfer
    Show {
        id: i64,
        #[arg(long)]
        json: bool,
    },
    /// Send money from one account to another (missing fields are prompted)
    New {
        /// Source account ID
        #[arg(long)]
        from: Option<i64>,
        /// Destination account ID
        #[arg(long)]
        to: Option<i64>,
        #[arg(long)]
        amount: Option<Decimal>,
        #[arg(long)]
        concept: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Complete a pending transfer, moving the money
    Complete {
        id: i64,
        #[arg(long)]
        json: bool,
    },
    /// Reject a pending transfer
    Reject {
        id: i64,
        #[arg(long)]
        json: bool,
    },
    /// Change the concept of a transfer
    Edit {
        id: i64,
        #[arg(long)]
        concept: String,
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: TransferCommands) -> Result<()> {
    let ctx = get_context()?;
    let service = &ctx.transfer_service;

    match command {
        TransferCommands::List {
            status,
            search,
            json,
        } => {
            let filter = TransferFilter { status, search };
            let result = remote(&ctx, "Cargando transferencias...", || service.list(&filter));
            if json {
                return output::json_result(result);
            }
            let transfers = result?;
            if transfers.is_empty() {
                println!("{}", "No se encontraron transferencias".dimmed());
                return Ok(());
            }
            let mut table = output::create_table();
            table.set_header(vec!["ID", "Fecha", "Origen", "Destino", "Concepto", "Monto", "Estado"]);
            for t in &transfers {
                table.add_row(vec![
                    Cell::new(t.id.unwrap_or_default()),
                    Cell::new(format_date(t.date)),
                    Cell::new(t.source_account_id),
                    Cell::new(t.destination_account_id),
                    Cell::new(&t.concept),
                    Cell::new(format_money(t.amount)).set_alignment(CellAlignment::Right),
                    status_cell(t.status),
                ]);
            }
            println!("{}", table);
            println!("{} transferencia(s)", transfers.len());
        }
        TransferCommands::Show { id, json } => {
            let result = remote(&ctx, "Cargando transferencia...", || service.get(id));
            if json {
                return output::json_result(result);
            }
            print_transfer(&result?);
        }
        TransferCommands::New {
            from,
            to,
            amount,
            concept,
            json,
        } => {
            let draft = TransferDraft {
                source_account_id: prompt_parsed(from, "Cuenta de origen (ID)")?,
                destination_account_id: prompt_parsed(to, "Cuenta de destino (ID)")?,
                amount: prompt_parsed(amount, "Monto")?,
                concept: prompt_text(concept, "Concepto")?,
            };
            let result = remote(&ctx, "Procesando transferencia...", || service.submit(&draft));
            if json {
                return output::json_result(result);
            }
            let transfer = result?;
            match service.mode() {
                SettlementMode::Immediate => output::success(&format!(
                    "Transferencia {} realizada: {} de la cuenta {} a la cuenta {}",
                    transfer.id.unwrap_or_default(),
                    format_money(transfer.amount),
                    transfer.source_account_id,
                    transfer.destination_account_id
                )),
                SettlementMode::Deferred => output::info(&format!(
                    "Transferencia {} registrada como pendiente. Use 'ld transfer complete {}' para ejecutarla.",
                    transfer.id.unwrap_or_default(),
                    transfer.id.unwrap_or_default()
                )),
            }
        }
        TransferCommands::Complete { id, json } => {
            let result = remote(&ctx, "Completando transferencia...", || service.complete(id));
            if json {
                return output::json_result(result);
            }
            let transfer = result?;
            output::success(&format!(
                "Transferencia {} completada ({})",
                id,
                format_money(transfer.amount)
            ));
        }
        TransferCommands::Reject { id, json } => {
            let result = remote(&ctx, "Rechazando transferencia...", || service.reject(id));
            if json {
                return output::json_result(result);
            }
            result?;
            output::warning(&format!("Transferencia {} rechazada", id));
        }
        TransferCommands::Edit { id, concept, json } => {
            let result = remote(&ctx, "Guardando transferencia...", || {
                service.update_concept(id, &concept)
            });
            if json {
                return output::json_result(result);
            }
            let transfer = result?;
            output::success(&format!("Transferencia {} actualizada", id));
            print_transfer(&transfer);
        }
    }

    Ok(())
}

fn print_transfer(transfer: &Transfer) {
    let mut table = output::create_table();
    table.add_row(vec![
        Cell::new("ID"),
        Cell::new(transfer.id.unwrap_or_default()),
    ]);
    table.add_row(vec![Cell::new("Fecha"), Cell::new(format_date(transfer.date))]);
    table.add_row(vec![
        Cell::new("Origen"),
        Cell::new(transfer.source_account_id),
    ]);
    table.add_row(vec![
        Cell::new("Destino"),
        Cell::new(transfer.destination_account_id),
    ]);
    table.add_row(vec![Cell::new("Concepto"), Cell::new(&transfer.concept)]);
    table.add_row(vec![
        Cell::new("Monto"),
        Cell::new(format_money(transfer.amount)),
    ]);
    table.add_row(vec![Cell::new("Estado"), status_cell(transfer.status)]);
    println!("{}", table);
}

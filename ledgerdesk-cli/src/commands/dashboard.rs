//! Dashboard command - totals, transfers by status and recent activity

use anyhow::Result;
use colored::Colorize;
use comfy_table::{Cell, CellAlignment};

use super::{get_context, remote};
use crate::output::{self, format_date, format_money, status_cell};

/// Width of the longest bar in the monthly chart
const BAR_WIDTH: usize = 30;

pub fn run(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let result = remote(&ctx, "Cargando panel...", || ctx.dashboard_service.stats());

    if json {
        return output::json_result(result);
    }
    let stats = result?;

    println!("{}", "Panel de control".bold());
    println!();

    let mut totals = output::create_table();
    totals.add_row(vec!["Usuarios", &stats.total_users.to_string()]);
    totals.add_row(vec!["Cuentas", &stats.total_accounts.to_string()]);
    totals.add_row(vec!["Transferencias", &stats.total_transfers.to_string()]);
    totals.add_row(vec!["Saldo total".to_string(), format_money(stats.total_balance)]);
    println!("{}", totals);
    println!();

    println!("{}", "Transferencias por estado".bold());
    let mut by_status = output::create_table();
    by_status.set_header(vec!["Estado", "Cantidad"]);
    for entry in &stats.transfers_by_status {
        by_status.add_row(vec![
            status_cell(entry.status),
            Cell::new(entry.count).set_alignment(CellAlignment::Right),
        ]);
    }
    println!("{}", by_status);
    println!();

    println!("{}", "Últimas transferencias".bold());
    if stats.latest_transfers.is_empty() {
        println!("{}", "  No hay transferencias".dimmed());
    } else {
        let mut latest = output::create_table();
        latest.set_header(vec!["ID", "Fecha", "Concepto", "Monto", "Estado"]);
        for t in &stats.latest_transfers {
            latest.add_row(vec![
                Cell::new(t.id.unwrap_or_default()),
                Cell::new(format_date(t.date)),
                Cell::new(&t.concept),
                Cell::new(format_money(t.amount)).set_alignment(CellAlignment::Right),
                status_cell(t.status),
            ]);
        }
        println!("{}", latest);
    }
    println!();

    if !stats.recent_months.is_empty() {
        println!("{}", "Transferencias por mes".bold());
        let max = stats
            .recent_months
            .iter()
            .map(|b| b.transfers)
            .max()
            .unwrap_or(1)
            .max(1);
        for bucket in &stats.recent_months {
            let width = (bucket.transfers * BAR_WIDTH).div_ceil(max);
            println!(
                "  {:<4}{} {}",
                bucket.month,
                "█".repeat(width).cyan(),
                bucket.transfers
            );
        }
    }

    Ok(())
}

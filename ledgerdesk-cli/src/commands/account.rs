//! Account commands - manage bank accounts

use anyhow::{anyhow, Result};
use clap::Subcommand;
use colored::Colorize;
use comfy_table::{Cell, CellAlignment};
use dialoguer::Select;
use rust_decimal::Decimal;

use ledgerdesk_core::{Account, AccountDraft, AccountPatch, AccountType};

use super::{confirm, get_context, prompt_parsed, prompt_text, remote};
use crate::output::{self, active_cell, format_date, format_money};

#[derive(Subcommand)]
pub enum AccountCommands {
    /// List accounts
    List {
        /// Filter by number, bank or type
        #[arg(long, short)]
        search: Option<String>,
        /// Only accounts owned by this user
        #[arg(long)]
        owner: Option<i64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one account
    Show {
        id: i64,
        #[arg(long)]
        json: bool,
    },
    /// Open a new account (missing fields are prompted)
    New {
        /// Owning user ID
        #[arg(long)]
        owner: Option<i64>,
        #[arg(long)]
        number: Option<String>,
        /// Ahorro, Corriente, Nómina or Inversión
        #[arg(long = "type")]
        account_type: Option<AccountType>,
        #[arg(long)]
        bank: Option<String>,
        /// Opening balance
        #[arg(long)]
        balance: Option<Decimal>,
        /// Create the account inactive
        #[arg(long)]
        inactive: bool,
        #[arg(long)]
        json: bool,
    },
    /// Edit an account; the balance only changes through transfers
    Edit {
        id: i64,
        #[arg(long)]
        owner: Option<i64>,
        #[arg(long)]
        number: Option<String>,
        #[arg(long = "type")]
        account_type: Option<AccountType>,
        #[arg(long)]
        bank: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Allow transfers from and to an account
    Activate {
        id: i64,
        #[arg(long)]
        json: bool,
    },
    /// Block transfers from and to an account
    Deactivate {
        id: i64,
        #[arg(long)]
        json: bool,
    },
    /// Delete an account. Transfers that reference it are kept.
    Delete {
        id: i64,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: AccountCommands) -> Result<()> {
    let ctx = get_context()?;
    let service = &ctx.account_service;

    match command {
        AccountCommands::List {
            search,
            owner,
            json,
        } => {
            let result = remote(&ctx, "Cargando cuentas...", || {
                service.list(search.as_deref(), owner)
            });
            if json {
                return output::json_result(result);
            }
            let accounts = result?;
            if accounts.is_empty() {
                println!("{}", "No se encontraron cuentas".dimmed());
                return Ok(());
            }
            let mut table = output::create_table();
            table.set_header(vec!["ID", "Número", "Tipo", "Banco", "Titular", "Saldo", "Estado"]);
            for account in &accounts {
                table.add_row(vec![
                    Cell::new(account.id.unwrap_or_default()),
                    Cell::new(&account.number),
                    Cell::new(account.account_type.label()),
                    Cell::new(&account.bank),
                    Cell::new(account.owner_id),
                    Cell::new(format_money(account.balance)).set_alignment(CellAlignment::Right),
                    active_cell(account.active),
                ]);
            }
            println!("{}", table);
            let total: Decimal = accounts.iter().map(|a| a.balance).sum();
            println!("{} cuenta(s), saldo total {}", accounts.len(), format_money(total));
        }
        AccountCommands::Show { id, json } => {
            let result = remote(&ctx, "Cargando cuenta...", || service.get(id));
            if json {
                return output::json_result(result);
            }
            print_account(&result?);
        }
        AccountCommands::New {
            owner,
            number,
            account_type,
            bank,
            balance,
            inactive,
            json,
        } => {
            let account_type = match account_type {
                Some(t) => t,
                None => prompt_account_type()?,
            };
            let draft = AccountDraft {
                owner_id: prompt_parsed(owner, "ID del titular")?,
                number: prompt_text(number, "Número de cuenta")?,
                account_type,
                bank: prompt_text(bank, "Banco")?,
                balance: prompt_parsed(balance, "Saldo inicial")?,
                active: !inactive,
            };
            let result = remote(&ctx, "Guardando cuenta...", || service.create(&draft));
            if json {
                return output::json_result(result);
            }
            let account = result?;
            output::success(&format!(
                "Cuenta {} creada ({})",
                account.id.unwrap_or_default(),
                account.label()
            ));
        }
        AccountCommands::Edit {
            id,
            owner,
            number,
            account_type,
            bank,
            json,
        } => {
            let patch = AccountPatch {
                owner_id: owner,
                number,
                account_type,
                bank,
                active: None,
            };
            if patch.is_empty() {
                output::warning("Nada que actualizar");
                return Ok(());
            }
            let result = remote(&ctx, "Guardando cuenta...", || service.update(id, &patch));
            if json {
                return output::json_result(result);
            }
            let account = result?;
            output::success(&format!("Cuenta {} actualizada", id));
            print_account(&account);
        }
        AccountCommands::Activate { id, json } => {
            let result = remote(&ctx, "Activando cuenta...", || service.set_active(id, true));
            if json {
                return output::json_result(result);
            }
            result?;
            output::success(&format!("Cuenta {} activada", id));
        }
        AccountCommands::Deactivate { id, json } => {
            let result = remote(&ctx, "Desactivando cuenta...", || {
                service.set_active(id, false)
            });
            if json {
                return output::json_result(result);
            }
            result?;
            output::success(&format!("Cuenta {} desactivada", id));
        }
        AccountCommands::Delete { id, force, json } => {
            if !json && !confirm(force, &format!("¿Eliminar la cuenta {}?", id))? {
                println!("{}", "Cancelado".dimmed());
                return Ok(());
            }
            let result = remote(&ctx, "Eliminando cuenta...", || service.delete(id));
            if json {
                return output::json_result(result.map(|_| serde_json::json!({ "deleted": id })));
            }
            result?;
            output::success(&format!("Cuenta {} eliminada", id));
        }
    }

    Ok(())
}

fn prompt_account_type() -> Result<AccountType> {
    let labels: Vec<&str> = AccountType::ALL.iter().map(|t| t.label()).collect();
    let index = Select::new()
        .with_prompt("Tipo de cuenta")
        .items(&labels)
        .default(0)
        .interact()?;
    AccountType::ALL
        .get(index)
        .copied()
        .ok_or_else(|| anyhow!("Tipo de cuenta no válido"))
}

fn print_account(account: &Account) {
    let mut table = output::create_table();
    table.add_row(vec!["ID".to_string(), account.id.unwrap_or_default().to_string()]);
    table.add_row(vec!["Número".to_string(), account.number.clone()]);
    table.add_row(vec!["Tipo".to_string(), account.account_type.label().to_string()]);
    table.add_row(vec!["Banco".to_string(), account.bank.clone()]);
    table.add_row(vec!["Titular".to_string(), account.owner_id.to_string()]);
    table.add_row(vec!["Saldo".to_string(), format_money(account.balance)]);
    table.add_row(vec![
        "Estado".to_string(),
        if account.active { "Activa" } else { "Inactiva" }.to_string(),
    ]);
    table.add_row(vec!["Creada".to_string(), format_date(account.created_at)]);
    println!("{}", table);
}

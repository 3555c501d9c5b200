//! User commands - list, show, create, edit and delete users

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use comfy_table::{Cell, CellAlignment};
use dialoguer::Password;

use ledgerdesk_core::{User, UserDraft, UserPatch};

use super::{confirm, get_context, prompt_text, remote};
use crate::output::{self, active_cell, format_date, format_money};

#[derive(Subcommand)]
pub enum UserCommands {
    /// List users
    List {
        /// Filter by name, surname or email
        #[arg(long, short)]
        search: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one user
    Show {
        id: i64,
        #[arg(long)]
        json: bool,
    },
    /// Register a new user (missing fields are prompted)
    New {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        surname: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        role: Option<String>,
        /// Login password for the new user
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Edit a user; only the given fields change
    Edit {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        surname: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        role: Option<String>,
        /// Mark the user active
        #[arg(long, conflicts_with = "inactive")]
        active: bool,
        /// Mark the user inactive
        #[arg(long)]
        inactive: bool,
        #[arg(long)]
        json: bool,
    },
    /// Delete a user. Their accounts are kept.
    Delete {
        id: i64,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
        #[arg(long)]
        json: bool,
    },
    /// List the accounts a user owns
    Accounts {
        id: i64,
        #[arg(long)]
        json: bool,
    },
    /// Set a user's login password
    Password {
        id: i64,
        #[arg(long)]
        password: Option<String>,
    },
}

pub fn run(command: UserCommands) -> Result<()> {
    let ctx = get_context()?;
    let service = &ctx.user_service;

    match command {
        UserCommands::List { search, json } => {
            let result = remote(&ctx, "Cargando usuarios...", || service.list(search.as_deref()));
            if json {
                return output::json_result(result);
            }
            let users = result?;
            if users.is_empty() {
                println!("{}", "No se encontraron usuarios".dimmed());
                return Ok(());
            }
            let mut table = output::create_table();
            table.set_header(vec!["ID", "Nombre", "Email", "Teléfono", "Registro", "Estado"]);
            for user in &users {
                table.add_row(vec![
                    Cell::new(user.id.unwrap_or_default()),
                    Cell::new(user.full_name()),
                    Cell::new(&user.email),
                    Cell::new(&user.phone),
                    Cell::new(format_date(user.registered_at)),
                    user_state_cell(user),
                ]);
            }
            println!("{}", table);
            println!("{} usuario(s)", users.len());
        }
        UserCommands::Show { id, json } => {
            let result = remote(&ctx, "Cargando usuario...", || service.get(id));
            if json {
                return output::json_result(result);
            }
            print_user(&result?);
        }
        UserCommands::New {
            name,
            surname,
            email,
            phone,
            role,
            password,
            json,
        } => {
            let draft = UserDraft {
                name: prompt_text(name, "Nombre")?,
                surname: prompt_text(surname, "Apellido")?,
                email: prompt_text(email, "Email")?,
                phone: prompt_text(phone, "Teléfono")?,
                role,
            };
            let result = remote(&ctx, "Guardando usuario...", || service.create(&draft));
            if json {
                return output::json_result(result);
            }
            let user = result?;
            output::success(&format!(
                "Usuario {} creado ({})",
                user.id.unwrap_or_default(),
                user.full_name()
            ));

            if let (Some(password), Some(id)) = (password, user.id) {
                ctx.auth_service.set_password(id, &password)?;
                output::info("Contraseña establecida");
            }
        }
        UserCommands::Edit {
            id,
            name,
            surname,
            email,
            phone,
            role,
            active,
            inactive,
            json,
        } => {
            let patch = UserPatch {
                name,
                surname,
                email,
                phone,
                role,
                active: match (active, inactive) {
                    (true, _) => Some(true),
                    (_, true) => Some(false),
                    _ => None,
                },
            };
            if patch.is_empty() {
                output::warning("Nada que actualizar");
                return Ok(());
            }
            let result = remote(&ctx, "Guardando usuario...", || service.update(id, &patch));
            if json {
                return output::json_result(result);
            }
            let user = result?;
            output::success(&format!("Usuario {} actualizado", id));
            print_user(&user);
        }
        UserCommands::Delete { id, force, json } => {
            if !json && !confirm(force, &format!("¿Eliminar el usuario {}?", id))? {
                println!("{}", "Cancelado".dimmed());
                return Ok(());
            }
            let result = remote(&ctx, "Eliminando usuario...", || service.delete(id));
            if json {
                return output::json_result(result.map(|_| serde_json::json!({ "deleted": id })));
            }
            result?;
            output::success(&format!("Usuario {} eliminado", id));
        }
        UserCommands::Accounts { id, json } => {
            let result = remote(&ctx, "Cargando cuentas...", || service.accounts(id));
            if json {
                return output::json_result(result);
            }
            let accounts = result?;
            if accounts.is_empty() {
                println!("{}", "El usuario no tiene cuentas".dimmed());
                return Ok(());
            }
            let mut table = output::create_table();
            table.set_header(vec!["ID", "Número", "Tipo", "Banco", "Saldo", "Estado"]);
            for account in &accounts {
                table.add_row(vec![
                    Cell::new(account.id.unwrap_or_default()),
                    Cell::new(&account.number),
                    Cell::new(account.account_type.label()),
                    Cell::new(&account.bank),
                    Cell::new(format_money(account.balance)).set_alignment(CellAlignment::Right),
                    active_cell(account.active),
                ]);
            }
            println!("{}", table);
        }
        UserCommands::Password { id, password } => {
            let password = match password {
                Some(p) => p,
                None => Password::new()
                    .with_prompt("Nueva contraseña")
                    .with_confirmation("Repita la contraseña", "Las contraseñas no coinciden")
                    .interact()?,
            };
            remote(&ctx, "Guardando contraseña...", || {
                ctx.auth_service.set_password(id, &password)
            })?;
            output::success("Contraseña actualizada");
        }
    }

    Ok(())
}

fn user_state_cell(user: &User) -> Cell {
    if user.active {
        Cell::new("Activo").fg(comfy_table::Color::Green)
    } else {
        Cell::new("Inactivo").fg(comfy_table::Color::DarkGrey)
    }
}

fn print_user(user: &User) {
    let mut table = output::create_table();
    table.add_row(vec!["ID".to_string(), user.id.unwrap_or_default().to_string()]);
    table.add_row(vec!["Nombre".to_string(), user.name.clone()]);
    table.add_row(vec!["Apellido".to_string(), user.surname.clone()]);
    table.add_row(vec!["Email".to_string(), user.email.clone()]);
    table.add_row(vec!["Teléfono".to_string(), user.phone.clone()]);
    table.add_row(vec![
        "Rol".to_string(),
        user.role.clone().unwrap_or_else(|| "-".to_string()),
    ]);
    table.add_row(vec!["Registro".to_string(), format_date(user.registered_at)]);
    table.add_row(vec![
        "Estado".to_string(),
        if user.active { "Activo" } else { "Inactivo" }.to_string(),
    ]);
    println!("{}", table);
}

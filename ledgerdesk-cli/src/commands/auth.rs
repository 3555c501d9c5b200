//! Login, logout and whoami

use anyhow::Result;
use colored::Colorize;
use dialoguer::Password;

use super::{get_context, prompt_text, remote};
use crate::output;

pub fn login(email: Option<String>, password: Option<String>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let email = prompt_text(email, "Email")?;
    let password = match password {
        Some(p) => p,
        None => Password::new().with_prompt("Contraseña").interact()?,
    };

    let result = remote(&ctx, "Iniciando sesión...", || {
        ctx.auth_service.login(&email, &password)
    });
    if json {
        return output::json_result(result);
    }
    let session = result?;
    output::success(&format!("Sesión iniciada como {}", session.user.full_name()));
    Ok(())
}

pub fn logout() -> Result<()> {
    let ctx = get_context()?;
    if remote(&ctx, "Cerrando sesión...", || ctx.auth_service.logout())? {
        output::success("Sesión cerrada");
    } else {
        println!("{}", "No hay ninguna sesión activa".dimmed());
    }
    Ok(())
}

pub fn whoami(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let current = ctx.auth_service.current()?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "session": current,
                "backend": ctx.config.backend.to_string(),
            }))?
        );
        return Ok(());
    }

    match current {
        Some(session) => println!(
            "{} (usuario {}) en backend {}",
            session.email.bold(),
            session.user_id,
            ctx.config.backend
        ),
        None => println!("{}", "No hay ninguna sesión activa".dimmed()),
    }
    Ok(())
}

//! Backend command - choose the local store or a REST collaborator

use anyhow::Result;
use colored::Colorize;

use ledgerdesk_core::adapters::rest::validate_base_url;
use ledgerdesk_core::config::{Backend, Config};
use ledgerdesk_core::services::SettlementMode;

use super::get_data_dir;
use crate::output;

pub fn run(
    backend: Option<Backend>,
    url: Option<String>,
    settlement: Option<SettlementMode>,
    json: bool,
) -> Result<()> {
    let data_dir = get_data_dir()?;
    let mut config = Config::load(&data_dir).unwrap_or_default();
    let changed = backend.is_some() || url.is_some() || settlement.is_some();

    if let Some(url) = url {
        validate_base_url(&url)?;
        config.api_base_url = url.trim_end_matches('/').to_string();
    }
    if let Some(backend) = backend {
        if backend != config.backend {
            // Sessions belong to one backend
            config.session = None;
        }
        config.backend = backend;
    }
    if let Some(settlement) = settlement {
        config.settlement = settlement;
    }
    if changed {
        config.save(&data_dir)?;
    }

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "backend": config.backend,
                "apiBaseUrl": config.api_base_url,
                "settlement": config.settlement,
                "demoMode": config.demo_mode,
            }))?
        );
        return Ok(());
    }

    if changed {
        output::success("Configuración guardada");
    }
    println!("{:<15}{}", "Backend:", config.backend.to_string().bold());
    if config.backend == Backend::Rest {
        println!("{:<15}{}", "API:", config.api_base_url);
    } else {
        println!("{:<15}{}", "Base de datos:", config.db_filename());
    }
    println!("{:<15}{}", "Liquidación:", config.settlement);
    if config.demo_mode {
        println!("{:<15}{}", "Modo demo:", "ON".green());
    }
    Ok(())
}

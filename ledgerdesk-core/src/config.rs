//! Configuration management
//!
//! Settings live in `settings.json` inside the data directory:
//! ```json
//! {
//!   "app": { "demoMode": false, "backend": "local",
//!            "apiBaseUrl": "http://localhost:3000", "settlement": "immediate" },
//!   "session": { "token": "...", "userId": 1, "email": "juan@example.com" }
//! }
//! ```
//! Keys this crate does not manage are kept when saving.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::services::SettlementMode;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000";

/// Where records are read from and written to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Embedded DuckDB file in the data directory
    #[default]
    Local,
    /// json-server style REST collaborator
    Rest,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Local => f.write_str("local"),
            Backend::Rest => f.write_str("rest"),
        }
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(Backend::Local),
            "rest" => Ok(Backend::Rest),
            other => Err(format!("unknown backend '{}' (expected local or rest)", other)),
        }
    }
}

/// Persisted login
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSession {
    pub token: String,
    pub user_id: i64,
    pub email: String,
}

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    app: AppSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    session: Option<StoredSession>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppSettings {
    #[serde(default)]
    demo_mode: bool,
    #[serde(default)]
    backend: Backend,
    #[serde(default)]
    api_base_url: Option<String>,
    #[serde(default)]
    settlement: SettlementMode,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// ledgerdesk configuration (simplified view of settings)
#[derive(Debug, Clone)]
pub struct Config {
    pub demo_mode: bool,
    pub backend: Backend,
    pub api_base_url: String,
    pub settlement: SettlementMode,
    pub session: Option<StoredSession>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            demo_mode: false,
            backend: Backend::Local,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            settlement: SettlementMode::Immediate,
            session: None,
        }
    }
}

fn read_settings(path: &Path) -> Result<SettingsFile> {
    if !path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content).unwrap_or_default())
}

fn env_flag(name: &str) -> Option<bool> {
    match std::env::var(name).ok().as_deref() {
        Some("true" | "1" | "yes" | "TRUE" | "YES") => Some(true),
        Some("false" | "0" | "no" | "FALSE" | "NO") => Some(false),
        _ => None,
    }
}

impl Config {
    /// Load config from the data directory
    ///
    /// Environment overrides (for CI/testing):
    /// `LEDGERDESK_DEMO_MODE`, `LEDGERDESK_BACKEND`, `LEDGERDESK_API_URL`,
    /// `LEDGERDESK_SETTLEMENT`. Unparseable values are ignored.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let raw = read_settings(&data_dir.join("settings.json"))?;

        let demo_mode = env_flag("LEDGERDESK_DEMO_MODE").unwrap_or(raw.app.demo_mode);
        let backend = std::env::var("LEDGERDESK_BACKEND")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(raw.app.backend);
        let settlement = std::env::var("LEDGERDESK_SETTLEMENT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(raw.app.settlement);
        let api_base_url = std::env::var("LEDGERDESK_API_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or(raw.app.api_base_url)
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        Ok(Self {
            demo_mode,
            backend,
            api_base_url,
            settlement,
            session: raw.session,
        })
    }

    /// Save config to the data directory
    /// Preserves other settings that the CLI doesn't manage
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(data_dir)?;
        let settings_path = data_dir.join("settings.json");

        let mut settings = read_settings(&settings_path)?;
        settings.app.demo_mode = self.demo_mode;
        settings.app.backend = self.backend;
        settings.app.api_base_url = Some(self.api_base_url.clone());
        settings.app.settlement = self.settlement;
        settings.session = self.session.clone();

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }

    /// Database file for the current mode
    pub fn db_filename(&self) -> &'static str {
        if self.demo_mode {
            "demo.duckdb"
        } else {
            "ledgerdesk.duckdb"
        }
    }

    pub fn enable_demo_mode(&mut self) {
        self.demo_mode = true;
    }

    pub fn disable_demo_mode(&mut self) {
        self.demo_mode = false;
    }
}

//! Demo service - manage demo mode
//!
//! Demo mode points the local backend at `demo.duckdb`, seeded with a small
//! set of users, accounts and transfers, so the back office can be tried
//! without touching real records.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::adapters::demo::{
    generate_demo_accounts, generate_demo_transfers, generate_demo_users, DEMO_PASSWORD,
};
use crate::adapters::duckdb::DuckDbRepository;
use crate::config::Config;
use crate::domain::{AccountDraft, UserDraft};
use crate::ports::Repository;

const DEMO_DB: &str = "demo.duckdb";

/// Demo service for managing demo mode
pub struct DemoService {
    data_dir: PathBuf,
}

impl DemoService {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
        }
    }

    /// Check if demo mode is currently enabled
    pub fn is_enabled(&self) -> Result<bool> {
        let config = Config::load(&self.data_dir)?;
        Ok(config.demo_mode)
    }

    /// Enable demo mode
    ///
    /// Any previous demo database is discarded so each run starts from the
    /// same dataset.
    pub fn enable(&self) -> Result<()> {
        self.remove_demo_db()?;

        let mut config = Config::load(&self.data_dir).unwrap_or_default();
        config.enable_demo_mode();
        config.save(&self.data_dir)?;

        let repository = DuckDbRepository::new(&self.data_dir.join(DEMO_DB))?;
        repository.ensure_schema()?;
        seed(&repository)?;

        Ok(())
    }

    /// Disable demo mode, optionally deleting the demo database
    pub fn disable(&self, clean: bool) -> Result<()> {
        let mut config = Config::load(&self.data_dir).unwrap_or_default();
        config.disable_demo_mode();
        config.save(&self.data_dir)?;

        if clean {
            self.remove_demo_db()?;
        }

        Ok(())
    }

    fn remove_demo_db(&self) -> Result<()> {
        let demo_db = self.data_dir.join(DEMO_DB);
        let demo_wal = self.data_dir.join(format!("{}.wal", DEMO_DB));
        for path in [demo_db, demo_wal] {
            if path.exists() {
                std::fs::remove_file(&path)?;
            }
        }
        Ok(())
    }
}

/// Insert the demo dataset into an empty store
///
/// Records are inserted in id order, so the sequence-assigned ids match the
/// ids the dataset refers to.
fn seed(repository: &DuckDbRepository) -> Result<()> {
    for user in generate_demo_users() {
        let created = repository.create_user(&UserDraft {
            name: user.name,
            surname: user.surname,
            email: user.email,
            phone: user.phone,
            role: user.role,
        })?;
        if let Some(id) = created.id {
            repository.set_password(id, DEMO_PASSWORD)?;
        }
    }

    for account in generate_demo_accounts() {
        repository.create_account(&AccountDraft {
            owner_id: account.owner_id,
            number: account.number,
            account_type: account.account_type,
            bank: account.bank,
            balance: account.balance,
            active: account.active,
        })?;
    }

    // Historical transfers; balances above already reflect them
    for transfer in generate_demo_transfers() {
        repository.record_transfer(&transfer, &[])?;
    }

    Ok(())
}

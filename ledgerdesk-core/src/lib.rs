//! ledgerdesk core - back office for users, bank accounts and transfers
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core business entities (User, Account, Transfer) and validation
//! - **ports**: Trait definitions for external dependencies (Repository)
//! - **services**: Business logic orchestration
//! - **adapters**: Concrete implementations (DuckDB, REST collaborator)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use adapters::duckdb::DuckDbRepository;
use adapters::rest::RestRepository;
use config::{Backend, Config};
use ports::Repository;
use services::*;

// Re-export commonly used types at crate root
pub use config::StoredSession;
pub use domain::result::{Error, OperationResult};
pub use domain::{
    Account, AccountDraft, AccountPatch, AccountType, Session, Transfer, TransferDraft,
    TransferFilter, TransferStatus, User, UserDraft, UserPatch, ValidationErrors,
};

/// Main context for ledgerdesk operations
///
/// Holds the configuration, the repository selected by it and every
/// service wired to that repository.
pub struct LedgerContext {
    pub config: Config,
    pub repository: Arc<dyn Repository>,
    /// Present only when the local backend is active
    pub local: Option<Arc<DuckDbRepository>>,
    pub user_service: UserService,
    pub account_service: AccountService,
    pub transfer_service: TransferService,
    pub dashboard_service: DashboardService,
    pub auth_service: AuthService,
}

impl LedgerContext {
    pub fn new(data_dir: &Path) -> Result<Self> {
        let config = Config::load(data_dir)?;

        let (repository, local): (Arc<dyn Repository>, Option<Arc<DuckDbRepository>>) =
            match config.backend {
                Backend::Local => {
                    std::fs::create_dir_all(data_dir)?;
                    let db_path = data_dir.join(config.db_filename());
                    let repository = Arc::new(DuckDbRepository::new(&db_path)?);
                    repository.ensure_schema()?;
                    let shared: Arc<dyn Repository> = repository.clone();
                    (shared, Some(repository))
                }
                Backend::Rest => {
                    let token = config.session.as_ref().map(|s| s.token.clone());
                    let repository: Arc<dyn Repository> =
                        Arc::new(RestRepository::new(&config.api_base_url, token)?);
                    (repository, None)
                }
            };

        let user_service = UserService::new(Arc::clone(&repository));
        let account_service = AccountService::new(Arc::clone(&repository));
        let transfer_service = TransferService::new(Arc::clone(&repository), config.settlement);
        let dashboard_service = DashboardService::new(Arc::clone(&repository));
        let auth_service = AuthService::new(Arc::clone(&repository), data_dir);

        Ok(Self {
            config,
            repository,
            local,
            user_service,
            account_service,
            transfer_service,
            dashboard_service,
            auth_service,
        })
    }

    /// Health checks, available on the local backend only
    pub fn doctor(&self) -> Option<DoctorService> {
        self.local.as_ref().map(|repo| DoctorService::new(Arc::clone(repo)))
    }
}

//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

mod account;
mod auth;
mod dashboard;
mod demo;
mod doctor;
pub mod logging;
pub mod migration;
mod transfer;
mod user;

pub use account::AccountService;
pub use auth::{AuthService, MIN_PASSWORD_LEN};
pub use dashboard::{
    compute_stats, DashboardService, DashboardStats, MonthBucket, StatusCount, MONTH_LABELS,
};
pub use demo::DemoService;
pub use doctor::{CheckResult, DoctorResult, DoctorService, DoctorSummary};
pub use logging::{EntitySummary, EntryPoint, LogEntry, LogEvent, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use transfer::{SettlementMode, TransferService};
pub use user::UserService;

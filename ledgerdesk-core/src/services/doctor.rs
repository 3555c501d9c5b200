//! Doctor service - database health checks
//!
//! Reports integrity gaps the store does not enforce. Nothing is repaired.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::result::Result;

/// Doctor service for health checks
pub struct DoctorService {
    repository: Arc<DuckDbRepository>,
}

impl DoctorService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    /// Run all health checks
    pub fn run_checks(&self) -> Result<DoctorResult> {
        let mut checks = HashMap::new();

        // Schema
        let pending = self.repository.pending_migrations()?;
        checks.insert(
            "schema_migrations".to_string(),
            CheckResult::from_findings(
                "warning",
                "All migrations applied".to_string(),
                format!("{} migration(s) not applied", pending.len()),
                pending.iter().map(|name| json!({ "migration": name })).collect(),
            ),
        );

        let negative = self.repository.check_negative_balances()?;
        checks.insert(
            "negative_balances".to_string(),
            CheckResult::from_findings(
                "error",
                "No account has a negative balance".to_string(),
                format!("{} account(s) have a negative balance", negative.len()),
                negative
                    .iter()
                    .map(|(id, number, balance)| {
                        json!({
                            "account_id": id,
                            "number": number,
                            "balance": balance.to_string(),
                        })
                    })
                    .collect(),
            ),
        );

        let orphaned_transfers = self.repository.check_orphaned_transfers()?;
        checks.insert(
            "orphaned_transfers".to_string(),
            CheckResult::from_findings(
                "error",
                "No orphaned transfers found".to_string(),
                format!(
                    "{} transfer(s) reference missing accounts",
                    orphaned_transfers.len()
                ),
                orphaned_transfers
                    .iter()
                    .map(|id| json!({ "transfer_id": id }))
                    .collect(),
            ),
        );

        let orphaned_accounts = self.repository.check_orphaned_accounts()?;
        checks.insert(
            "orphaned_accounts".to_string(),
            CheckResult::from_findings(
                "warning",
                "Every account has an owner".to_string(),
                format!(
                    "{} account(s) reference missing users",
                    orphaned_accounts.len()
                ),
                orphaned_accounts
                    .iter()
                    .map(|id| json!({ "account_id": id }))
                    .collect(),
            ),
        );

        let duplicates = self.repository.check_duplicate_account_numbers()?;
        checks.insert(
            "duplicate_account_numbers".to_string(),
            CheckResult::from_findings(
                "warning",
                "Account numbers are unique".to_string(),
                format!("{} account number(s) are shared", duplicates.len()),
                duplicates
                    .iter()
                    .map(|(number, count)| json!({ "number": number, "count": count }))
                    .collect(),
            ),
        );

        let self_transfers = self.repository.check_self_transfers()?;
        checks.insert(
            "self_transfers".to_string(),
            CheckResult::from_findings(
                "warning",
                "No transfer moves money to its own account".to_string(),
                format!(
                    "{} transfer(s) have the same source and destination",
                    self_transfers.len()
                ),
                self_transfers
                    .iter()
                    .map(|id| json!({ "transfer_id": id }))
                    .collect(),
            ),
        );

        // Calculate summary
        let passed = checks.values().filter(|c| c.status == "pass").count() as i64;
        let warnings = checks.values().filter(|c| c.status == "warning").count() as i64;
        let errors = checks.values().filter(|c| c.status == "error").count() as i64;

        Ok(DoctorResult {
            checks,
            summary: DoctorSummary {
                passed,
                warnings,
                errors,
            },
        })
    }
}

#[derive(Debug, Serialize)]
pub struct DoctorResult {
    pub checks: HashMap<String, CheckResult>,
    pub summary: DoctorSummary,
}

#[derive(Debug, Serialize)]
pub struct CheckResult {
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<serde_json::Value>>,
}

impl CheckResult {
    /// "pass" when there is nothing to report, otherwise `severity`
    fn from_findings(
        severity: &str,
        pass_message: String,
        fail_message: String,
        details: Vec<serde_json::Value>,
    ) -> Self {
        if details.is_empty() {
            Self {
                status: "pass".to_string(),
                message: pass_message,
                details: None,
            }
        } else {
            Self {
                status: severity.to_string(),
                message: fail_message,
                details: Some(details),
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DoctorSummary {
    pub passed: i64,
    pub warnings: i64,
    pub errors: i64,
}

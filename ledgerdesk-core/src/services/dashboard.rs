//! Dashboard service - aggregate statistics over users, accounts and transfers

use std::sync::Arc;

use chrono::Datelike;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::result::Result;
use crate::domain::{Account, Transfer, TransferStatus, User};
use crate::ports::Repository;

/// Short month labels, January first
pub const MONTH_LABELS: [&str; 12] = [
    "Ene", "Feb", "Mar", "Abr", "May", "Jun", "Jul", "Ago", "Sep", "Oct", "Nov", "Dic",
];

/// How many of the most recent transfers the dashboard shows
const LATEST_TRANSFERS: usize = 3;

/// How many non-empty months the bar chart shows
const RECENT_MONTHS: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusCount {
    pub status: TransferStatus,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthBucket {
    pub month: &'static str,
    pub transfers: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
    pub total_users: usize,
    pub total_accounts: usize,
    pub total_transfers: usize,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_balance: Decimal,
    /// Always Pending, Completed, Rejected in that order
    pub transfers_by_status: Vec<StatusCount>,
    pub latest_transfers: Vec<Transfer>,
    /// Twelve slots, one per calendar month. Years are not distinguished.
    pub monthly: Vec<MonthBucket>,
    /// Last months with at least one transfer, in calendar order
    pub recent_months: Vec<MonthBucket>,
}

/// Compute dashboard statistics from the full collections
pub fn compute_stats(users: &[User], accounts: &[Account], transfers: &[Transfer]) -> DashboardStats {
    let total_balance: Decimal = accounts.iter().map(|a| a.balance).sum();

    let transfers_by_status = TransferStatus::ALL
        .iter()
        .map(|&status| StatusCount {
            status,
            count: transfers.iter().filter(|t| t.status == status).count(),
        })
        .collect();

    // Undated transfers sort last; stable sort keeps input order among equals
    let mut by_date: Vec<&Transfer> = transfers.iter().collect();
    by_date.sort_by(|a, b| b.date.cmp(&a.date));
    let latest_transfers = by_date
        .into_iter()
        .take(LATEST_TRANSFERS)
        .cloned()
        .collect();

    let mut counts = [0usize; 12];
    for date in transfers.iter().filter_map(|t| t.date) {
        counts[date.month0() as usize] += 1;
    }
    let monthly: Vec<MonthBucket> = MONTH_LABELS
        .iter()
        .zip(counts)
        .map(|(&month, transfers)| MonthBucket { month, transfers })
        .collect();

    let non_empty: Vec<MonthBucket> = monthly.iter().filter(|b| b.transfers > 0).cloned().collect();
    let recent_months = non_empty[non_empty.len().saturating_sub(RECENT_MONTHS)..].to_vec();

    DashboardStats {
        total_users: users.len(),
        total_accounts: accounts.len(),
        total_transfers: transfers.len(),
        total_balance,
        transfers_by_status,
        latest_transfers,
        monthly,
        recent_months,
    }
}

/// Dashboard service
pub struct DashboardService {
    repository: Arc<dyn Repository>,
}

impl DashboardService {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }

    pub fn stats(&self) -> Result<DashboardStats> {
        let users = self.repository.list_users()?;
        let accounts = self.repository.list_accounts()?;
        let transfers = self.repository.list_transfers()?;
        Ok(compute_stats(&users, &accounts, &transfers))
    }
}

//! Transfer service - validates transfers and moves money between accounts

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};
use crate::domain::transfer::settle;
use crate::domain::{Account, Transfer, TransferDraft, TransferFilter, TransferStatus};
use crate::ports::Repository;

/// When a submitted transfer moves money
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettlementMode {
    /// Debit and credit on submission; the transfer is stored as completed
    #[default]
    Immediate,
    /// Store the transfer as pending; money moves when it is completed
    Deferred,
}

impl fmt::Display for SettlementMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettlementMode::Immediate => f.write_str("immediate"),
            SettlementMode::Deferred => f.write_str("deferred"),
        }
    }
}

impl FromStr for SettlementMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "immediate" => Ok(SettlementMode::Immediate),
            "deferred" => Ok(SettlementMode::Deferred),
            other => Err(format!(
                "unknown settlement mode '{}' (expected immediate or deferred)",
                other
            )),
        }
    }
}

/// Transfer service
pub struct TransferService {
    repository: Arc<dyn Repository>,
    mode: SettlementMode,
}

impl TransferService {
    pub fn new(repository: Arc<dyn Repository>, mode: SettlementMode) -> Self {
        Self { repository, mode }
    }

    pub fn mode(&self) -> SettlementMode {
        self.mode
    }

    pub fn list(&self, filter: &TransferFilter) -> Result<Vec<Transfer>> {
        Ok(self
            .repository
            .list_transfers()?
            .into_iter()
            .filter(|t| filter.matches(t))
            .collect())
    }

    pub fn get(&self, id: i64) -> Result<Transfer> {
        self.repository
            .get_transfer(id)?
            .ok_or_else(|| Error::not_found(format!("Transferencia {} no encontrada", id)))
    }

    /// Validate and record a new transfer
    ///
    /// Any violation aborts with the field map and nothing is written.
    /// Otherwise only the source and destination accounts change. The store
    /// re-checks the debit when it applies it, so a balance spent by another
    /// caller in between still yields the `monto` error.
    pub fn submit(&self, draft: &TransferDraft) -> Result<Transfer> {
        self.load_and_validate(draft)?;
        let now = Utc::now();

        match self.mode {
            SettlementMode::Immediate => {
                let transfer = draft.clone().into_transfer(TransferStatus::Completed, now);
                self.repository.record_transfer(&transfer, &settle(&transfer))
            }
            SettlementMode::Deferred => {
                let transfer = draft.clone().into_transfer(TransferStatus::Pending, now);
                self.repository.record_transfer(&transfer, &[])
            }
        }
    }

    /// Pending -> Completed. The source balance is checked again here since
    /// it may have changed while the transfer was waiting.
    pub fn complete(&self, id: i64) -> Result<Transfer> {
        let transfer = self.get(id)?;
        check_transition(&transfer, TransferStatus::Completed)?;

        let draft = TransferDraft {
            source_account_id: transfer.source_account_id,
            destination_account_id: transfer.destination_account_id,
            amount: transfer.amount,
            concept: transfer.concept.clone(),
        };
        self.load_and_validate(&draft)?;
        self.repository
            .settle_transfer(id, TransferStatus::Completed, &settle(&transfer))
    }

    /// Pending -> Rejected. Balances are untouched.
    pub fn reject(&self, id: i64) -> Result<Transfer> {
        let transfer = self.get(id)?;
        check_transition(&transfer, TransferStatus::Rejected)?;
        self.repository
            .settle_transfer(id, TransferStatus::Rejected, &[])
    }

    /// The concept is the only editable field of a recorded transfer
    pub fn update_concept(&self, id: i64, concept: &str) -> Result<Transfer> {
        let concept = concept.trim();
        if concept.is_empty() {
            return Err(Error::validation("concepto", "El concepto es obligatorio"));
        }
        self.get(id)?;
        self.repository.update_transfer_concept(id, concept)
    }

    fn load_and_validate(&self, draft: &TransferDraft) -> Result<()> {
        let source = self.lookup(draft.source_account_id)?;
        let destination = self.lookup(draft.destination_account_id)?;
        draft
            .validate(source.as_ref(), destination.as_ref())
            .into_result()
    }

    fn lookup(&self, id: i64) -> Result<Option<Account>> {
        if id == 0 {
            return Ok(None);
        }
        self.repository.get_account(id)
    }
}

fn check_transition(transfer: &Transfer, next: TransferStatus) -> Result<()> {
    if transfer.status.can_transition_to(next) {
        Ok(())
    } else {
        Err(Error::InvalidTransition(format!(
            "La transferencia {} está {} y no puede pasar a {}",
            transfer.id.unwrap_or_default(),
            transfer.status,
            next
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::duckdb::DuckDbRepository;
    use crate::domain::{AccountDraft, AccountType};
    use rust_decimal::Decimal;
    use tempfile::TempDir;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    /// Two active accounts with 5000.50 and 12500.75
    fn setup(mode: SettlementMode) -> (TempDir, Arc<DuckDbRepository>, TransferService) {
        let dir = TempDir::new().unwrap();
        let repo = Arc::new(DuckDbRepository::new(&dir.path().join("test.duckdb")).unwrap());
        repo.ensure_schema().unwrap();

        for (number, balance) in [("1234567890", "5000.50"), ("0987654321", "12500.75")] {
            repo.create_account(&AccountDraft {
                owner_id: 1,
                number: number.to_string(),
                account_type: AccountType::Savings,
                bank: "Banco ABC".to_string(),
                balance: dec(balance),
                active: true,
            })
            .unwrap();
        }

        let service = TransferService::new(repo.clone(), mode);
        (dir, repo, service)
    }

    fn draft(amount: &str) -> TransferDraft {
        TransferDraft {
            source_account_id: 1,
            destination_account_id: 2,
            amount: dec(amount),
            concept: "Pago de servicios".to_string(),
        }
    }

    fn balance(repo: &DuckDbRepository, id: i64) -> Decimal {
        repo.get_account(id).unwrap().unwrap().balance
    }

    #[test]
    fn test_immediate_transfer_moves_money() {
        let (_dir, repo, service) = setup(SettlementMode::Immediate);

        let transfer = service.submit(&draft("1500.00")).unwrap();
        assert_eq!(transfer.status, TransferStatus::Completed);
        assert!(transfer.date.is_some());

        assert_eq!(balance(&repo, 1), dec("3500.50"));
        assert_eq!(balance(&repo, 2), dec("14000.75"));
    }

    #[test]
    fn test_insufficient_funds_changes_nothing() {
        let (_dir, repo, service) = setup(SettlementMode::Immediate);

        let err = service.submit(&draft("6000.00")).unwrap_err();
        assert_eq!(
            err.field_errors().and_then(|e| e.get("monto")),
            Some("El monto excede el saldo disponible")
        );
        assert_eq!(balance(&repo, 1), dec("5000.50"));
        assert_eq!(balance(&repo, 2), dec("12500.75"));
        assert!(service.list(&TransferFilter::default()).unwrap().is_empty());
    }

    #[test]
    fn test_inactive_destination_rejected() {
        let (_dir, repo, service) = setup(SettlementMode::Immediate);
        repo.update_account(
            2,
            &crate::domain::AccountPatch { active: Some(false), ..Default::default() },
        )
        .unwrap();

        let err = service.submit(&draft("10")).unwrap_err();
        assert!(err.field_errors().unwrap().contains("cuentaDestinoId"));
    }

    #[test]
    fn test_deferred_then_complete() {
        let (_dir, repo, service) = setup(SettlementMode::Deferred);

        let pending = service.submit(&draft("1500.00")).unwrap();
        assert_eq!(pending.status, TransferStatus::Pending);
        assert_eq!(balance(&repo, 1), dec("5000.50"));

        let completed = service.complete(pending.id.unwrap()).unwrap();
        assert_eq!(completed.status, TransferStatus::Completed);
        assert_eq!(balance(&repo, 1), dec("3500.50"));
        assert_eq!(balance(&repo, 2), dec("14000.75"));

        let err = service.complete(pending.id.unwrap()).unwrap_err();
        assert!(matches!(err, Error::InvalidTransition(_)));
    }

    #[test]
    fn test_complete_revalidates_balance() {
        let (_dir, repo, service) = setup(SettlementMode::Deferred);

        let first = service.submit(&draft("4000.00")).unwrap();
        let second = service.submit(&draft("4000.00")).unwrap();
        service.complete(first.id.unwrap()).unwrap();

        let err = service.complete(second.id.unwrap()).unwrap_err();
        assert!(err.field_errors().unwrap().contains("monto"));
        assert_eq!(balance(&repo, 1), dec("1000.50"));
        assert_eq!(service.get(second.id.unwrap()).unwrap().status, TransferStatus::Pending);
    }

    #[test]
    fn test_reject_keeps_balances() {
        let (_dir, repo, service) = setup(SettlementMode::Deferred);

        let pending = service.submit(&draft("100")).unwrap();
        let rejected = service.reject(pending.id.unwrap()).unwrap();
        assert_eq!(rejected.status, TransferStatus::Rejected);
        assert_eq!(balance(&repo, 1), dec("5000.50"));

        assert!(matches!(
            service.complete(pending.id.unwrap()).unwrap_err(),
            Error::InvalidTransition(_)
        ));
    }

    #[test]
    fn test_update_concept() {
        let (_dir, _repo, service) = setup(SettlementMode::Immediate);
        let transfer = service.submit(&draft("1")).unwrap();
        let id = transfer.id.unwrap();

        assert!(service.update_concept(id, "  ").unwrap_err().field_errors().is_some());
        let updated = service.update_concept(id, " Alquiler ").unwrap();
        assert_eq!(updated.concept, "Alquiler");
        assert!(matches!(service.update_concept(99, "x").unwrap_err(), Error::NotFound(_)));
    }

    #[test]
    fn test_settlement_mode_parsing() {
        assert_eq!("Deferred".parse::<SettlementMode>().unwrap(), SettlementMode::Deferred);
        assert!("later".parse::<SettlementMode>().is_err());
        assert_eq!(SettlementMode::default().to_string(), "immediate");
    }
}

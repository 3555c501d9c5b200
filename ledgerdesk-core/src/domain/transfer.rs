//! Transfer domain model and the rules a transfer must satisfy before money moves

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::account::{Account, BalanceUpdate};
use super::validation::{is_blank, is_whole_cents, ValidationErrors};

/// Lifecycle status of a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransferStatus {
    #[serde(rename = "Pendiente")]
    Pending,
    #[serde(rename = "Completada")]
    Completed,
    #[serde(rename = "Rechazada")]
    Rejected,
}

impl TransferStatus {
    /// Display order used by the dashboard
    pub const ALL: [TransferStatus; 3] = [
        TransferStatus::Pending,
        TransferStatus::Completed,
        TransferStatus::Rejected,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TransferStatus::Pending => "Pendiente",
            TransferStatus::Completed => "Completada",
            TransferStatus::Rejected => "Rechazada",
        }
    }

    /// Only pending transfers can change status, and only once
    pub fn can_transition_to(&self, next: TransferStatus) -> bool {
        matches!(
            (self, next),
            (TransferStatus::Pending, TransferStatus::Completed)
                | (TransferStatus::Pending, TransferStatus::Rejected)
        )
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TransferStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pendiente" | "pending" => Ok(TransferStatus::Pending),
            "completada" | "completed" => Ok(TransferStatus::Completed),
            "rechazada" | "rejected" => Ok(TransferStatus::Rejected),
            other => Err(format!("unknown transfer status: {}", other)),
        }
    }
}

/// A directed movement of money between two accounts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(rename = "cuentaOrigenId")]
    pub source_account_id: i64,
    #[serde(rename = "cuentaDestinoId")]
    pub destination_account_id: i64,
    #[serde(rename = "monto", with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(rename = "concepto", alias = "descripcion", default)]
    pub concept: String,
    #[serde(rename = "estado")]
    pub status: TransferStatus,
    #[serde(rename = "fecha", default, with = "super::dates::optional")]
    pub date: Option<DateTime<Utc>>,
}

impl Transfer {
    /// Search predicate used by the transfer list view:
    /// concept (ignoring case), id or amount as text
    pub fn matches(&self, query: &str) -> bool {
        let q = query.to_lowercase();
        self.concept.to_lowercase().contains(&q)
            || self.id.map(|id| id.to_string().contains(query)).unwrap_or(false)
            || self.amount.normalize().to_string().contains(query)
    }
}

/// Transfer submission form
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransferDraft {
    #[serde(rename = "cuentaOrigenId")]
    pub source_account_id: i64,
    #[serde(rename = "cuentaDestinoId")]
    pub destination_account_id: i64,
    #[serde(rename = "monto", with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(rename = "concepto")]
    pub concept: String,
}

impl TransferDraft {
    /// Check the draft against the current state of both accounts.
    ///
    /// `source` / `destination` are the accounts the ids resolved to, `None`
    /// when the id is unknown. An unknown source has no available balance.
    pub fn validate(
        &self,
        source: Option<&Account>,
        destination: Option<&Account>,
    ) -> ValidationErrors {
        let mut errors = ValidationErrors::new();

        if self.source_account_id == 0 {
            errors.insert("cuentaOrigenId", "Debe seleccionar una cuenta de origen");
        } else {
            match source {
                None => errors.insert("cuentaOrigenId", "La cuenta de origen no existe"),
                Some(a) if !a.active => {
                    errors.insert("cuentaOrigenId", "La cuenta de origen está inactiva")
                }
                Some(_) => {}
            }
        }

        if self.destination_account_id == 0 {
            errors.insert("cuentaDestinoId", "Debe seleccionar una cuenta de destino");
        } else {
            match destination {
                None => errors.insert("cuentaDestinoId", "La cuenta de destino no existe"),
                Some(a) if !a.active => {
                    errors.insert("cuentaDestinoId", "La cuenta de destino está inactiva")
                }
                Some(_) => {}
            }
        }

        if self.source_account_id == self.destination_account_id && self.source_account_id != 0 {
            errors.insert(
                "cuentaDestinoId",
                "La cuenta de destino debe ser diferente a la cuenta de origen",
            );
        }

        let available = source.map(|a| a.balance).unwrap_or(Decimal::ZERO);
        check_amount(self.amount, available, &mut errors);

        if is_blank(&self.concept) {
            errors.insert("concepto", "El concepto es obligatorio");
        }

        errors
    }

    pub fn into_transfer(self, status: TransferStatus, date: DateTime<Utc>) -> Transfer {
        Transfer {
            id: None,
            source_account_id: self.source_account_id,
            destination_account_id: self.destination_account_id,
            amount: self.amount,
            concept: self.concept.trim().to_string(),
            status,
            date: Some(date),
        }
    }
}

/// Amount must be positive, in whole cents and covered by the available
/// balance. The balance check runs last so its message wins on `monto`.
pub fn check_amount(amount: Decimal, available: Decimal, errors: &mut ValidationErrors) {
    if amount <= Decimal::ZERO {
        errors.insert("monto", "El monto debe ser mayor que cero");
    } else if !is_whole_cents(amount) {
        errors.insert("monto", "El monto no puede tener más de dos decimales");
    }
    if amount > available {
        errors.insert("monto", "El monto excede el saldo disponible");
    }
}

/// Balance changes for moving the transfer's amount from source to
/// destination. Only these two accounts are touched.
pub fn settle(transfer: &Transfer) -> [BalanceUpdate; 2] {
    [
        BalanceUpdate::debit(transfer.source_account_id, transfer.amount),
        BalanceUpdate::credit(transfer.destination_account_id, transfer.amount),
    ]
}

/// Filter for the transfer list view
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransferFilter {
    /// `None` shows every status
    pub status: Option<TransferStatus>,
    pub search: Option<String>,
}

impl TransferFilter {
    pub fn matches(&self, transfer: &Transfer) -> bool {
        let status_ok = self.status.map_or(true, |s| transfer.status == s);
        let search_ok = self
            .search
            .as_deref()
            .map_or(true, |q| transfer.matches(q));
        status_ok && search_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::AccountType;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn account(id: i64, balance: &str) -> Account {
        Account {
            id: Some(id),
            owner_id: 1,
            number: format!("000{}", id),
            account_type: AccountType::Savings,
            bank: "Banco ABC".to_string(),
            balance: dec(balance),
            active: true,
            created_at: None,
        }
    }

    fn draft(from: i64, to: i64, amount: &str, concept: &str) -> TransferDraft {
        TransferDraft {
            source_account_id: from,
            destination_account_id: to,
            amount: dec(amount),
            concept: concept.to_string(),
        }
    }

    #[test]
    fn test_valid_transfer() {
        let a = account(1, "5000.50");
        let b = account(2, "12500.75");
        let errors = draft(1, 2, "1500.00", "Pago de servicios").validate(Some(&a), Some(&b));
        assert!(errors.is_empty());
    }

    #[test]
    fn test_amount_exceeding_balance() {
        let a = account(1, "5000.50");
        let b = account(2, "12500.75");
        let errors = draft(1, 2, "6000.00", "Pago").validate(Some(&a), Some(&b));
        assert_eq!(errors.get("monto"), Some("El monto excede el saldo disponible"));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_exact_balance_is_allowed() {
        let a = account(1, "5000.50");
        let b = account(2, "0");
        assert!(draft(1, 2, "5000.50", "Todo").validate(Some(&a), Some(&b)).is_empty());
    }

    #[test]
    fn test_non_positive_amounts() {
        let a = account(1, "100");
        let b = account(2, "0");
        for amount in ["0", "-5", "-0.01"] {
            let errors = draft(1, 2, amount, "x").validate(Some(&a), Some(&b));
            assert_eq!(errors.get("monto"), Some("El monto debe ser mayor que cero"));
        }
    }

    #[test]
    fn test_same_account() {
        let a = account(1, "100");
        let errors = draft(1, 1, "10", "x").validate(Some(&a), Some(&a));
        assert_eq!(
            errors.get("cuentaDestinoId"),
            Some("La cuenta de destino debe ser diferente a la cuenta de origen")
        );
    }

    #[test]
    fn test_missing_everything() {
        let errors = TransferDraft::default().validate(None, None);
        assert_eq!(errors.get("cuentaOrigenId"), Some("Debe seleccionar una cuenta de origen"));
        assert_eq!(errors.get("cuentaDestinoId"), Some("Debe seleccionar una cuenta de destino"));
        assert_eq!(errors.get("monto"), Some("El monto debe ser mayor que cero"));
        assert_eq!(errors.get("concepto"), Some("El concepto es obligatorio"));
    }

    #[test]
    fn test_unknown_source_has_no_balance() {
        let b = account(2, "0");
        let errors = draft(9, 2, "1", "x").validate(None, Some(&b));
        assert_eq!(errors.get("cuentaOrigenId"), Some("La cuenta de origen no existe"));
        assert_eq!(errors.get("monto"), Some("El monto excede el saldo disponible"));
    }

    #[test]
    fn test_inactive_accounts() {
        let mut a = account(1, "100");
        let mut b = account(2, "0");
        a.active = false;
        b.active = false;
        let errors = draft(1, 2, "10", "x").validate(Some(&a), Some(&b));
        assert_eq!(errors.get("cuentaOrigenId"), Some("La cuenta de origen está inactiva"));
        assert_eq!(errors.get("cuentaDestinoId"), Some("La cuenta de destino está inactiva"));
    }

    #[test]
    fn test_blank_concept() {
        let a = account(1, "100");
        let b = account(2, "0");
        let errors = draft(1, 2, "10", "   ").validate(Some(&a), Some(&b));
        assert_eq!(errors.get("concepto"), Some("El concepto es obligatorio"));
    }

    #[test]
    fn test_settle_preserves_total() {
        let t = draft(1, 2, "1500.00", "Pago de servicios")
            .into_transfer(TransferStatus::Completed, Utc::now());
        let [debit, credit] = settle(&t);
        assert_eq!(debit, BalanceUpdate { account_id: 1, delta: dec("-1500.00") });
        assert_eq!(credit, BalanceUpdate { account_id: 2, delta: dec("1500.00") });
        assert!(debit.is_debit());
        assert!(!credit.is_debit());
        assert_eq!(debit.delta + credit.delta, Decimal::ZERO);
    }

    #[test]
    fn test_sub_cent_amounts_rejected() {
        let a = account(1, "5000.50");
        let b = account(2, "12500.75");

        let errors = draft(1, 2, "0.005", "x").validate(Some(&a), Some(&b));
        assert_eq!(errors.get("monto"), Some("El monto no puede tener más de dos decimales"));

        let errors = draft(1, 2, "0.001", "x").validate(Some(&a), Some(&b));
        assert_eq!(errors.get("monto"), Some("El monto no puede tener más de dos decimales"));

        assert!(draft(1, 2, "10.10", "x").validate(Some(&a), Some(&b)).is_empty());
        assert!(draft(1, 2, "10.100", "x").validate(Some(&a), Some(&b)).is_empty());
    }

    #[test]
    fn test_transitions() {
        use TransferStatus::*;
        assert!(Pending.can_transition_to(Completed));
        assert!(Pending.can_transition_to(Rejected));
        assert!(!Completed.can_transition_to(Rejected));
        assert!(!Rejected.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Pending));
    }

    #[test]
    fn test_filter() {
        let t = Transfer {
            id: Some(12),
            source_account_id: 1,
            destination_account_id: 2,
            amount: dec("2500.50"),
            concept: "Transferencia personal".to_string(),
            status: TransferStatus::Pending,
            date: None,
        };

        assert!(TransferFilter::default().matches(&t));
        assert!(TransferFilter { search: Some("PERSONAL".into()), ..Default::default() }.matches(&t));
        assert!(TransferFilter { search: Some("12".into()), ..Default::default() }.matches(&t));
        assert!(TransferFilter { search: Some("2500.5".into()), ..Default::default() }.matches(&t));
        assert!(!TransferFilter {
            status: Some(TransferStatus::Completed),
            ..Default::default()
        }
        .matches(&t));
    }

    #[test]
    fn test_status_wire_labels() {
        let json = serde_json::to_string(&TransferStatus::Completed).unwrap();
        assert_eq!(json, "\"Completada\"");
        assert_eq!("rechazada".parse::<TransferStatus>().unwrap(), TransferStatus::Rejected);
    }

    #[test]
    fn test_deserialize_date_only_record() {
        let t: Transfer = serde_json::from_str(
            r#"{"id": 1, "cuentaOrigenId": 1, "cuentaDestinoId": 2, "monto": 1500.0,
                "concepto": "Pago de servicios", "fecha": "2025-04-15", "estado": "Completada"}"#,
        )
        .unwrap();
        assert_eq!(t.amount, dec("1500"));
        assert!(t.date.is_some());
    }
}

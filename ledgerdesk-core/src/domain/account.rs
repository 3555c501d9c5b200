//! Account domain model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::validation::{is_blank, is_whole_cents, ValidationErrors};

/// Kind of bank account
///
/// Stored and sent using the labels the back office has always shown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountType {
    #[default]
    #[serde(rename = "Ahorro")]
    Savings,
    #[serde(rename = "Corriente")]
    Checking,
    #[serde(rename = "Nómina", alias = "Nomina")]
    Payroll,
    #[serde(rename = "Inversión", alias = "Inversion")]
    Investment,
}

impl AccountType {
    pub const ALL: [AccountType; 4] = [
        AccountType::Savings,
        AccountType::Checking,
        AccountType::Payroll,
        AccountType::Investment,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            AccountType::Savings => "Ahorro",
            AccountType::Checking => "Corriente",
            AccountType::Payroll => "Nómina",
            AccountType::Investment => "Inversión",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AccountType {
    type Err = String;

    /// Accepts the Spanish labels (with or without accents) and English names
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ahorro" | "savings" => Ok(AccountType::Savings),
            "corriente" | "checking" => Ok(AccountType::Checking),
            "nómina" | "nomina" | "payroll" => Ok(AccountType::Payroll),
            "inversión" | "inversion" | "investment" => Ok(AccountType::Investment),
            other => Err(format!("unknown account type: {}", other)),
        }
    }
}

/// A bank account owned by a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Owning user. Not enforced: the user may have been deleted.
    #[serde(rename = "usuarioId")]
    pub owner_id: i64,
    #[serde(rename = "numeroCuenta")]
    pub number: String,
    #[serde(rename = "tipoCuenta", default)]
    pub account_type: AccountType,
    #[serde(rename = "banco", default)]
    pub bank: String,
    #[serde(rename = "saldo", with = "rust_decimal::serde::float")]
    pub balance: Decimal,
    #[serde(rename = "activa", default = "default_active")]
    pub active: bool,
    #[serde(rename = "fechaCreacion", default, with = "super::dates::optional")]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

impl Account {
    /// Search predicate used by the account list view
    ///
    /// The account number is matched verbatim; bank and type ignore case.
    pub fn matches(&self, query: &str) -> bool {
        let q = query.to_lowercase();
        self.number.contains(query)
            || self.bank.to_lowercase().contains(&q)
            || self.account_type.label().to_lowercase().contains(&q)
    }

    pub fn apply(&mut self, patch: &AccountPatch) {
        if let Some(owner_id) = patch.owner_id {
            self.owner_id = owner_id;
        }
        if let Some(number) = &patch.number {
            self.number = number.clone();
        }
        if let Some(account_type) = patch.account_type {
            self.account_type = account_type;
        }
        if let Some(bank) = &patch.bank {
            self.bank = bank.clone();
        }
        if let Some(active) = patch.active {
            self.active = active;
        }
    }

    /// Validate the editable fields of an existing record
    ///
    /// The balance is not editable, so it is not re-checked here.
    pub fn validate(&self) -> ValidationErrors {
        validate_fields(&self.number, &self.bank, self.owner_id)
    }

    /// One-line label for pickers: number, bank and type
    pub fn label(&self) -> String {
        format!("{} - {} ({})", self.number, self.bank, self.account_type)
    }
}

/// Account creation form
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountDraft {
    #[serde(rename = "usuarioId")]
    pub owner_id: i64,
    #[serde(rename = "numeroCuenta")]
    pub number: String,
    #[serde(rename = "tipoCuenta")]
    pub account_type: AccountType,
    #[serde(rename = "banco")]
    pub bank: String,
    #[serde(rename = "saldo", with = "rust_decimal::serde::float")]
    pub balance: Decimal,
    #[serde(rename = "activa")]
    pub active: bool,
}

impl AccountDraft {
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = validate_fields(&self.number, &self.bank, self.owner_id);
        if self.balance < Decimal::ZERO {
            errors.insert("saldo", "El saldo no puede ser negativo");
        } else if !is_whole_cents(self.balance) {
            errors.insert("saldo", "El saldo no puede tener más de dos decimales");
        }
        errors
    }

    pub fn into_account(self, id: i64, created_at: DateTime<Utc>) -> Account {
        Account {
            id: Some(id),
            owner_id: self.owner_id,
            number: self.number.trim().to_string(),
            account_type: self.account_type,
            bank: self.bank.trim().to_string(),
            balance: self.balance,
            active: self.active,
            created_at: Some(created_at),
        }
    }
}

/// Partial account update
///
/// There is deliberately no balance field: balances move through transfers only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountPatch {
    #[serde(rename = "usuarioId", skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<i64>,
    #[serde(rename = "numeroCuenta", skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    #[serde(rename = "tipoCuenta", skip_serializing_if = "Option::is_none")]
    pub account_type: Option<AccountType>,
    #[serde(rename = "banco", skip_serializing_if = "Option::is_none")]
    pub bank: Option<String>,
    #[serde(rename = "activa", skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

impl AccountPatch {
    pub fn is_empty(&self) -> bool {
        self == &AccountPatch::default()
    }
}

/// Signed change to one account's balance, applied as part of a transfer.
///
/// Stores apply it relative to the current balance, and a negative change
/// only lands when the account still covers it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceUpdate {
    pub account_id: i64,
    pub delta: Decimal,
}

impl BalanceUpdate {
    pub fn debit(account_id: i64, amount: Decimal) -> Self {
        Self {
            account_id,
            delta: -amount,
        }
    }

    pub fn credit(account_id: i64, amount: Decimal) -> Self {
        Self {
            account_id,
            delta: amount,
        }
    }

    pub fn is_debit(&self) -> bool {
        self.delta < Decimal::ZERO
    }
}

fn validate_fields(number: &str, bank: &str, owner_id: i64) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    if is_blank(number) {
        errors.insert("numeroCuenta", "El número de cuenta es obligatorio");
    }
    if is_blank(bank) {
        errors.insert("banco", "El banco es obligatorio");
    }
    if owner_id == 0 {
        errors.insert("usuarioId", "Debe seleccionar un usuario");
    }

    errors
}

//! Demo dataset
//!
//! Three users, three accounts (one inactive) and one transfer in each
//! status. Used to seed `demo.duckdb` and the mock REST server.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::domain::{Account, AccountType, Transfer, TransferStatus, User};

/// Password given to every demo user
pub const DEMO_PASSWORD: &str = "demo1234";

fn date(year: i32, month: u32, day: u32) -> Option<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

fn user(id: i64, name: &str, surname: &str, email: &str, phone: &str, registered: (u32, u32)) -> User {
    User {
        id: Some(id),
        name: name.to_string(),
        surname: surname.to_string(),
        email: email.to_string(),
        phone: phone.to_string(),
        registered_at: date(2025, registered.0, registered.1),
        role: None,
        active: true,
    }
}

/// Generate demo users
pub fn generate_demo_users() -> Vec<User> {
    vec![
        user(1, "Juan", "Pérez", "juan@example.com", "123456789", (1, 10)),
        user(2, "María", "González", "maria@example.com", "987654321", (2, 3)),
        user(3, "Carlos", "Rodríguez", "carlos@example.com", "456789123", (3, 21)),
    ]
}

/// Generate demo accounts
pub fn generate_demo_accounts() -> Vec<Account> {
    vec![
        Account {
            id: Some(1),
            owner_id: 1,
            number: "1234567890".to_string(),
            account_type: AccountType::Savings,
            bank: "Banco ABC".to_string(),
            balance: Decimal::new(500050, 2), // 5,000.50
            active: true,
            created_at: date(2025, 1, 12),
        },
        Account {
            id: Some(2),
            owner_id: 1,
            number: "0987654321".to_string(),
            account_type: AccountType::Checking,
            bank: "Banco XYZ".to_string(),
            balance: Decimal::new(1250075, 2), // 12,500.75
            active: true,
            created_at: date(2025, 1, 12),
        },
        Account {
            id: Some(3),
            owner_id: 2,
            number: "5678901234".to_string(),
            account_type: AccountType::Savings,
            bank: "Banco DEF".to_string(),
            balance: Decimal::new(875025, 2), // 8,750.25
            active: false,
            created_at: date(2025, 2, 5),
        },
    ]
}

/// Generate demo transfers
pub fn generate_demo_transfers() -> Vec<Transfer> {
    vec![
        Transfer {
            id: Some(1),
            source_account_id: 1,
            destination_account_id: 2,
            amount: Decimal::new(150000, 2),
            concept: "Pago de servicios".to_string(),
            status: TransferStatus::Completed,
            date: date(2025, 4, 15),
        },
        Transfer {
            id: Some(2),
            source_account_id: 2,
            destination_account_id: 3,
            amount: Decimal::new(250050, 2),
            concept: "Transferencia personal".to_string(),
            status: TransferStatus::Pending,
            date: date(2025, 4, 18),
        },
        Transfer {
            id: Some(3),
            source_account_id: 1,
            destination_account_id: 3,
            amount: Decimal::new(75025, 2),
            concept: "Pago de factura".to_string(),
            status: TransferStatus::Rejected,
            date: date(2025, 4, 20),
        },
    ]
}

//! Integration tests for ledgerdesk-core services
//!
//! Every test runs the services against a real DuckDB file in a temp dir.
//!
//! Run with: cargo test --test integration_tests -- --nocapture

use std::sync::Arc;

use rust_decimal::Decimal;
use tempfile::TempDir;

use ledgerdesk_core::adapters::duckdb::DuckDbRepository;
use ledgerdesk_core::ports::Repository;
use ledgerdesk_core::services::{
    AccountService, DashboardService, DemoService, DoctorService, SettlementMode,
    TransferService, UserService,
};
use ledgerdesk_core::{
    AccountDraft, AccountType, Error, LedgerContext, TransferDraft, TransferFilter,
    TransferStatus, UserDraft,
};

// ============================================================================
// Test Helpers
// ============================================================================

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

/// Create a test repository with schema initialized
fn create_test_repo(temp_dir: &TempDir) -> Arc<DuckDbRepository> {
    let db_path = temp_dir.path().join("test.duckdb");
    let repo = DuckDbRepository::new(&db_path).expect("Failed to create repository");
    repo.ensure_schema().expect("Failed to initialize schema");
    Arc::new(repo)
}

fn user_draft(name: &str, email: &str) -> UserDraft {
    UserDraft {
        name: name.to_string(),
        surname: "Prueba".to_string(),
        email: email.to_string(),
        phone: "600000000".to_string(),
        role: None,
    }
}

fn account_draft(owner_id: i64, number: &str, balance: &str) -> AccountDraft {
    AccountDraft {
        owner_id,
        number: number.to_string(),
        account_type: AccountType::Savings,
        bank: "Banco ABC".to_string(),
        balance: dec(balance),
        active: true,
    }
}

fn transfer_draft(from: i64, to: i64, amount: &str) -> TransferDraft {
    TransferDraft {
        source_account_id: from,
        destination_account_id: to,
        amount: dec(amount),
        concept: "Pago de servicios".to_string(),
    }
}

struct Bank {
    repo: Arc<DuckDbRepository>,
    users: UserService,
    accounts: AccountService,
    transfers: TransferService,
}

/// One user owning three accounts: 5000.50, 12500.75 and 800.00
fn open_bank(temp_dir: &TempDir, mode: SettlementMode) -> Bank {
    let repo = create_test_repo(temp_dir);
    let shared: Arc<dyn Repository> = repo.clone();
    let bank = Bank {
        repo,
        users: UserService::new(shared.clone()),
        accounts: AccountService::new(shared.clone()),
        transfers: TransferService::new(shared, mode),
    };

    let owner = bank
        .users
        .create(&user_draft("Juan", "juan@example.com"))
        .unwrap();
    let owner_id = owner.id.unwrap();
    for (number, balance) in [
        ("1234567890", "5000.50"),
        ("0987654321", "12500.75"),
        ("5678901234", "800.00"),
    ] {
        bank.accounts
            .create(&account_draft(owner_id, number, balance))
            .unwrap();
    }
    bank
}

fn balance(bank: &Bank, id: i64) -> Decimal {
    bank.accounts.get(id).unwrap().balance
}

fn total_balance(bank: &Bank) -> Decimal {
    bank.accounts
        .list(None, None)
        .unwrap()
        .iter()
        .map(|a| a.balance)
        .sum()
}

// ============================================================================
// Transfer Processing
// ============================================================================

#[test]
fn test_transfer_debits_source_and_credits_destination() {
    let temp_dir = TempDir::new().unwrap();
    let bank = open_bank(&temp_dir, SettlementMode::Immediate);

    let transfer = bank.transfers.submit(&transfer_draft(1, 2, "1500.00")).unwrap();

    assert_eq!(transfer.status, TransferStatus::Completed);
    assert_eq!(balance(&bank, 1), dec("3500.50"));
    assert_eq!(balance(&bank, 2), dec("14000.75"));
    // Uninvolved account untouched
    assert_eq!(balance(&bank, 3), dec("800.00"));

    let stored = bank.transfers.get(transfer.id.unwrap()).unwrap();
    assert_eq!(stored.amount, dec("1500.00"));
    assert_eq!(stored.concept, "Pago de servicios");
}

#[test]
fn test_overdraft_is_rejected_without_side_effects() {
    let temp_dir = TempDir::new().unwrap();
    let bank = open_bank(&temp_dir, SettlementMode::Immediate);

    let err = bank
        .transfers
        .submit(&transfer_draft(1, 2, "6000.00"))
        .unwrap_err();

    let fields = err.field_errors().expect("validation error");
    assert_eq!(fields.get("monto"), Some("El monto excede el saldo disponible"));
    assert_eq!(balance(&bank, 1), dec("5000.50"));
    assert_eq!(balance(&bank, 2), dec("12500.75"));
    assert!(bank.transfers.list(&TransferFilter::default()).unwrap().is_empty());
}

#[test]
fn test_sub_cent_amounts_never_reach_the_store() {
    let temp_dir = TempDir::new().unwrap();
    let bank = open_bank(&temp_dir, SettlementMode::Immediate);
    let before = total_balance(&bank);

    for amount in ["0.005", "0.001", "10.999"] {
        let err = bank.transfers.submit(&transfer_draft(1, 2, amount)).unwrap_err();
        assert_eq!(
            err.field_errors().unwrap().get("monto"),
            Some("El monto no puede tener más de dos decimales")
        );
    }

    assert_eq!(balance(&bank, 1), dec("5000.50"));
    assert_eq!(balance(&bank, 2), dec("12500.75"));
    assert_eq!(total_balance(&bank), before);
    assert!(bank.transfers.list(&TransferFilter::default()).unwrap().is_empty());

    let err = bank
        .accounts
        .create(&account_draft(1, "1111111111", "100.005"))
        .unwrap_err();
    assert!(err.field_errors().unwrap().contains("saldo"));
}

#[test]
fn test_exact_balance_can_be_transferred() {
    let temp_dir = TempDir::new().unwrap();
    let bank = open_bank(&temp_dir, SettlementMode::Immediate);

    bank.transfers.submit(&transfer_draft(3, 1, "800.00")).unwrap();

    assert_eq!(balance(&bank, 3), Decimal::ZERO);
    assert_eq!(balance(&bank, 1), dec("5800.50"));
}

#[test]
fn test_every_violation_reported_at_once() {
    let temp_dir = TempDir::new().unwrap();
    let bank = open_bank(&temp_dir, SettlementMode::Immediate);

    let draft = TransferDraft {
        source_account_id: 2,
        destination_account_id: 2,
        amount: Decimal::ZERO,
        concept: "   ".to_string(),
    };
    let err = bank.transfers.submit(&draft).unwrap_err();
    let fields = err.field_errors().unwrap();

    assert!(fields.contains("cuentaDestinoId"));
    assert_eq!(fields.get("monto"), Some("El monto debe ser mayor que cero"));
    assert_eq!(fields.get("concepto"), Some("El concepto es obligatorio"));
    assert!(!fields.contains("cuentaOrigenId"));
}

#[test]
fn test_unknown_and_inactive_accounts_are_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let bank = open_bank(&temp_dir, SettlementMode::Immediate);

    let err = bank.transfers.submit(&transfer_draft(1, 42, "10")).unwrap_err();
    assert_eq!(
        err.field_errors().unwrap().get("cuentaDestinoId"),
        Some("La cuenta de destino no existe")
    );

    bank.accounts.set_active(1, false).unwrap();
    let err = bank.transfers.submit(&transfer_draft(1, 2, "10")).unwrap_err();
    assert_eq!(
        err.field_errors().unwrap().get("cuentaOrigenId"),
        Some("La cuenta de origen está inactiva")
    );
    assert_eq!(balance(&bank, 1), dec("5000.50"));
}

#[test]
fn test_money_is_conserved_across_transfers() {
    let temp_dir = TempDir::new().unwrap();
    let bank = open_bank(&temp_dir, SettlementMode::Immediate);
    let before = total_balance(&bank);

    let attempts = [
        (1, 2, "100.10"),
        (2, 3, "2500.25"),
        (3, 1, "9999.99"), // overdraft, rejected
        (3, 1, "1.01"),
        (2, 1, "0.01"),
    ];
    let mut accepted = 0;
    for (from, to, amount) in attempts {
        if bank.transfers.submit(&transfer_draft(from, to, amount)).is_ok() {
            accepted += 1;
        }
    }

    assert_eq!(accepted, 4);
    assert_eq!(total_balance(&bank), before);
    assert_eq!(balance(&bank, 1), dec("5000.50") - dec("100.10") + dec("1.01") + dec("0.01"));
}

// ============================================================================
// Deferred Settlement
// ============================================================================

#[test]
fn test_deferred_transfer_lifecycle() {
    let temp_dir = TempDir::new().unwrap();
    let bank = open_bank(&temp_dir, SettlementMode::Deferred);

    let pending = bank.transfers.submit(&transfer_draft(1, 2, "1500.00")).unwrap();
    let rejected = bank.transfers.submit(&transfer_draft(1, 3, "200.00")).unwrap();
    assert_eq!(pending.status, TransferStatus::Pending);
    assert_eq!(balance(&bank, 1), dec("5000.50"));

    bank.transfers.complete(pending.id.unwrap()).unwrap();
    bank.transfers.reject(rejected.id.unwrap()).unwrap();

    assert_eq!(balance(&bank, 1), dec("3500.50"));
    assert_eq!(balance(&bank, 2), dec("14000.75"));
    assert_eq!(balance(&bank, 3), dec("800.00"));

    // Terminal states stay terminal
    assert!(matches!(
        bank.transfers.reject(pending.id.unwrap()).unwrap_err(),
        Error::InvalidTransition(_)
    ));
    assert!(matches!(
        bank.transfers.complete(rejected.id.unwrap()).unwrap_err(),
        Error::InvalidTransition(_)
    ));

    let pending_only = TransferFilter {
        status: Some(TransferStatus::Pending),
        search: None,
    };
    assert!(bank.transfers.list(&pending_only).unwrap().is_empty());
}

// ============================================================================
// Deletion Without Cascade
// ============================================================================

#[test]
fn test_deleting_records_leaves_references_for_doctor() {
    let temp_dir = TempDir::new().unwrap();
    let bank = open_bank(&temp_dir, SettlementMode::Immediate);
    bank.transfers.submit(&transfer_draft(1, 3, "50")).unwrap();

    bank.users.delete(1).unwrap();
    bank.accounts.delete(3).unwrap();

    // Accounts and transfers survive their owner / counterpart
    assert_eq!(bank.accounts.list(None, Some(1)).unwrap().len(), 2);
    assert_eq!(bank.transfers.list(&TransferFilter::default()).unwrap().len(), 1);

    let report = DoctorService::new(bank.repo.clone()).run_checks().unwrap();
    assert_eq!(report.checks["orphaned_accounts"].status, "warning");
    assert_eq!(report.checks["orphaned_transfers"].status, "error");

    assert!(matches!(bank.users.delete(1).unwrap_err(), Error::NotFound(_)));
    assert!(matches!(bank.accounts.delete(3).unwrap_err(), Error::NotFound(_)));
}

#[test]
fn test_account_edit_revalidates_and_keeps_balance() {
    let temp_dir = TempDir::new().unwrap();
    let bank = open_bank(&temp_dir, SettlementMode::Immediate);

    let patch = ledgerdesk_core::AccountPatch {
        bank: Some("  ".to_string()),
        ..Default::default()
    };
    let err = bank.accounts.update(1, &patch).unwrap_err();
    assert!(err.field_errors().unwrap().contains("banco"));

    let patch = ledgerdesk_core::AccountPatch {
        account_type: Some(AccountType::Checking),
        ..Default::default()
    };
    let updated = bank.accounts.update(1, &patch).unwrap();
    assert_eq!(updated.account_type, AccountType::Checking);
    assert_eq!(updated.balance, dec("5000.50"));
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn test_balances_survive_reopen_exactly() {
    let temp_dir = TempDir::new().unwrap();
    {
        let bank = open_bank(&temp_dir, SettlementMode::Immediate);
        bank.transfers.submit(&transfer_draft(2, 1, "0.35")).unwrap();
    }

    let repo = create_test_repo(&temp_dir);
    let accounts = repo.list_accounts().unwrap();
    assert_eq!(accounts[0].balance, dec("5000.85"));
    assert_eq!(accounts[1].balance, dec("12500.40"));

    let transfers = repo.list_transfers().unwrap();
    assert_eq!(transfers.len(), 1);
    assert!(transfers[0].date.is_some());
}

// ============================================================================
// Demo Mode and Context
// ============================================================================

#[test]
fn test_demo_context_end_to_end() {
    let temp_dir = TempDir::new().unwrap();
    DemoService::new(temp_dir.path()).enable().unwrap();

    let ctx = LedgerContext::new(temp_dir.path()).unwrap();
    assert!(ctx.config.demo_mode);
    assert!(temp_dir.path().join("demo.duckdb").exists());

    let stats = ctx.dashboard_service.stats().unwrap();
    assert_eq!(stats.total_users, 3);
    assert_eq!(stats.total_balance, dec("26251.50"));
    let latest: Vec<i64> = stats.latest_transfers.iter().filter_map(|t| t.id).collect();
    assert_eq!(latest, vec![3, 2, 1]);

    let found = ctx.user_service.list(Some("gonz")).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].email, "maria@example.com");

    let session = ctx.auth_service.login("juan@example.com", "demo1234").unwrap();
    assert_eq!(session.user.id, Some(1));
    assert_eq!(ctx.auth_service.current().unwrap().unwrap().user_id, 1);

    // Account 3 is inactive in the demo data
    let err = ctx
        .transfer_service
        .submit(&transfer_draft(1, 3, "10"))
        .unwrap_err();
    assert!(err.field_errors().unwrap().contains("cuentaDestinoId"));

    assert!(ctx.doctor().is_some());
}

#[test]
fn test_dashboard_reflects_new_transfer() {
    let temp_dir = TempDir::new().unwrap();
    let bank = open_bank(&temp_dir, SettlementMode::Immediate);
    let dashboard = DashboardService::new(bank.repo.clone());

    let before = dashboard.stats().unwrap();
    bank.transfers.submit(&transfer_draft(1, 2, "10")).unwrap();
    let after = dashboard.stats().unwrap();

    assert_eq!(after.total_transfers, before.total_transfers + 1);
    assert_eq!(after.total_balance, before.total_balance);
    assert_eq!(after.transfers_by_status[1].status, TransferStatus::Completed);
    assert_eq!(after.transfers_by_status[1].count, 1);
    assert_eq!(after.recent_months.len(), 1);
}

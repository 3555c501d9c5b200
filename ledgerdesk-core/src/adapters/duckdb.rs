//! DuckDB repository implementation

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use base64::Engine;
use chrono::Utc;
use duckdb::types::Type;
use duckdb::{params, Connection, OptionalExt};
use rand::Rng;
use rust_decimal::Decimal;

use crate::domain::dates::parse_flexible;
use crate::domain::result::{Error, Result};
use crate::domain::{
    Account, AccountDraft, AccountPatch, BalanceUpdate, Session, Transfer, TransferStatus, User,
    UserDraft, UserPatch,
};
use crate::ports::Repository;
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400, 800ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Argon2id parameters for stored passwords
const ARGON2_TIME_COST: u32 = 3;
const ARGON2_MEMORY_COST: u32 = 65536; // 64 MiB
const ARGON2_PARALLELISM: u32 = 4;
const PASSWORD_HASH_LEN: usize = 32;

const USER_COLUMNS: &str =
    "id, name, surname, email, phone, role, active, registered_at";
const ACCOUNT_COLUMNS: &str =
    "id, owner_id, number, account_type, bank, CAST(balance AS VARCHAR), active, created_at";
const TRANSFER_COLUMNS: &str = "id, source_account_id, destination_account_id, \
     CAST(amount AS VARCHAR), concept, status, date";

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
        || lower.contains("could not set lock on file")
}

/// DuckDB repository implementation
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl DuckDbRepository {
    /// Open (or create) the database file
    ///
    /// Retries with exponential backoff while another process holds the file
    /// lock, e.g. a second `ld` invocation that has not exited yet.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: db_path.to_path_buf(),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        eprintln!(
                            "[ledgerdesk] Database busy, retrying in {}ms (attempt {}/{}): {}",
                            delay.as_millis(),
                            attempt + 1,
                            MAX_RETRIES,
                            err_msg
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            Error::database(format!("Failed to open database after {} retries", MAX_RETRIES))
        }))
    }

    fn try_open_connection(db_path: &Path) -> Result<Connection> {
        // Extension autoloading stays off: nothing here needs one and cached
        // extensions in ~/.duckdb can fail code-signing checks on macOS
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Connection::open_with_flags(db_path, config)?)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::database(format!("Connection lock poisoned: {}", e)))
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Run database migrations using the MigrationService
    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.conn()?;
        MigrationService::new(&conn).run_pending()
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    /// Migrations known to the binary but not yet applied
    pub fn pending_migrations(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        MigrationService::new(&conn).get_pending()
    }

    /// Check if a table exists in the main schema
    pub fn table_exists(&self, table_name: &str) -> Result<bool> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM information_schema.tables
             WHERE table_schema = 'main' AND table_name = ?",
            [table_name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // === Doctor checks ===

    /// Accounts whose balance is below zero: (id, number, balance)
    pub fn check_negative_balances(&self) -> Result<Vec<(i64, String, Decimal)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, number, CAST(balance AS VARCHAR) FROM sys_accounts
             WHERE balance < 0 ORDER BY id",
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, decimal_column(row, 2)?)))?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Transfers whose source or destination account no longer exists
    pub fn check_orphaned_transfers(&self) -> Result<Vec<i64>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT t.id FROM sys_transfers t
             LEFT JOIN sys_accounts src ON t.source_account_id = src.id
             LEFT JOIN sys_accounts dst ON t.destination_account_id = dst.id
             WHERE src.id IS NULL OR dst.id IS NULL
             ORDER BY t.id",
        )?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<duckdb::Result<Vec<i64>>>()?;
        Ok(ids)
    }

    /// Accounts whose owner no longer exists
    pub fn check_orphaned_accounts(&self) -> Result<Vec<i64>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT a.id FROM sys_accounts a
             LEFT JOIN sys_users u ON a.owner_id = u.id
             WHERE u.id IS NULL
             ORDER BY a.id",
        )?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<duckdb::Result<Vec<i64>>>()?;
        Ok(ids)
    }

    /// Account numbers used by more than one account, with the usage count
    pub fn check_duplicate_account_numbers(&self) -> Result<Vec<(String, i64)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT number, COUNT(*) FROM sys_accounts
             GROUP BY number HAVING COUNT(*) > 1
             ORDER BY number",
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Transfers whose source and destination are the same account
    pub fn check_self_transfers(&self) -> Result<Vec<i64>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id FROM sys_transfers
             WHERE source_account_id = destination_account_id
             ORDER BY id",
        )?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<duckdb::Result<Vec<i64>>>()?;
        Ok(ids)
    }
}

impl Repository for DuckDbRepository {
    fn backend_name(&self) -> &'static str {
        "local"
    }

    // === Users ===

    fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sys_users ORDER BY id",
            USER_COLUMNS
        ))?;
        let users = stmt
            .query_map([], row_to_user)?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(users)
    }

    fn get_user(&self, id: i64) -> Result<Option<User>> {
        let conn = self.conn()?;
        fetch_user(&conn, id)
    }

    fn create_user(&self, draft: &UserDraft) -> Result<User> {
        let conn = self.conn()?;
        let user = draft.clone().into_user(0, Utc::now());
        let id: i64 = conn.query_row(
            "INSERT INTO sys_users (name, surname, email, phone, role, active, registered_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             RETURNING id",
            params![
                user.name,
                user.surname,
                user.email,
                user.phone,
                user.role,
                user.active,
                user.registered_at.map(|d| d.to_rfc3339()),
            ],
            |row| row.get(0),
        )?;
        Ok(User { id: Some(id), ..user })
    }

    fn update_user(&self, id: i64, patch: &UserPatch) -> Result<User> {
        let conn = self.conn()?;
        let mut user = fetch_user(&conn, id)?
            .ok_or_else(|| Error::not_found(format!("user {}", id)))?;
        user.apply(patch);

        conn.execute(
            "UPDATE sys_users
             SET name = ?, surname = ?, email = ?, phone = ?, role = ?, active = ?
             WHERE id = ?",
            params![
                user.name,
                user.surname,
                user.email,
                user.phone,
                user.role,
                user.active,
                id
            ],
        )?;
        Ok(user)
    }

    fn delete_user(&self, id: i64) -> Result<bool> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM sys_sessions WHERE user_id = ?", params![id])?;
        let deleted = tx.execute("DELETE FROM sys_users WHERE id = ?", params![id])?;
        tx.commit()?;
        Ok(deleted > 0)
    }

    // === Accounts ===

    fn list_accounts(&self) -> Result<Vec<Account>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sys_accounts ORDER BY id",
            ACCOUNT_COLUMNS
        ))?;
        let accounts = stmt
            .query_map([], row_to_account)?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(accounts)
    }

    fn get_account(&self, id: i64) -> Result<Option<Account>> {
        let conn = self.conn()?;
        fetch_account(&conn, id)
    }

    fn list_accounts_by_owner(&self, owner_id: i64) -> Result<Vec<Account>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sys_accounts WHERE owner_id = ? ORDER BY id",
            ACCOUNT_COLUMNS
        ))?;
        let accounts = stmt
            .query_map(params![owner_id], row_to_account)?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(accounts)
    }

    fn create_account(&self, draft: &AccountDraft) -> Result<Account> {
        let conn = self.conn()?;
        let account = draft.clone().into_account(0, Utc::now());
        let id: i64 = conn.query_row(
            "INSERT INTO sys_accounts (owner_id, number, account_type, bank, balance, active, created_at)
             VALUES (?, ?, ?, ?, CAST(? AS DECIMAL(18, 2)), ?, ?)
             RETURNING id",
            params![
                account.owner_id,
                account.number,
                account.account_type.label(),
                account.bank,
                account.balance.to_string(),
                account.active,
                account.created_at.map(|d| d.to_rfc3339()),
            ],
            |row| row.get(0),
        )?;
        Ok(Account { id: Some(id), ..account })
    }

    fn update_account(&self, id: i64, patch: &AccountPatch) -> Result<Account> {
        let conn = self.conn()?;
        let mut account = fetch_account(&conn, id)?
            .ok_or_else(|| Error::not_found(format!("account {}", id)))?;
        account.apply(patch);

        conn.execute(
            "UPDATE sys_accounts
             SET owner_id = ?, number = ?, account_type = ?, bank = ?, active = ?
             WHERE id = ?",
            params![
                account.owner_id,
                account.number,
                account.account_type.label(),
                account.bank,
                account.active,
                id
            ],
        )?;
        Ok(account)
    }

    fn delete_account(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM sys_accounts WHERE id = ?", params![id])?;
        Ok(deleted > 0)
    }

    // === Transfers ===

    fn list_transfers(&self) -> Result<Vec<Transfer>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sys_transfers ORDER BY id",
            TRANSFER_COLUMNS
        ))?;
        let transfers = stmt
            .query_map([], row_to_transfer)?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(transfers)
    }

    fn get_transfer(&self, id: i64) -> Result<Option<Transfer>> {
        let conn = self.conn()?;
        fetch_transfer(&conn, id)
    }

    fn update_transfer_concept(&self, id: i64, concept: &str) -> Result<Transfer> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE sys_transfers SET concept = ? WHERE id = ?",
            params![concept, id],
        )?;
        if updated == 0 {
            return Err(Error::not_found(format!("transfer {}", id)));
        }
        fetch_transfer(&conn, id)?.ok_or_else(|| Error::not_found(format!("transfer {}", id)))
    }

    /// The transfer row and both balances commit together or not at all
    fn record_transfer(&self, transfer: &Transfer, balances: &[BalanceUpdate]) -> Result<Transfer> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let id: i64 = tx.query_row(
            "INSERT INTO sys_transfers
                (source_account_id, destination_account_id, amount, concept, status, date)
             VALUES (?, ?, CAST(? AS DECIMAL(18, 2)), ?, ?, ?)
             RETURNING id",
            params![
                transfer.source_account_id,
                transfer.destination_account_id,
                transfer.amount.to_string(),
                transfer.concept,
                transfer.status.label(),
                transfer.date.map(|d| d.to_rfc3339()),
            ],
            |row| row.get(0),
        )?;
        write_balances(&tx, balances)?;

        tx.commit()?;
        Ok(Transfer {
            id: Some(id),
            ..transfer.clone()
        })
    }

    /// Status change and balances in one transaction.
    ///
    /// The update only matches a transfer that is still pending, so two
    /// processes settling the same transfer cannot both move money.
    fn settle_transfer(
        &self,
        id: i64,
        status: TransferStatus,
        balances: &[BalanceUpdate],
    ) -> Result<Transfer> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let current = fetch_transfer(&tx, id)?
            .ok_or_else(|| Error::not_found(format!("transfer {}", id)))?;
        let updated = tx.execute(
            "UPDATE sys_transfers SET status = ? WHERE id = ? AND status = ?",
            params![status.label(), id, TransferStatus::Pending.label()],
        )?;
        if updated == 0 {
            return Err(Error::InvalidTransition(format!(
                "transfer {} is {}, cannot become {}",
                id, current.status, status
            )));
        }
        write_balances(&tx, balances)?;

        tx.commit()?;
        Ok(Transfer { status, ..current })
    }

    // === Auth ===

    fn authenticate(&self, email: &str, password: &str) -> Result<Session> {
        let conn = self.conn()?;
        let stored: Option<(i64, Option<String>, Option<String>)> = conn
            .query_row(
                "SELECT id, password_salt, password_hash FROM sys_users
                 WHERE lower(email) = lower(?)
                 ORDER BY id LIMIT 1",
                params![email.trim()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let invalid = || Error::Auth("Credenciales inválidas".to_string());
        let (user_id, salt_b64, hash_hex) = match stored {
            Some((id, Some(salt), Some(hash))) => (id, salt, hash),
            _ => return Err(invalid()),
        };

        let salt = base64::engine::general_purpose::STANDARD
            .decode(&salt_b64)
            .map_err(|e| Error::database(format!("Corrupt password salt: {}", e)))?;
        let expected = hex::decode(&hash_hex)
            .map_err(|e| Error::database(format!("Corrupt password hash: {}", e)))?;
        let actual = hash_password(password, &salt)?;
        if !constant_time_eq(&actual, &expected) {
            return Err(invalid());
        }

        let user = fetch_user(&conn, user_id)?.ok_or_else(invalid)?;
        if !user.active {
            return Err(Error::Auth("El usuario está inactivo".to_string()));
        }

        let token_bytes: [u8; 32] = rand::thread_rng().gen();
        let token = hex::encode(token_bytes);
        conn.execute(
            "INSERT INTO sys_sessions (token, user_id, created_at) VALUES (?, ?, ?)",
            params![token, user_id, Utc::now().to_rfc3339()],
        )?;

        Ok(Session { user, token })
    }

    fn end_session(&self, token: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM sys_sessions WHERE token = ?", params![token])?;
        Ok(())
    }

    fn set_password(&self, user_id: i64, password: &str) -> Result<()> {
        let salt: [u8; 16] = rand::thread_rng().gen();
        let hash = hash_password(password, &salt)?;

        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE sys_users SET password_salt = ?, password_hash = ? WHERE id = ?",
            params![
                base64::engine::general_purpose::STANDARD.encode(salt),
                hex::encode(hash),
                user_id
            ],
        )?;
        if updated == 0 {
            return Err(Error::not_found(format!("user {}", user_id)));
        }
        Ok(())
    }
}

fn fetch_user(conn: &Connection, id: i64) -> Result<Option<User>> {
    let user = conn
        .query_row(
            &format!("SELECT {} FROM sys_users WHERE id = ?", USER_COLUMNS),
            params![id],
            row_to_user,
        )
        .optional()?;
    Ok(user)
}

fn fetch_account(conn: &Connection, id: i64) -> Result<Option<Account>> {
    let account = conn
        .query_row(
            &format!("SELECT {} FROM sys_accounts WHERE id = ?", ACCOUNT_COLUMNS),
            params![id],
            row_to_account,
        )
        .optional()?;
    Ok(account)
}

fn fetch_transfer(conn: &Connection, id: i64) -> Result<Option<Transfer>> {
    let transfer = conn
        .query_row(
            &format!("SELECT {} FROM sys_transfers WHERE id = ?", TRANSFER_COLUMNS),
            params![id],
            row_to_transfer,
        )
        .optional()?;
    Ok(transfer)
}

/// Apply balance deltas relative to the stored balance.
///
/// A debit only matches while the account covers it; when it matches no row
/// the caller's transaction is dropped and nothing commits.
fn write_balances(conn: &Connection, balances: &[BalanceUpdate]) -> Result<()> {
    for update in balances {
        let delta = update.delta.to_string();
        let updated = if update.is_debit() {
            conn.execute(
                "UPDATE sys_accounts
                 SET balance = balance + CAST(? AS DECIMAL(18, 2))
                 WHERE id = ? AND balance + CAST(? AS DECIMAL(18, 2)) >= 0",
                params![delta, update.account_id, delta],
            )?
        } else {
            conn.execute(
                "UPDATE sys_accounts SET balance = balance + CAST(? AS DECIMAL(18, 2)) WHERE id = ?",
                params![delta, update.account_id],
            )?
        };
        if updated == 0 {
            if fetch_account(conn, update.account_id)?.is_none() {
                return Err(Error::not_found(format!("account {}", update.account_id)));
            }
            return Err(Error::validation("monto", "El monto excede el saldo disponible"));
        }
    }
    Ok(())
}

fn row_to_user(row: &duckdb::Row) -> duckdb::Result<User> {
    // 0: id, 1: name, 2: surname, 3: email, 4: phone, 5: role, 6: active, 7: registered_at
    let registered_at: Option<String> = row.get(7)?;
    Ok(User {
        id: Some(row.get(0)?),
        name: row.get(1)?,
        surname: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        role: row.get(5)?,
        active: row.get(6)?,
        registered_at: registered_at.as_deref().and_then(parse_flexible),
    })
}

fn row_to_account(row: &duckdb::Row) -> duckdb::Result<Account> {
    // 0: id, 1: owner_id, 2: number, 3: account_type, 4: bank, 5: balance,
    // 6: active, 7: created_at
    let account_type: String = row.get(3)?;
    let created_at: Option<String> = row.get(7)?;
    Ok(Account {
        id: Some(row.get(0)?),
        owner_id: row.get(1)?,
        number: row.get(2)?,
        account_type: account_type
            .parse()
            .map_err(|e: String| conversion_error(3, e))?,
        bank: row.get(4)?,
        balance: decimal_column(row, 5)?,
        active: row.get(6)?,
        created_at: created_at.as_deref().and_then(parse_flexible),
    })
}

fn row_to_transfer(row: &duckdb::Row) -> duckdb::Result<Transfer> {
    // 0: id, 1: source, 2: destination, 3: amount, 4: concept, 5: status, 6: date
    let status: String = row.get(5)?;
    let date: Option<String> = row.get(6)?;
    Ok(Transfer {
        id: Some(row.get(0)?),
        source_account_id: row.get(1)?,
        destination_account_id: row.get(2)?,
        amount: decimal_column(row, 3)?,
        concept: row.get(4)?,
        status: status.parse().map_err(|e: String| conversion_error(5, e))?,
        date: date.as_deref().and_then(parse_flexible),
    })
}

/// DECIMAL columns are selected as VARCHAR and parsed exactly
fn decimal_column(row: &duckdb::Row, idx: usize) -> duckdb::Result<Decimal> {
    let raw: String = row.get(idx)?;
    raw.parse::<Decimal>()
        .map_err(|e| duckdb::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn conversion_error(idx: usize, msg: String) -> duckdb::Error {
    duckdb::Error::FromSqlConversionFailure(idx, Type::Text, msg.into())
}

/// Derive a password hash using Argon2id
fn hash_password(password: &str, salt: &[u8]) -> Result<Vec<u8>> {
    let params = argon2::Params::new(
        ARGON2_MEMORY_COST,
        ARGON2_TIME_COST,
        ARGON2_PARALLELISM,
        Some(PASSWORD_HASH_LEN),
    )
    .map_err(|e| Error::Other(format!("Failed to create argon2 params: {:?}", e)))?;

    let argon2 = argon2::Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let mut hash = vec![0u8; PASSWORD_HASH_LEN];
    argon2
        .hash_password_into(password.as_bytes(), salt, &mut hash)
        .map_err(|e| Error::Other(format!("Failed to hash password: {:?}", e)))?;
    Ok(hash)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

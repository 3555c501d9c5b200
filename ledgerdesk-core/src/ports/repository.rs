//! Repository port - storage abstraction

use crate::domain::result::Result;
use crate::domain::{
    Account, AccountDraft, AccountPatch, BalanceUpdate, Session, Transfer, TransferStatus, User,
    UserDraft, UserPatch,
};

/// Storage abstraction used by every service
///
/// Two adapters implement it: the embedded DuckDB store and the REST
/// collaborator. Lookups return `Ok(None)` for unknown ids; mutations of an
/// unknown id return `Error::NotFound`.
pub trait Repository: Send + Sync {
    /// Short backend name for diagnostics ("local", "rest")
    fn backend_name(&self) -> &'static str;

    // === Users ===

    fn list_users(&self) -> Result<Vec<User>>;

    fn get_user(&self, id: i64) -> Result<Option<User>>;

    /// Insert a validated draft, stamping id and registration date
    fn create_user(&self, draft: &UserDraft) -> Result<User>;

    fn update_user(&self, id: i64, patch: &UserPatch) -> Result<User>;

    /// Returns false when the id did not exist. Owned accounts are kept.
    fn delete_user(&self, id: i64) -> Result<bool>;

    // === Accounts ===

    fn list_accounts(&self) -> Result<Vec<Account>>;

    fn get_account(&self, id: i64) -> Result<Option<Account>>;

    fn list_accounts_by_owner(&self, owner_id: i64) -> Result<Vec<Account>>;

    fn create_account(&self, draft: &AccountDraft) -> Result<Account>;

    /// Update the editable fields. Never touches the balance.
    fn update_account(&self, id: i64, patch: &AccountPatch) -> Result<Account>;

    /// Returns false when the id did not exist. Transfers that reference the
    /// account are kept.
    fn delete_account(&self, id: i64) -> Result<bool>;

    // === Transfers ===

    fn list_transfers(&self) -> Result<Vec<Transfer>>;

    fn get_transfer(&self, id: i64) -> Result<Option<Transfer>>;

    fn update_transfer_concept(&self, id: i64, concept: &str) -> Result<Transfer>;

    /// Insert a transfer and write the given balances
    ///
    /// Callers have already validated the movement; `balances` is empty when
    /// the transfer is recorded without moving money.
    fn record_transfer(&self, transfer: &Transfer, balances: &[BalanceUpdate]) -> Result<Transfer>;

    /// Change the status of an existing transfer and write the given balances
    fn settle_transfer(
        &self,
        id: i64,
        status: TransferStatus,
        balances: &[BalanceUpdate],
    ) -> Result<Transfer>;

    // === Auth ===

    /// Exchange credentials for a session. Bad credentials are `Error::Auth`.
    fn authenticate(&self, email: &str, password: &str) -> Result<Session>;

    /// Invalidate a token issued by `authenticate`
    fn end_session(&self, token: &str) -> Result<()>;

    fn set_password(&self, user_id: i64, password: &str) -> Result<()>;
}

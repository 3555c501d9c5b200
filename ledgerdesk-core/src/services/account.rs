//! Account service - account management

use std::sync::Arc;

use crate::domain::result::{Error, Result};
use crate::domain::{Account, AccountDraft, AccountPatch};
use crate::ports::Repository;

/// Account service for the account list and forms
pub struct AccountService {
    repository: Arc<dyn Repository>,
}

impl AccountService {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }

    /// Accounts, optionally restricted to one owner and narrowed by a
    /// number/bank/type search
    pub fn list(&self, search: Option<&str>, owner_id: Option<i64>) -> Result<Vec<Account>> {
        let accounts = match owner_id {
            Some(owner) => self.repository.list_accounts_by_owner(owner)?,
            None => self.repository.list_accounts()?,
        };
        Ok(match search.map(str::trim).filter(|q| !q.is_empty()) {
            Some(q) => accounts.into_iter().filter(|a| a.matches(q)).collect(),
            None => accounts,
        })
    }

    pub fn get(&self, id: i64) -> Result<Account> {
        self.repository
            .get_account(id)?
            .ok_or_else(|| Error::not_found(format!("Cuenta {} no encontrada", id)))
    }

    pub fn create(&self, draft: &AccountDraft) -> Result<Account> {
        draft.validate().into_result()?;
        self.repository.create_account(draft)
    }

    /// Update the editable fields. The balance only moves through transfers.
    pub fn update(&self, id: i64, patch: &AccountPatch) -> Result<Account> {
        let mut merged = self.get(id)?;
        merged.apply(patch);
        merged.validate().into_result()?;
        self.repository.update_account(id, patch)
    }

    pub fn set_active(&self, id: i64, active: bool) -> Result<Account> {
        self.update(
            id,
            &AccountPatch {
                active: Some(active),
                ..Default::default()
            },
        )
    }

    /// Delete an account. Transfers that reference it are kept.
    pub fn delete(&self, id: i64) -> Result<()> {
        if self.repository.delete_account(id)? {
            Ok(())
        } else {
            Err(Error::not_found(format!("Cuenta {} no encontrada", id)))
        }
    }
}

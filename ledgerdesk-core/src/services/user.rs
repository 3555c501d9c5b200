//! User service - user management

use std::sync::Arc;

use crate::domain::result::{Error, Result};
use crate::domain::{Account, User, UserDraft, UserPatch};
use crate::ports::Repository;

/// User service for the user list and forms
pub struct UserService {
    repository: Arc<dyn Repository>,
}

impl UserService {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }

    /// All users, optionally narrowed by a name/surname/email search
    pub fn list(&self, search: Option<&str>) -> Result<Vec<User>> {
        let users = self.repository.list_users()?;
        Ok(match search.map(str::trim).filter(|q| !q.is_empty()) {
            Some(q) => users.into_iter().filter(|u| u.matches(q)).collect(),
            None => users,
        })
    }

    pub fn get(&self, id: i64) -> Result<User> {
        self.repository
            .get_user(id)?
            .ok_or_else(|| Error::not_found(format!("Usuario {} no encontrado", id)))
    }

    pub fn create(&self, draft: &UserDraft) -> Result<User> {
        draft.validate().into_result()?;
        self.repository.create_user(draft)
    }

    /// Apply a partial update after validating the merged record
    pub fn update(&self, id: i64, patch: &UserPatch) -> Result<User> {
        let mut merged = self.get(id)?;
        merged.apply(patch);
        merged.validate().into_result()?;
        self.repository.update_user(id, patch)
    }

    /// Delete a user. Accounts the user owned are left in place.
    pub fn delete(&self, id: i64) -> Result<()> {
        if self.repository.delete_user(id)? {
            Ok(())
        } else {
            Err(Error::not_found(format!("Usuario {} no encontrado", id)))
        }
    }

    /// Accounts owned by the user
    pub fn accounts(&self, id: i64) -> Result<Vec<Account>> {
        self.get(id)?;
        self.repository.list_accounts_by_owner(id)
    }
}

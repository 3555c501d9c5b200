//! Authenticated session

use serde::{Deserialize, Serialize};

use super::user::User;

/// A logged-in user plus the bearer token the backend issued
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "usuario")]
    pub user: User,
    pub token: String,
}

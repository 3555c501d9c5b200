//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod account;
pub mod dates;
pub mod result;
mod session;
pub mod transfer;
mod user;
pub mod validation;

pub use account::{Account, AccountDraft, AccountPatch, AccountType, BalanceUpdate};
pub use session::Session;
pub use transfer::{Transfer, TransferDraft, TransferFilter, TransferStatus};
pub use user::{User, UserDraft, UserPatch};
pub use validation::ValidationErrors;

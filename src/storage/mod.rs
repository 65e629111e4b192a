//! Persistence backends for the account ledger.

pub mod json_backend;

use std::collections::BTreeMap;

use crate::{
    errors::StorageError,
    ledger::{Account, AccountId},
};

pub type Result<T> = std::result::Result<T, StorageError>;

/// Abstraction over backends capable of storing the full account set.
pub trait AccountStore {
    /// Replaces the persisted state with `accounts`.
    fn save(&self, accounts: &BTreeMap<AccountId, Account>) -> Result<()>;

    /// Reads the persisted state. `Ok(None)` means nothing has been stored yet.
    fn load(&self) -> Result<Option<BTreeMap<AccountId, Account>>>;

    /// Human readable location used in log lines.
    fn describe(&self) -> String;
}

pub use json_backend::JsonFileStore;

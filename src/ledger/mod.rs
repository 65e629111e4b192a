//! Account ledger: balance rules, transfers, and ID assignment.

pub mod account;
#[allow(clippy::module_inception)]
pub mod ledger;

/// Identifier assigned by the ledger; rendered as a decimal string in the JSON file.
pub type AccountId = u64;

pub use account::Account;
pub use ledger::{Ledger, LoadOutcome, PersistenceEvent, TransferReceipt};

use std::{io, path::PathBuf};

use thiserror::Error;

use crate::ledger::AccountId;

/// Error type that captures rejected ledger operations.
///
/// None of these are fatal: the ledger is left exactly as it was before the
/// call, except for [`LedgerError::RefundFailed`] which signals that a transfer
/// could not be compensated.
#[derive(Debug, Error, PartialEq)]
pub enum LedgerError {
    #[error("Invalid amount for {operation}: {amount}")]
    InvalidAmount { operation: Operation, amount: f64 },
    #[error("Account with ID {0} could not be found")]
    AccountNotFound(AccountId),
    #[error("No account IDs left to assign")]
    IdSpaceExhausted,
    #[error("Insufficient amount in account {id} (balance {balance}, requested {requested})")]
    InsufficientFunds {
        id: AccountId,
        balance: f64,
        requested: f64,
    },
    #[error("Transfer failed: insufficient balance or invalid sender ID ({source})")]
    TransferFailed {
        #[source]
        source: Box<LedgerError>,
    },
    #[error("Transfer failed: invalid receiver ID, sender {sender} refunded ({source})")]
    TransferRefunded {
        sender: AccountId,
        #[source]
        source: Box<LedgerError>,
    },
    #[error("Transfer failed and refund to account {sender} could not be applied ({source})")]
    RefundFailed {
        sender: AccountId,
        #[source]
        source: Box<LedgerError>,
    },
}

/// Balance-changing operation named in validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Open,
    Deposit,
    Withdraw,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Open => f.write_str("opening balance"),
            Operation::Deposit => f.write_str("deposit"),
            Operation::Withdraw => f.write_str("withdraw"),
        }
    }
}

/// Failures raised by persistence backends.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("You do not have permission to access `{}`", path.display())]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("File system error on `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Data could not be serialized to JSON: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("`{}` is not a valid accounts file: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StorageError {
    /// Classifies an I/O failure on `path`, separating permission problems.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::PermissionDenied {
            StorageError::PermissionDenied { path, source }
        } else {
            StorageError::Io { path, source }
        }
    }
}

/// Errors raised while resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read configuration `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Configuration `{}` is malformed: {source}", path.display())]
    Serde {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Failures that terminate the console shell.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Prompt(#[from] dialoguer::Error),
    #[error("input closed")]
    InputClosed,
}

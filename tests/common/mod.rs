#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use bank_core::{ledger::Ledger, storage::JsonFileStore};
use once_cell::sync::Lazy;
use tempfile::TempDir;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Returns the path of an accounts file inside a fresh, isolated directory.
pub fn accounts_path() -> PathBuf {
    let temp = TempDir::new().expect("create temp dir");
    let path = temp.path().join("accounts.json");
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    path
}

/// Opens a ledger backed by the JSON file at `path` without loading it.
pub fn ledger_at(path: &Path) -> Ledger {
    Ledger::new(Box::new(JsonFileStore::new(path)))
}

/// Opens and loads a ledger backed by the JSON file at `path`.
pub fn reopen(path: &Path) -> Ledger {
    let mut ledger = ledger_at(path);
    ledger.load().expect("load accounts file");
    ledger
}

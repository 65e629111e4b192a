use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use crate::{
    config::Config,
    errors::StorageError,
    ledger::{Account, AccountId},
};

use super::{AccountStore, Result};

const TMP_SUFFIX: &str = "tmp";
pub const DEFAULT_INDENT: usize = 4;

/// Stores the account map as a single JSON object keyed by decimal account ID.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    atomic: bool,
    indent: usize,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            atomic: true,
            indent: DEFAULT_INDENT,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.accounts_file.clone())
            .with_atomic_writes(config.atomic_writes)
            .with_indent(config.indent)
    }

    /// When disabled the file is truncated and rewritten in place.
    pub fn with_atomic_writes(mut self, atomic: bool) -> Self {
        self.atomic = atomic;
        self
    }

    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn render(&self, accounts: &BTreeMap<AccountId, Account>) -> Result<Vec<u8>> {
        let indent = vec![b' '; self.indent];
        let mut buffer = Vec::new();
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(&indent));
        accounts
            .serialize(&mut serializer)
            .map_err(StorageError::Serialize)?;
        Ok(buffer)
    }
}

impl AccountStore for JsonFileStore {
    fn save(&self, accounts: &BTreeMap<AccountId, Account>) -> Result<()> {
        let data = self.render(accounts)?;
        if self.atomic {
            let tmp = tmp_path(&self.path);
            write_file(&tmp, &data).map_err(|err| StorageError::io(&tmp, err))?;
            fs::rename(&tmp, &self.path).map_err(|err| StorageError::io(&self.path, err))?;
        } else {
            write_file(&self.path, &data).map_err(|err| StorageError::io(&self.path, err))?;
        }
        tracing::debug!(path = %self.path.display(), count = accounts.len(), "accounts written");
        Ok(())
    }

    fn load(&self) -> Result<Option<BTreeMap<AccountId, Account>>> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(StorageError::io(&self.path, err)),
        };
        if data.trim().is_empty() {
            return Ok(None);
        }
        let accounts: BTreeMap<AccountId, Account> =
            serde_json::from_str(&data).map_err(|source| StorageError::Parse {
                path: self.path.clone(),
                source,
            })?;
        Ok(Some(accounts))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_file(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(data)?;
    file.flush()?;
    Ok(())
}

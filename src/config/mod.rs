use std::{
    env, fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{errors::ConfigError, storage::json_backend::DEFAULT_INDENT};

pub const CONFIG_PATH_ENV: &str = "BANK_CORE_CONFIG";
pub const ACCOUNTS_FILE_ENV: &str = "BANK_CORE_ACCOUNTS_FILE";
const APP_DIR: &str = "bank_core";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub accounts_file: PathBuf,
    /// Stage writes in a sibling temp file and rename it over the target.
    pub atomic_writes: bool,
    pub indent: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            accounts_file: PathBuf::from("accounts.json"),
            atomic_writes: true,
            indent: DEFAULT_INDENT,
        }
    }
}

/// Resolves [`Config`] from an optional JSON file plus environment overrides.
pub struct ConfigManager {
    path: Option<PathBuf>,
}

impl ConfigManager {
    /// Uses `$BANK_CORE_CONFIG`, falling back to the platform config directory.
    pub fn new() -> Self {
        let path = env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .or_else(|| dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE)));
        Self { path }
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Reads the config file (defaults when absent) and applies environment overrides.
    pub fn load(&self) -> Result<Config, ConfigError> {
        let mut config = match self.path.as_deref() {
            Some(path) => read_config(path)?,
            None => Config::default(),
        };
        if let Some(file) = env::var_os(ACCOUNTS_FILE_ENV) {
            config.accounts_file = PathBuf::from(file);
        }
        Ok(config)
    }

    /// Like [`ConfigManager::load`], but reports problems and falls back to defaults.
    pub fn load_or_default(&self) -> Config {
        self.load().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "using default configuration");
            let mut config = Config::default();
            if let Some(file) = env::var_os(ACCOUNTS_FILE_ENV) {
                config.accounts_file = PathBuf::from(file);
            }
            config
        })
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

fn read_config(path: &Path) -> Result<Config, ConfigError> {
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Config::default()),
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_str(&data).map_err(|source| ConfigError::Serde {
        path: path.to_path_buf(),
        source,
    })
}

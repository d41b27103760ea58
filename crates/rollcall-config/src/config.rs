use serde::{Deserialize, Serialize};
use std::fs::File;
use std::os::unix::io::AsRawFd;
use std::path::PathBuf;
use thiserror::Error;

use crate::paths::{get_config_path, get_credentials_path, get_token_path};

struct ConfigLock {
    _file: File,
}

impl ConfigLock {
    fn acquire_exclusive() -> Result<Self, std::io::Error> {
        let lock_path = get_config_path().with_extension("lock");
        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&lock_path)?;
        let fd = file.as_raw_fd();
        let result = unsafe { libc::flock(fd, libc::LOCK_EX) };
        if result != 0 {
            return Err(std::io::Error::last_os_error());
        }
        Ok(ConfigLock { _file: file })
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            log_level: default_log_level(),
            request_timeout: default_request_timeout(),
        }
    }
}

fn default_bind() -> String {
    rollcall_types::DEFAULT_BIND.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_true")]
    pub seed: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { seed: true }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_spreadsheet_id")]
    pub spreadsheet_id: String,
    #[serde(default = "default_range")]
    pub range: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Changing the scope invalidates the cached token; delete token.json
    /// and run `rollcall auth` again.
    #[serde(default = "default_scope")]
    pub scope: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_path: Option<String>,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            spreadsheet_id: default_spreadsheet_id(),
            range: default_range(),
            api_url: default_api_url(),
            scope: default_scope(),
            credentials_path: None,
            token_path: None,
        }
    }
}

fn default_spreadsheet_id() -> String {
    "10-CfbfktbeTSMV3tgnIKwaBquzw-RmjS13Tut9A32_s".to_string()
}

fn default_range() -> String {
    "Sheet1".to_string()
}

fn default_api_url() -> String {
    "https://sheets.googleapis.com".to_string()
}

fn default_scope() -> String {
    "https://www.googleapis.com/auth/spreadsheets".to_string()
}

impl SheetsConfig {
    pub fn credentials_path(&self) -> PathBuf {
        self.credentials_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(get_credentials_path)
    }

    pub fn token_path(&self) -> PathBuf {
        self.token_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(get_token_path)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub sheets: SheetsConfig,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let _lock = ConfigLock::acquire_exclusive()?;
        Self::load_unlocked()
    }

    fn load_unlocked() -> Result<Self, ConfigError> {
        let config_path = get_config_path();
        if !config_path.exists() {
            return Ok(Config::default());
        }
        let content = std::fs::read_to_string(&config_path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Base URL the CLI uses to reach the daemon.
    pub fn daemon_url(&self) -> String {
        format!("http://{}", self.daemon.bind)
    }
}

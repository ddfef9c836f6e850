//! Server configuration.
//!
//! A [`Config`] is assembled once at startup, either from a YAML file, from
//! environment variables, or both, and is never changed after the server binds.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming an optional YAML configuration file.
pub const CONFIG_FILE_ENV: &str = "STAGEHAND_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("unable to set document root: {} doesn't exist or is not a directory", .0.display())]
    InvalidDocumentRoot(PathBuf),

    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub debug: bool,
    pub document_root: Option<PathBuf>,
    /// How long to wait for the first bytes of a request before answering 408.
    pub read_timeout_ms: u64,
    /// Upper bound on a single accept wait; also bounds shutdown latency.
    pub accept_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            debug: false,
            document_root: None,
            read_timeout_ms: 60_000,
            accept_timeout_ms: 1_000,
        }
    }
}

impl Config {
    /// Loads the configuration from the environment.
    ///
    /// If `STAGEHAND_CONFIG` names a file it is read first; `HTTP_HOST`,
    /// `HTTP_PORT`, `HTTP_DEBUG`, `DOCUMENT_ROOT` and `READ_TIMEOUT_MS` then
    /// override whatever the file said.
    pub fn load() -> Result<Self, ConfigError> {
        let mut cfg = match std::env::var_os(CONFIG_FILE_ENV) {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Ok(host) = std::env::var("HTTP_HOST") {
            cfg.host = host;
        }
        if let Ok(port) = std::env::var("HTTP_PORT") {
            cfg.port = port.parse().map_err(|_| ConfigError::InvalidValue {
                name: "HTTP_PORT",
                value: port,
            })?;
        }
        if let Ok(debug) = std::env::var("HTTP_DEBUG") {
            cfg.debug = parse_flag(&debug).ok_or(ConfigError::InvalidValue {
                name: "HTTP_DEBUG",
                value: debug,
            })?;
        }
        if let Some(root) = std::env::var_os("DOCUMENT_ROOT") {
            cfg.document_root = Some(PathBuf::from(root));
        }
        if let Ok(ms) = std::env::var("READ_TIMEOUT_MS") {
            cfg.read_timeout_ms = ms.parse().map_err(|_| ConfigError::InvalidValue {
                name: "READ_TIMEOUT_MS",
                value: ms,
            })?;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let cfg: Config = serde_yaml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Sets the document root, failing unless `dir` is an existing directory.
    pub fn with_document_root(mut self, dir: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let dir = dir.into();
        check_document_root(&dir)?;
        self.document_root = Some(dir);
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(dir) = &self.document_root {
            check_document_root(dir)?;
        }
        if self.read_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                name: "read_timeout_ms",
                value: "0".to_string(),
            });
        }
        if self.accept_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                name: "accept_timeout_ms",
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn accept_timeout(&self) -> Duration {
        Duration::from_millis(self.accept_timeout_ms)
    }
}

fn check_document_root(dir: &Path) -> Result<(), ConfigError> {
    if dir.is_dir() {
        Ok(())
    } else {
        Err(ConfigError::InvalidDocumentRoot(dir.to_path_buf()))
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

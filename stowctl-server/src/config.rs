//! Server configuration - paths, bind address and database location
//!
//! Resolution order (later wins):
//! 1. Built-in defaults rooted at `base_dir` (default: ~/.stowctl)
//! 2. TOML file at `$STOWCTL_CONFIG` or `<base_dir>/stowctl.toml`, if present
//! 3. Environment: `STOWCTL_DATABASE_URL`, `STOWCTL_BIND`
//!
//! CLI flags are applied on top by the caller.

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Name of the optional config file inside `base_dir`
pub const CONFIG_FILE_NAME: &str = "stowctl.toml";

/// Name of the SQLite database file inside `base_dir`
pub const DATABASE_FILE_NAME: &str = "stowctl.db";

/// Directory (relative to `base_dir`) served under `/static`
pub const STATIC_DIR: &str = "static";

/// Directory (relative to `base_dir`) holding uploaded images
pub const IMAGES_DIR: &str = "static/images";

const DEFAULT_BIND: ([u8; 4], u16) = ([127, 0, 0, 1], 8000);
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Root for the database file and the static/images directory
    pub base_dir: PathBuf,

    /// sqlx SQLite connection string
    pub database_url: String,

    /// Address to bind to (default: 127.0.0.1:8000)
    pub bind_addr: SocketAddr,

    /// Allow permissive CORS (default: false = localhost only)
    pub cors_permissive: bool,

    /// Per-request timeout
    pub request_timeout_secs: u64,
}

/// On-disk shape of `stowctl.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub database_url: Option<String>,
    pub bind: Option<SocketAddr>,
    pub cors_permissive: Option<bool>,
    pub request_timeout_secs: Option<u64>,
}

impl ServerConfig {
    /// Defaults rooted at `base_dir`, without reading files or environment.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        Self {
            database_url: database_url_for(&base_dir),
            base_dir,
            bind_addr: SocketAddr::from(DEFAULT_BIND),
            cors_permissive: false,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }

    /// Load configuration using `STOWCTL_BASE_DIR` or the default base dir.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_base(None)
    }

    /// Load configuration, with an explicit base directory taking precedence
    /// over `STOWCTL_BASE_DIR`.
    pub fn load_with_base(base_dir: Option<PathBuf>) -> Result<Self, ConfigError> {
        let base_dir = base_dir
            .or_else(|| env::var_os("STOWCTL_BASE_DIR").map(PathBuf::from))
            .unwrap_or_else(default_base_dir);

        let mut config = Self::with_base_dir(base_dir);

        let file_path = env::var_os("STOWCTL_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| config.base_dir.join(CONFIG_FILE_NAME));

        if file_path.exists() {
            let file = ConfigFile::read(&file_path)?;
            tracing::debug!(path = %file_path.display(), "Loaded config file");
            config.apply_file(file);
        }

        config.apply_env()?;
        Ok(config)
    }

    /// Overlay values from a parsed config file.
    pub fn apply_file(&mut self, file: ConfigFile) {
        if let Some(url) = file.database_url {
            self.database_url = url;
        }
        if let Some(bind) = file.bind {
            self.bind_addr = bind;
        }
        if let Some(permissive) = file.cors_permissive {
            self.cors_permissive = permissive;
        }
        if let Some(secs) = file.request_timeout_secs {
            self.request_timeout_secs = secs;
        }
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(url) = env::var("STOWCTL_DATABASE_URL") {
            self.database_url = url;
        }
        if let Ok(bind) = env::var("STOWCTL_BIND") {
            self.bind_addr = bind.parse().map_err(|_| ConfigError::InvalidValue {
                key: "STOWCTL_BIND",
                value: bind,
            })?;
        }
        Ok(())
    }

    /// Directory served under `/static`
    pub fn static_dir(&self) -> PathBuf {
        self.base_dir.join(STATIC_DIR)
    }

    /// Directory holding uploaded originals and thumbnails
    pub fn images_dir(&self) -> PathBuf {
        self.base_dir.join(IMAGES_DIR)
    }
}

impl ConfigFile {
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Default base directory: ~/.stowctl
pub fn default_base_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".stowctl")
}

/// SQLite connection string for the database file under `base_dir`
pub fn database_url_for(base_dir: &Path) -> String {
    format!("sqlite://{}", base_dir.join(DATABASE_FILE_NAME).display())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_rooted_at_base_dir() {
        let config = ServerConfig::with_base_dir("/srv/stow");

        assert_eq!(config.database_url, "sqlite:///srv/stow/stowctl.db");
        assert_eq!(config.static_dir(), PathBuf::from("/srv/stow/static"));
        assert_eq!(
            config.images_dir(),
            PathBuf::from("/srv/stow/static/images")
        );
        assert_eq!(config.bind_addr.port(), 8000);
        assert!(!config.cors_permissive);
    }

    #[test]
    fn file_values_override_defaults() {
        let file: ConfigFile = toml::from_str(
            r#"
            bind = "0.0.0.0:9000"
            cors_permissive = true
            "#,
        )
        .unwrap();

        let mut config = ServerConfig::with_base_dir("/srv/stow");
        config.apply_file(file);

        assert_eq!(config.bind_addr, "0.0.0.0:9000".parse().unwrap());
        assert!(config.cors_permissive);
        // untouched keys keep their defaults
        assert_eq!(config.database_url, "sqlite:///srv/stow/stowctl.db");
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result: Result<ConfigFile, _> = toml::from_str("colour = \"blue\"");
        assert!(result.is_err());
    }

    #[test]
    fn read_reports_parse_errors_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "bind = 12").unwrap();

        let err = ConfigFile::read(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("stowctl.toml"));
    }
}

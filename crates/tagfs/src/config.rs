//! Configuration file.
//!
//! ```toml
//! dsn = "~/.local/share/tagfs/tags.db"
//! ```

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from loading or writing the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("cannot serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("{0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Path of the SQLite tag index. `~` is expanded.
    pub dsn: String,
}

impl Default for Config {
    fn default() -> Self {
        let dsn = dirs::data_local_dir()
            .map(|d| d.join("tagfs").join("tags.db"))
            .unwrap_or_else(|| PathBuf::from("tags.db"));
        Self {
            dsn: dsn.to_string_lossy().into_owned(),
        }
    }
}

impl Config {
    /// `<config_dir>/tagfs/config.toml`, or `./tagfs.toml` without a config dir.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("tagfs").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("tagfs.toml"))
    }

    /// Load from `path`, writing the default configuration there first if
    /// the file does not exist yet.
    pub fn load_or_init(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "writing default config");
            Self::default().save(path)?;
        }
        Self::load(path)
    }

    pub fn load(path: &Path) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let text = toml::to_string_pretty(self)?;
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(path, text).map_err(io_err)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.dsn.trim().is_empty() {
            return Err(ConfigError::Invalid("dsn is required".into()));
        }
        Ok(())
    }

    /// The database path with `~` expanded.
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.dsn).as_ref())
    }

    /// Create the database's parent directory if needed.
    pub fn ensure_db_dir(&self) -> ConfigResult<PathBuf> {
        let db = self.db_path();
        if let Some(parent) = db.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        Ok(db)
    }
}

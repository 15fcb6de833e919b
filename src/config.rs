// Configuration loading and parsing (config/app.toml).

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    Validation { field: String, message: String },
}

// ---------------------------------------------------------------------------
// Assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite cache location.
    pub db_path: PathBuf,
    pub log_dir: PathBuf,
    /// Default tracing filter, overridable with RUST_LOG.
    pub log_filter: String,
}

// ---------------------------------------------------------------------------
// app.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
struct AppFile {
    #[serde(default)]
    storage: StorageSection,
    #[serde(default)]
    logging: LoggingSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct StorageSection {
    db_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct LoggingSection {
    dir: PathBuf,
    filter: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        LoggingSection {
            dir: PathBuf::from("logs"),
            filter: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load `config/app.toml` relative to `base_dir`. A missing file is not an
/// error; every field has a default.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join("app.toml");

    let file: AppFile = if path.exists() {
        let text = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io {
            path: path.clone(),
            source: e,
        })?;
        toml::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.clone(),
            source: e,
        })?
    } else {
        AppFile::default()
    };

    let db_path = match file.storage.db_path {
        Some(p) if p.is_absolute() => p,
        Some(p) => base_dir.join(p),
        None => default_db_path(),
    };
    let log_dir = if file.logging.dir.is_absolute() {
        file.logging.dir
    } else {
        base_dir.join(file.logging.dir)
    };

    let config = Config {
        db_path,
        log_dir,
        log_filter: file.logging.filter,
    };

    validate(&config)?;

    Ok(config)
}

/// Load configuration relative to the current directory.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(Path::new("."))
}

/// Per-user data directory, falling back to a relative path when the
/// platform exposes none.
fn default_db_path() -> PathBuf {
    match ProjectDirs::from("", "", "volley-manager") {
        Some(dirs) => dirs.data_dir().join("volley-manager.db"),
        None => PathBuf::from("data").join("volley-manager.db"),
    }
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.log_filter.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "logging.filter".to_string(),
            message: "must not be empty".to_string(),
        });
    }
    Ok(())
}

//! Configuration management.
//!
//! Settings are resolved in layers: built-in defaults, then the TOML config
//! file (`spectator.toml` in the data directory, or an explicit path), then
//! environment variables, then command line flags.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hub::DEFAULT_BUFFER;
use crate::ingest::RasterizeConfig;
use crate::repository::DbContext;

/// Default database filename inside the data directory.
pub const DEFAULT_DATABASE_FILENAME: &str = "spectator.db";

/// Config file looked up in the data directory.
pub const CONFIG_FILENAME: &str = "spectator.toml";

/// Default listen address.
pub const DEFAULT_BIND: &str = "127.0.0.1:8000";

/// Default request body limit for uploads (512 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

const UPLOADS_SUBDIR: &str = "uploads";

/// Errors loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base data directory.
    pub data_dir: PathBuf,
    /// Database URL (overrides `data_dir/spectator.db` if set).
    pub database_url: Option<String>,
    /// Where uploads wait for ingestion (default `data_dir/uploads`).
    pub upload_dir: Option<PathBuf>,
    /// Static client build served at `/`.
    pub web_dir: Option<PathBuf>,
    /// Listen address for `serve`.
    pub bind: String,
    pub max_upload_bytes: usize,
    /// Queue depth of each live-update subscriber.
    pub subscriber_buffer: usize,
    pub rasterize: RasterizeConfig,
}

impl Default for Settings {
    fn default() -> Self {
        // Falls back gracefully: data dir -> home dir -> current dir
        let data_dir = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("spectator");
        Self::with_data_dir(data_dir)
    }
}

impl Settings {
    /// Create settings with a custom data directory.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            database_url: None,
            upload_dir: None,
            web_dir: None,
            bind: DEFAULT_BIND.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            subscriber_buffer: DEFAULT_BUFFER,
            rasterize: RasterizeConfig::default(),
        }
    }

    /// Get the database URL, constructing from path if not explicitly set.
    pub fn database_url(&self) -> String {
        match self.database_url {
            Some(ref url) => url.clone(),
            None => format!("sqlite:{}", self.database_path().display()),
        }
    }

    /// Default database file path inside the data directory.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DEFAULT_DATABASE_FILENAME)
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.upload_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join(UPLOADS_SUBDIR))
    }

    /// Apply environment overrides. `lookup` is `std::env::var` in practice.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(dir) = var("SPECTATOR_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(url) = var("DATABASE_URL") {
            self.database_url = Some(url);
        }
        if let Some(bind) = var("SPECTATOR_BIND") {
            self.bind = bind;
        }
    }

    /// Ensure the data and upload directories exist.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        for dir in [self.data_dir.clone(), self.upload_dir()] {
            std::fs::create_dir_all(&dir).map_err(|e| {
                std::io::Error::new(
                    e.kind(),
                    format!("Failed to create directory '{}': {}", dir.display(), e),
                )
            })?;
        }
        Ok(())
    }

    /// Create a database context using the configured database URL or path.
    pub fn create_db_context(&self) -> DbContext {
        DbContext::from_url(&self.database_url())
    }
}

/// Configuration file structure. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: Option<String>,
    pub database_url: Option<String>,
    pub upload_dir: Option<String>,
    pub web_dir: Option<String>,
    pub bind: Option<String>,
    pub max_upload_bytes: Option<usize>,
    pub subscriber_buffer: Option<usize>,
    pub rasterize: Option<RasterizeConfig>,
}

impl Config {
    pub fn from_toml(path: &Path, contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_toml(path, &contents)
    }

    /// Resolve a path from the config file; relative paths are relative to
    /// the file's directory.
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let path = PathBuf::from(path_str);
        if path.is_absolute() {
            path
        } else {
            base_dir.join(path)
        }
    }

    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref dir) = self.data_dir {
            settings.data_dir = self.resolve_path(dir, base_dir);
        }
        if let Some(ref url) = self.database_url {
            settings.database_url = Some(url.clone());
        }
        if let Some(ref dir) = self.upload_dir {
            settings.upload_dir = Some(self.resolve_path(dir, base_dir));
        }
        if let Some(ref dir) = self.web_dir {
            settings.web_dir = Some(self.resolve_path(dir, base_dir));
        }
        if let Some(ref bind) = self.bind {
            settings.bind = bind.clone();
        }
        if let Some(max) = self.max_upload_bytes {
            settings.max_upload_bytes = max;
        }
        if let Some(buffer) = self.subscriber_buffer {
            settings.subscriber_buffer = buffer;
        }
        if let Some(ref rasterize) = self.rasterize {
            settings.rasterize = rasterize.clone();
        }
    }
}

/// Options that override config discovery.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file (must exist).
    pub config_path: Option<PathBuf>,
    /// Data directory from the command line.
    pub data_dir: Option<PathBuf>,
}

/// Resolve settings from defaults, config file, environment and flags.
pub async fn load_settings(options: LoadOptions) -> Result<Settings, ConfigError> {
    let env = |name: &str| std::env::var(name).ok();

    // The data directory decides where the config file is looked up.
    let mut settings = Settings::default();
    settings.apply_env(env);
    if let Some(ref dir) = options.data_dir {
        settings.data_dir = dir.clone();
    }

    let config_path = match options.config_path {
        Some(path) => Some(path),
        None => {
            let candidate = settings.data_dir.join(CONFIG_FILENAME);
            candidate.exists().then_some(candidate)
        }
    };

    if let Some(path) = config_path {
        tracing::debug!("Loading config from {}", path.display());
        let config = Config::load_from_path(&path).await?;
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        config.apply_to_settings(&mut settings, &base_dir);

        // Environment and flags win over the file.
        settings.apply_env(env);
        if let Some(dir) = options.data_dir {
            settings.data_dir = dir;
        }
    }

    Ok(settings)
}

use std::path::Path;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{EtlError, Result};
use crate::schema::ConflictPolicy;
use crate::warehouse::Backend;

/// Application configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Destination database
    pub database: DatabaseConfig,
    /// Log output
    pub logging: LoggingConfig,
    /// Source roots and load behavior
    pub pipeline: PipelineConfig,
}

/// Destination database session parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Which database to load into
    pub backend: Backend,
    /// PostgreSQL host
    pub host: String,
    /// PostgreSQL port
    pub port: u16,
    /// PostgreSQL database name
    pub dbname: String,
    /// PostgreSQL user
    pub user: String,
    /// PostgreSQL password
    pub password: String,
    /// Database file used by the sqlite backend
    pub sqlite_path: String,
}

/// Log output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter level when `RUST_LOG` is unset
    pub level: String,
    /// Rolling JSON log file, if any
    pub file_path: Option<String>,
    /// Console format
    pub format: String, // "json" or "text"
}

/// Source directories and load behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Root of the song metadata files
    pub song_data_dir: String,
    /// Root of the activity log files
    pub log_data_dir: String,
    /// Handling of songs and artists already loaded
    pub on_conflict: ConflictPolicy,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Postgres,
            host: String::new(),
            port: 5432,
            dbname: String::new(),
            user: String::new(),
            password: String::new(),
            sqlite_path: "data/sparkify.db".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_path: None,
            format: "text".to_string(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            song_data_dir: "data/song_data".to_string(),
            log_data_dir: "data/log_data".to_string(),
            on_conflict: ConflictPolicy::Fail,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, config files and the environment
    ///
    /// Precedence, lowest first: built-in defaults, `config/default`,
    /// `config/local`, `path`, then `SPARKIFY_*` environment variables using
    /// `__` between section and key (`SPARKIFY_DATABASE__HOST`).
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            // Start with default values
            .add_source(Config::try_from(&Self::default())?)
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false));

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        let config = builder
            .add_source(Environment::with_prefix("SPARKIFY").prefix_separator("_").separator("__"))
            .build()
            .map_err(|e| EtlError::Config(format!("Failed to load configuration: {e}")))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| EtlError::Config(format!("Failed to deserialize configuration: {e}")))?;

        app_config.validate()?;

        Ok(app_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        // Validate database config
        match self.database.backend {
            Backend::Postgres => {
                let required = [
                    ("host", &self.database.host),
                    ("dbname", &self.database.dbname),
                    ("user", &self.database.user),
                    ("password", &self.database.password),
                ];
                for (name, value) in required {
                    if value.trim().is_empty() {
                        return Err(EtlError::Config(format!("database.{name} is required for the postgres backend")));
                    }
                }
                if self.database.port == 0 {
                    return Err(EtlError::Config("database.port must be greater than 0".to_string()));
                }
            },
            Backend::Sqlite => {
                if self.database.sqlite_path.trim().is_empty() {
                    return Err(EtlError::Config("database.sqlite_path is required for the sqlite backend".to_string()));
                }
            },
        }

        // Validate logging config
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(EtlError::Config(format!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level, valid_levels
            )));
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(EtlError::Config(format!(
                "Invalid log format: {}. Must be one of: {:?}",
                self.logging.format, valid_formats
            )));
        }

        // Validate pipeline config
        if self.pipeline.song_data_dir.trim().is_empty() {
            return Err(EtlError::Config("pipeline.song_data_dir cannot be empty".to_string()));
        }
        if self.pipeline.log_data_dir.trim().is_empty() {
            return Err(EtlError::Config("pipeline.log_data_dir cannot be empty".to_string()));
        }

        Ok(())
    }

    /// Get log level from environment or config
    #[must_use]
    pub fn get_log_level(&self) -> String {
        std::env::var("RUST_LOG").unwrap_or_else(|_| self.logging.level.clone())
    }
}

use crate::constants::{DEFAULT_CSV_PATH, DEFAULT_SQLITE_PATH};
use crate::error::{EtlError, Result};
use serde::Deserialize;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Runtime configuration, read from `config.toml` and then overridden by
/// `AFCON_*` environment variables. Every field has a default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub database: DatabaseConfig,
    pub load: LoadConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub csv_path: PathBuf,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from(DEFAULT_CSV_PATH),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Postgres,
    Sqlite,
    Memory,
}

impl FromStr for Backend {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Backend::Postgres),
            "sqlite" => Ok(Backend::Sqlite),
            "memory" => Ok(Backend::Memory),
            other => Err(EtlError::Config(format!(
                "unknown database backend '{other}' (expected postgres, sqlite or memory)"
            ))),
        }
    }
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub backend: Backend,
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
    pub sqlite_path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            host: "localhost".to_string(),
            port: 5432,
            dbname: "afcon_db".to_string(),
            user: "postgres".to_string(),
            password: String::new(),
            sqlite_path: PathBuf::from(DEFAULT_SQLITE_PATH),
        }
    }
}

// Keep the password out of logs.
impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("backend", &self.backend)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .field("user", &self.user)
            .field("password", &if self.password.is_empty() { "" } else { "***" })
            .field("sqlite_path", &self.sqlite_path)
            .finish()
    }
}

/// What the pipeline does when the load stage fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnLoadError {
    /// Roll back and fail the run
    #[default]
    Abort,
    /// Roll back, log the error and finish the run without loaded rows
    Log,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    pub on_error: OnLoadError,
    /// Create the `matches` table before loading
    pub migrate: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub directory: PathBuf,
    pub file_name: String,
    /// Used when `RUST_LOG` is not set
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("logs"),
            file_name: "afcon_etl.log".to_string(),
            filter: "afcon_etl=info".to_string(),
        }
    }
}

impl Config {
    /// Load `path` if it exists, fall back to defaults otherwise, then apply
    /// environment overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| {
                EtlError::Config(format!(
                    "Failed to read config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
            Self::from_toml(&content)?
        } else {
            debug!("No config file at {}, using defaults", path.display());
            Self::default()
        };

        config.apply_overrides(|key| env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `AFCON_*` overrides using `lookup` to resolve variable names.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("AFCON_CSV_PATH") {
            self.source.csv_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("AFCON_DB_BACKEND") {
            self.database.backend = v.parse()?;
        }
        if let Some(v) = lookup("AFCON_DB_HOST") {
            self.database.host = v;
        }
        if let Some(v) = lookup("AFCON_DB_PORT") {
            self.database.port = v
                .trim()
                .parse()
                .map_err(|_| EtlError::Config(format!("AFCON_DB_PORT is not a port number: '{v}'")))?;
        }
        if let Some(v) = lookup("AFCON_DB_NAME") {
            self.database.dbname = v;
        }
        if let Some(v) = lookup("AFCON_DB_USER") {
            self.database.user = v;
        }
        if let Some(v) = lookup("AFCON_DB_PASSWORD") {
            self.database.password = v;
        }
        if let Some(v) = lookup("AFCON_SQLITE_PATH") {
            self.database.sqlite_path = PathBuf::from(v);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_target_local_postgres() {
        let config = Config::default();
        assert_eq!(config.source.csv_path, PathBuf::from(DEFAULT_CSV_PATH));
        assert_eq!(config.database.backend, Backend::Postgres);
        assert_eq!(config.database.host, "localhost");
        assert_eq!(config.database.port, 5432);
        assert_eq!(config.database.dbname, "afcon_db");
        assert_eq!(config.load.on_error, OnLoadError::Abort);
        assert!(!config.load.migrate);
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = Config::from_toml(
            r#"
            [database]
            backend = "sqlite"
            sqlite_path = "/tmp/afcon.db"

            [load]
            on_error = "log"
            "#,
        )
        .unwrap();

        assert_eq!(config.database.backend, Backend::Sqlite);
        assert_eq!(config.database.sqlite_path, PathBuf::from("/tmp/afcon.db"));
        assert_eq!(config.database.port, 5432);
        assert_eq!(config.load.on_error, OnLoadError::Log);
        assert_eq!(config.logging.file_name, "afcon_etl.log");
    }

    #[test]
    fn unknown_backend_in_toml_is_rejected() {
        let err = Config::from_toml("[database]\nbackend = \"oracle\"\n").unwrap_err();
        assert!(matches!(err, EtlError::Toml(_)));
    }

    #[test]
    fn environment_overrides_file_values() {
        let vars: HashMap<&str, &str> = [
            ("AFCON_CSV_PATH", "fixtures.csv"),
            ("AFCON_DB_BACKEND", "memory"),
            ("AFCON_DB_HOST", "db.internal"),
            ("AFCON_DB_PORT", "6543"),
            ("AFCON_DB_PASSWORD", "s3cret"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.source.csv_path, PathBuf::from("fixtures.csv"));
        assert_eq!(config.database.backend, Backend::Memory);
        assert_eq!(config.database.host, "db.internal");
        assert_eq!(config.database.port, 6543);
        assert_eq!(config.database.password, "s3cret");
        assert_eq!(config.database.user, "postgres");
    }

    #[test]
    fn bad_port_override_is_a_config_error() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(|k| (k == "AFCON_DB_PORT").then(|| "fifty".to_string()))
            .unwrap_err();
        assert!(matches!(err, EtlError::Config(_)));
    }

    #[test]
    fn debug_output_redacts_password() {
        let mut db = DatabaseConfig::default();
        db.password = "hunter2".to_string();
        let rendered = format!("{db:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("***"));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.database.dbname, "afcon_db");
    }
}

//! TOML configuration for processes embedding the landmark registry.
//!
//! # Responsibility
//! - Load database and logging settings from a TOML file or string.
//! - Substitute `${VAR}` placeholders from the environment before parsing.
//!
//! # Invariants
//! - Every section is optional; missing values fall back to defaults.
//! - Unknown keys are rejected so typos surface at startup.
//! - Placeholders naming unset variables are left verbatim.

use crate::logging::{default_log_level, normalize_level};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const DEFAULT_DATABASE_FILE: &str = "landmarks.sqlite3";

static ENV_PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid env placeholder regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// SQLite file path, relative to the working directory when not absolute.
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DATABASE_FILE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// One of `trace|debug|info|warn|error`.
    pub level: String,
    /// Absolute directory for rolling log files. `None` disables file logging.
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level().to_string(),
            dir: None,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(toml::de::Error),
    Invalid {
        field: &'static str,
        message: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config TOML: {err}"),
            Self::Invalid { field, message } => write!(f, "invalid config `{field}`: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid { .. } => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}

impl CoreConfig {
    /// Reads, substitutes, parses and validates a config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Substitutes, parses and validates config text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let substituted = substitute_env_vars(content);
        let config: Self = toml::from_str(&substituted)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                field: "database.path",
                message: "must not be empty".to_string(),
            });
        }

        normalize_level(&self.logging.level).map_err(|message| ConfigError::Invalid {
            field: "logging.level",
            message,
        })?;

        if let Some(dir) = &self.logging.dir {
            if !dir.is_absolute() {
                return Err(ConfigError::Invalid {
                    field: "logging.dir",
                    message: format!("must be an absolute path, got `{}`", dir.display()),
                });
            }
        }

        Ok(())
    }
}

fn substitute_env_vars(content: &str) -> String {
    ENV_PLACEHOLDER_RE
        .replace_all(content, |caps: &Captures<'_>| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::{substitute_env_vars, ConfigError, CoreConfig};
    use std::io::Write;
    use std::path::PathBuf;

    #[test]
    fn empty_document_uses_defaults() {
        let config = CoreConfig::from_toml_str("").unwrap();
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.database.path, PathBuf::from("landmarks.sqlite3"));
        assert!(config.logging.dir.is_none());
    }

    #[test]
    fn parses_all_sections() {
        let config = CoreConfig::from_toml_str(
            r#"
            [database]
            path = "/var/lib/emr/landmarks.db"

            [logging]
            level = "warn"
            dir = "/var/log/emr"
            "#,
        )
        .unwrap();
        assert_eq!(
            config.database.path,
            PathBuf::from("/var/lib/emr/landmarks.db")
        );
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.logging.dir, Some(PathBuf::from("/var/log/emr")));
    }

    #[test]
    fn rejects_unknown_keys_and_bad_values() {
        let err = CoreConfig::from_toml_str("[database]\nfile = \"x\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));

        let err = CoreConfig::from_toml_str("[logging]\nlevel = \"loud\"").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "logging.level",
                ..
            }
        ));

        let err = CoreConfig::from_toml_str("[logging]\ndir = \"logs\"").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "logging.dir",
                ..
            }
        ));
    }

    #[test]
    fn substitutes_known_env_vars_and_keeps_unknown() {
        std::env::set_var("LANDMARK_CONFIG_TEST_DIR", "/srv/landmarks");
        let substituted = substitute_env_vars(
            "path = \"${LANDMARK_CONFIG_TEST_DIR}/db\"\nother = \"${LANDMARK_CONFIG_TEST_UNSET}\"",
        );
        assert!(substituted.contains("/srv/landmarks/db"));
        assert!(substituted.contains("${LANDMARK_CONFIG_TEST_UNSET}"));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[database]\npath = \"registry.db\"").unwrap();
        let config = CoreConfig::from_file(file.path()).unwrap();
        assert_eq!(config.database.path, PathBuf::from("registry.db"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = CoreConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}

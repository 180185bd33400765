//! Configuration file handling.
//!
//! Settings are read from `rowql/config.toml` under the user's config
//! directory. Every setting is optional and command-line flags win.
//!
//! ```toml
//! warning_flag = "error"
//! default_to = "csv"
//!
//! [input_options]
//! delimiter = ";"
//!
//! [output_options]
//! header = false
//! ```
//!
//! ## Environment Variables
//!
//! - `ROWQL_WARNING_FLAG` - overrides `warning_flag`
//! - `ROWQL_DEFAULT_TO` - overrides `default_to`

use std::path::{Path, PathBuf};

use rowql_core::{WarningPolicy, WRITER_FORMATS};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigError;

pub const CONFIG_DIR_NAME: &str = "rowql";
pub const CONFIG_FILE_NAME: &str = "config.toml";

pub const ENV_WARNING_FLAG: &str = "ROWQL_WARNING_FLAG";
pub const ENV_DEFAULT_TO: &str = "ROWQL_DEFAULT_TO";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// `default` or `error`
    #[serde(default)]
    pub warning_flag: Option<String>,
    /// Writer used when the query has no TO clause
    #[serde(default)]
    pub default_to: Option<String>,
    #[serde(default)]
    pub input_options: Map<String, Value>,
    #[serde(default)]
    pub output_options: Map<String, Value>,
}

impl Config {
    /// `<config dir>/rowql/config.toml`, when the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    pub fn from_toml(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Load an explicit config file. A missing file is an error here.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml(&text, path)?;
        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    /// Load `path` if given, else the default file if it exists, then apply
    /// environment overrides.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load(&path)?,
                _ => Self::default(),
            },
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(flag) = var(ENV_WARNING_FLAG) {
            self.warning_flag = Some(flag);
        }
        if let Some(to) = var(ENV_DEFAULT_TO) {
            self.default_to = Some(to);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.warning_policy()?;
        if let Some(to) = &self.default_to {
            let known = WRITER_FORMATS.iter().any(|f| f.eq_ignore_ascii_case(to));
            if !known {
                return Err(ConfigError::InvalidValue(format!(
                    "default_to '{}' is not one of {}",
                    to,
                    WRITER_FORMATS.join(", ").to_lowercase()
                )));
            }
        }
        Ok(())
    }

    pub fn warning_policy(&self) -> Result<Option<WarningPolicy>, ConfigError> {
        match &self.warning_flag {
            None => Ok(None),
            Some(flag) => WarningPolicy::from_flag(flag).map(Some).ok_or_else(|| {
                ConfigError::InvalidValue(format!(
                    "warning_flag must be 'default' or 'error', got '{}'",
                    flag
                ))
            }),
        }
    }
}

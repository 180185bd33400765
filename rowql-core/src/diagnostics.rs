//! User-facing warnings.
//!
//! Warnings are logged through `tracing` unless the run treats them as
//! errors, in which case the first warning aborts the query.

use serde::{Deserialize, Serialize};

use crate::error::{RowqlError, RowqlResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningPolicy {
    #[default]
    Default,
    Error,
}

impl WarningPolicy {
    pub fn from_flag(flag: &str) -> Option<Self> {
        match flag.to_lowercase().as_str() {
            "default" => Some(WarningPolicy::Default),
            "error" => Some(WarningPolicy::Error),
            _ => None,
        }
    }

    /// Report a warning, or fail when warnings are errors.
    pub fn warn(self, message: &str) -> RowqlResult<()> {
        match self {
            WarningPolicy::Default => {
                tracing::warn!("{}", message);
                Ok(())
            }
            WarningPolicy::Error => Err(RowqlError::WarningAsError(message.to_string())),
        }
    }

    /// Warning for a failed value conversion (`int('abc')`), which yields NULL.
    pub fn conversion_warning(self, target: &str, value: &serde_json::Value) -> RowqlResult<()> {
        self.warn(&format!(
            "could not convert {} to {}, returning NULL",
            value, target
        ))
    }
}

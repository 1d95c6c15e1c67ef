//! Compiler configuration
//!
//! Controls the filter-key syntax and the defaults applied when a caller
//! leaves something unsaid. Every field has a default, so an empty JSON
//! object is a valid configuration.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::planner::{JoinKind, LoadStrategy};

/// Default separator between field name and operator
pub const DEFAULT_DELIMITER: &str = "__";

/// Default OR-group marker key
pub const DEFAULT_OR_GROUP_MARKER: &str = "__or__";

/// Default logical deletion flag column
pub const DEFAULT_LOGICAL_DELETE_COLUMN: &str = "del_flag";

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Config is not valid JSON for this schema
    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    /// Config parsed but a value is unusable
    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Configuration shared by every compiler component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerConfig {
    /// Separator between field name and operator, e.g. `age__gt`
    pub delimiter: String,
    /// Whole-key marker introducing an OR-group
    pub or_group_marker: String,
    /// Strategy applied to relationships listed without one
    pub default_load_strategy: LoadStrategy,
    /// Join kind applied to relationships joined by bare name
    pub default_join_kind: JoinKind,
    /// Flag column set by logical deletion
    pub logical_delete_column: String,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER.to_string(),
            or_group_marker: DEFAULT_OR_GROUP_MARKER.to_string(),
            default_load_strategy: LoadStrategy::SelectInLoad,
            default_join_kind: JoinKind::Left,
            logical_delete_column: DEFAULT_LOGICAL_DELETE_COLUMN.to_string(),
        }
    }
}

impl CompilerConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: CompilerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    /// Check values serde cannot check
    pub fn validate(&self) -> ConfigResult<()> {
        if self.delimiter.is_empty() {
            return Err(ConfigError::Invalid {
                field: "delimiter",
                reason: "must not be empty".into(),
            });
        }
        if self.or_group_marker.is_empty() {
            return Err(ConfigError::Invalid {
                field: "or_group_marker",
                reason: "must not be empty".into(),
            });
        }
        if self.logical_delete_column.is_empty() {
            return Err(ConfigError::Invalid {
                field: "logical_delete_column",
                reason: "must not be empty".into(),
            });
        }
        Ok(())
    }
}

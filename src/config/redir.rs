// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `redir_file` configuration block.
//!
//! ```toml
//! [redir_file]
//! path = "/var/www/redirects.csv"
//! type = "csv"
//! csv_separator = ";"
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Config, ConfigError};
use crate::table::{DEFAULT_SEPARATOR, separator_byte};

/// Configuration key of the block.
pub const REDIR_FILE_SECTION: &str = "redir_file";

const OPTIONS: [&str; 3] = ["path", "type", "csv_separator"];

fn default_csv_separator() -> char {
    DEFAULT_SEPARATOR
}

/// Options of a redirect handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RedirFileConfig {
    /// Path of the file holding the redirects
    pub path: String,

    /// Source format; only `"csv"` is understood
    #[serde(rename = "type")]
    pub format: String,

    /// Field delimiter for CSV sources
    #[serde(default = "default_csv_separator")]
    pub csv_separator: char,
}

impl RedirFileConfig {
    /// Options for a CSV file using the default separator.
    pub fn csv<P: Into<String>>(path: P) -> Self {
        Self {
            path: path.into(),
            format: "csv".to_string(),
            csv_separator: DEFAULT_SEPARATOR,
        }
    }

    /// Read the block from `config`.
    ///
    /// The `redir_file` object of the highest-priority provider that has one
    /// is taken first; individual `redir_file.<option>` keys then overlay it,
    /// so an environment variable can replace a single option of a file.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let mut block = match config.get_raw(REDIR_FILE_SECTION)? {
            Some(Value::Object(map)) => map,
            Some(other) => {
                return Err(ConfigError::invalid_value(
                    REDIR_FILE_SECTION,
                    format!("expected a block of options, found {other}"),
                ));
            }
            None => Map::new(),
        };

        for option in OPTIONS {
            let key = format!("{REDIR_FILE_SECTION}.{option}");
            if let Some(value) = config.get_raw(&key)? {
                block.insert(option.to_string(), value);
            }
        }

        if block.is_empty() {
            return Err(ConfigError::Missing(REDIR_FILE_SECTION.to_string()));
        }

        Self::from_value(Value::Object(block))
    }

    /// Deserialize and validate a block.
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_value(value).map_err(|e| {
            ConfigError::ParseError(format!("invalid '{REDIR_FILE_SECTION}' block: {e}"))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check the options that deserialization alone cannot.
    ///
    /// The format tag is left to provisioning, which reports unknown formats
    /// as [`RedirError::UnsupportedFormat`](crate::RedirError::UnsupportedFormat).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.path.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                format!("{REDIR_FILE_SECTION}.path"),
                "must not be empty",
            ));
        }

        separator_byte(self.csv_separator).map_err(|e| {
            ConfigError::invalid_value(format!("{REDIR_FILE_SECTION}.csv_separator"), e)
        })?;

        Ok(())
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Configuration for logging (the `logging` section).

use crate::logging::structured::{LogFormat, LoggerConfig, slog_level};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Whether to use structured logging
    #[serde(default = "default_false")]
    pub structured: bool,

    /// Log format (terminal or json)
    #[serde(default = "default_format")]
    pub format: String,

    /// Log level
    #[serde(default = "default_level")]
    pub level: String,

    /// Include source code location
    #[serde(default = "default_true")]
    pub include_location: bool,

    /// Include thread ID
    #[serde(default = "default_true")]
    pub include_thread_id: bool,

    /// Static fields to include in all logs
    #[serde(default)]
    pub static_fields: HashMap<String, String>,
}

fn default_false() -> bool {
    false
}

fn default_true() -> bool {
    true
}

fn default_format() -> String {
    "terminal".to_string()
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            structured: false,
            format: default_format(),
            level: default_level(),
            include_location: true,
            include_thread_id: true,
            static_fields: HashMap::new(),
        }
    }
}

impl LoggingConfig {
    /// The configured level; unknown names fall back to `info`.
    pub fn level_filter(&self) -> LevelFilter {
        match self.level.to_lowercase().as_str() {
            "trace" => LevelFilter::Trace,
            "debug" => LevelFilter::Debug,
            "info" => LevelFilter::Info,
            "warn" => LevelFilter::Warn,
            "error" | "critical" => LevelFilter::Error,
            "off" => LevelFilter::Off,
            _ => LevelFilter::Info,
        }
    }

    /// Convert to logger config
    pub fn to_logger_config(&self) -> LoggerConfig {
        let mut static_fields: Vec<(String, String)> = self
            .static_fields
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        static_fields.sort();

        LoggerConfig {
            format: match self.format.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                _ => LogFormat::Terminal,
            },
            level: slog_level(self.level_filter()),
            include_location: self.include_location,
            include_thread_id: self.include_thread_id,
            static_fields,
        }
    }
}

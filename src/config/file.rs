// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! File-based configuration provider implementation.

use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

use super::ConfigError;
use super::ConfigProvider;

/// Supported file formats for configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// JSON format (.json)
    Json,
    /// TOML format (.toml)
    Toml,
    /// YAML format (.yaml, .yml)
    Yaml,
}

impl FileFormat {
    /// Detect the file format from the file extension.
    pub fn from_extension(path: &Path) -> Option<Self> {
        path.extension().and_then(|ext| {
            match ext.to_string_lossy().to_lowercase().as_str() {
                "json" => Some(FileFormat::Json),
                "toml" => Some(FileFormat::Toml),
                "yaml" | "yml" => Some(FileFormat::Yaml),
                _ => None,
            }
        })
    }
}

/// File-based configuration provider.
#[derive(Debug)]
pub struct FileConfigProvider {
    path: PathBuf,
    format: FileFormat,
    data: Map<String, Value>,
}

impl FileConfigProvider {
    /// Read and parse the configuration file at `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();
        let format = FileFormat::from_extension(&path)
            .ok_or_else(|| ConfigError::provider_error("file", "unsupported file format"))?;

        let content = fs::read_to_string(&path).map_err(|e| {
            ConfigError::provider_error("file", format!("failed to read {}: {e}", path.display()))
        })?;

        Self::parse(&content, format, path)
    }

    /// Parse configuration already held in memory; `path` is only kept for
    /// diagnostics.
    pub fn parse<P: Into<PathBuf>>(
        content: &str,
        format: FileFormat,
        path: P,
    ) -> Result<Self, ConfigError> {
        let root: Value = match format {
            FileFormat::Json => serde_json::from_str(content)
                .map_err(|e| ConfigError::provider_error("file", format!("invalid JSON: {e}")))?,
            FileFormat::Toml => {
                let toml_value: toml::Value = toml::from_str(content).map_err(|e| {
                    ConfigError::provider_error("file", format!("invalid TOML: {e}"))
                })?;
                serde_json::to_value(toml_value).map_err(|e| {
                    ConfigError::provider_error("file", format!("failed to convert TOML: {e}"))
                })?
            }
            FileFormat::Yaml => {
                let yaml_value: serde_yaml::Value = serde_yaml::from_str(content).map_err(|e| {
                    ConfigError::provider_error("file", format!("invalid YAML: {e}"))
                })?;
                serde_json::to_value(yaml_value).map_err(|e| {
                    ConfigError::provider_error("file", format!("failed to convert YAML: {e}"))
                })?
            }
        };

        match root {
            Value::Object(data) => Ok(Self {
                path: path.into(),
                format,
                data,
            }),
            _ => Err(ConfigError::provider_error(
                "file",
                "root configuration must be an object",
            )),
        }
    }

    /// The file this provider was read from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    /// Get a nested value from the configuration by a dot-separated key path.
    fn get_nested_value(&self, key_path: &str) -> Option<&Value> {
        let mut parts = key_path.split('.');
        let mut current = self.data.get(parts.next()?)?;

        for part in parts {
            current = current.get(part)?;
        }

        Some(current)
    }
}

impl ConfigProvider for FileConfigProvider {
    fn has(&self, key: &str) -> bool {
        self.get_nested_value(key).is_some()
    }

    fn provider_name(&self) -> &str {
        "file"
    }

    fn get_raw(&self, key: &str) -> Result<Option<Value>, ConfigError> {
        Ok(self.get_nested_value(key).cloned())
    }
}

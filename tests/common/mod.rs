// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Common test utilities and helpers for redir-file integration tests.

use redir_file::config::{ConfigError, ConfigProvider};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Test configuration provider for consistent test setups
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct TestConfigProvider {
    values: HashMap<String, Value>,
    name: String,
}

#[allow(dead_code)]
impl TestConfigProvider {
    /// Create a provider holding a `redir_file` block for a CSV file at `path`
    pub fn new(name: &str, path: &str) -> Self {
        Self::from_json(json!({
            "redir_file": { "path": path, "type": "csv" }
        }))
        .named(name)
    }

    /// Create a new test config provider from a JSON configuration
    pub fn from_json(config: Value) -> Self {
        let mut values = HashMap::new();

        // Flatten the JSON config into dot-notation keys
        Self::flatten_json(&config, "", &mut values);

        Self {
            values,
            name: "json-config".to_string(),
        }
    }

    fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Helper function to flatten JSON into dot-notation keys
    fn flatten_json(value: &Value, prefix: &str, values: &mut HashMap<String, Value>) {
        match value {
            Value::Object(obj) => {
                for (key, val) in obj {
                    let new_key = if prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{prefix}.{key}")
                    };

                    match val {
                        Value::Object(_) => {
                            Self::flatten_json(val, &new_key, values);
                        }
                        _ => {
                            values.insert(new_key, val.clone());
                        }
                    }
                }
            }
            _ => {
                values.insert(prefix.to_string(), value.clone());
            }
        }
    }

    /// Add a configuration value
    pub fn with_value<T: Into<Value>>(mut self, key: &str, value: T) -> Self {
        self.values.insert(key.to_string(), value.into());
        self
    }

    /// Get a nested value from the configuration by a dot-separated key path.
    fn get_nested_value(&self, key_path: &str) -> Option<Value> {
        // First check if we have the exact key
        if let Some(value) = self.values.get(key_path) {
            return Some(value.clone());
        }

        // Try to build nested object from individual keys
        let prefix = format!("{key_path}.");
        let mut nested_obj = serde_json::Map::new();

        for (key, value) in &self.values {
            if let Some(suffix) = key.strip_prefix(&prefix) {
                if !suffix.contains('.') {
                    // This is a direct child
                    nested_obj.insert(suffix.to_string(), value.clone());
                }
            }
        }

        if !nested_obj.is_empty() {
            Some(Value::Object(nested_obj))
        } else {
            None
        }
    }
}

impl ConfigProvider for TestConfigProvider {
    fn has(&self, key: &str) -> bool {
        self.get_nested_value(key).is_some()
    }

    fn provider_name(&self) -> &str {
        &self.name
    }

    fn get_raw(&self, key: &str) -> Result<Option<Value>, ConfigError> {
        Ok(self.get_nested_value(key))
    }
}

/// A redirect source written to a temporary directory.
///
/// The directory is removed when the value is dropped.
#[allow(dead_code)]
pub struct CsvSource {
    _dir: TempDir,
    path: PathBuf,
}

#[allow(dead_code)]
impl CsvSource {
    /// Write `content` verbatim to `redirects.csv`
    pub fn new(content: &str) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("redirects.csv");
        fs::write(&path, content).expect("Failed to write CSV source");
        Self { _dir: dir, path }
    }

    /// Write a header row followed by one row per pair, joined by `separator`
    pub fn from_pairs(separator: char, pairs: &[(&str, &str)]) -> Self {
        let mut content = format!("from{separator}to\n");
        for (from, to) in pairs {
            content.push_str(&format!("{from}{separator}{to}\n"));
        }
        Self::new(&content)
    }

    pub fn path(&self) -> String {
        self.path.display().to_string()
    }
}

/// Logger dropping every record, for handlers built in tests.
#[allow(dead_code)]
pub fn discard_logger() -> slog::Logger {
    slog::Logger::root(slog::Discard, slog::o!())
}

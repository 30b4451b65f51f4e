// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Environment variable-based configuration provider implementation.
//!
//! `PREFIX` is stripped, the rest is lower-cased and every `__` becomes a
//! `.`, so single underscores survive inside option names:
//!
//! ```text
//! REDIR_REDIR_FILE__CSV_SEPARATOR=";"   ->   redir_file.csv_separator
//! ```

use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::env;

use super::ConfigError;
use super::ConfigProvider;

/// Separator between nesting levels in variable names.
const NESTING: &str = "__";

/// Configuration provider that retrieves values from environment variables.
#[derive(Debug)]
pub struct EnvConfigProvider {
    /// Prefix for environment variables (e.g., "REDIR_").
    prefix: String,
    /// Cache of environment variables that match the prefix, by config key.
    cache: HashMap<String, String>,
}

impl EnvConfigProvider {
    /// Create a new environment variable configuration provider with the specified prefix.
    pub fn new(prefix: &str) -> Self {
        let mut provider = Self {
            prefix: prefix.to_string(),
            cache: HashMap::new(),
        };

        provider.refresh_cache();

        provider
    }

    /// Build a provider from explicit `(variable, value)` pairs instead of
    /// the process environment.
    pub fn from_vars<I, K, V>(prefix: &str, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut provider = Self {
            prefix: prefix.to_string(),
            cache: HashMap::new(),
        };
        provider.load(vars);
        provider
    }

    /// Refresh the cache of environment variables.
    pub fn refresh_cache(&mut self) {
        self.cache.clear();
        self.load(env::vars());
    }

    fn load<I, K, V>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (name, value) in vars {
            if let Some(key) = self.config_key(name.as_ref()) {
                self.cache.insert(key, value.into());
            }
        }
    }

    /// Map a variable name onto a dotted configuration key.
    fn config_key(&self, name: &str) -> Option<String> {
        let rest = name.strip_prefix(&self.prefix)?;
        if rest.is_empty() {
            return None;
        }
        Some(rest.to_lowercase().replace(NESTING, "."))
    }

    /// Parse a string value into a JSON Value.
    fn parse_value_to_json(value: &str) -> Value {
        if let Ok(json_value) = serde_json::from_str(value) {
            return json_value;
        }

        if value.eq_ignore_ascii_case("true") {
            return json!(true);
        } else if value.eq_ignore_ascii_case("false") {
            return json!(false);
        }

        if let Ok(int_val) = value.parse::<i64>() {
            return json!(int_val);
        }

        if let Ok(float_val) = value.parse::<f64>() {
            return json!(float_val);
        }

        json!(value)
    }

    /// Assemble an object out of every cached key nested below `key`.
    fn section(&self, key: &str) -> Option<Value> {
        let prefix = format!("{key}.");
        let mut root = Map::new();

        for (cached, value) in &self.cache {
            let Some(suffix) = cached.strip_prefix(&prefix) else {
                continue;
            };

            let parts: Vec<&str> = suffix.split('.').collect();
            insert_path(&mut root, &parts, Self::parse_value_to_json(value));
        }

        if root.is_empty() {
            None
        } else {
            Some(Value::Object(root))
        }
    }
}

fn insert_path(map: &mut Map<String, Value>, parts: &[&str], value: Value) {
    match parts {
        [] => {}
        [leaf] => {
            map.insert(leaf.to_string(), value);
        }
        [head, rest @ ..] => {
            let entry = map
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(child) = entry {
                insert_path(child, rest, value);
            }
        }
    }
}

impl Default for EnvConfigProvider {
    fn default() -> Self {
        Self::new("REDIR_")
    }
}

impl ConfigProvider for EnvConfigProvider {
    fn get_raw(&self, key: &str) -> Result<Option<Value>, ConfigError> {
        match self.cache.get(key) {
            Some(value) => Ok(Some(Self::parse_value_to_json(value))),
            None => Ok(self.section(key)),
        }
    }

    fn has(&self, key: &str) -> bool {
        if self.cache.contains_key(key) {
            return true;
        }
        let prefix = format!("{key}.");
        self.cache.keys().any(|k| k.starts_with(&prefix))
    }

    fn provider_name(&self) -> &str {
        "env"
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Configuration subsystem
//!
//! A [`Config`] is created from an ordered list of [`ConfigProvider`]s; later
//! providers override earlier ones.  The loader stacks them like this:
//!
//! 1. `FileConfigProvider` – `redirects.{toml,json,yaml}`
//! 2. `EnvConfigProvider`  – `REDIR_REDIR_FILE__CSV_SEPARATOR=";"`
//! 3. *your* provider implementing [`ConfigProvider`]
//!
//! Recognised keys:
//!
//! | key | type | default | description |
//! |-----|------|---------|-------------|
//! | `redir_file.path`          | text   | – | Redirect source file             |
//! | `redir_file.type`          | text   | – | Source format, only `"csv"`      |
//! | `redir_file.csv_separator` | char   | `,` | Field delimiter                |
//! | `logging`                  | object | – | See [`LoggingConfig`](crate::logging::config::LoggingConfig) |

mod env;
pub mod error;
mod file;
mod redir;


pub use env::EnvConfigProvider;
pub use error::ConfigError;
pub use file::{FileConfigProvider, FileFormat};
pub use redir::{REDIR_FILE_SECTION, RedirFileConfig};

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt::Debug;
use std::sync::Arc;

/// Core configuration provider trait that all configuration sources must implement.
/// This trait is object-safe since it doesn't contain generic methods.
pub trait ConfigProvider: Debug + Send + Sync {
    /// Check if the configuration provider has a value for the given key.
    fn has(&self, key: &str) -> bool;

    /// Get the name of the configuration provider for debugging purposes.
    fn provider_name(&self) -> &str;

    /// Get a raw configuration value by key.
    /// Returns a JSON Value that can be later deserialized into specific types.
    fn get_raw(&self, key: &str) -> Result<Option<Value>, ConfigError>;
}

/// Extension trait for ConfigProvider that provides methods for typed access.
/// This trait is not object-safe because it has generic methods.
pub trait ConfigProviderExt: ConfigProvider {
    /// Get a configuration value by key and deserialize it to the specified type.
    fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        match self.get_raw(key)? {
            Some(value) => serde_json::from_value(value).map(Some).map_err(|e| {
                ConfigError::ParseError(format!("failed to deserialize '{key}': {e}"))
            }),
            None => Ok(None),
        }
    }
}

impl<T: ConfigProvider> ConfigProviderExt for T {}

/// Builder for the configuration system.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    providers: Vec<Arc<dyn ConfigProvider>>,
}

impl ConfigBuilder {
    /// Create a new configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a configuration provider.
    pub fn with_provider<P: ConfigProvider + 'static>(mut self, provider: P) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    /// Add an already shared configuration provider.
    pub fn with_shared_provider(mut self, provider: Arc<dyn ConfigProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> Config {
        Config {
            providers: self.providers,
        }
    }
}

/// Holds all providers and resolves values across them.
#[derive(Debug, Clone)]
pub struct Config {
    providers: Vec<Arc<dyn ConfigProvider>>,
}

impl Config {
    /// Create a new configuration builder.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// The providers in priority order, lowest first.
    pub fn providers(&self) -> &[Arc<dyn ConfigProvider>] {
        &self.providers
    }

    /// Get a raw configuration value.
    pub fn get_raw(&self, key: &str) -> Result<Option<Value>, ConfigError> {
        // Later providers override earlier ones
        for provider in self.providers.iter().rev() {
            if provider.has(key) {
                return provider.get_raw(key);
            }
        }
        Ok(None)
    }

    /// Get a configuration value by key from the highest-priority provider
    /// that has it.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        match self.get_raw(key)? {
            Some(value) => serde_json::from_value(value).map(Some).map_err(|e| {
                ConfigError::ParseError(format!("failed to deserialize '{key}': {e}"))
            }),
            None => Ok(None),
        }
    }

    /// Get a configuration value by key with a default fallback value.
    pub fn get_or_default<T: DeserializeOwned>(
        &self,
        key: &str,
        default: T,
    ) -> Result<T, ConfigError> {
        match self.get(key)? {
            Some(value) => Ok(value),
            None => Ok(default),
        }
    }

    /// Create a configuration backed by a single file.
    pub fn default_file(file_path: &str) -> Result<Self, ConfigError> {
        let provider = FileConfigProvider::new(file_path)?;
        Ok(Self::builder().with_provider(provider).build())
    }
}

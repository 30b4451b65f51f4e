// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the configuration module.

use std::fmt;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required key is absent from every provider.
    #[error("missing configuration key '{0}'")]
    Missing(String),

    /// An error occurred while parsing or deserializing a configuration value.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// A value was read but is not acceptable.
    #[error("invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// An error related to a specific configuration provider.
    #[error("provider error: {provider}: {message}")]
    ProviderError { provider: String, message: String },
}

impl ConfigError {
    /// Create a new provider error.
    pub fn provider_error<P: fmt::Display, M: fmt::Display>(provider: P, message: M) -> Self {
        Self::ProviderError {
            provider: provider.to_string(),
            message: message.to_string(),
        }
    }

    /// Create a new invalid value error.
    pub fn invalid_value<K: fmt::Display, M: fmt::Display>(key: K, message: M) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            message: message.to_string(),
        }
    }
}

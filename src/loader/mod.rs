// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! High-level entry-point – "configure, provision, mount".
//!
//! The [`RedirFileLoader`] consumes configuration, initialises logging,
//! provisions the [`RedirectHandler`] and returns a [`RedirFile`] whose
//! [`chain`](RedirFile::chain) can be mounted into a hyper host with
//! [`host::serve`](crate::host::serve).


use std::env;
use std::sync::Arc;

use log::LevelFilter;
use slog::Logger;
use thiserror::Error;

use crate::config::{
    Config, ConfigError, ConfigProvider, EnvConfigProvider, FileConfigProvider, RedirFileConfig,
};
use crate::core::{Handler, HandlerChain, RedirError};
use crate::handler::RedirectHandler;
use crate::logging::config::LoggingConfig;
use crate::{info_fmt, logging, warn_fmt};

/// Errors that can occur while loading a redirect handler.
#[derive(Error, Debug)]
pub enum LoaderError {
    /// A configuration source could not be read
    #[error("configuration error: {0}")]
    ConfigError(#[from] ConfigError),

    /// The handler could not be provisioned
    #[error("provisioning error: {0}")]
    RedirError(#[from] RedirError),
}

/// Builder assembling configuration and provisioning a [`RedirectHandler`].
#[derive(Debug, Default)]
pub struct RedirFileLoader {
    config: Option<Config>,
    config_file_path: Option<String>,
    use_env_vars: bool,
    env_prefix: Option<String>,
    providers: Vec<Arc<dyn ConfigProvider>>,
    logger: Option<Logger>,
}

impl RedirFileLoader {
    /// Create a new loader with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration; every other source is layered
    /// above it.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a configuration file to load.
    pub fn with_config_file(mut self, file_path: &str) -> Self {
        self.config_file_path = Some(file_path.to_string());
        self
    }

    /// Enable environment variable configuration.
    pub fn with_env_vars(mut self) -> Self {
        self.use_env_vars = true;
        self
    }

    /// Set a custom prefix for environment variables (default is "REDIR_").
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_string());
        self.use_env_vars = true;
        self
    }

    /// Add a custom configuration provider, above file and environment.
    pub fn with_provider<P: ConfigProvider + 'static>(mut self, provider: P) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    /// Use `logger` as the handler's logging sink instead of
    /// [`logging::sink`].
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    fn build_config(&mut self) -> Result<Config, LoaderError> {
        let mut builder = Config::builder();

        if let Some(config) = self.config.take() {
            for provider in config.providers() {
                builder = builder.with_shared_provider(provider.clone());
            }
        }

        if let Some(file_path) = self.config_file_path.take() {
            builder = builder.with_provider(FileConfigProvider::new(&file_path)?);
        }

        if self.use_env_vars {
            let env_provider = match self.env_prefix.take() {
                Some(prefix) => EnvConfigProvider::new(&prefix),
                None => EnvConfigProvider::default(),
            };
            builder = builder.with_provider(env_provider);
        }

        for provider in self.providers.drain(..) {
            builder = builder.with_shared_provider(provider);
        }

        Ok(builder.build())
    }

    /// Build the configuration, initialise logging and provision the handler.
    pub fn build(mut self) -> Result<RedirFile, LoaderError> {
        let config = Arc::new(self.build_config()?);

        let log_level = match env::var("RUST_LOG_LEVEL").ok().as_deref() {
            Some("trace") => Some(LevelFilter::Trace),
            Some("debug") => Some(LevelFilter::Debug),
            Some("info") => Some(LevelFilter::Info),
            Some("warn") => Some(LevelFilter::Warn),
            Some("error") => Some(LevelFilter::Error),
            _ => None,
        };

        match config.get::<LoggingConfig>("logging") {
            Ok(Some(logging_config)) => {
                logging::init_with_config(log_level, &logging_config);
            }
            Ok(None) => {
                logging::init(log_level);
            }
            Err(e) => {
                logging::init(log_level);
                warn_fmt!("Startup", "Ignoring invalid logging configuration: {}", e);
            }
        }

        let redir_config = RedirFileConfig::from_config(&config)
            .map_err(|e| LoaderError::RedirError(logging::log_error("Startup", RedirError::from(e))))?;

        info_fmt!("Startup", "Provisioning redir_file from {} ({})",
            redir_config.path, redir_config.format);

        let logger = self.logger.take().unwrap_or_else(logging::sink);
        let handler = RedirectHandler::provision(&redir_config, logger)
            .map_err(|e| logging::log_error("Startup", e))?;

        Ok(RedirFile {
            config,
            redir_config,
            handler: Arc::new(handler),
        })
    }
}

/// A provisioned redirect handler together with the configuration it was
/// built from.
#[derive(Debug, Clone)]
pub struct RedirFile {
    config: Arc<Config>,
    redir_config: RedirFileConfig,
    handler: Arc<RedirectHandler>,
}

impl RedirFile {
    /// Create a new loader.
    pub fn loader() -> RedirFileLoader {
        RedirFileLoader::new()
    }

    /// Get the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The validated `redir_file` block.
    pub fn redir_config(&self) -> &RedirFileConfig {
        &self.redir_config
    }

    pub fn handler(&self) -> Arc<RedirectHandler> {
        self.handler.clone()
    }

    /// Put the redirect handler in front of `terminal`.
    pub fn chain(&self, terminal: Arc<dyn Handler>) -> HandlerChain {
        HandlerChain::new(terminal).with_middleware(self.handler.clone())
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Logging utilities.
//!
//! Two backends are supported:
//!
//! * `env_logger` behind the `log` facade (the default);
//! * structured `slog` output (terminal or JSON), installed as the global
//!   `slog_scope` logger with `log` records bridged into it.
//!
//! Redirect handlers receive their logging sink from [`sink`], which always
//! writes to whichever backend is active.

pub mod config;
pub mod structured;
pub mod wrapper;

#[cfg(test)]
pub mod test_logger;

use log::{LevelFilter, error, info};
use slog::Drain;
use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::logging::config::LoggingConfig;

static INIT: Once = Once::new();
static USING_STRUCTURED: AtomicBool = AtomicBool::new(false);

fn level_name(level: LevelFilter) -> &'static str {
    match level {
        LevelFilter::Trace => "trace",
        LevelFilter::Debug => "debug",
        LevelFilter::Info => "info",
        LevelFilter::Warn => "warn",
        LevelFilter::Error => "error",
        LevelFilter::Off => "off",
    }
}

fn init_env_logger(level: LevelFilter) {
    let env = env_logger::Env::default().filter_or("RUST_LOG", level_name(level));

    let result = env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .format_target(true)
        .try_init();

    if result.is_ok() {
        info!("Logging initialized at level: {}", log::max_level());
    }
}

/// Initialize `env_logger` with the specified level.
///
/// This function ensures logging is only initialized once.
pub fn init(level: Option<LevelFilter>) {
    INIT.call_once(|| init_env_logger(level.unwrap_or(LevelFilter::Info)));
}

/// Initialize logging from a [`LoggingConfig`].
///
/// `level` overrides the level named in the configuration.  Only the first
/// call in a process has any effect.
pub fn init_with_config(level: Option<LevelFilter>, config: &LoggingConfig) {
    INIT.call_once(|| {
        let level = level.unwrap_or_else(|| config.level_filter());

        if !config.structured {
            init_env_logger(level);
            return;
        }

        let mut logger_config = config.to_logger_config();
        logger_config.level = structured::slog_level(level);
        structured::install_global_logger(&logger_config);
        USING_STRUCTURED.store(true, Ordering::SeqCst);

        match slog_stdlog::init_with_level(level.to_level().unwrap_or(log::Level::Error)) {
            Ok(()) => info!("Structured logging initialized at level: {}", level),
            Err(e) => slog::warn!(slog_scope::logger(), "log records will not be bridged: {}", e),
        }
    });
}

/// Whether structured logging is the active backend.
pub fn is_structured() -> bool {
    USING_STRUCTURED.load(Ordering::SeqCst)
}

/// The logging sink handed to redirect handlers.
///
/// Drain failures are swallowed, so writing to the sink can never fail the
/// caller.
pub fn sink() -> slog::Logger {
    if is_structured() {
        slog_scope::logger()
    } else {
        slog::Logger::root(slog_stdlog::StdLog.ignore_res(), slog::o!())
    }
}

/// Log an error with context and return the error.
///
/// This is useful for logging errors in a chain of Results.
pub fn log_error<E: std::fmt::Display>(context: &str, err: E) -> E {
    error!("{}: {}", context, err);
    err
}

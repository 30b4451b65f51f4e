// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Structured logging implementation.
//!
//! This module provides structured logging capabilities using slog,
//! with support for JSON output and contextual information.

use log::LevelFilter;
use slog::{Drain, FnValue, Logger, Record, o};
use slog_async::Async;
use slog_json::Json;
use slog_term::{FullFormat, TermDecorator};
use std::io;

/// Structured logging format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable terminal output
    Terminal,
    /// JSON formatted output
    Json,
}

/// Structured logger configuration
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Output format (Terminal or JSON)
    pub format: LogFormat,
    /// Log level
    pub level: slog::Level,
    /// Whether to include source code location
    pub include_location: bool,
    /// Whether to include thread ID
    pub include_thread_id: bool,
    /// Additional static key-value pairs to include in all logs
    pub static_fields: Vec<(String, String)>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Terminal,
            level: slog::Level::Info,
            include_location: true,
            include_thread_id: true,
            static_fields: Vec::new(),
        }
    }
}

/// Map a `log` level filter onto the closest `slog` level.
pub fn slog_level(level: LevelFilter) -> slog::Level {
    match level {
        LevelFilter::Trace => slog::Level::Trace,
        LevelFilter::Debug => slog::Level::Debug,
        LevelFilter::Info => slog::Level::Info,
        LevelFilter::Warn => slog::Level::Warning,
        LevelFilter::Error => slog::Level::Error,
        LevelFilter::Off => slog::Level::Critical,
    }
}

/// Create a structured logger with the given configuration
pub fn create_logger(config: &LoggerConfig) -> Logger {
    let logger = match config.format {
        LogFormat::Terminal => create_terminal_logger(config),
        LogFormat::Json => create_json_logger(config),
    };

    with_context_fields(logger, config)
}

/// Create a terminal-formatted logger
fn create_terminal_logger(config: &LoggerConfig) -> Logger {
    let decorator = TermDecorator::new().build();
    let drain = FullFormat::new(decorator).build().fuse();

    let drain = drain.filter_level(config.level).fuse();
    let drain = Async::new(drain).build().fuse();

    Logger::root(drain, o!())
}

/// Create a JSON-formatted logger
fn create_json_logger(config: &LoggerConfig) -> Logger {
    let drain = Json::new(io::stdout())
        .add_default_keys()
        .build()
        .fuse();

    let drain = drain.filter_level(config.level).fuse();
    let drain = Async::new(drain).build().fuse();

    Logger::root(drain, o!())
}

fn with_context_fields(mut logger: Logger, config: &LoggerConfig) -> Logger {
    if config.include_location {
        logger = logger.new(o!(
            "location" => FnValue(|record: &Record| format!("{}:{}", record.file(), record.line()))
        ));
    }

    if config.include_thread_id {
        logger = logger.new(o!(
            "thread" => FnValue(|_: &Record| format!("{:?}", std::thread::current().id()))
        ));
    }

    for (key, value) in &config.static_fields {
        // slog keys must be 'static
        let key_str: &'static str = Box::leak(key.clone().into_boxed_str());
        logger = logger.new(o!(key_str => value.clone()));
    }

    logger
}

/// Install a logger built from `config` as the process-wide `slog_scope`
/// logger for the rest of the program.
pub fn install_global_logger(config: &LoggerConfig) {
    let guard = slog_scope::set_global_logger(create_logger(config));
    guard.cancel_reset();
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use once_cell::sync::OnceCell;
use slog::{Discard, Logger, o};
use slog_scope::GlobalLoggerGuard;

/// Initialise a global slog logger for the whole test binary.
/// Safe to call from every test – the logger is installed exactly once.
pub fn init_test_logger() {
    static GUARD: OnceCell<GlobalLoggerGuard> = OnceCell::new();

    GUARD.get_or_init(|| {
        let logger = Logger::root(Discard, o!());
        slog_scope::set_global_logger(logger)
    });
}

/// A logger that drops every record, for handlers built in tests.
pub fn discard_logger() -> Logger {
    Logger::root(Discard, o!())
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! redir-file - CSV-driven permanent redirects for hyper hosts
//!
//! A [`RedirectHandler`] is loaded once from a file mapping request paths to
//! destinations and then sits in front of the rest of a host's pipeline:
//! requests whose path is in the table are answered with
//! `301 Moved Permanently`, everything else is passed on untouched.
//!
//! ```text
//! from,to
//! /old-page,/new-page
//! /blog,https://blog.example.com/
//! ```
//!
//! # Configuration System
//!
//! - **Multiple Configuration Sources**: files (JSON, TOML, YAML) and
//!   environment variables.
//! - **Layered Configuration**: later providers override earlier ones, down
//!   to single options of the `redir_file` block.
//! - **Extensibility**: implement [`ConfigProvider`] for custom sources.
//!
//! # Mounting
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use redir_file::{NotFoundHandler, RedirFile};
//!
//! # fn main() -> Result<(), redir_file::LoaderError> {
//! let redir = RedirFile::loader()
//!     .with_config_file("redirects.toml")
//!     .with_env_vars()
//!     .build()?;
//!
//! // Requests missing the table fall through to the terminal handler.
//! let chain = Arc::new(redir.chain(Arc::new(NotFoundHandler)));
//! // service_fn(move |req| redir_file::host::serve(req, chain.clone()))
//! # let _ = chain;
//! # Ok(())
//! # }
//! ```

// Module declarations
pub mod config;
pub mod core;
pub mod handler;
pub mod host;
pub mod loader;
pub mod logging;
pub mod table;

// Re-export key types at the crate root for convenience
pub use config::{ConfigError, ConfigProvider, ConfigProviderExt, RedirFileConfig};
pub use core::{
    Handler, HandlerChain, HttpRequest, HttpResponse, Middleware, NotFoundHandler, RedirError,
};
pub use handler::RedirectHandler;
pub use loader::{LoaderError, RedirFile, RedirFileLoader};
pub use table::{Redirect, RedirectTable, SourceFormat};

pub use logging::{init as init_logging, log_error};

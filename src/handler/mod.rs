// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `redir_file` middleware.
//!
//! A [`RedirectHandler`] is provisioned once from a [`RedirFileConfig`] and
//! then answers every request whose path appears in its table with a
//! `301 Moved Permanently`.  Everything else is passed to the next handler
//! untouched.
//!
//! ```toml
//! [redir_file]
//! path = "/var/www/redirects.csv"
//! type = "csv"
//! ```


use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use hyper::header::{CONTENT_TYPE, HeaderValue, LOCATION};
use hyper::{Method, StatusCode};
use slog::Logger;

use crate::config::RedirFileConfig;
use crate::core::{Handler, HttpRequest, HttpResponse, Middleware, RedirError};
use crate::table::{Redirect, RedirectTable};

/// Name the middleware registers under.
pub const HANDLER_NAME: &str = "redir_file";

const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Middleware answering table hits with a permanent redirect.
#[derive(Clone)]
pub struct RedirectHandler {
    table: Arc<RedirectTable>,
    logger: Logger,
}

impl fmt::Debug for RedirectHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedirectHandler")
            .field("locator", &self.table.locator())
            .field("redirects", &self.table.len())
            .finish()
    }
}

impl RedirectHandler {
    /// Load the table named by `config` and build a handler around it.
    ///
    /// Nothing is served from a handler whose load failed; the error is
    /// returned as is.
    pub fn provision(config: &RedirFileConfig, logger: Logger) -> Result<Self, RedirError> {
        let table = RedirectTable::load(&config.path, &config.format, config.csv_separator)?;

        slog::info!(logger, "loaded {} redirects from CSV file {}", table.len(), config.path;
            "path" => &config.path,
            "count" => table.len());

        Ok(Self::new(table, logger))
    }

    /// Wrap an already loaded table.
    pub fn new(table: RedirectTable, logger: Logger) -> Self {
        Self {
            table: Arc::new(table),
            logger,
        }
    }

    pub fn table(&self) -> &RedirectTable {
        &self.table
    }

    /// Find the redirect for a request path as received on the wire.
    ///
    /// The percent-decoded path is tried first; the raw path is the fallback
    /// when decoding fails or the decoded form has no entry.
    pub fn lookup(&self, path: &str) -> Option<&Redirect> {
        match urlencoding::decode(path) {
            Ok(decoded) if decoded != path => self
                .table
                .lookup(&decoded)
                .or_else(|| self.table.lookup(path)),
            _ => self.table.lookup(path),
        }
    }

    fn redirect_response(method: &Method, redirect: &Redirect) -> HttpResponse {
        let mut response = HttpResponse::with_status(StatusCode::MOVED_PERMANENTLY);
        response
            .headers
            .insert(LOCATION, redirect.location().clone());

        if *method == Method::GET || *method == Method::HEAD {
            response
                .headers
                .insert(CONTENT_TYPE, HeaderValue::from_static(HTML_CONTENT_TYPE));
        }

        if *method == Method::GET {
            let href = String::from_utf8_lossy(redirect.location().as_bytes());
            response.body = reqwest::Body::from(format!(
                "<a href=\"{}\">Moved Permanently</a>.\n\n",
                html_escape(&href)
            ));
        }

        response
    }
}

#[async_trait]
impl Middleware for RedirectHandler {
    fn name(&self) -> &str {
        HANDLER_NAME
    }

    async fn handle(
        &self,
        request: HttpRequest,
        next: &dyn Handler,
    ) -> Result<HttpResponse, RedirError> {
        match self.lookup(&request.path) {
            Some(redirect) => {
                slog::debug!(self.logger, "redirecting";
                    "method" => %request.method,
                    "from" => &request.path,
                    "to" => redirect.target());
                Ok(Self::redirect_response(&request.method, redirect))
            }
            None => next.handle(request).await,
        }
    }
}

/// Escape the characters that are special inside a double-quoted HTML
/// attribute.
fn html_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&#34;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

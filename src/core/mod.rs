// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Core primitives – requests, responses, handlers & the middleware chain.
//!
//! Everything that moves through a host's request pipeline is defined in this
//! module.  No protocol-level logic lives here; the conversion from and to
//! hyper types sits in `host` and the redirect behaviour in `handler`.


use std::fmt;
use std::io;
use std::sync::Arc;

use hyper::header::HeaderMap;
use hyper::{Method, StatusCode};
use thiserror::Error;

use crate::trace_fmt;

/// Errors raised while provisioning or running the redirect pipeline.
#[derive(Error, Debug)]
pub enum RedirError {
    /// The redirect source could not be opened or read
    #[error("failed reading file {locator}: {source}")]
    ResourceUnavailable {
        locator: String,
        #[source]
        source: io::Error,
    },

    /// The redirect source does not have the expected tabular structure
    #[error("failed reading file {locator} as CSV: {message}")]
    MalformedSource { locator: String, message: String },

    /// The configured source format is not known
    #[error("unsupported file type given {0}")]
    UnsupportedFormat(String),

    /// The configuration block is malformed
    #[error("configuration error: {0}")]
    ConfigurationError(String),

    /// A downstream handler failed
    #[error("handler error: {0}")]
    HandlerError(String),
}

impl RedirError {
    /// Shorthand for a [`RedirError::MalformedSource`].
    pub fn malformed<L: fmt::Display, M: fmt::Display>(locator: L, message: M) -> Self {
        Self::MalformedSource {
            locator: locator.to_string(),
            message: message.to_string(),
        }
    }
}

impl From<crate::config::error::ConfigError> for RedirError {
    fn from(err: crate::config::error::ConfigError) -> Self {
        RedirError::ConfigurationError(err.to_string())
    }
}

/// An inbound HTTP request as seen by the pipeline.
///
/// The body is a streaming [`reqwest::Body`]; nothing in this crate reads it,
/// so a redirect answers without consuming the upload.
#[derive(Debug)]
pub struct HttpRequest {
    pub method: Method,
    /// Path component exactly as received (still percent-encoded)
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: reqwest::Body,
}

impl HttpRequest {
    /// Create a request with no query, no headers and an empty body.
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            query: None,
            headers: HeaderMap::new(),
            body: reqwest::Body::from(""),
        }
    }
}

/// An HTTP response produced by the pipeline.
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: reqwest::Body,
}

impl HttpResponse {
    /// A response with the given status, no headers and an empty body.
    pub fn with_status(status: StatusCode) -> Self {
        Self {
            status: status.as_u16(),
            headers: HeaderMap::new(),
            body: reqwest::Body::from(""),
        }
    }
}

/// Anything that turns a request into a response.
///
/// Terminal handlers of a host, a whole [`HandlerChain`] and the "next
/// handler" passed to a [`Middleware`] all implement this trait.
#[async_trait::async_trait]
pub trait Handler: fmt::Debug + Send + Sync {
    /// Handle the request.
    async fn handle(&self, request: HttpRequest) -> Result<HttpResponse, RedirError>;
}

/// A request-processing unit placed in front of the rest of the pipeline.
#[async_trait::async_trait]
pub trait Middleware: fmt::Debug + Send + Sync {
    /// Get the middleware name.
    fn name(&self) -> &str;

    /// Either answer the request or pass it on to `next`.
    async fn handle(
        &self,
        request: HttpRequest,
        next: &dyn Handler,
    ) -> Result<HttpResponse, RedirError>;
}

/// Terminal handler answering every request with `404 Not Found`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotFoundHandler;

#[async_trait::async_trait]
impl Handler for NotFoundHandler {
    async fn handle(&self, request: HttpRequest) -> Result<HttpResponse, RedirError> {
        trace_fmt!("NotFoundHandler", "No handler answered {} {}", request.method, request.path);
        let mut response = HttpResponse::with_status(StatusCode::NOT_FOUND);
        response.body = reqwest::Body::from("Not Found");
        Ok(response)
    }
}

/// Ordered middlewares in front of a terminal handler.
///
/// The chain is itself a [`Handler`], so hosts can mount it wherever they
/// dispatch requests.
#[derive(Debug, Clone)]
pub struct HandlerChain {
    middlewares: Vec<Arc<dyn Middleware>>,
    terminal: Arc<dyn Handler>,
}

impl HandlerChain {
    /// Create an empty chain ending in `terminal`.
    pub fn new(terminal: Arc<dyn Handler>) -> Self {
        Self {
            middlewares: Vec::new(),
            terminal,
        }
    }

    /// Append a middleware; middlewares run in the order they were added.
    pub fn with_middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middlewares.push(middleware);
        self
    }

    /// Names of the middlewares, in execution order.
    pub fn middleware_names(&self) -> Vec<&str> {
        self.middlewares.iter().map(|m| m.name()).collect()
    }
}

#[async_trait::async_trait]
impl Handler for HandlerChain {
    async fn handle(&self, request: HttpRequest) -> Result<HttpResponse, RedirError> {
        Next {
            middlewares: &self.middlewares,
            terminal: self.terminal.as_ref(),
        }
        .handle(request)
        .await
    }
}

/// The remainder of a chain, handed to each middleware as its `next`.
#[derive(Debug)]
struct Next<'a> {
    middlewares: &'a [Arc<dyn Middleware>],
    terminal: &'a dyn Handler,
}

#[async_trait::async_trait]
impl<'a> Handler for Next<'a> {
    async fn handle(&self, request: HttpRequest) -> Result<HttpResponse, RedirError> {
        match self.middlewares.split_first() {
            Some((first, rest)) => {
                let next = Next {
                    middlewares: rest,
                    terminal: self.terminal,
                };
                first.handle(request, &next).await
            }
            None => self.terminal.handle(request).await,
        }
    }
}

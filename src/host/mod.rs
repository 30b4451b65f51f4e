// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Glue between hyper and the handler pipeline.
//!
//! The crate never owns a listening socket.  A host that already runs hyper
//! mounts a [`Handler`] (usually a [`HandlerChain`](crate::HandlerChain))
//! with [`serve`]:
//!
//! ```rust,ignore
//! let chain = Arc::new(redir.chain(Arc::new(my_app)));
//! let service = service_fn(move |req| host::serve(req, chain.clone()));
//! http1::Builder::new().serve_connection(io, service).await?;
//! ```
//!
//! ## Body streaming
//! Inbound bodies are wrapped, not read: a request that is redirected is
//! answered without ever polling its upload.


use std::convert::Infallible;
use std::error::Error as StdError;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::{Request, Response, StatusCode};
use reqwest::Body;

use crate::core::{Handler, HttpRequest, HttpResponse, RedirError};

/// Convert a hyper request into an [`HttpRequest`].
pub fn into_request<B>(req: Request<B>) -> HttpRequest
where
    B: hyper::body::Body<Data = Bytes> + Send + Unpin + 'static,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let (parts, body) = req.into_parts();
    let path = parts.uri.path().to_owned();
    let query = parts.uri.query().map(|q| q.to_owned());

    log::trace!("Converting request: {} {} with {} headers",
        parts.method, path, parts.headers.len());

    HttpRequest {
        method: parts.method,
        path,
        query,
        headers: parts.headers,
        body: Body::wrap_stream(body.into_data_stream()),
    }
}

/// Convert an [`HttpResponse`] into a hyper response.
pub fn into_response(resp: HttpResponse) -> Result<Response<Body>, RedirError> {
    log::trace!("Converting response with status {} and {} headers",
        resp.status, resp.headers.len());

    let mut builder = Response::builder().status(resp.status);
    let headers = builder.headers_mut().ok_or_else(|| {
        RedirError::HandlerError(format!("invalid response status {}", resp.status))
    })?;
    *headers = resp.headers;

    builder.body(resp.body).map_err(|e| {
        let err = RedirError::HandlerError(e.to_string());
        log::error!("Failed to build response: {}", err);
        err
    })
}

fn internal_error() -> Response<Body> {
    let mut response = Response::new(Body::from("Internal Server Error"));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}

/// Run `req` through `handler`; usable directly inside `service_fn`.
///
/// Pipeline errors never escape: they are logged and answered with a
/// `500 Internal Server Error`.
pub async fn serve<B>(
    req: Request<B>,
    handler: Arc<dyn Handler>,
) -> Result<Response<Body>, Infallible>
where
    B: hyper::body::Body<Data = Bytes> + Send + Unpin + 'static,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let request = into_request(req);
    let method = request.method.clone();
    let path = request.path.clone();

    log::debug!("Received request: {} {}", method, path);

    let response = match handler.handle(request).await {
        Ok(resp) => {
            log::debug!("Processed request {} {} -> {}", method, path, resp.status);
            resp
        }
        Err(e) => {
            log::error!("Internal error processing {} {}: {}", method, path, e);
            return Ok(internal_error());
        }
    };

    match into_response(response) {
        Ok(resp) => Ok(resp),
        Err(e) => {
            log::error!("Failed to convert response for {} {}: {}", method, path, e);
            Ok(internal_error())
        }
    }
}

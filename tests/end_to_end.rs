// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end tests: a redirect chain mounted in a real hyper connection.

use async_trait::async_trait;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, StatusCode};
use hyper_util::rt::TokioIo;
use redir_file::{
    Handler, HttpRequest, HttpResponse, RedirError, RedirFile, RedirFileLoader, host,
};
use reqwest::redirect::Policy;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

mod common;
use common::{CsvSource, TestConfigProvider, discard_logger};

/// Terminal handler standing in for the host application.
#[derive(Debug, Default)]
struct App {
    hits: AtomicUsize,
}

#[async_trait]
impl Handler for App {
    async fn handle(&self, request: HttpRequest) -> Result<HttpResponse, RedirError> {
        self.hits.fetch_add(1, Ordering::SeqCst);
        let mut response = HttpResponse::with_status(hyper::StatusCode::OK);
        response.body = reqwest::Body::from(format!("app: {}", request.path));
        Ok(response)
    }
}

fn load(source: &CsvSource) -> RedirFile {
    RedirFileLoader::new()
        .with_provider(TestConfigProvider::new("e2e", &source.path()))
        .with_logger(discard_logger())
        .build()
        .expect("Failed to provision redirect handler")
}

/// Serve `handler` on an ephemeral port until the returned task is aborted.
async fn start_server(handler: Arc<dyn Handler>) -> (SocketAddr, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let task = tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let handler = handler.clone();
            tokio::spawn(async move {
                let service = service_fn(move |req: Request<Incoming>| {
                    host::serve(req, handler.clone())
                });
                let _ = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await;
            });
        }
    });

    (addr, task)
}

fn no_follow_client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(Policy::none())
        .build()
        .unwrap()
}

struct Fixture {
    addr: SocketAddr,
    app: Arc<App>,
    task: JoinHandle<()>,
    _source: CsvSource,
}

impl Fixture {
    async fn start(pairs: &[(&str, &str)]) -> Self {
        let source = CsvSource::from_pairs(',', pairs);
        let redir = load(&source);
        let app = Arc::new(App::default());
        let chain: Arc<dyn Handler> = Arc::new(redir.chain(app.clone()));
        let (addr, task) = start_server(chain).await;

        Self {
            addr,
            app,
            task,
            _source: source,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[tokio::test]
async fn test_redirects_known_path() {
    let fixture = Fixture::start(&[("/old", "/new")]).await;

    let response = no_follow_client()
        .get(fixture.url("/old"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(response.headers()["location"], "/new");
    assert_eq!(response.headers()["content-type"], "text/html; charset=utf-8");
    assert_eq!(
        response.text().await.unwrap(),
        "<a href=\"/new\">Moved Permanently</a>.\n\n"
    );
    assert_eq!(fixture.app.hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unknown_path_reaches_application() {
    let fixture = Fixture::start(&[("/old", "/new")]).await;

    let response = no_follow_client()
        .get(fixture.url("/elsewhere?page=3"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "app: /elsewhere");
    assert_eq!(fixture.app.hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_query_string_is_dropped_from_location() {
    let fixture = Fixture::start(&[("/old", "/new")]).await;

    let response = no_follow_client()
        .get(fixture.url("/old?utm_source=mail"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(response.headers()["location"], "/new");
}

#[tokio::test]
async fn test_post_with_body_is_redirected() {
    let fixture = Fixture::start(&[("/form", "/v2/form")]).await;

    let response = no_follow_client()
        .post(fixture.url("/form"))
        .body("field=value")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(response.headers()["location"], "/v2/form");
    assert!(response.headers().get("content-type").is_none());
    assert_eq!(fixture.app.hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_head_is_redirected_without_body() {
    let fixture = Fixture::start(&[("/old", "/new")]).await;

    let response = no_follow_client()
        .head(fixture.url("/old"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(response.headers()["location"], "/new");
    assert!(response.text().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_percent_encoded_request_path_matches_decoded_entry() {
    let fixture = Fixture::start(&[("/café", "/cafe")]).await;

    let response = no_follow_client()
        .get(fixture.url("/caf%C3%A9"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(response.headers()["location"], "/cafe");
}

#[tokio::test]
async fn test_following_client_lands_on_application() {
    let fixture = Fixture::start(&[("/old", "/new")]).await;

    let response = reqwest::Client::new()
        .get(fixture.url("/old"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.url().path(), "/new");
    assert_eq!(response.text().await.unwrap(), "app: /new");
    assert_eq!(fixture.app.hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_concurrent_requests_share_one_table() {
    let fixture = Fixture::start(&[("/a", "/1"), ("/b", "/2")]).await;
    let client = no_follow_client();

    let mut tasks = Vec::new();
    for i in 0..20 {
        let client = client.clone();
        let url = fixture.url(if i % 2 == 0 { "/a" } else { "/b" });
        tasks.push(tokio::spawn(async move {
            let response = client.get(url).send().await.unwrap();
            (
                response.status(),
                response.headers()["location"].to_str().unwrap().to_string(),
            )
        }));
    }

    for (i, task) in tasks.into_iter().enumerate() {
        let (status, location) = task.await.unwrap();
        assert_eq!(status, StatusCode::MOVED_PERMANENTLY);
        assert_eq!(location, if i % 2 == 0 { "/1" } else { "/2" });
    }
}

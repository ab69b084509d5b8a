//! server — HTTP read side over the history store (tiny_http).
//!
//! Routes (GET only):
//! - `/`             chart page
//! - `/api/latest`   latest snapshot, `{}` when the history is empty
//! - `/api/history`  full history
//! - `/api/series`   materialized series (key -> [{timestamp, value}])
//! - `/health`       liveness
//! - `/metrics`      Prometheus text
//!
//! Routing is a pure function (`route`) so it can be exercised without sockets.
//! `HttpServer::run` shares one listener between N worker threads.

mod page;

pub use page::render_chart_page;

use anyhow::{anyhow, Result};
use log::{debug, info, warn};
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tiny_http::{Header, Response, Server, StatusCode};

use crate::metrics;
use crate::series::materialize;
use crate::store::HistoryStore;

const CT_JSON: &str = "application/json";
const CT_HTML: &str = "text/html; charset=utf-8";
const CT_TEXT: &str = "text/plain; charset=utf-8";
const CT_PROM: &str = "text/plain; version=0.0.4";

/// How often idle workers re-check the stop flag.
const POLL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl Reply {
    fn new(status: u16, content_type: &'static str, body: String) -> Self {
        Self {
            status,
            content_type,
            body,
        }
    }

    fn json<T: serde::Serialize + ?Sized>(value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(body) => Self::new(200, CT_JSON, body),
            Err(e) => Self::new(500, CT_TEXT, format!("serialize error: {}\n", e)),
        }
    }

    fn text(status: u16, body: &str) -> Self {
        Self::new(status, CT_TEXT, body.to_string())
    }
}

pub fn route(store: &HistoryStore, method: &str, url: &str) -> Reply {
    let path = url.split(|c: char| c == '?' || c == '#').next().unwrap_or("");
    let known = matches!(
        path,
        "/" | "/api/latest" | "/api/history" | "/api/series" | "/health" | "/metrics"
    );
    if !known {
        metrics::record_http_not_found();
        return Reply::text(404, "not found\n");
    }
    if method != "GET" {
        return Reply::text(405, "method not allowed\n");
    }

    match path {
        "/" => Reply::new(200, CT_HTML, render_chart_page(&materialize(&store.all()))),
        "/api/latest" => match store.latest() {
            Some(s) => Reply::json(&s),
            None => Reply::new(200, CT_JSON, "{}".to_string()),
        },
        "/api/history" => Reply::json(&*store.all()),
        "/api/series" => Reply::json(&materialize(&store.all())),
        "/health" => Reply::text(200, "OK\n"),
        _ => Reply::new(
            200,
            CT_PROM,
            metrics::render_prometheus(&metrics::snapshot(), store.len()),
        ),
    }
}

/// Built by hand so the reply's Content-Type is the only one sent.
fn into_response(reply: Reply) -> Response<Cursor<Vec<u8>>> {
    let body = reply.body.into_bytes();
    let len = body.len();
    let headers = Header::from_bytes(&b"Content-Type"[..], reply.content_type.as_bytes())
        .map(|h| vec![h])
        .unwrap_or_default();
    Response::new(StatusCode(reply.status), headers, Cursor::new(body), Some(len), None)
}

/// Stops a running `HttpServer` from another thread.
#[derive(Clone)]
pub struct ShutdownHandle(Arc<AtomicBool>);

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

pub struct HttpServer {
    inner: Server,
    stop: Arc<AtomicBool>,
}

impl HttpServer {
    pub fn bind(addr: &str) -> Result<Self> {
        let inner = Server::http(addr).map_err(|e| anyhow!("bind http at {}: {}", addr, e))?;
        Ok(Self {
            inner,
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Bound socket address (useful after binding port 0).
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.inner.server_addr().to_ip()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle(self.stop.clone())
    }

    /// Serve until shut down. Blocks the calling thread.
    pub fn run(&self, store: Arc<HistoryStore>, workers: usize) {
        let workers = workers.max(1);
        if let Some(addr) = self.local_addr() {
            info!("listening on http://{} ({} workers)", addr, workers);
        }
        thread::scope(|s| {
            for _ in 0..workers {
                let store = store.clone();
                s.spawn(move || self.worker_loop(&store));
            }
        });
        info!("http server stopped");
    }

    fn worker_loop(&self, store: &HistoryStore) {
        while !self.stop.load(Ordering::SeqCst) {
            let rq = match self.inner.recv_timeout(POLL) {
                Ok(Some(rq)) => rq,
                Ok(None) => continue,
                Err(e) => {
                    warn!("http recv error: {}", e);
                    continue;
                }
            };
            metrics::record_http_request();

            let url = rq.url().to_string();
            let method = rq.method().as_str().to_string();
            let reply = route(store, &method, &url);
            debug!("{} {} -> {}", method, url, reply.status);

            if let Err(e) = rq.respond(into_response(reply)) {
                debug!("respond {} failed: {}", url, e);
            }
        }
    }
}

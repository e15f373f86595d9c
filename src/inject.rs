//! Runs requests through an [`App`] without opening a socket.
//!
//! ```rust
//! use sluice::{App, Config, Inject, Request, Router};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let router = Router::new().get("/ping", |_req: Request| async { "pong" });
//! let app = App::new(router, Config::default());
//!
//! let res = app.inject(Inject::get("/ping")).await.unwrap();
//! assert_eq!(res.status, 200);
//! assert_eq!(res.text(), "pong");
//! # }
//! ```

use std::net::SocketAddr;

use bytes::Bytes;
use http::HeaderMap;
use http_body_util::{BodyExt, Full};
use serde_json::Value;

use crate::error::Error;
use crate::lifecycle::App;

/// A request to inject. Carries a `User-Agent` unless told otherwise, so
/// protective mode does not reject it.
#[derive(Clone, Debug)]
pub struct Inject {
    method: String,
    url: String,
    headers: Vec<(String, String)>,
    body: Bytes,
    remote: Option<SocketAddr>,
}

impl Inject {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: vec![("user-agent".to_owned(), "sluice-inject".to_owned())],
            body: Bytes::new(),
            remote: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self { Self::new("GET", url) }
    pub fn post(url: impl Into<String>) -> Self { Self::new("POST", url) }
    pub fn put(url: impl Into<String>) -> Self { Self::new("PUT", url) }
    pub fn patch(url: impl Into<String>) -> Self { Self::new("PATCH", url) }
    pub fn delete(url: impl Into<String>) -> Self { Self::new("DELETE", url) }
    pub fn options(url: impl Into<String>) -> Self { Self::new("OPTIONS", url) }

    /// Adds a header, replacing any earlier one of the same name.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into().to_ascii_lowercase();
        self.headers.retain(|(n, _)| *n != name);
        self.headers.push((name, value.into()));
        self
    }

    pub fn without_header(mut self, name: &str) -> Self {
        let name = name.to_ascii_lowercase();
        self.headers.retain(|(n, _)| *n != name);
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets a JSON body and its content type.
    pub fn json(self, value: &Value) -> Self {
        let body = value.to_string();
        self.header("content-type", "application/json").body(body)
    }

    /// Sets a url-encoded form body and its content type.
    pub fn form(self, pairs: &[(&str, &str)]) -> Self {
        let body = serde_urlencoded::to_string(pairs).unwrap_or_default();
        self.header("content-type", "application/x-www-form-urlencoded").body(body)
    }

    pub fn remote(mut self, addr: SocketAddr) -> Self {
        self.remote = Some(addr);
        self
    }
}

/// A fully buffered response.
#[derive(Clone, Debug)]
pub struct Injected {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Injected {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The body as JSON, `None` if it is not.
    pub fn json(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl App {
    /// Runs one request through the full lifecycle and buffers the response.
    pub async fn inject(&self, req: Inject) -> Result<Injected, Error> {
        let mut builder = http::Request::builder().method(req.method.as_str()).uri(req.url.as_str());
        for (name, value) in &req.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let request = builder.body(Full::new(req.body))?;

        let res = self.handle(request, req.remote).await;
        let (parts, body) = res.into_parts();
        let body = body.collect().await?.to_bytes();

        Ok(Injected { status: parts.status.as_u16(), headers: parts.headers, body })
    }
}

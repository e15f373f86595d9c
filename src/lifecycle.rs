//! The request lifecycle.
//!
//! Every request walks the same fixed sequence of stages:
//!
//! ```text
//! received → logged → timeout armed → route resolved → body parsed
//!          → stripped → validated → pre-handled → handling → responded
//!                 ╲________________ any failure ________________╱
//!                                   erroring → responded
//! ```
//!
//! The timeout races the whole sequence. When it wins, a 408 is sent with
//! `Connection: close` and the in-flight future is dropped: the handler
//! stops at its next `.await` and whatever it would have returned is never
//! seen. Work the handler spawned onto the runtime is not cancelled.
//!
//! Only HTTP/1.1 connections are closed by that header. hyper strips
//! connection-specific headers from HTTP/2 responses, so over h2 the 408 ends
//! the stream and the connection stays open for other streams.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use futures_util::FutureExt;
use http::HeaderMap;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use serde_json::{Map, Value};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::handler::{BoxFuture, BoxedHandler};
use crate::http_error::{Fault, HttpError};
use crate::method::Method;
use crate::request::{Request, ResponseHelpers};
use crate::response::{self, Body, Extras, Outcome, Payload};
use crate::router::{Route, Router};
use crate::validation::Location;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A router and its configuration, ready to handle requests.
///
/// Cheap to clone; clones share the same route table and config.
#[derive(Clone)]
pub struct App {
    router: Arc<Router>,
    config: Arc<Config>,
}

/// Per-request state that outlives a failure.
#[derive(Default)]
struct Exchange {
    route: Option<Arc<Route>>,
    helpers: ResponseHelpers,
}

impl App {
    pub fn new(router: Router, config: Config) -> Self {
        Self { router: Arc::new(router), config: Arc::new(config) }
    }

    pub fn config(&self) -> &Config { &self.config }
    pub fn router(&self) -> &Router { &self.router }

    /// Runs one request through the full lifecycle. Never fails: every
    /// problem becomes an error response.
    pub async fn handle<B>(&self, req: http::Request<B>, remote: Option<SocketAddr>) -> http::Response<Body>
    where
        B: hyper::body::Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let started = Instant::now();
        let method = req.method().clone();
        let path = req.uri().path().to_owned();
        let client = client_address(req.headers(), remote, self.config.trust_proxy);
        info!(%method, %path, from = client.as_deref().unwrap_or("-"), "request");

        let res = match tokio::time::timeout(self.config.request_timeout(), self.process(req, client)).await {
            Ok(res) => res,
            Err(_) => {
                let message = self.config.timeout_message();
                warn!(%method, %path, "{message}");
                let err = HttpError::request_timeout(message);
                let extras = Extras { close: true, ..Extras::default() };
                response::write(&self.config, err.status_code, error_payload(&err), extras)
            }
        };

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        info!(%method, %path, status = res.status().as_u16(), elapsed_ms, "response");
        res
    }

    async fn process<B>(&self, req: http::Request<B>, client: Option<String>) -> http::Response<Body>
    where
        B: hyper::body::Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let mut ex = Exchange::default();
        match self.run(req, client, &mut ex).await {
            Ok((status, payload)) => {
                let extras = Extras {
                    headers: ex.helpers.take_headers(),
                    redirect: ex.helpers.take_redirect(),
                    close: false,
                };
                response::write(&self.config, status, payload, extras)
            }
            Err(fault) => self.fail(fault, &ex).await,
        }
    }

    async fn run<B>(
        &self,
        req: http::Request<B>,
        client: Option<String>,
        ex: &mut Exchange,
    ) -> Result<(u16, Payload), Fault>
    where
        B: hyper::body::Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = req.into_parts();
        let path = parts.uri.path();
        let method = Method::from_http(&parts.method).ok_or_else(HttpError::not_found)?;

        if method == Method::Options {
            let entry = self.router.lookup_options(path).ok_or_else(HttpError::not_found)?;
            self.require_user_agent(&parts.headers)?;
            let allow = entry.methods().map(Method::as_str).collect::<Vec<_>>().join(", ");
            ex.helpers.set_header("allow", allow);
            return Ok((200, Payload::Empty));
        }

        let matched = self.router.lookup(method, path).ok_or_else(HttpError::not_found)?;
        let route = Arc::clone(&matched.route);
        ex.route = Some(Arc::clone(&route));
        self.require_user_agent(&parts.headers)?;

        let raw = read_body(body, &parts.headers, self.config.payload_limit).await?;
        let content_type = parts.headers.get(http::header::CONTENT_TYPE).and_then(|v| v.to_str().ok());
        let mut body = parse_body(&raw, content_type)?;
        let mut query = parse_query(parts.uri.query())?;

        if self.config.strip_unknown {
            body = strip_body(body, &route, Location::Body);
            strip_map(&mut query, &route, Location::Query);
        }

        let mut req = Request {
            method,
            path: path.to_owned(),
            body,
            query,
            params: matched.params,
            headers: header_map(&parts.headers),
            context: HashMap::new(),
            client_address: client,
            helpers: ex.helpers.clone(),
        };

        route.rules.check(&req)?;

        for pre in self.router.pre_handlers().iter().chain(&route.pre) {
            call_handler(pre, req.clone()).await?;
        }
        req.context = ex.helpers.take_context();

        let reply = call_handler(&route.handler, req).await?;
        let status = reply
            .status
            .or_else(|| reply.payload.embedded_status())
            .unwrap_or(route.status);
        if status >= 400 {
            return Err(reply.payload.into_fault(status));
        }
        Ok((status, reply.payload))
    }

    /// The erroring stage. A route hook, when present, decides the whole
    /// response; otherwise the fault is normalized, logged if it is a server
    /// error, and its message hidden outside dev mode.
    async fn fail(&self, fault: Fault, ex: &Exchange) -> http::Response<Body> {
        let headers = ex.helpers.take_headers();

        if let Some(hook) = ex.route.as_ref().and_then(|r| r.on_error.clone()) {
            return match guarded(|| hook.call(fault)).await {
                Ok(reply) => {
                    let status = reply
                        .status
                        .or_else(|| reply.payload.embedded_status())
                        .filter(|c| (100..=599).contains(c))
                        .unwrap_or(500);
                    let extras = Extras { headers, ..Extras::default() };
                    response::write(&self.config, status, reply.payload, extras)
                }
                Err(secondary) => {
                    error!(error = %secondary.log_text(), "error hook failed");
                    self.bare_500()
                }
            };
        }

        if fault.status_code() >= 500 {
            error!(status = fault.status_code(), error = %fault.log_text(), "request failed");
        }

        let mut err = fault.into_http_error();
        if err.is_server_error() && !self.config.dev {
            err.message = None;
        }
        match serde_json::to_value(&err) {
            Ok(value) => {
                let extras = Extras { headers, ..Extras::default() };
                response::write(&self.config, err.status_code, Payload::Json(value), extras)
            }
            Err(e) => {
                error!(error = %e, "error serialization failed");
                self.bare_500()
            }
        }
    }

    fn bare_500(&self) -> http::Response<Body> {
        let err = HttpError::internal();
        response::send(&self.config, err.status_code, error_payload(&err))
    }

    fn require_user_agent(&self, headers: &HeaderMap) -> Result<(), HttpError> {
        if self.config.protect && !headers.contains_key(http::header::USER_AGENT) {
            return Err(HttpError::forbidden("Make sure your request has a User-Agent header"));
        }
        Ok(())
    }
}

// ── Handler invocation ────────────────────────────────────────────────────────

/// Runs a handler, folding returned errors and panics into one `Outcome`.
async fn call_handler(handler: &BoxedHandler, req: Request) -> Outcome {
    guarded(|| handler.call(req)).await
}

async fn guarded(start: impl FnOnce() -> BoxFuture) -> Outcome {
    let fut = match std::panic::catch_unwind(AssertUnwindSafe(start)) {
        Ok(fut) => fut,
        Err(panic) => return Err(Fault::from_panic(panic)),
    };
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(panic) => Err(Fault::from_panic(panic)),
    }
}

fn error_payload(err: &HttpError) -> Payload {
    Payload::Json(serde_json::to_value(err).unwrap_or(Value::Null))
}

// ── Body & query parsing ──────────────────────────────────────────────────────

async fn read_body<B>(body: B, headers: &HeaderMap, limit: usize) -> Result<Bytes, HttpError>
where
    B: hyper::body::Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let declared = headers
        .get(http::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.is_some_and(|len| len > limit) {
        return Err(HttpError::payload_too_large());
    }

    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => Err(HttpError::payload_too_large()),
        Err(e) => {
            warn!(error = %e, "failed to read request body");
            Err(HttpError::bad_request("Failed to read request body"))
        }
    }
}

/// Parses the body by media type. An empty body is `null` whatever the type.
fn parse_body(raw: &[u8], content_type: Option<&str>) -> Result<Value, HttpError> {
    if raw.is_empty() {
        return Ok(Value::Null);
    }
    let media: mime::Mime = content_type
        .unwrap_or("text/plain; charset=utf-8")
        .parse()
        .map_err(|_| HttpError::unsupported_media_type())?;

    if media.subtype() == mime::JSON || media.suffix() == Some(mime::JSON) {
        serde_json::from_slice(raw).map_err(|_| HttpError::bad_request("Invalid JSON payload"))
    } else if media.subtype() == mime::WWW_FORM_URLENCODED {
        serde_urlencoded::from_bytes::<Vec<(String, String)>>(raw)
            .map(form_to_value)
            .map_err(|_| HttpError::bad_request("Invalid form data"))
    } else if media.subtype() == mime::PLAIN {
        Ok(Value::String(String::from_utf8_lossy(raw).into_owned()))
    } else {
        Err(HttpError::unsupported_media_type())
    }
}

/// Repeated form keys collect into an array, in order.
fn form_to_value(pairs: Vec<(String, String)>) -> Value {
    let mut map = Map::new();
    for (key, value) in pairs {
        match map.get_mut(&key) {
            Some(Value::Array(items)) => items.push(Value::String(value)),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, Value::String(value)]);
            }
            None => {
                map.insert(key, Value::String(value));
            }
        }
    }
    Value::Object(map)
}

/// Query parameters; a repeated key keeps its last value.
fn parse_query(query: Option<&str>) -> Result<HashMap<String, String>, HttpError> {
    let Some(query) = query else { return Ok(HashMap::new()) };
    serde_urlencoded::from_str::<Vec<(String, String)>>(query)
        .map(|pairs| pairs.into_iter().collect())
        .map_err(|_| HttpError::bad_request("Invalid query string"))
}

fn strip_body(body: Value, route: &Route, location: Location) -> Value {
    if route.rules.section(location).is_empty() {
        return body;
    }
    match body {
        Value::Object(map) => {
            let known: Vec<&str> = route.rules.names(location).collect();
            Value::Object(map.into_iter().filter(|(k, _)| known.contains(&k.as_str())).collect())
        }
        other => other,
    }
}

fn strip_map(map: &mut HashMap<String, String>, route: &Route, location: Location) {
    if route.rules.section(location).is_empty() {
        return;
    }
    let known: Vec<&str> = route.rules.names(location).collect();
    map.retain(|k, _| known.contains(&k.as_str()));
}

/// Header names are already lowercase; repeated headers are comma-joined.
fn header_map(headers: &HeaderMap) -> HashMap<String, String> {
    let mut out: HashMap<String, String> = HashMap::new();
    for (name, value) in headers {
        let Ok(value) = value.to_str() else { continue };
        out.entry(name.as_str().to_owned())
            .and_modify(|v| {
                v.push_str(", ");
                v.push_str(value);
            })
            .or_insert_with(|| value.to_owned());
    }
    out
}

fn client_address(headers: &HeaderMap, remote: Option<SocketAddr>, trust_proxy: bool) -> Option<String> {
    if trust_proxy {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(first) = forwarded {
            return Some(first.to_owned());
        }
    }
    remote.map(|addr| addr.ip().to_string())
}

#[cfg(test)]
mod tests {
    use http::HeaderValue;
    use serde_json::json;

    use super::*;
    use crate::http_error::FaultKind;

    #[test]
    fn body_parsing_by_media_type() {
        assert_eq!(parse_body(br#"{"a":1}"#, Some("application/json")).unwrap(), json!({ "a": 1 }));
        assert_eq!(parse_body(br#"{"a":1}"#, Some("application/vnd.api+json")).unwrap(), json!({ "a": 1 }));
        assert_eq!(parse_body(b"a=1&b=2&a=3", Some("application/x-www-form-urlencoded")).unwrap(), json!({ "a": ["1", "3"], "b": "2" }));
        assert_eq!(parse_body(b"hello", None).unwrap(), json!("hello"));
        assert_eq!(parse_body(b"", Some("image/png")).unwrap(), Value::Null);

        let err = parse_body(b"{nope", Some("application/json")).unwrap_err();
        assert_eq!((err.status_code, err.message.as_deref()), (400, Some("Invalid JSON payload")));
        assert_eq!(parse_body(b"x", Some("image/png")).unwrap_err().status_code, 415);
        assert_eq!(parse_body(b"x", Some("???")).unwrap_err().status_code, 415);
    }

    #[test]
    fn query_keeps_last_value() {
        let q = parse_query(Some("x=1&y=a%20b&x=2")).unwrap();
        assert_eq!(q["x"], "2");
        assert_eq!(q["y"], "a b");
        assert!(parse_query(None).unwrap().is_empty());
    }

    #[test]
    fn client_address_prefers_trusted_proxy() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        let peer: SocketAddr = "127.0.0.1:9000".parse().unwrap();

        assert_eq!(client_address(&headers, Some(peer), true).as_deref(), Some("203.0.113.7"));
        assert_eq!(client_address(&headers, Some(peer), false).as_deref(), Some("127.0.0.1"));
        assert_eq!(client_address(&HeaderMap::new(), None, true), None);
    }

    #[test]
    fn repeated_headers_are_joined() {
        let mut headers = HeaderMap::new();
        headers.append("accept", HeaderValue::from_static("text/html"));
        headers.append("accept", HeaderValue::from_static("application/json"));
        assert_eq!(header_map(&headers)["accept"], "text/html, application/json");
    }

    #[tokio::test]
    async fn body_limit_is_enforced() {
        use http_body_util::Full;

        let small = read_body(Full::new(Bytes::from_static(b"1234")), &HeaderMap::new(), 4).await;
        assert_eq!(small.unwrap(), "1234");

        let big = read_body(Full::new(Bytes::from_static(b"12345")), &HeaderMap::new(), 4).await;
        assert_eq!(big.unwrap_err().status_code, 413);

        let mut declared = HeaderMap::new();
        declared.insert("content-length", HeaderValue::from_static("99"));
        let early = read_body(Full::new(Bytes::new()), &declared, 4).await;
        assert_eq!(early.unwrap_err().status_code, 413);
    }

    async fn explode() -> Outcome {
        panic!("kaboom")
    }

    #[tokio::test]
    async fn panics_become_faults() {
        let outcome = guarded(|| Box::pin(explode())).await;
        assert!(matches!(outcome, Err(f) if matches!(f.kind(), FaultKind::Message(m) if m == "kaboom")));
    }
}

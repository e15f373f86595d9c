//! Handler results and the response writer.
//!
//! A handler returns anything implementing [`IntoOutcome`]. The lifecycle
//! turns that into a status and a [`Payload`], and [`send`] turns those into
//! wire headers and a body:
//!
//! | Payload            | Content-Type                         | Length          |
//! |--------------------|--------------------------------------|-----------------|
//! | `Empty`            | none                                 | `0`             |
//! | `Bytes`            | `application/octet-stream`           | exact           |
//! | `Stream`           | `application/octet-stream`           | none (chunked)  |
//! | `Json`             | `application/json`                   | exact           |
//! | `Text`             | `text/plain` or `text/html`          | UTF-8 byte len  |

use std::fmt;
use std::io;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::{Stream, TryStreamExt};
use http::header::{self, HeaderName, HeaderValue};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full, StreamBody};
use hyper::body::Frame;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, warn};

use crate::config::Config;
use crate::http_error::{Fault, HttpError};
use crate::request::Redirect;
use crate::status::Status;

/// Response body type produced by sluice.
pub type Body = UnsyncBoxBody<Bytes, io::Error>;

/// A byte stream piped straight to the client.
pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send + 'static>>;

// ── Payload ───────────────────────────────────────────────────────────────────

/// What a response carries.
pub enum Payload {
    /// No body. Used when a handler returns nothing.
    Empty,
    Bytes(Bytes),
    Stream(ByteStream),
    Json(Value),
    Text(String),
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty    => f.write_str("Empty"),
            Self::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            Self::Stream(_) => f.write_str("Stream"),
            Self::Json(v)  => f.debug_tuple("Json").field(v).finish(),
            Self::Text(t)  => f.debug_tuple("Text").field(t).finish(),
        }
    }
}

impl Payload {
    /// A `statusCode` carried inside a JSON object result.
    pub(crate) fn embedded_status(&self) -> Option<u16> {
        match self {
            Self::Json(v) => v.get("statusCode")?.as_u64().and_then(|c| u16::try_from(c).ok()),
            _ => None,
        }
    }

    /// Turns a result whose status is an error into a [`Fault`].
    pub(crate) fn into_fault(self, status: u16) -> Fault {
        match self {
            Self::Json(Value::Object(mut map)) => {
                map.entry("statusCode").or_insert_with(|| Value::from(status));
                Fault::from(Value::Object(map))
            }
            Self::Text(text) => HttpError::new(status).with_message(text).into(),
            _ => HttpError::new(status).into(),
        }
    }
}

// ── Reply ─────────────────────────────────────────────────────────────────────

/// A payload with an optional explicit status.
///
/// ```rust
/// use sluice::{Reply, Status};
///
/// Reply::text("created").status(Status::Created);
/// Reply::json(serde_json::json!({ "id": 1 }));
/// Reply::bytes(vec![0xde, 0xad]);
/// ```
#[derive(Debug)]
pub struct Reply {
    pub(crate) status: Option<u16>,
    pub(crate) payload: Payload,
}

impl Reply {
    pub fn new(payload: Payload) -> Self {
        Self { status: None, payload }
    }

    pub fn empty() -> Self {
        Self::new(Payload::Empty)
    }

    pub fn text(body: impl Into<String>) -> Self {
        Self::new(Payload::Text(body.into()))
    }

    pub fn json(body: Value) -> Self {
        Self::new(Payload::Json(body))
    }

    pub fn bytes(body: impl Into<Bytes>) -> Self {
        Self::new(Payload::Bytes(body.into()))
    }

    pub fn stream<S>(stream: S) -> Self
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        Self::new(Payload::Stream(Box::pin(stream)))
    }

    /// Overrides the route's default status.
    pub fn status(mut self, status: Status) -> Self {
        self.status = Some(status.code());
        self
    }

    pub fn status_code(mut self, code: u16) -> Self {
        self.status = Some(code);
        self
    }
}

// ── IntoOutcome ───────────────────────────────────────────────────────────────

/// What a handler produced: a reply, or a failure to normalize.
pub type Outcome = Result<Reply, Fault>;

/// Conversion of handler return values.
///
/// Implemented for the common cases; implement it on your own types to
/// return them directly.
///
/// ```rust
/// use sluice::{HttpError, Json, Request};
///
/// #[derive(serde::Serialize)]
/// struct User { id: u32 }
///
/// async fn get_user(req: Request) -> Result<Json<User>, HttpError> {
///     match req.param("id").and_then(|id| id.parse().ok()) {
///         Some(id) => Ok(Json(User { id })),
///         None => Err(HttpError::not_found()),
///     }
/// }
/// ```
pub trait IntoOutcome {
    fn into_outcome(self) -> Outcome;
}

impl IntoOutcome for Reply {
    fn into_outcome(self) -> Outcome { Ok(self) }
}

impl IntoOutcome for Payload {
    fn into_outcome(self) -> Outcome { Ok(Reply::new(self)) }
}

impl IntoOutcome for () {
    fn into_outcome(self) -> Outcome { Ok(Reply::empty()) }
}

impl IntoOutcome for &'static str {
    fn into_outcome(self) -> Outcome { Ok(Reply::text(self)) }
}

impl IntoOutcome for String {
    fn into_outcome(self) -> Outcome { Ok(Reply::text(self)) }
}

impl IntoOutcome for Bytes {
    fn into_outcome(self) -> Outcome { Ok(Reply::bytes(self)) }
}

impl IntoOutcome for Vec<u8> {
    fn into_outcome(self) -> Outcome { Ok(Reply::bytes(self)) }
}

/// `null` means "nothing to send"; a bare string is text.
impl IntoOutcome for Value {
    fn into_outcome(self) -> Outcome {
        Ok(match self {
            Value::Null => Reply::empty(),
            Value::String(s) => Reply::text(s),
            other => Reply::json(other),
        })
    }
}

/// Return a [`Status`] directly from a handler: `return Status::NoContent`
impl IntoOutcome for Status {
    fn into_outcome(self) -> Outcome { Ok(Reply::empty().status(self)) }
}

impl IntoOutcome for HttpError {
    fn into_outcome(self) -> Outcome { Err(self.into()) }
}

impl IntoOutcome for Fault {
    fn into_outcome(self) -> Outcome { Err(self) }
}

impl<T: IntoOutcome> IntoOutcome for Option<T> {
    fn into_outcome(self) -> Outcome {
        self.map_or_else(|| Ok(Reply::empty()), IntoOutcome::into_outcome)
    }
}

impl<T: IntoOutcome, E: Into<Fault>> IntoOutcome for Result<T, E> {
    fn into_outcome(self) -> Outcome {
        self.map_err(Into::into).and_then(IntoOutcome::into_outcome)
    }
}

impl<T: IntoOutcome> IntoOutcome for (Status, T) {
    fn into_outcome(self) -> Outcome {
        let (status, inner) = self;
        inner.into_outcome().map(|reply| reply.status(status))
    }
}

/// Serializes `T` to a JSON body. A serialization failure is a 500.
#[derive(Clone, Copy, Debug, Default)]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoOutcome for Json<T> {
    fn into_outcome(self) -> Outcome {
        let value = serde_json::to_value(&self.0)?;
        Ok(Reply::json(value))
    }
}

// ── Writer ────────────────────────────────────────────────────────────────────

/// Everything the writer needs beyond status and payload.
#[derive(Debug, Default)]
pub(crate) struct Extras {
    pub headers: Vec<(String, String)>,
    pub redirect: Option<Redirect>,
    pub close: bool,
}

/// Builds the wire response for `status` and `payload`.
///
/// Invalid or missing status codes become 200. The server-identity and
/// `Cache-Control: no-cache` headers are always set; protective headers are
/// added when the config asks for them.
pub fn send(config: &Config, status: u16, payload: Payload) -> http::Response<Body> {
    write(config, status, payload, Extras::default())
}

pub(crate) fn write(config: &Config, status: u16, payload: Payload, extras: Extras) -> http::Response<Body> {
    let Extras { headers, redirect, close } = extras;

    if let Some(r) = redirect {
        let mut res = http::Response::new(full(format!("Redirecting to {}", r.location)));
        *res.status_mut() = status_or_ok(r.status);
        set(&mut res, header::CONTENT_TYPE, "text/plain; charset=utf-8");
        set(&mut res, header::LOCATION, &r.location);
        return finish(config, res, headers, close);
    }

    let (content_type, body, length): (Option<&str>, Body, Option<usize>) = match payload {
        Payload::Empty => (None, empty(), Some(0)),
        Payload::Bytes(bytes) => {
            let len = bytes.len();
            (Some("application/octet-stream"), full(bytes), Some(len))
        }
        Payload::Stream(stream) => {
            let body = StreamBody::new(stream.map_ok(Frame::data)).boxed_unsync();
            (Some("application/octet-stream"), body, None)
        }
        Payload::Json(value) => {
            let encoded = if config.dev { serde_json::to_vec_pretty(&value) } else { serde_json::to_vec(&value) };
            match encoded {
                Ok(bytes) => {
                    let len = bytes.len();
                    (Some("application/json"), full(bytes), Some(len))
                }
                Err(e) => {
                    error!(error = %e, "response serialization failed");
                    let mut res = http::Response::new(empty());
                    *res.status_mut() = http::StatusCode::INTERNAL_SERVER_ERROR;
                    set(&mut res, header::CONTENT_LENGTH, "0");
                    return finish(config, res, headers, close);
                }
            }
        }
        Payload::Text(text) => {
            let kind = if looks_like_markup(&text) { "text/html; charset=utf-8" } else { "text/plain; charset=utf-8" };
            // byte length, not char count
            let len = text.len();
            (Some(kind), full(text), Some(len))
        }
    };

    let mut res = http::Response::new(body);
    *res.status_mut() = status_or_ok(status);
    if let Some(kind) = content_type {
        set(&mut res, header::CONTENT_TYPE, kind);
    }
    if let Some(len) = length {
        set(&mut res, header::CONTENT_LENGTH, &len.to_string());
    }
    finish(config, res, headers, close)
}

fn finish(
    config: &Config,
    mut res: http::Response<Body>,
    extra: Vec<(String, String)>,
    close: bool,
) -> http::Response<Body> {
    if config.server_header {
        set(&mut res, header::SERVER, &config.name);
    }
    set(&mut res, header::CACHE_CONTROL, "no-cache");

    if config.protect {
        set(&mut res, header::X_CONTENT_TYPE_OPTIONS, "nosniff");
        set(&mut res, header::X_FRAME_OPTIONS, "deny");
        set(&mut res, header::X_XSS_PROTECTION, "1; mode=block");
        set(&mut res, HeaderName::from_static("x-download-options"), "noopen");
    }

    for (name, value) in extra {
        match (HeaderName::try_from(name.as_str()), HeaderValue::try_from(value.as_str())) {
            (Ok(name), Ok(value)) => {
                res.headers_mut().insert(name, value);
            }
            _ => warn!(header = %name, "dropping invalid response header"),
        }
    }

    if close {
        set(&mut res, header::CONNECTION, "close");
    }
    res
}

fn set(res: &mut http::Response<Body>, name: HeaderName, value: &str) {
    if let Ok(value) = HeaderValue::try_from(value) {
        res.headers_mut().insert(name, value);
    }
}

fn status_or_ok(code: u16) -> http::StatusCode {
    http::StatusCode::from_u16(code).unwrap_or(http::StatusCode::OK)
}

fn looks_like_markup(text: &str) -> bool {
    let t = text.trim();
    t.starts_with('<') && t.ends_with('>')
}

fn full(data: impl Into<Bytes>) -> Body {
    Full::new(data.into()).map_err(|never| match never {}).boxed_unsync()
}

fn empty() -> Body {
    Empty::new().map_err(|never| match never {}).boxed_unsync()
}

#[cfg(test)]
mod tests {
    use futures_util::stream;
    use serde_json::json;

    use super::*;
    use crate::http_error::FaultKind;

    async fn body_of(res: http::Response<Body>) -> Bytes {
        res.into_body().collect().await.unwrap().to_bytes()
    }

    fn header<'a>(res: &'a http::Response<Body>, name: &str) -> Option<&'a str> {
        res.headers().get(name).and_then(|v| v.to_str().ok())
    }

    #[tokio::test]
    async fn text_uses_byte_length() {
        let res = send(&Config::default(), 201, Payload::Text("héllo".into()));
        assert_eq!(res.status(), 201);
        assert_eq!(header(&res, "content-length"), Some("6"));
        assert_eq!(header(&res, "content-type"), Some("text/plain; charset=utf-8"));
        assert_eq!(header(&res, "server"), Some("sluice"));
        assert_eq!(header(&res, "cache-control"), Some("no-cache"));
        assert_eq!(body_of(res).await, "héllo");
    }

    #[tokio::test]
    async fn markup_is_html() {
        let res = send(&Config::default(), 200, Payload::Text("<p>hi</p>".into()));
        assert_eq!(header(&res, "content-type"), Some("text/html; charset=utf-8"));
    }

    #[tokio::test]
    async fn empty_sentinel_sends_nothing() {
        let res = send(&Config::default(), 200, Payload::Empty);
        assert_eq!(header(&res, "content-length"), Some("0"));
        assert!(header(&res, "content-type").is_none());
        assert!(body_of(res).await.is_empty());
    }

    #[tokio::test]
    async fn bytes_are_octet_stream() {
        let res = send(&Config::default(), 0, Payload::Bytes(Bytes::from_static(b"\x00\x01")));
        assert_eq!(res.status(), 200);
        assert_eq!(header(&res, "content-type"), Some("application/octet-stream"));
        assert_eq!(header(&res, "content-length"), Some("2"));
    }

    #[tokio::test]
    async fn streams_have_no_length() {
        let chunks = stream::iter(vec![Ok(Bytes::from("ab")), Ok(Bytes::from("cd"))]);
        let res = send(&Config::default(), 200, Payload::Stream(Box::pin(chunks)));
        assert!(header(&res, "content-length").is_none());
        assert_eq!(header(&res, "content-type"), Some("application/octet-stream"));
        assert_eq!(body_of(res).await, "abcd");
    }

    #[tokio::test]
    async fn json_is_compact_unless_dev() {
        let res = send(&Config::default(), 200, Payload::Json(json!({ "hi": "hi" })));
        assert_eq!(header(&res, "content-type"), Some("application/json"));
        assert_eq!(body_of(res).await, r#"{"hi":"hi"}"#);

        let res = send(&Config::default().dev(true), 200, Payload::Json(json!({ "hi": "hi" })));
        assert_eq!(body_of(res).await, "{\n  \"hi\": \"hi\"\n}");
    }

    #[tokio::test]
    async fn redirect_overrides_payload() {
        let extras = Extras {
            redirect: Some(Redirect { location: "/next".into(), status: 302 }),
            ..Extras::default()
        };
        let res = write(&Config::default(), 200, Payload::Json(json!({ "ignored": true })), extras);
        assert_eq!(res.status(), 302);
        assert_eq!(header(&res, "location"), Some("/next"));
        assert_eq!(body_of(res).await, "Redirecting to /next");
    }

    #[test]
    fn protective_and_identity_headers_follow_config() {
        let res = send(&Config::default(), 200, Payload::Empty);
        assert_eq!(header(&res, "x-content-type-options"), Some("nosniff"));
        assert_eq!(header(&res, "x-frame-options"), Some("deny"));

        let quiet = Config::default().protect(false).server_header(false);
        let res = send(&quiet, 200, Payload::Empty);
        assert!(header(&res, "x-frame-options").is_none());
        assert!(header(&res, "server").is_none());
        assert_eq!(header(&res, "cache-control"), Some("no-cache"));
    }

    #[test]
    fn outcome_conversions() {
        assert!(matches!(().into_outcome(), Ok(Reply { payload: Payload::Empty, status: None })));
        assert!(matches!(Value::Null.into_outcome(), Ok(Reply { payload: Payload::Empty, .. })));
        assert!(matches!(json!("hi").into_outcome(), Ok(Reply { payload: Payload::Text(_), .. })));
        assert!(matches!(Status::Created.into_outcome(), Ok(Reply { status: Some(201), .. })));
        assert!(matches!(Err::<(), _>("boom").into_outcome(), Err(f) if matches!(f.kind(), FaultKind::Message(_))));
        assert!(matches!(HttpError::not_found().into_outcome(), Err(f) if matches!(f.kind(), FaultKind::Http(_))));
        assert!(matches!((Status::Accepted, "ok").into_outcome(), Ok(Reply { status: Some(202), .. })));
    }

    #[test]
    fn error_results_become_faults() {
        let fault = Payload::Json(json!({ "message": "gone" })).into_fault(410);
        assert_eq!(fault.status_code(), 410);
        let fault = Payload::Text("teapot".into()).into_fault(418);
        assert_eq!(fault.into_http_error().message.as_deref(), Some("teapot"));
    }
}

//! Client-facing errors and the normalization boundary.
//!
//! Every way a request can fail ends up as an [`HttpError`]:
//!
//! ```text
//! handler returns Err("oops")          ─┐
//! handler returns Err(HttpError)        │
//! handler returns {"statusCode": 404}   ├─ Fault ─► HttpError ─► JSON body
//! handler panics                        │
//! body parsing / validation / timeout  ─┘
//! ```
//!
//! The wire shape is fixed:
//!
//! ```json
//! { "statusCode": 400, "error": "Bad Request", "message": "...", "validation": [ ... ] }
//! ```

use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::status::{Status, reason_phrase};
use crate::validation::ValidationFailure;

/// The normalized error sent to clients.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpError {
    pub status_code: u16,
    /// Canonical reason phrase for `status_code`.
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<Vec<ValidationFailure>>,
}

impl HttpError {
    /// An error for `status` with its canonical reason and no message.
    pub fn new(status: impl Into<u16>) -> Self {
        let status_code = status.into();
        Self {
            status_code,
            error: reason_phrase(status_code).unwrap_or("Unknown Error").to_owned(),
            message: None,
            validation: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        let message = message.into();
        self.message = (!message.is_empty()).then_some(message);
        self
    }

    pub fn with_validation(mut self, failures: Vec<ValidationFailure>) -> Self {
        self.validation = Some(failures);
        self
    }

    pub fn is_server_error(&self) -> bool {
        self.status_code >= 500
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(Status::BadRequest).with_message(message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(Status::Unauthorized).with_message(message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(Status::Forbidden).with_message(message)
    }

    pub fn not_found() -> Self {
        Self::new(Status::NotFound)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(Status::Conflict).with_message(message)
    }

    pub fn request_timeout(message: impl Into<String>) -> Self {
        Self::new(Status::RequestTimeout).with_message(message)
    }

    pub fn payload_too_large() -> Self {
        Self::new(Status::PayloadTooLarge)
    }

    pub fn unsupported_media_type() -> Self {
        Self::new(Status::UnsupportedMediaType)
    }

    pub fn unprocessable_entity(message: impl Into<String>) -> Self {
        Self::new(Status::UnprocessableEntity).with_message(message)
    }

    pub fn too_many_requests() -> Self {
        Self::new(Status::TooManyRequests)
    }

    pub fn internal() -> Self {
        Self::new(Status::InternalServerError)
    }

    pub fn not_implemented() -> Self {
        Self::new(Status::NotImplemented)
    }

    pub fn service_unavailable() -> Self {
        Self::new(Status::ServiceUnavailable)
    }

    /// Reads a pre-formed error object such as one returned by a handler.
    /// Missing pieces are filled in from the catalog.
    fn from_value(value: &Value, fallback: u16) -> Self {
        let status = embedded_code(value).filter(|c| is_http_code(*c)).unwrap_or(fallback);
        let mut err = Self::new(status);
        if let Some(reason) = value.get("error").and_then(Value::as_str) {
            err.error = reason.to_owned();
        }
        match value.get("message") {
            Some(Value::String(m)) => err = err.with_message(m.as_str()),
            Some(Value::Null) | None => {}
            Some(other) => err = err.with_message(other.to_string()),
        }
        if let Some(list) = value.get("validation") {
            err.validation = serde_json::from_value(list.clone()).ok();
        }
        err
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status_code, self.error)?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        Ok(())
    }
}

impl std::error::Error for HttpError {}

impl From<Status> for HttpError {
    fn from(status: Status) -> Self {
        Self::new(status)
    }
}

// ── Fault ─────────────────────────────────────────────────────────────────────

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Anything a handler can fail with.
///
/// Returned errors, error-shaped values and panics all become a `Fault`, and
/// every `Fault` is turned into an [`HttpError`] by the same code path. A
/// backtrace is captured where the fault is created (when `RUST_BACKTRACE`
/// enables it), so 5xx logs point at the failing code whatever its shape.
#[derive(Debug)]
pub struct Fault {
    kind: FaultKind,
    backtrace: Backtrace,
}

/// What a [`Fault`] carries.
#[derive(Debug)]
pub enum FaultKind {
    /// A bare message, e.g. `Err("oops")` or a panic payload. Always a 500.
    Message(String),
    /// An already-formed client error.
    Http(HttpError),
    /// An error-shaped JSON value, e.g. a result carrying `statusCode >= 400`.
    Value(Value),
    /// A native error.
    Internal(BoxError),
}

impl Fault {
    pub fn new(kind: FaultKind) -> Self {
        Self { kind, backtrace: Backtrace::capture() }
    }

    /// Wraps a native error.
    pub fn error(source: impl Into<BoxError>) -> Self {
        Self::new(FaultKind::Internal(source.into()))
    }

    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "handler panicked".to_owned());
        Self::new(FaultKind::Message(message))
    }

    pub fn kind(&self) -> &FaultKind {
        &self.kind
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    /// Status this fault resolves to: its own when it carries a valid HTTP
    /// error code (100..=599), 500 otherwise.
    pub fn status_code(&self) -> u16 {
        let own = match &self.kind {
            FaultKind::Http(e) => Some(e.status_code),
            FaultKind::Value(v) => embedded_code(v),
            FaultKind::Message(_) | FaultKind::Internal(_) => None,
        };
        own.filter(|c| is_http_code(*c)).unwrap_or(500)
    }

    /// Converts into the client-facing shape. Messages are kept; stripping
    /// them for production is the lifecycle's decision.
    pub fn into_http_error(self) -> HttpError {
        let status = self.status_code();
        match self.kind {
            FaultKind::Http(e) if e.status_code == status => e,
            FaultKind::Http(e) => HttpError { status_code: status, error: HttpError::new(status).error, ..e },
            FaultKind::Value(v) if v.is_object() => HttpError::from_value(&v, status),
            FaultKind::Value(Value::String(s)) => HttpError::new(status).with_message(s),
            FaultKind::Value(other) => HttpError::new(status).with_message(other.to_string()),
            FaultKind::Message(m) => HttpError::new(status).with_message(m),
            FaultKind::Internal(source) => HttpError::new(status).with_message(source.to_string()),
        }
    }

    /// Text for the server log: the error and a backtrace with dependency
    /// frames removed.
    pub(crate) fn log_text(&self) -> String {
        let mut text = self.to_string();
        if self.backtrace.status() == BacktraceStatus::Captured {
            text.push('\n');
            text.push_str(&clean_backtrace(&self.backtrace.to_string()));
        }
        text
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            FaultKind::Message(m) => f.write_str(m),
            FaultKind::Http(e) => e.fmt(f),
            FaultKind::Value(v) => v.fmt(f),
            FaultKind::Internal(source) => source.fmt(f),
        }
    }
}

fn embedded_code(value: &Value) -> Option<u16> {
    value.get("statusCode")?.as_u64().and_then(|c| u16::try_from(c).ok())
}

fn is_http_code(code: u16) -> bool {
    (100..=599).contains(&code)
}

impl From<HttpError> for Fault {
    fn from(e: HttpError) -> Self {
        Self::new(FaultKind::Http(e))
    }
}

impl From<Status> for Fault {
    fn from(s: Status) -> Self {
        Self::new(FaultKind::Http(HttpError::new(s)))
    }
}

impl From<&str> for Fault {
    fn from(m: &str) -> Self {
        Self::new(FaultKind::Message(m.to_owned()))
    }
}

impl From<String> for Fault {
    fn from(m: String) -> Self {
        Self::new(FaultKind::Message(m))
    }
}

impl From<Value> for Fault {
    fn from(v: Value) -> Self {
        Self::new(FaultKind::Value(v))
    }
}

impl From<std::io::Error> for Fault {
    fn from(e: std::io::Error) -> Self {
        Self::error(e)
    }
}

impl From<serde_json::Error> for Fault {
    fn from(e: serde_json::Error) -> Self {
        Self::error(e)
    }
}

impl From<BoxError> for Fault {
    fn from(e: BoxError) -> Self {
        Self::new(FaultKind::Internal(e))
    }
}

/// Drops backtrace frames that point into dependencies or the standard
/// library, leaving the application's own frames.
pub fn clean_backtrace(trace: &str) -> String {
    const FOREIGN: [&str; 4] = ["/.cargo/registry/", "/.cargo/git/", "/rustc/", "/rustlib/"];

    let lines: Vec<&str> = trace.lines().collect();
    let mut kept = Vec::with_capacity(lines.len());
    let mut i = 0;
    while i < lines.len() {
        // a frame is its symbol line plus an optional `at path:line` line
        let symbol = lines[i];
        let location = lines.get(i + 1).filter(|l| l.trim_start().starts_with("at "));
        let foreign = location.is_some_and(|l| FOREIGN.iter().any(|f| l.contains(*f)));
        if !foreign {
            kept.push(symbol);
            if let Some(l) = location {
                kept.push(*l);
            }
        }
        i += if location.is_some() { 2 } else { 1 };
    }
    kept.join("\n")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn serializes_canonical_shape() {
        let err = HttpError::bad_request("nope");
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({ "statusCode": 400, "error": "Bad Request", "message": "nope" })
        );
        assert_eq!(
            serde_json::to_value(HttpError::not_found()).unwrap(),
            json!({ "statusCode": 404, "error": "Not Found" })
        );
    }

    #[test]
    fn unknown_status_gets_generic_reason() {
        assert_eq!(HttpError::new(599u16).error, "Unknown Error");
    }

    #[test]
    fn empty_message_is_dropped() {
        assert_eq!(HttpError::new(Status::Gone).with_message("").message, None);
    }

    #[test]
    fn plain_strings_become_500s() {
        let err = Fault::from("oops").into_http_error();
        assert_eq!(err.status_code, 500);
        assert_eq!(err.error, "Internal Server Error");
        assert_eq!(err.message.as_deref(), Some("oops"));
    }

    #[test]
    fn error_shaped_values_keep_their_status() {
        let fault = Fault::from(json!({ "statusCode": 409, "message": "taken" }));
        assert_eq!(fault.status_code(), 409);
        let err = fault.into_http_error();
        assert_eq!(err.error, "Conflict");
        assert_eq!(err.message.as_deref(), Some("taken"));
    }

    #[test]
    fn pre_formed_values_pass_through() {
        let err = Fault::from(json!({ "statusCode": 418, "error": "Short And Stout" })).into_http_error();
        assert_eq!(err.status_code, 418);
        assert_eq!(err.error, "Short And Stout");
    }

    #[test]
    fn native_errors_are_500s() {
        let io = std::io::Error::other("disk on fire");
        let err = Fault::from(io).into_http_error();
        assert_eq!(err.status_code, 500);
        assert_eq!(err.message.as_deref(), Some("disk on fire"));
    }

    #[test]
    fn panics_keep_their_message() {
        let payload: Box<dyn Any + Send> = Box::new("kaboom");
        assert_eq!(Fault::from_panic(payload).to_string(), "kaboom");
    }

    #[test]
    fn message_faults_log_their_backtrace() {
        let fault = Fault { kind: FaultKind::Message("oops".into()), backtrace: Backtrace::force_capture() };
        let text = fault.log_text();
        assert!(text.starts_with("oops\n"));
        assert!(text.lines().count() > 1);
        assert!(text.contains("http_error"));
    }

    #[test]
    fn out_of_range_codes_become_500s() {
        let fault = Fault::from(json!({ "statusCode": 1000, "message": "weird" }));
        assert_eq!(fault.status_code(), 500);
        let err = fault.into_http_error();
        assert_eq!((err.status_code, err.error.as_str()), (500, "Internal Server Error"));
        assert_eq!(err.message.as_deref(), Some("weird"));

        let err = Fault::from(HttpError::new(42u16)).into_http_error();
        assert_eq!((err.status_code, err.error.as_str()), (500, "Internal Server Error"));
    }

    #[test]
    fn backtrace_drops_dependency_frames() {
        let trace = "\
   0: app::handler
             at ./src/main.rs:10:5
   1: tokio::runtime::task::poll
             at /home/u/.cargo/registry/src/index/tokio-1.0/src/task.rs:1:1
   2: std::rt::lang_start
             at /rustc/abc/library/std/src/rt.rs:1:1
   3: main";
        let cleaned = clean_backtrace(trace);
        assert!(cleaned.contains("app::handler"));
        assert!(cleaned.contains("src/main.rs"));
        assert!(!cleaned.contains("tokio"));
        assert!(!cleaned.contains("lang_start"));
        assert!(cleaned.ends_with("3: main"));
    }
}

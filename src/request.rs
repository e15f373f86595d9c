//! Incoming request data as seen by pre-handlers and handlers.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::http_error::HttpError;
use crate::method::Method;
use crate::status::Status;
use crate::validation::Location;

/// One request, after routing, body parsing and validation.
///
/// Cloning is cheap enough for pre-handlers to receive their own copy; the
/// [`ResponseHelpers`] inside are shared, so `pass` and `set_header` calls
/// made through any copy reach the same response.
#[derive(Clone, Debug)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) body: Value,
    pub(crate) query: HashMap<String, String>,
    pub(crate) params: HashMap<String, String>,
    pub(crate) headers: HashMap<String, String>,
    pub(crate) context: HashMap<String, Value>,
    pub(crate) client_address: Option<String>,
    pub(crate) helpers: ResponseHelpers,
}

impl Request {
    pub fn method(&self) -> Method { self.method }
    pub fn path(&self) -> &str { &self.path }

    /// The parsed body: a JSON value, a form map, a plain string, or `null`
    /// when the request had no body.
    pub fn body(&self) -> &Value { &self.body }

    /// Deserializes the body into `T`, or a 400 describing why it does not fit.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, HttpError> {
        serde_json::from_value(self.body.clone()).map_err(|e| HttpError::bad_request(e.to_string()))
    }

    pub fn query(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    pub fn query_map(&self) -> &HashMap<String, String> { &self.query }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/:id`, `req.param("id")` on `/users/42` returns `Some("42")`.
    /// Raw-regex routes name their captures `$1`, `$2`, ...
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn params(&self) -> &HashMap<String, String> { &self.params }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn headers(&self) -> &HashMap<String, String> { &self.headers }

    /// A value a pre-handler stored with [`ResponseHelpers::pass`].
    pub fn context(&self, key: &str) -> Option<&Value> {
        self.context.get(key)
    }

    /// The peer address, or the first `X-Forwarded-For` hop when the server
    /// trusts its proxy.
    pub fn client_address(&self) -> Option<&str> { self.client_address.as_deref() }

    /// Helpers that shape the response from inside a handler.
    pub fn response(&self) -> &ResponseHelpers { &self.helpers }

    /// Looks a field up in one section, for validation.
    pub(crate) fn field(&self, location: Location, name: &str) -> Option<Value> {
        match location {
            Location::Body    => self.body.get(name).cloned(),
            Location::Query   => self.query.get(name).cloned().map(Value::String),
            Location::Params  => self.params.get(name).cloned().map(Value::String),
            Location::Headers => self.headers.get(name).cloned().map(Value::String),
        }
    }
}

// ── Response helpers ──────────────────────────────────────────────────────────

/// A redirect recorded by a handler. Overrides whatever the handler returns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Redirect {
    pub location: String,
    pub status: u16,
}

#[derive(Debug, Default)]
struct HelperState {
    headers: Vec<(String, String)>,
    redirect: Option<Redirect>,
    context: HashMap<String, Value>,
}

/// Per-request handle for things a handler cannot express in its return
/// value: extra headers, a redirect, data for later stages.
#[derive(Clone, Debug, Default)]
pub struct ResponseHelpers {
    state: Arc<Mutex<HelperState>>,
}

impl ResponseHelpers {
    /// Stores `value` for the handler, readable as `req.context(name)`.
    /// Meant for pre-handlers; values passed by the handler itself are dropped.
    pub fn pass(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.state.lock().context.insert(name.into(), value.into());
    }

    pub fn set_header(&self, name: impl Into<String>, value: impl Into<String>) {
        self.state.lock().headers.push((name.into(), value.into()));
    }

    /// Redirects with `301 Moved Permanently`.
    pub fn redirect(&self, location: impl Into<String>) {
        self.redirect_with(location, Status::MovedPermanently);
    }

    pub fn redirect_with(&self, location: impl Into<String>, status: Status) {
        self.state.lock().redirect = Some(Redirect { location: location.into(), status: status.code() });
    }

    pub(crate) fn take_context(&self) -> HashMap<String, Value> {
        std::mem::take(&mut self.state.lock().context)
    }

    pub(crate) fn take_headers(&self) -> Vec<(String, String)> {
        std::mem::take(&mut self.state.lock().headers)
    }

    pub(crate) fn take_redirect(&self) -> Option<Redirect> {
        self.state.lock().redirect.take()
    }
}

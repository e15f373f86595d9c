//! Route definitions and the route table.
//!
//! Routes are registered once at startup, in order, and never change after
//! the server starts listening. Lookup walks the table in registration order
//! and the first pattern that matches wins, so register overlapping routes
//! most-specific first:
//!
//! ```rust
//! use sluice::{Request, Route, Router};
//!
//! async fn me(_: Request) -> &'static str { "me" }
//! async fn user(_: Request) -> &'static str { "user" }
//!
//! let app = Router::new()
//!     .get("/users/me",  me)     // checked before `/users/:id`
//!     .get("/users/:id", user);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::Error;
use crate::handler::{BoxedErrorHook, BoxedHandler, ErrorHook, Handler};
use crate::method::Method;
use crate::pattern::{self, RoutePattern, UrlSpec};
use crate::status::Status;
use crate::validation::Rules;

// ── Route ─────────────────────────────────────────────────────────────────────

/// One (method, URL, handler) registration and its metadata.
pub struct Route {
    pub(crate) method: String,
    pub(crate) url: UrlSpec,
    pub(crate) handler: BoxedHandler,
    pub(crate) rules: Rules,
    pub(crate) status: u16,
    pub(crate) on_error: Option<BoxedErrorHook>,
    pub(crate) pre: Vec<BoxedHandler>,
}

impl Route {
    /// A route for `method` (case-insensitive, checked at registration).
    pub fn new(method: &str, url: impl Into<UrlSpec>, handler: impl Handler) -> Self {
        Self {
            method: method.to_owned(),
            url: url.into(),
            handler: handler.into_boxed_handler(),
            rules: Rules::default(),
            status: Status::Ok.code(),
            on_error: None,
            pre: Vec::new(),
        }
    }

    pub fn get(url: impl Into<UrlSpec>, handler: impl Handler) -> Self {
        Self::new("GET", url, handler)
    }

    pub fn post(url: impl Into<UrlSpec>, handler: impl Handler) -> Self {
        Self::new("POST", url, handler)
    }

    pub fn put(url: impl Into<UrlSpec>, handler: impl Handler) -> Self {
        Self::new("PUT", url, handler)
    }

    pub fn patch(url: impl Into<UrlSpec>, handler: impl Handler) -> Self {
        Self::new("PATCH", url, handler)
    }

    pub fn delete(url: impl Into<UrlSpec>, handler: impl Handler) -> Self {
        Self::new("DELETE", url, handler)
    }

    /// Validation rules for this route's body, query, params and headers.
    pub fn validate(mut self, rules: Rules) -> Self {
        self.rules = rules;
        self
    }

    /// Status for successful results that don't carry their own (default 200).
    pub fn status(mut self, status: Status) -> Self {
        self.status = status.code();
        self
    }

    /// Replaces the default error formatting for this route.
    pub fn on_error(mut self, hook: impl ErrorHook) -> Self {
        self.on_error = Some(hook.into_boxed_hook());
        self
    }

    /// Runs `handler` after validation and before the route handler. Its
    /// result is ignored unless it fails.
    pub fn pre(mut self, handler: impl Handler) -> Self {
        self.pre.push(handler.into_boxed_handler());
        self
    }

    pub fn url(&self) -> &UrlSpec { &self.url }
    pub fn rules(&self) -> &Rules { &self.rules }
    pub fn default_status(&self) -> u16 { self.status }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("status", &self.status)
            .field("rules", &self.rules)
            .field("on_error", &self.on_error.is_some())
            .finish_non_exhaustive()
    }
}

// ── RouteSet ──────────────────────────────────────────────────────────────────

/// Registration input: a single route or an arbitrarily nested list of them.
pub enum RouteSet {
    One(Route),
    Many(Vec<RouteSet>),
}

impl RouteSet {
    /// All routes, depth-first, in document order.
    pub fn flatten(self) -> Vec<Route> {
        let mut out = Vec::new();
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into(self, out: &mut Vec<Route>) {
        match self {
            Self::One(route) => out.push(route),
            Self::Many(sets) => sets.into_iter().for_each(|s| s.flatten_into(out)),
        }
    }
}

impl From<Route> for RouteSet {
    fn from(route: Route) -> Self {
        Self::One(route)
    }
}

impl<T: Into<RouteSet>> From<Vec<T>> for RouteSet {
    fn from(items: Vec<T>) -> Self {
        Self::Many(items.into_iter().map(Into::into).collect())
    }
}

// ── Router ────────────────────────────────────────────────────────────────────

/// All routes registered under one compiled pattern, in registration order.
pub struct Entry {
    pattern: RoutePattern,
    routes: Vec<(Method, Arc<Route>)>,
}

impl Entry {
    pub fn pattern(&self) -> &RoutePattern { &self.pattern }

    /// Registered methods in registration order, for the `Allow` header.
    pub fn methods(&self) -> impl Iterator<Item = Method> + '_ {
        self.routes.iter().map(|(m, _)| *m)
    }

    fn get(&self, method: Method) -> Option<&Arc<Route>> {
        self.routes.iter().find(|(m, _)| *m == method).map(|(_, r)| r)
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("pattern", &self.pattern.as_str())
            .field("methods", &self.methods().collect::<Vec<_>>())
            .finish()
    }
}

/// A resolved route with the parameters extracted from the path.
pub struct RouteMatch {
    pub route: Arc<Route>,
    pub params: HashMap<String, String>,
}

/// The application route table.
///
/// Write-once: everything is registered before the server starts, after
/// which the table is only read, shared behind an `Arc` without locking.
#[derive(Default)]
pub struct Router {
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
    pre: Vec<BoxedHandler>,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("entries", &self.entries)
            .field("pre", &self.pre.len())
            .finish()
    }
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `route`, failing on an unsupported method, a bad URL or a
    /// duplicate (method, compiled pattern) pair.
    pub fn register(&mut self, route: Route) -> Result<&mut Self, Error> {
        let method: Method = route.method.parse()?;
        if !method.is_registrable() {
            return Err(Error::OptionsRoute);
        }
        let pattern = pattern::compile(&route.url)?;

        let slot = match self.index.get(pattern.as_str()) {
            Some(&i) => i,
            None => {
                self.index.insert(pattern.as_str().to_owned(), self.entries.len());
                self.entries.push(Entry { pattern, routes: Vec::new() });
                self.entries.len() - 1
            }
        };

        let entry = &mut self.entries[slot];
        if entry.get(method).is_some() {
            return Err(Error::DuplicateRoute { method: method.to_string(), url: route.url.to_string() });
        }
        debug!(%method, url = %route.url, pattern = entry.pattern.as_str(), "route registered");
        entry.routes.push((method, Arc::new(route)));
        Ok(self)
    }

    /// Registers a route or a nested list of routes in document order,
    /// stopping at the first failure.
    pub fn register_all(&mut self, routes: impl Into<RouteSet>) -> Result<&mut Self, Error> {
        for route in routes.into().flatten() {
            self.register(route)?;
        }
        Ok(self)
    }

    /// Chaining form of [`register`](Router::register) for startup code.
    ///
    /// # Panics
    ///
    /// Panics if the route cannot be registered.
    pub fn route(mut self, route: Route) -> Self {
        if let Err(e) = self.register(route) {
            panic!("invalid route: {e}");
        }
        self
    }

    /// Register a handler for a method + URL pair. Returns `self` for chaining.
    ///
    /// ```rust
    /// # use sluice::{Method, Request, Router};
    /// # async fn get_user(_: Request) {}
    /// # async fn create_user(_: Request) {}
    /// Router::new()
    ///     .on(Method::Get,  "/users/:id", get_user)
    ///     .on(Method::Post, "/users",     create_user);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if the route cannot be registered.
    pub fn on(self, method: Method, url: impl Into<UrlSpec>, handler: impl Handler) -> Self {
        self.route(Route::new(method.as_str(), url, handler))
    }

    pub fn get(self, url: impl Into<UrlSpec>, handler: impl Handler) -> Self {
        self.on(Method::Get, url, handler)
    }

    pub fn post(self, url: impl Into<UrlSpec>, handler: impl Handler) -> Self {
        self.on(Method::Post, url, handler)
    }

    pub fn put(self, url: impl Into<UrlSpec>, handler: impl Handler) -> Self {
        self.on(Method::Put, url, handler)
    }

    pub fn patch(self, url: impl Into<UrlSpec>, handler: impl Handler) -> Self {
        self.on(Method::Patch, url, handler)
    }

    pub fn delete(self, url: impl Into<UrlSpec>, handler: impl Handler) -> Self {
        self.on(Method::Delete, url, handler)
    }

    /// Adds a pre-handler that runs for every route, before the route's own.
    pub fn before(mut self, handler: impl Handler) -> Self {
        self.pre.push(handler.into_boxed_handler());
        self
    }

    pub(crate) fn pre_handlers(&self) -> &[BoxedHandler] {
        &self.pre
    }

    /// First route registered for `method` whose pattern matches `path`.
    /// `path` must not include the query string.
    pub fn lookup(&self, method: Method, path: &str) -> Option<RouteMatch> {
        self.entries.iter().find_map(|entry| {
            let route = entry.get(method)?;
            let params = entry.pattern.captures(path)?;
            Some(RouteMatch { route: Arc::clone(route), params })
        })
    }

    /// The first pattern matching `path`, with every method under it. Used to
    /// answer `OPTIONS`.
    pub fn lookup_options(&self, path: &str) -> Option<&Entry> {
        self.entries.iter().find(|entry| entry.pattern.is_match(path))
    }

    pub fn len(&self) -> usize {
        self.entries.iter().map(|e| e.routes.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

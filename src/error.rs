//! Unified error type.

use thiserror::Error as ThisError;

/// The error type returned by sluice's fallible operations.
///
/// Request-level failures (404, 400, 500, ...) are expressed as
/// [`HttpError`](crate::HttpError) values and never surface here. This type
/// covers startup problems: a route that cannot be registered, an address
/// that cannot be bound, a connection that cannot be accepted.
#[derive(Debug, ThisError)]
pub enum Error {
    /// The route method is not one of the five registrable verbs.
    #[error("route method must be one of [ GET, POST, PUT, PATCH, DELETE ], got `{0}`")]
    InvalidMethod(String),

    /// `OPTIONS` responses are generated from the other registrations.
    #[error("OPTIONS routes cannot be registered, they are answered automatically")]
    OptionsRoute,

    /// The URL spec is neither a string nor a compiled regular expression.
    #[error("route URL must be a string or a regular expression, got {0}")]
    InvalidUrl(&'static str),

    /// A `:name` segment with nothing after the colon.
    #[error("route URL `{0}` has an unnamed parameter")]
    UnnamedParam(String),

    /// The compiled pattern was rejected by the regex engine.
    #[error("invalid route pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// The same (method, compiled pattern) pair was registered twice.
    #[error("\"{method} {url}\" is defined more than once")]
    DuplicateRoute { method: String, url: String },

    /// The configured host/port does not form a socket address.
    #[error("invalid socket address `{0}`")]
    Address(String),

    /// An injected request could not be assembled.
    #[error("invalid request: {0}")]
    Request(#[from] http::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

//! Server configuration.
//!
//! Built once at startup and handed to [`App`](crate::App) and
//! [`Server`](crate::Server); nothing reads it from global state. Every field
//! has a default, so a loader can deserialize a partial document:
//!
//! ```rust
//! let config: sluice::Config = serde_json::from_str(r#"{ "port": 3000, "dev": true }"#).unwrap();
//! assert_eq!(config.port, 3000);
//! assert_eq!(config.timeout_ms, 5000);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Config {
    /// Sent as the `Server` header.
    pub name: String,

    pub host: String,

    pub port: u16,

    /// Max time to produce a response before a 408 is sent.
    pub timeout_ms: u64,

    /// Max request body size in bytes.
    pub payload_limit: usize,

    /// Drop body/query fields that no validator names.
    pub strip_unknown: bool,

    /// Add baseline security headers and require a `User-Agent`.
    pub protect: bool,

    /// Take the client address from `X-Forwarded-For`.
    pub trust_proxy: bool,

    /// Pretty JSON and 5xx messages in responses.
    pub dev: bool,

    /// Whether to send the `Server` header at all.
    pub server_header: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: "sluice".to_owned(),
            host: "localhost".to_owned(),
            port: 8000,
            timeout_ms: 5_000,
            payload_limit: 1_048_576,
            strip_unknown: true,
            protect: true,
            trust_proxy: false,
            dev: false,
            server_header: true,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn payload_limit(mut self, bytes: usize) -> Self {
        self.payload_limit = bytes;
        self
    }

    pub fn strip_unknown(mut self, on: bool) -> Self {
        self.strip_unknown = on;
        self
    }

    pub fn protect(mut self, on: bool) -> Self {
        self.protect = on;
        self
    }

    pub fn trust_proxy(mut self, on: bool) -> Self {
        self.trust_proxy = on;
        self
    }

    pub fn dev(mut self, on: bool) -> Self {
        self.dev = on;
        self
    }

    pub fn server_header(mut self, on: bool) -> Self {
        self.server_header = on;
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// `host:port`, as given to the listener.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The 408 message, e.g. `Max request time of 5s reached`.
    pub(crate) fn timeout_message(&self) -> String {
        let secs = self.timeout_ms as f64 / 1000.0;
        format!("Max request time of {secs}s reached")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = Config::default();
        assert_eq!(c.address(), "localhost:8000");
        assert_eq!(c.request_timeout(), Duration::from_secs(5));
        assert_eq!(c.payload_limit, 1_048_576);
        assert!(c.strip_unknown && c.protect && !c.dev && !c.trust_proxy);
    }

    #[test]
    fn timeout_message_formats_seconds() {
        assert_eq!(Config::new().timeout_message(), "Max request time of 5s reached");
        assert_eq!(
            Config::new().timeout(Duration::from_millis(1500)).timeout_message(),
            "Max request time of 1.5s reached"
        );
    }

    #[test]
    fn partial_documents_fill_defaults() {
        let c: Config = serde_json::from_str(r#"{ "name": "api", "protect": false }"#).unwrap();
        assert_eq!(c.name, "api");
        assert!(!c.protect);
        assert_eq!(c.port, 8000);
    }
}

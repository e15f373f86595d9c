//! Route URL compilation.
//!
//! A route URL is either a path template or a regular expression the caller
//! already compiled. Templates are split on `/`; a segment starting with `:`
//! becomes a parameter, everything else is matched literally:
//!
//! ```text
//! /hello/:name        →  ^/hello/([^/?]+)$      params = [name]
//! hello/:a/x/:b/      →  ^/hello/([^/?]+)/x/([^/?]+)$   params = [a, b]
//! /                   →  ^/$
//! ```
//!
//! A raw regex is used as-is. Its capture groups are exposed positionally as
//! `$1`, `$2`, ... in the extracted parameters.

use std::collections::HashMap;
use std::fmt;

use regex::Regex;
use serde_json::Value;

use crate::error::Error;

/// Matches one path segment: anything up to the next `/` or `?`.
const PARAM_CLASS: &str = "([^/?]+)";

/// The URL a route is registered under.
#[derive(Clone, Debug)]
pub enum UrlSpec {
    /// A template such as `/users/:id`.
    Path(String),
    /// A precompiled expression. The caller is responsible for anchoring it.
    Regex(Regex),
}

impl UrlSpec {
    /// The URL as the user wrote it, for error messages and logs.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Path(p) => p,
            Self::Regex(r) => r.as_str(),
        }
    }
}

impl fmt::Display for UrlSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for UrlSpec {
    fn from(s: &str) -> Self {
        Self::Path(s.to_owned())
    }
}

impl From<String> for UrlSpec {
    fn from(s: String) -> Self {
        Self::Path(s)
    }
}

impl From<Regex> for UrlSpec {
    fn from(r: Regex) -> Self {
        Self::Regex(r)
    }
}

/// URL specs read from a dynamic document (route discovery, config files).
/// Only strings are accepted; a regex cannot be spelled in JSON.
impl TryFrom<&Value> for UrlSpec {
    type Error = Error;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(s) => Ok(Self::Path(s.clone())),
            Value::Null => Err(Error::InvalidUrl("null")),
            Value::Bool(_) => Err(Error::InvalidUrl("a boolean")),
            Value::Number(_) => Err(Error::InvalidUrl("a number")),
            Value::Array(_) => Err(Error::InvalidUrl("an array")),
            Value::Object(_) => Err(Error::InvalidUrl("an object")),
        }
    }
}

/// A compiled route URL.
#[derive(Clone, Debug)]
pub struct RoutePattern {
    source: String,
    regex: Regex,
    params: Vec<String>,
}

impl RoutePattern {
    /// The URL as registered.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The compiled expression. Two routes are duplicates when this is equal.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Parameter names in capture-group order.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Matches `path` (query already stripped) and extracts its parameters.
    pub fn captures(&self, path: &str) -> Option<HashMap<String, String>> {
        let caps = self.regex.captures(path)?;
        let params = self
            .params
            .iter()
            .enumerate()
            .filter_map(|(i, name)| {
                caps.get(i + 1).map(|m| (name.clone(), m.as_str().to_owned()))
            })
            .collect();
        Some(params)
    }
}

/// Compiles a URL spec. Pure: the same spec always yields the same pattern.
pub fn compile(spec: &UrlSpec) -> Result<RoutePattern, Error> {
    match spec {
        UrlSpec::Regex(regex) => {
            let params = (1..regex.captures_len()).map(|i| format!("${i}")).collect();
            Ok(RoutePattern { source: regex.as_str().to_owned(), regex: regex.clone(), params })
        }
        UrlSpec::Path(path) => compile_path(path),
    }
}

fn compile_path(path: &str) -> Result<RoutePattern, Error> {
    let normalized = normalize(path);
    let mut expr = String::from("^");
    let mut params = Vec::new();

    for segment in normalized[1..].split('/') {
        expr.push('/');
        match segment.strip_prefix(':') {
            Some(rest) => {
                // one capture per segment; `:a:b` names the parameter `a`
                let name = rest.split(':').next().unwrap_or_default();
                if name.is_empty() {
                    return Err(Error::UnnamedParam(path.to_owned()));
                }
                params.push(name.to_owned());
                expr.push_str(PARAM_CLASS);
            }
            None => expr.push_str(&regex::escape(segment)),
        }
    }
    expr.push('$');

    Ok(RoutePattern { source: path.to_owned(), regex: Regex::new(&expr)?, params })
}

/// Exactly one leading slash, no trailing slash unless the path is `/`.
fn normalize(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() { "/".to_owned() } else { format!("/{trimmed}") }
}

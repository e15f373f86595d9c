//! HTTP method as a typed enum.
//!
//! Only the five verbs a route can be registered under, plus `OPTIONS`,
//! which sluice answers on its own from whatever else is registered.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// A routable HTTP method.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Method {
    Delete,
    Get,
    Options,
    Patch,
    Post,
    Put,
}

impl Method {
    /// Returns the uppercase wire representation (e.g. `"GET"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Delete  => "DELETE",
            Self::Get     => "GET",
            Self::Options => "OPTIONS",
            Self::Patch   => "PATCH",
            Self::Post    => "POST",
            Self::Put     => "PUT",
        }
    }

    /// Whether a route may be registered under this method.
    pub fn is_registrable(self) -> bool {
        self != Self::Options
    }

    pub(crate) fn from_http(method: &http::Method) -> Option<Self> {
        method.as_str().parse().ok()
    }
}

/// Parses a method name. Case-insensitive: `"get"`, `"Get"` and `"GET"` are
/// all [`Method::Get`].
impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DELETE"  => Ok(Self::Delete),
            "GET"     => Ok(Self::Get),
            "OPTIONS" => Ok(Self::Options),
            "PATCH"   => Ok(Self::Patch),
            "POST"    => Ok(Self::Post),
            "PUT"     => Ok(Self::Put),
            _         => Err(Error::InvalidMethod(s.to_owned())),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("get".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("PaTcH".parse::<Method>().unwrap(), Method::Patch);
        assert_eq!("options".parse::<Method>().unwrap(), Method::Options);
    }

    #[test]
    fn rejects_unsupported_verbs() {
        assert!(matches!("TRACE".parse::<Method>(), Err(Error::InvalidMethod(m)) if m == "TRACE"));
        assert!(!Method::Options.is_registrable());
        assert!(Method::Delete.is_registrable());
    }
}

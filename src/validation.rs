//! Declarative field validation.
//!
//! A [`Validator`] is a chain of checks built once at startup:
//!
//! ```rust
//! use sluice::Validator;
//!
//! let email = Validator::new().required().is_email().is_length(..=254);
//! let age = Validator::new().is_int(18..=130);
//! ```
//!
//! Every builder call consumes the validator and returns it with one more
//! check appended, so two validators never share a check list. Once built a
//! validator is immutable; running it is a pure function of
//! `(field, value, location)`.
//!
//! [`Rules`] groups validators by request section and is attached to a
//! route. Fields without a validator are never checked.

use std::borrow::Cow;
use std::fmt;
use std::net::IpAddr;
use std::ops::{Bound, RangeBounds};
use std::sync::Arc;

use base64::Engine as _;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::http_error::HttpError;
use crate::request::Request;

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)+$").unwrap()
});

static MAC_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[0-9A-Fa-f]{2}[:-]){5}[0-9A-Fa-f]{2}$").unwrap());

static CURRENCY_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\$?(?:0|[1-9]\d{0,2}(?:,\d{3})*|[1-9]\d*)(?:\.\d{1,2})?$").unwrap());

static MEDIA_TYPE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?i)[a-z]+/[a-z0-9.+-]+$").unwrap());

static PHONE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?[1-9]\d{6,14}$").unwrap());

static LABEL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?$").unwrap());

// ── Failures ──────────────────────────────────────────────────────────────────

/// The request section a field was read from.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Body,
    Query,
    Params,
    Headers,
}

impl Location {
    pub const ALL: [Location; 4] = [Self::Body, Self::Query, Self::Params, Self::Headers];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Body    => "body",
            Self::Query   => "query",
            Self::Params  => "params",
            Self::Headers => "headers",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One failed check on one field.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ValidationFailure {
    pub field: String,
    pub message: String,
    #[serde(rename = "where")]
    pub location: Location,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

// ── Validator ─────────────────────────────────────────────────────────────────

type Predicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

#[derive(Clone)]
struct Check {
    message: String,
    predicate: Predicate,
}

/// Which IP families [`Validator::is_ip`] accepts.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum IpVersion {
    #[default]
    Any,
    V4,
    V6,
}

/// A chain of checks for a single field.
#[derive(Clone, Default)]
pub struct Validator {
    checks: Vec<Check>,
    required: bool,
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("required", &self.required)
            .field("checks", &self.checks.iter().map(|c| &c.message).collect::<Vec<_>>())
            .finish()
    }
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the chain against one field.
    ///
    /// A missing value (absent, `null` or `""`) fails only when the field is
    /// required, and then with exactly one failure. A present value runs
    /// every check; each failing check contributes one failure.
    pub fn run(&self, field: &str, value: Option<&Value>, location: Location) -> Vec<ValidationFailure> {
        let Some(value) = value.filter(|v| !is_empty(v)) else {
            if self.required {
                return vec![ValidationFailure {
                    field: field.to_owned(),
                    message: "cannot be empty".to_owned(),
                    location,
                    value: None,
                }];
            }
            return Vec::new();
        };

        let text = as_text(value);
        self.checks
            .iter()
            .filter(|check| !(check.predicate)(&text))
            .map(|check| ValidationFailure {
                field: field.to_owned(),
                message: check.message.clone(),
                location,
                value: Some(value.clone()),
            })
            .collect()
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Appends a custom check. `message` is reported when `predicate`
    /// returns `false` for the field's textual value.
    pub fn check<F>(mut self, message: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.checks.push(Check { message: message.into(), predicate: Arc::new(predicate) });
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn contains(self, seed: impl Into<String>) -> Self {
        let seed = seed.into();
        self.check(format!("must contain '{seed}'"), move |v| v.contains(seed.as_str()))
    }

    pub fn equals(self, compare: impl Into<String>) -> Self {
        let compare = compare.into();
        self.check(format!("must be equal to '{compare}'"), move |v| v == compare)
    }

    pub fn is_after(self, date: DateTime<Utc>) -> Self {
        let shown = date.to_rfc3339_opts(SecondsFormat::Millis, true);
        self.check(format!("must be after {shown}"), move |v| parse_date(v).is_some_and(|d| d > date))
    }

    pub fn is_before(self, date: DateTime<Utc>) -> Self {
        let shown = date.to_rfc3339_opts(SecondsFormat::Millis, true);
        self.check(format!("must be before {shown}"), move |v| parse_date(v).is_some_and(|d| d < date))
    }

    pub fn is_alpha(self) -> Self {
        self.check("must contain only letters", |v| v.chars().all(char::is_alphabetic))
    }

    pub fn is_alphanumeric(self) -> Self {
        self.check("must contain only letters and numbers", |v| v.chars().all(char::is_alphanumeric))
    }

    pub fn is_ascii(self) -> Self {
        self.check("must be valid ASCII characters", |v| v.is_ascii())
    }

    pub fn is_base64(self) -> Self {
        self.check("must be a valid base64 string", |v| {
            base64::engine::general_purpose::STANDARD.decode(v).is_ok()
        })
    }

    pub fn is_boolean(self) -> Self {
        self.check("must be a boolean", |v| matches!(v, "true" | "false" | "1" | "0"))
    }

    /// A dollar-style amount: optional sign and `$`, optional `,` thousands
    /// grouping, up to two decimals. `-$1,234.50`, `12`, `0.5`.
    pub fn is_currency(self) -> Self {
        self.check("must be a valid currency", |v| CURRENCY_REGEX.is_match(v))
    }

    /// `data:[<media type>][;key=value]*[;base64],<data>`
    pub fn is_data_uri(self) -> Self {
        self.check("must be a valid data URI", is_data_uri)
    }

    pub fn is_date(self) -> Self {
        self.check("must be a valid date", |v| parse_date(v).is_some())
    }

    pub fn is_divisible_by(self, divisor: i64) -> Self {
        self.check(format!("must be divisible by {divisor}"), move |v| {
            divisor != 0 && v.parse::<i64>().is_ok_and(|n| n % divisor == 0)
        })
    }

    pub fn is_email(self) -> Self {
        self.check("must be a valid email address", |v| EMAIL_REGEX.is_match(v))
    }

    /// Membership in a fixed set of values, compared textually.
    pub fn is_enum<I, S>(self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        let shown = serde_json::to_string(&values).unwrap_or_default();
        self.check(format!("must be one of {shown}"), move |v| values.iter().any(|x| x == v))
    }

    pub fn is_fqdn(self) -> Self {
        self.check("must be a fully qualified domain name", is_fqdn)
    }

    pub fn is_ip(self, version: IpVersion) -> Self {
        self.check("must be a valid IP address", move |v| match (v.parse::<IpAddr>(), version) {
            (Ok(_), IpVersion::Any) => true,
            (Ok(ip), IpVersion::V4) => ip.is_ipv4(),
            (Ok(ip), IpVersion::V6) => ip.is_ipv6(),
            (Err(_), _) => false,
        })
    }

    /// An integer within `range`, e.g. `is_int(..)`, `is_int(1..=10)`, `is_int(18..)`.
    pub fn is_int(self, range: impl RangeBounds<i64>) -> Self {
        let (min, max) = inclusive_bounds(&range);
        let message = format!("must be an integer{}", humanize_limit(min, max));
        self.check(message, move |v| {
            v.parse::<i64>()
                .is_ok_and(|n| min.is_none_or(|m| n >= m) && max.is_none_or(|m| n <= m))
        })
    }

    pub fn is_json(self) -> Self {
        self.check("must be valid JSON", |v| serde_json::from_str::<Value>(v).is_ok())
    }

    /// Byte length within `range`.
    pub fn is_length(self, range: impl RangeBounds<usize>) -> Self {
        let (min, max) = inclusive_bounds(&map_bounds(&range));
        let message = format!("must have a byte length{}", humanize_limit(min, max));
        self.check(message, move |v| {
            let len = i64::try_from(v.len()).unwrap_or(i64::MAX);
            min.is_none_or(|m| len >= m) && max.is_none_or(|m| len <= m)
        })
    }

    pub fn is_lowercase(self) -> Self {
        self.check("must be all lowercase letters", |v| v == v.to_lowercase())
    }

    pub fn is_uppercase(self) -> Self {
        self.check("must be all uppercase letters", |v| v == v.to_uppercase())
    }

    pub fn is_mac_address(self) -> Self {
        self.check("must be a valid MAC address", |v| MAC_REGEX.is_match(v))
    }

    pub fn is_mongo_id(self) -> Self {
        self.check("must be a valid mongo ID", |v| {
            v.len() == 24 && v.bytes().all(|b| b.is_ascii_hexdigit())
        })
    }

    /// An international number, 7 to 15 digits with an optional leading `+`.
    /// Spaces, dots, dashes and parentheses are ignored.
    pub fn is_phone_number(self) -> Self {
        self.check("must be a valid phone number", |v| {
            let digits: String = v.chars().filter(|c| !matches!(c, ' ' | '.' | '-' | '(' | ')')).collect();
            PHONE_REGEX.is_match(&digits)
        })
    }

    /// An absolute `http`, `https` or `ftp` URL with a host.
    pub fn is_url(self) -> Self {
        self.check("must be a valid URL", |v| {
            url::Url::parse(v).is_ok_and(|u| {
                matches!(u.scheme(), "http" | "https" | "ftp") && u.host_str().is_some()
            })
        })
    }

    /// A hyphenated UUID.
    pub fn is_uuid(self) -> Self {
        self.check("must be a valid UUID", |v| v.len() == 36 && uuid::Uuid::parse_str(v).is_ok())
    }

    /// Every character appears in `chars`.
    pub fn is_whitelisted(self, chars: impl Into<String>) -> Self {
        let chars = chars.into();
        self.check(format!("must only contain characters from '{chars}'"), move |v| {
            v.chars().all(|c| chars.contains(c))
        })
    }

    pub fn matches(self, pattern: Regex) -> Self {
        self.check(format!("must match /{}/", pattern.as_str()), move |v| pattern.is_match(v))
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Checks run over text; non-string values are checked through their JSON
/// rendering (`42`, `true`, `[1,2]`).
fn as_text(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s),
        other => Cow::Owned(other.to_string()),
    }
}

fn parse_date(v: &str) -> Option<DateTime<Utc>> {
    if let Ok(d) = DateTime::parse_from_rfc3339(v) {
        return Some(d.with_timezone(&Utc));
    }
    if let Ok(d) = NaiveDateTime::parse_from_str(v, "%Y-%m-%dT%H:%M:%S") {
        return Some(d.and_utc());
    }
    NaiveDate::parse_from_str(v, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
}

fn is_data_uri(v: &str) -> bool {
    let Some((header, data)) = v.strip_prefix("data:").and_then(|rest| rest.split_once(',')) else {
        return false;
    };
    let mut parts: Vec<&str> = header.split(';').collect();
    let base64 = parts.len() > 1 && parts.last().is_some_and(|p| p.eq_ignore_ascii_case("base64"));
    if base64 {
        parts.pop();
    }
    let media_type = parts.remove(0);
    if !media_type.is_empty() && !MEDIA_TYPE_REGEX.is_match(media_type) {
        return false;
    }
    if !parts.iter().all(|p| p.split_once('=').is_some_and(|(k, val)| !k.is_empty() && !val.is_empty())) {
        return false;
    }
    !base64 || base64::engine::general_purpose::STANDARD.decode(data).is_ok()
}

fn is_fqdn(v: &str) -> bool {
    let v = v.strip_suffix('.').unwrap_or(v);
    let labels: Vec<&str> = v.split('.').collect();
    let Some(tld) = labels.last() else { return false };
    labels.len() >= 2
        && v.len() <= 253
        && labels.iter().all(|l| LABEL_REGEX.is_match(l))
        && tld.len() >= 2
        && tld.chars().all(|c| c.is_ascii_alphabetic())
}

/// Lengths past `i64::MAX` saturate; no string is that long.
fn map_bounds(range: &impl RangeBounds<usize>) -> (Bound<i64>, Bound<i64>) {
    let clamp = |n: &usize| i64::try_from(*n).unwrap_or(i64::MAX);
    let map = |b: Bound<&usize>| match b {
        Bound::Included(n) => Bound::Included(clamp(n)),
        Bound::Excluded(n) => Bound::Excluded(clamp(n)),
        Bound::Unbounded => Bound::Unbounded,
    };
    (map(range.start_bound()), map(range.end_bound()))
}

fn inclusive_bounds(range: &impl RangeBounds<i64>) -> (Option<i64>, Option<i64>) {
    let min = match range.start_bound() {
        Bound::Included(n) => Some(*n),
        Bound::Excluded(n) => Some(n.saturating_add(1)),
        Bound::Unbounded => None,
    };
    let max = match range.end_bound() {
        Bound::Included(n) => Some(*n),
        Bound::Excluded(n) => Some(n.saturating_sub(1)),
        Bound::Unbounded => None,
    };
    (min, max)
}

/// `" between 1 and 10"`, `" of at least 1"`, `" of at most 10"` or `""`.
fn humanize_limit(min: Option<i64>, max: Option<i64>) -> String {
    match (min, max) {
        (Some(a), Some(b)) => format!(" between {a} and {b}"),
        (Some(a), None) => format!(" of at least {a}"),
        (None, Some(b)) => format!(" of at most {b}"),
        (None, None) => String::new(),
    }
}

// ── Rules ─────────────────────────────────────────────────────────────────────

/// Validators for one route, grouped by request section.
///
/// ```rust
/// use sluice::{Rules, Validator};
///
/// let rules = Rules::new()
///     .body("email", Validator::new().required().is_email())
///     .query("page", Validator::new().is_int(1..))
///     .params("id", Validator::new().is_uuid())
///     .headers("x-api-key", Validator::new().required());
/// ```
#[derive(Clone, Debug, Default)]
pub struct Rules {
    body: Vec<(String, Validator)>,
    query: Vec<(String, Validator)>,
    params: Vec<(String, Validator)>,
    headers: Vec<(String, Validator)>,
}

impl Rules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn body(mut self, field: impl Into<String>, validator: Validator) -> Self {
        self.body.push((field.into(), validator));
        self
    }

    pub fn query(mut self, field: impl Into<String>, validator: Validator) -> Self {
        self.query.push((field.into(), validator));
        self
    }

    pub fn params(mut self, field: impl Into<String>, validator: Validator) -> Self {
        self.params.push((field.into(), validator));
        self
    }

    /// Header names are matched case-insensitively.
    pub fn headers(mut self, field: impl Into<String>, validator: Validator) -> Self {
        self.headers.push((field.into().to_ascii_lowercase(), validator));
        self
    }

    /// The validators configured for `location`, in registration order.
    pub fn section(&self, location: Location) -> &[(String, Validator)] {
        match location {
            Location::Body    => &self.body,
            Location::Query   => &self.query,
            Location::Params  => &self.params,
            Location::Headers => &self.headers,
        }
    }

    pub fn is_empty(&self) -> bool {
        Location::ALL.iter().all(|l| self.section(*l).is_empty())
    }

    pub(crate) fn names(&self, location: Location) -> impl Iterator<Item = &str> {
        self.section(location).iter().map(|(name, _)| name.as_str())
    }

    /// Validates every configured field of every section and collects all
    /// failures, in body, query, params, headers order.
    pub fn run(&self, req: &Request) -> Vec<ValidationFailure> {
        let mut failures = Vec::new();
        for location in Location::ALL {
            for (field, validator) in self.section(location) {
                let value = req.field(location, field);
                failures.extend(validator.run(field, value.as_ref(), location));
            }
        }
        failures
    }

    /// Like [`run`](Rules::run), folding any failures into one 400.
    pub fn check(&self, req: &Request) -> Result<(), HttpError> {
        let failures = self.run(req);
        if failures.is_empty() {
            return Ok(());
        }
        Err(HttpError::bad_request("A validation error occurred").with_validation(failures))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn failures(v: &Validator, value: Value) -> Vec<String> {
        v.run("f", Some(&value), Location::Body).into_iter().map(|f| f.message).collect()
    }

    #[test]
    fn absent_and_optional_passes() {
        let v = Validator::new().is_email();
        assert!(v.run("email", None, Location::Body).is_empty());
        assert!(v.run("email", Some(&Value::Null), Location::Body).is_empty());
        assert!(v.run("email", Some(&json!("")), Location::Body).is_empty());
    }

    #[test]
    fn absent_and_required_fails_once() {
        let v = Validator::new().required().is_email().is_length(5..);
        let out = v.run("email", None, Location::Query);
        assert_eq!(
            out,
            vec![ValidationFailure {
                field: "email".into(),
                message: "cannot be empty".into(),
                location: Location::Query,
                value: None,
            }]
        );
    }

    #[test]
    fn present_value_runs_every_check() {
        let v = Validator::new().is_email().is_length(..=3).contains("@");
        let out = v.run("email", Some(&json!("nope")), Location::Body);
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|f| f.value == Some(json!("nope"))));
    }

    #[test]
    fn running_twice_is_idempotent() {
        let v = Validator::new().is_int(1..=10).is_divisible_by(3);
        let value = json!("11");
        assert_eq!(
            v.run("n", Some(&value), Location::Query),
            v.run("n", Some(&value), Location::Query)
        );
    }

    #[test]
    fn builders_do_not_share_checks() {
        let base = Validator::new().required();
        let a = base.clone().is_email();
        let b = base.is_int(..);
        assert_eq!(failures(&a, json!("x")), ["must be a valid email address"]);
        assert_eq!(failures(&b, json!("x")), ["must be an integer"]);
    }

    #[test]
    fn int_messages_and_bounds() {
        assert_eq!(failures(&Validator::new().is_int(1..=10), json!(11)), ["must be an integer between 1 and 10"]);
        assert_eq!(failures(&Validator::new().is_int(18..), json!("17")), ["must be an integer of at least 18"]);
        assert_eq!(failures(&Validator::new().is_int(..10), json!(10)), ["must be an integer of at most 9"]);
        assert!(failures(&Validator::new().is_int(1..=10), json!(10)).is_empty());
        assert!(!failures(&Validator::new().is_int(..), json!("4.5")).is_empty());
    }

    #[test]
    fn length_counts_bytes() {
        let v = Validator::new().is_length(..=4);
        assert!(failures(&v, json!("abcd")).is_empty());
        assert_eq!(failures(&v, json!("ééé")), ["must have a byte length of at most 4"]);
    }

    #[test]
    fn currency_data_uri_and_phone() {
        let v = Validator::new().is_currency();
        for ok in ["12", "-$1,234.50", "$0.5", "1000000"] {
            assert!(failures(&v, json!(ok)).is_empty(), "{ok}");
        }
        for bad in ["1,23", "$", "12.345", "01"] {
            assert_eq!(failures(&v, json!(bad)), ["must be a valid currency"], "{bad}");
        }

        let v = Validator::new().is_data_uri();
        for ok in ["data:,hello", "data:text/plain;charset=utf-8,hi", "data:image/png;base64,aGk="] {
            assert!(failures(&v, json!(ok)).is_empty(), "{ok}");
        }
        for bad in ["data:text/plain", "data:image/png;base64,%%%", "http://x", "data:nonsense;x,1"] {
            assert_eq!(failures(&v, json!(bad)), ["must be a valid data URI"], "{bad}");
        }

        let v = Validator::new().is_phone_number();
        assert!(failures(&v, json!("+1 (555) 010-9999")).is_empty());
        assert_eq!(failures(&v, json!("020 7946 0958")), ["must be a valid phone number"]);
        assert_eq!(failures(&v, json!("12345")), ["must be a valid phone number"]);
    }

    #[test]
    fn huge_length_bounds_do_not_wrap() {
        assert!(failures(&Validator::new().is_length(..=usize::MAX), json!("abc")).is_empty());
        assert!(failures(&Validator::new().is_length(2..usize::MAX), json!("abc")).is_empty());
        assert_eq!(
            failures(&Validator::new().is_length(usize::MAX..), json!("abc")),
            [format!("must have a byte length of at least {}", i64::MAX)]
        );
    }

    #[test]
    fn format_checks() {
        let ok = |v: Validator, s: &str| failures(&v, json!(s)).is_empty();

        assert!(ok(Validator::new().is_email(), "a.b@example.com"));
        assert!(!ok(Validator::new().is_email(), "not-an-email"));
        assert!(ok(Validator::new().is_url(), "https://example.com/x?y=1"));
        assert!(!ok(Validator::new().is_url(), "example.com"));
        assert!(ok(Validator::new().is_uuid(), "67e55044-10b1-426f-9247-bb680e5fe0c8"));
        assert!(!ok(Validator::new().is_uuid(), "67e5504410b1426f9247bb680e5fe0c8"));
        assert!(ok(Validator::new().is_ip(IpVersion::Any), "::1"));
        assert!(!ok(Validator::new().is_ip(IpVersion::V4), "::1"));
        assert!(ok(Validator::new().is_ip(IpVersion::V4), "10.0.0.1"));
        assert!(ok(Validator::new().is_date(), "2024-02-29"));
        assert!(ok(Validator::new().is_date(), "2024-02-29T10:00:00Z"));
        assert!(!ok(Validator::new().is_date(), "2023-02-29"));
        assert!(ok(Validator::new().is_fqdn(), "api.example.com"));
        assert!(!ok(Validator::new().is_fqdn(), "localhost"));
        assert!(ok(Validator::new().is_mac_address(), "00:1B:44:11:3A:B7"));
        assert!(ok(Validator::new().is_mongo_id(), "507f1f77bcf86cd799439011"));
        assert!(ok(Validator::new().is_base64(), "aGVsbG8="));
        assert!(!ok(Validator::new().is_base64(), "a$b"));
        assert!(ok(Validator::new().is_json(), r#"{"a":1}"#));
        assert!(ok(Validator::new().is_boolean(), "false"));
        assert!(!ok(Validator::new().is_boolean(), "yes"));
        assert!(ok(Validator::new().is_whitelisted("abc"), "cab"));
        assert!(!ok(Validator::new().is_whitelisted("abc"), "cabd"));
        assert!(ok(Validator::new().matches(Regex::new("^a+$").unwrap()), "aaa"));
        assert!(ok(Validator::new().is_alpha(), "héllo"));
        assert!(!ok(Validator::new().is_alphanumeric(), "a-1"));
        assert!(ok(Validator::new().is_lowercase(), "abc1"));
        assert!(!ok(Validator::new().is_uppercase(), "ABc"));
    }

    #[test]
    fn non_string_values_are_checked_as_text() {
        assert!(failures(&Validator::new().is_boolean(), json!(true)).is_empty());
        assert!(failures(&Validator::new().is_int(..), json!(42)).is_empty());
        assert!(failures(&Validator::new().is_enum(["1", "2"]), json!(2)).is_empty());
        assert_eq!(failures(&Validator::new().is_enum(["a", "b"]), json!("c")), [r#"must be one of ["a","b"]"#]);
    }

    #[test]
    fn date_ordering() {
        let pivot = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let after = Validator::new().is_after(pivot);
        assert!(failures(&after, json!("2021-06-01")).is_empty());
        assert_eq!(failures(&after, json!("2019-06-01")), ["must be after 2020-01-01T00:00:00.000Z"]);
        assert!(failures(&Validator::new().is_before(pivot), json!("2019-06-01")).is_empty());
    }

    #[test]
    fn failures_serialize_with_location_tag() {
        let out = Validator::new().required().run("name", None, Location::Params);
        assert_eq!(
            serde_json::to_value(&out).unwrap(),
            json!([{ "field": "name", "message": "cannot be empty", "where": "params" }])
        );
    }
}

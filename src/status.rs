//! HTTP status codes and their canonical reason phrases.
//!
//! The catalog is the backbone of the error taxonomy: every [`HttpError`]
//! takes its `error` string from here, so a 404 always reads `"Not Found"`
//! no matter which stage of the pipeline produced it.
//!
//! ```rust
//! use sluice::Status;
//!
//! assert_eq!(Status::NotFound.code(), 404);
//! assert_eq!(Status::NotFound.reason(), "Not Found");
//! assert_eq!(sluice::status::reason_phrase(418), Some("I'm a Teapot"));
//! assert_eq!(Status::from_code(299), None);
//! ```
//!
//! [`HttpError`]: crate::HttpError

macro_rules! catalog {
    ($( $(#[$attr:meta])* $variant:ident = $code:literal, $reason:literal; )+) => {
        /// A status code with a known reason phrase.
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        #[allow(clippy::enum_variant_names)]
        pub enum Status {
            $( $(#[$attr])* $variant, )+
        }

        impl Status {
            /// Numeric status code.
            pub const fn code(self) -> u16 {
                match self {
                    $( Self::$variant => $code, )+
                }
            }

            /// Canonical reason phrase, e.g. `"Unsupported Media Type"`.
            pub const fn reason(self) -> &'static str {
                match self {
                    $( Self::$variant => $reason, )+
                }
            }

            /// Looks a numeric code up in the catalog.
            pub const fn from_code(code: u16) -> Option<Self> {
                match code {
                    $( $code => Some(Self::$variant), )+
                    _ => None,
                }
            }
        }
    };
}

catalog! {
    Continue                      = 100, "Continue";
    SwitchingProtocols            = 101, "Switching Protocols";
    Processing                    = 102, "Processing";
    EarlyHints                    = 103, "Early Hints";

    Ok                            = 200, "OK";
    Created                       = 201, "Created";
    Accepted                      = 202, "Accepted";
    NonAuthoritativeInformation   = 203, "Non-Authoritative Information";
    NoContent                     = 204, "No Content";
    ResetContent                  = 205, "Reset Content";
    PartialContent                = 206, "Partial Content";
    MultiStatus                   = 207, "Multi-Status";
    AlreadyReported               = 208, "Already Reported";
    ImUsed                        = 226, "IM Used";

    MultipleChoices               = 300, "Multiple Choices";
    MovedPermanently              = 301, "Moved Permanently";
    Found                         = 302, "Found";
    SeeOther                      = 303, "See Other";
    NotModified                   = 304, "Not Modified";
    UseProxy                      = 305, "Use Proxy";
    TemporaryRedirect             = 307, "Temporary Redirect";
    PermanentRedirect             = 308, "Permanent Redirect";

    BadRequest                    = 400, "Bad Request";
    Unauthorized                  = 401, "Unauthorized";
    PaymentRequired               = 402, "Payment Required";
    Forbidden                     = 403, "Forbidden";
    NotFound                      = 404, "Not Found";
    MethodNotAllowed              = 405, "Method Not Allowed";
    NotAcceptable                 = 406, "Not Acceptable";
    ProxyAuthenticationRequired   = 407, "Proxy Authentication Required";
    RequestTimeout                = 408, "Request Timeout";
    Conflict                      = 409, "Conflict";
    Gone                          = 410, "Gone";
    LengthRequired                = 411, "Length Required";
    PreconditionFailed            = 412, "Precondition Failed";
    PayloadTooLarge               = 413, "Payload Too Large";
    UriTooLong                    = 414, "URI Too Long";
    UnsupportedMediaType          = 415, "Unsupported Media Type";
    RangeNotSatisfiable           = 416, "Range Not Satisfiable";
    ExpectationFailed             = 417, "Expectation Failed";
    ImATeapot                     = 418, "I'm a Teapot";
    MisdirectedRequest            = 421, "Misdirected Request";
    UnprocessableEntity           = 422, "Unprocessable Entity";
    Locked                        = 423, "Locked";
    FailedDependency              = 424, "Failed Dependency";
    TooEarly                      = 425, "Too Early";
    UpgradeRequired               = 426, "Upgrade Required";
    PreconditionRequired          = 428, "Precondition Required";
    TooManyRequests               = 429, "Too Many Requests";
    RequestHeaderFieldsTooLarge   = 431, "Request Header Fields Too Large";
    UnavailableForLegalReasons    = 451, "Unavailable For Legal Reasons";

    InternalServerError           = 500, "Internal Server Error";
    NotImplemented                = 501, "Not Implemented";
    BadGateway                    = 502, "Bad Gateway";
    ServiceUnavailable            = 503, "Service Unavailable";
    GatewayTimeout                = 504, "Gateway Timeout";
    HttpVersionNotSupported       = 505, "HTTP Version Not Supported";
    VariantAlsoNegotiates         = 506, "Variant Also Negotiates";
    InsufficientStorage           = 507, "Insufficient Storage";
    LoopDetected                  = 508, "Loop Detected";
    BandwidthLimitExceeded        = 509, "Bandwidth Limit Exceeded";
    NotExtended                   = 510, "Not Extended";
    NetworkAuthenticationRequired = 511, "Network Authentication Required";
}

/// Reason phrase for an arbitrary numeric code, if the catalog knows it.
pub fn reason_phrase(code: u16) -> Option<&'static str> {
    Status::from_code(code).map(Status::reason)
}

impl From<Status> for u16 {
    fn from(s: Status) -> u16 {
        s.code()
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.code(), self.reason())
    }
}

//! # sluice
//!
//! A minimal HTTP server toolkit: pattern routing, declarative input
//! validation, one error shape, and a fixed request lifecycle.
//!
//! ## What a request goes through
//!
//! - **Routing**: `/users/:id` patterns or raw regular expressions, matched
//!   in registration order. `OPTIONS` is answered from the table.
//! - **Parsing**: JSON, url-encoded forms and plain text bodies, bounded by
//!   a payload limit.
//! - **Validation**: per-field [`Validator`] chains over body, query, params
//!   and headers. Unknown body/query fields are stripped first.
//! - **Errors**: anything a handler returns, throws or panics with becomes
//!   `{ "statusCode", "error", "message"?, "validation"? }`. 5xx messages
//!   stay in the log unless `dev` is on.
//! - **Timeouts**: a request that runs too long gets a 408 and its connection
//!   closed.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use serde_json::json;
//! use sluice::{App, Config, HttpError, Request, Route, Router, Rules, Server, Status, Validator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), sluice::Error> {
//!     let router = Router::new()
//!         .get("/users/:id", get_user)
//!         .route(
//!             Route::post("/users", create_user)
//!                 .status(Status::Created)
//!                 .validate(Rules::new().body("name", Validator::new().required().is_length(1..=64))),
//!         );
//!
//!     let config = Config::new().port(3000);
//!     Server::from_config(&config)?.serve(App::new(router, config)).await
//! }
//!
//! async fn get_user(req: Request) -> Result<serde_json::Value, HttpError> {
//!     match req.param("id") {
//!         Some("1") => Ok(json!({ "id": 1, "name": "ada" })),
//!         _ => Err(HttpError::not_found()),
//!     }
//! }
//!
//! async fn create_user(req: Request) -> serde_json::Value {
//!     json!({ "name": req.body()["name"] })
//! }
//! ```

mod config;
mod error;
mod handler;
mod http_error;
mod inject;
mod lifecycle;
mod method;
mod pattern;
mod request;
mod response;
mod router;
mod server;
mod validation;

pub mod status;

pub use config::Config;
pub use error::Error;
pub use handler::{ErrorHook, Handler};
pub use http_error::{Fault, FaultKind, HttpError, clean_backtrace};
pub use inject::{Inject, Injected};
pub use lifecycle::App;
pub use method::Method;
pub use pattern::{RoutePattern, UrlSpec, compile};
pub use request::{Redirect, Request, ResponseHelpers};
pub use response::{Body, ByteStream, IntoOutcome, Json, Outcome, Payload, Reply, send};
pub use router::{Entry, Route, RouteMatch, RouteSet, Router};
pub use server::Server;
pub use status::Status;
pub use validation::{IpVersion, Location, Rules, ValidationFailure, Validator};

//! Handler traits and type erasure.
//!
//! # How async handlers are stored
//!
//! A route table holds handlers of many different types, so each one is
//! wrapped in a small struct and stored behind a trait object:
//!
//! ```text
//! async fn hello(req: Request) -> impl IntoOutcome  ← user writes this
//!        ↓ Route::get("/", hello)
//! hello.into_boxed_handler()                        ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(hello))                        ← stored as BoxedHandler
//!        ↓
//! handler.call(req)  at request time                ← one vtable dispatch
//!        ↓
//! Box::pin(async { hello(req).await.into_outcome() })
//! ```
//!
//! Error hooks go through the same machinery with a [`Fault`] argument
//! instead of a [`Request`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::http_error::Fault;
use crate::request::Request;
use crate::response::{IntoOutcome, Outcome};

/// A heap-allocated, type-erased future resolving to an [`Outcome`].
pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = Outcome> + Send + 'static>>;

#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture;
}

#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

#[doc(hidden)]
pub trait ErasedErrorHook {
    fn call(&self, fault: Fault) -> BoxFuture;
}

#[doc(hidden)]
pub type BoxedErrorHook = Arc<dyn ErasedErrorHook + Send + Sync + 'static>;

// ── Public traits ─────────────────────────────────────────────────────────────

/// Implemented for every valid route handler and pre-handler.
///
/// Satisfied automatically by any function of the shape
///
/// ```text
/// async fn name(req: Request) -> impl IntoOutcome
/// ```
///
/// Sealed: only the blanket impl below can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

/// Implemented for route error hooks:
///
/// ```text
/// async fn name(fault: Fault) -> impl IntoOutcome
/// ```
///
/// Whatever the hook returns is sent as-is; its status defaults to 500.
pub trait ErrorHook: private::SealedHook + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_hook(self) -> BoxedErrorHook;
}

mod private {
    pub trait Sealed {}
    pub trait SealedHook {}
}

// ── Blanket implementations ───────────────────────────────────────────────────

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutcome + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutcome + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

impl<F, Fut, R> private::SealedHook for F
where
    F: Fn(Fault) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutcome + Send + 'static,
{
}

impl<F, Fut, R> ErrorHook for F
where
    F: Fn(Fault) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutcome + Send + 'static,
{
    fn into_boxed_hook(self) -> BoxedErrorHook {
        Arc::new(FnHandler(self))
    }
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutcome + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_outcome() })
    }
}

impl<F, Fut, R> ErasedErrorHook for FnHandler<F>
where
    F: Fn(Fault) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutcome + Send + 'static,
{
    fn call(&self, fault: Fault) -> BoxFuture {
        let fut = (self.0)(fault);
        Box::pin(async move { fut.await.into_outcome() })
    }
}

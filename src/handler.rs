//! Route handlers and the invoker that calls them.
//!
//! # Handler shapes
//!
//! A route handler takes zero, one or two inputs and produces a
//! `(status, payload)` pair. The inputs it may declare form a closed set:
//!
//! | Shape | Signature | Body decoded |
//! |---|---|---|
//! | [`HandlerShape::NoArgs`] | `async fn() -> (u16, P)` | no |
//! | [`HandlerShape::Params`] | `async fn(Params) -> (u16, P)` | no |
//! | [`HandlerShape::Body`] | `async fn(Json<T>) -> (u16, P)` | yes |
//! | [`HandlerShape::ParamsAndBody`] | `async fn(Params, Json<T>) -> (u16, P)` | yes |
//!
//! The shape is fixed when the function is wrapped into a [`Handler`], either
//! explicitly through the constructors or implicitly through [`IntoHandler`]
//! when registering a route. A handler with three inputs, or one returning
//! anything other than a two-element reply, does not type-check.
//!
//! A body-only handler does not see the parameter set. That is the long-standing
//! contract of this shape; declare `(Params, Json<T>)` to get both.
//!
//! # Type erasure
//!
//! The shape's function is stored behind an `Arc<dyn Fn>` so that handlers of
//! different concrete types live in one route table:
//!
//! ```text
//! async fn create(p: Params, Json(user): Json<User>) -> (u16, User)   ← user writes this
//!        ↓ api.post("/users", create)
//! create.into_handler()                          ← IntoHandler blanket impl
//!        ↓
//! Handler { call: Call::ParamsAndBody(Arc<…>) }  ← decode + call, type-erased
//!        ↓ invoke(Some(&handler), params, body)  at request time
//! Reply { status, payload: Box<dyn JsonPayload> }
//! ```

use std::any::type_name;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use http::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::params::Params;

/// A heap-allocated, type-erased future.
///
/// `Send + 'static` let tokio move the future across threads safely.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

// ── Replies ───────────────────────────────────────────────────────────────────

/// A payload that can be written as JSON.
///
/// Implemented for every `Serialize + Send` type; it exists so that replies of
/// different payload types can be boxed uniformly.
pub trait JsonPayload: Send {
    fn to_json(&self) -> serde_json::Result<Vec<u8>>;
}

impl<T: Serialize + Send> JsonPayload for T {
    fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// The `(status, payload)` outcome of one handler invocation.
pub struct Reply {
    pub status: u16,
    pub payload: Box<dyn JsonPayload>,
}

impl Reply {
    pub fn new(status: u16, payload: impl Serialize + Send + 'static) -> Self {
        Self { status, payload: Box::new(payload) }
    }

    /// `(501, null)`, the answer to every handler contract violation.
    pub fn not_implemented() -> Self {
        Self::new(StatusCode::NOT_IMPLEMENTED.as_u16(), ())
    }

    /// `(status, {"error": "<err>"})`.
    pub fn error(status: u16, err: impl fmt::Display) -> Self {
        Self::new(status, ErrorBody::new(err))
    }
}

/// The `{"error": "<message>"}` payload handlers return on failure.
///
/// ```rust
/// use wicket::ErrorBody;
///
/// async fn find(id: &str) -> (u16, Result<String, ErrorBody>) {
///     match id.parse::<u32>() {
///         Ok(n) => (200, Ok(n.to_string())),
///         Err(e) => (400, Err(ErrorBody::new(e))),
///     }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(err: impl fmt::Display) -> Self {
        Self { error: err.to_string() }
    }
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reply").field("status", &self.status).finish_non_exhaustive()
    }
}

/// Conversion of a handler's return value into a [`Reply`].
pub trait IntoReply {
    fn into_reply(self) -> Reply;
}

impl IntoReply for Reply {
    fn into_reply(self) -> Reply { self }
}

impl<P: Serialize + Send + 'static> IntoReply for (u16, P) {
    fn into_reply(self) -> Reply { Reply::new(self.0, self.1) }
}

impl<P: Serialize + Send + 'static> IntoReply for (StatusCode, P) {
    fn into_reply(self) -> Reply { Reply::new(self.0.as_u16(), self.1) }
}

// ── Body extractor ────────────────────────────────────────────────────────────

/// Marks a handler input as the JSON-decoded request body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> std::ops::Deref for Json<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

/// Decodes every JSON value in `body` into `T`, keeping the last one.
///
/// An empty body, or one holding only whitespace, yields `T::default()`.
/// A `null` value leaves the value decoded so far in place.
pub(crate) fn decode_body<T: DeserializeOwned + Default>(body: &[u8]) -> serde_json::Result<T> {
    let mut value = T::default();
    for decoded in serde_json::Deserializer::from_slice(body).into_iter::<Option<T>>() {
        if let Some(decoded) = decoded? {
            value = decoded;
        }
    }
    Ok(value)
}

// ── Handler ───────────────────────────────────────────────────────────────────

/// The declared input shape of a [`Handler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerShape {
    NoArgs,
    Params,
    Body,
    ParamsAndBody,
}

type BodyCall<A> = dyn Fn(A, &[u8]) -> serde_json::Result<BoxFuture<Reply>> + Send + Sync;

#[derive(Clone)]
enum Call {
    NoArgs(Arc<dyn Fn() -> BoxFuture<Reply> + Send + Sync>),
    Params(Arc<dyn Fn(Params) -> BoxFuture<Reply> + Send + Sync>),
    Body(Arc<BodyCall<()>>),
    ParamsAndBody(Arc<BodyCall<Params>>),
}

/// A route handler with its input shape fixed at construction.
///
/// Cloning is cheap: the wrapped function is shared.
#[derive(Clone)]
pub struct Handler {
    name: &'static str,
    body_type: Option<&'static str>,
    call: Call,
}

impl Handler {
    pub fn no_args<F, Fut, R>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoReply,
    {
        Self::named_no_args(type_name::<F>(), f)
    }

    pub fn params<F, Fut, R>(f: F) -> Self
    where
        F: Fn(Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoReply,
    {
        Self::named_params(type_name::<F>(), f)
    }

    /// A handler fed the decoded body only. The parameter set is not passed.
    pub fn body<T, F, Fut, R>(f: F) -> Self
    where
        T: DeserializeOwned + Default + Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoReply,
    {
        Self::named_body(type_name::<F>(), f)
    }

    pub fn params_and_body<T, F, Fut, R>(f: F) -> Self
    where
        T: DeserializeOwned + Default + Send + 'static,
        F: Fn(Params, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoReply,
    {
        Self::named_params_and_body(type_name::<F>(), f)
    }

    pub fn shape(&self) -> HandlerShape {
        match self.call {
            Call::NoArgs(_) => HandlerShape::NoArgs,
            Call::Params(_) => HandlerShape::Params,
            Call::Body(_) => HandlerShape::Body,
            Call::ParamsAndBody(_) => HandlerShape::ParamsAndBody,
        }
    }

    /// Type name of the wrapped function, used in diagnostics.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name of the expected body, for the shapes that decode one.
    pub fn body_type(&self) -> Option<&'static str> {
        self.body_type
    }

    fn named_no_args<F, Fut, R>(name: &'static str, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoReply,
    {
        let call = move || -> BoxFuture<Reply> {
            let fut = f();
            Box::pin(async move { fut.await.into_reply() })
        };
        Self { name, body_type: None, call: Call::NoArgs(Arc::new(call)) }
    }

    fn named_params<F, Fut, R>(name: &'static str, f: F) -> Self
    where
        F: Fn(Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoReply,
    {
        let call = move |params: Params| -> BoxFuture<Reply> {
            let fut = f(params);
            Box::pin(async move { fut.await.into_reply() })
        };
        Self { name, body_type: None, call: Call::Params(Arc::new(call)) }
    }

    fn named_body<T, F, Fut, R>(name: &'static str, f: F) -> Self
    where
        T: DeserializeOwned + Default + Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoReply,
    {
        let call = move |(): (), body: &[u8]| -> serde_json::Result<BoxFuture<Reply>> {
            let fut = f(decode_body::<T>(body)?);
            Ok(Box::pin(async move { fut.await.into_reply() }))
        };
        Self { name, body_type: Some(type_name::<T>()), call: Call::Body(Arc::new(call)) }
    }

    fn named_params_and_body<T, F, Fut, R>(name: &'static str, f: F) -> Self
    where
        T: DeserializeOwned + Default + Send + 'static,
        F: Fn(Params, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoReply,
    {
        let call = move |params: Params, body: &[u8]| -> serde_json::Result<BoxFuture<Reply>> {
            let fut = f(params, decode_body::<T>(body)?);
            Ok(Box::pin(async move { fut.await.into_reply() }))
        };
        Self { name, body_type: Some(type_name::<T>()), call: Call::ParamsAndBody(Arc::new(call)) }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("name", &self.name)
            .field("shape", &self.shape())
            .field("body_type", &self.body_type)
            .finish()
    }
}

// ── Invoker ───────────────────────────────────────────────────────────────────

/// Binds the request's parameters and body to `handler` and runs it.
///
/// Every contract violation answers `(501, null)` without calling the handler:
/// an unresolved handler (`None`), or a body that is not valid JSON for the
/// expected type. The body is only looked at by the shapes that decode one.
pub async fn invoke(handler: Option<&Handler>, params: Params, body: &[u8]) -> Reply {
    let Some(handler) = handler else {
        error!("no handler resolved for this route and method");
        return Reply::not_implemented();
    };

    debug!(handler = handler.name, shape = ?handler.shape(), "invoking handler");

    let decoded = match &handler.call {
        Call::NoArgs(call) => Ok(call()),
        Call::Params(call) => Ok(call(params)),
        Call::Body(call) => call((), body),
        Call::ParamsAndBody(call) => call(params, body),
    };

    match decoded {
        Ok(fut) => fut.await,
        Err(e) => {
            error!(
                handler = handler.name,
                expected = handler.body_type.unwrap_or("?"),
                "request body does not match the handler's body type: {e}"
            );
            Reply::not_implemented()
        }
    }
}

// ── IntoHandler ───────────────────────────────────────────────────────────────

/// Implemented for every function that can serve as a route handler.
///
/// You never implement this yourself. `Args` records which shape matched:
///
/// ```text
/// async fn a() -> (u16, P)
/// async fn b(params: Params) -> (u16, P)
/// async fn c(body: Json<T>) -> (u16, P)
/// async fn d(params: Params, body: Json<T>) -> (u16, P)
/// ```
///
/// A prebuilt [`Handler`] is accepted as well.
pub trait IntoHandler<Args>: private::Sealed<Args> + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_handler(self) -> Handler;
}

/// Because `Sealed` is private, external crates cannot implement
/// `IntoHandler` on their own types.
mod private {
    pub trait Sealed<Args> {}
}

impl private::Sealed<Handler> for Handler {}

impl IntoHandler<Handler> for Handler {
    fn into_handler(self) -> Handler { self }
}

impl<F, Fut, R> private::Sealed<()> for F
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoReply,
{
}

impl<F, Fut, R> IntoHandler<()> for F
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoReply,
{
    fn into_handler(self) -> Handler {
        Handler::no_args(self)
    }
}

impl<F, Fut, R> private::Sealed<(Params,)> for F
where
    F: Fn(Params) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoReply,
{
}

impl<F, Fut, R> IntoHandler<(Params,)> for F
where
    F: Fn(Params) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoReply,
{
    fn into_handler(self) -> Handler {
        Handler::params(self)
    }
}

impl<F, Fut, R, T> private::Sealed<(Json<T>,)> for F
where
    T: DeserializeOwned + Default + Send + 'static,
    F: Fn(Json<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoReply,
{
}

impl<F, Fut, R, T> IntoHandler<(Json<T>,)> for F
where
    T: DeserializeOwned + Default + Send + 'static,
    F: Fn(Json<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoReply,
{
    fn into_handler(self) -> Handler {
        Handler::named_body(type_name::<F>(), move |body: T| self(Json(body)))
    }
}

impl<F, Fut, R, T> private::Sealed<(Params, Json<T>)> for F
where
    T: DeserializeOwned + Default + Send + 'static,
    F: Fn(Params, Json<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoReply,
{
}

impl<F, Fut, R, T> IntoHandler<(Params, Json<T>)> for F
where
    T: DeserializeOwned + Default + Send + 'static,
    F: Fn(Params, Json<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoReply,
{
    fn into_handler(self) -> Handler {
        Handler::named_params_and_body(type_name::<F>(), move |params, body: T| self(params, Json(body)))
    }
}

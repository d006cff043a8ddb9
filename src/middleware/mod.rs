//! Filter chain.
//!
//! Filters intercept requests on their way to a route target and are the
//! right place for cross-cutting concerns: tracing, CORS, deadlines,
//! authentication-header inspection.
//!
//! # Continuation passing
//!
//! A filter receives the request and a [`Next`] continuation. It either calls
//! [`Next::run`] (exactly once) to pass control downstream, or returns a
//! response of its own to short-circuit the chain. Code placed after the
//! `run` call observes the downstream response, so with filters `[A, B]` the
//! order of execution is:
//!
//! ```text
//! A before → B before → target → B after → A after
//! ```
//!
//! The cursor lives inside `Next`, which is a fresh value for every request.
//! The filter list itself is shared across all routes of an API and never
//! mutated once serving starts; only the target differs per route.
//!
//! ```rust
//! use std::time::Instant;
//! use wicket::{Api, Next, Request};
//!
//! let api = Api::new()
//!     .filter(|req: Request, next: Next| async move {
//!         let start = Instant::now();
//!         let res = next.run(req).await;
//!         tracing::info!(elapsed = ?start.elapsed(), "done");
//!         res
//!     })
//!     .get("/hello", || async { (200, "hello") });
//! ```

pub mod cors;
pub mod timeout;
pub mod trace;

use std::future::Future;
use std::sync::Arc;

use crate::handler::BoxFuture;
use crate::request::Request;
use crate::response::Response;

pub use cors::Cors;
pub use timeout::Timeout;
pub use trace::Trace;

// ── Endpoint ──────────────────────────────────────────────────────────────────

/// The terminal target of a filter chain.
///
/// Implemented for every `Fn(Request) -> impl Future<Output = Response>`;
/// routes registered on an [`Api`](crate::Api) are wrapped into one
/// automatically.
pub trait Endpoint: Send + Sync + 'static {
    fn call(&self, req: Request) -> BoxFuture<Response>;
}

/// A type-erased endpoint shared across concurrent requests.
pub type BoxedEndpoint = Arc<dyn Endpoint>;

impl<F, Fut> Endpoint for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture<Response> {
        Box::pin(self(req))
    }
}

// ── Filter ────────────────────────────────────────────────────────────────────

/// A middleware unit in the chain.
///
/// Filters hold no per-request state. Anything shared between requests (a
/// rate limiter's buckets, say) is the filter's own business to synchronise.
pub trait Filter: Send + Sync + 'static {
    fn call(&self, req: Request, next: Next) -> BoxFuture<Response>;
}

impl<F, Fut> Filter for F
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn call(&self, req: Request, next: Next) -> BoxFuture<Response> {
        Box::pin(self(req, next))
    }
}

/// Callback to the rest of the chain.
///
/// Consumed by [`Next::run`], so it cannot be invoked twice. Dropping it
/// without running it drops the request: neither the remaining filters nor
/// the target run.
pub struct Next {
    filters: Arc<[Arc<dyn Filter>]>,
    cursor: usize,
    target: BoxedEndpoint,
}

impl Next {
    /// Runs the next filter, or the target once every filter has run.
    pub async fn run(self, req: Request) -> Response {
        match self.filters.get(self.cursor).cloned() {
            Some(filter) => {
                let next = Next { cursor: self.cursor + 1, ..self };
                filter.call(req, next).await
            }
            None => self.target.call(req).await,
        }
    }
}

// ── FilterChain ───────────────────────────────────────────────────────────────

/// Ordered filters plus the target they guard.
#[derive(Clone)]
pub struct FilterChain {
    filters: Arc<[Arc<dyn Filter>]>,
    target: BoxedEndpoint,
}

impl FilterChain {
    pub fn new(filters: Arc<[Arc<dyn Filter>]>, target: BoxedEndpoint) -> Self {
        Self { filters, target }
    }

    /// Runs `req` through the chain from the first filter.
    pub async fn dispatch(&self, req: Request) -> Response {
        let next = Next {
            filters: Arc::clone(&self.filters),
            cursor: 0,
            target: Arc::clone(&self.target),
        };
        next.run(req).await
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use bytes::Bytes;
    use http::StatusCode;

    use super::*;

    pub(crate) fn request(method: &str, uri: &str) -> Request {
        let req = http::Request::builder().method(method).uri(uri).body(Bytes::new()).unwrap();
        Request::from_http(req).unwrap()
    }

    fn recording(log: &Arc<Mutex<Vec<String>>>, name: &'static str) -> Arc<dyn Filter> {
        let log = Arc::clone(log);
        Arc::new(move |req: Request, next: Next| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push(format!("{name}-before"));
                let res = next.run(req).await;
                log.lock().unwrap().push(format!("{name}-after"));
                res
            }
        })
    }

    #[tokio::test]
    async fn filters_wrap_the_target_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let target_log = Arc::clone(&log);
        let target: BoxedEndpoint = Arc::new(move |_req: Request| {
            let log = Arc::clone(&target_log);
            async move {
                log.lock().unwrap().push("target".to_owned());
                Response::status(StatusCode::OK)
            }
        });

        let filters: Arc<[Arc<dyn Filter>]> = vec![recording(&log, "A"), recording(&log, "B")].into();
        let chain = FilterChain::new(filters, target);
        let res = chain.dispatch(request("GET", "/")).await;

        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(*log.lock().unwrap(), ["A-before", "B-before", "target", "B-after", "A-after"]);
    }

    #[tokio::test]
    async fn short_circuit_skips_the_target() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let target: BoxedEndpoint = Arc::new(move |_req: Request| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Response::status(StatusCode::OK) }
        });
        let deny: Arc<dyn Filter> =
            Arc::new(|_req: Request, _next: Next| async { Response::status(StatusCode::UNAUTHORIZED) });

        let chain = FilterChain::new(vec![deny].into(), target);
        let res = chain.dispatch(request("GET", "/")).await;

        assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_chain_calls_target_directly() {
        let target: BoxedEndpoint = Arc::new(|_req: Request| async { Response::status(StatusCode::NO_CONTENT) });
        let chain = FilterChain::new(Vec::new().into(), target);
        assert!(chain.is_empty());
        assert_eq!(chain.dispatch(request("GET", "/")).await.status_code(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn concurrent_dispatches_keep_separate_cursors() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let target: BoxedEndpoint = Arc::new(move |_req: Request| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Response::status(StatusCode::OK) }
        });
        let yielding: Arc<dyn Filter> = Arc::new(|req: Request, next: Next| async move {
            tokio::task::yield_now().await;
            next.run(req).await
        });
        let chain = FilterChain::new(vec![Arc::clone(&yielding), yielding].into(), target);

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..32 {
            let chain = chain.clone();
            tasks.spawn(async move { chain.dispatch(request("GET", "/")).await.status_code() });
        }
        while let Some(status) = tasks.join_next().await {
            assert_eq!(status.unwrap(), StatusCode::OK);
        }
        assert_eq!(hits.load(Ordering::SeqCst), 32);
    }
}

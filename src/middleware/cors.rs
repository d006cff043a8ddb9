//! Cross-origin resource sharing.
//!
//! | Request | Effect |
//! |---|---|
//! | no `Origin` | passed through untouched |
//! | simple request with `Origin` | origin echoed back, credentials allowed |
//! | valid preflight | answered here with the grant headers, `200`, no body |
//! | invalid preflight | passed through without grant headers |
//!
//! A preflight is an `OPTIONS` request carrying
//! `Access-Control-Request-Method`. It is valid when that method and every
//! token of `Access-Control-Request-Headers` are on the allow-lists below.
//! The router resolves preflights against the route of the requested method,
//! so an invalid preflight reaches that route's handler.

use http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_REQUEST_HEADERS, ACCESS_CONTROL_REQUEST_METHOD,
    HeaderValue, ORIGIN,
};
use http::{Method, StatusCode};
use tracing::debug;

use super::{Filter, Next};
use crate::handler::BoxFuture;
use crate::request::Request;
use crate::response::Response;

pub const ALLOW_METHODS: &str = "GET,POST,DELETE,PUT,PATCH,HEAD";
pub const ALLOW_HEADERS: &str = "Origin,Accept,Produce,Content-Type,X-Requested-With,Authorization,Token";

/// The CORS filter. Stateless; register it once with [`Api::filter`](crate::Api::filter).
#[derive(Debug, Clone, Copy, Default)]
pub struct Cors;

impl Filter for Cors {
    fn call(&self, req: Request, next: Next) -> BoxFuture<Response> {
        Box::pin(cors(req, next))
    }
}

async fn cors(req: Request, next: Next) -> Response {
    let Some(origin) = req.headers().get(ORIGIN).filter(|v| !v.is_empty()).cloned() else {
        return next.run(req).await;
    };

    debug!(method = %req.method(), uri = %req.uri(), "cors filtering");

    if req.method() == Method::OPTIONS && req.header(ACCESS_CONTROL_REQUEST_METHOD.as_str()).is_some_and(|m| !m.is_empty()) {
        return preflight(req, next, origin).await;
    }

    let mut res = next.run(req).await;
    let headers = res.headers_mut();
    headers.append(ACCESS_CONTROL_ALLOW_CREDENTIALS, HeaderValue::from_static("true"));
    headers.append(ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    res
}

async fn preflight(req: Request, next: Next, origin: HeaderValue) -> Response {
    let method_ok = req
        .header(ACCESS_CONTROL_REQUEST_METHOD.as_str())
        .is_some_and(allowed_method);
    let headers_ok = match req.header(ACCESS_CONTROL_REQUEST_HEADERS.as_str()) {
        Some(list) if !list.is_empty() => list.split(',').all(|h| allowed_header(h.trim_matches(' '))),
        _ => true,
    };

    if !(method_ok && headers_ok) {
        debug!(uri = %req.uri(), "preflight rejected, passing through");
        return next.run(req).await;
    }

    let mut res = Response::status(StatusCode::OK);
    let headers = res.headers_mut();
    headers.append(ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    headers.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOW_METHODS));
    headers.append(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(ALLOW_HEADERS));
    headers.append(ACCESS_CONTROL_ALLOW_CREDENTIALS, HeaderValue::from_static("true"));
    res
}

fn allowed_method(method: &str) -> bool {
    ALLOW_METHODS.split(',').any(|m| m == method)
}

fn allowed_header(header: &str) -> bool {
    ALLOW_HEADERS.split(',').any(|h| h.eq_ignore_ascii_case(header))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use bytes::Bytes;

    use super::*;
    use crate::middleware::{BoxedEndpoint, FilterChain};

    fn chain(hits: &Arc<AtomicUsize>) -> FilterChain {
        let counter = Arc::clone(hits);
        let target: BoxedEndpoint = Arc::new(move |_req: Request| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Response::json(Bytes::from_static(b"{}")) }
        });
        FilterChain::new(vec![Arc::new(Cors) as Arc<dyn Filter>].into(), target)
    }

    fn request(method: &str, headers: &[(&str, &str)]) -> Request {
        let mut builder = http::Request::builder().method(method).uri("/foo");
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        Request::from_http(builder.body(Bytes::new()).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn no_origin_passes_through_untouched() {
        let hits = Arc::new(AtomicUsize::new(0));
        let res = chain(&hits).dispatch(request("GET", &[])).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(res.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }

    #[tokio::test]
    async fn simple_request_echoes_origin() {
        let hits = Arc::new(AtomicUsize::new(0));
        let res = chain(&hits).dispatch(request("GET", &[("origin", "https://app.example")])).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(res.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "https://app.example");
        assert_eq!(res.headers()[ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
        assert!(res.headers().get(ACCESS_CONTROL_ALLOW_METHODS).is_none());
    }

    #[tokio::test]
    async fn options_without_request_method_is_a_simple_request() {
        let hits = Arc::new(AtomicUsize::new(0));
        let res = chain(&hits).dispatch(request("OPTIONS", &[("origin", "https://app.example")])).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(res.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "https://app.example");
    }

    #[tokio::test]
    async fn valid_preflight_is_answered_here() {
        let hits = Arc::new(AtomicUsize::new(0));
        let res = chain(&hits)
            .dispatch(request("OPTIONS", &[
                ("origin", "https://app.example"),
                ("access-control-request-method", "PUT"),
                ("access-control-request-headers", "content-type, AUTHORIZATION"),
            ]))
            .await;

        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(res.status_code(), StatusCode::OK);
        assert!(res.body().is_empty());
        assert_eq!(res.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "https://app.example");
        assert_eq!(res.headers()[ACCESS_CONTROL_ALLOW_METHODS], ALLOW_METHODS);
        assert_eq!(res.headers()[ACCESS_CONTROL_ALLOW_HEADERS], ALLOW_HEADERS);
        assert_eq!(res.headers()[ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    }

    #[tokio::test]
    async fn preflight_with_unknown_method_passes_through_without_grant() {
        let hits = Arc::new(AtomicUsize::new(0));
        let res = chain(&hits)
            .dispatch(request("OPTIONS", &[
                ("origin", "https://app.example"),
                ("access-control-request-method", "TRACE"),
            ]))
            .await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(res.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }

    #[tokio::test]
    async fn preflight_with_unknown_header_passes_through_without_grant() {
        let hits = Arc::new(AtomicUsize::new(0));
        let res = chain(&hits)
            .dispatch(request("OPTIONS", &[
                ("origin", "https://app.example"),
                ("access-control-request-method", "GET"),
                ("access-control-request-headers", "content-type,x-custom"),
            ]))
            .await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(res.headers().get(ACCESS_CONTROL_ALLOW_METHODS).is_none());
    }

    #[test]
    fn header_check_is_case_insensitive_and_method_check_is_not() {
        assert!(allowed_header("x-requested-with"));
        assert!(allowed_header("TOKEN"));
        assert!(!allowed_header(""));
        assert!(allowed_method("PATCH"));
        assert!(!allowed_method("patch"));
    }
}

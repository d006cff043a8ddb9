//! The application façade: routes, filters and request handling in one value.
//!
//! ```rust
//! use wicket::{Api, Json, Params, middleware::Cors};
//!
//! #[derive(Default, serde::Deserialize, serde::Serialize)]
//! struct Chart { name: String }
//!
//! let api = Api::new()
//!     .filter(Cors)
//!     .get("/hello/:name", |p: Params| async move {
//!         (200, format!("hello {}", p.get("name").unwrap_or_default()))
//!     })
//!     .post("/charts", |Json(chart): Json<Chart>| async move { (201, chart) });
//! ```
//!
//! Registration takes `self` or `&mut self`; serving takes the `Api` by value
//! and shares it read-only, so the route table cannot change once requests
//! are being answered.

use std::any::type_name;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::Full;
use tracing::{debug, error, warn};

use crate::error::Error;
use crate::handler::{BoxFuture, Handler, IntoHandler, invoke};
use crate::middleware::{BoxedEndpoint, Endpoint, Filter, FilterChain};
use crate::request::Request;
use crate::resource::{RESOURCE_METHODS, Resource};
use crate::response::{Response, write_reply};
use crate::router::Router;

pub struct Api {
    router: Router<BoxedEndpoint>,
    filters: Arc<[Arc<dyn Filter>]>,
}

impl Api {
    pub fn new() -> Self {
        Self { router: Router::new(), filters: Vec::new().into() }
    }

    // ── Filters ───────────────────────────────────────────────────────────────

    /// Appends a filter. Filters apply to every route, whenever they were
    /// added relative to the routes.
    pub fn filter(mut self, filter: impl Filter) -> Self {
        self.add_filter(filter);
        self
    }

    pub fn add_filter(&mut self, filter: impl Filter) {
        let mut filters = self.filters.to_vec();
        filters.push(Arc::new(filter));
        self.filters = filters.into();
    }

    // ── Routes ────────────────────────────────────────────────────────────────

    /// Registers `handler` for `method` on `pattern`.
    ///
    /// Fails on a malformed pattern or a method that is not a valid HTTP
    /// token.
    pub fn add<Args>(&mut self, method: &str, pattern: &str, handler: impl IntoHandler<Args>) -> Result<(), Error> {
        let endpoint = HandlerEndpoint(handler.into_handler());
        self.add_endpoint(method, pattern, Arc::new(endpoint))
    }

    /// Like [`add`](Api::add), chaining.
    pub fn try_route<Args>(mut self, method: &str, pattern: &str, handler: impl IntoHandler<Args>) -> Result<Self, Error> {
        self.add(method, pattern, handler)?;
        Ok(self)
    }

    /// Like [`add`](Api::add), chaining.
    ///
    /// # Panics
    ///
    /// Panics on a malformed pattern or method. Routes are registered at
    /// startup, where a bad one should stop the process.
    pub fn route<Args>(self, method: &str, pattern: &str, handler: impl IntoHandler<Args>) -> Self {
        self.try_route(method, pattern, handler)
            .unwrap_or_else(|e| panic!("invalid route {method} `{pattern}`: {e}"))
    }

    pub fn get<Args>(self, pattern: &str, handler: impl IntoHandler<Args>) -> Self {
        self.route("GET", pattern, handler)
    }

    pub fn post<Args>(self, pattern: &str, handler: impl IntoHandler<Args>) -> Self {
        self.route("POST", pattern, handler)
    }

    pub fn put<Args>(self, pattern: &str, handler: impl IntoHandler<Args>) -> Self {
        self.route("PUT", pattern, handler)
    }

    pub fn patch<Args>(self, pattern: &str, handler: impl IntoHandler<Args>) -> Self {
        self.route("PATCH", pattern, handler)
    }

    pub fn delete<Args>(self, pattern: &str, handler: impl IntoHandler<Args>) -> Self {
        self.route("DELETE", pattern, handler)
    }

    pub fn head<Args>(self, pattern: &str, handler: impl IntoHandler<Args>) -> Self {
        self.route("HEAD", pattern, handler)
    }

    pub fn options<Args>(self, pattern: &str, handler: impl IntoHandler<Args>) -> Self {
        self.route("OPTIONS", pattern, handler)
    }

    pub fn link<Args>(self, pattern: &str, handler: impl IntoHandler<Args>) -> Self {
        self.route("LINK", pattern, handler)
    }

    pub fn unlink<Args>(self, pattern: &str, handler: impl IntoHandler<Args>) -> Self {
        self.route("UNLINK", pattern, handler)
    }

    /// Routes every verb in [`RESOURCE_METHODS`] on `pattern` to `resource`.
    ///
    /// The resource is asked for its handler on each request; a verb it has
    /// no handler for answers `501`.
    pub fn add_resource<R: Resource>(&mut self, pattern: &str, resource: R) -> Result<(), Error> {
        let name = type_name::<R>();
        let resource: Arc<dyn Resource> = Arc::new(resource);
        for method in RESOURCE_METHODS {
            let endpoint = ResourceEndpoint { resource: Arc::clone(&resource), name, method };
            self.add_endpoint(method, pattern, Arc::new(endpoint))?;
        }
        Ok(())
    }

    /// Like [`add_resource`](Api::add_resource), chaining.
    ///
    /// # Panics
    ///
    /// Panics on a malformed pattern.
    pub fn resource(mut self, pattern: &str, resource: impl Resource) -> Self {
        self.add_resource(pattern, resource)
            .unwrap_or_else(|e| panic!("invalid resource `{pattern}`: {e}"));
        self
    }

    fn add_endpoint(&mut self, method: &str, pattern: &str, endpoint: BoxedEndpoint) -> Result<(), Error> {
        http::Method::from_bytes(method.as_bytes()).map_err(|_| Error::InvalidMethod(method.to_owned()))?;
        self.router.add(pattern, method, endpoint)?;
        Ok(())
    }

    pub fn router(&self) -> &Router<BoxedEndpoint> {
        &self.router
    }

    // ── Handling ──────────────────────────────────────────────────────────────

    /// Answers one request.
    ///
    /// Routing matches the percent-decoded path. A path that does not decode
    /// to UTF-8, or a malformed query string or form body, is `400`. A request no route
    /// matches is `405`, whether or not the path is known under another
    /// method. Otherwise the request runs through the filters to the route.
    pub async fn handle(&self, req: http::Request<Bytes>) -> http::Response<Full<Bytes>> {
        let mut req = match Request::from_http(req) {
            Ok(req) => req,
            Err(e) => {
                warn!("malformed request parameters: {e}");
                return Response::status(StatusCode::BAD_REQUEST).into_inner();
            }
        };

        let params = std::mem::take(&mut req.params);
        let Some(hit) = self.router.dispatch(req.method.as_str(), &req.path, &req.headers, params) else {
            debug!(method = %req.method, path = req.path, "no route, answering 405");
            return Response::status(StatusCode::METHOD_NOT_ALLOWED).into_inner();
        };
        req.params = hit.params;

        let chain = FilterChain::new(Arc::clone(&self.filters), Arc::clone(hit.handler));
        chain.dispatch(req).await.into_inner()
    }
}

impl Default for Api {
    fn default() -> Self { Self::new() }
}

// ── Route endpoints ───────────────────────────────────────────────────────────

struct HandlerEndpoint(Handler);

impl Endpoint for HandlerEndpoint {
    fn call(&self, req: Request) -> BoxFuture<Response> {
        let handler = self.0.clone();
        Box::pin(async move {
            let (params, body) = req.into_parts();
            write_reply(invoke(Some(&handler), params, &body).await)
        })
    }
}

struct ResourceEndpoint {
    resource: Arc<dyn Resource>,
    name: &'static str,
    method: &'static str,
}

impl Endpoint for ResourceEndpoint {
    fn call(&self, req: Request) -> BoxFuture<Response> {
        let handler = self.resource.handler(self.method);
        if handler.is_none() {
            error!(resource = self.name, method = self.method, path = req.path(), "resource has no handler for this method");
        }
        Box::pin(async move {
            let (params, body) = req.into_parts();
            write_reply(invoke(handler.as_ref(), params, &body).await)
        })
    }
}

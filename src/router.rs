//! Method and pattern route table.
//!
//! One list of compiled patterns per HTTP method. Dispatch walks the list for
//! the request's method in registration order and takes the first pattern
//! that consumes the whole path.
//!
//! The table is generic over what a route resolves to. [`Api`](crate::Api)
//! stores filter-chain endpoints; tests store plain strings.

use std::collections::HashMap;

use http::HeaderMap;
use http::header::ACCESS_CONTROL_REQUEST_METHOD;
use tracing::debug;

use crate::params::Params;
use crate::pattern::{Pattern, PatternError};

struct Route<H> {
    pattern: Pattern,
    handler: H,
}

/// A successful dispatch.
#[derive(Debug)]
pub struct RouteMatch<'r, H> {
    pub handler: &'r H,
    pub pattern: &'r Pattern,
    /// The incoming parameters with the path captures merged in.
    pub params: Params,
}

/// The route table.
///
/// Methods are compared as exact, case-sensitive strings. Registering the
/// same method and pattern again replaces the handler but keeps the route's
/// original position in the dispatch order.
pub struct Router<H> {
    routes: HashMap<String, Vec<Route<H>>>,
}

impl<H> Router<H> {
    pub fn new() -> Self {
        Self { routes: HashMap::new() }
    }

    /// Compiles `pattern` and stores `handler` under `method`.
    ///
    /// ```rust
    /// use wicket::Router;
    ///
    /// let mut router = Router::new();
    /// router.add("/users/:id", "GET", "get_user").unwrap();
    /// assert!(router.add("/users/(", "GET", "broken").is_err());
    /// ```
    pub fn add(&mut self, pattern: &str, method: &str, handler: H) -> Result<(), PatternError> {
        let compiled = Pattern::compile(pattern)?;
        let routes = self.routes.entry(method.to_owned()).or_default();

        match routes.iter_mut().find(|r| r.pattern.as_str() == pattern) {
            Some(route) => {
                debug!(method, pattern, "replacing route handler");
                route.handler = handler;
            }
            None => {
                debug!(method, pattern, "route added");
                routes.push(Route { pattern: compiled, handler });
            }
        }
        Ok(())
    }

    /// Resolves `method` and `path` to a handler.
    ///
    /// An `OPTIONS` request carrying a non-empty `Access-Control-Request-Method`
    /// header is looked up under that method instead, so a CORS preflight
    /// finds the route it is asking about.
    ///
    /// Captures are written into `params`, each replacing only the values of
    /// its own key. Returns `None` when no pattern under the resolved method
    /// matches.
    pub fn dispatch(&self, method: &str, path: &str, headers: &HeaderMap, mut params: Params) -> Option<RouteMatch<'_, H>> {
        let method = match headers.get(ACCESS_CONTROL_REQUEST_METHOD).and_then(|v| v.to_str().ok()) {
            Some(requested) if method == "OPTIONS" && !requested.is_empty() => requested,
            _ => method,
        };

        let routes = self.routes.get(method)?;
        for route in routes {
            let Some(captures) = route.pattern.captures(path) else {
                continue;
            };
            for (name, value) in captures {
                params.set(name, value);
            }
            debug!(method, path, pattern = route.pattern.as_str(), ?params, "route matched");
            return Some(RouteMatch { handler: &route.handler, pattern: &route.pattern, params });
        }

        debug!(method, path, "no route matched");
        None
    }

    /// `(method, pattern)` for every route, sorted by method then in dispatch
    /// order.
    pub fn routes(&self) -> Vec<(&str, &str)> {
        let mut methods: Vec<_> = self.routes.keys().collect();
        methods.sort();
        methods
            .into_iter()
            .flat_map(|m| self.routes[m].iter().map(move |r| (m.as_str(), r.pattern.as_str())))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.routes.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<H> Default for Router<H> {
    fn default() -> Self { Self::new() }
}

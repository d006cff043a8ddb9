//! REST resources.
//!
//! A resource groups the handlers of one URL under the HTTP verbs it
//! answers. Registering it with [`Api::resource`](crate::Api::resource) adds a
//! route for each of `GET PUT POST PATCH DELETE OPTIONS`; verbs the resource
//! has no handler for answer `501`.
//!
//! ```rust
//! use wicket::{Handler, Params, Resource};
//!
//! struct Users;
//!
//! impl Resource for Users {
//!     fn handler(&self, method: &str) -> Option<Handler> {
//!         match method {
//!             "GET" => Some(Handler::params(|p: Params| async move {
//!                 (200, p.get("id").map(str::to_owned))
//!             })),
//!             _ => None,
//!         }
//!     }
//! }
//! ```

use crate::handler::Handler;

/// The verbs a resource is routed under.
pub const RESOURCE_METHODS: [&str; 6] = ["GET", "PUT", "POST", "PATCH", "DELETE", "OPTIONS"];

/// Maps an HTTP verb to the resource's handler for it.
///
/// Looked up on every request, so a resource may decide per call.
pub trait Resource: Send + Sync + 'static {
    fn handler(&self, method: &str) -> Option<Handler>;
}

/// Liveness resource: `GET` answers `200` with a `null` body.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdminResource;

impl Resource for AdminResource {
    fn handler(&self, method: &str) -> Option<Handler> {
        match method {
            "GET" => Some(Handler::no_args(|| async { (200, ()) })),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::invoke;
    use crate::params::Params;

    #[tokio::test]
    async fn admin_answers_get_only() {
        let admin = AdminResource;
        let reply = invoke(admin.handler("GET").as_ref(), Params::new(), b"").await;
        assert_eq!(reply.status, 200);

        assert!(admin.handler("POST").is_none());
        assert!(admin.handler("get").is_none());
    }
}

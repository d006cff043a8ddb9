//! # wicket
//!
//! An embeddable HTTP router for JSON services.
//!
//! - Pattern routes: `:name` segments, `**` wildcards, inline regex groups
//! - A filter chain with continuation passing, for logging, CORS and deadlines
//! - Typed handlers: take the parameters, the decoded body, both or neither,
//!   and return `(status, payload)`
//! - HTTP/1.1 on hyper with graceful shutdown on SIGTERM / Ctrl-C
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use wicket::{AdminResource, Api, Json, Params, Server, middleware::{Cors, Trace}};
//!
//! #[derive(Default, serde::Deserialize, serde::Serialize)]
//! struct User {
//!     name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), wicket::Error> {
//!     wicket::logging::init(wicket::LogLevel::Info)?;
//!
//!     let api = Api::new()
//!         .filter(Trace)
//!         .filter(Cors)
//!         .resource("/ping", AdminResource)
//!         .get("/users/:id", get_user)
//!         .post("/users", create_user);
//!
//!     Server::bind("0.0.0.0:3000")?.serve(api).await
//! }
//!
//! async fn get_user(params: Params) -> (u16, Option<String>) {
//!     (200, params.get("id").map(str::to_owned))
//! }
//!
//! async fn create_user(Json(user): Json<User>) -> (u16, User) {
//!     (201, user)
//! }
//! ```
//!
//! ## Status codes
//!
//! | Code | When |
//! |---|---|
//! | handler's own | the handler ran |
//! | `400` | malformed query string, form body or path encoding |
//! | `405` | no route for the method and path, including unknown paths |
//! | `500` | the payload could not be serialized |
//! | `501` | no handler for the verb, or a body that does not decode |

mod api;
mod config;
mod error;
mod handler;
mod params;
mod pattern;
mod request;
mod resource;
mod response;
mod router;
mod server;

pub mod logging;
pub mod middleware;

pub use api::Api;
pub use config::Config;
pub use error::Error;
pub use handler::{BoxFuture, ErrorBody, Handler, HandlerShape, IntoHandler, IntoReply, Json, JsonPayload, Reply, invoke};
pub use logging::LogLevel;
pub use middleware::{Endpoint, Filter, FilterChain, Next};
pub use params::{Params, ParamsError};
pub use pattern::{Pattern, PatternError};
pub use request::Request;
pub use resource::{AdminResource, RESOURCE_METHODS, Resource};
pub use response::{Response, ResponseBuilder, write_reply};
pub use router::{RouteMatch, Router};
pub use server::Server;

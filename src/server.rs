//! HTTP/1.1 server and graceful shutdown.
//!
//! On SIGTERM or Ctrl-C the server:
//! 1. stops accepting connections,
//! 2. lets every in-flight connection run to completion,
//! 3. returns from [`Server::serve`].
//!
//! [`Server::serve_with_shutdown`] takes any future as the shutdown trigger,
//! which is how tests and embedding applications stop the server.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::api::Api;
use crate::config::Config;
use crate::error::Error;
use crate::response::Response;

enum Bind {
    Addr(SocketAddr),
    Listener(TcpListener),
}

/// The HTTP server.
pub struct Server {
    bind: Bind,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// ```rust
    /// use wicket::Server;
    ///
    /// assert!(Server::bind("0.0.0.0:3000").is_ok());
    /// assert!(Server::bind("localhost").is_err());
    /// ```
    pub fn bind(addr: &str) -> Result<Self, Error> {
        let addr: SocketAddr = addr.parse().map_err(|_| Error::InvalidAddr(addr.to_owned()))?;
        Ok(Self { bind: Bind::Addr(addr) })
    }

    /// Binds to `0.0.0.0:port`.
    pub fn port(port: u16) -> Self {
        Self { bind: Bind::Addr(SocketAddr::from(([0, 0, 0, 0], port))) }
    }

    pub fn from_config(config: &Config) -> Self {
        Self { bind: Bind::Addr(config.addr) }
    }

    /// Serves on an already bound listener.
    pub fn from_listener(listener: TcpListener) -> Self {
        Self { bind: Bind::Listener(listener) }
    }

    /// Accepts connections and answers them through `api` until SIGTERM or
    /// Ctrl-C, then drains in-flight connections.
    pub async fn serve(self, api: Api) -> Result<(), Error> {
        self.serve_with_shutdown(api, shutdown_signal()).await
    }

    /// Like [`serve`](Server::serve), stopping when `shutdown` resolves.
    pub async fn serve_with_shutdown(self, api: Api, shutdown: impl Future<Output = ()>) -> Result<(), Error> {
        let listener = match self.bind {
            Bind::Addr(addr) => TcpListener::bind(addr).await?,
            Bind::Listener(listener) => listener,
        };
        let addr = listener.local_addr()?;

        for (method, pattern) in api.router().routes() {
            info!(method, pattern, "route");
        }
        if api.router().is_empty() {
            warn!("serving with no routes; every request will get 405");
        }

        // Shared read-only across connection tasks; the route table is frozen
        // from here on.
        let api = Arc::new(api);

        info!(%addr, "wicket listening");

        let mut tasks = tokio::task::JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, peer) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let api = Arc::clone(&api);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        let svc = service_fn(move |req| {
                            let api = Arc::clone(&api);
                            async move { dispatch(api, req).await }
                        });

                        if let Err(e) = http1::Builder::new().serve_connection(io, svc).await {
                            error!(%peer, "connection error: {e}");
                        }
                    });
                }

                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("wicket stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Buffers the body and hands the request to the API. Never fails towards
/// hyper: a body that cannot be read is answered `400`.
async fn dispatch(
    api: Arc<Api>,
    req: hyper::Request<Incoming>,
) -> Result<http::Response<Full<Bytes>>, std::convert::Infallible> {
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!("could not read request body: {e}");
            return Ok(Response::status(StatusCode::BAD_REQUEST).into_inner());
        }
    };

    Ok(api.handle(http::Request::from_parts(parts, body)).await)
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on SIGTERM or SIGINT (Ctrl-C). On Windows only Ctrl-C is
/// available.
///
/// A signal handler that cannot be installed is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}

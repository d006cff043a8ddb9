//! Request deadlines.
//!
//! Bounds the time the rest of the chain may take. When the deadline passes
//! the downstream future is dropped and the client gets `504 Gateway Timeout`.

use std::time::Duration;

use http::StatusCode;
use tracing::warn;

use super::{Filter, Next};
use crate::handler::BoxFuture;
use crate::request::Request;
use crate::response::Response;

#[derive(Debug, Clone, Copy)]
pub struct Timeout {
    duration: Duration,
}

impl Timeout {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl Filter for Timeout {
    fn call(&self, req: Request, next: Next) -> BoxFuture<Response> {
        let duration = self.duration;
        Box::pin(async move {
            let method = req.method().clone();
            let uri = req.uri().clone();
            match tokio::time::timeout(duration, next.run(req)).await {
                Ok(res) => res,
                Err(_) => {
                    warn!(%method, %uri, timeout = ?duration, "request timed out");
                    Response::status(StatusCode::GATEWAY_TIMEOUT)
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::middleware::tests::request;
    use crate::middleware::{BoxedEndpoint, FilterChain};

    fn chain(timeout: Duration, work: Duration) -> FilterChain {
        let target: BoxedEndpoint = Arc::new(move |_req: Request| async move {
            tokio::time::sleep(work).await;
            Response::status(StatusCode::OK)
        });
        FilterChain::new(vec![Arc::new(Timeout::new(timeout)) as Arc<dyn Filter>].into(), target)
    }

    #[tokio::test(start_paused = true)]
    async fn slow_target_yields_504() {
        let res = chain(Duration::from_millis(50), Duration::from_secs(5)).dispatch(request("GET", "/")).await;
        assert_eq!(res.status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert!(res.body().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn fast_target_passes_through() {
        let res = chain(Duration::from_secs(5), Duration::from_millis(10)).dispatch(request("GET", "/")).await;
        assert_eq!(res.status_code(), StatusCode::OK);
    }
}

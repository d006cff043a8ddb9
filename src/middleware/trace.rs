//! Request logging.
//!
//! Logs one `info` line per request once the downstream response is known:
//! method, URI, status and latency.

use std::time::Instant;

use tracing::info;

use super::{Filter, Next};
use crate::handler::BoxFuture;
use crate::request::Request;
use crate::response::Response;

#[derive(Debug, Clone, Copy, Default)]
pub struct Trace;

impl Filter for Trace {
    fn call(&self, req: Request, next: Next) -> BoxFuture<Response> {
        Box::pin(async move {
            let method = req.method().clone();
            let uri = req.uri().clone();
            let start = Instant::now();

            let res = next.run(req).await;

            let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
            info!(%method, %uri, status = res.status_code().as_u16(), elapsed_ms, "request served");
            res
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use http::StatusCode;

    use super::*;
    use crate::middleware::tests::request;
    use crate::middleware::{BoxedEndpoint, FilterChain};

    #[tokio::test]
    async fn passes_the_response_through_unchanged() {
        let target: BoxedEndpoint = Arc::new(|_req: Request| async {
            Response::builder().status(StatusCode::CREATED).header("x-id", "7").no_body()
        });
        let chain = FilterChain::new(vec![Arc::new(Trace) as Arc<dyn Filter>].into(), target);

        let res = chain.dispatch(request("POST", "/users?x=1")).await;
        assert_eq!(res.status_code(), StatusCode::CREATED);
        assert_eq!(res.headers()["x-id"], "7");
    }
}

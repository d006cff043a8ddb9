//! Minimal wicket example: JSON endpoints, a resource, CORS and tracing.
//!
//! Run with:
//!   WICKET_LOG=DEBUG cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/ping
//!   curl 'http://localhost:3000/charts/7?label=revenue'
//!   curl -X POST http://localhost:3000/charts \
//!        -H 'content-type: application/json' \
//!        -d '{"name":"revenue","order":1}'
//!   curl -X OPTIONS http://localhost:3000/charts/7 \
//!        -H 'origin: https://app.example' \
//!        -H 'access-control-request-method: PUT'

use std::time::Duration;

use serde::{Deserialize, Serialize};
use wicket::middleware::{Cors, Timeout, Trace};
use wicket::{AdminResource, Api, Config, Json, Params, Server, logging};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Chart {
    name: String,
    order: i64,
}

#[tokio::main]
async fn main() -> Result<(), wicket::Error> {
    let config = Config::from_env()?;
    logging::init(config.log_level)?;

    let api = Api::new()
        .filter(Trace)
        .filter(Cors)
        .filter(Timeout::new(Duration::from_secs(10)))
        .resource("/ping", AdminResource)
        .get("/charts/:id", get_chart)
        .post("/charts", create_chart)
        .put("/charts/:id", update_chart)
        .delete("/charts/:id", delete_chart);

    Server::from_config(&config).serve(api).await
}

// GET /charts/:id?label=…
async fn get_chart(params: Params) -> (u16, Chart) {
    let order = params.get("id").and_then(|id| id.parse().ok()).unwrap_or_default();
    let name = params.get("label").unwrap_or("untitled").to_owned();
    (200, Chart { name, order })
}

// POST /charts
async fn create_chart(Json(chart): Json<Chart>) -> (u16, Chart) {
    (201, chart)
}

// PUT /charts/:id
async fn update_chart(params: Params, Json(mut chart): Json<Chart>) -> (u16, Chart) {
    if let Some(order) = params.get("id").and_then(|id| id.parse().ok()) {
        chart.order = order;
    }
    (200, chart)
}

// DELETE /charts/:id
async fn delete_chart() -> (u16, ()) {
    (200, ())
}

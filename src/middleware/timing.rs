use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;

use crate::metrics::RequestObservation;
use crate::AppState;

/// Middleware that records one `RequestObservation` per completed request:
///
///   request_latency_seconds{endpoint}                  histogram
///   request_count_total{method, endpoint, http_status} counter
///
/// `endpoint` is the raw request path, not the matched route template.
/// The response is returned untouched. If the handler panics nothing is
/// recorded; the panic is turned into a 500 further out.
pub async fn timing_middleware(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let method = req.method().to_string();
    let endpoint = req.uri().path().to_owned();

    let start = Instant::now();
    let response = next.run(req).await;

    let observation = RequestObservation {
        method,
        endpoint,
        status: response.status().as_u16(),
        elapsed: start.elapsed(),
    };
    if let Err(err) = observation.record(&state.metrics) {
        tracing::error!(error = %err, ?observation, "failed to record request metrics");
    }

    response
}

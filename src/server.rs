//! HTTP exposition server
//!
//! Each request to the telemetry path runs one collection cycle. A failed
//! cycle answers 500 with the error, never a partial exposition.

use crate::collector::exposition::{Exposition, CONTENT_TYPE};
use crate::collector::Collector;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::sync::Arc;

/// Shared server state
pub struct AppState {
    pub collector: Collector,
    pub exposition: Exposition,
    pub metrics_path: String,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let mut router = Router::new().route(&state.metrics_path, get(metrics));
    if state.metrics_path != "/" {
        router = router.route("/", get(landing_page));
    }
    router.with_state(state)
}

async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    let samples = match state.collector.scrape().await {
        Ok(samples) => samples,
        Err(err) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("An error has occurred while serving metrics:\n\n{}\n", err),
            )
                .into_response();
        }
    };

    match state.exposition.render(&samples) {
        Ok(body) => ([(header::CONTENT_TYPE, CONTENT_TYPE)], body).into_response(),
        Err(err) => {
            tracing::error!("Failed to encode metrics: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("An error has occurred while encoding metrics:\n\n{}\n", err),
            )
                .into_response()
        }
    }
}

async fn landing_page(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(format!(
        r#"<html>
<head><title>azure-health-exporter</title></head>
<body>
<h1>azure-health-exporter</h1>
<p><a href="{}">Metrics</a></p>
</body>
</html>"#,
        state.metrics_path
    ))
}

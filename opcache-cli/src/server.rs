// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! HTTP listener for the exporter.
//!
//! Every request to the telemetry path runs one collector scrape. Concurrent
//! requests are serialized inside the collector, not here.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::trace::TraceLayer;

use opcache_core::{exposition, OpcacheCollector, TelemetryPath, WebConfig, HEALTH_PATH};

/// Server state shared across handlers
#[derive(Clone)]
struct ServerState {
    collector: Arc<OpcacheCollector>,
    telemetry_path: Arc<str>,
}

/// Build the exporter router.
pub fn router(collector: Arc<OpcacheCollector>, telemetry_path: &TelemetryPath) -> Router {
    let state = ServerState {
        collector,
        telemetry_path: Arc::from(telemetry_path.as_str()),
    };

    Router::new()
        .route("/", get(landing_page))
        .route(HEALTH_PATH, get(health))
        .route(telemetry_path.as_str(), get(telemetry))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until Ctrl+C.
pub async fn start_server(
    web: &WebConfig,
    collector: Arc<OpcacheCollector>,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(collector, &web.telemetry_path);

    let addr = web.listen_address.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        "Exporter listening on http://{}{}",
        addr,
        web.telemetry_path
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Exporter stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down exporter");
}

async fn telemetry(State(state): State<ServerState>) -> Response {
    let samples = state.collector.collect().await;

    match exposition::encode_with_defaults(&samples) {
        Ok(body) => ([(header::CONTENT_TYPE, exposition::CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn landing_page(State(state): State<ServerState>) -> Html<String> {
    Html(format!(
        "<html>\n<head><title>OPcache Exporter</title></head>\n<body>\n\
         <h1>OPcache Exporter</h1>\n<p><a href=\"{}\">Metrics</a></p>\n\
         </body>\n</html>\n",
        state.telemetry_path
    ))
}

async fn health() -> &'static str {
    "ok"
}

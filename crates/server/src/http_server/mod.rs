use axum::routing::get;
use axum::Router;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tower_http::trace::{DefaultOnFailure, DefaultOnResponse};
use tower_http::LatencyUnit;

pub mod api;
mod handlers;
mod health;
pub mod middleware;

use crate::ServiceState;

/// Build the full application router: liveness probe, `/v1` API, 404
/// fallback. CORS is only attached when origins are configured.
pub fn app(state: ServiceState, cors_origins: &[String]) -> Router {
    let mut router = Router::new()
        .route("/", get(health::liveness))
        .nest("/v1", api::v1::router(state.clone()))
        .fallback(handlers::not_found_handler);

    if let Some(cors) = api::cors_layer(cors_origins) {
        router = router.layer(cors);
    }

    router.with_state(state)
}

pub async fn run_api(
    listen_addr: std::net::SocketAddr,
    cors_origins: Vec<String>,
    state: ServiceState,
    mut shutdown_rx: watch::Receiver<()>,
) -> Result<(), HttpServerError> {
    let trace_layer = TraceLayer::new_for_http()
        .on_response(
            DefaultOnResponse::new()
                .include_headers(false)
                .level(tracing::Level::INFO)
                .latency_unit(LatencyUnit::Micros),
        )
        .on_failure(DefaultOnFailure::new().latency_unit(LatencyUnit::Micros));

    let router = app(state, &cors_origins).layer(trace_layer);

    tracing::info!(addr = ?listen_addr, "API server listening");
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.changed().await;
        })
        .await?;

    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum HttpServerError {
    #[error("an error occurred running the HTTP server: {0}")]
    ServingFailed(#[from] std::io::Error),
}

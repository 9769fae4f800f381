use axum::{
    Router,
    extract::{DefaultBodyLimit, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::AppState;
use crate::api;
use crate::config::AppConfig;

/// Start the Axum server with the provided configuration.
///
/// Runs until Ctrl-C (or SIGTERM on Unix); all sessions are dropped on exit.
pub async fn start_server(config: Arc<AppConfig>) -> anyhow::Result<()> {
    let state = AppState::new(Arc::clone(&config));
    let app = build_app(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        "Server started"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!(name: "server.stopped", "Server stopped");
    Ok(())
}

/// Build the full application: API routes plus CORS, tracing, timeout and
/// body limit layers.
pub fn build_app(state: AppState) -> Router {
    let config = Arc::clone(&state.config);

    // An empty CorsLayer adds no headers, which keeps the router type fixed.
    let cors = if config.server.cors_enabled {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    };

    api::router()
        .layer(DefaultBodyLimit::max(config.server.max_body_bytes))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            request_timeout,
        ))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Answer 408 when a handler outlives the configured timeout.
async fn request_timeout(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let resilience = &state.config.resilience;
    if resilience.timeout_disabled {
        return next.run(req).await;
    }

    let limit = Duration::from_secs(resilience.request_timeout_secs);
    let path = req.uri().path().to_owned();
    match tokio::time::timeout(limit, next.run(req)).await {
        Ok(res) => res,
        Err(_) => {
            warn!(
                name: "server.request.timeout",
                path = %path,
                timeout_secs = resilience.request_timeout_secs,
                "Request timed out"
            );
            (StatusCode::REQUEST_TIMEOUT, "Request timed out").into_response()
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!(name: "server.shutdown", "Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::routing::get;
    use tower::ServiceExt;

    fn slow_app(timeout_disabled: bool) -> Router {
        let mut config = AppConfig::default();
        config.resilience.request_timeout_secs = 1;
        config.resilience.timeout_disabled = timeout_disabled;
        let state = AppState::new(Arc::new(config));

        Router::new()
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "done"
                }),
            )
            .layer(middleware::from_fn_with_state(
                state.clone(),
                request_timeout,
            ))
            .with_state(state)
    }

    fn slow_request() -> axum::http::Request<Body> {
        axum::http::Request::builder()
            .uri("/slow")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_timeout() {
        let response = slow_app(false).oneshot(slow_request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_disabled() {
        let response = slow_app(true).oneshot(slow_request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

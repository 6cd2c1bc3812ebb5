//! Router assembly and process lifecycle

use axum::{
    http::StatusCode,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::RelayConfig;
use crate::error::{RelayError, RelayResult};
use crate::state::AppState;
use crate::{api, ws};

/// Build the HTTP router for both surfaces.
///
/// Registration routes run under the configured request deadline; the chat
/// stream route has none.
pub fn build_router(state: Arc<AppState>, config: &RelayConfig) -> Router {
    let api_routes = Router::new()
        .route("/api/users", post(api::create_user))
        .route("/api/rooms", post(api::create_room).get(api::list_rooms))
        .route("/api/rooms/{id}", get(api::get_room))
        .layer(request_deadline(config.request_timeout));

    Router::new()
        .merge(api_routes)
        .route("/ws", get(ws::ws_handler))
        .route("/health", get(api::health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Deadline for registration calls; an expired request answers `408`
fn request_deadline(timeout: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout)
}

/// Bind and serve until a termination signal arrives
pub async fn run(config: RelayConfig) -> RelayResult<()> {
    let state = Arc::new(AppState::with_room_policy(config.room_policy));
    let app = build_router(state, &config);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| RelayError::Startup(format!("could not bind {}: {}", addr, e)))?;

    tracing::info!(
        "Listening on {} (room policy: {:?})",
        addr,
        config.room_policy
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| RelayError::Startup(format!("server error: {}", e)))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, stopping relay");
}

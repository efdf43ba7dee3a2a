//! # Pulse Web
//!
//! JSON API for the PropertyPulse listing service, mounted under `/api`.
//!
//! ```text
//!   request ──► TraceLayer ──► CORS ──► resolve_session ──► route ──► Service
//!                                            │
//!                                            └─ Session(Option<Identity>) in extensions
//! ```
//!
//! Every route is public at the router level. Operations that need a
//! signed-in caller receive the resolved identity explicitly and fail with
//! `401` themselves, so the error text matches the operation.

pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::{middleware as axum_middleware, Router};
use tokio::net::TcpListener;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub use error::ApiError;
pub use middleware::{resolve_session, Claims, Session, SessionVerifier};
pub use state::AppState;

/// Build the router with every API route.
pub fn create_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .merge(routes::health::router())
        .merge(routes::properties::router())
        .merge(routes::reviews::router())
        .merge(routes::bookmarks::router())
        .merge(routes::messages::router())
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            resolve_session,
        ));

    Router::new()
        .nest("/api", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors(&state.cors_origins)),
        )
        .with_state(state)
}

fn cors(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(parsed))
}

/// Bind `addr` and serve until Ctrl+C or SIGTERM.
pub async fn serve(state: Arc<AppState>, addr: &str) -> std::io::Result<()> {
    let app = create_router(state);

    let listener = TcpListener::bind(addr).await?;
    info!("PropertyPulse API listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(%err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(err) => {
                warn!(%err, "Failed to install SIGTERM handler");
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
}

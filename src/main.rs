use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crowdplay::{abuse, api, state::AppState, ws};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crowdplay=debug,tower_http=debug,axum=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting crowdplay...");

    // Initialize anti-abuse config
    let abuse_config = Arc::new(abuse::AbuseConfig::from_env());

    let state = Arc::new(AppState::new());

    // Periodically drop stale rate-limiter windows
    if let Some(rate_limiter) = abuse_config.rate_limiter.clone() {
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(std::time::Duration::from_secs(60)).await;
                rate_limiter.cleanup().await;
            }
        });
    }

    // WebSocket route with anti-abuse protection
    let ws_routes =
        Router::new()
            .route("/ws", get(ws::ws_handler))
            .layer(middleware::from_fn_with_state(
                abuse_config.clone(),
                abuse::ws_abuse_middleware,
            ));

    let api_routes = Router::new()
        .route("/api/rooms", post(api::create_room))
        .route("/api/health", get(api::health));

    let app = Router::new()
        .merge(ws_routes)
        .merge(api_routes)
        .fallback_service(ServeDir::new("static"))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(7465u16);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on http://{}", addr);

    match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("Server error: {}", e);
            }
        }
        Err(e) => tracing::error!("Failed to bind {}: {}", addr, e),
    }
}

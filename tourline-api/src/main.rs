use std::net::SocketAddr;

use tourline_api::{app, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tourline_api=debug,tourline_booking=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = tourline_store::Config::load().expect("Failed to load config");
    tracing::info!("Starting booking service on port {}", config.server.port);

    let state = AppState::from_config(&config)
        .await
        .expect("Failed to initialise service state");

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app(state)).await.expect("Server error");
}

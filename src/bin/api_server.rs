// API server binary entry point
//
// Usage: cargo run --bin api_server
// Configuration via MODEL_DIR and PORT environment variables.

use disease_risk_api::{create_router, AppState};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing (structured logging)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                // Default log level: info for our crate, warn for others
                "disease_risk_api=info,tower_http=debug,axum=debug,warn".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting API server...");

    // Configuration from environment variables
    let model_dir = std::env::var("MODEL_DIR").unwrap_or_else(|_| "saved_model".to_string());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000);

    tracing::info!("Configuration:");
    tracing::info!("  MODEL_DIR: {}", model_dir);
    tracing::info!("  PORT: {}", port);

    // Load model and lookup tables; a failure here aborts startup before
    // the listener binds, so the service never serves partial state.
    tracing::info!("Initializing application state...");
    let state = AppState::new(&model_dir)?;
    tracing::info!("Application state initialized successfully");

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

// SPDX-License-Identifier: MIT

//! Fieldtrack API Server
//!
//! Tracks field-staff duty sessions and geofenced client/site visits, and
//! reconciles each day's GPS trail into a travel-expense claim.

use fieldtrack::{config::Config, db::Db, seed, AppState};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Fieldtrack API");

    let db = Db::new();

    if config.seed_demo_data {
        seed::seed_demo_data(&db).expect("Failed to seed demo data");
    }

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), db));

    // Build router
    let app = fieldtrack::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fieldtrack=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}

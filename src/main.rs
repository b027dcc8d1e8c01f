// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Trip Planner API Server
//!
//! Serves the trip planning REST API backed by Firestore (or an in-memory
//! store for local development).

use std::sync::Arc;
use trip_planner::{
    config::{Config, StoreBackend},
    db::Db,
    AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Trip Planner API");

    let db = match config.store_backend {
        StoreBackend::Firestore => Db::new(&config.gcp_project_id).await?,
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store, data is lost on restart");
            Db::in_memory()
        }
    };

    let state = Arc::new(AppState::new(config.clone(), db)?);

    if let Some(path) = &config.activity_seed_path {
        tracing::info!(path = %path, "Seeding activity catalog");
        state.catalog.seed_from_file(path).await?;
    }

    if state.google_oauth.is_none() {
        tracing::info!("Google sign-in disabled (GOOGLE_* not set)");
    }

    // Build router
    let app = trip_planner::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("trip_planner=debug,info"));

    tracing_subscriber::registry().with(filter).with(format).init();
}

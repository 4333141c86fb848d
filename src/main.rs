// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Ranger Tracker API Server
//!
//! Backend for protected-area rangers: field activity planning and GPS
//! logging, findings, incidents, personnel, areas and equipment.

use ranger_tracker::{config::Config, db::Db, services::AuthProviderClient, AppState};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        region_offset = config.region_utc_offset_hours,
        "Starting Ranger Tracker API"
    );

    // Open the database and apply migrations
    let db = Db::connect(&config.database_url, config.region_utc_offset_hours).await?;

    let auth_provider = AuthProviderClient::new(&config.auth_provider_url, &config.auth_service_key);
    tracing::info!(url = %config.auth_provider_url, "Auth provider client initialized");

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), db, auth_provider));

    // Build router
    let app = ranger_tracker::routes::create_router(state);

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

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ranger_tracker=debug,info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(format)
        .init();
}

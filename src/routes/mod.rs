// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP route handlers.

pub mod activities;
pub mod areas;
pub mod catalogs;
pub mod dashboard;
pub mod equipment;
pub mod findings;
pub mod incidents;
pub mod rangers;
pub mod setup;
pub mod users;

use crate::error::Result;
use crate::extract::Json;
use crate::middleware::{require_auth, require_token};
use crate::AppState;
use axum::extract::State;
use axum::http::{header, Method};
use axum::{middleware, routing::get, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct HealthResponse {
    pub status: String,
    pub build_id: String,
}

/// Health check: also probes the database.
async fn health_check(State(state): State<Arc<AppState>>) -> Result<Json<HealthResponse>> {
    state.db.health_check().await?;
    let build_id = option_env!("BUILD_ID").unwrap_or("unknown").to_string();
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        build_id,
    }))
}

/// `{"success": true, "data": ...}` envelope returned by mutations.
#[derive(Serialize)]
pub struct Saved<T> {
    pub success: bool,
    pub data: T,
}

pub fn saved<T: Serialize>(data: T) -> Json<Saved<T>> {
    Json(Saved {
        success: true,
        data,
    })
}

/// Mutation result that carries no data.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

pub fn message(text: impl Into<String>) -> Json<MessageResponse> {
    Json(MessageResponse {
        success: true,
        message: text.into(),
    })
}

/// Exact frontend origin, or a loopback host on any port.
fn is_allowed_origin(origin: &str, frontend_url: &str) -> bool {
    if origin == frontend_url {
        return true;
    }
    ["http://localhost", "http://127.0.0.1"].iter().any(|host| {
        origin
            .strip_prefix(host)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(':'))
    })
}

/// Build the complete router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS layer - allow requests from frontend URL and localhost (for dev).
    // Bearer tokens only, so no credentialed requests.
    let frontend_url = state.config.frontend_url.clone();
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::AllowOrigin::predicate(
            move |origin: &axum::http::HeaderValue, _request_parts: &axum::http::request::Parts| {
                is_allowed_origin(origin.to_str().unwrap_or(""), &frontend_url)
            },
        ))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .merge(setup::public_routes());

    // Valid token, no profile yet (first administrator bootstrap)
    let token_routes = setup::token_routes()
        .route_layer(middleware::from_fn_with_state(state.clone(), require_token));

    // Protected routes (token + active profile)
    let protected_routes = Router::new()
        .merge(users::routes())
        .merge(rangers::routes())
        .merge(areas::routes())
        .merge(catalogs::routes())
        .merge(equipment::routes())
        .merge(activities::routes())
        .merge(findings::routes())
        .merge(incidents::routes())
        .merge(dashboard::routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(token_routes)
        .merge(protected_routes)
        .layer(middleware::from_fn(
            crate::middleware::security::add_security_headers,
        ))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use ranger_tracker::config::Config;
use ranger_tracker::db::{AreaInput, Db, NewUser};
use ranger_tracker::middleware::auth::create_jwt;
use ranger_tracker::models::{ProtectedArea, Role, User, UserStatus};
use ranger_tracker::routes::create_router;
use ranger_tracker::services::AuthProviderClient;
use ranger_tracker::AppState;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

/// Create a test app over a fresh in-memory database and a mock auth
/// provider. Returns the router and the shared state.
#[allow(dead_code)]
pub async fn create_test_app() -> (Router, Arc<AppState>) {
    let config = Config::test_default();
    let db = Db::connect_in_memory(config.region_utc_offset_hours)
        .await
        .expect("Failed to open in-memory database");
    let state = Arc::new(AppState::new(config, db, AuthProviderClient::new_mock()));
    (create_router(state.clone()), state)
}

/// Insert a profile row directly.
#[allow(dead_code)]
pub async fn seed_user(state: &AppState, id: &str, role: Role) -> User {
    state
        .db
        .insert_user(&NewUser {
            id: id.to_string(),
            email: format!("{}@example.org", id),
            first_name: "Test".to_string(),
            last_name: id.to_string(),
            dpi: None,
            phone: None,
            role,
            area_id: None,
        })
        .await
        .expect("Failed to seed user")
}

#[allow(dead_code)]
pub async fn seed_ranger_in_area(state: &AppState, id: &str, area_id: i64) -> User {
    seed_user(state, id, Role::Ranger).await;
    state
        .db
        .set_user_area(id, Some(area_id))
        .await
        .expect("Failed to assign area");
    state.db.get_user(id).await.unwrap().unwrap()
}

#[allow(dead_code)]
pub async fn set_status(state: &AppState, id: &str, status: UserStatus) {
    state
        .db
        .set_user_status(id, status)
        .await
        .expect("Failed to set status");
}

#[allow(dead_code)]
pub async fn seed_area(state: &AppState, name: &str) -> ProtectedArea {
    state
        .db
        .insert_area(&AreaInput {
            name: name.to_string(),
            category: "Parque Nacional".to_string(),
            description: None,
            department_id: None,
            ecosystem_id: None,
            latitude: None,
            longitude: None,
            extension_ha: None,
            boundary_geojson: None,
        })
        .await
        .expect("Failed to seed area")
}

/// Token signed like the auth provider signs them.
#[allow(dead_code)]
pub fn token_for(state: &AppState, user_id: &str) -> String {
    create_jwt(
        user_id,
        Some(&format!("{}@example.org", user_id)),
        3600,
        &state.config.jwt_secret,
    )
    .expect("Failed to create JWT")
}

/// Send a request and decode the JSON body (`Null` when empty).
#[allow(dead_code)]
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

/// Send a plain-text body (CSV imports).
#[allow(dead_code)]
pub async fn send_text(app: &Router, uri: &str, token: &str, text: &str) -> (StatusCode, Value) {
    send_raw(app, "POST", uri, token, "text/csv", text).await
}

/// Send an arbitrary body with the given content type, undecoded.
#[allow(dead_code)]
pub async fn send_raw(
    app: &Router,
    method: &str,
    uri: &str,
    token: &str,
    content_type: &str,
    body: &str,
) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (
        status,
        serde_json::from_slice(&bytes).unwrap_or(Value::Null),
    )
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authentication, session expiry, health and first-run setup.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use ranger_tracker::error::SESSION_EXPIRED_HEADER;
use ranger_tracker::middleware::auth::create_jwt;
use ranger_tracker::models::{Role, UserStatus};
use serde_json::json;
use tower::ServiceExt;

mod common;

#[tokio::test]
async fn test_health_is_public_and_has_security_headers() {
    let (app, _state) = common::create_test_app().await;

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert!(headers.get("strict-transport-security").is_some());
    assert!(headers.get("content-security-policy").is_some());
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let (app, _state) = common::create_test_app().await;

    let (status, body) = common::send(&app, "GET", "/api/me", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "unauthorized");
}

#[tokio::test]
async fn test_garbage_token_is_invalid() {
    let (app, _state) = common::create_test_app().await;

    let (status, body) = common::send(&app, "GET", "/api/me", Some("not.a.jwt"), None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "invalid_token");
}

#[tokio::test]
async fn test_expired_token_signals_session_expired() {
    let (app, state) = common::create_test_app().await;
    common::seed_user(&state, "admin", Role::Administrator).await;
    let token = create_jwt("admin", None, -3600, &state.config.jwt_secret).unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/me")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers().get(SESSION_EXPIRED_HEADER).unwrap(),
        "true"
    );
}

#[tokio::test]
async fn test_token_without_profile_is_unauthorized() {
    let (app, state) = common::create_test_app().await;
    let token = common::token_for(&state, "stranger");

    let (status, _) = common::send(&app, "GET", "/api/me", Some(&token), None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_suspended_account_is_forbidden() {
    let (app, state) = common::create_test_app().await;
    common::seed_user(&state, "r1", Role::Ranger).await;
    common::set_status(&state, "r1", UserStatus::Suspended).await;
    let token = common::token_for(&state, "r1");

    let (status, body) = common::send(&app, "GET", "/api/me", Some(&token), None).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "forbidden");
}

#[tokio::test]
async fn test_me_returns_profile() {
    let (app, state) = common::create_test_app().await;
    common::seed_user(&state, "coord", Role::Coordinator).await;
    let token = common::token_for(&state, "coord");

    let (status, body) = common::send(&app, "GET", "/api/me", Some(&token), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "coord");
    assert_eq!(body["role"], "coordinator");
    assert_eq!(body["status"], "active");
}

#[tokio::test]
async fn test_setup_registers_first_administrator_once() {
    let (app, state) = common::create_test_app().await;

    let (status, body) = common::send(&app, "GET", "/api/setup/status", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["administrator_exists"], false);
    assert_eq!(body["catalogs_seeded"], false);

    let first = common::token_for(&state, "founder");
    let (status, body) = common::send(
        &app,
        "POST",
        "/api/setup/init",
        Some(&first),
        Some(json!({ "first_name": "Marta" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["administrator_created"], true);
    assert!(body["departments_added"].as_u64().unwrap() > 0);

    let founder = state.db.get_user("founder").await.unwrap().unwrap();
    assert_eq!(founder.role, Role::Administrator);
    assert_eq!(founder.email, "founder@example.org");

    // A second caller without a profile cannot take over.
    let second = common::token_for(&state, "latecomer");
    let (status, _) = common::send(&app, "POST", "/api/setup/init", Some(&second), Some(json!({}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The administrator may re-run seeding; nothing new is added.
    let (status, body) =
        common::send(&app, "POST", "/api/setup/init", Some(&first), Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["administrator_created"], false);
    assert_eq!(body["departments_added"], 0);

    let (_, body) = common::send(&app, "GET", "/api/setup/status", None, None).await;
    assert_eq!(body["administrator_exists"], true);
    assert_eq!(body["catalogs_seeded"], true);
}

#[tokio::test]
async fn test_setup_init_requires_token() {
    let (app, _state) = common::create_test_app().await;

    let (status, _) = common::send(&app, "POST", "/api/setup/init", None, Some(json!({}))).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

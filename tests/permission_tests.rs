// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Role permission enforcement and password-change rules over HTTP.

use axum::http::StatusCode;
use ranger_tracker::models::{Role, UserStatus};
use serde_json::json;

mod common;

#[tokio::test]
async fn test_ranger_cannot_create_area() {
    let (app, state) = common::create_test_app().await;
    common::seed_user(&state, "r1", Role::Ranger).await;
    let token = common::token_for(&state, "r1");

    let (status, body) = common::send(
        &app,
        "POST",
        "/api/areas",
        Some(&token),
        Some(json!({ "name": "Laguna Lachuá", "category": "Parque Nacional" })),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "forbidden");
}

#[tokio::test]
async fn test_coordinator_cannot_list_users() {
    let (app, state) = common::create_test_app().await;
    common::seed_user(&state, "coord", Role::Coordinator).await;
    let token = common::token_for(&state, "coord");

    let (status, _) = common::send(&app, "GET", "/api/users", Some(&token), None).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_administrator_lists_users() {
    let (app, state) = common::create_test_app().await;
    common::seed_user(&state, "admin", Role::Administrator).await;
    common::seed_user(&state, "r1", Role::Ranger).await;
    let token = common::token_for(&state, "admin");

    let (status, body) =
        common::send(&app, "GET", "/api/users?role=ranger", Some(&token), None).await;

    assert_eq!(status, StatusCode::OK);
    let users = body.as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["id"], "r1");
}

#[tokio::test]
async fn test_my_permissions_for_ranger() {
    let (app, state) = common::create_test_app().await;
    common::seed_user(&state, "r1", Role::Ranger).await;
    let token = common::token_for(&state, "r1");

    let (status, body) =
        common::send(&app, "GET", "/api/me/permissions", Some(&token), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "ranger");
    let daily_log = &body["modules"]["daily_log"];
    assert_eq!(daily_log["canView"], true);
    assert_eq!(daily_log["canCreate"], true);
    assert_eq!(daily_log["canEdit"], true);
    assert_eq!(daily_log["canDelete"], false);
    assert_eq!(body["modules"]["users"]["canView"], false);
    assert_eq!(body["modules"]["activity_planning"]["canCreate"], false);
}

#[tokio::test]
async fn test_coordinator_cannot_change_administrator_password() {
    let (app, state) = common::create_test_app().await;
    common::seed_user(&state, "coord", Role::Coordinator).await;
    common::seed_user(&state, "admin", Role::Administrator).await;
    let token = common::token_for(&state, "coord");

    // Rejected on the role pairing even though the password is also invalid.
    let (status, _) = common::send(
        &app,
        "PUT",
        "/api/users/admin/password",
        Some(&token),
        Some(json!({ "password": "x" })),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_coordinator_changes_ranger_password() {
    let (app, state) = common::create_test_app().await;
    common::seed_user(&state, "coord", Role::Coordinator).await;
    common::seed_user(&state, "r1", Role::Ranger).await;
    let token = common::token_for(&state, "coord");

    let (status, _) = common::send(
        &app,
        "PUT",
        "/api/users/r1/password",
        Some(&token),
        Some(json!({ "password": "abc" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = common::send(
        &app,
        "PUT",
        "/api/users/r1/password",
        Some(&token),
        Some(json!({ "password": "selva-maya-2026" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn test_ranger_cannot_change_other_ranger_password() {
    let (app, state) = common::create_test_app().await;
    common::seed_user(&state, "r1", Role::Ranger).await;
    common::seed_user(&state, "r2", Role::Ranger).await;
    let token = common::token_for(&state, "r1");

    let (status, _) = common::send(
        &app,
        "PUT",
        "/api/users/r2/password",
        Some(&token),
        Some(json!({ "password": "selva-maya-2026" })),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_password_over_byte_limit_rejected() {
    let (app, state) = common::create_test_app().await;
    common::seed_user(&state, "r1", Role::Ranger).await;
    let token = common::token_for(&state, "r1");

    let (status, _) = common::send(
        &app,
        "PUT",
        "/api/me/password",
        Some(&token),
        Some(json!({ "password": "ñ".repeat(40) })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_ranger_and_reject_duplicate_email() {
    let (app, state) = common::create_test_app().await;
    common::seed_user(&state, "coord", Role::Coordinator).await;
    let area = common::seed_area(&state, "Sierra de las Minas").await;
    let token = common::token_for(&state, "coord");

    let payload = json!({
        "email": "Lucia@Example.org",
        "password": "quetzal-2026",
        "first_name": "Lucía",
        "last_name": "Pop",
        "dpi": "1234567890123",
        "area_id": area.id,
    });
    let (status, body) =
        common::send(&app, "POST", "/api/rangers", Some(&token), Some(payload.clone())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["role"], "ranger");
    assert_eq!(body["data"]["email"], "lucia@example.org");
    assert_eq!(body["data"]["area_id"], area.id);

    let (status, _) =
        common::send(&app, "POST", "/api/rangers", Some(&token), Some(payload)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_failed_profile_insert_leaves_existing_user_untouched() {
    let (app, state) = common::create_test_app().await;
    common::seed_user(&state, "coord", Role::Coordinator).await;
    // Occupies the id the auth provider will hand out for new@example.org.
    common::seed_user(&state, "mock-new@example.org", Role::Ranger).await;
    let token = common::token_for(&state, "coord");

    let (status, body) = common::send(
        &app,
        "POST",
        "/api/rangers",
        Some(&token),
        Some(json!({
            "email": "new@example.org",
            "password": "quetzal-2026",
            "first_name": "Nueva",
            "last_name": "Guardarecursos",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);

    let existing = state.db.get_user("mock-new@example.org").await.unwrap().unwrap();
    assert_eq!(existing.email, "mock-new@example.org@example.org");
    assert!(state.db.get_user_by_email("new@example.org").await.unwrap().is_none());
}

#[tokio::test]
async fn test_administrator_accounts_cannot_be_deleted() {
    let (app, state) = common::create_test_app().await;
    common::seed_user(&state, "admin", Role::Administrator).await;
    common::seed_user(&state, "admin2", Role::Administrator).await;
    common::seed_user(&state, "r1", Role::Ranger).await;
    let token = common::token_for(&state, "admin");

    let (status, _) = common::send(&app, "DELETE", "/api/users/admin", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = common::send(&app, "DELETE", "/api/users/admin2", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = common::send(&app, "DELETE", "/api/users/r1", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let ranger = state.db.get_user("r1").await.unwrap().unwrap();
    assert_eq!(ranger.status, UserStatus::Deactivated);
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Protected area administration: assignment rules, boundaries and the
//! listing cache.

use axum::http::StatusCode;
use ranger_tracker::models::{Role, UserStatus};
use serde_json::json;

mod common;

#[tokio::test]
async fn test_deactivation_blocked_by_active_ranger() {
    let (app, state) = common::create_test_app().await;
    common::seed_user(&state, "admin", Role::Administrator).await;
    let area = common::seed_area(&state, "Biotopo del Quetzal").await;
    common::seed_ranger_in_area(&state, "r1", area.id).await;
    let token = common::token_for(&state, "admin");
    let uri = format!("/api/areas/{}/status", area.id);

    let (status, body) =
        common::send(&app, "PUT", &uri, Some(&token), Some(json!({ "active": false }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("1 active ranger"));

    // A suspended ranger no longer blocks it.
    common::set_status(&state, "r1", UserStatus::Suspended).await;
    let (status, body) =
        common::send(&app, "PUT", &uri, Some(&token), Some(json!({ "active": false }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["active"], false);
}

#[tokio::test]
async fn test_delete_blocked_by_assigned_ranger() {
    let (app, state) = common::create_test_app().await;
    common::seed_user(&state, "admin", Role::Administrator).await;
    let area = common::seed_area(&state, "Cerro San Gil").await;
    common::seed_ranger_in_area(&state, "r1", area.id).await;
    let token = common::token_for(&state, "admin");

    let (status, _) = common::send(
        &app,
        "DELETE",
        &format!("/api/areas/{}", area.id),
        Some(&token),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(state.db.get_area(area.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_delete_unused_area() {
    let (app, state) = common::create_test_app().await;
    common::seed_user(&state, "admin", Role::Administrator).await;
    let area = common::seed_area(&state, "Río Dulce").await;
    let token = common::token_for(&state, "admin");

    let (status, _) = common::send(
        &app,
        "DELETE",
        &format!("/api/areas/{}", area.id),
        Some(&token),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(state.db.get_area(area.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_create_invalidates_listing_cache() {
    let (app, state) = common::create_test_app().await;
    common::seed_user(&state, "coord", Role::Coordinator).await;
    common::seed_area(&state, "Sierra de las Minas").await;
    let token = common::token_for(&state, "coord");

    let (status, body) = common::send(&app, "GET", "/api/areas", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = common::send(
        &app,
        "POST",
        "/api/areas",
        Some(&token),
        Some(json!({
            "name": "Laguna Lachuá",
            "category": "Parque Nacional",
            "latitude": 15.92,
            "longitude": -90.67,
            "extension_ha": 14500.0,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = common::send(&app, "GET", "/api/areas", Some(&token), None).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_boundary_must_be_polygon() {
    let (app, state) = common::create_test_app().await;
    common::seed_user(&state, "admin", Role::Administrator).await;
    let token = common::token_for(&state, "admin");

    let (status, _) = common::send(
        &app,
        "POST",
        "/api/areas",
        Some(&token),
        Some(json!({
            "name": "Punto",
            "category": "Biotopo",
            "boundary": { "type": "Point", "coordinates": [-90.6, 15.6] },
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let polygon = json!({
        "type": "Polygon",
        "coordinates": [[[-90.7, 15.5], [-90.5, 15.5], [-90.5, 15.7], [-90.7, 15.7], [-90.7, 15.5]]],
    });
    let (status, body) = common::send(
        &app,
        "POST",
        "/api/areas",
        Some(&token),
        Some(json!({ "name": "Polígono", "category": "Biotopo", "boundary": polygon })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["boundary_geojson"].is_string());
}

#[tokio::test]
async fn test_ranger_assignment_requires_active_area() {
    let (app, state) = common::create_test_app().await;
    common::seed_user(&state, "admin", Role::Administrator).await;
    common::seed_user(&state, "r1", Role::Ranger).await;
    let area = common::seed_area(&state, "Tikal").await;
    state.db.set_area_active(area.id, false).await.unwrap();
    let token = common::token_for(&state, "admin");

    let (status, _) = common::send(
        &app,
        "PUT",
        "/api/rangers/r1/area",
        Some(&token),
        Some(json!({ "area_id": area.id })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let ranger = state.db.get_user("r1").await.unwrap().unwrap();
    assert_eq!(ranger.area_id, None);
}

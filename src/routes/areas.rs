// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Protected area administration.
//!
//! Listings are served from a short-lived per-filter cache that every area
//! write invalidates.

use super::{message, saved, MessageResponse, Saved};
use crate::db::{AreaFilter, AreaInput};
use crate::error::{AppError, Result};
use crate::extract::{Json, Path, Query};
use crate::middleware::AuthUser;
use crate::models::{AreaBoundary, ProtectedArea};
use crate::services::{require, Action, Module};
use crate::AppState;
use axum::{
    extract::State,
    routing::{get, put},
    Extension, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/areas", get(list_areas).post(create_area))
        .route(
            "/api/areas/{id}",
            get(get_area).put(update_area).delete(delete_area),
        )
        .route("/api/areas/{id}/status", put(set_area_status))
}

#[derive(Deserialize)]
struct AreaListQuery {
    active: Option<bool>,
    department_id: Option<i64>,
}

async fn list_areas(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<AreaListQuery>,
) -> Result<Json<Vec<ProtectedArea>>> {
    require(&user, Module::ProtectedAreas, Action::View)?;
    let filter = AreaFilter {
        active: params.active,
        department_id: params.department_id,
    };

    if let Some(cached) = state.area_cache.get(&filter) {
        return Ok(Json(cached.as_ref().clone()));
    }
    let areas = state.db.list_areas(&filter).await?;
    let areas = state.area_cache.insert(filter, areas);
    Ok(Json(areas.as_ref().clone()))
}

#[derive(Serialize)]
pub struct AreaDetail {
    #[serde(flatten)]
    pub area: ProtectedArea,
    pub active_rangers: i64,
}

async fn get_area(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<AreaDetail>> {
    require(&user, Module::ProtectedAreas, Action::View)?;
    let area = load_area(&state, id).await?;
    let active_rangers = state.db.count_active_rangers_in_area(id).await?;
    Ok(Json(AreaDetail {
        area,
        active_rangers,
    }))
}

#[derive(Debug, Deserialize, Validate)]
struct AreaRequest {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    name: String,
    #[validate(length(min = 1, max = 100, message = "Category is required"))]
    category: String,
    description: Option<String>,
    department_id: Option<i64>,
    ecosystem_id: Option<i64>,
    #[validate(range(min = -90.0, max = 90.0, message = "Invalid latitude"))]
    latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0, message = "Invalid longitude"))]
    longitude: Option<f64>,
    #[validate(range(min = 0.0, message = "Extension must not be negative"))]
    extension_ha: Option<f64>,
    /// GeoJSON object, or the same serialized as a string
    boundary: Option<serde_json::Value>,
}

impl AreaRequest {
    fn into_input(self) -> Result<AreaInput> {
        self.validate()?;
        if self.latitude.is_some() != self.longitude.is_some() {
            return Err(AppError::BadRequest(
                "Latitude and longitude must be given together".to_string(),
            ));
        }

        let boundary_geojson = match self.boundary {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(text)) => Some(text),
            Some(other) => Some(other.to_string()),
        };
        if let Some(raw) = &boundary_geojson {
            AreaBoundary::parse(raw).map_err(|e| AppError::BadRequest(e.to_string()))?;
        }

        Ok(AreaInput {
            name: self.name.trim().to_string(),
            category: self.category.trim().to_string(),
            description: self.description,
            department_id: self.department_id,
            ecosystem_id: self.ecosystem_id,
            latitude: self.latitude,
            longitude: self.longitude,
            extension_ha: self.extension_ha,
            boundary_geojson,
        })
    }
}

async fn create_area(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<AreaRequest>,
) -> Result<Json<Saved<ProtectedArea>>> {
    require(&user, Module::ProtectedAreas, Action::Create)?;
    let input = payload.into_input()?;

    let area = state.db.insert_area(&input).await?;
    state.area_cache.invalidate_all();
    tracing::info!(area_id = area.id, name = %area.name, "Protected area created");
    Ok(saved(area))
}

async fn update_area(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(payload): Json<AreaRequest>,
) -> Result<Json<Saved<ProtectedArea>>> {
    require(&user, Module::ProtectedAreas, Action::Edit)?;
    let input = payload.into_input()?;

    let area = state.db.update_area(id, &input).await?;
    state.area_cache.invalidate_all();
    Ok(saved(area))
}

#[derive(Deserialize)]
struct AreaStatusRequest {
    active: bool,
}

/// Activate or deactivate an area. Deactivation is refused while any
/// active ranger is still assigned to it.
async fn set_area_status(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(payload): Json<AreaStatusRequest>,
) -> Result<Json<Saved<ProtectedArea>>> {
    require(&user, Module::ProtectedAreas, Action::Edit)?;
    let area = load_area(&state, id).await?;

    if !payload.active {
        ensure_no_active_rangers(&state, &area, "deactivated").await?;
    }
    state.db.set_area_active(id, payload.active).await?;
    state.area_cache.invalidate_all();

    tracing::info!(area_id = id, active = payload.active, "Protected area status changed");
    Ok(saved(load_area(&state, id).await?))
}

async fn delete_area(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>> {
    require(&user, Module::ProtectedAreas, Action::Delete)?;
    let area = load_area(&state, id).await?;
    ensure_no_active_rangers(&state, &area, "deleted").await?;

    let activities = state.db.count_activities_for_area(id).await?;
    if activities > 0 {
        return Err(AppError::BadRequest(format!(
            "Area '{}' cannot be deleted: {} activities reference it",
            area.name, activities
        )));
    }
    state.db.delete_area(id).await?;
    state.area_cache.invalidate_all();

    tracing::info!(area_id = id, name = %area.name, "Protected area deleted");
    Ok(message("Protected area deleted"))
}

async fn load_area(state: &AppState, id: i64) -> Result<ProtectedArea> {
    state
        .db
        .get_area(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Protected area {} not found", id)))
}

async fn ensure_no_active_rangers(state: &AppState, area: &ProtectedArea, verb: &str) -> Result<()> {
    let rangers = state.db.count_active_rangers_in_area(area.id).await?;
    if rangers > 0 {
        tracing::info!(area_id = area.id, rangers, "Area change refused: active rangers assigned");
        return Err(AppError::BadRequest(format!(
            "Area '{}' cannot be {}: {} active ranger(s) are assigned to it",
            area.name, verb, rangers
        )));
    }
    Ok(())
}

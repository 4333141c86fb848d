// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reference catalogs: departments and ecosystems (stored), plus the fixed
//! activity, incident and severity vocabularies.

use super::{saved, Saved};
use crate::error::Result;
use crate::extract::Json;
use crate::middleware::AuthUser;
use crate::models::{ActivityCategory, Department, Ecosystem, IncidentCategory, Severity};
use crate::services::{require, Action, Module};
use crate::AppState;
use axum::{extract::State, routing::get, Extension, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/catalogs/departments",
            get(list_departments).post(create_department),
        )
        .route(
            "/api/catalogs/ecosystems",
            get(list_ecosystems).post(create_ecosystem),
        )
        .route(
            "/api/catalogs/activity-categories",
            get(list_activity_categories),
        )
        .route(
            "/api/catalogs/incident-categories",
            get(list_incident_categories),
        )
        .route("/api/catalogs/severities", get(list_severities))
}

#[derive(Serialize)]
pub struct CatalogEntry {
    pub key: &'static str,
    pub name: &'static str,
}

#[derive(Deserialize, Validate)]
struct CatalogNameRequest {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    name: String,
}

async fn list_departments(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<Department>>> {
    require(&user, Module::Catalogs, Action::View)?;
    Ok(Json(state.db.list_departments().await?))
}

async fn create_department(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CatalogNameRequest>,
) -> Result<Json<Saved<Department>>> {
    require(&user, Module::Catalogs, Action::Create)?;
    payload.validate()?;
    let department = state.db.insert_department(&payload.name).await?;
    tracing::info!(department_id = department.id, name = %department.name, "Department added");
    Ok(saved(department))
}

async fn list_ecosystems(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<Ecosystem>>> {
    require(&user, Module::Catalogs, Action::View)?;
    Ok(Json(state.db.list_ecosystems().await?))
}

async fn create_ecosystem(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CatalogNameRequest>,
) -> Result<Json<Saved<Ecosystem>>> {
    require(&user, Module::Catalogs, Action::Create)?;
    payload.validate()?;
    let ecosystem = state.db.insert_ecosystem(&payload.name).await?;
    tracing::info!(ecosystem_id = ecosystem.id, name = %ecosystem.name, "Ecosystem added");
    Ok(saved(ecosystem))
}

async fn list_activity_categories() -> Json<Vec<CatalogEntry>> {
    Json(
        ActivityCategory::ALL
            .iter()
            .map(|c| CatalogEntry {
                key: c.as_str(),
                name: c.display_name(),
            })
            .collect(),
    )
}

async fn list_incident_categories() -> Json<Vec<IncidentCategory>> {
    Json(IncidentCategory::ALL.to_vec())
}

async fn list_severities() -> Json<Vec<Severity>> {
    Json(Severity::ALL.to_vec())
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Equipment inventory.

use super::{message, saved, MessageResponse, Saved};
use crate::db::EquipmentInput;
use crate::error::{AppError, Result};
use crate::extract::{Json, Path, Query};
use crate::middleware::AuthUser;
use crate::models::{Equipment, EquipmentStatus, Role};
use crate::services::{require, Action, Module};
use crate::AppState;
use axum::{
    extract::State,
    routing::get,
    Extension, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/equipment", get(list_equipment).post(create_equipment))
        .route(
            "/api/equipment/{id}",
            get(get_equipment)
                .put(update_equipment)
                .delete(delete_equipment),
        )
}

#[derive(Deserialize)]
struct EquipmentListQuery {
    ranger_id: Option<String>,
    status: Option<EquipmentStatus>,
}

/// Rangers only ever see the equipment assigned to them.
async fn list_equipment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<EquipmentListQuery>,
) -> Result<Json<Vec<Equipment>>> {
    require(&user, Module::Equipment, Action::View)?;
    let ranger_id = match user.role {
        Role::Ranger => Some(user.id.as_str()),
        _ => params.ranger_id.as_deref(),
    };
    Ok(Json(
        state.db.list_equipment(ranger_id, params.status).await?,
    ))
}

async fn get_equipment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<Equipment>> {
    require(&user, Module::Equipment, Action::View)?;
    let item = load_equipment(&state, id).await?;
    if user.role == Role::Ranger && item.ranger_id.as_deref() != Some(user.id.as_str()) {
        return Err(AppError::Forbidden(
            "Equipment is not assigned to you".to_string(),
        ));
    }
    Ok(Json(item))
}

#[derive(Debug, Deserialize, Validate)]
struct EquipmentRequest {
    #[validate(length(min = 1, max = 50, message = "Inventory code is required"))]
    code: String,
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    name: String,
    #[validate(length(min = 1, max = 50, message = "Kind is required"))]
    kind: String,
    brand: Option<String>,
    model: Option<String>,
    serial: Option<String>,
    #[serde(default = "default_status")]
    status: EquipmentStatus,
    ranger_id: Option<String>,
    notes: Option<String>,
}

fn default_status() -> EquipmentStatus {
    EquipmentStatus::Operational
}

impl EquipmentRequest {
    async fn into_input(self, state: &AppState) -> Result<EquipmentInput> {
        self.validate()?;
        let ranger_id = match (self.status, self.ranger_id) {
            (EquipmentStatus::Retired, Some(_)) => {
                return Err(AppError::BadRequest(
                    "Retired equipment cannot be assigned".to_string(),
                ))
            }
            (_, Some(ranger_id)) => {
                match state.db.get_user(&ranger_id).await? {
                    Some(u) if u.is_assignable_ranger() => {}
                    _ => {
                        return Err(AppError::BadRequest(format!(
                            "{} is not an active ranger",
                            ranger_id
                        )))
                    }
                }
                Some(ranger_id)
            }
            (_, None) => None,
        };

        Ok(EquipmentInput {
            code: self.code.trim().to_string(),
            name: self.name.trim().to_string(),
            kind: self.kind.trim().to_string(),
            brand: self.brand,
            model: self.model,
            serial: self.serial,
            status: self.status,
            ranger_id,
            notes: self.notes,
        })
    }
}

async fn create_equipment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<EquipmentRequest>,
) -> Result<Json<Saved<Equipment>>> {
    require(&user, Module::Equipment, Action::Create)?;
    let input = payload.into_input(&state).await?;
    let item = state.db.insert_equipment(&input).await?;
    tracing::info!(equipment_id = item.id, code = %item.code, "Equipment registered");
    Ok(saved(item))
}

/// Full overwrite. Setting `retired` clears any assignment.
async fn update_equipment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(mut payload): Json<EquipmentRequest>,
) -> Result<Json<Saved<Equipment>>> {
    require(&user, Module::Equipment, Action::Edit)?;
    if payload.status == EquipmentStatus::Retired {
        payload.ranger_id = None;
    }
    let input = payload.into_input(&state).await?;
    let item = state.db.update_equipment(id, &input).await?;
    Ok(saved(item))
}

async fn delete_equipment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>> {
    require(&user, Module::Equipment, Action::Delete)?;
    state.db.delete_equipment(id).await?;
    tracing::info!(equipment_id = id, "Equipment deleted");
    Ok(message("Equipment deleted"))
}

async fn load_equipment(state: &AppState, id: i64) -> Result<Equipment> {
    state
        .db
        .get_equipment(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))
}

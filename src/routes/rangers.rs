// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Ranger (guardarecurso) personnel management.
//!
//! Everything here targets users with the `ranger` role only.

use super::users::{
    apply_user_update, check_area_assignment, load_user, register_user, CreateUserRequest,
    UpdateUserRequest,
};
use super::{saved, Saved};
use crate::db::UserFilter;
use crate::error::{AppError, Result};
use crate::extract::{Json, Path, Query};
use crate::middleware::AuthUser;
use crate::models::{Role, User, UserStatus};
use crate::services::{require, Action, Module};
use crate::AppState;
use axum::{
    extract::State,
    routing::{get, put},
    Extension, Router,
};
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/rangers", get(list_rangers).post(create_ranger))
        .route("/api/rangers/{id}", get(get_ranger).put(update_ranger))
        .route("/api/rangers/{id}/status", put(set_ranger_status))
        .route("/api/rangers/{id}/area", put(set_ranger_area))
}

#[derive(Deserialize)]
struct RangerListQuery {
    area_id: Option<i64>,
    status: Option<UserStatus>,
}

async fn list_rangers(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<RangerListQuery>,
) -> Result<Json<Vec<User>>> {
    require(&user, Module::Rangers, Action::View)?;
    let filter = UserFilter {
        role: Some(Role::Ranger),
        status: params.status,
        area_id: params.area_id,
    };
    Ok(Json(state.db.list_users(&filter).await?))
}

async fn get_ranger(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<User>> {
    require(&user, Module::Rangers, Action::View)?;
    Ok(Json(load_ranger(&state, &id).await?))
}

/// Register a ranger. Any `role` in the body is ignored.
async fn create_ranger(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<Json<Saved<User>>> {
    require(&user, Module::Rangers, Action::Create)?;
    let created = register_user(&state, payload, Role::Ranger).await?;
    Ok(saved(created))
}

async fn update_ranger(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<Saved<User>>> {
    require(&user, Module::Rangers, Action::Edit)?;
    let target = load_ranger(&state, &id).await?;
    let updated = apply_user_update(&state, &target, payload, Role::Ranger).await?;
    Ok(saved(updated))
}

#[derive(Deserialize)]
struct StatusRequest {
    status: UserStatus,
}

async fn set_ranger_status(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(payload): Json<StatusRequest>,
) -> Result<Json<Saved<User>>> {
    require(&user, Module::Rangers, Action::Edit)?;
    let target = load_ranger(&state, &id).await?;

    state.db.set_user_status(&target.id, payload.status).await?;
    tracing::info!(
        actor_id = %user.id,
        ranger_id = %target.id,
        from = %target.status,
        to = %payload.status,
        "Ranger status changed"
    );
    Ok(saved(load_user(&state, &target.id).await?))
}

#[derive(Deserialize)]
struct AreaAssignmentRequest {
    area_id: Option<i64>,
}

/// Assign a ranger to an active area, or unassign with `null`.
async fn set_ranger_area(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(payload): Json<AreaAssignmentRequest>,
) -> Result<Json<Saved<User>>> {
    require(&user, Module::Rangers, Action::Edit)?;
    let target = load_ranger(&state, &id).await?;
    check_area_assignment(&state, Role::Ranger, payload.area_id).await?;

    state.db.set_user_area(&target.id, payload.area_id).await?;
    tracing::info!(ranger_id = %target.id, area_id = ?payload.area_id, "Ranger area assignment changed");
    Ok(saved(load_user(&state, &target.id).await?))
}

async fn load_ranger(state: &AppState, id: &str) -> Result<User> {
    let user = load_user(state, id).await?;
    if user.role != Role::Ranger {
        return Err(AppError::NotFound(format!("Ranger {} not found", id)));
    }
    Ok(user)
}

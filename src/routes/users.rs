// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Caller profile, user administration and password changes.

use super::{message, saved, MessageResponse, Saved};
use crate::db::{NewUser, UserFilter, UserUpdate};
use crate::error::{AppError, Result};
use crate::extract::{Json, Path, Query};
use crate::middleware::AuthUser;
use crate::models::{Role, User, UserStatus};
use crate::services::passwords::{check_password_change, validate_password, PasswordParty};
use crate::services::permissions::matrix_for;
use crate::services::{require, Action, Module, Permissions};
use crate::AppState;
use axum::{
    extract::State,
    routing::{get, put},
    Extension, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/me/permissions", get(get_my_permissions))
        .route("/api/me/password", put(change_my_password))
        .route("/api/users", get(list_users).post(create_user))
        .route(
            "/api/users/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/api/users/{id}/password", put(change_user_password))
}

// ─── Current User ────────────────────────────────────────────

async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<User>> {
    Ok(Json(load_user(&state, &user.id).await?))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PermissionsResponse {
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub role: Role,
    #[cfg_attr(feature = "binding-generation", ts(type = "Record<string, unknown>"))]
    pub modules: BTreeMap<&'static str, Permissions>,
}

/// The caller's full permission matrix, so the client can hide affordances.
async fn get_my_permissions(
    Extension(user): Extension<AuthUser>,
) -> Result<Json<PermissionsResponse>> {
    let modules = matrix_for(user.role)
        .into_iter()
        .map(|(module, permissions)| (module.as_str(), permissions))
        .collect();
    Ok(Json(PermissionsResponse {
        role: user.role,
        modules,
    }))
}

#[derive(Deserialize)]
pub(crate) struct PasswordRequest {
    password: String,
}

async fn change_my_password(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<PasswordRequest>,
) -> Result<Json<MessageResponse>> {
    validate_password(&payload.password)?;
    state
        .auth_provider
        .update_password(&user.id, &payload.password)
        .await?;

    tracing::info!(user_id = %user.id, "Password changed");
    Ok(message("Password updated"))
}

/// Change another user's password on their behalf.
///
/// The role pairing is checked first: a forbidden pairing is rejected
/// whatever password was submitted.
async fn change_user_password(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(payload): Json<PasswordRequest>,
) -> Result<Json<MessageResponse>> {
    let target = load_user(&state, &id).await?;
    check_password_change(
        PasswordParty {
            id: &actor.id,
            role: actor.role,
        },
        PasswordParty {
            id: &target.id,
            role: target.role,
        },
    )?;
    validate_password(&payload.password)?;

    state
        .auth_provider
        .update_password(&target.id, &payload.password)
        .await?;

    tracing::info!(actor_id = %actor.id, target_id = %target.id, "Password changed on behalf of user");
    Ok(message("Password updated"))
}

// ─── User Administration ─────────────────────────────────────

#[derive(Deserialize)]
struct UserListQuery {
    role: Option<Role>,
    status: Option<UserStatus>,
}

async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<UserListQuery>,
) -> Result<Json<Vec<User>>> {
    require(&user, Module::Users, Action::View)?;
    let filter = UserFilter {
        role: params.role,
        status: params.status,
        area_id: None,
    };
    Ok(Json(state.db.list_users(&filter).await?))
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<User>> {
    require(&user, Module::Users, Action::View)?;
    Ok(Json(load_user(&state, &id).await?))
}

/// Account creation request (shared with ranger registration).
#[derive(Debug, Deserialize, Validate)]
pub(crate) struct CreateUserRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    pub password: String,
    #[validate(length(min = 1, max = 100, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "Last name is required"))]
    pub last_name: String,
    /// 13-digit national identity number
    #[validate(length(equal = 13, message = "DPI must have 13 digits"))]
    pub dpi: Option<String>,
    #[validate(length(min = 8, max = 20, message = "Invalid phone number"))]
    pub phone: Option<String>,
    pub role: Option<Role>,
    pub area_id: Option<i64>,
}

async fn create_user(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<Json<Saved<User>>> {
    require(&user, Module::Users, Action::Create)?;
    let role = payload
        .role
        .ok_or_else(|| AppError::BadRequest("'role' is required".to_string()))?;
    let created = register_user(&state, payload, role).await?;
    Ok(saved(created))
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct UpdateUserRequest {
    #[validate(length(min = 1, max = 100, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "Last name is required"))]
    pub last_name: String,
    #[validate(length(equal = 13, message = "DPI must have 13 digits"))]
    pub dpi: Option<String>,
    #[validate(length(min = 8, max = 20, message = "Invalid phone number"))]
    pub phone: Option<String>,
    pub role: Option<Role>,
    pub area_id: Option<i64>,
}

async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<Saved<User>>> {
    require(&actor, Module::Users, Action::Edit)?;
    let target = load_user(&state, &id).await?;

    if target.role == Role::Administrator && actor.role != Role::Administrator {
        return Err(AppError::Forbidden(
            "Only an administrator may edit an administrator".to_string(),
        ));
    }
    let role = payload.role.unwrap_or(target.role);
    if actor.id == target.id && target.role == Role::Administrator && role != Role::Administrator
    {
        return Err(AppError::BadRequest(
            "Administrators cannot change their own role".to_string(),
        ));
    }

    let updated = apply_user_update(&state, &target, payload, role).await?;
    tracing::info!(actor_id = %actor.id, user_id = %updated.id, role = %updated.role, "User updated");
    Ok(saved(updated))
}

/// Soft delete: the account is deactivated, never removed.
async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    require(&actor, Module::Users, Action::Delete)?;
    if actor.id == id {
        return Err(AppError::BadRequest(
            "You cannot deactivate your own account".to_string(),
        ));
    }
    let target = load_user(&state, &id).await?;
    if target.role == Role::Administrator {
        return Err(AppError::Forbidden(
            "Administrator accounts cannot be deleted".to_string(),
        ));
    }

    state
        .db
        .set_user_status(&target.id, UserStatus::Deactivated)
        .await?;
    tracing::info!(actor_id = %actor.id, user_id = %target.id, "User deactivated");
    Ok(message("User deactivated"))
}

// ─── Shared Helpers ──────────────────────────────────────────

pub(crate) async fn load_user(state: &AppState, id: &str) -> Result<User> {
    state
        .db
        .get_user(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
}

/// Areas are assigned to rangers only, and only when active.
pub(crate) async fn check_area_assignment(
    state: &AppState,
    role: Role,
    area_id: Option<i64>,
) -> Result<()> {
    let Some(area_id) = area_id else {
        return Ok(());
    };
    if role != Role::Ranger {
        return Err(AppError::BadRequest(
            "Only rangers can be assigned to an area".to_string(),
        ));
    }
    match state.db.get_area(area_id).await? {
        Some(area) if area.active => Ok(()),
        Some(_) => Err(AppError::BadRequest(format!(
            "Protected area {} is not active",
            area_id
        ))),
        None => Err(AppError::BadRequest(format!(
            "Protected area {} does not exist",
            area_id
        ))),
    }
}

/// Create the account at the auth provider, then the profile row.
pub(crate) async fn register_user(
    state: &AppState,
    payload: CreateUserRequest,
    role: Role,
) -> Result<User> {
    payload.validate()?;
    validate_password(&payload.password)?;
    check_area_assignment(state, role, payload.area_id).await?;

    let email = payload.email.trim().to_lowercase();
    if state.db.get_user_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict(
            "A user with this email already exists".to_string(),
        ));
    }

    let account = state
        .auth_provider
        .create_user(&email, &payload.password)
        .await?;

    let new_user = NewUser {
        id: account.id,
        email: account.email.unwrap_or(email),
        first_name: payload.first_name.trim().to_string(),
        last_name: payload.last_name.trim().to_string(),
        dpi: payload.dpi,
        phone: payload.phone,
        role,
        area_id: payload.area_id,
    };
    let created = match state.db.insert_user(&new_user).await {
        Ok(created) => created,
        Err(e) => {
            tracing::warn!(
                user_id = %new_user.id,
                error = %e,
                "Profile insert failed after auth account creation, removing account"
            );
            if let Err(cleanup) = state.auth_provider.delete_user(&new_user.id).await {
                tracing::error!(
                    user_id = %new_user.id,
                    error = %cleanup,
                    "Orphaned auth provider account must be deleted manually"
                );
            }
            return Err(e);
        }
    };

    tracing::info!(user_id = %created.id, role = %created.role, "User created");
    Ok(created)
}

pub(crate) async fn apply_user_update(
    state: &AppState,
    target: &User,
    payload: UpdateUserRequest,
    role: Role,
) -> Result<User> {
    payload.validate()?;
    // Changing away from ranger drops the area assignment.
    let area_id = if role == Role::Ranger {
        payload.area_id
    } else {
        None
    };
    if area_id != target.area_id {
        check_area_assignment(state, role, area_id).await?;
    }

    let update = UserUpdate {
        first_name: payload.first_name.trim().to_string(),
        last_name: payload.last_name.trim().to_string(),
        dpi: payload.dpi,
        phone: payload.phone,
        role,
        area_id,
    };
    state.db.update_user(&target.id, &update).await
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! First-run setup: catalog seeding and the initial administrator.

use crate::db::NewUser;
use crate::error::{AppError, Result};
use crate::extract::Json;
use crate::middleware::TokenUser;
use crate::models::{Role, UserStatus};
use crate::services::seed::{catalogs_seeded, seed_catalogs};
use crate::AppState;
use axum::{
    extract::State,
    routing::{get, post},
    Extension, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Routes that need no token at all.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/setup/status", get(get_status))
}

/// Routes that need a valid token but no profile row.
pub fn token_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/setup/init", post(init))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SetupStatus {
    pub catalogs_seeded: bool,
    pub administrator_exists: bool,
    /// Browser maps key, handed to the frontend as configured
    pub maps_api_key: Option<String>,
}

async fn get_status(State(state): State<Arc<AppState>>) -> Result<Json<SetupStatus>> {
    Ok(Json(SetupStatus {
        catalogs_seeded: catalogs_seeded(&state.db).await?,
        administrator_exists: state.db.administrator_exists().await?,
        maps_api_key: state.config.maps_api_key.clone(),
    }))
}

#[derive(Debug, Default, Deserialize, Validate)]
struct InitRequest {
    #[validate(length(min = 1, max = 100, message = "First name is required"))]
    first_name: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Last name is required"))]
    last_name: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    email: Option<String>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct InitResponse {
    pub success: bool,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub departments_added: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub ecosystems_added: u64,
    pub administrator_created: bool,
}

/// Seed catalogs (idempotent). While no administrator exists, the caller
/// becomes the first one; afterwards only administrators may re-run this.
async fn init(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<TokenUser>,
    Json(payload): Json<InitRequest>,
) -> Result<Json<InitResponse>> {
    payload.validate()?;
    let profile = state.db.get_user(&caller.id).await?;

    let administrator_created = if state.db.administrator_exists().await? {
        match &profile {
            Some(user) if user.role == Role::Administrator && user.status == UserStatus::Active => {
                false
            }
            _ => {
                return Err(AppError::Forbidden(
                    "Setup has already been completed".to_string(),
                ))
            }
        }
    } else {
        if profile.is_some() {
            return Err(AppError::Conflict(
                "Caller already has a profile".to_string(),
            ));
        }
        let email = payload
            .email
            .or(caller.email)
            .map(|e| e.trim().to_lowercase())
            .ok_or_else(|| AppError::BadRequest("An email is required".to_string()))?;

        let admin = state
            .db
            .insert_first_administrator(&NewUser {
                id: caller.id.clone(),
                email,
                first_name: payload.first_name.unwrap_or_else(|| "Administrador".to_string()),
                last_name: payload.last_name.unwrap_or_default(),
                dpi: None,
                phone: None,
                role: Role::Administrator,
                area_id: None,
            })
            .await?
            .ok_or_else(|| AppError::Forbidden("Setup has already been completed".to_string()))?;
        tracing::info!(user_id = %admin.id, "First administrator registered");
        true
    };

    let report = seed_catalogs(&state.db).await?;
    Ok(Json(InitResponse {
        success: true,
        departments_added: report.departments_added,
        ecosystems_added: report.ecosystems_added,
        administrator_created,
    }))
}

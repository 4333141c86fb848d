// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Dashboard counters.

use crate::error::Result;
use crate::extract::Json;
use crate::middleware::AuthUser;
use crate::models::{DashboardStats, Role};
use crate::services::{require, Action, Module};
use crate::AppState;
use axum::{extract::State, routing::get, Extension, Router};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/dashboard", get(get_dashboard))
}

/// Rangers get activity, finding and incident counts for their own rows.
async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<DashboardStats>> {
    require(&user, Module::Dashboard, Action::View)?;
    let scope = (user.role == Role::Ranger).then_some(user.id.as_str());
    Ok(Json(state.db.dashboard_stats(scope).await?))
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Visitor and park incidents.

use super::{message, saved, MessageResponse, Saved};
use crate::db::{IncidentInput, IncidentUpdate};
use crate::error::{AppError, Result};
use crate::extract::{Json, Path, Query};
use crate::middleware::AuthUser;
use crate::models::{
    valid_coordinates, FollowUp, Incident, IncidentCategory, IncidentStatus, Role, Severity,
};
use crate::services::{permissions_for, require, Action, Module};
use crate::time_utils::{format_region, parse_to_region, region_now_string};
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
        .route("/api/incidents", get(list_incidents).post(create_incident))
        .route(
            "/api/incidents/{id}",
            get(get_incident)
                .put(update_incident)
                .delete(delete_incident),
        )
        .route("/api/incidents/{id}/status", put(set_incident_status))
        .route(
            "/api/incidents/{id}/follow-ups",
            get(list_follow_ups).post(add_follow_up),
        )
}

#[derive(Deserialize)]
struct IncidentListQuery {
    status: Option<IncidentStatus>,
    area_id: Option<i64>,
}

async fn list_incidents(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<IncidentListQuery>,
) -> Result<Json<Vec<Incident>>> {
    require(&user, Module::Incidents, Action::View)?;
    let reported_by = (user.role == Role::Ranger).then_some(user.id.as_str());
    Ok(Json(
        state
            .db
            .list_incidents(reported_by, params.status, params.area_id)
            .await?,
    ))
}

#[derive(Serialize)]
pub struct IncidentDetail {
    #[serde(flatten)]
    pub incident: Incident,
    pub follow_ups: Vec<FollowUp>,
}

async fn get_incident(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<IncidentDetail>> {
    require(&user, Module::Incidents, Action::View)?;
    let incident = load_visible(&state, &user, id).await?;
    let follow_ups = state.db.list_incident_follow_ups(id).await?;
    Ok(Json(IncidentDetail {
        incident,
        follow_ups,
    }))
}

#[derive(Debug, Deserialize, Validate)]
struct IncidentRequest {
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    title: String,
    #[validate(length(min = 1, message = "Description is required"))]
    description: String,
    category: IncidentCategory,
    severity: Severity,
    area_id: Option<i64>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    #[serde(default)]
    #[validate(range(min = 0, max = 10000, message = "Invalid number of visitors"))]
    visitors_involved: i64,
    /// RFC3339; defaults to now
    occurred_at: Option<String>,
}

impl IncidentRequest {
    fn into_update(self, offset_hours: i32) -> Result<IncidentUpdate> {
        self.validate()?;
        match (self.latitude, self.longitude) {
            (None, None) => {}
            (Some(lat), Some(lng)) if valid_coordinates(lat, lng) => {}
            _ => return Err(AppError::BadRequest("Invalid coordinates".to_string())),
        }
        let occurred_at = match self.occurred_at.as_deref() {
            Some(raw) => parse_to_region(raw, offset_hours)
                .map(format_region)
                .ok_or_else(|| {
                    AppError::BadRequest("'occurred_at' must be an RFC3339 timestamp".to_string())
                })?,
            None => region_now_string(offset_hours),
        };

        Ok(IncidentUpdate {
            title: self.title.trim().to_string(),
            description: self.description,
            category: self.category,
            severity: self.severity,
            area_id: self.area_id,
            latitude: self.latitude,
            longitude: self.longitude,
            visitors_involved: self.visitors_involved,
            occurred_at,
        })
    }
}

async fn create_incident(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<IncidentRequest>,
) -> Result<Json<Saved<Incident>>> {
    require(&user, Module::Incidents, Action::Create)?;
    let fields = payload.into_update(state.config.region_utc_offset_hours)?;
    let input = IncidentInput {
        title: fields.title,
        description: fields.description,
        category: fields.category,
        severity: fields.severity,
        area_id: fields.area_id.or(user.area_id),
        latitude: fields.latitude,
        longitude: fields.longitude,
        visitors_involved: fields.visitors_involved,
        occurred_at: fields.occurred_at,
        reported_by: user.id.clone(),
    };

    let incident = state.db.insert_incident(&input).await?;
    tracing::info!(
        incident_id = incident.id,
        category = %incident.category,
        severity = %incident.severity,
        "Incident reported"
    );
    Ok(saved(incident))
}

async fn update_incident(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(payload): Json<IncidentRequest>,
) -> Result<Json<Saved<Incident>>> {
    require(&user, Module::Incidents, Action::Edit)?;
    let update = payload.into_update(state.config.region_utc_offset_hours)?;
    Ok(saved(state.db.update_incident(id, &update).await?))
}

#[derive(Deserialize)]
struct StatusRequest {
    status: IncidentStatus,
    note: Option<String>,
}

async fn set_incident_status(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(payload): Json<StatusRequest>,
) -> Result<Json<Saved<Incident>>> {
    require(&user, Module::Incidents, Action::Edit)?;
    let incident = load_incident(&state, id).await?;
    let note = payload.note.filter(|n| !n.trim().is_empty());
    advance(&state, &user, &incident, payload.status, note.as_deref()).await?;
    Ok(saved(load_incident(&state, id).await?))
}

async fn delete_incident(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>> {
    require(&user, Module::Incidents, Action::Delete)?;
    if !state.db.delete_incident(id).await? {
        return Err(AppError::NotFound(format!("Incident {} not found", id)));
    }
    tracing::info!(incident_id = id, "Incident deleted");
    Ok(message("Incident deleted"))
}

async fn list_follow_ups(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<FollowUp>>> {
    require(&user, Module::Incidents, Action::View)?;
    load_visible(&state, &user, id).await?;
    Ok(Json(state.db.list_incident_follow_ups(id).await?))
}

#[derive(Deserialize, Validate)]
struct FollowUpRequest {
    #[validate(length(min = 1, max = 2000, message = "Note is required"))]
    note: String,
    status: Option<IncidentStatus>,
}

async fn add_follow_up(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(payload): Json<FollowUpRequest>,
) -> Result<Json<Saved<Vec<FollowUp>>>> {
    payload.validate()?;
    let incident = load_incident(&state, id).await?;
    if incident.reported_by != user.id
        && !permissions_for(user.role, Module::Incidents).allows(Action::Edit)
    {
        return Err(AppError::Forbidden(
            "Only the reporter or an editor may follow up on this incident".to_string(),
        ));
    }

    match payload.status {
        Some(status) => {
            require(&user, Module::Incidents, Action::Edit)?;
            advance(&state, &user, &incident, status, Some(&payload.note)).await?
        }
        None => {
            state
                .db
                .insert_incident_follow_up(id, &user.id, &payload.note)
                .await?;
        }
    }
    Ok(saved(state.db.list_incident_follow_ups(id).await?))
}

// ─── Helpers ─────────────────────────────────────────────────

async fn load_incident(state: &AppState, id: i64) -> Result<Incident> {
    state
        .db
        .get_incident(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Incident {} not found", id)))
}

async fn load_visible(state: &AppState, user: &AuthUser, id: i64) -> Result<Incident> {
    let incident = load_incident(state, id).await?;
    if user.role == Role::Ranger && incident.reported_by != user.id {
        return Err(AppError::Forbidden(
            "Incident was reported by another user".to_string(),
        ));
    }
    Ok(incident)
}

async fn advance(
    state: &AppState,
    user: &AuthUser,
    incident: &Incident,
    to: IncidentStatus,
    note: Option<&str>,
) -> Result<()> {
    if !incident.status.can_transition_to(to) {
        return Err(AppError::Conflict(format!(
            "Incident {} cannot move from {} to {}",
            incident.id, incident.status, to
        )));
    }
    if !state
        .db
        .advance_incident(incident.id, incident.status, to, &user.id, note)
        .await?
    {
        return Err(AppError::Conflict(format!(
            "Incident {} changed concurrently; retry",
            incident.id
        )));
    }
    tracing::info!(incident_id = incident.id, from = %incident.status, to = %to, "Incident status changed");
    Ok(())
}

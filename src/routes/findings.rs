// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Findings (hallazgos): reports, status tracking, follow-ups and evidence.

use super::{message, saved, MessageResponse, Saved};
use crate::db::{NewEvidence, NewFinding};
use crate::error::{AppError, Result};
use crate::extract::{Json, Path, Query};
use crate::middleware::AuthUser;
use crate::models::{valid_coordinates, Evidence, Finding, FindingStatus, FollowUp, Role, Severity};
use crate::services::{permissions_for, require, Action, Module};
use crate::AppState;
use axum::{
    extract::State,
    routing::{get, post, put},
    Extension, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/findings", get(list_findings).post(create_finding))
        .route(
            "/api/findings/{id}",
            get(get_finding).delete(delete_finding),
        )
        .route("/api/findings/{id}/status", put(set_finding_status))
        .route(
            "/api/findings/{id}/follow-ups",
            get(list_follow_ups).post(add_follow_up),
        )
        .route("/api/findings/{id}/evidence", post(add_evidence))
}

#[derive(Deserialize)]
struct FindingListQuery {
    status: Option<FindingStatus>,
    activity_id: Option<i64>,
}

/// Rangers only list the findings they reported.
async fn list_findings(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<FindingListQuery>,
) -> Result<Json<Vec<Finding>>> {
    require(&user, Module::Findings, Action::View)?;
    let reported_by = (user.role == Role::Ranger).then_some(user.id.as_str());
    Ok(Json(
        state
            .db
            .list_findings(reported_by, params.status, params.activity_id)
            .await?,
    ))
}

#[derive(Serialize)]
pub struct FindingDetail {
    #[serde(flatten)]
    pub finding: Finding,
    pub follow_ups: Vec<FollowUp>,
    pub evidence: Vec<Evidence>,
}

async fn get_finding(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<FindingDetail>> {
    require(&user, Module::Findings, Action::View)?;
    let finding = load_visible(&state, &user, id).await?;
    let follow_ups = state.db.list_finding_follow_ups(id).await?;
    let evidence = state.db.list_evidence_for_finding(id).await?;
    Ok(Json(FindingDetail {
        finding,
        follow_ups,
        evidence,
    }))
}

#[derive(Debug, Deserialize, Validate)]
struct CreateFindingRequest {
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    title: String,
    #[validate(length(min = 1, message = "Description is required"))]
    description: String,
    category: Option<String>,
    severity: Severity,
    latitude: Option<f64>,
    longitude: Option<f64>,
    activity_id: Option<i64>,
    area_id: Option<i64>,
}

async fn create_finding(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateFindingRequest>,
) -> Result<Json<Saved<Finding>>> {
    require(&user, Module::Findings, Action::Create)?;
    payload.validate()?;
    match (payload.latitude, payload.longitude) {
        (None, None) => {}
        (Some(lat), Some(lng)) if valid_coordinates(lat, lng) => {}
        _ => return Err(AppError::BadRequest("Invalid coordinates".to_string())),
    }

    // Linked to an activity: go through the lifecycle rules for it.
    if let Some(activity_id) = payload.activity_id {
        let finding = NewFinding {
            title: payload.title.trim().to_string(),
            description: payload.description,
            category: payload.category,
            severity: payload.severity,
            latitude: payload.latitude,
            longitude: payload.longitude,
            activity_id: Some(activity_id),
            area_id: payload.area_id,
            reported_by: user.id.clone(),
        };
        let created = state
            .activities
            .add_finding(&user, activity_id, finding)
            .await?;
        return Ok(saved(created));
    }

    let area_id = payload.area_id.or(user.area_id);
    let finding = NewFinding {
        title: payload.title.trim().to_string(),
        description: payload.description,
        category: payload.category,
        severity: payload.severity,
        latitude: payload.latitude,
        longitude: payload.longitude,
        activity_id: None,
        area_id,
        reported_by: user.id.clone(),
    };
    let created = state.db.insert_finding(&finding).await?;
    tracing::info!(finding_id = created.id, severity = %created.severity, "Finding reported");
    Ok(saved(created))
}

#[derive(Deserialize)]
struct StatusRequest {
    status: FindingStatus,
    note: Option<String>,
}

async fn set_finding_status(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(payload): Json<StatusRequest>,
) -> Result<Json<Saved<Finding>>> {
    require(&user, Module::Findings, Action::Edit)?;
    let finding = load_finding(&state, id).await?;
    let note = payload
        .note
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| format!("Status changed to {}", payload.status));
    advance(&state, &user, &finding, payload.status, &note).await?;
    Ok(saved(load_finding(&state, id).await?))
}

async fn delete_finding(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>> {
    require(&user, Module::Findings, Action::Delete)?;
    if !state.db.delete_finding(id).await? {
        return Err(AppError::NotFound(format!("Finding {} not found", id)));
    }
    tracing::info!(finding_id = id, "Finding deleted");
    Ok(message("Finding deleted"))
}

async fn list_follow_ups(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<FollowUp>>> {
    require(&user, Module::Findings, Action::View)?;
    load_visible(&state, &user, id).await?;
    Ok(Json(state.db.list_finding_follow_ups(id).await?))
}

#[derive(Deserialize, Validate)]
struct FollowUpRequest {
    #[validate(length(min = 1, max = 2000, message = "Note is required"))]
    note: String,
    status: Option<FindingStatus>,
}

/// Add a follow-up note, optionally moving the finding forward (editors only).
async fn add_follow_up(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(payload): Json<FollowUpRequest>,
) -> Result<Json<Saved<Vec<FollowUp>>>> {
    payload.validate()?;
    let finding = load_finding(&state, id).await?;
    ensure_editor_or_reporter(&user, &finding)?;

    match payload.status {
        Some(status) => {
            // Reporters may add notes; moving the status needs edit rights.
            require(&user, Module::Findings, Action::Edit)?;
            advance(&state, &user, &finding, status, &payload.note).await?
        }
        None => {
            state
                .db
                .insert_finding_follow_up(id, &user.id, &payload.note)
                .await?;
        }
    }
    Ok(saved(state.db.list_finding_follow_ups(id).await?))
}

#[derive(Deserialize, Validate)]
struct EvidenceRequest {
    #[validate(url(message = "Evidence must be a URL"))]
    url: String,
    description: Option<String>,
}

async fn add_evidence(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(payload): Json<EvidenceRequest>,
) -> Result<Json<Saved<Evidence>>> {
    payload.validate()?;
    let finding = load_finding(&state, id).await?;
    ensure_editor_or_reporter(&user, &finding)?;

    let evidence = state
        .db
        .insert_evidence(&NewEvidence {
            activity_id: None,
            finding_id: Some(id),
            url: payload.url,
            description: payload.description,
            uploaded_by: user.id.clone(),
        })
        .await?;
    Ok(saved(evidence))
}

// ─── Helpers ─────────────────────────────────────────────────

async fn load_finding(state: &AppState, id: i64) -> Result<Finding> {
    state
        .db
        .get_finding(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Finding {} not found", id)))
}

async fn load_visible(state: &AppState, user: &AuthUser, id: i64) -> Result<Finding> {
    let finding = load_finding(state, id).await?;
    if user.role == Role::Ranger && finding.reported_by != user.id {
        return Err(AppError::Forbidden(
            "Finding was reported by another user".to_string(),
        ));
    }
    Ok(finding)
}

fn ensure_editor_or_reporter(user: &AuthUser, finding: &Finding) -> Result<()> {
    if finding.reported_by == user.id
        || permissions_for(user.role, Module::Findings).allows(Action::Edit)
    {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Only the reporter or an editor may follow up on this finding".to_string(),
        ))
    }
}

/// Forward-only status change with its follow-up note.
async fn advance(
    state: &AppState,
    user: &AuthUser,
    finding: &Finding,
    to: FindingStatus,
    note: &str,
) -> Result<()> {
    if !finding.status.can_transition_to(to) {
        return Err(AppError::Conflict(format!(
            "Finding {} cannot move from {} to {}",
            finding.id, finding.status, to
        )));
    }
    if !state
        .db
        .advance_finding(finding.id, finding.status, to, &user.id, note)
        .await?
    {
        return Err(AppError::Conflict(format!(
            "Finding {} changed concurrently; retry",
            finding.id
        )));
    }
    tracing::info!(finding_id = finding.id, from = %finding.status, to = %to, "Finding status changed");
    Ok(())
}

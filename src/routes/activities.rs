// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Field activity routes: planning, field execution, GPS tracks and the
//! live activity feed.

use super::{message, saved, MessageResponse, Saved};
use crate::db::{
    ActivityCursor, ActivityFilter, ActivityUpdate, FinishData, NewActivity, NewEvidence,
    NewFinding,
};
use crate::error::{AppError, Result};
use crate::extract::{Json, Path, Query};
use crate::middleware::AuthUser;
use crate::models::{
    Activity, ActivityCategory, ActivityStatus, Evidence, Finding, GeolocationPoint, Role,
    Severity,
};
use crate::services::track::TrackSummary;
use crate::services::{require, Action, ImportReport, Module};
use crate::time_utils::{format_region, parse_to_region};
use crate::AppState;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::{delete, get, post, put},
    Extension, Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use futures_util::Stream;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/activities", get(list_activities).post(create_activity))
        .route("/api/activities/bulk", post(bulk_import))
        .route("/api/activities/events", get(activity_events))
        .route(
            "/api/activities/{id}",
            get(get_activity)
                .put(update_activity)
                .delete(delete_activity),
        )
        .route("/api/activities/{id}/cancel", put(cancel_activity))
        .route("/api/activities/{id}/start", put(start_activity))
        .route("/api/activities/{id}/finish", put(finish_activity))
        .route(
            "/api/activities/{id}/points",
            get(list_points).post(append_point),
        )
        .route(
            "/api/activities/{id}/points/{point_id}",
            delete(delete_point),
        )
        .route("/api/activities/{id}/track", get(get_track))
        .route("/api/activities/{id}/findings", post(add_finding))
        .route(
            "/api/activities/{id}/findings/{finding_id}",
            delete(remove_finding),
        )
}

// ─── Listing ─────────────────────────────────────────────────

#[derive(Deserialize)]
struct ActivitiesQuery {
    status: Option<ActivityStatus>,
    ranger_id: Option<String>,
    category: Option<String>,
    /// RFC3339 lower bound on `scheduled_at` (inclusive)
    from: Option<String>,
    /// RFC3339 upper bound on `scheduled_at` (inclusive)
    to: Option<String>,
    cursor: Option<String>,
    #[serde(default = "default_per_page")]
    per_page: u32,
}

fn default_per_page() -> u32 {
    50
}

const MAX_PER_PAGE: u32 = 100;

fn parse_bound(raw: Option<&str>, name: &str, offset_hours: i32) -> Result<Option<String>> {
    raw.map(|value| {
        parse_to_region(value, offset_hours)
            .map(format_region)
            .ok_or_else(|| AppError::BadRequest(format!("Invalid '{}' parameter", name)))
    })
    .transpose()
}

/// Cursor is `scheduled_at:id`; the timestamp itself contains colons, so
/// the id is split off from the right.
fn parse_cursor(cursor: Option<&str>) -> Result<Option<ActivityCursor>> {
    cursor
        .map(|raw| {
            let invalid_cursor = || AppError::BadRequest("Invalid 'cursor' parameter".to_string());

            let decoded = URL_SAFE_NO_PAD.decode(raw).map_err(|_| invalid_cursor())?;
            let decoded_str = std::str::from_utf8(&decoded).map_err(|_| invalid_cursor())?;
            let (scheduled_at, id) = decoded_str.rsplit_once(':').ok_or_else(invalid_cursor)?;
            let id = id.parse::<i64>().map_err(|_| invalid_cursor())?;
            if chrono::DateTime::parse_from_rfc3339(scheduled_at).is_err() {
                return Err(invalid_cursor());
            }

            Ok(ActivityCursor {
                scheduled_at: scheduled_at.to_string(),
                id,
            })
        })
        .transpose()
}

fn encode_cursor(cursor: &ActivityCursor) -> String {
    URL_SAFE_NO_PAD.encode(format!("{}:{}", cursor.scheduled_at, cursor.id))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActivitiesResponse {
    #[cfg_attr(feature = "binding-generation", ts(type = "Array<unknown>"))]
    pub activities: Vec<Activity>,
    pub per_page: u32,
    pub next_cursor: Option<String>,
}

/// List activities newest first. Rangers only see their own.
async fn list_activities(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<ActivitiesQuery>,
) -> Result<Json<ActivitiesResponse>> {
    require(&user, Module::ActivityPlanning, Action::View)?;
    tracing::debug!(
        user_id = %user.id,
        cursor = ?params.cursor,
        per_page = params.per_page,
        "Fetching activities"
    );

    let limit = params.per_page.clamp(1, MAX_PER_PAGE);
    let cursor = parse_cursor(params.cursor.as_deref())?;
    let offset = state.config.region_utc_offset_hours;

    let category = params
        .category
        .as_deref()
        .map(|raw| {
            ActivityCategory::lookup(raw)
                .ok_or_else(|| AppError::BadRequest("Invalid 'category' parameter".to_string()))
        })
        .transpose()?;
    let ranger_id = match user.role {
        Role::Ranger => Some(user.id.clone()),
        _ => params.ranger_id,
    };

    let filter = ActivityFilter {
        status: params.status,
        ranger_id,
        category,
        from: parse_bound(params.from.as_deref(), "from", offset)?,
        to: parse_bound(params.to.as_deref(), "to", offset)?,
    };

    let (activities, next) = state
        .db
        .list_activities(&filter, cursor.as_ref(), limit)
        .await?;

    Ok(Json(ActivitiesResponse {
        activities,
        per_page: limit,
        next_cursor: next.as_ref().map(encode_cursor),
    }))
}

#[derive(Serialize)]
pub struct ActivityDetail {
    #[serde(flatten)]
    pub activity: Activity,
    pub points: Vec<GeolocationPoint>,
    pub findings: Vec<Finding>,
    pub evidence: Vec<Evidence>,
}

async fn get_activity(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<ActivityDetail>> {
    require(&user, Module::ActivityPlanning, Action::View)?;
    let activity = state.activities.visible(&user, id).await?;
    let points = state.db.list_points(id).await?;
    let findings = state.db.list_findings(None, None, Some(id)).await?;
    let evidence = state.db.list_evidence_for_activity(id).await?;

    Ok(Json(ActivityDetail {
        activity,
        points,
        findings,
        evidence,
    }))
}

// ─── Planning ────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
struct ActivityRequest {
    category: String,
    #[validate(length(min = 1, max = 2000, message = "Description is required"))]
    description: String,
    scheduled_at: String,
    #[validate(length(min = 1, message = "Ranger is required"))]
    ranger_id: String,
    area_id: Option<i64>,
    start_latitude: Option<f64>,
    start_longitude: Option<f64>,
    notes: Option<String>,
}

impl ActivityRequest {
    fn category(&self) -> Result<ActivityCategory> {
        ActivityCategory::lookup(&self.category).ok_or_else(|| {
            AppError::BadRequest(format!("Unknown activity category '{}'", self.category))
        })
    }

    fn scheduled_at(&self, offset_hours: i32) -> Result<String> {
        parse_to_region(&self.scheduled_at, offset_hours)
            .map(format_region)
            .ok_or_else(|| {
                AppError::BadRequest("'scheduled_at' must be an RFC3339 timestamp".to_string())
            })
    }
}

async fn create_activity(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<ActivityRequest>,
) -> Result<Json<Saved<Activity>>> {
    require(&user, Module::ActivityPlanning, Action::Create)?;
    payload.validate()?;

    let activity = NewActivity {
        category: payload.category()?,
        scheduled_at: payload.scheduled_at(state.config.region_utc_offset_hours)?,
        description: payload.description.trim().to_string(),
        ranger_id: payload.ranger_id,
        area_id: payload.area_id,
        start_latitude: payload.start_latitude,
        start_longitude: payload.start_longitude,
        created_by: None,
    };
    Ok(saved(state.activities.create(&user, activity).await?))
}

async fn update_activity(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(payload): Json<ActivityRequest>,
) -> Result<Json<Saved<Activity>>> {
    require(&user, Module::ActivityPlanning, Action::Edit)?;
    payload.validate()?;

    let update = ActivityUpdate {
        category: payload.category()?,
        scheduled_at: payload.scheduled_at(state.config.region_utc_offset_hours)?,
        description: payload.description.trim().to_string(),
        ranger_id: payload.ranger_id,
        area_id: payload.area_id,
        notes: payload.notes,
    };
    Ok(saved(state.activities.update(id, update).await?))
}

async fn cancel_activity(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<Saved<Activity>>> {
    require(&user, Module::ActivityPlanning, Action::Edit)?;
    Ok(saved(state.activities.cancel(id).await?))
}

async fn delete_activity(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>> {
    require(&user, Module::ActivityPlanning, Action::Delete)?;
    state.activities.delete(id).await?;
    Ok(message("Activity deleted"))
}

/// CSV body: `category,description,scheduled_at,ranger_email[,area_id]`.
async fn bulk_import(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    body: String,
) -> Result<Json<Saved<ImportReport>>> {
    require(&user, Module::ActivityPlanning, Action::Create)?;
    Ok(saved(state.activities.bulk_import(&user, &body).await?))
}

// ─── Field Execution ─────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct PositionRequest {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

async fn start_activity(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    payload: Option<Json<PositionRequest>>,
) -> Result<Json<Saved<Activity>>> {
    require(&user, Module::DailyLog, Action::Edit)?;
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    let started = state
        .activities
        .start(&user, id, payload.latitude, payload.longitude)
        .await?;
    Ok(saved(started))
}

#[derive(Debug, Deserialize)]
struct PointRequest {
    latitude: f64,
    longitude: f64,
    accuracy_meters: Option<f64>,
}

async fn append_point(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(payload): Json<PointRequest>,
) -> Result<Json<Saved<GeolocationPoint>>> {
    require(&user, Module::DailyLog, Action::Edit)?;
    let point = state
        .activities
        .append_point(
            &user,
            id,
            payload.latitude,
            payload.longitude,
            payload.accuracy_meters,
        )
        .await?;
    Ok(saved(point))
}

async fn list_points(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<GeolocationPoint>>> {
    require(&user, Module::Routes, Action::View)?;
    state.activities.visible(&user, id).await?;
    Ok(Json(state.db.list_points(id).await?))
}

async fn delete_point(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((id, point_id)): Path<(i64, i64)>,
) -> Result<Json<MessageResponse>> {
    state.activities.delete_point(&user, id, point_id).await?;
    Ok(message("Point deleted"))
}

async fn get_track(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<TrackSummary>> {
    require(&user, Module::Routes, Action::View)?;
    Ok(Json(state.activities.track(&user, id).await?))
}

#[derive(Debug, Deserialize, Validate)]
struct FindingRequest {
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    title: String,
    #[validate(length(min = 1, message = "Description is required"))]
    description: String,
    category: Option<String>,
    severity: Severity,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

impl FindingRequest {
    /// Reporter and activity are filled in by the lifecycle service.
    fn into_new_finding(self) -> Result<NewFinding> {
        self.validate()?;
        Ok(NewFinding {
            title: self.title.trim().to_string(),
            description: self.description,
            category: self.category,
            severity: self.severity,
            latitude: self.latitude,
            longitude: self.longitude,
            activity_id: None,
            area_id: None,
            reported_by: String::new(),
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
struct EvidenceRequest {
    #[validate(url(message = "Evidence must be a URL"))]
    url: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FinishRequest {
    end_latitude: Option<f64>,
    end_longitude: Option<f64>,
    notes: Option<String>,
    #[serde(default)]
    findings: Vec<FindingRequest>,
    #[serde(default)]
    evidence: Vec<EvidenceRequest>,
}

#[derive(Serialize)]
pub struct FinishResult {
    pub activity: Activity,
    pub finding_ids: Vec<i64>,
}

/// Complete the activity. Findings and evidence are stored together with
/// the status change or not at all.
async fn finish_activity(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(payload): Json<FinishRequest>,
) -> Result<Json<Saved<FinishResult>>> {
    require(&user, Module::DailyLog, Action::Edit)?;

    let findings = payload
        .findings
        .into_iter()
        .map(FindingRequest::into_new_finding)
        .collect::<Result<Vec<_>>>()?;
    let evidence = payload
        .evidence
        .into_iter()
        .map(|e| -> Result<NewEvidence> {
            e.validate()?;
            Ok(NewEvidence {
                activity_id: Some(id),
                finding_id: None,
                url: e.url,
                description: e.description,
                uploaded_by: String::new(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let data = FinishData {
        end_latitude: payload.end_latitude,
        end_longitude: payload.end_longitude,
        notes: payload.notes,
        findings,
        evidence,
    };
    let (activity, finding_ids) = state.activities.finish(&user, id, data).await?;
    Ok(saved(FinishResult {
        activity,
        finding_ids,
    }))
}

async fn add_finding(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(payload): Json<FindingRequest>,
) -> Result<Json<Saved<Finding>>> {
    require(&user, Module::Findings, Action::Create)?;
    let finding = payload.into_new_finding()?;
    Ok(saved(state.activities.add_finding(&user, id, finding).await?))
}

async fn remove_finding(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((id, finding_id)): Path<(i64, i64)>,
) -> Result<Json<MessageResponse>> {
    require(&user, Module::Findings, Action::Delete)?;
    state.activities.remove_finding(id, finding_id).await?;
    Ok(message("Finding deleted"))
}

// ─── Live Feed ───────────────────────────────────────────────

/// Server-Sent Events stream of activity changes. Rangers only receive
/// events for their own activities.
async fn activity_events(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    require(&user, Module::ActivityPlanning, Action::View)?;

    let receiver = state.activity_feed.subscribe();
    let only_ranger = (user.role == Role::Ranger).then(|| user.id.clone());
    tracing::debug!(user_id = %user.id, "Activity feed subscriber connected");

    let stream = futures_util::stream::unfold(
        (receiver, only_ranger),
        |(mut receiver, only_ranger)| async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => {
                        if only_ranger
                            .as_deref()
                            .is_some_and(|id| id != event.ranger_id)
                        {
                            continue;
                        }
                        let sse = match Event::default().event(event.kind.as_str()).json_data(&event)
                        {
                            Ok(sse) => sse,
                            Err(e) => {
                                tracing::warn!(error = %e, "Failed to encode activity event");
                                continue;
                            }
                        };
                        return Some((Ok(sse), (receiver, only_ranger)));
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "Activity feed subscriber lagged");
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        },
    );

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_round_trip() {
        let cursor = ActivityCursor {
            scheduled_at: "2026-03-01T08:00:00.000-06:00".to_string(),
            id: 42,
        };

        let encoded = encode_cursor(&cursor);
        let decoded = parse_cursor(Some(&encoded)).unwrap().unwrap();

        assert_eq!(decoded, cursor);
    }

    #[test]
    fn test_cursor_rejects_invalid_input() {
        let err = parse_cursor(Some("not-base64!")).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let no_id = URL_SAFE_NO_PAD.encode("2026-03-01T08:00:00.000-06:00");
        assert!(parse_cursor(Some(&no_id)).is_err());

        let bad_time = URL_SAFE_NO_PAD.encode("yesterday:7");
        assert!(parse_cursor(Some(&bad_time)).is_err());
    }

    #[test]
    fn test_missing_cursor_is_first_page() {
        assert!(parse_cursor(None).unwrap().is_none());
    }

    #[test]
    fn test_bounds_are_normalised_to_region() {
        let bound = parse_bound(Some("2026-03-01T18:00:00Z"), "from", -6).unwrap();
        assert_eq!(bound.as_deref(), Some("2026-03-01T12:00:00.000-06:00"));
        assert!(parse_bound(Some("tomorrow"), "to", -6).is_err());
    }
}

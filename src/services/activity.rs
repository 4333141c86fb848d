// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Field activity lifecycle.
//!
//! Handles the workflow:
//! 1. Planners create, edit, cancel or delete `scheduled` activities
//! 2. The assigned ranger starts one activity at a time
//! 3. GPS points are appended while it is `in_progress`
//! 4. Finishing records findings and evidence atomically
//!
//! Every successful write is published on the activity feed.

use crate::db::{ActivityUpdate, Db, FinishData, NewActivity, NewFinding};
use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::{
    valid_coordinates, Activity, ActivityStatus, AreaBoundary, Finding, GeolocationPoint, Role,
};
use crate::services::bulk_import::{parse_activity_csv, RowError};
use crate::services::feed::{ActivityEvent, ActivityEventKind, ActivityFeed};
use crate::services::permissions::{permissions_for, Action, Module};
use crate::services::track::{summarize, TrackSummary};
use crate::time_utils::{format_region, region_now_string};
use serde::Serialize;
use std::sync::Arc;

/// Outcome of a bulk import.
#[derive(Debug, Serialize)]
pub struct ImportReport {
    pub created: Vec<i64>,
    pub errors: Vec<RowError>,
}

/// Activity lifecycle operations.
#[derive(Clone)]
pub struct ActivityService {
    db: Db,
    feed: Arc<ActivityFeed>,
}

impl ActivityService {
    pub fn new(db: Db, feed: Arc<ActivityFeed>) -> Self {
        Self { db, feed }
    }

    // ─── Planning ────────────────────────────────────────────────

    pub async fn create(&self, actor: &AuthUser, mut activity: NewActivity) -> Result<Activity> {
        self.check_assignee(&activity.ranger_id).await?;
        self.check_area(activity.area_id).await?;
        check_optional_coordinates(activity.start_latitude, activity.start_longitude)?;
        activity.created_by = Some(actor.id.clone());

        let created = self.db.insert_activity(&activity).await?;
        tracing::info!(
            activity_id = created.id,
            ranger_id = %created.ranger_id,
            category = %created.category,
            "Activity scheduled"
        );
        self.publish(&created, ActivityEventKind::Created);
        Ok(created)
    }

    pub async fn update(&self, id: i64, update: ActivityUpdate) -> Result<Activity> {
        let current = self.load(id).await?;
        if current.status != ActivityStatus::Scheduled {
            return Err(AppError::Conflict(format!(
                "Activity {} is {}; only scheduled activities can be edited",
                id, current.status
            )));
        }
        if update.ranger_id != current.ranger_id {
            self.check_assignee(&update.ranger_id).await?;
        }
        self.check_area(update.area_id).await?;

        let updated = self.db.update_activity(id, &update).await?;
        self.publish(&updated, ActivityEventKind::Updated);
        Ok(updated)
    }

    pub async fn cancel(&self, id: i64) -> Result<Activity> {
        let current = self.load(id).await?;
        self.ensure_transition(&current, ActivityStatus::Cancelled)?;

        if !self
            .db
            .transition_activity(id, ActivityStatus::Scheduled, ActivityStatus::Cancelled)
            .await?
        {
            return Err(stale(id));
        }
        let cancelled = self.load(id).await?;
        tracing::info!(activity_id = id, "Activity cancelled");
        self.publish(&cancelled, ActivityEventKind::Cancelled);
        Ok(cancelled)
    }

    /// Delete a `scheduled` or `cancelled` activity.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let current = self.load(id).await?;
        if !matches!(
            current.status,
            ActivityStatus::Scheduled | ActivityStatus::Cancelled
        ) {
            return Err(AppError::Conflict(format!(
                "Activity {} is {}; only scheduled or cancelled activities can be deleted",
                id, current.status
            )));
        }
        if !self.db.delete_activity(id).await? {
            return Err(stale(id));
        }
        tracing::info!(activity_id = id, "Activity deleted");
        self.publish(&current, ActivityEventKind::Deleted);
        Ok(())
    }

    // ─── Field Execution ─────────────────────────────────────────

    /// `scheduled` → `in_progress` for the assigned ranger.
    pub async fn start(
        &self,
        actor: &AuthUser,
        id: i64,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Result<Activity> {
        let current = self.load(id).await?;
        ensure_assigned(actor, &current)?;
        self.ensure_transition(&current, ActivityStatus::InProgress)?;
        check_optional_coordinates(latitude, longitude)?;

        if let Some(running) = self.db.find_in_progress_for_ranger(&actor.id).await? {
            return Err(AppError::Conflict(format!(
                "Activity {} is already in progress",
                running.id
            )));
        }

        let started_at = region_now_string(self.db.region_offset_hours());
        if !self
            .db
            .start_activity(id, &started_at, latitude, longitude)
            .await?
        {
            return Err(stale(id));
        }

        let started = self.load(id).await?;
        tracing::info!(activity_id = id, ranger_id = %actor.id, "Activity started");
        self.publish(&started, ActivityEventKind::Started);
        Ok(started)
    }

    pub async fn append_point(
        &self,
        actor: &AuthUser,
        id: i64,
        latitude: f64,
        longitude: f64,
        accuracy_meters: Option<f64>,
    ) -> Result<GeolocationPoint> {
        if !valid_coordinates(latitude, longitude) {
            return Err(AppError::BadRequest("Invalid coordinates".to_string()));
        }
        if accuracy_meters.is_some_and(|a| !a.is_finite() || a < 0.0) {
            return Err(AppError::BadRequest("Invalid accuracy".to_string()));
        }

        let current = self.load(id).await?;
        ensure_assigned(actor, &current)?;

        let point = self
            .db
            .insert_point(id, latitude, longitude, accuracy_meters)
            .await?
            .ok_or_else(|| not_in_progress(id))?;

        tracing::debug!(activity_id = id, point_id = point.id, "GPS point recorded");
        self.publish(&current, ActivityEventKind::PointAdded);
        Ok(point)
    }

    /// Remove a point: the assigned ranger while in progress, or a planner
    /// allowed to delete activities.
    pub async fn delete_point(&self, actor: &AuthUser, id: i64, point_id: i64) -> Result<()> {
        let current = self.load(id).await?;
        let is_owner_in_progress =
            actor.id == current.ranger_id && current.status == ActivityStatus::InProgress;
        let is_planner =
            permissions_for(actor.role, Module::ActivityPlanning).allows(Action::Delete);
        if !is_owner_in_progress && !is_planner {
            return Err(AppError::Forbidden(
                "Not allowed to delete points of this activity".to_string(),
            ));
        }

        if !self.db.delete_point(id, point_id).await? {
            return Err(AppError::NotFound(format!(
                "Point {} not found in activity {}",
                point_id, id
            )));
        }
        Ok(())
    }

    /// `in_progress` → `completed`, with findings and evidence in one
    /// transaction. Returns the activity and the new finding ids.
    pub async fn finish(
        &self,
        actor: &AuthUser,
        id: i64,
        mut data: FinishData,
    ) -> Result<(Activity, Vec<i64>)> {
        let current = self.load(id).await?;
        ensure_assigned(actor, &current)?;
        self.ensure_transition(&current, ActivityStatus::Completed)?;
        check_optional_coordinates(data.end_latitude, data.end_longitude)?;

        for finding in &mut data.findings {
            check_optional_coordinates(finding.latitude, finding.longitude)?;
            finding.reported_by = actor.id.clone();
            finding.area_id = finding.area_id.or(current.area_id);
        }
        for evidence in &mut data.evidence {
            evidence.uploaded_by = actor.id.clone();
        }

        let finished_at = region_now_string(self.db.region_offset_hours());
        let finding_ids = self.db.finish_activity(id, &finished_at, &data).await?;

        let finished = self.load(id).await?;
        tracing::info!(
            activity_id = id,
            findings = finding_ids.len(),
            evidence = data.evidence.len(),
            "Activity finished"
        );
        self.publish(&finished, ActivityEventKind::Finished);
        Ok((finished, finding_ids))
    }

    /// Attach a finding to an in-progress or completed activity.
    pub async fn add_finding(
        &self,
        actor: &AuthUser,
        id: i64,
        mut finding: NewFinding,
    ) -> Result<Finding> {
        let current = self.visible(actor, id).await?;
        if actor.role == Role::Ranger {
            ensure_assigned(actor, &current)?;
        }
        if !matches!(
            current.status,
            ActivityStatus::InProgress | ActivityStatus::Completed
        ) {
            return Err(AppError::Conflict(format!(
                "Findings can only be added to in-progress or completed activities (activity {} is {})",
                id, current.status
            )));
        }
        check_optional_coordinates(finding.latitude, finding.longitude)?;

        finding.activity_id = Some(id);
        finding.area_id = finding.area_id.or(current.area_id);
        finding.reported_by = actor.id.clone();
        self.db.insert_finding(&finding).await
    }

    pub async fn remove_finding(&self, id: i64, finding_id: i64) -> Result<()> {
        let finding = self
            .db
            .get_finding(finding_id)
            .await?
            .filter(|f| f.activity_id == Some(id))
            .ok_or_else(|| {
                AppError::NotFound(format!("Finding {} not found in activity {}", finding_id, id))
            })?;
        self.db.delete_finding(finding.id).await?;
        Ok(())
    }

    // ─── Reads ───────────────────────────────────────────────────

    /// Load an activity the actor may see. Rangers only see their own.
    pub async fn visible(&self, actor: &AuthUser, id: i64) -> Result<Activity> {
        let activity = self.load(id).await?;
        if actor.role == Role::Ranger && activity.ranger_id != actor.id {
            return Err(AppError::Forbidden(
                "Activity is assigned to another ranger".to_string(),
            ));
        }
        Ok(activity)
    }

    pub async fn track(&self, actor: &AuthUser, id: i64) -> Result<TrackSummary> {
        let activity = self.visible(actor, id).await?;
        let points = self.db.list_points(id).await?;

        let boundary = match activity.area_id {
            Some(area_id) => self
                .db
                .get_area(area_id)
                .await?
                .and_then(|a| a.boundary_geojson)
                .and_then(|raw| match AreaBoundary::parse(&raw) {
                    Ok(b) => Some(b),
                    Err(e) => {
                        tracing::warn!(area_id, error = %e, "Stored area boundary is invalid");
                        None
                    }
                }),
            None => None,
        };

        Ok(summarize(id, &points, boundary.as_ref())?)
    }

    // ─── Bulk Import ─────────────────────────────────────────────

    /// Validate every CSV row, then insert all valid rows in one transaction.
    pub async fn bulk_import(&self, actor: &AuthUser, csv_text: &str) -> Result<ImportReport> {
        let offset = self.db.region_offset_hours();
        let parsed = parse_activity_csv(csv_text, offset)?;
        let mut errors = parsed.errors;
        let mut valid = Vec::with_capacity(parsed.rows.len());
        let mut lines = Vec::with_capacity(parsed.rows.len());

        for row in parsed.rows {
            let ranger = match self.db.get_user_by_email(&row.ranger_email).await? {
                Some(user) if user.is_assignable_ranger() => user,
                Some(_) => {
                    errors.push(RowError::new(
                        row.line,
                        format!("{} is not an active ranger", row.ranger_email),
                    ));
                    continue;
                }
                None => {
                    errors.push(RowError::new(
                        row.line,
                        format!("Unknown ranger {}", row.ranger_email),
                    ));
                    continue;
                }
            };
            if let Err(e) = self.check_area(row.area_id).await {
                errors.push(RowError::new(row.line, e.to_string()));
                continue;
            }

            lines.push(row.line);
            valid.push(NewActivity {
                category: row.category,
                description: row.description,
                scheduled_at: format_region(row.scheduled_at),
                ranger_id: ranger.id,
                area_id: row.area_id,
                start_latitude: None,
                start_longitude: None,
                created_by: Some(actor.id.clone()),
            });
        }
        errors.sort_by_key(|e| e.line);

        if valid.is_empty() {
            let first = errors
                .first()
                .map(|e| format!(" (line {}: {})", e.line, e.message))
                .unwrap_or_default();
            return Err(AppError::BadRequest(format!(
                "No valid rows to import{}",
                first
            )));
        }

        let created = self.db.insert_activities(&valid).await?;
        tracing::info!(
            created = created.len(),
            rejected = errors.len(),
            "Bulk activity import completed"
        );
        for (id, activity) in created.iter().zip(&valid) {
            self.feed.publish(ActivityEvent {
                activity_id: *id,
                ranger_id: activity.ranger_id.clone(),
                status: ActivityStatus::Scheduled,
                kind: ActivityEventKind::Created,
            });
        }

        Ok(ImportReport { created, errors })
    }

    // ─── Helpers ─────────────────────────────────────────────────

    async fn load(&self, id: i64) -> Result<Activity> {
        self.db
            .get_activity(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Activity {} not found", id)))
    }

    async fn check_assignee(&self, ranger_id: &str) -> Result<()> {
        match self.db.get_user(ranger_id).await? {
            Some(user) if user.is_assignable_ranger() => Ok(()),
            Some(_) => Err(AppError::BadRequest(format!(
                "User {} is not an active ranger",
                ranger_id
            ))),
            None => Err(AppError::BadRequest(format!("Unknown ranger {}", ranger_id))),
        }
    }

    async fn check_area(&self, area_id: Option<i64>) -> Result<()> {
        let Some(area_id) = area_id else {
            return Ok(());
        };
        match self.db.get_area(area_id).await? {
            Some(area) if area.active => Ok(()),
            Some(_) => Err(AppError::BadRequest(format!("Area {} is inactive", area_id))),
            None => Err(AppError::BadRequest(format!("Unknown area {}", area_id))),
        }
    }

    fn ensure_transition(&self, activity: &Activity, next: ActivityStatus) -> Result<()> {
        if activity.status.can_transition_to(next) {
            Ok(())
        } else {
            Err(AppError::Conflict(format!(
                "Activity {} cannot move from {} to {}",
                activity.id, activity.status, next
            )))
        }
    }

    fn publish(&self, activity: &Activity, kind: ActivityEventKind) {
        self.feed.publish(ActivityEvent {
            activity_id: activity.id,
            ranger_id: activity.ranger_id.clone(),
            status: activity.status,
            kind,
        });
    }
}

fn ensure_assigned(actor: &AuthUser, activity: &Activity) -> Result<()> {
    if actor.id == activity.ranger_id {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Only the assigned ranger may do this".to_string(),
        ))
    }
}

fn check_optional_coordinates(latitude: Option<f64>, longitude: Option<f64>) -> Result<()> {
    match (latitude, longitude) {
        (None, None) => Ok(()),
        (Some(lat), Some(lng)) if valid_coordinates(lat, lng) => Ok(()),
        (Some(_), Some(_)) => Err(AppError::BadRequest("Invalid coordinates".to_string())),
        _ => Err(AppError::BadRequest(
            "Latitude and longitude must be given together".to_string(),
        )),
    }
}

fn stale(id: i64) -> AppError {
    AppError::Conflict(format!("Activity {} changed concurrently; retry", id))
}

fn not_in_progress(id: i64) -> AppError {
    AppError::Conflict(format!("Activity {} is not in progress", id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinates_must_come_in_pairs() {
        assert!(check_optional_coordinates(None, None).is_ok());
        assert!(check_optional_coordinates(Some(15.0), Some(-90.0)).is_ok());
        assert!(check_optional_coordinates(Some(15.0), None).is_err());
        assert!(check_optional_coordinates(Some(95.0), Some(-90.0)).is_err());
    }

    #[test]
    fn test_only_assigned_ranger_passes() {
        let activity = Activity {
            id: 1,
            category: crate::models::ActivityCategory::Patrol,
            description: "Patrullaje".to_string(),
            scheduled_at: "2026-03-01T08:00:00.000-06:00".to_string(),
            ranger_id: "r1".to_string(),
            area_id: None,
            status: ActivityStatus::Scheduled,
            started_at: None,
            finished_at: None,
            start_latitude: None,
            start_longitude: None,
            end_latitude: None,
            end_longitude: None,
            notes: None,
            created_by: None,
            created_at: "2026-02-01T08:00:00.000-06:00".to_string(),
            updated_at: "2026-02-01T08:00:00.000-06:00".to_string(),
        };
        let user = |id: &str| AuthUser {
            id: id.to_string(),
            role: Role::Ranger,
            area_id: None,
            email: None,
        };
        assert!(ensure_assigned(&user("r1"), &activity).is_ok());
        assert!(matches!(
            ensure_assigned(&user("r2"), &activity),
            Err(AppError::Forbidden(_))
        ));
    }
}

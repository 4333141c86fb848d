// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity (`actividad`) and GPS point (`geolocalizacion`) operations.
//!
//! Status changes are conditional updates (`... WHERE status = ?`), so a
//! transition that lost a race affects zero rows and is reported as a
//! conflict instead of overwriting the winner.

use super::findings::{insert_evidence_on, insert_finding_on};
use super::{bad_reference, Db, NewEvidence, NewFinding};
use crate::error::AppError;
use crate::models::{Activity, ActivityCategory, ActivityStatus, GeolocationPoint};
use sqlx::{QueryBuilder, Sqlite};

/// Fields for a new `scheduled` activity.
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub category: ActivityCategory,
    pub description: String,
    /// RFC3339 in the region offset
    pub scheduled_at: String,
    pub ranger_id: String,
    pub area_id: Option<i64>,
    pub start_latitude: Option<f64>,
    pub start_longitude: Option<f64>,
    pub created_by: Option<String>,
}

/// Editable fields of a `scheduled` activity.
#[derive(Debug, Clone)]
pub struct ActivityUpdate {
    pub category: ActivityCategory,
    pub description: String,
    pub scheduled_at: String,
    pub ranger_id: String,
    pub area_id: Option<i64>,
    pub notes: Option<String>,
}

/// Optional list filters. `from`/`to` bound `scheduled_at` (inclusive).
#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    pub status: Option<ActivityStatus>,
    pub ranger_id: Option<String>,
    pub category: Option<ActivityCategory>,
    pub from: Option<String>,
    pub to: Option<String>,
}

/// Position of the last returned row in `(scheduled_at DESC, id DESC)` order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityCursor {
    pub scheduled_at: String,
    pub id: i64,
}

/// Everything recorded when a ranger finishes an activity.
#[derive(Debug, Clone, Default)]
pub struct FinishData {
    pub end_latitude: Option<f64>,
    pub end_longitude: Option<f64>,
    pub notes: Option<String>,
    pub findings: Vec<NewFinding>,
    pub evidence: Vec<NewEvidence>,
}

impl Db {
    // ─── Activity Operations ─────────────────────────────────────

    pub async fn get_activity(&self, id: i64) -> Result<Option<Activity>, AppError> {
        Ok(
            sqlx::query_as::<_, Activity>("SELECT * FROM actividad WHERE id = ?")
                .bind(id)
                .fetch_optional(self.pool())
                .await?,
        )
    }

    /// Fetch one page of activities, newest schedule first.
    ///
    /// Returns the page and, when more rows exist, the cursor to resume from.
    pub async fn list_activities(
        &self,
        filter: &ActivityFilter,
        cursor: Option<&ActivityCursor>,
        limit: u32,
    ) -> Result<(Vec<Activity>, Option<ActivityCursor>), AppError> {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM actividad WHERE 1 = 1");
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(ranger_id) = &filter.ranger_id {
            query.push(" AND ranger_id = ").push_bind(ranger_id.clone());
        }
        if let Some(category) = filter.category {
            query.push(" AND category = ").push_bind(category.as_str());
        }
        if let Some(from) = &filter.from {
            query.push(" AND scheduled_at >= ").push_bind(from.clone());
        }
        if let Some(to) = &filter.to {
            query.push(" AND scheduled_at <= ").push_bind(to.clone());
        }
        if let Some(cursor) = cursor {
            query
                .push(" AND (scheduled_at < ")
                .push_bind(cursor.scheduled_at.clone())
                .push(" OR (scheduled_at = ")
                .push_bind(cursor.scheduled_at.clone())
                .push(" AND id < ")
                .push_bind(cursor.id)
                .push("))");
        }
        query
            .push(" ORDER BY scheduled_at DESC, id DESC LIMIT ")
            .push_bind(i64::from(limit) + 1);

        let mut rows = query
            .build_query_as::<Activity>()
            .fetch_all(self.pool())
            .await?;

        let next = if rows.len() > limit as usize {
            rows.truncate(limit as usize);
            rows.last().map(|a| ActivityCursor {
                scheduled_at: a.scheduled_at.clone(),
                id: a.id,
            })
        } else {
            None
        };
        Ok((rows, next))
    }

    pub async fn insert_activity(&self, activity: &NewActivity) -> Result<Activity, AppError> {
        let mut conn = self.pool().acquire().await?;
        let id = insert_activity_on(&mut *conn, activity, &self.now())
            .await
            .map_err(|e| bad_reference(e, "Referenced ranger or area does not exist"))?;
        drop(conn);

        self.get_activity(id)
            .await?
            .ok_or_else(|| AppError::Database(format!("Activity {} vanished after insert", id)))
    }

    /// Insert many activities in one transaction; any failure rolls back all.
    pub async fn insert_activities(&self, activities: &[NewActivity]) -> Result<Vec<i64>, AppError> {
        let now = self.now();
        let mut tx = self.pool().begin().await?;
        let mut ids = Vec::with_capacity(activities.len());
        for activity in activities {
            let id = insert_activity_on(&mut *tx, activity, &now)
                .await
                .map_err(|e| bad_reference(e, "Referenced ranger or area does not exist"))?;
            ids.push(id);
        }
        tx.commit().await?;
        Ok(ids)
    }

    /// Overwrite editable fields while the activity is still `scheduled`.
    pub async fn update_activity(
        &self,
        id: i64,
        update: &ActivityUpdate,
    ) -> Result<Activity, AppError> {
        let result = sqlx::query(
            "UPDATE actividad SET category = ?, description = ?, scheduled_at = ?, ranger_id = ?, \
             area_id = ?, notes = ?, updated_at = ? WHERE id = ? AND status = 'scheduled'",
        )
        .bind(update.category.as_str())
        .bind(&update.description)
        .bind(&update.scheduled_at)
        .bind(&update.ranger_id)
        .bind(update.area_id)
        .bind(&update.notes)
        .bind(self.now())
        .bind(id)
        .execute(self.pool())
        .await
        .map_err(|e| bad_reference(e, "Referenced ranger or area does not exist"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict(
                "Only scheduled activities can be edited".to_string(),
            ));
        }
        self.get_activity(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Activity {} not found", id)))
    }

    /// Move `from` → `to` only if the row is still in `from`.
    /// Returns whether the row changed.
    pub async fn transition_activity(
        &self,
        id: i64,
        from: ActivityStatus,
        to: ActivityStatus,
    ) -> Result<bool, AppError> {
        let result =
            sqlx::query("UPDATE actividad SET status = ?, updated_at = ? WHERE id = ? AND status = ?")
                .bind(to.as_str())
                .bind(self.now())
                .bind(id)
                .bind(from.as_str())
                .execute(self.pool())
                .await?;
        Ok(result.rows_affected() == 1)
    }

    /// `scheduled` → `in_progress`, stamping `started_at`.
    ///
    /// The partial unique index on in-progress activities turns a lost
    /// double-start race into `Conflict`.
    pub async fn start_activity(
        &self,
        id: i64,
        started_at: &str,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE actividad SET status = 'in_progress', started_at = ?, \
             start_latitude = COALESCE(?, start_latitude), \
             start_longitude = COALESCE(?, start_longitude), updated_at = ? \
             WHERE id = ? AND status = 'scheduled'",
        )
        .bind(started_at)
        .bind(latitude)
        .bind(longitude)
        .bind(started_at)
        .bind(id)
        .execute(self.pool())
        .await
        .map_err(|e| {
            super::conflict_on_unique(e, "Ranger already has an activity in progress")
        })?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn find_in_progress_for_ranger(
        &self,
        ranger_id: &str,
    ) -> Result<Option<Activity>, AppError> {
        Ok(sqlx::query_as::<_, Activity>(
            "SELECT * FROM actividad WHERE ranger_id = ? AND status = 'in_progress' LIMIT 1",
        )
        .bind(ranger_id)
        .fetch_optional(self.pool())
        .await?)
    }

    /// `in_progress` → `completed` together with findings and evidence,
    /// all in one transaction.
    pub async fn finish_activity(
        &self,
        id: i64,
        finished_at: &str,
        data: &FinishData,
    ) -> Result<Vec<i64>, AppError> {
        let mut tx = self.pool().begin().await?;

        let result = sqlx::query(
            "UPDATE actividad SET status = 'completed', finished_at = ?, end_latitude = ?, \
             end_longitude = ?, notes = COALESCE(?, notes), updated_at = ? \
             WHERE id = ? AND status = 'in_progress'",
        )
        .bind(finished_at)
        .bind(data.end_latitude)
        .bind(data.end_longitude)
        .bind(&data.notes)
        .bind(finished_at)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict(
                "Only in-progress activities can be finished".to_string(),
            ));
        }

        let mut finding_ids = Vec::with_capacity(data.findings.len());
        for finding in &data.findings {
            let mut finding = finding.clone();
            finding.activity_id = Some(id);
            let finding_id = insert_finding_on(&mut *tx, &finding, finished_at)
                .await
                .map_err(|e| bad_reference(e, "Finding references an unknown record"))?;
            finding_ids.push(finding_id);
        }

        for evidence in &data.evidence {
            let mut evidence = evidence.clone();
            evidence.activity_id = Some(id);
            insert_evidence_on(&mut *tx, &evidence, finished_at)
                .await
                .map_err(|e| bad_reference(e, "Evidence references an unknown record"))?;
        }

        tx.commit().await?;
        Ok(finding_ids)
    }

    /// Delete a `scheduled` or `cancelled` activity. Returns whether a row
    /// was removed.
    pub async fn delete_activity(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query(
            "DELETE FROM actividad WHERE id = ? AND status IN ('scheduled', 'cancelled')",
        )
        .bind(id)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn count_activities_for_area(&self, area_id: i64) -> Result<i64, AppError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM actividad WHERE area_id = ?")
            .bind(area_id)
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }

    // ─── GPS Point Operations ────────────────────────────────────

    /// Append a point, only while the activity is `in_progress`.
    /// Returns `None` when the activity is not in progress.
    pub async fn insert_point(
        &self,
        activity_id: i64,
        latitude: f64,
        longitude: f64,
        accuracy_meters: Option<f64>,
    ) -> Result<Option<GeolocationPoint>, AppError> {
        let result = sqlx::query(
            "INSERT INTO geolocalizacion (activity_id, latitude, longitude, accuracy_meters, recorded_at) \
             SELECT ?, ?, ?, ?, ? WHERE EXISTS \
             (SELECT 1 FROM actividad WHERE id = ? AND status = 'in_progress')",
        )
        .bind(activity_id)
        .bind(latitude)
        .bind(longitude)
        .bind(accuracy_meters)
        .bind(self.now())
        .bind(activity_id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        let point = sqlx::query_as::<_, GeolocationPoint>(
            "SELECT * FROM geolocalizacion WHERE id = ?",
        )
        .bind(result.last_insert_rowid())
        .fetch_optional(self.pool())
        .await?;
        Ok(point)
    }

    /// Points in insertion order.
    pub async fn list_points(&self, activity_id: i64) -> Result<Vec<GeolocationPoint>, AppError> {
        Ok(sqlx::query_as::<_, GeolocationPoint>(
            "SELECT * FROM geolocalizacion WHERE activity_id = ? ORDER BY id",
        )
        .bind(activity_id)
        .fetch_all(self.pool())
        .await?)
    }

    pub async fn delete_point(&self, activity_id: i64, point_id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM geolocalizacion WHERE id = ? AND activity_id = ?")
            .bind(point_id)
            .bind(activity_id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() == 1)
    }
}

async fn insert_activity_on(
    conn: &mut sqlx::SqliteConnection,
    activity: &NewActivity,
    now: &str,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO actividad (category, description, scheduled_at, ranger_id, area_id, status, \
         start_latitude, start_longitude, created_by, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, 'scheduled', ?, ?, ?, ?, ?)",
    )
    .bind(activity.category.as_str())
    .bind(&activity.description)
    .bind(&activity.scheduled_at)
    .bind(&activity.ranger_id)
    .bind(activity.area_id)
    .bind(activity.start_latitude)
    .bind(activity.start_longitude)
    .bind(&activity.created_by)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(result.last_insert_rowid())
}

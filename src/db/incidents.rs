// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Incident (`incidente`) and incident follow-up operations.

use super::{bad_reference, Db};
use crate::error::AppError;
use crate::models::{FollowUp, Incident, IncidentCategory, IncidentStatus, Severity};
use sqlx::{QueryBuilder, Sqlite};

/// Fields for a new incident. Always starts as `reported`.
#[derive(Debug, Clone)]
pub struct IncidentInput {
    pub title: String,
    pub description: String,
    pub category: IncidentCategory,
    pub severity: Severity,
    pub area_id: Option<i64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub visitors_involved: i64,
    pub occurred_at: String,
    pub reported_by: String,
}

/// Editable incident fields (last write wins).
#[derive(Debug, Clone)]
pub struct IncidentUpdate {
    pub title: String,
    pub description: String,
    pub category: IncidentCategory,
    pub severity: Severity,
    pub area_id: Option<i64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub visitors_involved: i64,
    pub occurred_at: String,
}

impl Db {
    // ─── Incident Operations ─────────────────────────────────────

    pub async fn get_incident(&self, id: i64) -> Result<Option<Incident>, AppError> {
        Ok(
            sqlx::query_as::<_, Incident>("SELECT * FROM incidente WHERE id = ?")
                .bind(id)
                .fetch_optional(self.pool())
                .await?,
        )
    }

    pub async fn list_incidents(
        &self,
        reported_by: Option<&str>,
        status: Option<IncidentStatus>,
        area_id: Option<i64>,
    ) -> Result<Vec<Incident>, AppError> {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM incidente WHERE 1 = 1");
        if let Some(reported_by) = reported_by {
            query.push(" AND reported_by = ").push_bind(reported_by.to_string());
        }
        if let Some(status) = status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(area_id) = area_id {
            query.push(" AND area_id = ").push_bind(area_id);
        }
        query.push(" ORDER BY occurred_at DESC, id DESC");

        Ok(query
            .build_query_as::<Incident>()
            .fetch_all(self.pool())
            .await?)
    }

    pub async fn insert_incident(&self, input: &IncidentInput) -> Result<Incident, AppError> {
        let now = self.now();
        let result = sqlx::query(
            "INSERT INTO incidente (title, description, category, severity, area_id, latitude, \
             longitude, visitors_involved, status, reported_by, occurred_at, reported_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'reported', ?, ?, ?, ?)",
        )
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.category.as_str())
        .bind(input.severity.as_str())
        .bind(input.area_id)
        .bind(input.latitude)
        .bind(input.longitude)
        .bind(input.visitors_involved)
        .bind(&input.reported_by)
        .bind(&input.occurred_at)
        .bind(&now)
        .bind(&now)
        .execute(self.pool())
        .await
        .map_err(|e| bad_reference(e, "Incident references an unknown area"))?;

        let id = result.last_insert_rowid();
        self.get_incident(id)
            .await?
            .ok_or_else(|| AppError::Database(format!("Incident {} vanished after insert", id)))
    }

    pub async fn update_incident(
        &self,
        id: i64,
        update: &IncidentUpdate,
    ) -> Result<Incident, AppError> {
        let result = sqlx::query(
            "UPDATE incidente SET title = ?, description = ?, category = ?, severity = ?, \
             area_id = ?, latitude = ?, longitude = ?, visitors_involved = ?, occurred_at = ?, \
             updated_at = ? WHERE id = ?",
        )
        .bind(&update.title)
        .bind(&update.description)
        .bind(update.category.as_str())
        .bind(update.severity.as_str())
        .bind(update.area_id)
        .bind(update.latitude)
        .bind(update.longitude)
        .bind(update.visitors_involved)
        .bind(&update.occurred_at)
        .bind(self.now())
        .bind(id)
        .execute(self.pool())
        .await
        .map_err(|e| bad_reference(e, "Incident references an unknown area"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Incident {} not found", id)));
        }
        self.get_incident(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Incident {} not found", id)))
    }

    /// Conditional status move plus optional follow-up note, one transaction.
    /// Returns `false` when the status changed underneath.
    pub async fn advance_incident(
        &self,
        id: i64,
        from: IncidentStatus,
        to: IncidentStatus,
        author_id: &str,
        note: Option<&str>,
    ) -> Result<bool, AppError> {
        let now = self.now();
        let mut tx = self.pool().begin().await?;

        let result = sqlx::query(
            "UPDATE incidente SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
        )
        .bind(to.as_str())
        .bind(&now)
        .bind(id)
        .bind(from.as_str())
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }

        if let Some(note) = note {
            sqlx::query(
                "INSERT INTO seguimiento_incidente (parent_id, note, status_after, author_id, created_at) \
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(id)
            .bind(note)
            .bind(to.as_str())
            .bind(author_id)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    pub async fn delete_incident(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM incidente WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn insert_incident_follow_up(
        &self,
        incident_id: i64,
        author_id: &str,
        note: &str,
    ) -> Result<FollowUp, AppError> {
        let result = sqlx::query(
            "INSERT INTO seguimiento_incidente (parent_id, note, status_after, author_id, created_at) \
             VALUES (?, ?, NULL, ?, ?)",
        )
        .bind(incident_id)
        .bind(note)
        .bind(author_id)
        .bind(self.now())
        .execute(self.pool())
        .await
        .map_err(|e| bad_reference(e, "Unknown incident"))?;

        sqlx::query_as::<_, FollowUp>("SELECT * FROM seguimiento_incidente WHERE id = ?")
            .bind(result.last_insert_rowid())
            .fetch_one(self.pool())
            .await
            .map_err(AppError::from)
    }

    pub async fn list_incident_follow_ups(
        &self,
        incident_id: i64,
    ) -> Result<Vec<FollowUp>, AppError> {
        Ok(sqlx::query_as::<_, FollowUp>(
            "SELECT * FROM seguimiento_incidente WHERE parent_id = ? ORDER BY id",
        )
        .bind(incident_id)
        .fetch_all(self.pool())
        .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::NewUser;
    use crate::models::Role;

    #[tokio::test]
    async fn test_incident_follow_up_with_status_change() {
        let db = Db::connect_in_memory(-6).await.unwrap();
        db.insert_user(&NewUser {
            id: "r1".to_string(),
            email: "r1@example.org".to_string(),
            first_name: "Rosa".to_string(),
            last_name: "Tiul".to_string(),
            dpi: None,
            phone: None,
            role: Role::Ranger,
            area_id: None,
        })
        .await
        .unwrap();

        let incident = db
            .insert_incident(&IncidentInput {
                title: "Visitante extraviado".to_string(),
                description: "Grupo separado en el sendero norte".to_string(),
                category: IncidentCategory::LostVisitor,
                severity: Severity::High,
                area_id: None,
                latitude: None,
                longitude: None,
                visitors_involved: 2,
                occurred_at: "2026-03-01T10:00:00.000-06:00".to_string(),
                reported_by: "r1".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(incident.status, IncidentStatus::Reported);

        let moved = db
            .advance_incident(
                incident.id,
                IncidentStatus::Reported,
                IncidentStatus::InProgress,
                "r1",
                Some("Búsqueda iniciada"),
            )
            .await
            .unwrap();
        assert!(moved);

        db.insert_incident_follow_up(incident.id, "r1", "Sin novedades")
            .await
            .unwrap();
        let notes = db.list_incident_follow_ups(incident.id).await.unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].status_after.as_deref(), Some("in_progress"));
        assert!(notes[1].status_after.is_none());
    }
}

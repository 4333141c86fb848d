// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Finding (`hallazgo`), evidence and finding follow-up operations.

use super::{bad_reference, Db};
use crate::error::AppError;
use crate::models::{Evidence, Finding, FindingStatus, FollowUp, Severity};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

/// Fields for a new finding. Always starts as `reported`.
#[derive(Debug, Clone)]
pub struct NewFinding {
    pub title: String,
    pub description: String,
    pub category: Option<String>,
    pub severity: Severity,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub activity_id: Option<i64>,
    pub area_id: Option<i64>,
    pub reported_by: String,
}

/// Photographic evidence reference (URL of an already uploaded image).
#[derive(Debug, Clone)]
pub struct NewEvidence {
    pub activity_id: Option<i64>,
    pub finding_id: Option<i64>,
    pub url: String,
    pub description: Option<String>,
    pub uploaded_by: String,
}

pub(crate) async fn insert_finding_on(
    conn: &mut SqliteConnection,
    finding: &NewFinding,
    now: &str,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO hallazgo (title, description, category, severity, latitude, longitude, \
         status, activity_id, area_id, reported_by, reported_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, 'reported', ?, ?, ?, ?, ?)",
    )
    .bind(&finding.title)
    .bind(&finding.description)
    .bind(&finding.category)
    .bind(finding.severity.as_str())
    .bind(finding.latitude)
    .bind(finding.longitude)
    .bind(finding.activity_id)
    .bind(finding.area_id)
    .bind(&finding.reported_by)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(result.last_insert_rowid())
}

pub(crate) async fn insert_evidence_on(
    conn: &mut SqliteConnection,
    evidence: &NewEvidence,
    now: &str,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO evidencia (activity_id, finding_id, url, description, uploaded_by, created_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(evidence.activity_id)
    .bind(evidence.finding_id)
    .bind(&evidence.url)
    .bind(&evidence.description)
    .bind(&evidence.uploaded_by)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(result.last_insert_rowid())
}

impl Db {
    // ─── Finding Operations ──────────────────────────────────────

    pub async fn get_finding(&self, id: i64) -> Result<Option<Finding>, AppError> {
        Ok(
            sqlx::query_as::<_, Finding>("SELECT * FROM hallazgo WHERE id = ?")
                .bind(id)
                .fetch_optional(self.pool())
                .await?,
        )
    }

    /// List findings, newest first.
    pub async fn list_findings(
        &self,
        reported_by: Option<&str>,
        status: Option<FindingStatus>,
        activity_id: Option<i64>,
    ) -> Result<Vec<Finding>, AppError> {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM hallazgo WHERE 1 = 1");
        if let Some(reported_by) = reported_by {
            query.push(" AND reported_by = ").push_bind(reported_by.to_string());
        }
        if let Some(status) = status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(activity_id) = activity_id {
            query.push(" AND activity_id = ").push_bind(activity_id);
        }
        query.push(" ORDER BY reported_at DESC, id DESC");

        Ok(query
            .build_query_as::<Finding>()
            .fetch_all(self.pool())
            .await?)
    }

    pub async fn insert_finding(&self, finding: &NewFinding) -> Result<Finding, AppError> {
        let mut conn = self.pool().acquire().await?;
        let id = insert_finding_on(&mut *conn, finding, &self.now())
            .await
            .map_err(|e| bad_reference(e, "Finding references an unknown activity or area"))?;
        drop(conn);

        self.get_finding(id)
            .await?
            .ok_or_else(|| AppError::Database(format!("Finding {} vanished after insert", id)))
    }

    /// Move a finding from `from` to `to`, recording a follow-up note in the
    /// same transaction. Returns `false` when the status changed underneath.
    pub async fn advance_finding(
        &self,
        id: i64,
        from: FindingStatus,
        to: FindingStatus,
        author_id: &str,
        note: &str,
    ) -> Result<bool, AppError> {
        let now = self.now();
        let mut tx = self.pool().begin().await?;

        let result = sqlx::query(
            "UPDATE hallazgo SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
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

        sqlx::query(
            "INSERT INTO seguimiento_hallazgo (parent_id, note, status_after, author_id, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(note)
        .bind(to.as_str())
        .bind(author_id)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    pub async fn delete_finding(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM hallazgo WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Add a follow-up note without a status change.
    pub async fn insert_finding_follow_up(
        &self,
        finding_id: i64,
        author_id: &str,
        note: &str,
    ) -> Result<FollowUp, AppError> {
        let result = sqlx::query(
            "INSERT INTO seguimiento_hallazgo (parent_id, note, status_after, author_id, created_at) \
             VALUES (?, ?, NULL, ?, ?)",
        )
        .bind(finding_id)
        .bind(note)
        .bind(author_id)
        .bind(self.now())
        .execute(self.pool())
        .await
        .map_err(|e| bad_reference(e, "Unknown finding"))?;

        sqlx::query_as::<_, FollowUp>("SELECT * FROM seguimiento_hallazgo WHERE id = ?")
            .bind(result.last_insert_rowid())
            .fetch_one(self.pool())
            .await
            .map_err(AppError::from)
    }

    pub async fn list_finding_follow_ups(&self, finding_id: i64) -> Result<Vec<FollowUp>, AppError> {
        Ok(sqlx::query_as::<_, FollowUp>(
            "SELECT * FROM seguimiento_hallazgo WHERE parent_id = ? ORDER BY id",
        )
        .bind(finding_id)
        .fetch_all(self.pool())
        .await?)
    }

    // ─── Evidence Operations ─────────────────────────────────────

    pub async fn insert_evidence(&self, evidence: &NewEvidence) -> Result<Evidence, AppError> {
        let mut conn = self.pool().acquire().await?;
        let id = insert_evidence_on(&mut *conn, evidence, &self.now())
            .await
            .map_err(|e| bad_reference(e, "Evidence references an unknown record"))?;
        drop(conn);

        sqlx::query_as::<_, Evidence>("SELECT * FROM evidencia WHERE id = ?")
            .bind(id)
            .fetch_one(self.pool())
            .await
            .map_err(AppError::from)
    }

    pub async fn list_evidence_for_activity(
        &self,
        activity_id: i64,
    ) -> Result<Vec<Evidence>, AppError> {
        Ok(sqlx::query_as::<_, Evidence>(
            "SELECT * FROM evidencia WHERE activity_id = ? ORDER BY id",
        )
        .bind(activity_id)
        .fetch_all(self.pool())
        .await?)
    }

    pub async fn list_evidence_for_finding(
        &self,
        finding_id: i64,
    ) -> Result<Vec<Evidence>, AppError> {
        Ok(sqlx::query_as::<_, Evidence>(
            "SELECT * FROM evidencia WHERE finding_id = ? ORDER BY id",
        )
        .bind(finding_id)
        .fetch_all(self.pool())
        .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::NewUser;
    use crate::models::Role;

    async fn setup() -> Db {
        let db = Db::connect_in_memory(-6).await.unwrap();
        db.insert_user(&NewUser {
            id: "r1".to_string(),
            email: "r1@example.org".to_string(),
            first_name: "Pedro".to_string(),
            last_name: "Choc".to_string(),
            dpi: None,
            phone: None,
            role: Role::Ranger,
            area_id: None,
        })
        .await
        .unwrap();
        db
    }

    fn finding() -> NewFinding {
        NewFinding {
            title: "Rastro de jaguar".to_string(),
            description: "Huellas frescas cerca del sendero".to_string(),
            category: Some("fauna".to_string()),
            severity: Severity::Low,
            latitude: Some(17.2),
            longitude: Some(-89.6),
            activity_id: None,
            area_id: None,
            reported_by: "r1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_advance_records_follow_up() {
        let db = setup().await;
        let f = db.insert_finding(&finding()).await.unwrap();
        assert_eq!(f.status, FindingStatus::Reported);

        let moved = db
            .advance_finding(f.id, FindingStatus::Reported, FindingStatus::InReview, "r1", "Revisando")
            .await
            .unwrap();
        assert!(moved);

        let follow_ups = db.list_finding_follow_ups(f.id).await.unwrap();
        assert_eq!(follow_ups.len(), 1);
        assert_eq!(follow_ups[0].status_after.as_deref(), Some("in_review"));
    }

    #[tokio::test]
    async fn test_stale_advance_changes_nothing() {
        let db = setup().await;
        let f = db.insert_finding(&finding()).await.unwrap();

        let moved = db
            .advance_finding(f.id, FindingStatus::InReview, FindingStatus::Resolved, "r1", "x")
            .await
            .unwrap();
        assert!(!moved);
        assert!(db.list_finding_follow_ups(f.id).await.unwrap().is_empty());
        let f = db.get_finding(f.id).await.unwrap().unwrap();
        assert_eq!(f.status, FindingStatus::Reported);
    }
}

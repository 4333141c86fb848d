// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Dashboard aggregate queries.

use super::Db;
use crate::error::AppError;
use crate::models::DashboardStats;
use crate::time_utils::{region_day_bounds, region_now};

impl Db {
    /// Compute dashboard counters. With `ranger_id` set, activity, finding
    /// and incident counters only include that ranger's rows.
    pub async fn dashboard_stats(&self, ranger_id: Option<&str>) -> Result<DashboardStats, AppError> {
        let mut stats = DashboardStats::default();

        let (active_rangers,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM usuario WHERE role = 'ranger' AND status = 'active'",
        )
        .fetch_one(self.pool())
        .await?;
        stats.active_rangers = active_rangers;

        let (active_areas,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM area WHERE active = 1")
            .fetch_one(self.pool())
            .await?;
        stats.active_areas = active_areas;

        let (operational,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM equipo WHERE status = 'operational'")
                .fetch_one(self.pool())
                .await?;
        stats.operational_equipment = operational;

        let by_status: Vec<(String, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) FROM actividad WHERE (?1 IS NULL OR ranger_id = ?1) \
             GROUP BY status",
        )
        .bind(ranger_id)
        .fetch_all(self.pool())
        .await?;
        stats.activities_by_status = by_status.into_iter().collect();

        let (day_start, day_end) = region_day_bounds(region_now(self.region_offset_hours()));
        let (today,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM actividad WHERE (?1 IS NULL OR ranger_id = ?1) \
             AND scheduled_at >= ?2 AND scheduled_at < ?3",
        )
        .bind(ranger_id)
        .bind(&day_start)
        .bind(&day_end)
        .fetch_one(self.pool())
        .await?;
        stats.activities_today = today;

        let (open_findings,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM hallazgo WHERE status != 'resolved' \
             AND (?1 IS NULL OR reported_by = ?1)",
        )
        .bind(ranger_id)
        .fetch_one(self.pool())
        .await?;
        stats.open_findings = open_findings;

        let (open_incidents,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM incidente WHERE status != 'resolved' \
             AND (?1 IS NULL OR reported_by = ?1)",
        )
        .bind(ranger_id)
        .fetch_one(self.pool())
        .await?;
        stats.open_incidents = open_incidents;

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewActivity, NewUser};
    use crate::models::{ActivityCategory, Role};
    use crate::time_utils::format_region;

    #[tokio::test]
    async fn test_ranger_scope_limits_activity_counts() {
        let db = Db::connect_in_memory(-6).await.unwrap();
        for id in ["r1", "r2"] {
            db.insert_user(&NewUser {
                id: id.to_string(),
                email: format!("{}@example.org", id),
                first_name: "Juan".to_string(),
                last_name: "Pop".to_string(),
                dpi: None,
                phone: None,
                role: Role::Ranger,
                area_id: None,
            })
            .await
            .unwrap();
        }

        let now = format_region(region_now(-6));
        for ranger in ["r1", "r1", "r2"] {
            db.insert_activity(&NewActivity {
                category: ActivityCategory::Inspection,
                description: "Inspección de linderos".to_string(),
                scheduled_at: now.clone(),
                ranger_id: ranger.to_string(),
                area_id: None,
                start_latitude: None,
                start_longitude: None,
                created_by: None,
            })
            .await
            .unwrap();
        }

        let all = db.dashboard_stats(None).await.unwrap();
        assert_eq!(all.active_rangers, 2);
        assert_eq!(all.total_activities(), 3);
        assert_eq!(all.activities_today, 3);

        let mine = db.dashboard_stats(Some("r1")).await.unwrap();
        assert_eq!(mine.total_activities(), 2);
        assert_eq!(mine.activities_by_status.get("scheduled"), Some(&2));
    }
}

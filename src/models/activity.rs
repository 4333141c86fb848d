// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Field activity model: status machine, category catalog, GPS points.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

string_enum! {
    /// Lifecycle status. `completed` and `cancelled` are terminal.
    #[cfg_attr(feature = "binding-generation", derive(TS))]
    #[cfg_attr(
        feature = "binding-generation",
        ts(export, export_to = "web/src/lib/generated/")
    )]
    pub enum ActivityStatus {
        Scheduled => "scheduled",
        InProgress => "in_progress",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

impl ActivityStatus {
    /// Whether the lifecycle allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: ActivityStatus) -> bool {
        matches!(
            (self, next),
            (ActivityStatus::Scheduled, ActivityStatus::InProgress)
                | (ActivityStatus::InProgress, ActivityStatus::Completed)
                | (ActivityStatus::Scheduled, ActivityStatus::Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ActivityStatus::Completed | ActivityStatus::Cancelled)
    }
}

string_enum! {
    /// Known activity categories.
    pub enum ActivityCategory {
        Patrol => "patrol",
        Maintenance => "maintenance",
        FirePrevention => "fire_prevention",
        Reforestation => "reforestation",
        EnvironmentalEducation => "environmental_education",
        WildlifeMonitoring => "wildlife_monitoring",
        BiologicalMonitoring => "biological_monitoring",
        Inspection => "inspection",
        Other => "other",
    }
}

impl ActivityCategory {
    /// Display name shown in planning screens.
    pub fn display_name(self) -> &'static str {
        match self {
            ActivityCategory::Patrol => "Patrullaje",
            ActivityCategory::Maintenance => "Mantenimiento",
            ActivityCategory::FirePrevention => "Prevención de incendios",
            ActivityCategory::Reforestation => "Reforestación",
            ActivityCategory::EnvironmentalEducation => "Educación ambiental",
            ActivityCategory::WildlifeMonitoring => "Monitoreo de fauna",
            ActivityCategory::BiologicalMonitoring => "Monitoreo biológico",
            ActivityCategory::Inspection => "Inspección",
            ActivityCategory::Other => "Otro",
        }
    }

    /// Lenient lookup used for user input: accepts the catalog key, its
    /// display name, or the English label, ignoring case and separators.
    pub fn lookup(input: &str) -> Option<Self> {
        let wanted = normalize(input);
        if wanted.is_empty() {
            return None;
        }
        ActivityCategory::ALL.iter().copied().find(|c| {
            normalize(c.as_str()) == wanted || normalize(c.display_name()) == wanted
        })
    }
}

fn normalize(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' => 'a',
            'é' => 'e',
            'í' => 'i',
            'ó' => 'o',
            'ú' => 'u',
            other => other,
        })
        .collect()
}

/// Stored activity record (`actividad` table).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Activity {
    pub id: i64,
    #[sqlx(try_from = "String")]
    pub category: ActivityCategory,
    pub description: String,
    /// Scheduled date/time (RFC3339, region offset)
    pub scheduled_at: String,
    /// Assigned ranger
    pub ranger_id: String,
    pub area_id: Option<i64>,
    #[sqlx(try_from = "String")]
    pub status: ActivityStatus,
    /// Set only on the transition to `in_progress`
    pub started_at: Option<String>,
    /// Set only on the transition to `completed`
    pub finished_at: Option<String>,
    pub start_latitude: Option<f64>,
    pub start_longitude: Option<f64>,
    pub end_latitude: Option<f64>,
    pub end_longitude: Option<f64>,
    pub notes: Option<String>,
    pub created_by: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// One reported position of an in-progress activity (`geolocalizacion`).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GeolocationPoint {
    pub id: i64,
    pub activity_id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_meters: Option<f64>,
    /// Server insertion time (region offset)
    pub recorded_at: String,
}

/// Photographic evidence attached to an activity or finding (`evidencia`).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Evidence {
    pub id: i64,
    pub activity_id: Option<i64>,
    pub finding_id: Option<i64>,
    pub url: String,
    pub description: Option<String>,
    pub uploaded_by: String,
    pub created_at: String,
}

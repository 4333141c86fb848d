//! Finding (hallazgo) model.

use serde::{Deserialize, Serialize};

string_enum! {
    /// Severity catalog shared by findings and incidents.
    pub enum Severity {
        Low => "low",
        Medium => "medium",
        High => "high",
        Critical => "critical",
    }
}

string_enum! {
    pub enum FindingStatus {
        Reported => "reported",
        InReview => "in_review",
        InProgress => "in_progress",
        Resolved => "resolved",
    }
}

impl FindingStatus {
    fn rank(self) -> u8 {
        match self {
            FindingStatus::Reported => 0,
            FindingStatus::InReview => 1,
            FindingStatus::InProgress => 2,
            FindingStatus::Resolved => 3,
        }
    }

    /// Statuses only move forward; `resolved` is terminal.
    pub fn can_transition_to(self, next: FindingStatus) -> bool {
        next.rank() > self.rank()
    }

    pub fn is_open(self) -> bool {
        self != FindingStatus::Resolved
    }
}

/// Observation logged by a ranger (`hallazgo` table).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Finding {
    pub id: i64,
    pub title: String,
    pub description: String,
    /// Free catalog text (e.g. "tala ilegal", "fauna herida")
    pub category: Option<String>,
    #[sqlx(try_from = "String")]
    pub severity: Severity,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[sqlx(try_from = "String")]
    pub status: FindingStatus,
    /// Activity the finding was logged from, if any
    pub activity_id: Option<i64>,
    pub area_id: Option<i64>,
    pub reported_by: String,
    pub reported_at: String,
    pub updated_at: String,
}

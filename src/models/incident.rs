//! Incident (incidente) model: visitor-related events.

use crate::models::Severity;
use serde::{Deserialize, Serialize};

string_enum! {
    pub enum IncidentCategory {
        VisitorInjury => "visitor_injury",
        LostVisitor => "lost_visitor",
        IllegalActivity => "illegal_activity",
        Wildfire => "wildfire",
        WildlifeConflict => "wildlife_conflict",
        Vandalism => "vandalism",
        Other => "other",
    }
}

string_enum! {
    pub enum IncidentStatus {
        Reported => "reported",
        InProgress => "in_progress",
        Resolved => "resolved",
    }
}

impl IncidentStatus {
    fn rank(self) -> u8 {
        match self {
            IncidentStatus::Reported => 0,
            IncidentStatus::InProgress => 1,
            IncidentStatus::Resolved => 2,
        }
    }

    pub fn can_transition_to(self, next: IncidentStatus) -> bool {
        next.rank() > self.rank()
    }
}

/// Stored incident report.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Incident {
    pub id: i64,
    pub title: String,
    pub description: String,
    #[sqlx(try_from = "String")]
    pub category: IncidentCategory,
    #[sqlx(try_from = "String")]
    pub severity: Severity,
    pub area_id: Option<i64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub visitors_involved: i64,
    #[sqlx(try_from = "String")]
    pub status: IncidentStatus,
    pub reported_by: String,
    pub occurred_at: String,
    pub reported_at: String,
    pub updated_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incident_status_transitions() {
        use IncidentStatus::*;
        assert!(Reported.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Resolved));
        assert!(Reported.can_transition_to(Resolved));
        assert!(!Resolved.can_transition_to(Reported));
        assert!(!InProgress.can_transition_to(InProgress));
    }
}

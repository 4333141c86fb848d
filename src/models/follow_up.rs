//! Follow-up (seguimiento) notes for findings and incidents.

use serde::{Deserialize, Serialize};

/// A timestamped note appended to a finding or incident.
///
/// Stored in `seguimiento_hallazgo` / `seguimiento_incidente`; `parent_id`
/// points at the owning row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FollowUp {
    pub id: i64,
    pub parent_id: i64,
    pub note: String,
    /// Status the parent moved to with this note, if any
    pub status_after: Option<String>,
    pub author_id: String,
    pub created_at: String,
}

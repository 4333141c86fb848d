//! Dashboard aggregates.
//!
//! Computed on request with a handful of `COUNT(*)` queries; nothing is
//! pre-aggregated.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Dashboard counters. For rangers the activity, finding and incident
/// counters only include the caller's own rows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DashboardStats {
    // ─── Personnel & Areas ───────────────────────────────────────
    pub active_rangers: i64,
    pub active_areas: i64,
    pub operational_equipment: i64,

    // ─── Activities ──────────────────────────────────────────────
    /// Activity count per status key
    pub activities_by_status: HashMap<String, i64>,
    /// Activities scheduled for the current region day
    pub activities_today: i64,

    // ─── Reports ─────────────────────────────────────────────────
    pub open_findings: i64,
    pub open_incidents: i64,
}

impl DashboardStats {
    pub fn total_activities(&self) -> i64 {
        self.activities_by_status.values().sum()
    }
}

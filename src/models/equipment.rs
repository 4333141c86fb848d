//! Field equipment model.

use serde::{Deserialize, Serialize};

string_enum! {
    pub enum EquipmentStatus {
        Operational => "operational",
        InRepair => "in_repair",
        Retired => "retired",
    }
}

/// Equipment item stored in the `equipo` table.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Equipment {
    pub id: i64,
    /// Inventory code (unique)
    pub code: String,
    pub name: String,
    /// Kind of item (radio, GPS, binoculars, vehicle, ...)
    pub kind: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub serial: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: EquipmentStatus,
    /// Ranger currently holding the item
    pub ranger_id: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

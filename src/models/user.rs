//! User model for storage and API.

use serde::{Deserialize, Serialize};

string_enum! {
    /// System role. Exactly three exist; there is no hierarchy between them
    /// beyond what the permission table says.
    pub enum Role {
        Administrator => "administrator",
        Coordinator => "coordinator",
        Ranger => "ranger",
    }
}

string_enum! {
    /// Account status. Governs login and assignability.
    pub enum UserStatus {
        Active => "active",
        Suspended => "suspended",
        Deactivated => "deactivated",
    }
}

/// User profile stored in the `usuario` table.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Auth provider subject (also the primary key)
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// National identity document number
    pub dpi: Option<String>,
    pub phone: Option<String>,
    #[sqlx(try_from = "String")]
    pub role: Role,
    #[sqlx(try_from = "String")]
    pub status: UserStatus,
    /// Assigned protected area (rangers only)
    pub area_id: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Whether the user can hold field assignments (activities, equipment).
    pub fn is_assignable_ranger(&self) -> bool {
        self.role == Role::Ranger && self.status == UserStatus::Active
    }
}

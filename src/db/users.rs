// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User (`usuario`) operations.

use super::{bad_reference, conflict_on_unique, Db};
use crate::error::AppError;
use crate::models::{Role, User, UserStatus};
use sqlx::{QueryBuilder, Sqlite};

/// Fields for a new user row. The id comes from the auth provider.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub dpi: Option<String>,
    pub phone: Option<String>,
    pub role: Role,
    pub area_id: Option<i64>,
}

/// Editable user fields (last write wins).
#[derive(Debug, Clone)]
pub struct UserUpdate {
    pub first_name: String,
    pub last_name: String,
    pub dpi: Option<String>,
    pub phone: Option<String>,
    pub role: Role,
    pub area_id: Option<i64>,
}

/// Optional list filters.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub status: Option<UserStatus>,
    pub area_id: Option<i64>,
}

impl Db {
    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by auth provider id.
    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        Ok(sqlx::query_as::<_, User>("SELECT * FROM usuario WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?)
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(
            sqlx::query_as::<_, User>("SELECT * FROM usuario WHERE lower(email) = lower(?)")
                .bind(email.trim())
                .fetch_optional(self.pool())
                .await?,
        )
    }

    /// List users ordered by name.
    pub async fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>, AppError> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM usuario WHERE 1 = 1");
        if let Some(role) = filter.role {
            query.push(" AND role = ").push_bind(role.as_str());
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(area_id) = filter.area_id {
            query.push(" AND area_id = ").push_bind(area_id);
        }
        query.push(" ORDER BY last_name, first_name");

        Ok(query
            .build_query_as::<User>()
            .fetch_all(self.pool())
            .await?)
    }

    /// Insert a new user with status `active`.
    pub async fn insert_user(&self, user: &NewUser) -> Result<User, AppError> {
        let now = self.now();
        sqlx::query(
            "INSERT INTO usuario \
             (id, email, first_name, last_name, dpi, phone, role, status, area_id, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, 'active', ?, ?, ?)",
        )
        .bind(&user.id)
        .bind(user.email.trim())
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.dpi)
        .bind(&user.phone)
        .bind(user.role.as_str())
        .bind(user.area_id)
        .bind(&now)
        .bind(&now)
        .execute(self.pool())
        .await
        .map_err(|e| conflict_on_unique(e, "A user with this email already exists"))?;

        self.get_user(&user.id)
            .await?
            .ok_or_else(|| AppError::Database(format!("User {} vanished after insert", user.id)))
    }

    /// Overwrite editable fields.
    pub async fn update_user(&self, id: &str, update: &UserUpdate) -> Result<User, AppError> {
        let result = sqlx::query(
            "UPDATE usuario SET first_name = ?, last_name = ?, dpi = ?, phone = ?, role = ?, \
             area_id = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&update.first_name)
        .bind(&update.last_name)
        .bind(&update.dpi)
        .bind(&update.phone)
        .bind(update.role.as_str())
        .bind(update.area_id)
        .bind(self.now())
        .bind(id)
        .execute(self.pool())
        .await
        .map_err(|e| bad_reference(e, "Referenced area does not exist"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }
        self.get_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
    }

    pub async fn set_user_status(&self, id: &str, status: UserStatus) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE usuario SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(self.now())
            .bind(id)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }
        Ok(())
    }

    pub async fn set_user_area(&self, id: &str, area_id: Option<i64>) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE usuario SET area_id = ?, updated_at = ? WHERE id = ?")
            .bind(area_id)
            .bind(self.now())
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(|e| bad_reference(e, "Referenced area does not exist"))?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }
        Ok(())
    }

    /// Number of `active` rangers assigned to an area.
    pub async fn count_active_rangers_in_area(&self, area_id: i64) -> Result<i64, AppError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM usuario WHERE area_id = ? AND role = 'ranger' AND status = 'active'",
        )
        .bind(area_id)
        .fetch_one(self.pool())
        .await?;
        Ok(count)
    }

    /// Whether at least one active administrator exists.
    /// Insert `user` as Administrator only if no active administrator
    /// exists, in one statement. Returns `None` when another caller won.
    pub async fn insert_first_administrator(&self, user: &NewUser) -> Result<Option<User>, AppError> {
        let now = self.now();
        let result = sqlx::query(
            "INSERT INTO usuario \
             (id, email, first_name, last_name, dpi, phone, role, status, area_id, created_at, updated_at) \
             SELECT ?, ?, ?, ?, ?, ?, 'administrator', 'active', NULL, ?, ? \
             WHERE NOT EXISTS \
             (SELECT 1 FROM usuario WHERE role = 'administrator' AND status = 'active')",
        )
        .bind(&user.id)
        .bind(user.email.trim())
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.dpi)
        .bind(&user.phone)
        .bind(&now)
        .bind(&now)
        .execute(self.pool())
        .await
        .map_err(|e| conflict_on_unique(e, "A user with this email already exists"))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_user(&user.id).await
    }

    pub async fn administrator_exists(&self) -> Result<bool, AppError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM usuario WHERE role = 'administrator' AND status = 'active'",
        )
        .fetch_one(self.pool())
        .await?;
        Ok(count > 0)
    }
}

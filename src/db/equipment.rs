// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Equipment inventory (`equipo`) operations.

use super::{bad_reference, conflict_on_unique, Db};
use crate::error::AppError;
use crate::models::{Equipment, EquipmentStatus};
use sqlx::{QueryBuilder, Sqlite};

/// Editable equipment fields.
#[derive(Debug, Clone)]
pub struct EquipmentInput {
    pub code: String,
    pub name: String,
    pub kind: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub serial: Option<String>,
    pub status: EquipmentStatus,
    pub ranger_id: Option<String>,
    pub notes: Option<String>,
}

impl EquipmentInput {
    /// Retired equipment never keeps an assignment.
    fn effective_ranger(&self) -> Option<&str> {
        match self.status {
            EquipmentStatus::Retired => None,
            _ => self.ranger_id.as_deref(),
        }
    }
}

fn map_write_error(e: sqlx::Error) -> AppError {
    match &e {
        sqlx::Error::Database(d) if d.is_foreign_key_violation() => {
            bad_reference(e, "Assigned ranger does not exist")
        }
        _ => conflict_on_unique(e, "Equipment code already in use"),
    }
}

impl Db {
    // ─── Equipment Operations ────────────────────────────────────

    pub async fn get_equipment(&self, id: i64) -> Result<Option<Equipment>, AppError> {
        Ok(
            sqlx::query_as::<_, Equipment>("SELECT * FROM equipo WHERE id = ?")
                .bind(id)
                .fetch_optional(self.pool())
                .await?,
        )
    }

    /// List equipment, optionally only what is assigned to one ranger.
    pub async fn list_equipment(
        &self,
        ranger_id: Option<&str>,
        status: Option<EquipmentStatus>,
    ) -> Result<Vec<Equipment>, AppError> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM equipo WHERE 1 = 1");
        if let Some(ranger_id) = ranger_id {
            query.push(" AND ranger_id = ").push_bind(ranger_id.to_string());
        }
        if let Some(status) = status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        query.push(" ORDER BY code");

        Ok(query
            .build_query_as::<Equipment>()
            .fetch_all(self.pool())
            .await?)
    }

    pub async fn insert_equipment(&self, input: &EquipmentInput) -> Result<Equipment, AppError> {
        let now = self.now();
        let result = sqlx::query(
            "INSERT INTO equipo (code, name, kind, brand, model, serial, status, ranger_id, \
             notes, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(input.code.trim())
        .bind(&input.name)
        .bind(&input.kind)
        .bind(&input.brand)
        .bind(&input.model)
        .bind(&input.serial)
        .bind(input.status.as_str())
        .bind(input.effective_ranger())
        .bind(&input.notes)
        .bind(&now)
        .bind(&now)
        .execute(self.pool())
        .await
        .map_err(map_write_error)?;

        let id = result.last_insert_rowid();
        self.get_equipment(id)
            .await?
            .ok_or_else(|| AppError::Database(format!("Equipment {} vanished after insert", id)))
    }

    pub async fn update_equipment(
        &self,
        id: i64,
        input: &EquipmentInput,
    ) -> Result<Equipment, AppError> {
        let result = sqlx::query(
            "UPDATE equipo SET code = ?, name = ?, kind = ?, brand = ?, model = ?, serial = ?, \
             status = ?, ranger_id = ?, notes = ?, updated_at = ? WHERE id = ?",
        )
        .bind(input.code.trim())
        .bind(&input.name)
        .bind(&input.kind)
        .bind(&input.brand)
        .bind(&input.model)
        .bind(&input.serial)
        .bind(input.status.as_str())
        .bind(input.effective_ranger())
        .bind(&input.notes)
        .bind(self.now())
        .bind(id)
        .execute(self.pool())
        .await
        .map_err(map_write_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Equipment {} not found", id)));
        }
        self.get_equipment(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))
    }

    pub async fn delete_equipment(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM equipo WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Equipment {} not found", id)));
        }
        Ok(())
    }
}

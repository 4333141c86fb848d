// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Protected area and catalog operations.

use super::{bad_reference, conflict_on_unique, tables, Db};
use crate::error::AppError;
use crate::models::{Department, Ecosystem, ProtectedArea};
use sqlx::{QueryBuilder, Sqlite};

/// Editable protected-area fields.
#[derive(Debug, Clone)]
pub struct AreaInput {
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub department_id: Option<i64>,
    pub ecosystem_id: Option<i64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub extension_ha: Option<f64>,
    pub boundary_geojson: Option<String>,
}

/// Optional list filters; also the cache key for area listings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AreaFilter {
    pub active: Option<bool>,
    pub department_id: Option<i64>,
}

impl Db {
    // ─── Protected Area Operations ───────────────────────────────

    pub async fn get_area(&self, id: i64) -> Result<Option<ProtectedArea>, AppError> {
        Ok(
            sqlx::query_as::<_, ProtectedArea>("SELECT * FROM area WHERE id = ?")
                .bind(id)
                .fetch_optional(self.pool())
                .await?,
        )
    }

    pub async fn list_areas(&self, filter: &AreaFilter) -> Result<Vec<ProtectedArea>, AppError> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM area WHERE 1 = 1");
        if let Some(active) = filter.active {
            query.push(" AND active = ").push_bind(active);
        }
        if let Some(department_id) = filter.department_id {
            query.push(" AND department_id = ").push_bind(department_id);
        }
        query.push(" ORDER BY name");

        Ok(query
            .build_query_as::<ProtectedArea>()
            .fetch_all(self.pool())
            .await?)
    }

    pub async fn insert_area(&self, input: &AreaInput) -> Result<ProtectedArea, AppError> {
        let now = self.now();
        let result = sqlx::query(
            "INSERT INTO area (name, category, description, department_id, ecosystem_id, \
             latitude, longitude, extension_ha, boundary_geojson, active, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)",
        )
        .bind(&input.name)
        .bind(&input.category)
        .bind(&input.description)
        .bind(input.department_id)
        .bind(input.ecosystem_id)
        .bind(input.latitude)
        .bind(input.longitude)
        .bind(input.extension_ha)
        .bind(&input.boundary_geojson)
        .bind(&now)
        .bind(&now)
        .execute(self.pool())
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(d) if d.is_foreign_key_violation() => {
                bad_reference(e, "Unknown department or ecosystem")
            }
            _ => conflict_on_unique(e, "An area with this name already exists"),
        })?;

        let id = result.last_insert_rowid();
        self.get_area(id)
            .await?
            .ok_or_else(|| AppError::Database(format!("Area {} vanished after insert", id)))
    }

    pub async fn update_area(&self, id: i64, input: &AreaInput) -> Result<ProtectedArea, AppError> {
        let result = sqlx::query(
            "UPDATE area SET name = ?, category = ?, description = ?, department_id = ?, \
             ecosystem_id = ?, latitude = ?, longitude = ?, extension_ha = ?, \
             boundary_geojson = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&input.name)
        .bind(&input.category)
        .bind(&input.description)
        .bind(input.department_id)
        .bind(input.ecosystem_id)
        .bind(input.latitude)
        .bind(input.longitude)
        .bind(input.extension_ha)
        .bind(&input.boundary_geojson)
        .bind(self.now())
        .bind(id)
        .execute(self.pool())
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(d) if d.is_foreign_key_violation() => {
                bad_reference(e, "Unknown department or ecosystem")
            }
            _ => conflict_on_unique(e, "An area with this name already exists"),
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Area {} not found", id)));
        }
        self.get_area(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Area {} not found", id)))
    }

    pub async fn set_area_active(&self, id: i64, active: bool) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE area SET active = ?, updated_at = ? WHERE id = ?")
            .bind(active)
            .bind(self.now())
            .bind(id)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Area {} not found", id)));
        }
        Ok(())
    }

    /// Delete an area. Fails with `BadRequest` while users, activities,
    /// findings or incidents still reference it.
    pub async fn delete_area(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM area WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(|e| bad_reference(e, "Area is still referenced by other records"))?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Area {} not found", id)));
        }
        Ok(())
    }

    pub async fn area_exists(&self, id: i64) -> Result<bool, AppError> {
        self.exists(tables::AREAS, id).await
    }

    // ─── Catalog Operations ──────────────────────────────────────

    pub async fn list_departments(&self) -> Result<Vec<Department>, AppError> {
        Ok(
            sqlx::query_as::<_, Department>("SELECT id, name FROM departamento ORDER BY name")
                .fetch_all(self.pool())
                .await?,
        )
    }

    pub async fn list_ecosystems(&self) -> Result<Vec<Ecosystem>, AppError> {
        Ok(
            sqlx::query_as::<_, Ecosystem>("SELECT id, name FROM ecosistema ORDER BY name")
                .fetch_all(self.pool())
                .await?,
        )
    }

    pub async fn insert_department(&self, name: &str) -> Result<Department, AppError> {
        let result = sqlx::query("INSERT INTO departamento (name) VALUES (?)")
            .bind(name.trim())
            .execute(self.pool())
            .await
            .map_err(|e| conflict_on_unique(e, "Department already exists"))?;
        Ok(Department {
            id: result.last_insert_rowid(),
            name: name.trim().to_string(),
        })
    }

    pub async fn insert_ecosystem(&self, name: &str) -> Result<Ecosystem, AppError> {
        let result = sqlx::query("INSERT INTO ecosistema (name) VALUES (?)")
            .bind(name.trim())
            .execute(self.pool())
            .await
            .map_err(|e| conflict_on_unique(e, "Ecosystem already exists"))?;
        Ok(Ecosystem {
            id: result.last_insert_rowid(),
            name: name.trim().to_string(),
        })
    }

    /// Insert catalog names that are not present yet. Returns rows added.
    pub async fn seed_catalog(
        &self,
        table: &'static str,
        names: &[&str],
    ) -> Result<u64, AppError> {
        if table != tables::DEPARTMENTS && table != tables::ECOSYSTEMS {
            return Err(AppError::Internal(anyhow::anyhow!(
                "{} is not a catalog table",
                table
            )));
        }

        let sql = format!("INSERT OR IGNORE INTO {} (name) VALUES (?)", table);
        let mut tx = self.pool().begin().await?;
        let mut added = 0;
        for name in names {
            added += sqlx::query(&sql)
                .bind(*name)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }
        tx.commit().await?;
        Ok(added)
    }

    pub async fn count_catalog(&self, table: &'static str) -> Result<i64, AppError> {
        let sql = format!("SELECT COUNT(*) FROM {}", table);
        let (count,): (i64,) = sqlx::query_as(&sql).fetch_one(self.pool()).await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str) -> AreaInput {
        AreaInput {
            name: name.to_string(),
            category: "Parque Nacional".to_string(),
            description: None,
            department_id: None,
            ecosystem_id: None,
            latitude: Some(15.9),
            longitude: Some(-90.6),
            extension_ha: Some(14_500.0),
            boundary_geojson: None,
        }
    }

    #[tokio::test]
    async fn test_area_crud_and_filters() {
        let db = Db::connect_in_memory(-6).await.unwrap();
        let a = db.insert_area(&input("Laguna Lachuá")).await.unwrap();
        let b = db.insert_area(&input("Tikal")).await.unwrap();
        assert!(a.active);

        db.set_area_active(b.id, false).await.unwrap();

        let active = db
            .list_areas(&AreaFilter {
                active: Some(true),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "Laguna Lachuá");
    }

    #[tokio::test]
    async fn test_seed_catalog_is_idempotent() {
        let db = Db::connect_in_memory(-6).await.unwrap();
        let first = db
            .seed_catalog(tables::DEPARTMENTS, &["Petén", "Izabal"])
            .await
            .unwrap();
        let second = db
            .seed_catalog(tables::DEPARTMENTS, &["Petén", "Izabal", "Alta Verapaz"])
            .await
            .unwrap();
        assert_eq!(first, 2);
        assert_eq!(second, 1);
        assert_eq!(db.count_catalog(tables::DEPARTMENTS).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_unknown_department_is_bad_request() {
        let db = Db::connect_in_memory(-6).await.unwrap();
        let mut bad = input("Sierra de las Minas");
        bad.department_id = Some(999);
        let err = db.insert_area(&bad).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}

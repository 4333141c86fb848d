// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer (sqlx over SQLite).
//!
//! Provides typed operations grouped by table:
//! - Users (`usuario`)
//! - Protected areas and catalogs (`area`, `departamento`, `ecosistema`)
//! - Equipment (`equipo`)
//! - Activities and GPS points (`actividad`, `geolocalizacion`)
//! - Findings, evidence and follow-ups
//! - Incidents and follow-ups
//! - Dashboard aggregates

pub mod activities;
pub mod areas;
pub mod dashboard;
pub mod equipment;
pub mod findings;
pub mod incidents;
pub mod users;

pub use activities::{ActivityCursor, ActivityFilter, ActivityUpdate, FinishData, NewActivity};
pub use areas::{AreaFilter, AreaInput};
pub use equipment::EquipmentInput;
pub use findings::{NewEvidence, NewFinding};
pub use incidents::{IncidentInput, IncidentUpdate};
pub use users::{NewUser, UserFilter, UserUpdate};

use crate::error::AppError;
use crate::time_utils::region_now_string;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

const MAX_CONNECTIONS: u32 = 5;

/// Table names as constants.
pub mod tables {
    pub const USERS: &str = "usuario";
    pub const AREAS: &str = "area";
    pub const DEPARTMENTS: &str = "departamento";
    pub const ECOSYSTEMS: &str = "ecosistema";
    pub const EQUIPMENT: &str = "equipo";
    pub const ACTIVITIES: &str = "actividad";
    pub const POINTS: &str = "geolocalizacion";
    pub const FINDINGS: &str = "hallazgo";
    pub const EVIDENCE: &str = "evidencia";
    pub const FINDING_FOLLOW_UPS: &str = "seguimiento_hallazgo";
    pub const INCIDENTS: &str = "incidente";
    pub const INCIDENT_FOLLOW_UPS: &str = "seguimiento_incidente";
}

/// Relational database client.
#[derive(Clone)]
pub struct Db {
    pool: SqlitePool,
    region_offset_hours: i32,
}

impl Db {
    /// Connect to the database at `url` and apply pending migrations.
    pub async fn connect(url: &str, region_offset_hours: i32) -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| AppError::Database(format!("Invalid database URL: {}", e)))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to database: {}", e)))?;

        let db = Self {
            pool,
            region_offset_hours,
        };
        db.migrate().await?;

        tracing::info!("Connected to database");
        Ok(db)
    }

    /// Create a private in-memory database (tests, local experiments).
    ///
    /// A single pooled connection is kept alive for the pool's lifetime,
    /// since every new SQLite memory connection would be a fresh database.
    pub async fn connect_in_memory(region_offset_hours: i32) -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| AppError::Database(e.to_string()))?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| AppError::Database(format!("Failed to open memory database: {}", e)))?;

        let db = Self {
            pool,
            region_offset_hours,
        };
        db.migrate().await?;
        Ok(db)
    }

    /// Apply embedded migrations.
    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::Database(format!("Migration failed: {}", e)))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Current region timestamp for audit columns.
    pub fn now(&self) -> String {
        region_now_string(self.region_offset_hours)
    }

    pub fn region_offset_hours(&self) -> i32 {
        self.region_offset_hours
    }

    /// Cheap connectivity probe.
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Whether a row with the given integer id exists in `table`.
    pub(crate) async fn exists(&self, table: &'static str, id: i64) -> Result<bool, AppError> {
        let sql = format!("SELECT COUNT(*) FROM {} WHERE id = ?", table);
        let (count,): (i64,) = sqlx::query_as(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }
}

/// Map a unique-constraint violation to `Conflict`, anything else to `Database`.
pub(crate) fn conflict_on_unique(err: sqlx::Error, message: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::Conflict(message.to_string())
        }
        _ => AppError::from(err),
    }
}

/// Map a foreign-key violation to `BadRequest`, anything else to `Database`.
pub(crate) fn bad_reference(err: sqlx::Error, message: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
            AppError::BadRequest(message.to_string())
        }
        _ => AppError::from(err),
    }
}

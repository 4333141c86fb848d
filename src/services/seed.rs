// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Base catalog data loaded by the setup endpoint.

use crate::db::{tables, Db};
use crate::error::Result;
use serde::Serialize;

pub const DEPARTMENTS: &[&str] = &[
    "Alta Verapaz",
    "Baja Verapaz",
    "Chimaltenango",
    "Chiquimula",
    "El Progreso",
    "Escuintla",
    "Guatemala",
    "Huehuetenango",
    "Izabal",
    "Jalapa",
    "Jutiapa",
    "Petén",
    "Quetzaltenango",
    "Quiché",
    "Retalhuleu",
    "Sacatepéquez",
    "San Marcos",
    "Santa Rosa",
    "Sololá",
    "Suchitepéquez",
    "Totonicapán",
    "Zacapa",
];

pub const ECOSYSTEMS: &[&str] = &[
    "Bosque tropical húmedo",
    "Bosque tropical seco",
    "Bosque nuboso",
    "Bosque de coníferas",
    "Bosque mixto",
    "Manglar",
    "Humedal",
    "Sabana",
    "Arrecife coralino",
    "Lacustre",
];

#[derive(Debug, Default, Serialize)]
pub struct SeedReport {
    pub departments_added: u64,
    pub ecosystems_added: u64,
}

/// Insert missing catalog rows. Safe to run repeatedly.
pub async fn seed_catalogs(db: &Db) -> Result<SeedReport> {
    let report = SeedReport {
        departments_added: db.seed_catalog(tables::DEPARTMENTS, DEPARTMENTS).await?,
        ecosystems_added: db.seed_catalog(tables::ECOSYSTEMS, ECOSYSTEMS).await?,
    };
    tracing::info!(
        departments = report.departments_added,
        ecosystems = report.ecosystems_added,
        "Catalogs seeded"
    );
    Ok(report)
}

/// Whether both catalogs hold at least one row.
pub async fn catalogs_seeded(db: &Db) -> Result<bool> {
    Ok(db.count_catalog(tables::DEPARTMENTS).await? > 0
        && db.count_catalog(tables::ECOSYSTEMS).await? > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_seed_twice_adds_nothing_second_time() {
        let db = Db::connect_in_memory(-6).await.unwrap();
        assert!(!catalogs_seeded(&db).await.unwrap());

        let first = seed_catalogs(&db).await.unwrap();
        assert_eq!(first.departments_added, DEPARTMENTS.len() as u64);
        assert!(catalogs_seeded(&db).await.unwrap());

        let second = seed_catalogs(&db).await.unwrap();
        assert_eq!(second.departments_added, 0);
        assert_eq!(second.ecosystems_added, 0);
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Protected area model, catalogs and boundary geometry handling.

use geo::{Contains, MultiPolygon, Point, Polygon};
use geojson::GeoJson;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// A protected area rangers are assigned to.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ProtectedArea {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub id: i64,
    /// Area name (e.g., "Parque Nacional Laguna Lachuá")
    pub name: String,
    /// Management category (e.g., "Parque Nacional", "Biotopo")
    pub category: String,
    pub description: Option<String>,
    #[cfg_attr(feature = "binding-generation", ts(type = "number | null"))]
    pub department_id: Option<i64>,
    #[cfg_attr(feature = "binding-generation", ts(type = "number | null"))]
    pub ecosystem_id: Option<i64>,
    /// Centre point latitude
    pub latitude: Option<f64>,
    /// Centre point longitude
    pub longitude: Option<f64>,
    /// Extension in hectares
    pub extension_ha: Option<f64>,
    /// Boundary as a GeoJSON Polygon or MultiPolygon geometry
    pub boundary_geojson: Option<String>,
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Department catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Department {
    pub id: i64,
    pub name: String,
}

/// Ecosystem catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Ecosystem {
    pub id: i64,
    pub name: String,
}

/// Area boundary geometry - either a simple polygon or multi-polygon.
#[derive(Debug, Clone)]
pub enum AreaBoundary {
    Polygon(Polygon<f64>),
    MultiPolygon(MultiPolygon<f64>),
}

impl AreaBoundary {
    /// Parse a GeoJSON geometry, feature, or single-feature collection.
    pub fn parse(json_data: &str) -> Result<Self, BoundaryError> {
        let geojson: GeoJson = json_data
            .parse()
            .map_err(|e: geojson::Error| BoundaryError::Parse(e.to_string()))?;

        let value = match geojson {
            GeoJson::Geometry(geometry) => geometry.value,
            GeoJson::Feature(feature) => feature
                .geometry
                .ok_or(BoundaryError::UnsupportedGeometry)?
                .value,
            GeoJson::FeatureCollection(collection) => collection
                .features
                .into_iter()
                .find_map(|f| f.geometry)
                .ok_or(BoundaryError::UnsupportedGeometry)?
                .value,
        };

        Self::convert_geometry(value)
    }

    fn convert_geometry(value: geojson::Value) -> Result<Self, BoundaryError> {
        use std::convert::TryInto;

        let poly_result: Result<Polygon<f64>, _> = value.clone().try_into();
        if let Ok(poly) = poly_result {
            return Ok(AreaBoundary::Polygon(poly));
        }

        let multi_result: Result<MultiPolygon<f64>, _> = value.try_into();
        if let Ok(multi) = multi_result {
            return Ok(AreaBoundary::MultiPolygon(multi));
        }

        Err(BoundaryError::UnsupportedGeometry)
    }

    /// Whether a (latitude, longitude) position lies inside the boundary.
    pub fn contains_position(&self, latitude: f64, longitude: f64) -> bool {
        let point = Point::new(longitude, latitude);
        match self {
            AreaBoundary::Polygon(p) => p.contains(&point),
            AreaBoundary::MultiPolygon(mp) => mp.contains(&point),
        }
    }
}

/// Errors from boundary parsing.
#[derive(Debug, thiserror::Error)]
pub enum BoundaryError {
    #[error("Failed to parse GeoJSON: {0}")]
    Parse(String),

    #[error("Unsupported geometry type (expected Polygon or MultiPolygon)")]
    UnsupportedGeometry,
}

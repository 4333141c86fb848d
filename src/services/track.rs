// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Track summaries built from an activity's GPS points.

use crate::models::{AreaBoundary, GeolocationPoint};
use geo::{Coord, Distance, Haversine, LineString, Point};
use serde::Serialize;

/// Polyline precision (5 decimal places, ~1 m).
const POLYLINE_PRECISION: u32 = 5;

#[derive(Debug, thiserror::Error)]
pub enum TrackError {
    #[error("Failed to encode polyline: {0}")]
    Polyline(String),

    #[error("Failed to serialize GeoJSON: {0}")]
    GeoJson(#[from] serde_json::Error),
}

impl From<TrackError> for crate::error::AppError {
    fn from(err: TrackError) -> Self {
        crate::error::AppError::Internal(anyhow::Error::new(err))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackSummary {
    pub point_count: usize,
    /// Great-circle length of the track in metres
    pub distance_meters: f64,
    /// Encoded polyline, empty when there are no points
    pub polyline: String,
    /// GeoJSON Feature with a LineString geometry
    pub geojson: serde_json::Value,
    /// Points outside the activity area's boundary, when it has one
    pub points_outside_area: Option<usize>,
}

/// Summarise points given in insertion order.
pub fn summarize(
    activity_id: i64,
    points: &[GeolocationPoint],
    boundary: Option<&AreaBoundary>,
) -> Result<TrackSummary, TrackError> {
    let line: LineString<f64> = points
        .iter()
        .map(|p| Coord {
            x: p.longitude,
            y: p.latitude,
        })
        .collect();

    let distance_meters: f64 = line
        .lines()
        .map(|segment| Haversine.distance(Point::from(segment.start), Point::from(segment.end)))
        .sum();

    let polyline = polyline::encode_coordinates(line.0.iter().copied(), POLYLINE_PRECISION)
        .map_err(|e| TrackError::Polyline(e.to_string()))?;

    let points_outside_area = boundary.map(|b| {
        points
            .iter()
            .filter(|p| !b.contains_position(p.latitude, p.longitude))
            .count()
    });

    Ok(TrackSummary {
        point_count: points.len(),
        distance_meters,
        polyline,
        geojson: line_feature(activity_id, &line)?,
        points_outside_area,
    })
}

fn line_feature(activity_id: i64, line: &LineString<f64>) -> Result<serde_json::Value, TrackError> {
    let positions = line.0.iter().map(|c| vec![c.x, c.y]).collect();
    let mut properties = serde_json::Map::new();
    properties.insert("activity_id".to_string(), activity_id.into());

    let feature = geojson::Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(geojson::Value::LineString(positions))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    };
    Ok(serde_json::to_value(&feature)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(id: i64, latitude: f64, longitude: f64) -> GeolocationPoint {
        GeolocationPoint {
            id,
            activity_id: 1,
            latitude,
            longitude,
            accuracy_meters: None,
            recorded_at: "2026-03-01T08:00:00.000-06:00".to_string(),
        }
    }

    #[test]
    fn test_empty_track() {
        let summary = summarize(1, &[], None).unwrap();
        assert_eq!(summary.point_count, 0);
        assert_eq!(summary.distance_meters, 0.0);
        assert_eq!(summary.polyline, "");
        assert_eq!(summary.geojson["geometry"]["type"], "LineString");
        assert!(summary.points_outside_area.is_none());
    }

    #[test]
    fn test_distance_of_one_degree_latitude() {
        let points = [point(1, 15.0, -90.0), point(2, 16.0, -90.0)];
        let summary = summarize(1, &points, None).unwrap();
        // One degree of latitude is roughly 111 km.
        assert!((summary.distance_meters - 111_195.0).abs() < 500.0);
        assert_eq!(summary.point_count, 2);
        assert!(!summary.polyline.is_empty());
    }

    #[test]
    fn test_points_outside_boundary_are_counted() {
        let boundary = AreaBoundary::parse(
            r#"{"type":"Polygon","coordinates":[[[-91.0,15.0],[-90.0,15.0],[-90.0,16.0],[-91.0,16.0],[-91.0,15.0]]]}"#,
        )
        .unwrap();
        let points = [
            point(1, 15.5, -90.5),
            point(2, 15.6, -90.4),
            point(3, 17.0, -90.5),
        ];
        let summary = summarize(1, &points, Some(&boundary)).unwrap();
        assert_eq!(summary.points_outside_area, Some(1));
        assert_eq!(summary.geojson["properties"]["activity_id"], 1);
    }
}

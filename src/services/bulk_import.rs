// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! CSV parsing for bulk activity import.
//!
//! Expected header: `category,description,scheduled_at,ranger_email[,area_id]`
//! (any column order, case-insensitive). Each data row is validated on its
//! own; bad rows are reported with their line number and do not stop the
//! rest of the file from parsing.

use crate::models::ActivityCategory;
use crate::time_utils::parse_to_region;
use chrono::{DateTime, FixedOffset};
use serde::Serialize;

/// Hard cap on data rows per import.
pub const MAX_IMPORT_ROWS: usize = 1000;

const REQUIRED_COLUMNS: [&str; 4] = ["category", "description", "scheduled_at", "ranger_email"];

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("CSV is missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("CSV contains no data rows")]
    Empty,

    #[error("CSV has more than {MAX_IMPORT_ROWS} data rows")]
    TooManyRows,

    #[error("Malformed CSV: {0}")]
    Csv(#[from] csv::Error),
}

impl From<ImportError> for crate::error::AppError {
    fn from(err: ImportError) -> Self {
        crate::error::AppError::BadRequest(err.to_string())
    }
}

/// One syntactically valid row, not yet checked against the database.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportRow {
    pub line: u64,
    pub category: ActivityCategory,
    pub description: String,
    pub scheduled_at: DateTime<FixedOffset>,
    pub ranger_email: String,
    pub area_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    pub line: u64,
    pub message: String,
}

impl RowError {
    pub fn new(line: u64, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

#[derive(Debug, Default)]
pub struct ParsedImport {
    pub rows: Vec<ImportRow>,
    pub errors: Vec<RowError>,
}

struct Columns {
    category: usize,
    description: usize,
    scheduled_at: usize,
    ranger_email: usize,
    area_id: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, ImportError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let require = |name: &'static str| find(name).ok_or(ImportError::MissingColumn(name));

        Ok(Self {
            category: require(REQUIRED_COLUMNS[0])?,
            description: require(REQUIRED_COLUMNS[1])?,
            scheduled_at: require(REQUIRED_COLUMNS[2])?,
            ranger_email: require(REQUIRED_COLUMNS[3])?,
            area_id: find("area_id"),
        })
    }
}

/// Parse CSV text into valid rows and per-row errors.
pub fn parse_activity_csv(text: &str, offset_hours: i32) -> Result<ParsedImport, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let columns = Columns::from_headers(reader.headers()?)?;
    let mut parsed = ParsedImport::default();
    let mut seen = 0usize;

    for record in reader.records() {
        let record = record?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        seen += 1;
        if seen > MAX_IMPORT_ROWS {
            return Err(ImportError::TooManyRows);
        }

        let line = record.position().map(|p| p.line()).unwrap_or(0);
        match parse_row(&record, &columns, line, offset_hours) {
            Ok(row) => parsed.rows.push(row),
            Err(message) => parsed.errors.push(RowError::new(line, message)),
        }
    }

    if seen == 0 {
        return Err(ImportError::Empty);
    }
    Ok(parsed)
}

fn parse_row(
    record: &csv::StringRecord,
    columns: &Columns,
    line: u64,
    offset_hours: i32,
) -> Result<ImportRow, String> {
    let field = |idx: usize| record.get(idx).unwrap_or("");

    let raw_category = field(columns.category);
    let category = ActivityCategory::lookup(raw_category)
        .ok_or_else(|| format!("Unknown category '{}'", raw_category))?;

    let description = field(columns.description);
    if description.is_empty() {
        return Err("Description is required".to_string());
    }

    let raw_when = field(columns.scheduled_at);
    let scheduled_at = parse_to_region(raw_when, offset_hours)
        .ok_or_else(|| format!("Invalid scheduled_at '{}'", raw_when))?;

    let ranger_email = field(columns.ranger_email);
    if !ranger_email.contains('@') {
        return Err(format!("Invalid ranger_email '{}'", ranger_email));
    }

    let area_id = match columns.area_id.map(field) {
        None | Some("") => None,
        Some(raw) => Some(
            raw.parse::<i64>()
                .map_err(|_| format!("Invalid area_id '{}'", raw))?,
        ),
    };

    Ok(ImportRow {
        line,
        category,
        description: description.to_string(),
        scheduled_at,
        ranger_email: ranger_email.to_lowercase(),
        area_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_and_invalid_rows_are_separated() {
        let csv = "category,description,scheduled_at,ranger_email,area_id\n\
                   Patrullaje,Recorrido norte,2026-04-01T08:00:00-06:00,ana@example.org,3\n\
                   picnic,Algo,2026-04-01T08:00:00-06:00,ana@example.org,\n\
                   patrol,,2026-04-01T08:00:00-06:00,ana@example.org,\n\
                   maintenance,Limpieza,not-a-date,ana@example.org,\n";
        let parsed = parse_activity_csv(csv, -6).unwrap();

        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.rows[0].category, ActivityCategory::Patrol);
        assert_eq!(parsed.rows[0].area_id, Some(3));
        assert_eq!(parsed.rows[0].line, 2);

        let lines: Vec<u64> = parsed.errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![3, 4, 5]);
    }

    #[test]
    fn test_column_order_and_case_do_not_matter() {
        let csv = "Ranger_Email,Scheduled_At,Description,Category\n\
                   LUIS@example.org,2026-04-02T07:30:00-06:00,Vivero,Reforestación\n";
        let parsed = parse_activity_csv(csv, -6).unwrap();
        assert!(parsed.errors.is_empty());
        assert_eq!(parsed.rows[0].ranger_email, "luis@example.org");
        assert_eq!(parsed.rows[0].category, ActivityCategory::Reforestation);
        assert_eq!(parsed.rows[0].area_id, None);
    }

    #[test]
    fn test_missing_column_is_fatal() {
        let err = parse_activity_csv("category,description\npatrol,x\n", -6).unwrap_err();
        assert!(matches!(err, ImportError::MissingColumn("scheduled_at")));
    }

    #[test]
    fn test_header_only_is_empty() {
        let err =
            parse_activity_csv("category,description,scheduled_at,ranger_email\n", -6).unwrap_err();
        assert!(matches!(err, ImportError::Empty));
    }
}

//! Reading normalization.
//!
//! Turns raw form rows into validated, time-sorted readings. Rows whose value
//! or timestamp does not parse are excluded and reported, never thrown.

use crate::error::ParseError;
use crate::input::{RawReading, RawValue};
use crate::NormalizedReading;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use serde::Serialize;

/// Local date-time layouts accepted from the form, tried in order
const LOCAL_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
];

/// A row excluded during normalization
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct RejectedRow {
    pub id: String,
    pub reason: ParseError,
}

/// What normalization kept and what it dropped
#[derive(Clone, Debug, Serialize, Default, PartialEq)]
pub struct NormalizeReport {
    pub accepted: usize,
    pub rejected: Vec<RejectedRow>,
}

/// Parse a raw value into a finite number
pub fn parse_value(raw: &RawValue) -> Result<f64, ParseError> {
    let n = match raw {
        RawValue::Number(n) => *n,
        RawValue::Text(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Err(ParseError::Empty);
            }
            s.parse::<f64>()
                .map_err(|_| ParseError::NotNumeric(s.to_string()))?
        }
    };

    if n.is_finite() {
        Ok(n)
    } else {
        Err(ParseError::NotFinite)
    }
}

/// Parse a form timestamp as a local date-time
///
/// RFC 3339 input carrying an offset is converted to local time; a bare
/// date is taken as local midnight.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, ParseError> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(ParseError::Empty);
    }

    for fmt in LOCAL_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(ts);
        }
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.with_timezone(&Local).naive_local());
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| ParseError::BadTimestamp(s.to_string()))
}

fn normalize_row(row: &RawReading) -> Result<NormalizedReading, ParseError> {
    let value = parse_value(&row.value)?;
    let ts_date = parse_timestamp(&row.timestamp)?;

    Ok(NormalizedReading {
        id: row.id.clone(),
        timestamp: row.timestamp.clone(),
        value,
        ts_date,
    })
}

/// Normalize raw rows, returning only the readings
pub fn normalize(rows: &[RawReading]) -> Vec<NormalizedReading> {
    normalize_with_report(rows).0
}

/// Normalize raw rows and report which were excluded and why
///
/// The result is sorted ascending by time; the sort is stable so rows with
/// equal timestamps keep their entry order.
pub fn normalize_with_report(rows: &[RawReading]) -> (Vec<NormalizedReading>, NormalizeReport) {
    let mut readings = Vec::with_capacity(rows.len());
    let mut report = NormalizeReport::default();

    for row in rows {
        match normalize_row(row) {
            Ok(reading) => readings.push(reading),
            Err(reason) => {
                tracing::debug!("Excluding reading {:?}: {}", row.id, reason);
                report.rejected.push(RejectedRow {
                    id: row.id.clone(),
                    reason,
                });
            }
        }
    }

    readings.sort_by_key(|r| r.ts_date);
    report.accepted = readings.len();

    if !report.rejected.is_empty() {
        tracing::info!(
            "Normalized {} readings, excluded {}",
            report.accepted,
            report.rejected.len()
        );
    }

    (readings, report)
}

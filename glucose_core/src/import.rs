//! CSV import of reading rows.
//!
//! Expects a header row with `timestamp` (or `ts`) and `value` columns and an
//! optional `id` column. Cells are kept as text; normalization decides later
//! which rows are usable.

use crate::input::{new_row_id, RawReading, RawValue};
use crate::Result;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(default)]
    id: Option<String>,
    #[serde(alias = "ts")]
    timestamp: String,
    value: String,
}

impl From<CsvRow> for RawReading {
    fn from(row: CsvRow) -> Self {
        RawReading {
            id: row
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(new_row_id),
            timestamp: row.timestamp,
            value: RawValue::Text(row.value),
        }
    }
}

/// Read reading rows from any CSV source
pub fn read_readings_csv<R: Read>(reader: R) -> Result<Vec<RawReading>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for record in csv_reader.deserialize::<CsvRow>() {
        rows.push(RawReading::from(record?));
    }

    Ok(rows)
}

/// Read reading rows from a CSV file
pub fn load_readings_csv(path: &Path) -> Result<Vec<RawReading>> {
    let file = std::fs::File::open(path)?;
    let rows = read_readings_csv(file)?;
    tracing::info!("Imported {} reading rows from {:?}", rows.len(), path);
    Ok(rows)
}

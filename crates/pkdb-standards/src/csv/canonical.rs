#![deny(unsafe_code)]

use std::path::Path;

use pkdb_model::MeasurementKind;
use serde::Serialize;

use crate::csv::read_rows;
use crate::error::StandardsError;

/// One row of `canonical_units.csv`.
#[derive(Debug, Clone, Serialize)]
pub struct CanonicalUnitRow {
    pub kind: MeasurementKind,
    pub category: String,
    pub canonical_unit: String,
    pub allowed_units: Vec<String>,
}

pub fn parse_canonical_units_csv(path: &Path) -> Result<Vec<CanonicalUnitRow>, StandardsError> {
    read_rows(path, |row| {
        let kind = row.required("kind")?;
        let kind = kind.parse::<MeasurementKind>().map_err(|e| row.error(e))?;
        Ok(CanonicalUnitRow {
            kind,
            category: row.required("category")?,
            canonical_unit: row.required("canonical_unit")?,
            allowed_units: row.list("allowed_units"),
        })
    })
}

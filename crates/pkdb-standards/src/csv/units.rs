#![deny(unsafe_code)]

use std::path::Path;

use pkdb_units::{AtomicUnit, BaseDimension, Dimension, Prefix};

use crate::csv::read_rows;
use crate::error::StandardsError;

const DIMENSION_COLUMNS: [(&str, BaseDimension); 5] = [
    ("mass", BaseDimension::Mass),
    ("length", BaseDimension::Length),
    ("time", BaseDimension::Time),
    ("substance", BaseDimension::Substance),
    ("iu", BaseDimension::InternationalUnit),
];

/// Parses `atomic_units.csv`.
pub fn parse_atomic_units_csv(path: &Path) -> Result<Vec<AtomicUnit>, StandardsError> {
    read_rows(path, |row| {
        let mut dimension = Dimension::DIMENSIONLESS;
        for (column, base) in DIMENSION_COLUMNS {
            dimension = dimension.with(base, row.exponent(column)?);
        }
        Ok(AtomicUnit {
            symbol: row.required("symbol")?,
            name: row.get("name").unwrap_or_default(),
            factor: row.number("factor")?,
            dimension,
            prefixable: row.flag("prefixable")?,
            mass_equivalent: row.get("mass_equivalent"),
            aliases: row.list("aliases"),
        })
    })
}

/// Parses `unit_prefixes.csv`.
pub fn parse_prefixes_csv(path: &Path) -> Result<Vec<Prefix>, StandardsError> {
    read_rows(path, |row| {
        Ok(Prefix {
            symbol: row.required("symbol")?,
            name: row.get("name").unwrap_or_default(),
            factor: row.number("factor")?,
        })
    })
}

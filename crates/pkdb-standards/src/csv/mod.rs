#![deny(unsafe_code)]

pub mod canonical;
pub mod units;

use std::path::Path;

use crate::error::StandardsError;

/// One CSV row with header-based field access.
pub(crate) struct Row<'a> {
    path: &'a Path,
    headers: &'a csv::StringRecord,
    record: csv::StringRecord,
}

impl Row<'_> {
    pub(crate) fn line(&self) -> u64 {
        self.record.position().map_or(0, csv::Position::line)
    }

    pub(crate) fn get(&self, name: &str) -> Option<String> {
        self.headers
            .iter()
            .position(|h| h == name)
            .and_then(|i| self.record.get(i))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    pub(crate) fn required(&self, name: &str) -> Result<String, StandardsError> {
        self.get(name).ok_or_else(|| self.error(format!("missing {name}")))
    }

    pub(crate) fn number(&self, name: &str) -> Result<f64, StandardsError> {
        let raw = self.required(name)?;
        raw.parse()
            .map_err(|_| self.error(format!("{name} `{raw}` is not a number")))
    }

    pub(crate) fn exponent(&self, name: &str) -> Result<i32, StandardsError> {
        match self.get(name) {
            None => Ok(0),
            Some(raw) => raw
                .parse()
                .map_err(|_| self.error(format!("{name} `{raw}` is not an integer"))),
        }
    }

    pub(crate) fn flag(&self, name: &str) -> Result<bool, StandardsError> {
        match self.get(name).as_deref().map(str::to_ascii_lowercase).as_deref() {
            None | Some("false" | "no" | "0") => Ok(false),
            Some("true" | "yes" | "1") => Ok(true),
            Some(other) => Err(self.error(format!("{name} `{other}` is not a boolean"))),
        }
    }

    /// `;`-separated list, empty entries dropped.
    pub(crate) fn list(&self, name: &str) -> Vec<String> {
        self.get(name)
            .map(|raw| {
                raw.split(';')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn error(&self, message: String) -> StandardsError {
        StandardsError::Csv {
            path: self.path.to_path_buf(),
            line: self.line(),
            message,
        }
    }
}

/// Reads `path` and calls `parse` for every data row.
pub(crate) fn read_rows<T>(
    path: &Path,
    mut parse: impl FnMut(&Row<'_>) -> Result<T, StandardsError>,
) -> Result<Vec<T>, StandardsError> {
    let bytes = std::fs::read(path).map_err(|e| StandardsError::io(path, e))?;
    let csv_error = |e: csv::Error| StandardsError::Csv {
        path: path.to_path_buf(),
        line: e.position().map_or(0, csv::Position::line),
        message: e.to_string(),
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(bytes.as_slice());
    let headers = reader.headers().map_err(csv_error)?.clone();

    let mut results = Vec::new();
    for record in reader.records() {
        let row = Row {
            path,
            headers: &headers,
            record: record.map_err(csv_error)?,
        };
        results.push(parse(&row)?);
    }
    Ok(results)
}

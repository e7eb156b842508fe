#![deny(unsafe_code)]

use serde::Serialize;

use crate::manifest::{ManifestFile, Pins};
use crate::registry::{StandardsRegistry, VerifySummary};

#[derive(Debug, Clone, Serialize)]
pub struct DoctorReport {
    pub schema: String,
    pub schema_version: u32,
    pub pins: Pins,
    pub files: Vec<ManifestFile>,
    pub counts: DoctorCounts,
    pub time_unit: String,
    pub categories: Vec<DoctorCategory>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DoctorCounts {
    pub files: usize,
    pub atomic_units: usize,
    pub prefixes: usize,
    pub output_categories: usize,
    pub intervention_categories: usize,
    pub characteristic_categories: usize,
}

/// One category with its canonical units, primary first.
#[derive(Debug, Clone, Serialize)]
pub struct DoctorCategory {
    pub kind: String,
    pub category: String,
    pub canonical: Vec<String>,
    pub allowed: usize,
}

impl DoctorReport {
    pub fn from_registry(registry: &StandardsRegistry, summary: &VerifySummary) -> Self {
        let categories = registry
            .canonical
            .iter()
            .map(|entry| DoctorCategory {
                kind: entry.kind.to_string(),
                category: entry.category.clone(),
                canonical: entry
                    .canonical
                    .iter()
                    .map(|unit| unit.symbol().to_string())
                    .collect(),
                allowed: entry.allowed.len(),
            })
            .collect();
        Self {
            schema: "pkdb.standards-doctor".to_string(),
            schema_version: 1,
            pins: summary.manifest_pins.clone(),
            files: registry.files.clone(),
            counts: DoctorCounts {
                files: summary.file_count,
                atomic_units: summary.atomic_unit_count,
                prefixes: summary.prefix_count,
                output_categories: summary.output_categories,
                intervention_categories: summary.intervention_categories,
                characteristic_categories: summary.characteristic_categories,
            },
            time_unit: summary.time_unit.clone(),
            categories,
        }
    }
}

#![deny(unsafe_code)]

use serde::{Deserialize, Serialize};

pub const MANIFEST_SCHEMA: &str = "pkdb.standards-manifest";
pub const MANIFEST_SCHEMA_VERSION: u32 = 1;

/// Contents of `standards/manifest.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub manifest: ManifestHeader,
    #[serde(default)]
    pub notes: Option<ManifestNotes>,
    pub pins: Pins,
    pub files: Vec<ManifestFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestHeader {
    pub schema: String,
    pub schema_version: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestNotes {
    pub summary: Option<String>,
}

/// Versions of the unit tables the manifest pins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pins {
    pub units: String,
    pub canonical_units: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestFile {
    pub path: String,
    pub sha256: String,
    pub kind: String,
    pub role: String,
    #[serde(default)]
    pub notes: Option<String>,
}

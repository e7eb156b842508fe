#![deny(unsafe_code)]

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use pkdb_model::MeasurementKind;
use pkdb_units::{CanonicalUnitTable, UnitRegistry};
use sha2::Digest;

use crate::csv::canonical::{CanonicalUnitRow, parse_canonical_units_csv};
use crate::csv::units::{parse_atomic_units_csv, parse_prefixes_csv};
use crate::error::StandardsError;
use crate::manifest::{MANIFEST_SCHEMA, MANIFEST_SCHEMA_VERSION, Manifest, ManifestFile, Pins};

pub const ROLE_ATOMIC_UNITS: &str = "atomic_units";
pub const ROLE_UNIT_PREFIXES: &str = "unit_prefixes";
pub const ROLE_CANONICAL_UNITS: &str = "canonical_units";

const REQUIRED_ROLES: &[&str] = &[ROLE_ATOMIC_UNITS, ROLE_UNIT_PREFIXES, ROLE_CANONICAL_UNITS];

const ALLOWED_KINDS: &[&str] = &["csv", "toml", "other"];

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(sha2::Sha256::digest(bytes))
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct VerifySummary {
    pub standards_dir: PathBuf,
    pub manifest_pins: Pins,
    pub file_count: usize,
    pub atomic_unit_count: usize,
    pub prefix_count: usize,
    pub output_categories: usize,
    pub intervention_categories: usize,
    pub characteristic_categories: usize,
    pub time_unit: String,
}

/// Verified unit configuration, ready for normalization.
#[derive(Debug, Clone)]
pub struct StandardsRegistry {
    pub manifest: Manifest,
    pub files: Vec<ManifestFile>,
    pub units: UnitRegistry,
    pub canonical: CanonicalUnitTable,
}

impl StandardsRegistry {
    /// Validates the manifest, checks every digest, then builds the unit
    /// registry and canonical-unit table. Any unparseable canonical or
    /// allowed unit is rejected here rather than at normalization time.
    pub fn verify_and_load(standards_dir: &Path) -> Result<(Self, VerifySummary), StandardsError> {
        let manifest = load_manifest(&standards_dir.join("manifest.toml"))?;

        validate_manifest(&manifest, standards_dir)?;

        let mut files = manifest.files.clone();
        files.sort_by(|a, b| a.path.cmp(&b.path));

        for file in &files {
            verify_file(standards_dir, file)?;
        }

        let atoms_path = resolve_role_path(standards_dir, &files, ROLE_ATOMIC_UNITS)?;
        let prefixes_path = resolve_role_path(standards_dir, &files, ROLE_UNIT_PREFIXES)?;
        let canonical_path = resolve_role_path(standards_dir, &files, ROLE_CANONICAL_UNITS)?;

        let atoms = parse_atomic_units_csv(&atoms_path)?;
        let prefixes = parse_prefixes_csv(&prefixes_path)?;
        let units = UnitRegistry::new(atoms, prefixes)
            .map_err(|e| StandardsError::units(&atoms_path, e))?;

        let rows = parse_canonical_units_csv(&canonical_path)?;
        let canonical = build_canonical_table(&units, &rows)
            .map_err(|e| StandardsError::units(&canonical_path, e))?;

        let summary = VerifySummary {
            standards_dir: standards_dir.to_path_buf(),
            manifest_pins: manifest.pins.clone(),
            file_count: files.len(),
            atomic_unit_count: units.atoms().len(),
            prefix_count: units.prefixes().len(),
            output_categories: canonical.categories(MeasurementKind::Output).count(),
            intervention_categories: canonical.categories(MeasurementKind::Intervention).count(),
            characteristic_categories: canonical
                .categories(MeasurementKind::Characteristic)
                .count(),
            time_unit: canonical
                .time_unit()
                .map(|unit| unit.symbol().to_string())
                .unwrap_or_default(),
        };

        tracing::info!(
            standards_dir = %standards_dir.display(),
            atoms = summary.atomic_unit_count,
            categories = canonical.len(),
            "standards loaded"
        );

        Ok((
            Self {
                manifest,
                files,
                units,
                canonical,
            },
            summary,
        ))
    }
}

fn build_canonical_table(
    units: &UnitRegistry,
    rows: &[CanonicalUnitRow],
) -> pkdb_units::Result<CanonicalUnitTable> {
    let mut table = CanonicalUnitTable::new();
    for row in rows {
        let canonical = units.parse_unit(&row.canonical_unit)?;
        let allowed = row
            .allowed_units
            .iter()
            .map(|unit| units.parse_unit(unit))
            .collect::<pkdb_units::Result<Vec<_>>>()?;
        table.insert(row.kind, &row.category, canonical, allowed)?;
    }
    table.validate()?;
    Ok(table)
}

fn load_manifest(path: &Path) -> Result<Manifest, StandardsError> {
    let contents = std::fs::read_to_string(path).map_err(|e| StandardsError::io(path, e))?;
    toml::from_str(&contents).map_err(|e| StandardsError::Toml {
        path: path.to_path_buf(),
        source: e,
    })
}

fn validate_manifest(manifest: &Manifest, standards_dir: &Path) -> Result<(), StandardsError> {
    if manifest.manifest.schema != MANIFEST_SCHEMA {
        return Err(StandardsError::InvalidManifest {
            message: format!("unsupported schema: {}", manifest.manifest.schema),
        });
    }
    if manifest.manifest.schema_version != MANIFEST_SCHEMA_VERSION {
        return Err(StandardsError::InvalidManifest {
            message: format!(
                "unsupported schema_version: {}",
                manifest.manifest.schema_version
            ),
        });
    }

    let mut roles: BTreeSet<&str> = BTreeSet::new();
    let mut manifest_paths: BTreeSet<PathBuf> = BTreeSet::new();

    for file in &manifest.files {
        if !roles.insert(file.role.as_str()) {
            return Err(StandardsError::DuplicateRole {
                role: file.role.clone(),
            });
        }

        if !ALLOWED_KINDS.contains(&file.kind.as_str()) {
            return Err(StandardsError::InvalidManifest {
                message: format!("unsupported kind '{}' for {}", file.kind, file.path),
            });
        }

        validate_sha(&file.sha256, &file.path)?;

        let path = validate_path(&file.path)?;
        manifest_paths.insert(normalize_path(&path));
    }

    for role in REQUIRED_ROLES {
        if !roles.contains(role) {
            return Err(StandardsError::MissingRole {
                role: role.to_string(),
            });
        }
    }

    for path in list_files_under(standards_dir)? {
        if path == Path::new("manifest.toml") {
            continue;
        }
        if !manifest_paths.contains(&normalize_path(&path)) {
            return Err(StandardsError::UnexpectedFile {
                path: standards_dir.join(path),
            });
        }
    }

    Ok(())
}

fn verify_file(standards_dir: &Path, file: &ManifestFile) -> Result<(), StandardsError> {
    let full_path = standards_dir.join(&file.path);
    let bytes = std::fs::read(&full_path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            StandardsError::MissingFile {
                path: full_path.clone(),
            }
        } else {
            StandardsError::io(full_path.clone(), e)
        }
    })?;

    let actual = sha256_hex(&bytes);
    let expected = file.sha256.to_ascii_lowercase();
    if actual != expected {
        return Err(StandardsError::Sha256Mismatch {
            path: full_path,
            expected,
            actual,
        });
    }
    Ok(())
}

fn resolve_role_path(
    standards_dir: &Path,
    files: &[ManifestFile],
    role: &str,
) -> Result<PathBuf, StandardsError> {
    let file = files
        .iter()
        .find(|f| f.role == role)
        .ok_or_else(|| StandardsError::MissingRole {
            role: role.to_string(),
        })?;
    Ok(standards_dir.join(&file.path))
}

fn validate_sha(sha: &str, path: &str) -> Result<(), StandardsError> {
    if sha.len() != 64 || !sha.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(StandardsError::InvalidSha256 {
            path: PathBuf::from(path),
            message: "sha256 must be 64 hex characters".to_string(),
        });
    }
    Ok(())
}

fn validate_path(path: &str) -> Result<PathBuf, StandardsError> {
    let invalid = |message: &str| StandardsError::InvalidPath {
        path: PathBuf::from(path),
        message: message.to_string(),
    };
    if path.contains('\\') {
        return Err(invalid("manifest path must use '/' separators"));
    }
    let p = PathBuf::from(path);
    if p.is_absolute() {
        return Err(invalid("manifest path must be relative"));
    }
    if p.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(invalid("manifest path must not traverse out of standards/"));
    }
    Ok(p)
}

fn list_files_under(root: &Path) -> Result<BTreeSet<PathBuf>, StandardsError> {
    let mut stack = vec![root.to_path_buf()];
    let mut files = BTreeSet::new();

    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir).map_err(|e| StandardsError::io(&dir, e))? {
            let entry = entry.map_err(|e| StandardsError::io(&dir, e))?;
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if path.is_file() {
                let rel = path
                    .strip_prefix(root)
                    .map_err(|e| StandardsError::InvalidPath {
                        path: path.clone(),
                        message: format!("failed to relativize path: {e}"),
                    })?
                    .to_path_buf();
                files.insert(rel);
            }
        }
    }

    Ok(files)
}

fn normalize_path(p: &Path) -> PathBuf {
    p.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

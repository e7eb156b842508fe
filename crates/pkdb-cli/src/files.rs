//! Study input and result output files.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use polars::prelude::{CsvWriter, SerWriter};
use serde::Serialize;

use pkdb_core::{PipelineState, PkBundleSummary, PkInputBundle, StudySummary};
use pkdb_model::{IssueReport, Study};

/// File name of the bundle index written next to the profile CSVs.
pub const BUNDLE_INDEX: &str = "bundles.json";

/// Normalized study document written by `pkdb normalize --output`.
#[derive(Debug, Serialize)]
pub struct NormalizedDocument<'a> {
    pub study: &'a Study,
    pub summary: &'a StudySummary,
    pub report: &'a IssueReport,
}

impl<'a> NormalizedDocument<'a> {
    pub fn new(state: &'a PipelineState) -> Self {
        Self {
            study: &state.study,
            summary: &state.summary,
            report: &state.report,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BundleIndexEntry {
    pub file: String,
    #[serde(flatten)]
    pub bundle: PkBundleSummary,
}

pub fn read_study(path: &Path) -> Result<Study> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let study: Study = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parse study {}", path.display()))?;
    Ok(study)
}

pub fn write_normalized(path: &Path, state: &PipelineState) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &NormalizedDocument::new(state))
        .with_context(|| format!("write {}", path.display()))?;
    writer.flush()?;
    Ok(())
}

/// CSV file name of a bundle: compound and source record index.
pub fn bundle_file_name(bundle: &PkInputBundle) -> String {
    let compound: String = bundle
        .compound
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{compound}_{:03}.csv", bundle.source.index)
}

/// Writes one `time,concentration` CSV per bundle and the bundle index.
/// Returns the paths written, index last.
pub fn write_pk_bundles(output_dir: &Path, bundles: &[PkInputBundle]) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("create {}", output_dir.display()))?;

    let mut written = Vec::with_capacity(bundles.len() + 1);
    let mut index = Vec::with_capacity(bundles.len());
    for bundle in bundles {
        let name = bundle_file_name(bundle);
        let path = output_dir.join(&name);
        let mut frame = bundle
            .to_frame()
            .with_context(|| format!("build frame for {}", bundle.source))?;
        let mut file = File::create(&path).with_context(|| format!("create {}", path.display()))?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(&mut frame)
            .with_context(|| format!("write {}", path.display()))?;
        tracing::debug!(path = %path.display(), points = bundle.time.len(), "profile written");
        written.push(path);
        index.push(BundleIndexEntry {
            file: name,
            bundle: bundle.summary(),
        });
    }

    let index_path = output_dir.join(BUNDLE_INDEX);
    let file =
        File::create(&index_path).with_context(|| format!("create {}", index_path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &index)
        .with_context(|| format!("write {}", index_path.display()))?;
    writer.flush()?;
    written.push(index_path);
    Ok(written)
}

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::info;

use pkdb_cli::files::{read_study, write_normalized, write_pk_bundles};
use pkdb_cli::summary::units_table;
use pkdb_core::{PipelineState, StudyContext, build_default_pipeline, build_normalization_pipeline};
use pkdb_model::NormalizationOptions;
use pkdb_standards::{DoctorReport, StandardsRegistry, load_default_standards, standards_root};

use crate::cli::{DoctorArgs, NormalizeArgs, PkArgs, UnitsArgs};

/// Outcome of `pkdb pk`.
pub struct PkRun {
    pub state: PipelineState,
    pub written: Vec<PathBuf>,
}

pub fn run_normalize(args: &NormalizeArgs) -> Result<PipelineState> {
    let start = Instant::now();
    let standards = load_default_standards().context("load standards")?;
    let study = read_study(&args.study)?;
    let ctx = StudyContext::from_standards(&standards).with_options(args.options());
    let state = build_normalization_pipeline()
        .run(&ctx, study)
        .with_context(|| format!("normalize {}", args.study.display()))?;

    if let Some(path) = &args.output {
        write_normalized(path, &state)?;
        info!(path = %path.display(), "normalized study written");
    }
    info!(
        duration_ms = start.elapsed().as_millis() as u64,
        rejected = state.summary.rejected(),
        "normalize finished"
    );
    Ok(state)
}

pub fn run_pk(args: &PkArgs) -> Result<PkRun> {
    let start = Instant::now();
    let standards = load_default_standards().context("load standards")?;
    let study = read_study(&args.study)?;
    let ctx = StudyContext::from_standards(&standards).with_options(NormalizationOptions::default());
    let state = build_default_pipeline()
        .run(&ctx, study)
        .with_context(|| format!("process {}", args.study.display()))?;

    let written = write_pk_bundles(&args.output_dir, &state.bundles)?;
    info!(
        output_dir = %args.output_dir.display(),
        bundles = state.bundles.len(),
        duration_ms = start.elapsed().as_millis() as u64,
        "pk inputs written"
    );
    Ok(PkRun { state, written })
}

pub fn run_units(args: &UnitsArgs) -> Result<()> {
    let standards = load_default_standards().context("load standards")?;
    let table = units_table(&standards.canonical, args.kind.map(Into::into));
    println!("{table}");
    Ok(())
}

pub fn run_doctor(args: &DoctorArgs) -> Result<()> {
    let dir = args.standards_dir.clone().unwrap_or_else(standards_root);
    let (registry, summary) = StandardsRegistry::verify_and_load(&dir)
        .with_context(|| format!("verify standards in {}", dir.display()))?;
    let report = DoctorReport::from_registry(&registry, &summary);
    let json = serde_json::to_string_pretty(&report).context("serialize doctor report")?;
    println!("{json}");
    Ok(())
}

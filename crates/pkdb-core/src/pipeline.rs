//! Study processing pipeline with ordered step execution.
//!
//! Each step implements [`ProcessingStep`] and runs in order against a
//! shared [`PipelineState`].
//!
//! # Standard Pipeline Order
//!
//! 1. **ReferenceCheckStep** - substance and group references resolve
//! 2. **ScalarNormalizationStep** - interventions, subject characteristica, outputs
//! 3. **TimecourseNormalizationStep** - time courses
//! 4. **PkDerivationStep** - PK inputs from normalized concentration time courses
//!
//! Scalar records come first: PK derivation reads the normalized, final
//! dosing interventions and bodyweights.

use std::collections::BTreeMap;

use serde::Serialize;

use pkdb_model::{
    CONCENTRATION, Characteristica, Intervention, IssueReport, Measurement, Normed, Output,
    RecordId, RecordIssue, RecordKind, Study, Timecourse,
};
use pkdb_normalization::NormalizationContext;

use crate::context::StudyContext;
use crate::error::PipelineError;
use crate::pk::{PkInputBundle, derive_pk_context};

/// A single processing step in the study pipeline.
pub trait ProcessingStep: Send + Sync {
    fn execute(&self, ctx: &StudyContext<'_>, state: &mut PipelineState)
    -> Result<(), PipelineError>;

    /// Human-readable name for this step (for logging/debugging).
    fn step_name(&self) -> &str;

    /// Whether this step should be skipped. Default runs the step.
    fn should_skip(&self, _ctx: &StudyContext<'_>, _state: &PipelineState) -> bool {
        false
    }
}

/// Per-kind record counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KindSummary {
    pub total: usize,
    pub converted: usize,
    pub unchanged: usize,
    pub rejected: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StudySummary {
    pub kinds: BTreeMap<RecordKind, KindSummary>,
    pub bundles: usize,
}

impl StudySummary {
    pub fn kind(&self, kind: RecordKind) -> KindSummary {
        self.kinds.get(&kind).copied().unwrap_or_default()
    }

    pub fn rejected(&self) -> usize {
        self.kinds.values().map(|k| k.rejected).sum()
    }
}

/// State shared across pipeline steps.
#[derive(Debug)]
pub struct PipelineState {
    /// The study as uploaded. Never modified.
    pub raw: Study,
    /// Normalized study. Rejected records are left out.
    pub study: Study,
    pub interventions: Vec<Normed<Intervention>>,
    pub characteristica: Vec<Normed<Characteristica>>,
    pub outputs: Vec<Normed<Output>>,
    pub timecourses: Vec<Normed<Timecourse>>,
    pub bundles: Vec<PkInputBundle>,
    pub report: IssueReport,
    pub summary: StudySummary,
    /// Step execution log for debugging.
    pub executed_steps: Vec<String>,
}

impl PipelineState {
    pub fn new(study: Study) -> Self {
        Self {
            report: IssueReport::new(study.name.clone()),
            study: study.clone(),
            raw: study,
            interventions: Vec::new(),
            characteristica: Vec::new(),
            outputs: Vec::new(),
            timecourses: Vec::new(),
            bundles: Vec::new(),
            summary: StudySummary::default(),
            executed_steps: Vec::new(),
        }
    }

    /// Counts a normalization outcome and records its issue. With
    /// `fail_fast` a rejection ends the run.
    fn admit<R: Measurement>(
        &mut self,
        outcome: Result<Normed<R>, RecordIssue>,
        fail_fast: bool,
    ) -> Result<Option<Normed<R>>, PipelineError> {
        let counts = self.summary.kinds.entry(R::KIND).or_default();
        counts.total += 1;
        match outcome {
            Ok(normed) => {
                if normed.is_converted() {
                    counts.converted += 1;
                } else {
                    counts.unchanged += 1;
                }
                Ok(Some(normed))
            }
            Err(issue) => {
                counts.rejected += 1;
                tracing::warn!(record = %issue.record, message = %issue.message, "record rejected");
                if fail_fast {
                    return Err(PipelineError::Rejected {
                        record: issue.record,
                        message: issue.message,
                    });
                }
                self.report.push(issue);
                Ok(None)
            }
        }
    }
}

/// Sample count for statistics completion: the record's own count, else
/// the count of its group. Records of a single individual get none.
pub fn resolve_count<R: Measurement>(study: &Study, record: &R) -> Option<u32> {
    record
        .count()
        .or_else(|| study.group_count(record.group(), record.individual()))
}

/// Validates and normalizes a copy of `raw`. The raw record is kept as is.
pub fn normalize_record<R: Measurement>(
    normalizer: &NormalizationContext<'_>,
    id: RecordId,
    raw: &R,
    count: Option<u32>,
) -> Result<Normed<R>, RecordIssue> {
    let span = tracing::info_span!("normalize", record = %id);
    let _guard = span.enter();

    if let Err(err) = raw.validate(&id) {
        let mut issue = RecordIssue::reject(id, err.to_string()).with_unit(raw.unit());
        if let Some(field) = err.field() {
            issue = issue.with_field(field);
        }
        return Err(issue);
    }

    let mut record = raw.clone();
    match normalizer.normalize_with_count(&mut record, count) {
        Ok(result) if result.is_noop() => Ok(Normed::unchanged(id, raw.clone())),
        Ok(result) => {
            tracing::debug!(
                unit = ?result.unit.as_ref().map(|c| c.to.as_str()),
                derived = result.derived.len(),
                "record normalized"
            );
            Ok(Normed::converted(id, raw.clone(), record))
        }
        Err(err) => {
            let unit = if err.is_time_error() {
                raw.time().and_then(|(_, unit)| unit)
            } else {
                raw.unit()
            };
            Err(RecordIssue::reject(id, err.to_string()).with_unit(unit))
        }
    }
}

// ============================================================================
// Standard Processing Steps
// ============================================================================

/// Step 1: substance and group references must resolve.
pub struct ReferenceCheckStep;

impl ProcessingStep for ReferenceCheckStep {
    fn execute(
        &self,
        _ctx: &StudyContext<'_>,
        state: &mut PipelineState,
    ) -> Result<(), PipelineError> {
        state.raw.check_references()?;
        Ok(())
    }

    fn step_name(&self) -> &str {
        "reference_check"
    }
}

/// Step 2: normalize interventions, subject characteristica and outputs.
pub struct ScalarNormalizationStep;

impl ProcessingStep for ScalarNormalizationStep {
    fn execute(
        &self,
        ctx: &StudyContext<'_>,
        state: &mut PipelineState,
    ) -> Result<(), PipelineError> {
        let raw = state.raw.clone();
        let substances = raw.substance_catalog();
        let normalizer = ctx.normalizer(&substances);
        let fail_fast = ctx.options.fail_fast;

        for (index, intervention) in raw.interventions.iter().enumerate() {
            let id = RecordId::new(RecordKind::Intervention, index).with_label(&intervention.name);
            let outcome = normalize_record(&normalizer, id, intervention, intervention.count());
            if let Some(normed) = state.admit(outcome, fail_fast)? {
                state.interventions.push(normed);
            }
        }
        state.study.interventions = finals(&state.interventions);

        let mut index = 0;
        for (position, group) in raw.groups.iter().enumerate() {
            let mut kept = Vec::new();
            for characteristica in &group.characteristica {
                let id = RecordId::new(RecordKind::Characteristica, index)
                    .with_label(format!("group {}/{}", group.name, characteristica.category));
                index += 1;
                let count = characteristica.count.or(group.count);
                let outcome = normalize_record(&normalizer, id, characteristica, count);
                if let Some(normed) = state.admit(outcome, fail_fast)? {
                    kept.push(normed.record.clone());
                    state.characteristica.push(normed);
                }
            }
            state.study.groups[position].characteristica = kept;
        }
        for (position, individual) in raw.individuals.iter().enumerate() {
            let mut kept = Vec::new();
            for characteristica in &individual.characteristica {
                let id = RecordId::new(RecordKind::Characteristica, index).with_label(format!(
                    "individual {}/{}",
                    individual.name, characteristica.category
                ));
                index += 1;
                let outcome =
                    normalize_record(&normalizer, id, characteristica, characteristica.count);
                if let Some(normed) = state.admit(outcome, fail_fast)? {
                    kept.push(normed.record.clone());
                    state.characteristica.push(normed);
                }
            }
            state.study.individuals[position].characteristica = kept;
        }

        for (index, output) in raw.outputs.iter().enumerate() {
            let id = RecordId::new(RecordKind::Output, index).with_label(&output.pktype);
            let count = resolve_count(&raw, output);
            let outcome = normalize_record(&normalizer, id, output, count);
            if let Some(normed) = state.admit(outcome, fail_fast)? {
                state.outputs.push(normed);
            }
        }
        state.study.outputs = finals(&state.outputs);

        tracing::info!(
            interventions = state.interventions.len(),
            characteristica = state.characteristica.len(),
            outputs = state.outputs.len(),
            "scalar records normalized"
        );
        Ok(())
    }

    fn step_name(&self) -> &str {
        "scalar_normalization"
    }
}

/// Step 3: normalize time courses.
pub struct TimecourseNormalizationStep;

impl ProcessingStep for TimecourseNormalizationStep {
    fn execute(
        &self,
        ctx: &StudyContext<'_>,
        state: &mut PipelineState,
    ) -> Result<(), PipelineError> {
        let raw = state.raw.clone();
        let substances = raw.substance_catalog();
        let normalizer = ctx.normalizer(&substances);

        for (index, timecourse) in raw.timecourses.iter().enumerate() {
            let id = RecordId::new(RecordKind::Timecourse, index).with_label(&timecourse.pktype);
            let count = resolve_count(&raw, timecourse);
            let outcome = normalize_record(&normalizer, id, timecourse, count);
            if let Some(normed) = state.admit(outcome, ctx.options.fail_fast)? {
                state.timecourses.push(normed);
            }
        }
        state.study.timecourses = finals(&state.timecourses);

        tracing::info!(timecourses = state.timecourses.len(), "time courses normalized");
        Ok(())
    }

    fn step_name(&self) -> &str {
        "timecourse_normalization"
    }

    fn should_skip(&self, _ctx: &StudyContext<'_>, state: &PipelineState) -> bool {
        state.raw.timecourses.is_empty()
    }
}

/// Step 4: derive PK inputs from normalized concentration time courses.
///
/// A time course that cannot be turned into PK inputs is reported as a
/// warning; its normalized record is kept.
pub struct PkDerivationStep;

impl ProcessingStep for PkDerivationStep {
    fn execute(
        &self,
        ctx: &StudyContext<'_>,
        state: &mut PipelineState,
    ) -> Result<(), PipelineError> {
        let mut bundles = Vec::new();
        let mut issues = Vec::new();
        for normed in &state.timecourses {
            if normed.record.pktype != CONCENTRATION {
                tracing::debug!(record = %normed.id, "not a concentration profile");
                continue;
            }
            let span = tracing::info_span!("pk", record = %normed.id);
            let _guard = span.enter();
            match derive_pk_context(ctx.units, &state.study, &normed.id, &normed.record) {
                Ok(bundle) => bundles.push(bundle),
                Err(err) => {
                    tracing::warn!(%err, "pk inputs not derived");
                    issues.push(RecordIssue::warning(normed.id.clone(), err.to_string()));
                }
            }
        }
        for issue in issues {
            state.report.push(issue);
        }
        state.summary.bundles = bundles.len();
        state.bundles = bundles;
        tracing::info!(bundles = state.bundles.len(), "pk inputs derived");
        Ok(())
    }

    fn step_name(&self) -> &str {
        "pk_derivation"
    }

    fn should_skip(&self, _ctx: &StudyContext<'_>, state: &PipelineState) -> bool {
        state.timecourses.is_empty()
    }
}

fn finals<R: Clone>(normed: &[Normed<R>]) -> Vec<R> {
    normed.iter().map(|n| n.record.clone()).collect()
}

/// An ordered pipeline of processing steps.
pub struct StudyPipeline {
    steps: Vec<Box<dyn ProcessingStep>>,
}

impl Default for StudyPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl StudyPipeline {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Add a step to the end of the pipeline.
    pub fn add_step(mut self, step: Box<dyn ProcessingStep>) -> Self {
        self.steps.push(step);
        self
    }

    /// Insert a step at a specific position.
    pub fn insert_step(mut self, index: usize, step: Box<dyn ProcessingStep>) -> Self {
        self.steps.insert(index, step);
        self
    }

    /// Remove a step by name.
    pub fn remove_step(mut self, step_name: &str) -> Self {
        self.steps.retain(|s| s.step_name() != step_name);
        self
    }

    /// Runs every step in order on `study`.
    pub fn run(&self, ctx: &StudyContext<'_>, study: Study) -> Result<PipelineState, PipelineError> {
        let span = tracing::info_span!("study", study = %study.name);
        let _guard = span.enter();

        let mut state = PipelineState::new(study);
        for step in &self.steps {
            if step.should_skip(ctx, &state) {
                tracing::debug!(step = step.step_name(), "step skipped");
                continue;
            }
            step.execute(ctx, &mut state)?;
            state.executed_steps.push(step.step_name().to_string());
        }

        tracing::info!(
            rejected = state.summary.rejected(),
            warnings = state.report.warning_count(),
            bundles = state.bundles.len(),
            "study processed"
        );
        Ok(state)
    }

    /// List step names in execution order.
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.step_name()).collect()
    }
}

/// Reference check plus scalar and time-course normalization.
pub fn build_normalization_pipeline() -> StudyPipeline {
    StudyPipeline::new()
        .add_step(Box::new(ReferenceCheckStep))
        .add_step(Box::new(ScalarNormalizationStep))
        .add_step(Box::new(TimecourseNormalizationStep))
}

/// The normalization pipeline followed by PK derivation.
pub fn build_default_pipeline() -> StudyPipeline {
    build_normalization_pipeline().add_step(Box::new(PkDerivationStep))
}

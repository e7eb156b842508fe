//! Tests for the study processing pipeline.

use pkdb_core::{
    PipelineError, PipelineState, ProcessingStep, StudyContext, StudyPipeline,
    build_default_pipeline, build_normalization_pipeline,
};
use pkdb_model::{
    CentralTendency, ModelError, NormalizationOptions, RecordKind, StatField, Study,
};
use pkdb_standards::{StandardsRegistry, load_default_standards};
use serde_json::json;

fn close(actual: f64, expected: f64) -> bool {
    (actual - expected).abs() <= 1e-9 * expected.abs().max(1.0)
}

fn standards() -> StandardsRegistry {
    load_default_standards().expect("load standards")
}

fn study() -> Study {
    serde_json::from_value(json!({
        "name": "Test2019",
        "substances": [
            {"name": "caffeine", "mass": 194.19}
        ],
        "groups": [
            {
                "name": "all",
                "count": 12,
                "characteristica": [
                    {"category": "weight", "mean": 72.5, "sd": 8.0, "unit": "kg"},
                    {"category": "sex", "choice": "M"}
                ]
            }
        ],
        "individuals": [
            {
                "name": "S1",
                "group": "all",
                "characteristica": [
                    {"category": "weight", "value": 81.0, "unit": "kg"}
                ]
            }
        ],
        "interventions": [
            {
                "name": "caf100",
                "category": "dosing",
                "substance": "caffeine",
                "route": "oral",
                "application": "single dose",
                "value": 100.0,
                "unit": "mg",
                "time": 0.0,
                "time_unit": "h"
            }
        ],
        "outputs": [
            {"pktype": "auc_inf", "substance": "caffeine", "group": "all", "mean": 48.0, "se": 4.0, "unit": "mg*h/l"},
            {"pktype": "cmax", "substance": "caffeine", "group": "all", "mean": 3.1, "unit": "mg"},
            {"pktype": "tmax", "substance": "caffeine", "group": "all", "value": 30.0, "unit": "min"}
        ],
        "timecourses": [
            {
                "pktype": "concentration",
                "substance": "caffeine",
                "group": "all",
                "interventions": ["caf100"],
                "time": [0.0, 30.0, 60.0],
                "time_unit": "min",
                "mean": [0.0, null, 2.5],
                "unit": "µg/ml"
            }
        ]
    }))
    .expect("deserialize study")
}

fn run(options: NormalizationOptions) -> Result<PipelineState, PipelineError> {
    let standards = standards();
    let ctx = StudyContext::from_standards(&standards).with_options(options);
    build_default_pipeline().run(&ctx, study())
}

// ============================================================================
// Pipeline composition
// ============================================================================

#[test]
fn default_pipeline_step_order() {
    let pipeline = build_default_pipeline();
    assert_eq!(
        pipeline.step_names(),
        vec![
            "reference_check",
            "scalar_normalization",
            "timecourse_normalization",
            "pk_derivation"
        ]
    );

    let trimmed = build_default_pipeline().remove_step("pk_derivation");
    assert_eq!(
        trimmed.step_names(),
        build_normalization_pipeline().step_names()
    );
}

#[test]
fn normalization_pipeline_derives_no_bundles() {
    let standards = standards();
    let ctx = StudyContext::from_standards(&standards);
    let state = build_normalization_pipeline().run(&ctx, study()).unwrap();
    assert_eq!(state.executed_steps.len(), 3);
    assert!(state.bundles.is_empty());
    assert_eq!(state.timecourses.len(), 1);
}

struct RequireTimecourses;

impl ProcessingStep for RequireTimecourses {
    fn execute(
        &self,
        _ctx: &StudyContext<'_>,
        state: &mut PipelineState,
    ) -> Result<(), PipelineError> {
        if state.raw.timecourses.is_empty() {
            return Err(PipelineError::Step {
                step: self.step_name().to_string(),
                message: "study has no time courses".to_string(),
            });
        }
        Ok(())
    }

    fn step_name(&self) -> &str {
        "require_timecourses"
    }
}

#[test]
fn custom_step_can_stop_the_run() {
    let standards = standards();
    let ctx = StudyContext::from_standards(&standards);
    let pipeline = StudyPipeline::new()
        .add_step(Box::new(RequireTimecourses))
        .insert_step(0, Box::new(pkdb_core::ReferenceCheckStep));
    assert_eq!(pipeline.step_names(), vec!["reference_check", "require_timecourses"]);

    let mut bare = study();
    bare.timecourses.clear();
    let err = pipeline.run(&ctx, bare).unwrap_err();
    assert_eq!(
        err.to_string(),
        "pipeline step `require_timecourses` failed: study has no time courses"
    );

    let state = pipeline.run(&ctx, study()).unwrap();
    assert_eq!(state.executed_steps, vec!["reference_check", "require_timecourses"]);
}

// ============================================================================
// Normalization
// ============================================================================

#[test]
fn mixed_study_is_normalized_and_rejects_are_reported() {
    let state = run(NormalizationOptions::default()).unwrap();

    assert_eq!(state.executed_steps.len(), 4);
    assert_eq!(state.raw, study());

    let outputs = state.summary.kind(RecordKind::Output);
    assert_eq!(outputs.total, 3);
    assert_eq!(outputs.converted, 2);
    assert_eq!(outputs.rejected, 1);
    assert_eq!(state.summary.kind(RecordKind::Intervention).unchanged, 1);
    let characteristica = state.summary.kind(RecordKind::Characteristica);
    assert_eq!(characteristica.total, 3);
    assert_eq!(characteristica.converted, 1);
    assert_eq!(characteristica.unchanged, 2);
    assert_eq!(state.summary.kind(RecordKind::Timecourse).converted, 1);
    assert_eq!(state.summary.rejected(), 1);

    assert_eq!(state.report.reject_count(), 1);
    let issue = &state.report.issues[0];
    assert_eq!(issue.record.kind, RecordKind::Output);
    assert_eq!(issue.record.index, 1);
    assert_eq!(issue.unit.as_deref(), Some("mg"));
    assert_eq!(issue.field, None);
    assert!(issue.message.contains("incompatible units"), "{}", issue.message);

    let pktypes: Vec<&str> = state.study.outputs.iter().map(|o| o.pktype.as_str()).collect();
    assert_eq!(pktypes, vec!["auc_inf", "tmax"]);
    assert!(state.study.outputs.iter().all(|o| o.is_final));
}

#[test]
fn output_count_falls_back_to_group() {
    let state = run(NormalizationOptions::default()).unwrap();
    let auc = &state.outputs[0];
    assert_eq!(auc.id.label.as_deref(), Some("auc_inf"));
    let sd = auc.record.statistics.sd.unwrap();
    assert!(close(sd, 4.0 * 12f64.sqrt()), "{sd}");
    assert!(close(auc.record.statistics.cv.unwrap(), sd / 48.0));
    assert_eq!(auc.raw.statistics.sd, None);
}

#[test]
fn scalar_time_conversion() {
    let state = run(NormalizationOptions::default()).unwrap();
    let tmax = state.study.outputs.iter().find(|o| o.pktype == "tmax").unwrap();
    assert_eq!(tmax.unit.as_deref(), Some("h"));
    assert!(close(tmax.statistics.value.unwrap(), 0.5));
}

#[test]
fn group_characteristica_use_group_count() {
    let state = run(NormalizationOptions::default()).unwrap();
    let weight = &state.characteristica[0];
    assert_eq!(weight.id.to_string(), "characteristica[0] (group all/weight)");
    assert!(weight.is_converted());
    assert!(close(weight.record.statistics.se.unwrap(), 8.0 / 12f64.sqrt()));

    let sex = &state.characteristica[1];
    assert!(!sex.is_converted());
    assert!(sex.record.is_final);

    let individual = &state.characteristica[2];
    assert_eq!(individual.id.label.as_deref(), Some("individual S1/weight"));
    assert!(!individual.is_converted());
    assert_eq!(state.study.individuals[0].characteristica.len(), 1);
}

#[test]
fn normed_records_track_finality() {
    let state = run(NormalizationOptions::default()).unwrap();

    let dosing = &state.interventions[0];
    assert!(!dosing.is_converted());
    assert!(dosing.raw.is_final);
    assert_eq!(*dosing.raw, dosing.record);

    let timecourse = &state.timecourses[0];
    assert!(timecourse.is_converted());
    assert!(!timecourse.raw.is_final);
    assert!(timecourse.record.is_final);
    assert_eq!(timecourse.raw.time_unit.as_deref(), Some("min"));
    assert_eq!(timecourse.record.time_unit.as_deref(), Some("h"));
}

#[test]
fn statistics_completion_can_be_disabled() {
    let state = run(NormalizationOptions::default().with_statistics(false)).unwrap();
    let auc = &state.outputs[0];
    assert!(!auc.is_converted());
    assert_eq!(auc.record.statistics.sd, None);
    assert_eq!(state.summary.kind(RecordKind::Characteristica).converted, 0);
}

#[test]
fn fail_fast_stops_at_first_reject() {
    let err = run(NormalizationOptions::default().with_fail_fast(true)).unwrap_err();
    match err {
        PipelineError::Rejected { record, message } => {
            assert_eq!(record.kind, RecordKind::Output);
            assert_eq!(record.index, 1);
            assert!(message.contains("incompatible units"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn allowed_unit_enforcement_rejects_unlisted_spelling() {
    let mut study = study();
    study.outputs[0].unit = Some("g*h/l".to_string());
    let standards = standards();
    let ctx = StudyContext::from_standards(&standards)
        .with_options(NormalizationOptions::default().with_allowed_units(true));
    let state = build_default_pipeline().run(&ctx, study).unwrap();
    assert_eq!(state.summary.kind(RecordKind::Output).rejected, 2);
    let issue = &state.report.issues[0];
    assert_eq!(issue.record.index, 0);
    assert!(issue.message.contains("is not accepted"), "{}", issue.message);
}

#[test]
fn invalid_dosing_is_rejected_before_conversion() {
    let mut study = study();
    study.interventions[0].route = None;
    let standards = standards();
    let ctx = StudyContext::from_standards(&standards);
    let state = build_default_pipeline().run(&ctx, study).unwrap();
    assert_eq!(state.summary.kind(RecordKind::Intervention).rejected, 1);
    assert!(state.study.interventions.is_empty());
    // Without its dosing the profile still yields a bundle, without dose.
    assert_eq!(state.bundles.len(), 1);
    assert!(!state.bundles[0].has_dose());
}

#[test]
fn misaligned_statistic_names_its_field() {
    let mut study = study();
    study.timecourses[0].statistics.sd = Some(vec![Some(0.1)]);
    let standards = standards();
    let ctx = StudyContext::from_standards(&standards);
    let state = build_default_pipeline().run(&ctx, study).unwrap();
    assert_eq!(state.summary.kind(RecordKind::Timecourse).rejected, 1);
    let issue = state
        .report
        .issues
        .iter()
        .find(|issue| issue.record.kind == RecordKind::Timecourse)
        .expect("timecourse issue");
    assert_eq!(issue.field, Some(StatField::Sd));
    assert_eq!(issue.unit.as_deref(), Some("µg/ml"));
    assert!(state.bundles.is_empty());
}

#[test]
fn unresolved_reference_fails_the_study() {
    let mut study = study();
    study.timecourses[0].substance = Some("theophylline".to_string());
    let standards = standards();
    let ctx = StudyContext::from_standards(&standards);
    let err = build_default_pipeline().run(&ctx, study).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::References(ModelError::UnknownSubstance(ref name)) if name == "theophylline"
    ));
}

// ============================================================================
// PK derivation
// ============================================================================

#[test]
fn concentration_profile_yields_bundle() {
    let state = run(NormalizationOptions::default()).unwrap();
    assert_eq!(state.summary.bundles, 1);
    let bundle = &state.bundles[0];
    assert_eq!(bundle.compound, "caffeine");
    assert_eq!(bundle.time_unit, "h");
    assert_eq!(bundle.time.len(), 3);
    assert!(close(bundle.time[1], 0.5));
    assert!(close(bundle.time[2], 1.0));
    assert_eq!(bundle.concentration, vec![Some(0.0), None, Some(2.5)]);
    assert_eq!(bundle.concentration_type, CentralTendency::Mean);
    assert_eq!(bundle.dose, Some(100.0));
    assert_eq!(bundle.dose_unit.as_deref(), Some("mg"));
    assert_eq!(bundle.vd_unit.as_deref(), Some("mg/(µg/ml)"));
    assert_eq!(bundle.bodyweight, Some(72.5));
    assert_eq!(bundle.bodyweight_type, Some(CentralTendency::Mean));
}

#[test]
fn profile_without_concentration_is_a_warning() {
    let mut study = study();
    study.timecourses[0].statistics.mean = None;
    study.timecourses[0].statistics.set(StatField::Sd, Some(vec![Some(0.1); 3]));
    let standards = standards();
    let ctx = StudyContext::from_standards(&standards);
    let state = build_default_pipeline().run(&ctx, study).unwrap();
    assert!(state.bundles.is_empty());
    assert_eq!(state.timecourses.len(), 1);
    assert_eq!(state.report.warning_count(), 1);
    assert!(!state.report.has_errors());
}

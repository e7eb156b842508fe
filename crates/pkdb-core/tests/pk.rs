//! Tests for PK input derivation on normalized studies.

use pkdb_core::{PkDerivationError, derive_pk_context};
use pkdb_model::{CentralTendency, RecordId, RecordKind, Study};
use pkdb_units::UnitRegistry;
use serde_json::{Value, json};

fn dosing(name: &str, value: f64, unit: &str, is_final: bool) -> Value {
    json!({
        "name": name,
        "category": "dosing",
        "substance": "caffeine",
        "route": "oral",
        "application": "single dose",
        "value": value,
        "unit": unit,
        "time": 0.0,
        "time_unit": "h",
        "final": is_final
    })
}

/// A study as it looks after normalization: every kept record is final.
fn normalized_study(interventions: Vec<Value>, references: &[&str]) -> Study {
    serde_json::from_value(json!({
        "name": "Test2019",
        "substances": [{"name": "caffeine", "mass": 194.19}],
        "groups": [
            {
                "name": "all",
                "count": 12,
                "characteristica": [
                    {"category": "weight", "mean": 72.5, "sd": 8.0, "unit": "kg", "final": true}
                ]
            }
        ],
        "individuals": [
            {"name": "S1", "group": "all", "characteristica": []},
            {
                "name": "S2",
                "group": "all",
                "characteristica": [
                    {"category": "weight", "value": 81.0, "unit": "kg", "final": true}
                ]
            }
        ],
        "interventions": interventions,
        "timecourses": [
            {
                "pktype": "concentration",
                "substance": "caffeine",
                "group": "all",
                "interventions": references,
                "time": [0.0, 0.5, 1.0, 2.0],
                "time_unit": "h",
                "mean": [0.0, 1.2, null, 2.5],
                "unit": "µg/ml",
                "final": true
            }
        ]
    }))
    .expect("deserialize study")
}

fn id() -> RecordId {
    RecordId::new(RecordKind::Timecourse, 0).with_label("concentration")
}

#[test]
fn bundle_carries_dose_and_bodyweight() {
    let units = UnitRegistry::builtin();
    let study = normalized_study(vec![dosing("caf100", 100.0, "mg", true)], &["caf100"]);
    let bundle = derive_pk_context(&units, &study, &id(), &study.timecourses[0]).unwrap();

    assert_eq!(bundle.source, id());
    assert_eq!(bundle.compound, "caffeine");
    assert_eq!(bundle.time, vec![0.0, 0.5, 1.0, 2.0]);
    assert_eq!(bundle.concentration, vec![Some(0.0), Some(1.2), None, Some(2.5)]);
    assert_eq!(bundle.concentration_type, CentralTendency::Mean);
    assert!(bundle.has_dose());
    assert_eq!(bundle.dose, Some(100.0));
    assert_eq!(bundle.vd_unit.as_deref(), Some("mg/(µg/ml)"));
    assert_eq!(bundle.bodyweight, Some(72.5));
    assert_eq!(bundle.bodyweight_unit.as_deref(), Some("kg"));
    assert_eq!(bundle.bodyweight_type, Some(CentralTendency::Mean));

    let vd = units.parse_unit(bundle.vd_unit.as_deref().unwrap()).unwrap();
    let litre = units.parse_unit("l").unwrap();
    assert!(vd.is_compatible(&litre));
}

#[test]
fn individual_bodyweight_prefers_own_then_group() {
    let units = UnitRegistry::builtin();
    let mut study = normalized_study(vec![dosing("caf100", 100.0, "mg", true)], &["caf100"]);

    study.timecourses[0].individual = Some("S2".to_string());
    let own = derive_pk_context(&units, &study, &id(), &study.timecourses[0]).unwrap();
    assert_eq!(own.bodyweight, Some(81.0));
    assert_eq!(own.bodyweight_type, Some(CentralTendency::Value));

    study.timecourses[0].individual = Some("S1".to_string());
    let inherited = derive_pk_context(&units, &study, &id(), &study.timecourses[0]).unwrap();
    assert_eq!(inherited.bodyweight, Some(72.5));
}

#[test]
fn several_final_dosings_leave_dose_out() {
    let units = UnitRegistry::builtin();
    let study = normalized_study(
        vec![
            dosing("caf100", 100.0, "mg", true),
            dosing("caf200", 200.0, "mg", true),
        ],
        &["caf100", "caf200"],
    );
    let bundle = derive_pk_context(&units, &study, &id(), &study.timecourses[0]).unwrap();
    assert!(!bundle.has_dose());
    assert_eq!(bundle.vd_unit, None);
    assert_eq!(bundle.bodyweight, Some(72.5));
}

#[test]
fn repeated_reference_counts_one_dosing() {
    let units = UnitRegistry::builtin();
    let study = normalized_study(
        vec![dosing("caf_po", 100.0, "mg", true)],
        &["caf_po", "caf_po"],
    );
    let bundle = derive_pk_context(&units, &study, &id(), &study.timecourses[0]).unwrap();
    assert_eq!(bundle.dose, Some(100.0));
    assert_eq!(bundle.dose_unit.as_deref(), Some("mg"));
}

#[test]
fn non_final_dosing_is_ignored() {
    let units = UnitRegistry::builtin();
    let study = normalized_study(
        vec![
            dosing("caf_planned", 0.1, "g", false),
            dosing("caf100", 100.0, "mg", true),
        ],
        &["caf_planned", "caf100"],
    );
    let bundle = derive_pk_context(&units, &study, &id(), &study.timecourses[0]).unwrap();
    assert_eq!(bundle.dose, Some(100.0));
    assert_eq!(bundle.dose_unit.as_deref(), Some("mg"));
}

#[test]
fn per_bodyweight_dose_is_not_used() {
    let units = UnitRegistry::builtin();
    let study = normalized_study(vec![dosing("caf3", 3.0, "mg/kg", true)], &["caf3"]);
    let bundle = derive_pk_context(&units, &study, &id(), &study.timecourses[0]).unwrap();
    assert!(!bundle.has_dose());
    assert_eq!(bundle.dose_unit, None);
}

#[test]
fn missing_time_unit_is_an_error() {
    let units = UnitRegistry::builtin();
    let mut study = normalized_study(Vec::new(), &[]);
    study.timecourses[0].time_unit = None;
    let err = derive_pk_context(&units, &study, &id(), &study.timecourses[0]).unwrap_err();
    assert!(matches!(err, PkDerivationError::MissingTimeUnit { .. }));
    assert_eq!(
        err.to_string(),
        "timecourse[0] (concentration): time course has no time unit"
    );
}

#[test]
fn profile_frame_and_summary() {
    let units = UnitRegistry::builtin();
    let study = normalized_study(Vec::new(), &[]);
    let bundle = derive_pk_context(&units, &study, &id(), &study.timecourses[0]).unwrap();

    let frame = bundle.to_frame().unwrap();
    assert_eq!(frame.height(), 4);
    assert_eq!(frame.width(), 2);
    let names: Vec<&str> = frame.get_column_names().iter().map(|n| n.as_str()).collect();
    assert_eq!(names, vec!["time", "concentration"]);
    assert_eq!(frame.column("concentration").unwrap().null_count(), 1);

    let summary = bundle.summary();
    assert_eq!(summary.points, 4);
    assert_eq!(summary.dose, None);
    assert_eq!(summary.concentration_unit, "µg/ml");
}

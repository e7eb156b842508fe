//! Tests for pkdb-model types.

use pkdb_model::{
    Measurement, ModelError, Normed, RecordId, RecordKind, StatColumn, Study, WEIGHT,
};
use serde_json::json;

fn study() -> Study {
    serde_json::from_value(json!({
        "name": "Test2019",
        "substances": [
            {"name": "caffeine", "mass": 194.19},
            {"name": "paraxanthine/caffeine", "parents": ["paraxanthine", "caffeine"]}
        ],
        "groups": [
            {
                "name": "all",
                "count": 12,
                "characteristica": [
                    {"category": "weight", "mean": 72.5, "sd": 8.0, "unit": "kg", "final": true},
                    {"category": "sex", "choice": "M", "final": true}
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
            {"pktype": "auc_inf", "substance": "caffeine", "group": "all", "mean": 48.0, "se": 4.0, "unit": "mg*h/l"}
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

#[test]
fn study_fixture_deserializes() {
    let study = study();
    assert_eq!(study.outputs[0].statistics.mean, Some(48.0));
    assert_eq!(study.outputs[0].category(), "auc_inf");
    let tc = &study.timecourses[0];
    assert_eq!(tc.statistics.mean.len(), 3);
    assert_eq!(tc.statistics.mean.get(1), None);
    assert!(tc.statistics.sd.is_null());
    assert!(study.check_references().is_ok());
    assert!(study.substance_catalog().get("paraxanthine/caffeine").unwrap().is_derived());
}

#[test]
fn records_validate() {
    let study = study();
    let id = RecordId::new(RecordKind::Timecourse, 0);
    assert!(study.timecourses[0].validate(&id).is_ok());
    let id = RecordId::new(RecordKind::Intervention, 0);
    assert!(study.interventions[0].validate(&id).is_ok());
}

#[test]
fn unknown_substance_reference() {
    let mut study = study();
    study.outputs[0].substance = Some("theophylline".to_string());
    assert!(matches!(
        study.check_references(),
        Err(ModelError::UnknownSubstance(name)) if name == "theophylline"
    ));
}

#[test]
fn group_count_only_for_group_records() {
    let study = study();
    assert_eq!(study.group_count(Some("all"), None), Some(12));
    assert_eq!(study.group_count(Some("all"), Some("S1")), None);
    assert_eq!(study.group_count(None, None), None);
}

#[test]
fn repeated_intervention_names_resolve_once() {
    let study = study();
    let names = vec!["caf100".to_string(), "missing".to_string(), "caf100".to_string()];
    let found: Vec<&str> = study
        .interventions_named(&names)
        .map(|intervention| intervention.name.as_str())
        .collect();
    assert_eq!(found, vec!["caf100"]);
}

#[test]
fn bodyweight_falls_back_to_group() {
    let study = study();
    let own = study
        .subject_characteristica(None, Some("S2"), WEIGHT)
        .unwrap();
    assert_eq!(own.statistics.value, Some(81.0));

    let inherited = study
        .subject_characteristica(None, Some("S1"), WEIGHT)
        .unwrap();
    assert_eq!(inherited.statistics.mean, Some(72.5));

    let group = study
        .subject_characteristica(Some("all"), None, WEIGHT)
        .unwrap();
    assert_eq!(group.statistics.sd, Some(8.0));
}

#[test]
fn study_serializes_without_null_statistics() {
    let study = study();
    let value = serde_json::to_value(&study.outputs[0]).unwrap();
    assert_eq!(
        value,
        json!({
            "pktype": "auc_inf",
            "substance": "caffeine",
            "group": "all",
            "mean": 48.0,
            "se": 4.0,
            "unit": "mg*h/l",
            "final": false
        })
    );
}

#[test]
fn normed_keeps_raw_untouched() {
    let study = study();
    let raw = study.timecourses[0].clone();
    let mut normalized = raw.clone();
    normalized.time_unit = Some("h".to_string());
    let pair = Normed::converted(RecordId::new(RecordKind::Timecourse, 0), raw, normalized);
    assert_eq!(pair.raw.time_unit.as_deref(), Some("min"));
    assert_eq!(pair.record.time_unit.as_deref(), Some("h"));
    assert!(pair.record.is_final());
    assert!(!pair.raw.is_final());
}

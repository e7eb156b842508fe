//! Integration tests for the command-line output layer.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use insta::assert_snapshot;
use pkdb_cli::files::{BUNDLE_INDEX, bundle_file_name, read_study, write_normalized, write_pk_bundles};
use pkdb_cli::summary::{issue_table, summary_line, summary_table, units_table};
use pkdb_core::{PipelineState, StudyContext, build_default_pipeline};
use pkdb_model::{MeasurementKind, Study};
use pkdb_standards::load_default_standards;
use serde_json::{Value, json};

fn unique_temp_dir(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("pkdb-cli-{name}-{}-{nanos}", std::process::id()));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn study_json() -> Value {
    json!({
        "name": "Test2019",
        "substances": [{"name": "caffeine", "mass": 194.19}],
        "groups": [
            {
                "name": "all",
                "count": 12,
                "characteristica": [
                    {"category": "weight", "mean": 72.5, "sd": 8.0, "unit": "kg"}
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
            {"pktype": "cmax", "substance": "caffeine", "group": "all", "mean": 3.1, "unit": "mg"}
        ],
        "timecourses": [
            {
                "pktype": "concentration",
                "substance": "caffeine",
                "group": "all",
                "interventions": ["caf100"],
                "time": [0.0, 0.5, 1.0],
                "time_unit": "h",
                "mean": [0.0, null, 2.5],
                "unit": "µg/ml"
            }
        ]
    })
}

fn process(study: Study) -> PipelineState {
    let standards = load_default_standards().expect("load standards");
    let ctx = StudyContext::from_standards(&standards);
    build_default_pipeline().run(&ctx, study).expect("run pipeline")
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).expect("read file")
}

#[test]
fn reads_study_document() {
    let dir = unique_temp_dir("read");
    let path = dir.join("study.json");
    fs::write(&path, serde_json::to_string_pretty(&study_json()).unwrap()).unwrap();
    let study = read_study(&path).unwrap();
    assert_eq!(study.name, "Test2019");
    assert_eq!(study.outputs.len(), 2);

    let err = read_study(&dir.join("missing.json")).unwrap_err();
    assert!(format!("{err:#}").contains("missing.json"));
}

#[test]
fn summary_line_snapshot() {
    let state = process(serde_json::from_value(study_json()).unwrap());
    assert_snapshot!(
        summary_line(&state.report.study, &state.summary),
        @"Study Test2019: 5 records, 2 converted, 2 unchanged, 1 rejected, 1 PK bundle(s)"
    );
}

#[test]
fn tables_list_kinds_and_issues() {
    let state = process(serde_json::from_value(study_json()).unwrap());

    let summary = summary_table(&state.summary);
    assert_eq!(summary.row_iter().count(), 5);
    let rendered = summary.to_string();
    assert!(rendered.contains("characteristica"));
    assert!(rendered.contains("TOTAL"));

    let issues = issue_table(&state.report).expect("issues");
    assert_eq!(issues.row_iter().count(), 1);
    let rendered = issues.to_string();
    assert!(rendered.contains("REJECT"));
    assert!(rendered.contains("output[1] (cmax)"));

    let mut clean = serde_json::from_value::<Study>(study_json()).unwrap();
    clean.outputs.truncate(1);
    let state = process(clean);
    assert!(issue_table(&state.report).is_none());
}

#[test]
fn units_table_filters_by_kind() {
    let standards = load_default_standards().unwrap();
    let time = units_table(&standards.canonical, Some(MeasurementKind::Time));
    assert_eq!(time.row_iter().count(), 1);
    assert!(time.to_string().contains("time"));

    let all = units_table(&standards.canonical, None);
    assert_eq!(all.row_iter().count(), standards.canonical.len());
}

#[test]
fn writes_normalized_document() {
    let state = process(serde_json::from_value(study_json()).unwrap());
    let dir = unique_temp_dir("normalized");
    let path = dir.join("nested").join("normalized.json");
    write_normalized(&path, &state).unwrap();

    let document: Value = serde_json::from_str(&read(&path)).unwrap();
    assert_eq!(document["study"]["name"], "Test2019");
    assert_eq!(document["study"]["outputs"].as_array().unwrap().len(), 1);
    assert_eq!(document["study"]["outputs"][0]["final"], true);
    assert_eq!(document["summary"]["bundles"], 1);
    assert_eq!(document["summary"]["kinds"]["output"]["rejected"], 1);
    assert_eq!(document["report"]["issues"][0]["severity"], "reject");
}

#[test]
fn writes_bundle_csv_and_index() {
    let state = process(serde_json::from_value(study_json()).unwrap());
    assert_eq!(bundle_file_name(&state.bundles[0]), "caffeine_000.csv");

    let dir = unique_temp_dir("bundles");
    let written = write_pk_bundles(&dir, &state.bundles).unwrap();
    assert_eq!(written.len(), 2);
    assert_eq!(written[1], dir.join(BUNDLE_INDEX));

    let csv = read(&written[0]);
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "time,concentration");

    let index: Value = serde_json::from_str(&read(&written[1])).unwrap();
    let entry = &index[0];
    assert_eq!(entry["file"], "caffeine_000.csv");
    assert_eq!(entry["compound"], "caffeine");
    assert_eq!(entry["points"], 3);
    assert_eq!(entry["dose"], 100.0);
    assert_eq!(entry["vd_unit"], "mg/(µg/ml)");
    assert_eq!(entry["concentration_type"], "mean");
}

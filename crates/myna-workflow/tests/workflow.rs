use std::path::{Path, PathBuf};

use myna_core::InstallPaths;
use myna_core::document::{nested_get, nested_set};
use myna_workflow::{
    CASE_DATA_FILE, ConfigOptions, StepStatus, Workflow, WorkflowError, WorkflowEvent,
    WorkflowStage,
};
use myna_components::ComponentError;
use myna_settings::{load_input, write_input};
use serde_yaml::Value;
use tempfile::TempDir;

const BUILD_JSON: &str = r#"{
  "material": "Inconel 625",
  "layer_thickness": 5e-5,
  "preheat": 353.15,
  "P1": {
    "laser_power": 370,
    "spot_size": 0.08,
    "1": {"scanpath": {"type": "mynafile", "file": "scans/P1_1.txt"}},
    "2": {"scanpath": {"type": "mynafile", "file": "scans/P1_2.txt"}}
  }
}"#;

const SETTINGS: &str = r#"
steps:
  - thermal:
      class: thermal_part
      application: 3dthesis
      configure: []
      execute: []
      postprocess: []
      output_template: out_{part}_{layer}.csv
  - thermal_region:
      class: thermal_region
      application: 3dthesis
      configure: []
      execute: []
      postprocess: []
      output_template: region.csv
data:
  build:
    name: B
    path: db/build.json
    datatype: myna_json
    parts:
      P1:
        layers: [1, 2]
"#;

fn setup() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("db");
    std::fs::create_dir_all(db.join("scans")).unwrap();
    std::fs::write(db.join("build.json"), BUILD_JSON).unwrap();
    std::fs::write(db.join("scans/P1_1.txt"), "layer 1").unwrap();
    std::fs::write(db.join("scans/P1_2.txt"), "layer 2").unwrap();

    let input = dir.path().join("input.yaml");
    std::fs::write(&input, SETTINGS).unwrap();
    (dir, input)
}

fn workflow(dir: &Path) -> Workflow {
    Workflow::new(InstallPaths::new(dir, dir.join("apps")))
}

fn get<'a>(doc: &'a Value, keys: &[&str]) -> &'a Value {
    nested_get(doc, keys).unwrap_or_else(|| panic!("missing {}", keys.join(".")))
}

/// Replace a phase of the step at `index` with a single argv.
fn set_phase(doc: &mut Value, index: usize, phase: &str, argv: &[&str]) {
    let body = doc["steps"][index]
        .as_mapping_mut()
        .unwrap()
        .values_mut()
        .next()
        .unwrap();
    let argv: Vec<Value> = argv.iter().map(|a| Value::from(*a)).collect();
    nested_set(body, &[phase], Value::Sequence(vec![Value::Sequence(argv)])).unwrap();
}

#[test]
fn config_resolves_requirements_and_cases() {
    let (dir, input) = setup();
    let mut events = Vec::new();
    let mut on_event = |event: WorkflowEvent| events.push(event.stage);

    let summary = workflow(dir.path())
        .config(&input, &ConfigOptions::default(), Some(&mut on_event))
        .unwrap();
    assert_eq!(summary.steps.len(), 2);
    assert_eq!(summary.steps[0].status, StepStatus::Configured { outputs: 2 });
    assert_eq!(events.last(), Some(&WorkflowStage::Completed));

    let doc = load_input(&input).unwrap();
    assert_eq!(get(&doc, &["data", "build", "material", "value"]), &Value::from("IN625"));
    assert_eq!(get(&doc, &["data", "build", "preheat", "unit"]), &Value::from("K"));
    assert_eq!(
        get(&doc, &["data", "build", "parts", "P1", "laser_power", "value"]),
        &Value::from(370)
    );

    let local = get(
        &doc,
        &["data", "build", "parts", "P1", "layer_data", "2", "scanpath", "file_local"],
    );
    let local = PathBuf::from(local.as_str().unwrap());
    assert_eq!(local, dir.path().join("myna_resources/P1/2/scanpath.txt"));
    assert_eq!(std::fs::read_to_string(local).unwrap(), "layer 2");

    let outputs = get(&doc, &["data", "output_paths", "thermal"]).as_sequence().unwrap();
    assert_eq!(outputs.len(), 2);
    assert!(get(&doc, &["myna", "configure", "datetime-end"]).is_string());
    assert_eq!(
        get(&doc, &["steps"])[1]["thermal_region"]["input_template"],
        Value::from("out_{part}_{layer}.csv")
    );

    let case = dir.path().join("B/P1/1/thermal").join(CASE_DATA_FILE);
    let case_doc: Value = serde_yaml::from_str(&std::fs::read_to_string(case).unwrap()).unwrap();
    let layer_data = get(&case_doc, &["build", "parts", "P1", "layer_data"])
        .as_mapping()
        .unwrap();
    assert_eq!(layer_data.len(), 1);
}

#[test]
fn config_can_write_elsewhere() {
    let (dir, input) = setup();
    let output = dir.path().join("configured.yaml");
    let options = ConfigOptions {
        output: Some(output.clone()),
        ..ConfigOptions::default()
    };
    workflow(dir.path()).config(&input, &options, None).unwrap();

    let original = std::fs::read_to_string(&input).unwrap();
    assert_eq!(original, SETTINGS);
    let doc = load_input(&output).unwrap();
    assert!(nested_get(&doc, &["data", "build", "material"]).is_some());
}

#[test]
fn config_avail_lists_database_files() {
    let (dir, input) = setup();
    let options = ConfigOptions {
        avail: true,
        ..ConfigOptions::default()
    };
    let summary = workflow(dir.path()).config(&input, &options, None).unwrap();
    assert_eq!(summary.available.len(), 3);
    assert!(summary.steps.is_empty());
    assert_eq!(std::fs::read_to_string(&input).unwrap(), SETTINGS);
}

#[test]
fn config_without_parts_fails() {
    let (dir, input) = setup();
    let text = SETTINGS.replace("    parts:\n      P1:\n        layers: [1, 2]\n", "");
    std::fs::write(&input, text).unwrap();
    let err = workflow(dir.path())
        .config(&input, &ConfigOptions::default(), None)
        .unwrap_err();
    assert!(matches!(err, WorkflowError::NoParts { .. }));
}

#[test]
fn run_requires_configured_data() {
    let (dir, input) = setup();
    let err = workflow(dir.path()).run(&input, None, None).unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::Component(ComponentError::MissingDataRequirements { .. })
    ));
}

#[test]
fn run_with_empty_execute_reports_expected_outputs() {
    let (dir, input) = setup();
    let mut wf = workflow(dir.path());
    wf.config(&input, &ConfigOptions::default(), None).unwrap();

    let summary = wf.run(&input, None, None).unwrap();
    assert_eq!(
        summary.steps[0].status,
        StepStatus::Ran {
            executed: false,
            outputs: 2
        }
    );
}

#[test]
fn step_filter_skips_other_steps() {
    let (dir, input) = setup();
    let mut wf = workflow(dir.path());
    wf.config(&input, &ConfigOptions::default(), None).unwrap();

    let only = vec!["thermal_region".to_string()];
    let summary = wf.run(&input, Some(&only), None).unwrap();
    assert_eq!(summary.steps[0].status, StepStatus::Skipped);
    assert!(matches!(summary.steps[1].status, StepStatus::Ran { .. }));
}

#[test]
fn unknown_class_lists_valid_names() {
    let (dir, input) = setup();
    std::fs::write(&input, SETTINGS.replace("class: thermal_part", "class: nope")).unwrap();
    let err = workflow(dir.path()).run(&input, None, None).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("nope"));
    assert!(message.contains("solidification_part"));
}

#[cfg(unix)]
#[test]
fn later_steps_see_settings_rewritten_by_earlier_steps() {
    let (dir, input) = setup();
    let mut wf = workflow(dir.path());
    wf.config(&input, &ConfigOptions::default(), None).unwrap();

    // The replacement document gives thermal_region a configure command.
    let mut updated = load_input(&input).unwrap();
    set_phase(
        &mut updated,
        1,
        "configure",
        &["sh", "-c", "printf '%s:%s' \"$MYNA_LAST_STEP_NAME\" \"$MYNA_STEP_INDEX\" > observed.txt"],
    );
    write_input(&updated, &dir.path().join("updated.yaml")).unwrap();

    let mut doc = load_input(&input).unwrap();
    let script = r#"for l in 1 2; do d=B/P1/$l/{name}; mkdir -p $d; printf 'x (m),y (m),z (m),g (k/m),v (m/s)\n0,0,0,1,1\n' > $d/out_P1_$l.csv; done; cp updated.yaml "$MYNA_RUN_INPUT""#;
    set_phase(&mut doc, 0, "execute", &["sh", "-c", script]);
    write_input(&doc, &input).unwrap();

    let summary = wf.run(&input, None, None).unwrap();
    assert_eq!(
        summary.steps[0].status,
        StepStatus::Ran {
            executed: true,
            outputs: 2
        }
    );
    let observed = std::fs::read_to_string(dir.path().join("observed.txt")).unwrap();
    assert_eq!(observed, "thermal:1");

    let synced = wf.sync(&input, Some(&["thermal".to_string()]), None).unwrap();
    assert_eq!(synced.steps[0].status, StepStatus::Synced { files: 2 });
    assert!(dir.path().join("db/myna_sync_metadata.yaml").is_file());
}

const BUILD_REGION_SETTINGS: &str = r#"
steps:
  - br:
      class: solidification_build_region
      application: adamantine
      configure: []
      execute: []
      postprocess: []
      output_template: out_{build_region}_{layer}.csv
data:
  build:
    name: B
    path: db/build.json
    datatype: myna_json
    parts:
      P1:
        layers: [1, 2]
    build_regions:
      br1:
        partlist: [P1]
        layerlist: [1]
"#;

#[test]
fn build_region_step_runs_after_config() {
    let (dir, input) = setup();
    let build = BUILD_JSON.replacen('{', "{\n  \"print_order\": [\"P1\"],", 1);
    std::fs::write(dir.path().join("db/build.json"), build).unwrap();
    std::fs::write(&input, BUILD_REGION_SETTINGS).unwrap();

    let mut wf = workflow(dir.path());
    let configured = wf.config(&input, &ConfigOptions::default(), None).unwrap();
    assert_eq!(configured.steps[0].status, StepStatus::Configured { outputs: 1 });

    let doc = load_input(&input).unwrap();
    let region_part = ["data", "build", "build_regions", "br1", "parts", "P1"];
    let mut laser = region_part.to_vec();
    laser.extend(["laser_power", "value"]);
    assert_eq!(get(&doc, &laser), &Value::from(370));
    let mut scan = region_part.to_vec();
    scan.extend(["layer_data", "1", "scanpath", "file_local"]);
    assert!(get(&doc, &scan).is_string());

    let summary = wf.run(&input, None, None).unwrap();
    assert_eq!(
        summary.steps[0].status,
        StepStatus::Ran {
            executed: false,
            outputs: 1
        }
    );
}

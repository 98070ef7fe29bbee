use std::path::Path;

use myna_settings::{SettingsError, load_input, step_entries, write_input};
use serde_yaml::Value;

const SETTINGS: &str = r#"
steps:
  - thermal:
      class: solidification_part
      application: 3dthesis
      configure:
        res: 12.5e-6
      execute:
        np: 4
        batch: true
      postprocess: {}
      output_template: "{build}-{part}-{layer}.csv"
data:
  build:
    name: B1
    path: /data/B1
    datatype: Peregrine
    parts:
      P5:
        layers: [50, 51]
        laser_power: {value: 370.0, unit: W}
  output_paths:
    thermal: []
myna:
  workspace: ./default.myna-workspace
"#;

fn fixture() -> Value {
    serde_yaml::from_str(SETTINGS).unwrap()
}

fn write_load_write(doc: &Value, path: &Path) -> String {
    write_input(doc, path).unwrap();
    let loaded = load_input(path).unwrap();
    write_input(&loaded, path).unwrap();
    std::fs::read_to_string(path).unwrap()
}

#[test]
fn yaml_roundtrip_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("input.yaml");

    let first = write_load_write(&fixture(), &path);
    let reloaded = load_input(&path).unwrap();
    let second = write_load_write(&reloaded, &path);

    assert_eq!(first, second);
    assert_eq!(reloaded, fixture());
}

#[test]
fn json_roundtrip_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("input.json");

    let first = write_load_write(&fixture(), &path);
    let reloaded = load_input(&path).unwrap();
    let second = write_load_write(&reloaded, &path);

    assert_eq!(first, second);
    assert!(first.starts_with("{\n  \"steps\""));
}

#[test]
fn yaml_and_json_agree() {
    let dir = tempfile::tempdir().unwrap();
    let yaml = dir.path().join("input.yaml");
    let json = dir.path().join("input.myna-workspace-json");

    write_input(&fixture(), &yaml).unwrap();
    write_input(&fixture(), &json).unwrap();

    assert_eq!(load_input(&yaml).unwrap(), load_input(&json).unwrap());
}

#[test]
fn key_order_is_preserved() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("input.yaml");
    write_input(&fixture(), &path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let steps = text.find("steps:").unwrap();
    let data = text.find("data:").unwrap();
    let myna = text.find("myna:").unwrap();
    assert!(steps < data && data < myna);
    assert!(text.find("configure:").unwrap() < text.find("execute:").unwrap());
}

#[test]
fn load_injects_missing_sections() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("input.yaml");
    std::fs::write(&path, "data:\n  build:\n    name: B\n").unwrap();

    let doc = load_input(&path).unwrap();
    assert!(doc.get("steps").unwrap().is_mapping());
    assert!(doc.get("myna").unwrap().is_mapping());
    assert!(step_entries(&doc).unwrap().is_empty());
}

#[test]
fn unsupported_extension_fails_before_reading() {
    let err = load_input(Path::new("does/not/exist.txt")).unwrap_err();
    assert!(matches!(err, SettingsError::UnsupportedExtension { .. }));
}

#[test]
fn unreadable_file_names_the_path() {
    let err = load_input(Path::new("does/not/exist.yaml")).unwrap_err();
    match err {
        SettingsError::Read { path, .. } => assert!(path.ends_with("exist.yaml")),
        other => panic!("unexpected error: {other}"),
    }
}

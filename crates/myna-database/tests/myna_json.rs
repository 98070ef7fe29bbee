use std::path::{Path, PathBuf};

use myna_database::myna_json::SYNC_METADATA_FILE;
use myna_database::{MynaJsonDatabase, database_from_name};
use myna_files::FileKind;
use myna_metadata::{Database, DatabaseError, MetadataRegistry, SyncRequest};
use myna_settings::LayerKey;
use serde_yaml::Value;

const BUILD_JSON: &str = r#"{
  "material": "Stainless Steel 316L",
  "layer_thickness": 5e-5,
  "preheat": 353.15,
  "print_order": ["P1", "P2"],
  "stl": "geometry/part.stl",
  "P1": {
    "laser_power": 370,
    "spot_size": 0.08,
    "1": {"scanpath": {"type": "mynafile", "file": "/abs/P1_1.txt"}},
    "2": {"scanpath": {"type": "peregrine", "file": "x"}}
  }
}"#;

fn database(dir: &Path) -> MynaJsonDatabase {
    let path = dir.join("build.json");
    std::fs::write(&path, BUILD_JSON).unwrap();
    let mut db = MynaJsonDatabase::new();
    db.set_path(&path);
    db
}

#[test]
fn loads_build_and_part_values() {
    let dir = tempfile::tempdir().unwrap();
    let db = database(dir.path());
    let registry = MetadataRegistry::with_builtins();

    assert!(db.exists());
    let preheat = db.load(registry.get("preheat").unwrap(), None, None).unwrap();
    assert_eq!(preheat, Some(Value::from(353.15)));

    let power = db
        .load(registry.get("laser_power").unwrap(), Some("P1"), None)
        .unwrap();
    assert_eq!(power, Some(Value::from(370)));

    let missing = db
        .load(registry.get("laser_power").unwrap(), Some("P9"), None)
        .unwrap();
    assert_eq!(missing, None);
}

#[test]
fn relative_files_resolve_against_database_dir() {
    let dir = tempfile::tempdir().unwrap();
    let db = database(dir.path());
    let registry = MetadataRegistry::with_builtins();

    let stl = db.load(registry.get("stl").unwrap(), Some("P1"), None).unwrap();
    let expected = dir.path().join("geometry/part.stl");
    assert_eq!(stl, Some(Value::from(expected.to_string_lossy().to_string())));
}

#[test]
fn scanpath_requires_mynafile_type() {
    let dir = tempfile::tempdir().unwrap();
    let db = database(dir.path());
    let spec = MetadataRegistry::with_builtins().get("scanpath").unwrap().clone();

    let ok = db
        .load(&spec, Some("P1"), Some(&LayerKey::Number(1)))
        .unwrap();
    assert_eq!(ok, Some(Value::from("/abs/P1_1.txt")));

    let err = db
        .load(&spec, Some("P1"), Some(&LayerKey::Number(2)))
        .unwrap_err();
    assert!(matches!(err, DatabaseError::InvalidEntry { .. }));

    let absent = db.load(&spec, Some("P1"), Some(&LayerKey::Number(3))).unwrap();
    assert_eq!(absent, None);
}

#[test]
fn missing_database_does_not_exist() {
    let mut db = database_from_name("myna-json").unwrap();
    db.set_path(Path::new("/nonexistent/build.json"));
    assert!(!db.exists());
}

#[test]
fn sync_records_layer_segments() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = database(dir.path());

    let input = dir.path().join("input.yaml");
    std::fs::write(
        &input,
        "steps:\n  - thermal:\n      class: solidification_part\n      application: 3dthesis\n",
    )
    .unwrap();

    let mut files: Vec<PathBuf> = Vec::new();
    for layer in ["1", "2"] {
        let case = dir.path().join("B/P1").join(layer).join("thermal");
        std::fs::create_dir_all(&case).unwrap();
        let file = case.join("gv.csv");
        std::fs::write(&file, "x (m),y (m),g (k/m),v (m/s)\n0,0,10,0.5\n").unwrap();
        files.push(file);
    }

    let types = ["build", "part", "layer"];
    let synced = db
        .sync(&SyncRequest {
            input: &input,
            step: "thermal",
            application: "3dthesis",
            types: &types,
            output: FileKind::Gv,
            files: &files,
        })
        .unwrap();
    assert_eq!(synced, files);

    let text = std::fs::read_to_string(dir.path().join(SYNC_METADATA_FILE)).unwrap();
    let doc: Value = serde_yaml::from_str(&text).unwrap();
    let segments = doc.get("layer_segment").unwrap();
    assert_eq!(
        segments.get("2").unwrap().get("application"),
        Some(&Value::from("3dthesis"))
    );
}

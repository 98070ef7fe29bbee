use std::collections::HashMap;
use std::path::{Path, PathBuf};

use myna_metadata::{
    BuildMetadata, Database, DatabaseResult, FileScope, MetadataError, MetadataRegistry,
    MetadataSpec, PartMetadata, ResourceFile, SyncRequest, resource_dir,
};
use myna_settings::LayerKey;
use serde_yaml::Value;

/// In-memory database keyed by `name[/part[/layer]]`.
#[derive(Default)]
struct MemoryDb {
    path: Option<PathBuf>,
    values: HashMap<String, Value>,
}

impl MemoryDb {
    fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.values.insert(key.to_string(), value.into());
        self
    }
}

impl Database for MemoryDb {
    fn description(&self) -> &str {
        "memory"
    }

    fn set_path(&mut self, path: &Path) {
        self.path = Some(path.to_path_buf());
    }

    fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn load(
        &self,
        spec: &MetadataSpec,
        part: Option<&str>,
        layer: Option<&LayerKey>,
    ) -> DatabaseResult<Option<Value>> {
        let mut key = spec.name.clone();
        if let Some(p) = part {
            key = format!("{key}/{p}");
        }
        if let Some(l) = layer {
            key = format!("{key}/{l}");
        }
        Ok(self.values.get(&key).cloned())
    }

    fn sync(&mut self, _request: &SyncRequest<'_>) -> DatabaseResult<Vec<PathBuf>> {
        Ok(Vec::new())
    }
}

#[test]
fn build_metadata_normalizes_material() {
    let registry = MetadataRegistry::with_builtins();
    let db = MemoryDb::default().with("material", "Inconel 625");
    let meta = BuildMetadata::load(&db, registry.get("material").unwrap()).unwrap();
    assert_eq!(meta.value, Some(Value::from("IN625")));

    let entry = meta.to_value();
    assert_eq!(entry.get("value"), Some(&Value::from("IN625")));
    assert_eq!(entry.get("unit"), Some(&Value::from("")));
}

#[test]
fn part_metadata_loads_per_part() {
    let registry = MetadataRegistry::with_builtins();
    let db = MemoryDb::default().with("laser_power/P1", 200.0);
    let spec = registry.get("laser_power").unwrap();

    let p1 = PartMetadata::load(&db, spec, "P1").unwrap();
    assert_eq!(p1.value, Some(Value::from(200.0)));
    assert_eq!(p1.unit, "W");

    let p2 = PartMetadata::load(&db, spec, "P2").unwrap();
    assert_eq!(p2.value, None);
    assert_eq!(p2.to_value().get("value"), Some(&Value::Null));
}

#[test]
fn scope_mismatch_is_rejected() {
    let registry = MetadataRegistry::with_builtins();
    let db = MemoryDb::default();
    let err = BuildMetadata::load(&db, registry.get("laser_power").unwrap()).unwrap_err();
    assert!(matches!(err, MetadataError::WrongScope { .. }));
}

#[test]
fn layer_file_copy_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("db").join("scan_0000002.txt");
    std::fs::create_dir_all(source.parent().unwrap()).unwrap();
    std::fs::write(&source, "first").unwrap();

    let registry = MetadataRegistry::with_builtins();
    let db = MemoryDb::default().with("scanpath/P1/2", source.to_string_lossy().to_string());
    let resources = resource_dir(dir.path());

    let file = ResourceFile::load(
        &db,
        registry.get("scanpath").unwrap(),
        FileScope::Layer("P1".to_string(), LayerKey::Number(2)),
        &resources,
    )
    .unwrap();
    assert_eq!(
        file.file_local,
        dir.path().join("myna_resources/P1/2/scanpath.txt")
    );

    assert!(file.copy_file(false).unwrap());
    std::fs::write(&source, "second").unwrap();
    assert!(!file.copy_file(false).unwrap());
    assert_eq!(std::fs::read_to_string(&file.file_local).unwrap(), "first");

    assert!(file.copy_file(true).unwrap());
    assert_eq!(std::fs::read_to_string(&file.file_local).unwrap(), "second");
}

#[test]
fn missing_database_file_is_an_error() {
    let registry = MetadataRegistry::with_builtins();
    let db = MemoryDb::default();
    let err = ResourceFile::load(
        &db,
        registry.get("stl").unwrap(),
        FileScope::Part("P1".to_string()),
        Path::new("/tmp/unused"),
    )
    .unwrap_err();
    match err {
        MetadataError::MissingFile { name, part, .. } => {
            assert_eq!(name, "stl");
            assert_eq!(part.as_deref(), Some("P1"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn available_files_walks_database_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("sub")).unwrap();
    std::fs::write(dir.path().join("build.json"), "{}").unwrap();
    std::fs::write(dir.path().join("sub/part.stl"), "solid").unwrap();

    let mut db = MemoryDb::default();
    db.set_path(&dir.path().join("build.json"));
    assert!(db.exists());
    let files = db.available_files().unwrap();
    assert_eq!(files.len(), 2);
    assert!(files.iter().any(|f| f.ends_with("sub/part.stl")));
}

//! Build data stored in a single JSON document.
//!
//! Layout:
//!
//! ```json
//! {
//!   "material": "IN625", "layer_thickness": 5e-5, "preheat": 353.15,
//!   "print_order": ["P1"], "stl": "part.stl", "part_id_map": "ids.csv",
//!   "P1": {
//!     "laser_power": 370, "spot_size": 0.08,
//!     "1": {"scanpath": {"type": "mynafile", "file": "P1/1.txt"}}
//!   }
//! }
//! ```
//!
//! Relative file paths are resolved against the JSON file's directory.

use std::path::{Path, PathBuf};

use myna_core::document::{nested_get, nested_str};
use myna_core::env::path_string;
use myna_metadata::{Database, DatabaseError, DatabaseResult, MetadataSpec, SyncRequest};
use myna_settings::{LayerKey, load_input, step_entries};
use serde_yaml::{Mapping, Value};

use crate::sync_metadata::write_segment_sync_metadata;

/// File written next to the JSON database by [`Database::sync`].
pub const SYNC_METADATA_FILE: &str = "myna_sync_metadata.yaml";

#[derive(Debug, Clone, Default)]
pub struct MynaJsonDatabase {
    path: Option<PathBuf>,
}

impl MynaJsonDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Segments are layers.
    pub fn segmentation(&self) -> &'static str {
        "layer"
    }

    fn read(&self) -> DatabaseResult<Value> {
        let path = self.path.as_deref().ok_or(DatabaseError::PathNotSet)?;
        let text = std::fs::read_to_string(path).map_err(|e| DatabaseError::io(path, e))?;
        Ok(serde_json::from_str(&text)?)
    }

    fn path_dir(&self) -> Option<&Path> {
        self.path.as_deref().and_then(Path::parent)
    }

    fn resolve_file(&self, value: Option<&Value>) -> Option<Value> {
        let raw = value.and_then(Value::as_str)?;
        let path = Path::new(raw);
        if path.is_absolute() {
            return Some(Value::from(raw));
        }
        let resolved = match self.path_dir() {
            Some(dir) => dir.join(path),
            None => path.to_path_buf(),
        };
        Some(Value::from(path_string(&resolved)))
    }

    fn scan_path(
        &self,
        data: &Value,
        part: &str,
        layer: &LayerKey,
    ) -> DatabaseResult<Option<Value>> {
        let layer = layer.to_string();
        let entry = [part, layer.as_str(), "scanpath"];
        match nested_str(data, &[part, layer.as_str(), "scanpath", "type"]) {
            Some("mynafile") => {
                Ok(self.resolve_file(nested_get(data, &[part, layer.as_str(), "scanpath", "file"])))
            }
            None if nested_get(data, &entry).is_none() => Ok(None),
            other => Err(DatabaseError::InvalidEntry {
                what: format!(
                    "\"{part}/{layer}/scanpath/type\" is {}",
                    other.map_or("missing".to_string(), |t| format!("\"{t}\""))
                ),
            }),
        }
    }

    fn segment_key(file: &Path) -> Option<String> {
        file.parent()?
            .parent()?
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
    }
}

impl Database for MynaJsonDatabase {
    fn description(&self) -> &str {
        "Myna JSON database"
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
        let data = self.read()?;
        let name = spec.name.as_str();
        let value = match (name, part, layer) {
            ("material" | "layer_thickness" | "preheat" | "print_order" | "melt_order", _, _) => {
                nested_get(&data, &[name]).cloned()
            }
            ("laser_power" | "spot_size", Some(part), _) => {
                nested_get(&data, &[part, name]).cloned()
            }
            ("stl" | "part_id_map", _, _) => self.resolve_file(nested_get(&data, &[name])),
            ("scanpath", Some(part), Some(layer)) => self.scan_path(&data, part, layer)?,
            _ => {
                return Err(DatabaseError::UnsupportedMetadata {
                    database: self.description().to_string(),
                    name: name.to_string(),
                });
            }
        };
        Ok(value)
    }

    fn sync(&mut self, request: &SyncRequest<'_>) -> DatabaseResult<Vec<PathBuf>> {
        let dir = self.path_dir().ok_or(DatabaseError::PathNotSet)?.to_path_buf();
        let metadata_file = dir.join(SYNC_METADATA_FILE);

        let settings = load_input(request.input)?;
        let step_settings = step_entries(&settings)?
            .into_iter()
            .find(|e| e.name == request.step)
            .map(|e| e.body)
            .unwrap_or(Value::Mapping(Mapping::new()));

        let mut synced = Vec::new();
        for file in request.files {
            let fields = request.output.values_for_sync(file)?;
            let Some(segment) = Self::segment_key(file) else {
                tracing::warn!(file = %file.display(), "cannot infer segment from path");
                continue;
            };
            write_segment_sync_metadata(
                &metadata_file,
                self.segmentation(),
                &segment,
                &step_settings,
                file,
            )?;
            tracing::info!(
                step = request.step,
                segment = %segment,
                points = fields.len(),
                fields = fields.fields.len(),
                "synced"
            );
            synced.push(file.clone());
        }
        Ok(synced)
    }
}

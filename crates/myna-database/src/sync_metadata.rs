//! Provenance written next to a database for every synced segment.

use std::path::Path;

use chrono::{DateTime, Local};
use myna_core::document::{ensure_mapping, key};
use myna_core::strf_datetime;
use myna_metadata::{DatabaseError, DatabaseResult};
use serde_yaml::{Mapping, Value};

fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Record that `simulation_file` was synced into `segment_key`.
///
/// The metadata file is a YAML mapping
/// `<segmentation>_segment.<segment_key> = <step settings> + provenance`.
/// Existing segments are preserved; the entry for `segment_key` is replaced.
pub fn write_segment_sync_metadata(
    metadata_file: &Path,
    segmentation: &str,
    segment_key: &str,
    step_settings: &Value,
    simulation_file: &Path,
) -> DatabaseResult<()> {
    let mut doc: Value = if metadata_file.exists() {
        let text = std::fs::read_to_string(metadata_file)
            .map_err(|e| DatabaseError::io(metadata_file, e))?;
        serde_yaml::from_str(&text)?
    } else {
        Value::Mapping(Mapping::new())
    };

    let modified: DateTime<Local> = std::fs::metadata(simulation_file)
        .and_then(|m| m.modified())
        .map_err(|e| DatabaseError::io(simulation_file, e))?
        .into();

    let mut entry = match step_settings {
        Value::Mapping(m) => m.clone(),
        _ => Mapping::new(),
    };
    entry.insert(
        key("simulation_data_last_modified"),
        Value::from(strf_datetime(&modified)),
    );
    entry.insert(key("synced_on"), Value::from(strf_datetime(&Local::now())));
    entry.insert(key("synced_by"), Value::from(current_user()));

    let segment_type = format!("{segmentation}_segment");
    ensure_mapping(&mut doc, &[segment_type.as_str()])
        .map_err(|e| DatabaseError::InvalidEntry {
            what: e.to_string(),
        })?
        .insert(key(segment_key), Value::Mapping(entry));

    if let Some(parent) = metadata_file.parent() {
        std::fs::create_dir_all(parent).map_err(|e| DatabaseError::io(parent, e))?;
    }
    std::fs::write(metadata_file, serde_yaml::to_string(&doc)?)
        .map_err(|e| DatabaseError::io(metadata_file, e))?;
    Ok(())
}

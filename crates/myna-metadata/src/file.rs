//! File requirements copied from the database into a local resource cache.

use std::path::{Path, PathBuf};

use myna_core::env::path_string;
use myna_settings::LayerKey;
use serde_yaml::{Mapping, Value};

use crate::database::Database;
use crate::spec::{MetadataScope, MetadataSpec};
use crate::{MetadataError, MetadataResult};

/// Resource cache shared by every step of a workflow.
pub fn resource_dir(input_dir: &Path) -> PathBuf {
    input_dir.join("myna_resources")
}

/// Where in the cache a file lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileScope {
    Build,
    Part(String),
    Layer(String, LayerKey),
}

/// A database file and its cached local copy (build, part or layer file).
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceFile {
    pub name: String,
    pub scope: FileScope,
    pub file_database: PathBuf,
    pub file_local: PathBuf,
}

impl ResourceFile {
    /// Resolve the database path for `spec` and compute the cache location.
    ///
    /// `scope` must agree with the spec's [`MetadataScope`].
    pub fn load(
        db: &dyn Database,
        spec: &MetadataSpec,
        scope: FileScope,
        resources: &Path,
    ) -> MetadataResult<Self> {
        let (part, layer, dir) = match (&spec.scope, &scope) {
            (MetadataScope::BuildFile, FileScope::Build) => (None, None, resources.to_path_buf()),
            (MetadataScope::PartFile, FileScope::Part(p)) => {
                (Some(p.as_str()), None, resources.join(p))
            }
            (MetadataScope::LayerFile, FileScope::Layer(p, l)) => {
                (Some(p.as_str()), Some(l), resources.join(p).join(l.to_string()))
            }
            _ => {
                return Err(MetadataError::WrongScope {
                    name: spec.name.clone(),
                    scope: spec.scope,
                });
            }
        };

        let file_database = db
            .load(spec, part, layer)?
            .as_ref()
            .and_then(myna_core::document::scalar_to_string)
            .map(PathBuf::from)
            .ok_or_else(|| MetadataError::MissingFile {
                name: spec.name.clone(),
                part: part.map(str::to_string),
                layer: layer.map(LayerKey::to_string),
            })?;

        Ok(Self {
            name: spec.name.clone(),
            file_local: dir.join(spec.local_name()),
            file_database,
            scope,
        })
    }

    /// Copy the database file into the cache.
    ///
    /// Skips the copy when the local file already exists, unless `overwrite`.
    /// Returns whether a copy happened.
    pub fn copy_file(&self, overwrite: bool) -> MetadataResult<bool> {
        if self.file_local.exists() && !overwrite {
            tracing::debug!(file = %self.file_local.display(), "resource already cached");
            return Ok(false);
        }
        if let Some(parent) = self.file_local.parent() {
            std::fs::create_dir_all(parent).map_err(|source| MetadataError::Copy {
                from: self.file_database.clone(),
                to: self.file_local.clone(),
                source,
            })?;
        }
        std::fs::copy(&self.file_database, &self.file_local).map_err(|source| {
            MetadataError::Copy {
                from: self.file_database.clone(),
                to: self.file_local.clone(),
                source,
            }
        })?;
        tracing::info!(
            from = %self.file_database.display(),
            to = %self.file_local.display(),
            "copied resource"
        );
        Ok(true)
    }

    /// `{file_local, file_database}` as stored in the settings document.
    pub fn to_value(&self) -> Value {
        let mut map = Mapping::new();
        map.insert(
            Value::from("file_local"),
            Value::from(path_string(&self.file_local)),
        );
        map.insert(
            Value::from("file_database"),
            Value::from(path_string(&self.file_database)),
        );
        Value::Mapping(map)
    }
}

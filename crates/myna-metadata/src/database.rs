//! Contract between the workflow and an external build database.

use std::path::{Path, PathBuf};

use myna_files::{FileError, FileKind};
use myna_settings::{LayerKey, SettingsError};
use serde_yaml::Value;

use crate::spec::MetadataSpec;

pub type DatabaseResult<T> = Result<T, DatabaseError>;

#[derive(thiserror::Error, Debug)]
pub enum DatabaseError {
    #[error("\"{name}\" does not correspond to any implemented database")]
    UnsupportedDatatype { name: String },

    #[error("Database path is not set")]
    PathNotSet,

    #[error("Database not found at {path}")]
    NotFound { path: PathBuf },

    #[error("{database} cannot load \"{name}\"")]
    UnsupportedMetadata { database: String, name: String },

    #[error("Invalid database entry: {what}")]
    InvalidEntry { what: String },

    #[error("{database} does not support sync")]
    SyncUnsupported { database: String },

    #[error("I/O error at {path}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("File error: {0}")]
    File(#[from] FileError),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),
}

impl DatabaseError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        DatabaseError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Validated step outputs to push back to a database.
#[derive(Debug, Clone)]
pub struct SyncRequest<'a> {
    /// Settings file of the workflow being synced.
    pub input: &'a Path,
    pub step: &'a str,
    pub application: &'a str,
    /// Component axes, e.g. `["build", "part", "layer"]`.
    pub types: &'a [&'a str],
    pub output: FileKind,
    pub files: &'a [PathBuf],
}

/// A source of build metadata and a sink for synced results.
///
/// `load` must be a pure function of its arguments; callers re-query on every
/// configuration pass instead of caching.
pub trait Database {
    fn description(&self) -> &str;

    fn set_path(&mut self, path: &Path);

    fn path(&self) -> Option<&Path>;

    fn exists(&self) -> bool {
        self.path().is_some_and(Path::exists)
    }

    /// Load the value or database file path for one requirement.
    fn load(
        &self,
        spec: &MetadataSpec,
        part: Option<&str>,
        layer: Option<&LayerKey>,
    ) -> DatabaseResult<Option<Value>>;

    /// Push validated output files to the database; returns what was synced.
    fn sync(&mut self, request: &SyncRequest<'_>) -> DatabaseResult<Vec<PathBuf>>;

    /// Every file under the database location, sorted.
    fn available_files(&self) -> DatabaseResult<Vec<PathBuf>> {
        let path = self.path().ok_or(DatabaseError::PathNotSet)?;
        let root = if path.is_dir() {
            path
        } else {
            path.parent().unwrap_or(path)
        };
        let mut files = Vec::new();
        walk(root, &mut files)?;
        files.sort();
        Ok(files)
    }
}

fn walk(dir: &Path, files: &mut Vec<PathBuf>) -> DatabaseResult<()> {
    let entries = std::fs::read_dir(dir).map_err(|e| DatabaseError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| DatabaseError::io(dir, e))?;
        let path = entry.path();
        if path.is_dir() {
            walk(&path, files)?;
        } else {
            files.push(path);
        }
    }
    Ok(())
}

//! myna-settings: the settings document shared by every workflow step.
//!
//! The document is kept as an order-preserving [`serde_yaml::Value`] so that
//! keys written by external interface programs survive a load/write cycle.
//! Typed, read-only views live in [`schema`].

pub mod schema;
pub mod validate;

use std::path::{Path, PathBuf};

pub use schema::*;
pub use validate::{REQUIRED_STEP_FIELDS, ValidationError, validate_required_input_keys};

use serde_yaml::Value;

pub type SettingsResult<T> = Result<T, SettingsError>;

#[derive(thiserror::Error, Debug)]
pub enum SettingsError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Unsupported settings file extension: {path}")]
    UnsupportedExtension { path: PathBuf },

    #[error("Failed to read settings file: {path}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write settings file: {path}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Document error: {0}")]
    Document(#[from] myna_core::CoreError),
}

/// On-disk encoding of a settings or workspace document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Yaml,
    Json,
}

impl InputFormat {
    pub fn from_path(path: &Path) -> SettingsResult<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "myna-workspace") => Ok(Self::Yaml),
            Some("json" | "myna-workspace-json") => Ok(Self::Json),
            _ => Err(SettingsError::UnsupportedExtension {
                path: path.to_path_buf(),
            }),
        }
    }
}

/// Read a document without injecting the required sections.
pub fn read_document(path: &Path) -> SettingsResult<Value> {
    let format = InputFormat::from_path(path)?;
    let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let doc = match format {
        InputFormat::Yaml => serde_yaml::from_str(&content)?,
        InputFormat::Json => serde_json::from_str(&content)?,
    };
    Ok(doc)
}

/// Load a settings document and guarantee `steps`, `data` and `myna` exist.
pub fn load_input(path: &Path) -> SettingsResult<Value> {
    let mut doc = read_document(path)?;
    validate_required_input_keys(&mut doc)?;
    tracing::debug!(path = %path.display(), "loaded settings");
    Ok(doc)
}

/// Write a document in the format implied by the path, preserving key order.
pub fn write_input(doc: &Value, path: &Path) -> SettingsResult<()> {
    let content = match InputFormat::from_path(path)? {
        InputFormat::Yaml => serde_yaml::to_string(doc)?,
        InputFormat::Json => {
            let mut text = serde_json::to_string_pretty(doc)?;
            text.push('\n');
            text
        }
    };
    std::fs::write(path, content).map_err(|source| SettingsError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_follows_extension() {
        assert_eq!(
            InputFormat::from_path(Path::new("a/input.yaml")).unwrap(),
            InputFormat::Yaml
        );
        assert_eq!(
            InputFormat::from_path(Path::new("ws.myna-workspace")).unwrap(),
            InputFormat::Yaml
        );
        assert_eq!(
            InputFormat::from_path(Path::new("input.json")).unwrap(),
            InputFormat::Json
        );
        assert_eq!(
            InputFormat::from_path(Path::new("ws.myna-workspace-json")).unwrap(),
            InputFormat::Json
        );
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = InputFormat::from_path(Path::new("input.yml")).unwrap_err();
        assert!(matches!(err, SettingsError::UnsupportedExtension { .. }));
        assert!(InputFormat::from_path(Path::new("input")).is_err());
    }
}

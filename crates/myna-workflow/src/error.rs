//! Error types for the workflow engine.

use std::path::PathBuf;

use myna_components::ComponentError;
use myna_core::CoreError;
use myna_metadata::{DatabaseError, MetadataError};
use myna_settings::{SettingsError, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Component(#[from] ComponentError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("No parts specified in {input}")]
    NoParts { input: PathBuf },

    #[error("Failed to write case data: {path}")]
    CaseWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to resolve path {path}")]
    Path {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;

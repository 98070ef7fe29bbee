//! Error types for component configuration and execution.

use std::path::PathBuf;

use myna_metadata::{DatabaseError, MetadataError};
use myna_settings::{SettingsError, ValidationError};

use crate::state::ComponentState;

#[derive(Debug, thiserror::Error)]
pub enum ComponentError {
    #[error("Unknown component class \"{name}\"; valid classes: {}", .valid.join(", "))]
    UnknownClass { name: String, valid: Vec<String> },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("Step \"{step}\" is missing data requirements: {}", .missing.join(", "))]
    MissingDataRequirements { step: String, missing: Vec<String> },

    #[error(
        "Step \"{step}\": {valid} of {} expected output files are valid; expected:\n{}",
        .expected.len(),
        .expected.iter().map(|p| format!("  {}", p.display())).collect::<Vec<_>>().join("\n")
    )]
    OutputValidation {
        step: String,
        expected: Vec<PathBuf>,
        valid: usize,
    },

    #[error("Step \"{step}\": cannot {action} while {state}")]
    InvalidTransition {
        step: String,
        state: ComponentState,
        action: &'static str,
    },

    #[error("Step \"{step}\": malformed command `{command}`: {reason}")]
    CommandSyntax {
        step: String,
        command: String,
        reason: String,
    },

    #[error("Step \"{step}\" uses {phase} options but has no application")]
    MissingApplication { step: String, phase: &'static str },

    #[error("Failed to resolve path {path}")]
    Path {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type ComponentResult<T> = Result<T, ComponentError>;

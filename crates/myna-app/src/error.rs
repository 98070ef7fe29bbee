//! Error types for interface programs.

use std::path::PathBuf;
use std::process::ExitStatus;

use myna_core::CoreError;
use myna_settings::SettingsError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("Invalid arguments: {0}")]
    Args(#[from] clap::Error),

    #[error("{app} app executable \"{exe}\" was not found")]
    ExecutableNotFound { app: String, exe: String },

    #[error("{app} app executable \"{path}\" does not have execute permissions")]
    NotExecutable { app: String, path: PathBuf },

    #[error("Empty command for {app}")]
    EmptyCommand { app: String },

    #[error("Failed to start {program}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("Failed waiting on process {pid}")]
    Wait { pid: u32, source: std::io::Error },

    #[error("Process {pid} failed with {status}")]
    ProcessFailed { pid: u32, status: ExitStatus },

    #[error("Failed to resolve path {path}")]
    Path {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to copy template to {path}")]
    Copy {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type AppResult<T> = Result<T, AppError>;

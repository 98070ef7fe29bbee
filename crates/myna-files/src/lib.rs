//! myna-files: formats of the intermediate files exchanged between steps.
//!
//! Each [`FileKind`] knows its extension and required CSV columns, and the
//! kinds that can be pushed back to a database know how to extract their
//! layer-surface values ([`SyncFields`]).

pub mod kind;
pub mod sync;
pub mod table;

pub use kind::FileKind;
pub use sync::{SyncField, SyncFields};

use std::path::PathBuf;

pub type FileResult<T> = Result<T, FileError>;

#[derive(thiserror::Error, Debug)]
pub enum FileError {
    #[error("{path}: expected a {expected} file")]
    WrongExtension {
        path: PathBuf,
        expected: &'static str,
    },

    #[error("{path}: missing required columns: {}", .missing.join(", "))]
    MissingColumns { path: PathBuf, missing: Vec<String> },

    #[error("Failed to read {path}")]
    Csv {
        path: PathBuf,
        source: csv::Error,
    },

    #[error("{kind} files cannot be synced")]
    SyncUnsupported { kind: &'static str },
}

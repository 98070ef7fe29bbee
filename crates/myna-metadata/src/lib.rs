//! myna-metadata: data requirements that steps declare, and the database
//! adapter contract used to satisfy them.

pub mod database;
pub mod file;
pub mod material;
pub mod spec;
pub mod value;

pub use database::{Database, DatabaseError, DatabaseResult, SyncRequest};
pub use file::{FileScope, ResourceFile, resource_dir};
pub use material::normalize_material;
pub use spec::{MetadataRegistry, MetadataScope, MetadataSpec, Normalize};
pub use value::{BuildMetadata, PartMetadata};

use std::path::PathBuf;

pub type MetadataResult<T> = Result<T, MetadataError>;

#[derive(thiserror::Error, Debug)]
pub enum MetadataError {
    #[error("Unknown data requirement \"{name}\". Valid names: {}", .valid.join(", "))]
    UnknownRequirement { name: String, valid: Vec<String> },

    #[error("\"{name}\" is a {scope} requirement")]
    WrongScope { name: String, scope: MetadataScope },

    #[error("Database has no file for \"{name}\"{}", location(.part, .layer))]
    MissingFile {
        name: String,
        part: Option<String>,
        layer: Option<String>,
    },

    #[error("Failed to copy {from} to {to}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

fn location(part: &Option<String>, layer: &Option<String>) -> String {
    match (part, layer) {
        (Some(p), Some(l)) => format!(" (part {p}, layer {l})"),
        (Some(p), None) => format!(" (part {p})"),
        _ => String::new(),
    }
}

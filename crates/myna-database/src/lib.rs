//! myna-database: database adapters selectable by `data.build.datatype`.

pub mod myna_json;
pub mod sync_metadata;

pub use myna_json::MynaJsonDatabase;
pub use sync_metadata::write_segment_sync_metadata;

use myna_metadata::{Database, DatabaseError, DatabaseResult};

/// Lower-case and drop `-` / `_` so `Myna-JSON` and `myna_json` match.
fn compact(name: &str) -> String {
    name.to_lowercase().replace(['-', '_'], "")
}

/// Names accepted by [`database_from_name`].
pub const DATATYPES: [&str; 1] = ["myna_json"];

/// Construct the adapter named in the settings document.
pub fn database_from_name(name: &str) -> DatabaseResult<Box<dyn Database>> {
    match compact(name).as_str() {
        "mynajson" => Ok(Box::new(MynaJsonDatabase::new())),
        _ => Err(DatabaseError::UnsupportedDatatype {
            name: name.to_string(),
        }),
    }
}

//! Extraction of layer-surface values for database sync.

use std::path::Path;

use serde::Serialize;

use crate::table::{read_columns, read_headers, top_surface};
use crate::{FileError, FileKind, FileResult};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncField {
    pub name: String,
    pub unit: String,
    pub values: Vec<f64>,
}

/// Values at (x, y) surface points, one column per field.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SyncFields {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub fields: Vec<SyncField>,
}

impl SyncFields {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&SyncField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

struct Layout {
    x: &'static str,
    y: &'static str,
    z: Option<&'static str>,
    /// (source column, synced name, unit)
    values: &'static [(&'static str, &'static str, &'static str)],
}

fn layout(kind: FileKind) -> Option<Layout> {
    match kind {
        FileKind::Gv => Some(Layout {
            x: "x (m)",
            y: "y (m)",
            z: Some("z (m)"),
            values: &[("g (k/m)", "G", "K/m"), ("v (m/s)", "R", "m/s")],
        }),
        FileKind::Id => Some(Layout {
            x: "x (m)",
            y: "y (m)",
            z: Some("z (m)"),
            values: &[("id", "id", "")],
        }),
        FileKind::ReducedSolidification => Some(Layout {
            x: "x",
            y: "y",
            z: Some("z"),
            values: &[
                ("tm", "t_melt", "s"),
                ("ts", "t_solidify", "s"),
                ("cr", "cooling_rate", "K/s"),
            ],
        }),
        FileKind::MeltPoolGeometry => Some(Layout {
            x: "x (m)",
            y: "y (m)",
            z: Some("z (m)"),
            values: &[
                ("time (s)", "myna_time", "s"),
                ("length (m)", "myna_length", "m"),
                ("width (m)", "myna_width", "m"),
                ("depth (m)", "myna_depth", "m"),
            ],
        }),
        _ => None,
    }
}

impl FileKind {
    pub fn can_sync(self) -> bool {
        layout(self).is_some()
    }

    /// Read the values pushed to a database for this file.
    ///
    /// Three-dimensional data is reduced to its top surface (rows at the
    /// maximum z). `FileGV` additionally derives `cooling_rate = G * V`.
    pub fn values_for_sync(self, path: &Path) -> FileResult<SyncFields> {
        let layout = layout(self).ok_or(FileError::SyncUnsupported { kind: self.name() })?;
        self.validate(path)?;

        let headers = read_headers(path)?;
        let z = layout.z.filter(|z| headers.iter().any(|h| h == z));

        let mut columns = vec![layout.x, layout.y];
        columns.extend(layout.values.iter().map(|(src, _, _)| *src));
        if let Some(z) = z {
            columns.push(z);
        }

        let mut rows = read_columns(path, &columns)?;
        if z.is_some() {
            rows = top_surface(rows, columns.len() - 1);
        }

        let mut out = SyncFields {
            x: rows.iter().map(|r| r[0]).collect(),
            y: rows.iter().map(|r| r[1]).collect(),
            fields: Vec::new(),
        };
        for (i, (_, name, unit)) in layout.values.iter().enumerate() {
            out.fields.push(SyncField {
                name: name.to_string(),
                unit: unit.to_string(),
                values: rows.iter().map(|r| r[i + 2]).collect(),
            });
        }

        if self == FileKind::Gv {
            let cooling_rate = rows.iter().map(|r| r[2] * r[3]).collect();
            out.fields.push(SyncField {
                name: "cooling_rate".to_string(),
                unit: "K/s".to_string(),
                values: cooling_rate,
            });
        }
        Ok(out)
    }
}

//! Minimal CSV access: lower-cased headers and numeric column extraction.

use std::path::Path;

use crate::{FileError, FileResult};

fn reader(path: &Path) -> FileResult<csv::Reader<std::fs::File>> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| FileError::Csv {
            path: path.to_path_buf(),
            source,
        })
}

/// Header names, lower-cased.
pub fn read_headers(path: &Path) -> FileResult<Vec<String>> {
    let mut rdr = reader(path)?;
    let headers = rdr.headers().map_err(|source| FileError::Csv {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(headers.iter().map(|h| h.to_lowercase()).collect())
}

/// Numeric rows restricted to `columns` (lower-case names), in that order.
///
/// Rows with an empty or non-numeric cell in any requested column are
/// dropped.
pub fn read_columns(path: &Path, columns: &[&str]) -> FileResult<Vec<Vec<f64>>> {
    let mut rdr = reader(path)?;
    let headers: Vec<String> = rdr
        .headers()
        .map_err(|source| FileError::Csv {
            path: path.to_path_buf(),
            source,
        })?
        .iter()
        .map(|h| h.to_lowercase())
        .collect();

    let mut indices = Vec::with_capacity(columns.len());
    let mut missing = Vec::new();
    for col in columns {
        match headers.iter().position(|h| h == col) {
            Some(i) => indices.push(i),
            None => missing.push(col.to_string()),
        }
    }
    if !missing.is_empty() {
        return Err(FileError::MissingColumns {
            path: path.to_path_buf(),
            missing,
        });
    }

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(|source| FileError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        let row: Option<Vec<f64>> = indices
            .iter()
            .map(|&i| record.get(i).and_then(|cell| cell.parse::<f64>().ok()))
            .collect();
        match row {
            Some(row) if row.iter().all(|v| !v.is_nan()) => rows.push(row),
            _ => tracing::debug!(path = %path.display(), "dropping incomplete row"),
        }
    }
    Ok(rows)
}

/// Keep only rows whose column `z` holds the maximum value.
pub fn top_surface(rows: Vec<Vec<f64>>, z: usize) -> Vec<Vec<f64>> {
    let max_z = rows
        .iter()
        .map(|r| r[z])
        .fold(f64::NEG_INFINITY, f64::max);
    rows.into_iter().filter(|r| r[z] == max_z).collect()
}

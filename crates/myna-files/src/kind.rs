use std::fmt;
use std::path::Path;

use crate::table::read_headers;
use crate::{FileError, FileResult};

/// Format of a file produced or consumed by a workflow step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// Thermal gradient (G) and solidification velocity (V) at surface points.
    Gv,
    /// Integer id (e.g. cluster id) per surface point.
    Id,
    /// Region of interest locations within parts.
    Region,
    /// Region of interest locations across a build.
    BuildRegion,
    /// Reduced solidification data (melt/solidify times and cooling rate).
    ReducedSolidification,
    Temperature,
    TemperatureFinal,
    MeltPoolGeometry,
    GrainSlice,
    Vtk,
    Exodus,
}

impl FileKind {
    pub const ALL: [FileKind; 11] = [
        FileKind::Gv,
        FileKind::Id,
        FileKind::Region,
        FileKind::BuildRegion,
        FileKind::ReducedSolidification,
        FileKind::Temperature,
        FileKind::TemperatureFinal,
        FileKind::MeltPoolGeometry,
        FileKind::GrainSlice,
        FileKind::Vtk,
        FileKind::Exodus,
    ];

    /// Name used in default output templates and diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            FileKind::Gv => "FileGV",
            FileKind::Id => "FileID",
            FileKind::Region => "FileRegion",
            FileKind::BuildRegion => "FileBuildRegion",
            FileKind::ReducedSolidification => "FileReducedSolidification",
            FileKind::Temperature => "FileTemperature",
            FileKind::TemperatureFinal => "FileTemperatureFinal",
            FileKind::MeltPoolGeometry => "FileMeltPoolGeometry",
            FileKind::GrainSlice => "FileGrainSlice",
            FileKind::Vtk => "FileVTK",
            FileKind::Exodus => "FileExodus",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    /// Expected extension, including the dot.
    pub fn filetype(self) -> &'static str {
        match self {
            FileKind::Vtk => ".vtk",
            FileKind::Exodus => ".e",
            _ => ".csv",
        }
    }

    /// Lower-case CSV columns that must be present; extra columns are allowed.
    pub fn required_columns(self) -> &'static [&'static str] {
        match self {
            FileKind::Gv => &["x (m)", "y (m)", "g (k/m)", "v (m/s)"],
            FileKind::Id => &["x (m)", "y (m)", "id"],
            FileKind::Region => &["id", "x (m)", "y (m)", "layer_starts", "layer_ends", "part"],
            FileKind::BuildRegion => &["id", "x (m)", "y (m)", "layer_starts", "layer_ends"],
            FileKind::ReducedSolidification => &["x", "y", "z", "tm", "ts", "cr"],
            FileKind::Temperature | FileKind::TemperatureFinal => &["x (m)", "y (m)", "t (k)"],
            FileKind::MeltPoolGeometry => &[
                "time (s)",
                "x (m)",
                "y (m)",
                "length (m)",
                "width (m)",
                "depth (m)",
            ],
            FileKind::GrainSlice | FileKind::Vtk | FileKind::Exodus => &[],
        }
    }

    /// Check extension and columns.
    pub fn validate(self, path: &Path) -> FileResult<()> {
        let ext_matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| format!(".{e}") == self.filetype());
        if !ext_matches {
            return Err(FileError::WrongExtension {
                path: path.to_path_buf(),
                expected: self.filetype(),
            });
        }

        let required = self.required_columns();
        if required.is_empty() {
            return Ok(());
        }
        let headers = read_headers(path)?;
        let missing: Vec<String> = required
            .iter()
            .filter(|c| !headers.iter().any(|h| h == **c))
            .map(|c| c.to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(FileError::MissingColumns {
                path: path.to_path_buf(),
                missing,
            })
        }
    }

    /// Whether `path` exists and satisfies [`FileKind::validate`].
    pub fn is_valid(self, path: &Path) -> bool {
        if !path.is_file() {
            return false;
        }
        match self.validate(path) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(kind = self.name(), "{err}");
                false
            }
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

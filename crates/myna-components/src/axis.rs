use std::fmt;

/// A dimension a component's cases are enumerated over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Build,
    Part,
    Region,
    Layer,
    BuildRegion,
}

impl Axis {
    pub fn as_str(self) -> &'static str {
        match self {
            Axis::Build => "build",
            Axis::Part => "part",
            Axis::Region => "region",
            Axis::Layer => "layer",
            Axis::BuildRegion => "build_region",
        }
    }

    /// Template placeholder, e.g. `{part}`.
    pub fn placeholder(self) -> String {
        format!("{{{}}}", self.as_str())
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

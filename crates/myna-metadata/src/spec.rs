use std::fmt;

use indexmap::IndexMap;

use crate::{MetadataError, MetadataResult};

/// How often a requirement is resolved and where it is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataScope {
    /// One value per build: `data.build.<name>`.
    Build,
    /// One value per part: `parts.<part>.<name>`.
    Part,
    /// One file per build, cached under `myna_resources/`.
    BuildFile,
    /// One file per part, cached under `myna_resources/<part>/`.
    PartFile,
    /// One file per part and layer, cached under `myna_resources/<part>/<layer>/`.
    LayerFile,
}

impl MetadataScope {
    pub fn is_file(self) -> bool {
        matches!(
            self,
            MetadataScope::BuildFile | MetadataScope::PartFile | MetadataScope::LayerFile
        )
    }
}

impl fmt::Display for MetadataScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MetadataScope::Build => "build metadata",
            MetadataScope::Part => "part metadata",
            MetadataScope::BuildFile => "build file",
            MetadataScope::PartFile => "part file",
            MetadataScope::LayerFile => "layer file",
        };
        f.write_str(s)
    }
}

/// Post-processing applied to a loaded value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Normalize {
    #[default]
    None,
    Material,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetadataSpec {
    pub name: String,
    pub scope: MetadataScope,
    pub unit: String,
    /// File name inside the resource cache, for file scopes.
    pub local_name: Option<String>,
    pub normalize: Normalize,
    pub description: String,
}

impl MetadataSpec {
    pub fn value(name: &str, scope: MetadataScope, unit: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            scope,
            unit: unit.to_string(),
            local_name: None,
            normalize: Normalize::None,
            description: description.to_string(),
        }
    }

    pub fn file(name: &str, scope: MetadataScope, local_name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            scope,
            unit: String::new(),
            local_name: Some(local_name.to_string()),
            normalize: Normalize::None,
            description: description.to_string(),
        }
    }

    pub fn with_normalize(mut self, normalize: Normalize) -> Self {
        self.normalize = normalize;
        self
    }

    pub fn local_name(&self) -> &str {
        self.local_name.as_deref().unwrap_or(&self.name)
    }
}

/// Requirement name to spec lookup.
///
/// Populated with the built-in requirements at startup; applications may
/// [`register`](MetadataRegistry::register) more.
#[derive(Debug, Clone, Default)]
pub struct MetadataRegistry {
    specs: IndexMap<String, MetadataSpec>,
}

impl MetadataRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        use MetadataScope::*;
        let mut registry = Self::empty();
        for spec in [
            MetadataSpec::value("spot_size", Part, "mm", "laser spot size (D4sigma)"),
            MetadataSpec::value("laser_power", Part, "W", "nominal laser power"),
            MetadataSpec::value("material", Build, "", "build material")
                .with_normalize(Normalize::Material),
            MetadataSpec::value("preheat", Build, "K", "build plate preheat temperature"),
            MetadataSpec::value("layer_thickness", Build, "m", "powder layer thickness"),
            MetadataSpec::value("print_order", Build, "", "order in which parts are printed"),
            MetadataSpec::value("melt_order", Build, "", "order in which parts are melted"),
            MetadataSpec::file("scanpath", LayerFile, "scanpath.txt", "layer scan path"),
            MetadataSpec::file("stl", PartFile, "part.stl", "part geometry"),
            MetadataSpec::file("part_id_map", BuildFile, "part_id_map.csv", "part id lookup image"),
        ] {
            registry.register(spec);
        }
        registry
    }

    /// Add or replace a requirement.
    pub fn register(&mut self, spec: MetadataSpec) {
        self.specs.insert(spec.name.clone(), spec);
    }

    pub fn get(&self, name: &str) -> MetadataResult<&MetadataSpec> {
        self.specs
            .get(name)
            .ok_or_else(|| MetadataError::UnknownRequirement {
                name: name.to_string(),
                valid: self.specs.keys().cloned().collect(),
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetadataSpec> {
        self.specs.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_have_expected_scopes() {
        let r = MetadataRegistry::with_builtins();
        assert_eq!(r.get("laser_power").unwrap().scope, MetadataScope::Part);
        assert_eq!(r.get("preheat").unwrap().unit, "K");
        assert_eq!(r.get("scanpath").unwrap().local_name(), "scanpath.txt");
        assert!(r.get("stl").unwrap().scope.is_file());
    }

    #[test]
    fn unknown_name_lists_valid_names() {
        let r = MetadataRegistry::with_builtins();
        match r.get("hatch_spacing").unwrap_err() {
            MetadataError::UnknownRequirement { valid, .. } => {
                assert!(valid.contains(&"spot_size".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn register_adds_requirement() {
        let mut r = MetadataRegistry::empty();
        r.register(MetadataSpec::value("hatch_spacing", MetadataScope::Build, "m", "hatch"));
        assert_eq!(r.iter().count(), 1);
        assert!(r.get("hatch_spacing").is_ok());
    }
}

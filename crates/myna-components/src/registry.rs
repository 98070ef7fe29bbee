//! Class name to component contract lookup.

use indexmap::IndexMap;
use myna_core::StepCounter;

use crate::component::Component;
use crate::error::{ComponentError, ComponentResult};
use crate::spec::ComponentSpec;

pub type SpecConstructor = fn() -> ComponentSpec;

/// Maps the `class` key of a step to its [`ComponentSpec`].
#[derive(Debug, Clone)]
pub struct ComponentRegistry {
    classes: IndexMap<String, SpecConstructor>,
}

impl ComponentRegistry {
    pub fn empty() -> Self {
        Self {
            classes: IndexMap::new(),
        }
    }

    /// Every class shipped with Myna, plus the older `thermal*`,
    /// `classify_*` and `rve` names.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        let builtins: [(&str, SpecConstructor); 33] = [
            ("general", ComponentSpec::general),
            ("solidification_part", ComponentSpec::solidification_part),
            ("solidification_part_stl", ComponentSpec::solidification_part_stl),
            ("solidification_part_reduced", ComponentSpec::solidification_part_reduced),
            ("solidification_part_solidification", ComponentSpec::solidification_part_reduced),
            ("solidification_region", ComponentSpec::solidification_region),
            ("solidification_region_stl", ComponentSpec::solidification_region_stl),
            ("solidification_region_reduced", ComponentSpec::solidification_region_reduced),
            (
                "solidification_region_reduced_stl",
                ComponentSpec::solidification_region_reduced_stl,
            ),
            ("solidification_build_region", ComponentSpec::solidification_build_region),
            ("temperature_part", ComponentSpec::temperature_part),
            ("temperature_final_part", ComponentSpec::temperature_final_part),
            ("temperature_final_part_stl", ComponentSpec::temperature_final_part_stl),
            ("melt_pool_geometry_part", ComponentSpec::melt_pool_geometry_part),
            ("cluster_solidification", ComponentSpec::cluster_solidification),
            ("cluster_supervoxel", ComponentSpec::cluster_supervoxel),
            ("rve_selection", ComponentSpec::rve_selection),
            ("rve_part_center", ComponentSpec::rve_part_center),
            ("microstructure_part", ComponentSpec::microstructure_part),
            ("microstructure_region", ComponentSpec::microstructure_region),
            ("microstructure_region_slice", ComponentSpec::microstructure_region_slice),
            ("mesh_part", ComponentSpec::mesh_part),
            ("mesh_part_vtk", ComponentSpec::mesh_part_vtk),
            ("vtk_to_exodus_part", ComponentSpec::vtk_to_exodus_part),
            ("vtk_to_exodus_region", ComponentSpec::vtk_to_exodus_region),
            // older names
            ("thermal", ComponentSpec::thermal),
            ("thermal_part", ComponentSpec::solidification_part),
            ("thermal_region", ComponentSpec::thermal_region),
            ("thermal_region_reduced", ComponentSpec::solidification_region_reduced),
            ("classify_solidification", ComponentSpec::cluster_solidification),
            ("classify_thermal", ComponentSpec::cluster_solidification),
            ("classify_supervoxel", ComponentSpec::cluster_supervoxel),
            ("rve", ComponentSpec::rve_selection),
        ];
        for (name, constructor) in builtins {
            registry.register(name, constructor);
        }
        registry
    }

    /// Add or replace a class.
    pub fn register(&mut self, name: &str, constructor: SpecConstructor) {
        self.classes.insert(name.to_string(), constructor);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ComponentSpec)> {
        self.classes.iter().map(|(name, ctor)| (name.as_str(), ctor()))
    }

    pub fn spec(&self, name: &str) -> ComponentResult<ComponentSpec> {
        self.classes
            .get(name)
            .map(|ctor| ctor())
            .ok_or_else(|| ComponentError::UnknownClass {
                name: name.to_string(),
                valid: self.classes.keys().cloned().collect(),
            })
    }

    /// Build a fresh, unconfigured component for one step.
    pub fn create(&self, class: &str, counter: &mut StepCounter) -> ComponentResult<Component> {
        let spec = self.spec(class)?;
        Ok(Component::new(counter.next_id(), class, spec))
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

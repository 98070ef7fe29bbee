//! Static contracts of the component classes: what build data a step needs,
//! which file kinds it consumes and produces, and the axes its cases span.

use myna_files::FileKind;

use crate::axis::Axis;

/// Build data every thermal-type simulation needs.
const THERMAL_DATA: &[&str] = &[
    "spot_size",
    "laser_power",
    "preheat",
    "material",
    "scanpath",
    "layer_thickness",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentSpec {
    /// Human readable kind, e.g. `SolidificationPart`.
    pub kind: &'static str,
    pub data_requirements: Vec<&'static str>,
    pub input: Option<FileKind>,
    pub output: Option<FileKind>,
    /// Always starts with [`Axis::Build`].
    pub types: Vec<Axis>,
}

impl ComponentSpec {
    fn new(kind: &'static str) -> Self {
        Self {
            kind,
            data_requirements: Vec::new(),
            input: None,
            output: None,
            types: vec![Axis::Build],
        }
    }

    fn data(mut self, names: &[&'static str]) -> Self {
        for name in names {
            if !self.data_requirements.contains(name) {
                self.data_requirements.push(name);
            }
        }
        self
    }

    fn input(mut self, kind: FileKind) -> Self {
        self.input = Some(kind);
        self
    }

    fn output(mut self, kind: FileKind) -> Self {
        self.output = Some(kind);
        self
    }

    fn axes(mut self, axes: &[Axis]) -> Self {
        for axis in axes {
            if !self.types.contains(axis) {
                self.types.push(*axis);
            }
        }
        self
    }

    pub fn has_axis(&self, axis: Axis) -> bool {
        self.types.contains(&axis)
    }

    pub fn type_names(&self) -> Vec<&'static str> {
        self.types.iter().map(|a| a.as_str()).collect()
    }

    // -- catalog ----------------------------------------------------------

    /// A step with no data contract and no file kinds.
    pub fn general() -> Self {
        Self::new("General")
    }

    /// Part and layer thermal simulation producing solidification data.
    pub fn thermal() -> Self {
        Self::new("Thermal")
            .data(THERMAL_DATA)
            .output(FileKind::Gv)
            .axes(&[Axis::Part, Axis::Layer])
    }

    /// Thermal simulation of each region as a whole: one case per region,
    /// with no layer level in its directory.
    pub fn thermal_region() -> Self {
        Self::new("ThermalRegion")
            .data(THERMAL_DATA)
            .input(FileKind::Region)
            .output(FileKind::Gv)
            .axes(&[Axis::Part, Axis::Region])
    }

    pub fn solidification_part() -> Self {
        Self {
            kind: "SolidificationPart",
            ..Self::thermal()
        }
    }

    pub fn solidification_part_stl() -> Self {
        Self {
            kind: "SolidificationPartSTL",
            ..Self::solidification_part().data(&["stl"])
        }
    }

    pub fn solidification_part_reduced() -> Self {
        Self {
            kind: "SolidificationPartReduced",
            output: Some(FileKind::ReducedSolidification),
            ..Self::solidification_part()
        }
    }

    pub fn solidification_region() -> Self {
        Self::new("SolidificationRegion")
            .data(THERMAL_DATA)
            .input(FileKind::Region)
            .output(FileKind::Gv)
            .axes(&[Axis::Part, Axis::Region, Axis::Layer])
    }

    pub fn solidification_region_stl() -> Self {
        Self {
            kind: "SolidificationRegionSTL",
            ..Self::solidification_region().data(&["stl"])
        }
    }

    pub fn solidification_region_reduced() -> Self {
        Self {
            kind: "SolidificationRegionReduced",
            output: Some(FileKind::ReducedSolidification),
            ..Self::solidification_region()
        }
    }

    pub fn solidification_region_reduced_stl() -> Self {
        Self {
            kind: "SolidificationRegionReducedSTL",
            ..Self::solidification_region_reduced().data(&["stl"])
        }
    }

    pub fn solidification_build_region() -> Self {
        Self::new("SolidificationBuildRegion")
            .data(THERMAL_DATA)
            .data(&["print_order"])
            .input(FileKind::BuildRegion)
            .output(FileKind::Gv)
            .axes(&[Axis::BuildRegion, Axis::Layer])
    }

    pub fn temperature_part() -> Self {
        Self::new("TemperaturePart")
            .data(THERMAL_DATA)
            .output(FileKind::Temperature)
            .axes(&[Axis::Part, Axis::Layer])
    }

    pub fn temperature_final_part() -> Self {
        Self {
            kind: "TemperatureFinalPart",
            output: Some(FileKind::TemperatureFinal),
            ..Self::temperature_part()
        }
    }

    pub fn temperature_final_part_stl() -> Self {
        Self {
            kind: "TemperatureFinalPartSTL",
            ..Self::temperature_final_part().data(&["stl"])
        }
    }

    pub fn melt_pool_geometry_part() -> Self {
        Self::new("MeltPoolGeometryPart")
            .data(THERMAL_DATA)
            .output(FileKind::MeltPoolGeometry)
            .axes(&[Axis::Part, Axis::Layer])
    }

    pub fn cluster_solidification() -> Self {
        Self::new("ClusterSolidification")
            .input(FileKind::Gv)
            .output(FileKind::Id)
            .axes(&[Axis::Part, Axis::Layer])
    }

    pub fn cluster_supervoxel() -> Self {
        Self::new("ClusterSupervoxel")
            .input(FileKind::Id)
            .output(FileKind::Id)
            .axes(&[Axis::Part, Axis::Layer])
    }

    pub fn rve_selection() -> Self {
        Self::new("RVESelection")
            .input(FileKind::Id)
            .output(FileKind::Region)
    }

    pub fn rve_part_center() -> Self {
        Self::new("RVEPartCenter")
            .data(&["part_id_map"])
            .output(FileKind::Region)
    }

    pub fn microstructure_part() -> Self {
        Self::new("MicrostructurePart")
            .data(&["material"])
            .input(FileKind::ReducedSolidification)
            .output(FileKind::Vtk)
            .axes(&[Axis::Part])
    }

    pub fn microstructure_region() -> Self {
        Self {
            kind: "MicrostructureRegion",
            ..Self::microstructure_part().axes(&[Axis::Region])
        }
    }

    pub fn microstructure_region_slice() -> Self {
        Self {
            kind: "MicrostructureRegionSlice",
            output: Some(FileKind::GrainSlice),
            ..Self::microstructure_region()
        }
    }

    pub fn mesh_part() -> Self {
        Self::new("MeshPart")
            .data(&["stl", "layer_thickness"])
            .axes(&[Axis::Part])
    }

    pub fn mesh_part_vtk() -> Self {
        Self {
            kind: "MeshPartVTK",
            output: Some(FileKind::Vtk),
            ..Self::mesh_part()
        }
    }

    pub fn vtk_to_exodus_part() -> Self {
        Self::new("VtkToExodusPart")
            .input(FileKind::Vtk)
            .output(FileKind::Exodus)
            .axes(&[Axis::Part])
    }

    pub fn vtk_to_exodus_region() -> Self {
        Self {
            kind: "VtkToExodusRegion",
            ..Self::vtk_to_exodus_part().axes(&[Axis::Region])
        }
    }
}

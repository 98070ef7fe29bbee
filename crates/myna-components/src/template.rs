//! Expansion of path templates over a component's axes.
//!
//! Every case of a step lives in its own directory:
//! `<build>/[<build_region>|<part>[/<region>]]/[<layer>]/<step>/`.

use std::path::PathBuf;

use myna_settings::{DataView, LayerKey};

use crate::axis::Axis;

/// One case of a step: the axis values that select its directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaseKey {
    pub build_region: Option<String>,
    pub part: Option<String>,
    pub region: Option<String>,
    pub layer: Option<LayerKey>,
}

impl CaseKey {
    /// Directory of this case relative to the input file's directory.
    pub fn case_dir(&self, build: &str, step: &str) -> PathBuf {
        let mut dir = PathBuf::from(build);
        if let Some(br) = &self.build_region {
            dir.push(br);
        }
        if let Some(part) = &self.part {
            dir.push(part);
        }
        if let Some(region) = &self.region {
            dir.push(region);
        }
        if let Some(layer) = &self.layer {
            dir.push(layer.to_string());
        }
        dir.push(step);
        dir
    }

    /// Substitute the placeholders this case has values for.
    pub fn render(&self, template: &str, build: &str, step: &str) -> String {
        let mut out = template.replace("{build}", build).replace("{name}", step);
        let axes = [
            (Axis::BuildRegion, self.build_region.clone()),
            (Axis::Part, self.part.clone()),
            (Axis::Region, self.region.clone()),
            (Axis::Layer, self.layer.as_ref().map(LayerKey::to_string)),
        ];
        for (axis, value) in axes {
            if let Some(value) = value {
                out = out.replace(&axis.placeholder(), &value);
            }
        }
        out
    }
}

/// Enumerate the cases of a component with the given axes, in document order.
pub fn case_keys(types: &[Axis], data: &DataView) -> Vec<CaseKey> {
    let has = |axis| types.contains(&axis);
    let mut keys = Vec::new();

    if has(Axis::BuildRegion) {
        for (name, br) in &data.build.build_regions {
            let base = CaseKey {
                build_region: Some(name.clone()),
                ..CaseKey::default()
            };
            if has(Axis::Layer) {
                keys.extend(br.layerlist.iter().map(|l| CaseKey {
                    layer: Some(l.clone()),
                    ..base.clone()
                }));
            } else {
                keys.push(base);
            }
        }
        return keys;
    }

    if has(Axis::Part) {
        for (part, view) in data.parts() {
            let base = CaseKey {
                part: Some(part.clone()),
                ..CaseKey::default()
            };
            if has(Axis::Region) {
                let Some(regions) = &view.regions else {
                    tracing::info!(part = %part, "no regions specified for part");
                    return Vec::new();
                };
                for (region, rview) in regions {
                    let base = CaseKey {
                        region: Some(region.clone()),
                        ..base.clone()
                    };
                    if has(Axis::Layer) {
                        keys.extend(rview.layers.iter().map(|l| CaseKey {
                            layer: Some(l.clone()),
                            ..base.clone()
                        }));
                    } else {
                        keys.push(base);
                    }
                }
            } else if has(Axis::Layer) {
                keys.extend(view.layers.iter().map(|l| CaseKey {
                    layer: Some(l.clone()),
                    ..base.clone()
                }));
            } else {
                keys.push(base);
            }
        }
        return keys;
    }

    if types.iter().all(|a| *a == Axis::Build) {
        keys.push(CaseKey::default());
    }
    keys
}

/// Relative paths of `template` expanded over every case.
pub fn expand(
    types: &[Axis],
    data: &DataView,
    build: &str,
    step: &str,
    template: &str,
) -> Vec<PathBuf> {
    case_keys(types, data)
        .iter()
        .map(|key| key.case_dir(build, step).join(key.render(template, build, step)))
        .collect()
}

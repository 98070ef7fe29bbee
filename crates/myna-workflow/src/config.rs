//! `config`: resolve each step's data requirements from the build database,
//! cache the database files locally and lay out the case directories.

use std::iter;
use std::path::{Path, PathBuf};

use chrono::Local;
use myna_components::{Axis, CaseKey, Component};
use myna_core::document::{
    ensure_mapping, key, nested_get, nested_get_mut, nested_set, scalar_to_string,
};
use myna_core::env::path_string;
use myna_core::strf_datetime;
use myna_database::database_from_name;
use myna_metadata::{
    BuildMetadata, Database, DatabaseError, FileScope, MetadataRegistry, MetadataScope,
    MetadataSpec, PartMetadata, ResourceFile, resource_dir,
};
use myna_settings::{DataView, LayerKey, PartsLocation, ValidationError, load_input, write_input};
use serde_yaml::{Mapping, Value};

use crate::engine::{StepStatus, StepVisit, apply_settings, parent_dir};
use crate::error::{WorkflowError, WorkflowResult};

/// Per-case copy of the build data written into every case directory.
pub const CASE_DATA_FILE: &str = "myna_data.yaml";

#[derive(Debug, Clone, Default)]
pub struct ConfigOptions {
    /// Write the configured document here instead of over the input.
    pub output: Option<PathBuf>,
    /// List the database's files and stop.
    pub avail: bool,
    /// Re-copy resource files that are already cached.
    pub overwrite: bool,
}

pub(crate) enum Prepared<'a> {
    Available(Vec<PathBuf>),
    Session(ConfigSession<'a>),
}

pub(crate) struct ConfigSession<'a> {
    metadata: &'a MetadataRegistry,
    db: Box<dyn Database>,
    workdir: PathBuf,
    resources: PathBuf,
    overwrite: bool,
    previous: Option<Component>,
}

fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_default()
}

fn now() -> Value {
    Value::from(strf_datetime(&Local::now()))
}

/// Every part named at build level or in a build region's part list.
fn all_parts(view: &DataView) -> Vec<String> {
    let mut parts: Vec<String> = view.parts().keys().cloned().collect();
    for region in view.build.build_regions.values() {
        for part in &region.partlist {
            if !parts.contains(part) {
                parts.push(part.clone());
            }
        }
    }
    parts
}

impl<'a> ConfigSession<'a> {
    pub(crate) fn prepare(
        input: &Path,
        output: &Path,
        options: &ConfigOptions,
        metadata: &'a MetadataRegistry,
    ) -> WorkflowResult<Prepared<'a>> {
        let mut doc = load_input(input)?;
        let view = DataView::from_document(&doc)?;
        let workdir = parent_dir(input);

        let datatype = view.build.datatype.as_deref().ok_or_else(|| ValidationError::MissingData {
            path: "data.build.datatype".to_string(),
        })?;
        let build_path = view.build.path.as_deref().ok_or_else(|| ValidationError::MissingData {
            path: "data.build.path".to_string(),
        })?;
        let mut db = database_from_name(datatype)?;
        let db_path = workdir.join(build_path);
        db.set_path(&db_path);
        if !db.exists() {
            return Err(DatabaseError::NotFound { path: db_path }.into());
        }

        nested_set(&mut doc, &["myna", "version"], Value::from(env!("CARGO_PKG_VERSION")))?;
        let mut stamp = Mapping::new();
        stamp.insert(key("datetime-start"), now());
        stamp.insert(key("user-login"), Value::from(current_user()));
        stamp.insert(key("input-file"), Value::from(path_string(input)));
        stamp.insert(key("output-file"), Value::from(path_string(output)));
        nested_set(&mut doc, &["myna", "configure"], Value::Mapping(stamp))?;
        ensure_mapping(&mut doc, &["data", "output_paths"])?;

        if options.avail {
            let files = db.available_files()?;
            for file in &files {
                tracing::info!(file = %file.display(), "available");
            }
            return Ok(Prepared::Available(files));
        }

        if all_parts(&view).is_empty() {
            return Err(WorkflowError::NoParts {
                input: input.to_path_buf(),
            });
        }

        write_input(&doc, output)?;
        Ok(Prepared::Session(ConfigSession {
            metadata,
            db,
            resources: resource_dir(&workdir),
            workdir,
            overwrite: options.overwrite,
            previous: None,
        }))
    }

    /// Stamp the end time on the written document.
    pub(crate) fn finish(&self, output: &Path) -> WorkflowResult<()> {
        let mut doc = load_input(output)?;
        nested_set(&mut doc, &["myna", "configure", "datetime-end"], now())?;
        write_input(&doc, output)?;
        Ok(())
    }

    pub(crate) fn configure_step(&mut self, visit: StepVisit<'_>) -> WorkflowResult<StepStatus> {
        let StepVisit {
            mut entry,
            doc,
            mut component,
            ..
        } = visit;
        let name = entry.name.clone();

        let has_input_template = entry
            .body
            .get("input_template")
            .and_then(Value::as_str)
            .is_some_and(|t| !t.is_empty());
        if !has_input_template {
            if let Some(previous) = &self.previous {
                let template = Value::from(previous.output_template());
                if let Some(body) = step_body_mut(doc, entry.index) {
                    body.insert(key("input_template"), template.clone());
                }
                if let Some(body) = entry.body.as_mapping_mut() {
                    body.insert(key("input_template"), template);
                }
            }
        }
        if component.spec().input.is_some() && entry.index == 0 {
            tracing::warn!(step = %name, "step requires input but is the first step");
        }

        self.resolve_requirements(doc, &component)?;
        apply_settings(&mut component, &entry, doc, &self.workdir, None)?;
        self.write_case_data(doc, &component)?;

        if component.spec().input.is_some() {
            if let Some(previous) = &self.previous {
                for status in component.get_input_files(Some(previous))? {
                    tracing::info!(
                        step = %name,
                        file = %status.path.display(),
                        exists = status.exists,
                        valid = status.valid,
                        "expected input"
                    );
                }
            }
        }

        let mut outputs = 0;
        if component.spec().output.is_some() {
            let statuses = component.get_output_files(true)?;
            let mut paths = Vec::with_capacity(statuses.len());
            for status in &statuses {
                tracing::info!(
                    step = %name,
                    file = %status.path.display(),
                    exists = status.exists,
                    valid = status.valid,
                    "expected output"
                );
                paths.push(Value::from(path_string(&status.path)));
            }
            outputs = paths.len();
            nested_set(doc, &["data", "output_paths", name.as_str()], Value::Sequence(paths))?;
        }

        self.previous = Some(component);
        Ok(StepStatus::Configured { outputs })
    }

    /// Write every data requirement of `component` into `doc`.
    fn resolve_requirements(&self, doc: &mut Value, component: &Component) -> WorkflowResult<()> {
        let view = DataView::from_document(doc)?;
        let by_build_region = component.spec().has_axis(Axis::BuildRegion);

        for &name in &component.spec().data_requirements {
            let spec = self.metadata.get(name)?;
            match spec.scope {
                MetadataScope::Build => {
                    let meta = BuildMetadata::load(self.db.as_ref(), spec)?;
                    nested_set(doc, &["data", "build", name], meta.to_value())?;
                }
                MetadataScope::BuildFile => {
                    let file = self.resource(spec, FileScope::Build)?;
                    nested_set(doc, &["data", "build", name], file.to_value())?;
                }
                MetadataScope::Part | MetadataScope::PartFile => {
                    for (path, part) in part_targets(&view, by_build_region) {
                        let value = if spec.scope == MetadataScope::Part {
                            PartMetadata::load(self.db.as_ref(), spec, &part)?.to_value()
                        } else {
                            self.resource(spec, FileScope::Part(part))?.to_value()
                        };
                        set_at(doc, &path, name, value)?;
                    }
                }
                MetadataScope::LayerFile => {
                    for (path, part, layer) in layer_targets(&view, by_build_region) {
                        let file = self.resource(spec, FileScope::Layer(part, layer))?;
                        set_at(doc, &path, name, file.to_value())?;
                    }
                }
            }
        }
        Ok(())
    }

    fn resource(&self, spec: &MetadataSpec, scope: FileScope) -> WorkflowResult<ResourceFile> {
        let file = ResourceFile::load(self.db.as_ref(), spec, scope, &self.resources)?;
        file.copy_file(self.overwrite)?;
        Ok(file)
    }

    fn write_case_data(&self, doc: &Value, component: &Component) -> WorkflowResult<()> {
        let location = component.data().parts_location();
        for case in component.cases()? {
            std::fs::create_dir_all(&case.dir).map_err(|source| WorkflowError::CaseWrite {
                path: case.dir.clone(),
                source,
            })?;
            let data = case_data(doc, &case.key, location);
            let path = case.dir.join(CASE_DATA_FILE);
            std::fs::write(&path, serde_yaml::to_string(&data)?)
                .map_err(|source| WorkflowError::CaseWrite { path, source })?;
        }
        Ok(())
    }
}

fn set_at(doc: &mut Value, path: &[String], name: &str, value: Value) -> WorkflowResult<()> {
    let keys: Vec<&str> = path.iter().map(String::as_str).chain(iter::once(name)).collect();
    nested_set(doc, &keys, value)?;
    Ok(())
}

fn owned(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|k| k.to_string()).collect()
}

/// Where part-level values go, with the part they belong to.
fn part_targets(view: &DataView, by_build_region: bool) -> Vec<(Vec<String>, String)> {
    if by_build_region {
        view.build
            .build_regions
            .iter()
            .flat_map(|(br, region)| {
                region.partlist.iter().map(move |part| {
                    let path = owned(&[
                        "data",
                        "build",
                        "build_regions",
                        br.as_str(),
                        "parts",
                        part.as_str(),
                    ]);
                    (path, part.clone())
                })
            })
            .collect()
    } else {
        let base = view.parts_location().keys();
        view.parts()
            .keys()
            .map(|part| {
                let mut path = owned(base);
                path.push(part.clone());
                (path, part.clone())
            })
            .collect()
    }
}

/// Where layer files go: every layer of every part, and of every region.
fn layer_targets(view: &DataView, by_build_region: bool) -> Vec<(Vec<String>, String, LayerKey)> {
    let mut targets = Vec::new();
    if by_build_region {
        for (br, region) in &view.build.build_regions {
            for part in &region.partlist {
                for layer in &region.layerlist {
                    let layer_name = layer.to_string();
                    let path = owned(&[
                        "data",
                        "build",
                        "build_regions",
                        br.as_str(),
                        "parts",
                        part.as_str(),
                        "layer_data",
                        layer_name.as_str(),
                    ]);
                    targets.push((path, part.clone(), layer.clone()));
                }
            }
        }
        return targets;
    }

    let base = view.parts_location().keys();
    for (part, part_view) in view.parts() {
        for layer in &part_view.layers {
            let mut path = owned(base);
            path.extend([part.clone(), "layer_data".to_string(), layer.to_string()]);
            targets.push((path, part.clone(), layer.clone()));
        }
        for (region, region_view) in part_view.regions.iter().flatten() {
            for layer in &region_view.layers {
                let mut path = owned(base);
                path.extend([
                    part.clone(),
                    "regions".to_string(),
                    region.clone(),
                    "layer_data".to_string(),
                    layer.to_string(),
                ]);
                targets.push((path, part.clone(), layer.clone()));
            }
        }
    }
    targets
}

/// The mapping of the step at `index`, e.g. `steps[index].<name>`.
fn step_body_mut(doc: &mut Value, index: usize) -> Option<&mut Mapping> {
    doc.get_mut("steps")?
        .as_sequence_mut()?
        .get_mut(index)?
        .as_mapping_mut()?
        .values_mut()
        .next()?
        .as_mapping_mut()
}

/// Drop every key of the mapping at `value` except `keep`.
fn retain_key(value: Option<&mut Value>, keep: &str) {
    if let Some(Value::Mapping(map)) = value {
        map.retain(|k, _| scalar_to_string(k).as_deref() == Some(keep));
    }
}

/// Build data narrowed to one case: only its build region, part, region and
/// layer survive.
pub fn case_data(doc: &Value, case: &CaseKey, location: PartsLocation) -> Value {
    let data = doc.get("data");
    let mut build = data
        .and_then(|d| d.get("build"))
        .cloned()
        .unwrap_or_else(|| Value::Mapping(Mapping::new()));
    let mut data_parts = match location {
        PartsLocation::Build => None,
        PartsLocation::Data => data.and_then(|d| d.get("parts")).cloned(),
    };
    let layer = case.layer.as_ref().map(LayerKey::to_string);

    if let Some(br) = &case.build_region {
        if let Some(map) = build.as_mapping_mut() {
            map.shift_remove("parts");
        }
        retain_key(build.get_mut("build_regions"), br);
        if let Some(layer_key) = &case.layer {
            let layer = layer_key.to_string();
            if let Some(Value::Mapping(parts)) =
                nested_get_mut(&mut build, &["build_regions", br.as_str(), "parts"])
            {
                for (_, part) in parts.iter_mut() {
                    retain_key(part.get_mut("layer_data"), &layer);
                }
            }
            if let Ok(region) = ensure_mapping(&mut build, &["build_regions", br.as_str()]) {
                region.insert(key("layerlist"), Value::Sequence(vec![layer_key.to_value()]));
            }
        }
    }

    if let Some(part) = &case.part {
        let parts = match location {
            PartsLocation::Build => build.get_mut("parts"),
            PartsLocation::Data => data_parts.as_mut(),
        };
        if let Some(parts) = parts {
            retain_key(Some(&mut *parts), part);
            if let Some(part_value) = parts.get_mut(part.as_str()) {
                match (&case.region, &layer) {
                    (Some(region), layer) => {
                        retain_key(part_value.get_mut("regions"), region);
                        if let Some(layer) = layer {
                            let keys = ["regions", region.as_str(), "layer_data"];
                            retain_key(nested_get_mut(part_value, &keys), layer);
                        }
                    }
                    (None, Some(layer)) => retain_key(part_value.get_mut("layer_data"), layer),
                    (None, None) => {}
                }
            }
        }
    }

    let mut case_doc = Mapping::new();
    case_doc.insert(key("build"), build);
    if let Some(parts) = data_parts {
        case_doc.insert(key("parts"), parts);
    }
    if let Some(myna) = nested_get(doc, &["myna"]) {
        case_doc.insert(key("myna"), myna.clone());
    }
    Value::Mapping(case_doc)
}

//! Typed, read-only views over the settings document.
//!
//! Views are deserialized on demand from the raw tree; writes always go
//! through the raw [`Value`] so unknown keys are never dropped.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Value;

use myna_core::document::{nested_get, scalar_to_string};

use crate::validate::{REQUIRED_STEP_FIELDS, ValidationError};
use crate::SettingsResult;

/// Deserialize `null` as the type's default.
fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

/// One entry of the `steps` sequence: `{name: body}`.
#[derive(Debug, Clone, PartialEq)]
pub struct StepEntry {
    pub index: usize,
    pub name: String,
    pub body: Value,
}

impl StepEntry {
    pub fn class(&self) -> Option<&str> {
        self.body.get("class").and_then(Value::as_str)
    }

    pub fn application(&self) -> Option<&str> {
        self.body.get("application").and_then(Value::as_str)
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.body.as_mapping().is_some_and(|m| m.contains_key(field))
    }

    /// Required step fields absent from the body.
    pub fn missing_fields(&self) -> Vec<String> {
        REQUIRED_STEP_FIELDS
            .iter()
            .filter(|f| !self.has_field(f))
            .map(|f| f.to_string())
            .collect()
    }

    pub fn settings(&self) -> SettingsResult<StepSettings> {
        Ok(serde_yaml::from_value(self.body.clone())?)
    }
}

/// Parse `steps` into entries, in document order.
///
/// An empty mapping (the injected default) counts as no steps.
pub fn step_entries(doc: &Value) -> SettingsResult<Vec<StepEntry>> {
    let steps = match nested_get(doc, &["steps"]) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Mapping(m)) if m.is_empty() => return Ok(Vec::new()),
        Some(Value::Sequence(steps)) => steps,
        Some(_) => {
            return Err(ValidationError::InvalidValue {
                field: "steps".to_string(),
                value: "<non-sequence>".to_string(),
                reason: "steps must be a list of single-key mappings".to_string(),
            }
            .into());
        }
    };

    let mut entries = Vec::with_capacity(steps.len());
    for (index, item) in steps.iter().enumerate() {
        let (name, body) = item
            .as_mapping()
            .filter(|m| m.len() == 1)
            .and_then(|m| m.iter().next())
            .ok_or_else(|| ValidationError::InvalidStep {
                index,
                reason: "each step must be a mapping with exactly one key".to_string(),
            })?;
        let name = scalar_to_string(name).ok_or_else(|| ValidationError::InvalidStep {
            index,
            reason: "step name must be a scalar".to_string(),
        })?;
        entries.push(StepEntry {
            index,
            name,
            body: body.clone(),
        });
    }
    Ok(entries)
}

/// Typed view of a step body.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StepSettings {
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub application: Option<String>,
    #[serde(default)]
    pub configure: Option<PhaseSpec>,
    #[serde(default)]
    pub execute: Option<PhaseSpec>,
    #[serde(default)]
    pub postprocess: Option<PhaseSpec>,
    #[serde(default)]
    pub output_template: Option<String>,
    #[serde(default)]
    pub input_template: Option<String>,
    #[serde(default)]
    pub executable: Option<String>,
}

/// The three phases every step may define.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Configure,
    Execute,
    Postprocess,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Configure, Phase::Execute, Phase::Postprocess];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Configure => "configure",
            Phase::Execute => "execute",
            Phase::Postprocess => "postprocess",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StepSettings {
    pub fn phase(&self, phase: Phase) -> Option<&PhaseSpec> {
        match phase {
            Phase::Configure => self.configure.as_ref(),
            Phase::Execute => self.execute.as_ref(),
            Phase::Postprocess => self.postprocess.as_ref(),
        }
    }
}

/// What a phase runs.
///
/// A single command line, an explicit list of commands, or an option mapping
/// forwarded to the application's phase script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PhaseSpec {
    Line(String),
    Commands(Vec<CommandTemplate>),
    Options(IndexMap<String, Value>),
}

impl PhaseSpec {
    pub fn is_empty(&self) -> bool {
        match self {
            PhaseSpec::Line(line) => line.trim().is_empty(),
            PhaseSpec::Commands(commands) => commands.is_empty(),
            PhaseSpec::Options(options) => options.is_empty(),
        }
    }
}

/// One command of a command-list phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandTemplate {
    Line(String),
    Argv(Vec<Value>),
    Program {
        program: String,
        #[serde(default)]
        args: Vec<Value>,
    },
}

// ---------------------------------------------------------------------------
// Build data
// ---------------------------------------------------------------------------

/// A layer identifier: usually a number, occasionally a name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LayerKey {
    Number(i64),
    Name(String),
}

impl LayerKey {
    pub fn to_value(&self) -> Value {
        match self {
            LayerKey::Number(n) => Value::from(*n),
            LayerKey::Name(s) => Value::from(s.as_str()),
        }
    }
}

impl fmt::Display for LayerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerKey::Number(n) => write!(f, "{n}"),
            LayerKey::Name(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DataView {
    #[serde(default, deserialize_with = "null_default")]
    pub build: BuildView,
    #[serde(default, deserialize_with = "null_default")]
    pub parts: IndexMap<String, PartView>,
    #[serde(default, deserialize_with = "null_default")]
    pub output_paths: IndexMap<String, Option<Vec<String>>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BuildView {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub datatype: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub parts: IndexMap<String, PartView>,
    #[serde(default, deserialize_with = "null_default")]
    pub build_regions: IndexMap<String, BuildRegionView>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PartView {
    #[serde(default, deserialize_with = "null_default")]
    pub layers: Vec<LayerKey>,
    #[serde(default, deserialize_with = "null_default")]
    pub regions: Option<IndexMap<String, RegionView>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RegionView {
    #[serde(default, deserialize_with = "null_default")]
    pub layers: Vec<LayerKey>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BuildRegionView {
    #[serde(default, deserialize_with = "null_default")]
    pub layerlist: Vec<LayerKey>,
    #[serde(default, deserialize_with = "null_default")]
    pub partlist: Vec<String>,
}

/// Where the part mapping lives in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartsLocation {
    /// `data.build.parts`
    Build,
    /// `data.parts`
    Data,
}

impl PartsLocation {
    pub fn keys(self) -> &'static [&'static str] {
        match self {
            PartsLocation::Build => &["data", "build", "parts"],
            PartsLocation::Data => &["data", "parts"],
        }
    }
}

impl DataView {
    /// View the `data` section of a full settings document.
    pub fn from_document(doc: &Value) -> SettingsResult<Self> {
        match nested_get(doc, &["data"]) {
            Some(data) => Self::from_data(data),
            None => Ok(Self::default()),
        }
    }

    pub fn from_data(data: &Value) -> SettingsResult<Self> {
        Ok(serde_yaml::from_value(data.clone())?)
    }

    pub fn build_name(&self) -> Result<&str, ValidationError> {
        self.build
            .name
            .as_deref()
            .ok_or_else(|| ValidationError::MissingData {
                path: "data.build.name".to_string(),
            })
    }

    /// `data.build.parts` when present, otherwise `data.parts`.
    pub fn parts_location(&self) -> PartsLocation {
        if self.build.parts.is_empty() && !self.parts.is_empty() {
            PartsLocation::Data
        } else {
            PartsLocation::Build
        }
    }

    pub fn parts(&self) -> &IndexMap<String, PartView> {
        match self.parts_location() {
            PartsLocation::Build => &self.build.parts,
            PartsLocation::Data => &self.parts,
        }
    }

    pub fn output_paths(&self, step: &str) -> Vec<String> {
        self.output_paths
            .get(step)
            .cloned()
            .flatten()
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Myna section and workspace
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MynaView {
    #[serde(default)]
    pub workspace: Option<String>,
    #[serde(default)]
    pub interpreter: Option<String>,
}

impl MynaView {
    pub fn from_document(doc: &Value) -> SettingsResult<Self> {
        match nested_get(doc, &["myna"]) {
            Some(myna) if !myna.is_null() => Ok(serde_yaml::from_value(myna.clone())?),
            _ => Ok(Self::default()),
        }
    }
}

/// Per-application defaults shared across input files.
///
/// Layout: `<application>.<class>.{executable, configure, execute, postprocess}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workspace {
    root: Value,
}

impl Workspace {
    pub fn new(root: Value) -> Self {
        Self { root }
    }

    pub fn load(path: &std::path::Path) -> SettingsResult<Self> {
        Ok(Self::new(crate::read_document(path)?))
    }

    pub fn executable(&self, application: &str, class: &str) -> Option<String> {
        nested_get(&self.root, &[application, class, "executable"]).and_then(scalar_to_string)
    }

    /// Option defaults for one phase, in workspace order.
    pub fn phase_options(
        &self,
        application: &str,
        class: &str,
        phase: Phase,
    ) -> IndexMap<String, Value> {
        let mut options = IndexMap::new();
        if let Some(map) =
            nested_get(&self.root, &[application, class, phase.as_str()])
                .and_then(Value::as_mapping)
        {
            for (k, v) in map {
                if let Some(k) = scalar_to_string(k) {
                    options.insert(k, v.clone());
                }
            }
        }
        options
    }
}

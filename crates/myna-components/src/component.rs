//! A single workflow step bound to its settings.

use std::path::{Path, PathBuf};
use std::process::Command;

use myna_core::document::nested_get;
use myna_core::env::path_string;
use myna_core::{InstallPaths, StepEnvironment, StepId};
use myna_files::FileKind;
use myna_metadata::{Database, MetadataRegistry, MetadataScope, SyncRequest};
use myna_settings::{
    DataView, LayerKey, MynaView, Phase, PhaseSpec, StepEntry, StepSettings, ValidationError,
    Workspace,
};
use serde_yaml::{Mapping, Value};

use crate::axis::Axis;
use crate::command::{Substitutions, option_args, split_command_line, template_argv};
use crate::error::{ComponentError, ComponentResult};
use crate::spec::ComponentSpec;
use crate::state::ComponentState;
use crate::template::{self, CaseKey};

const DEFAULT_INTERPRETER: &str = "python";

/// Everything `apply_settings` reads besides the step's own mapping.
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    /// The document's `data` section.
    pub data: &'a Value,
    pub myna: &'a MynaView,
    pub workspace: Option<&'a Workspace>,
    /// Directory of the settings file; relative paths resolve against it.
    pub workdir: &'a Path,
    /// When set, every data requirement must already be in `data`.
    pub require_data: Option<&'a MetadataRegistry>,
}

/// An expected file and what is currently on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStatus {
    pub path: PathBuf,
    pub exists: bool,
    pub valid: bool,
}

/// One case directory of a configured step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Case {
    pub key: CaseKey,
    pub dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub executed: bool,
    pub outputs: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Component {
    id: StepId,
    name: String,
    class: String,
    spec: ComponentSpec,
    settings: StepSettings,
    application: Option<String>,
    executable: Option<String>,
    input_template: String,
    output_template: String,
    interpreter: String,
    data: DataView,
    raw_data: Value,
    workspace: Option<Workspace>,
    workdir: PathBuf,
    state: ComponentState,
}

impl Component {
    pub fn new(id: StepId, class: &str, spec: ComponentSpec) -> Self {
        Self {
            name: format!("{class}-{id}"),
            id,
            class: class.to_string(),
            spec,
            settings: StepSettings::default(),
            application: None,
            executable: None,
            input_template: String::new(),
            output_template: String::new(),
            interpreter: DEFAULT_INTERPRETER.to_string(),
            data: DataView::default(),
            raw_data: Value::Mapping(Mapping::new()),
            workspace: None,
            workdir: PathBuf::from("."),
            state: ComponentState::Unconfigured,
        }
    }

    pub fn id(&self) -> StepId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn spec(&self) -> &ComponentSpec {
        &self.spec
    }

    pub fn state(&self) -> ComponentState {
        self.state
    }

    pub fn application(&self) -> Option<&str> {
        self.application.as_deref()
    }

    pub fn executable(&self) -> Option<&str> {
        self.executable.as_deref()
    }

    pub fn input_template(&self) -> &str {
        &self.input_template
    }

    pub fn output_template(&self) -> &str {
        &self.output_template
    }

    pub fn data(&self) -> &DataView {
        &self.data
    }

    /// `<class>[-<name>-<FileKind><ext>]`
    pub fn default_output_template(&self) -> String {
        match self.spec.output {
            Some(kind) => format!(
                "{}-{}-{}{}",
                self.class,
                self.name,
                kind.name(),
                kind.filetype()
            ),
            None => self.class.clone(),
        }
    }

    fn advance(&mut self, next: ComponentState, action: &'static str) -> ComponentResult<()> {
        if !self.state.can_advance_to(next) {
            return Err(self.transition_error(action));
        }
        self.state = next;
        Ok(())
    }

    fn require_state(&self, state: ComponentState, action: &'static str) -> ComponentResult<()> {
        if self.state == state {
            Ok(())
        } else {
            Err(self.transition_error(action))
        }
    }

    fn transition_error(&self, action: &'static str) -> ComponentError {
        ComponentError::InvalidTransition {
            step: self.name.clone(),
            state: self.state,
            action,
        }
    }

    // -----------------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------------

    /// Bind the step's settings and the build data.
    pub fn apply_settings(
        &mut self,
        step: &StepEntry,
        ctx: &StepContext<'_>,
    ) -> ComponentResult<()> {
        self.require_state(ComponentState::Unconfigured, "apply settings")?;

        let missing = step.missing_fields();
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields {
                step: step.name.clone(),
                fields: missing,
            }
            .into());
        }

        let settings = step.settings()?;
        self.application = settings.application.clone().filter(|a| !a.is_empty());
        self.workspace = ctx.workspace.cloned();
        self.executable = settings.executable.clone().or_else(|| {
            let app = self.application.as_deref()?;
            self.workspace.as_ref()?.executable(app, &self.class)
        });
        self.output_template = settings
            .output_template
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| self.default_output_template());
        self.input_template = settings.input_template.clone().unwrap_or_default();
        self.interpreter = ctx
            .myna
            .interpreter
            .clone()
            .unwrap_or_else(|| DEFAULT_INTERPRETER.to_string());
        self.data = DataView::from_data(ctx.data)?;
        self.raw_data = ctx.data.clone();
        self.workdir = ctx.workdir.to_path_buf();
        self.settings = settings;

        if let Some(registry) = ctx.require_data {
            let missing = self.missing_data_requirements(registry)?;
            if !missing.is_empty() {
                return Err(ComponentError::MissingDataRequirements {
                    step: self.name.clone(),
                    missing,
                });
            }
        }

        self.advance(ComponentState::Configured, "apply settings")
    }

    /// Data requirements not yet present in the bound `data` section.
    ///
    /// Build-region steps keep their part and layer values under
    /// `build.build_regions.<region>.parts`, matching what `config` writes.
    pub fn missing_data_requirements(
        &self,
        registry: &MetadataRegistry,
    ) -> ComponentResult<Vec<String>> {
        let targets = self.part_entries();
        let layer_entry = |entry: Option<&Value>, layer: &LayerKey, name: &str| {
            entry
                .and_then(|p| p.get("layer_data"))
                .and_then(Value::as_mapping)
                .and_then(|m| m.get(layer.to_value()).or_else(|| m.get(layer.to_string())))
                .and_then(|data| data.get(name))
                .is_some()
        };

        let mut missing = Vec::new();
        for &name in &self.spec.data_requirements {
            let meta = registry.get(name)?;
            let present = match meta.scope {
                MetadataScope::Build | MetadataScope::BuildFile => {
                    nested_get(&self.raw_data, &["build", name]).is_some()
                }
                MetadataScope::Part | MetadataScope::PartFile => targets
                    .iter()
                    .all(|&(entry, _)| entry.and_then(|p| p.get(name)).is_some()),
                MetadataScope::LayerFile => targets
                    .iter()
                    .all(|(entry, layers)| layers.iter().all(|l| layer_entry(*entry, l, name))),
            };
            if !present {
                missing.push(name.to_string());
            }
        }
        Ok(missing)
    }

    /// The document entry of every part this step reads, with its layers.
    fn part_entries(&self) -> Vec<(Option<&Value>, Vec<LayerKey>)> {
        if self.spec.has_axis(Axis::BuildRegion) {
            return self
                .data
                .build
                .build_regions
                .iter()
                .flat_map(move |(br, region)| {
                    region.partlist.iter().map(move |part| {
                        let keys = ["build", "build_regions", br.as_str(), "parts", part.as_str()];
                        (nested_get(&self.raw_data, &keys), region.layerlist.clone())
                    })
                })
                .collect();
        }
        let parts_keys = &self.data.parts_location().keys()[1..];
        let parts_value = nested_get(&self.raw_data, parts_keys);
        self.data
            .parts()
            .iter()
            .map(|(part, view)| {
                let entry = parts_value.and_then(|p| p.get(part.as_str()));
                (entry, view.layers.clone())
            })
            .collect()
    }

    /// Every case of this step with its absolute directory.
    pub fn cases(&self) -> ComponentResult<Vec<Case>> {
        let build = self.data.build_name()?;
        template::case_keys(&self.spec.types, &self.data)
            .into_iter()
            .map(|key| {
                let dir = self.absolute(&key.case_dir(build, &self.name))?;
                Ok(Case { key, dir })
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Files
    // -----------------------------------------------------------------------

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workdir.join(path)
        }
    }

    fn absolute(&self, path: &Path) -> ComponentResult<PathBuf> {
        std::path::absolute(self.resolve(path)).map_err(|source| ComponentError::Path {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Expand `template` over every case of this step.
    pub fn get_files_from_template(
        &self,
        template: &str,
        abspath: bool,
    ) -> ComponentResult<Vec<PathBuf>> {
        let build = self.data.build_name()?;
        let files = template::expand(&self.spec.types, &self.data, build, &self.name, template);
        if !abspath {
            return Ok(files);
        }
        files.iter().map(|f| self.absolute(f)).collect()
    }

    fn statuses(&self, files: Vec<PathBuf>, kind: Option<FileKind>) -> Vec<FileStatus> {
        files
            .into_iter()
            .map(|path| {
                let resolved = self.resolve(&path);
                let exists = resolved.exists();
                let valid = exists && kind.is_some_and(|k| k.is_valid(&resolved));
                FileStatus { path, exists, valid }
            })
            .collect()
    }

    pub fn get_output_files(&self, abspath: bool) -> ComponentResult<Vec<FileStatus>> {
        let files = self.get_files_from_template(&self.output_template, abspath)?;
        Ok(self.statuses(files, self.spec.output))
    }

    /// Files this step reads: the previous step's outputs when given,
    /// otherwise this step's own `input_template`.
    pub fn get_input_files(
        &self,
        previous: Option<&Component>,
    ) -> ComponentResult<Vec<FileStatus>> {
        if let Some(previous) = previous {
            return previous.get_output_files(true);
        }
        if self.input_template.is_empty() {
            return Ok(Vec::new());
        }
        let files = self.get_files_from_template(&self.input_template, true)?;
        Ok(self.statuses(files, self.spec.input))
    }

    /// The subset of `files` that pass the output kind's check.
    pub fn check_output_files(&self, files: &[PathBuf]) -> Vec<PathBuf> {
        let Some(kind) = self.spec.output else {
            tracing::info!(step = %self.name, "no output requirement specified");
            return Vec::new();
        };
        files
            .iter()
            .filter(|f| kind.is_valid(&self.resolve(f)))
            .cloned()
            .collect()
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    fn substitutions(&self, paths: &InstallPaths) -> Substitutions {
        let mut subs = Substitutions::new().with("{name}", self.name.as_str());
        if let Some(build) = &self.data.build.name {
            subs = subs.with("{build}", build.as_str());
        }
        subs.with("$MYNA_APP_PATH", path_string(&paths.app))
            .with("$MYNA_INSTALL_PATH", path_string(&paths.install))
    }

    fn syntax_error(&self, command: String, reason: String) -> ComponentError {
        ComponentError::CommandSyntax {
            step: self.name.clone(),
            command,
            reason,
        }
    }

    fn script_call(
        &self,
        phase: Phase,
        options: &indexmap::IndexMap<String, Value>,
        paths: &InstallPaths,
    ) -> ComponentResult<Option<Vec<String>>> {
        let app = self
            .application
            .as_deref()
            .ok_or_else(|| ComponentError::MissingApplication {
                step: self.name.clone(),
                phase: phase.as_str(),
            })?;
        let script = paths
            .app
            .join(app)
            .join(&self.class)
            .join(format!("{}.py", phase.as_str()));
        if !script.is_file() {
            tracing::debug!(step = %self.name, script = %script.display(), "no phase script");
            return Ok(None);
        }

        let defaults = self
            .workspace
            .as_ref()
            .map(|w| w.phase_options(app, &self.class, phase))
            .unwrap_or_default();
        let mut argv = vec![self.interpreter.clone(), path_string(&script)];
        argv.extend(option_args(&self.name, &defaults, options));
        if let Some(exe) = &self.executable {
            if !argv.iter().any(|a| a == "--exec") {
                argv.push("--exec".to_string());
                argv.push(exe.clone());
            }
        }
        Ok(Some(argv))
    }

    /// The substituted argv of every command in `phase`.
    pub fn render_phase(
        &self,
        phase: Phase,
        paths: &InstallPaths,
    ) -> ComponentResult<Vec<Vec<String>>> {
        let mut commands = Vec::new();
        match self.settings.phase(phase) {
            None => {}
            Some(PhaseSpec::Line(line)) => {
                let argv =
                    split_command_line(line).map_err(|r| self.syntax_error(line.clone(), r))?;
                commands.push(argv);
            }
            Some(PhaseSpec::Commands(templates)) => {
                for t in templates {
                    let argv = template_argv(t)
                        .map_err(|r| self.syntax_error(format!("{t:?}"), r))?;
                    commands.push(argv);
                }
            }
            Some(PhaseSpec::Options(options)) => {
                commands.extend(self.script_call(phase, options, paths)?);
            }
        }

        let subs = self.substitutions(paths);
        let mut rendered = Vec::with_capacity(commands.len());
        for argv in commands.into_iter().filter(|argv| !argv.is_empty()) {
            let argv: Vec<String> = argv.iter().map(|w| subs.apply(w)).collect();
            if argv.iter().any(|w| w.contains("{build}")) {
                return Err(ValidationError::MissingData {
                    path: "data.build.name".to_string(),
                }
                .into());
            }
            rendered.push(argv);
        }
        Ok(rendered)
    }

    /// Run every command of `phase` to completion; returns how many ran.
    fn run_phase(
        &self,
        phase: Phase,
        env: &StepEnvironment,
        paths: &InstallPaths,
    ) -> ComponentResult<usize> {
        let commands = self.render_phase(phase, paths)?;
        for argv in &commands {
            let Some((program, args)) = argv.split_first() else {
                continue;
            };
            tracing::info!(step = %self.name, %phase, command = %argv.join(" "), "running");
            let mut command = Command::new(program);
            command.args(args).current_dir(&self.workdir);
            env.apply(&mut command);
            match command.status() {
                Ok(status) if status.success() => {}
                Ok(status) => {
                    tracing::warn!(
                        step = %self.name,
                        %phase,
                        code = ?status.code(),
                        "command exited with failure"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        step = %self.name,
                        %phase,
                        program = %program,
                        error = %e,
                        "failed to launch command"
                    );
                }
            }
        }
        Ok(commands.len())
    }

    /// Run configure, execute and postprocess, then validate the outputs.
    ///
    /// Outputs are only checked when the execute phase rendered at least one
    /// command and the class declares an output kind.
    pub fn run_component(
        &mut self,
        env: &StepEnvironment,
        paths: &InstallPaths,
    ) -> ComponentResult<RunReport> {
        self.require_state(ComponentState::Configured, "run")?;

        self.run_phase(Phase::Configure, env, paths)?;
        let executed = self.run_phase(Phase::Execute, env, paths)? > 0;
        self.advance(
            if executed {
                ComponentState::Executed
            } else {
                ComponentState::SkippedExecute
            },
            "execute",
        )?;
        self.run_phase(Phase::Postprocess, env, paths)?;
        self.advance(ComponentState::PostProcessed, "postprocess")?;

        let outputs: Vec<PathBuf> = self
            .get_output_files(true)?
            .into_iter()
            .map(|s| s.path)
            .collect();
        if executed {
            if self.spec.output.is_some() {
                let valid = self.check_output_files(&outputs);
                if valid.len() != outputs.len() {
                    return Err(ComponentError::OutputValidation {
                        step: self.name.clone(),
                        expected: outputs,
                        valid: valid.len(),
                    });
                }
            }
            tracing::info!(step = %self.name, outputs = outputs.len(), "all output files valid");
        } else {
            for file in &outputs {
                tracing::info!(
                    step = %self.name,
                    file = %file.display(),
                    "no execute command; expected output"
                );
            }
        }

        self.advance(ComponentState::Checked, "check outputs")?;
        Ok(RunReport { executed, outputs })
    }

    /// Whether outputs are per layer or per region, and so can be synced.
    pub fn has_segment_outputs(&self) -> bool {
        self.spec.has_axis(Axis::Layer) || self.spec.has_axis(Axis::Region)
    }

    /// Push this step's recorded outputs into `db`.
    ///
    /// Only steps with a layer or region axis have per-segment results.
    pub fn sync_output_files(
        &self,
        db: &mut dyn Database,
        input: &Path,
    ) -> ComponentResult<Vec<PathBuf>> {
        self.require_state(ComponentState::Configured, "sync")?;
        if !self.has_segment_outputs() {
            tracing::info!(
                step = %self.name,
                "outputs are not per layer or region; nothing to sync"
            );
            return Ok(Vec::new());
        }

        let files: Vec<PathBuf> = self
            .data
            .output_paths(&self.name)
            .into_iter()
            .map(PathBuf::from)
            .collect();
        let valid = self.check_output_files(&files);
        let Some(output) = self.spec.output else {
            return Ok(Vec::new());
        };
        if valid.is_empty() {
            tracing::info!(step = %self.name, "no valid output files to sync");
            return Ok(Vec::new());
        }

        let types = self.spec.type_names();
        let synced = db.sync(&SyncRequest {
            input,
            step: &self.name,
            application: self.application.as_deref().unwrap_or_default(),
            types: &types,
            output,
            files: &valid,
        })?;
        Ok(synced)
    }
}

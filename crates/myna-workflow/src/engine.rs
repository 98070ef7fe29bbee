//! The step loop shared by `config`, `run` and `sync`.

use std::fmt;
use std::path::{Path, PathBuf};

use myna_components::{Component, ComponentRegistry, StepContext};
use myna_core::env::{
    MYNA_CONFIG_INPUT, MYNA_INPUT, MYNA_LAST_STEP_CLASS, MYNA_LAST_STEP_NAME, MYNA_RUN_INPUT,
    MYNA_STEP_CLASS, MYNA_STEP_INDEX, MYNA_STEP_NAME, MYNA_SYNC_INPUT, path_string,
};
use myna_core::{InstallPaths, StepCounter, StepEnvironment};
use myna_database::database_from_name;
use myna_metadata::MetadataRegistry;
use myna_settings::{
    MynaView, StepEntry, ValidationError, Workspace, load_input, step_entries, write_input,
};
use serde_yaml::Value;

use crate::config::{self, ConfigOptions, ConfigSession};
use crate::error::{WorkflowError, WorkflowResult};
use crate::progress::{ProgressCallback, WorkflowEvent, WorkflowStage, emit};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Config,
    Run,
    Sync,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Config => "config",
            Mode::Run => "run",
            Mode::Sync => "sync",
        }
    }

    /// Mode-specific alias of `MYNA_INPUT`.
    fn input_var(self) -> &'static str {
        match self {
            Mode::Config => MYNA_CONFIG_INPUT,
            Mode::Run => MYNA_RUN_INPUT,
            Mode::Sync => MYNA_SYNC_INPUT,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Skipped,
    Configured { outputs: usize },
    Ran { executed: bool, outputs: usize },
    Synced { files: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub index: usize,
    pub name: String,
    pub class: String,
    pub status: StepStatus,
}

#[derive(Debug, Clone, Default)]
pub struct WorkflowSummary {
    /// Document the steps read and, for `config`, wrote.
    pub document: PathBuf,
    pub steps: Vec<StepOutcome>,
    /// Files in the database directory, only filled by `config --avail`.
    pub available: Vec<PathBuf>,
}

/// One iteration of the step loop, handed to the mode handler.
pub(crate) struct StepVisit<'a> {
    pub entry: StepEntry,
    pub doc: &'a mut Value,
    pub component: Component,
    pub env: &'a StepEnvironment,
}

/// Registries, installation paths and the step id counter for a session.
#[derive(Debug)]
pub struct Workflow {
    components: ComponentRegistry,
    metadata: MetadataRegistry,
    install: InstallPaths,
    counter: StepCounter,
}

impl Workflow {
    pub fn new(install: InstallPaths) -> Self {
        Self::with_registries(
            ComponentRegistry::with_builtins(),
            MetadataRegistry::with_builtins(),
            install,
        )
    }

    pub fn with_registries(
        components: ComponentRegistry,
        metadata: MetadataRegistry,
        install: InstallPaths,
    ) -> Self {
        Self {
            components,
            metadata,
            install,
            counter: StepCounter::new(),
        }
    }

    pub fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    pub fn metadata(&self) -> &MetadataRegistry {
        &self.metadata
    }

    pub fn install(&self) -> &InstallPaths {
        &self.install
    }

    /// Resolve data requirements and lay out the case directories.
    pub fn config(
        &mut self,
        input: &Path,
        options: &ConfigOptions,
        mut progress: ProgressCallback<'_>,
    ) -> WorkflowResult<WorkflowSummary> {
        let input = absolute(input)?;
        let output = match &options.output {
            Some(path) => absolute(path)?,
            None => input.clone(),
        };
        emit(
            &mut progress,
            WorkflowEvent::stage(Mode::Config, WorkflowStage::LoadingSettings, None),
        );

        let mut session = match ConfigSession::prepare(&input, &output, options, &self.metadata)? {
            config::Prepared::Available(files) => {
                return Ok(WorkflowSummary {
                    document: input,
                    steps: Vec::new(),
                    available: files,
                });
            }
            config::Prepared::Session(session) => session,
        };

        let base_env = self.base_env(Mode::Config, &input);
        let steps = for_each_step(
            &self.components,
            &mut self.counter,
            Mode::Config,
            &output,
            &base_env,
            None,
            &mut progress,
            |visit| session.configure_step(visit),
        )?;
        session.finish(&output)?;

        emit(
            &mut progress,
            WorkflowEvent::stage(Mode::Config, WorkflowStage::Completed, None),
        );
        Ok(WorkflowSummary {
            document: output,
            steps,
            available: Vec::new(),
        })
    }

    /// Run every selected step in order and validate its outputs.
    pub fn run(
        &mut self,
        input: &Path,
        steps: Option<&[String]>,
        mut progress: ProgressCallback<'_>,
    ) -> WorkflowResult<WorkflowSummary> {
        let input = absolute(input)?;
        let workdir = parent_dir(&input);
        let base_env = self.base_env(Mode::Run, &input);
        let metadata = &self.metadata;
        let install = &self.install;

        let outcomes = for_each_step(
            &self.components,
            &mut self.counter,
            Mode::Run,
            &input,
            &base_env,
            steps,
            &mut progress,
            |visit| {
                let StepVisit {
                    entry,
                    doc,
                    mut component,
                    env,
                } = visit;
                apply_settings(&mut component, &entry, doc, &workdir, Some(metadata))?;
                let report = component.run_component(env, install)?;
                Ok(StepStatus::Ran {
                    executed: report.executed,
                    outputs: report.outputs.len(),
                })
            },
        )?;

        emit(
            &mut progress,
            WorkflowEvent::stage(Mode::Run, WorkflowStage::Completed, None),
        );
        Ok(WorkflowSummary {
            document: input,
            steps: outcomes,
            available: Vec::new(),
        })
    }

    /// Push the recorded outputs of every selected step to the build database.
    pub fn sync(
        &mut self,
        input: &Path,
        steps: Option<&[String]>,
        mut progress: ProgressCallback<'_>,
    ) -> WorkflowResult<WorkflowSummary> {
        let input = absolute(input)?;
        let workdir = parent_dir(&input);
        let base_env = self.base_env(Mode::Sync, &input);
        let metadata = &self.metadata;

        let outcomes = for_each_step(
            &self.components,
            &mut self.counter,
            Mode::Sync,
            &input,
            &base_env,
            steps,
            &mut progress,
            |visit| {
                let StepVisit {
                    entry,
                    doc,
                    mut component,
                    ..
                } = visit;
                apply_settings(&mut component, &entry, doc, &workdir, Some(metadata))?;
                if !component.has_segment_outputs() {
                    tracing::info!(
                        step = %entry.name,
                        "outputs are not per layer or region; nothing to sync"
                    );
                    return Ok(StepStatus::Synced { files: 0 });
                }

                let build = &component.data().build;
                let datatype = build.datatype.as_deref().ok_or_else(|| {
                    ValidationError::MissingData {
                        path: "data.build.datatype".to_string(),
                    }
                })?;
                let db_path = build.path.as_deref().ok_or_else(|| ValidationError::MissingData {
                    path: "data.build.path".to_string(),
                })?;
                let mut db = database_from_name(datatype)?;
                db.set_path(&workdir.join(db_path));

                let synced = component.sync_output_files(db.as_mut(), &input)?;
                Ok(StepStatus::Synced {
                    files: synced.len(),
                })
            },
        )?;

        emit(
            &mut progress,
            WorkflowEvent::stage(Mode::Sync, WorkflowStage::Completed, None),
        );
        Ok(WorkflowSummary {
            document: input,
            steps: outcomes,
            available: Vec::new(),
        })
    }

    fn base_env(&self, mode: Mode, input: &Path) -> StepEnvironment {
        let mut env = StepEnvironment::new();
        env.set(MYNA_INPUT, path_string(input))
            .set(mode.input_var(), path_string(input));
        self.install.export(&mut env);
        env
    }
}

pub(crate) fn absolute(path: &Path) -> WorkflowResult<PathBuf> {
    std::path::absolute(path).map_err(|source| WorkflowError::Path {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn parent_dir(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}

/// Load `myna.workspace`, relative to the settings file's directory.
pub(crate) fn load_workspace(myna: &MynaView, workdir: &Path) -> WorkflowResult<Option<Workspace>> {
    match myna.workspace.as_deref().filter(|w| !w.is_empty()) {
        Some(path) => Ok(Some(Workspace::load(&workdir.join(path))?)),
        None => Ok(None),
    }
}

/// Bind the step's settings from the current document.
pub(crate) fn apply_settings(
    component: &mut Component,
    entry: &StepEntry,
    doc: &Value,
    workdir: &Path,
    require_data: Option<&MetadataRegistry>,
) -> WorkflowResult<()> {
    let myna = MynaView::from_document(doc)?;
    let workspace = load_workspace(&myna, workdir)?;
    let empty = Value::Mapping(Default::default());
    let ctx = StepContext {
        data: doc.get("data").unwrap_or(&empty),
        myna: &myna,
        workspace: workspace.as_ref(),
        workdir,
        require_data,
    };
    component.apply_settings(entry, &ctx)?;
    Ok(())
}

/// Walk the steps of the document at `doc_path` in order.
///
/// The step list is taken from the document as it is at the start; the
/// document itself is re-read before every step so that changes written by
/// earlier steps are seen by later ones. `config` writes the document back
/// after every step.
#[allow(clippy::too_many_arguments)]
pub(crate) fn for_each_step<F>(
    components: &ComponentRegistry,
    counter: &mut StepCounter,
    mode: Mode,
    doc_path: &Path,
    base_env: &StepEnvironment,
    filter: Option<&[String]>,
    progress: &mut ProgressCallback<'_>,
    mut visit: F,
) -> WorkflowResult<Vec<StepOutcome>>
where
    F: FnMut(StepVisit<'_>) -> WorkflowResult<StepStatus>,
{
    let initial = step_entries(&load_input(doc_path)?)?;
    let mut outcomes = Vec::with_capacity(initial.len());
    let mut last: Option<(String, String)> = None;

    for planned in initial {
        let mut doc = load_input(doc_path)?;
        let entry = step_entries(&doc)?
            .into_iter()
            .find(|e| e.index == planned.index && e.name == planned.name)
            .unwrap_or(planned);
        let name = entry.name.clone();
        let class = entry
            .class()
            .ok_or_else(|| ValidationError::MissingFields {
                step: name.clone(),
                fields: vec!["class".to_string()],
            })?
            .to_string();

        let mut component = components.create(&class, counter)?;
        component.set_name(&name);

        let mut env = base_env.clone();
        let (last_name, last_class) = last.take().unwrap_or_default();
        env.set(MYNA_LAST_STEP_NAME, last_name)
            .set(MYNA_LAST_STEP_CLASS, last_class)
            .set(MYNA_STEP_NAME, name.as_str())
            .set(MYNA_STEP_CLASS, class.as_str())
            .set(MYNA_STEP_INDEX, entry.index.to_string());
        last = Some((name.clone(), class.clone()));

        let selected = filter.is_none_or(|steps| steps.iter().any(|s| *s == name));
        if !selected {
            tracing::info!(step = %name, "Skipping step {name}: not in the selected steps");
            emit(
                progress,
                WorkflowEvent::step(mode, WorkflowStage::StepSkipped, entry.index, &name),
            );
            outcomes.push(StepOutcome {
                index: entry.index,
                name,
                class,
                status: StepStatus::Skipped,
            });
            continue;
        }

        tracing::info!(step = %name, class = %class, id = %component.id(), "{mode} step");
        emit(
            progress,
            WorkflowEvent::step(mode, WorkflowStage::StepStarted, entry.index, &name),
        );

        let index = entry.index;
        let status = visit(StepVisit {
            entry,
            doc: &mut doc,
            component,
            env: &env,
        })?;
        if mode == Mode::Config {
            write_input(&doc, doc_path)?;
        }

        emit(
            progress,
            WorkflowEvent::step(mode, WorkflowStage::StepFinished, index, &name),
        );
        outcomes.push(StepOutcome {
            index,
            name,
            class,
            status,
        });
    }
    Ok(outcomes)
}

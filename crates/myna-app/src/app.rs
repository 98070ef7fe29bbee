//! The context an interface program runs in.

use std::path::{Path, PathBuf};
use std::process::{Child, Command};

use myna_core::CoreError;
use myna_core::env::{
    MYNA_APP_PATH, MYNA_INPUT, MYNA_INTERFACE_PATH, MYNA_LAST_STEP_NAME, MYNA_STEP_INDEX,
    MYNA_STEP_NAME,
};
use myna_settings::load_input;
use serde_yaml::Value;
use tracing::{info, warn};

use crate::args::AppArgs;
use crate::error::{AppError, AppResult};
use crate::exec::{find_executable, has_exec_permission, is_executable};

/// File written by `myna config` into every case directory.
const CASE_DATA_FILE: &str = "myna_data.yaml";

/// Values the workflow engine hands to a step's child processes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppContext {
    pub input_file: PathBuf,
    pub app_path: PathBuf,
    pub step_name: String,
    pub last_step_name: String,
    pub step_index: Option<usize>,
}

impl AppContext {
    pub fn from_env() -> AppResult<Self> {
        let input_file = std::env::var_os(MYNA_INPUT)
            .map(PathBuf::from)
            .ok_or(CoreError::MissingEnv { name: MYNA_INPUT })?;
        let app_path = std::env::var_os(MYNA_APP_PATH)
            .or_else(|| std::env::var_os(MYNA_INTERFACE_PATH))
            .map(PathBuf::from)
            .ok_or(CoreError::MissingEnv {
                name: MYNA_APP_PATH,
            })?;
        Ok(Self {
            input_file,
            app_path,
            step_name: std::env::var(MYNA_STEP_NAME).unwrap_or_default(),
            last_step_name: std::env::var(MYNA_LAST_STEP_NAME).unwrap_or_default(),
            step_index: std::env::var(MYNA_STEP_INDEX)
                .ok()
                .and_then(|v| v.parse().ok()),
        })
    }
}

/// Base behavior for interface programs.
#[derive(Debug, Clone)]
pub struct MynaApp {
    pub name: String,
    pub context: AppContext,
    pub settings: Value,
    pub args: AppArgs,
}

impl MynaApp {
    /// Build from the process environment and command line.
    pub fn from_env(name: impl Into<String>) -> AppResult<Self> {
        let args = AppArgs::parse_known(std::env::args_os())?;
        Self::new(name, AppContext::from_env()?, args)
    }

    /// Load the settings named by `context` and normalize `args`.
    pub fn new(name: impl Into<String>, context: AppContext, mut args: AppArgs) -> AppResult<Self> {
        let name = name.into();
        let settings = load_input(&context.input_file)?;
        args.normalize(&name, available_procs());
        Ok(Self {
            name,
            context,
            settings,
            args,
        })
    }

    /// True when `--skip` was given; the caller should exit without work.
    pub fn should_skip(&self) -> bool {
        if self.args.skip {
            info!(app = %self.name, "Skipping part of step");
        }
        self.args.skip
    }

    /// The executable from `--exec`, or `default`.
    pub fn executable<'a>(&'a self, default: &'a str) -> &'a str {
        self.args.exec.as_deref().unwrap_or(default)
    }

    /// Check the executable resolves. With `--env` a missing executable
    /// is accepted, since the sourced file may put it on `PATH`.
    pub fn validate_executable(&self, default: &str) -> AppResult<()> {
        let exe = self.executable(default);
        if is_executable(exe) || is_executable(&format!("{exe}.exe")) {
            return Ok(());
        }
        if self.args.env.is_some() {
            warn!(
                app = %self.name,
                exe,
                "Executable was not found, but `env` is set; assuming the environment provides it"
            );
            return Ok(());
        }
        match find_executable(exe) {
            Some(path) if !has_exec_permission(&path) => Err(AppError::NotExecutable {
                app: self.name.clone(),
                path,
            }),
            _ => Err(AppError::ExecutableNotFound {
                app: self.name.clone(),
                exe: exe.to_string(),
            }),
        }
    }

    /// Default the template to `<app_path>/<parts...>/template`; an explicit
    /// `--template` is made absolute.
    pub fn set_template_path(&mut self, parts: &[&str]) -> AppResult<PathBuf> {
        let template = match &self.args.template {
            Some(given) => std::path::absolute(given).map_err(|source| AppError::Path {
                path: PathBuf::from(given),
                source,
            })?,
            None => {
                let mut path = self.context.app_path.clone();
                path.extend(parts);
                path.join("template")
            }
        };
        self.args.template = Some(template.to_string_lossy().to_string());
        Ok(template)
    }

    pub fn template(&self) -> Option<&Path> {
        self.args.template.as_deref().map(Path::new)
    }

    /// Copy the template into `case_dir`.
    ///
    /// A case holding nothing but its case data file is filled in; an
    /// existing case is only overwritten with `--overwrite`. Returns whether
    /// anything was copied.
    pub fn copy(&self, case_dir: &Path) -> AppResult<bool> {
        let Some(template) = self.template() else {
            return Ok(false);
        };
        let populated = match std::fs::read_dir(case_dir) {
            Ok(entries) => entries
                .filter_map(Result::ok)
                .any(|e| e.file_name() != CASE_DATA_FILE),
            Err(_) => false,
        };
        if populated && !self.args.overwrite {
            warn!(case = %case_dir.display(), "Not overwriting existing case");
            return Ok(false);
        }
        copy_tree(template, case_dir)?;
        Ok(true)
    }

    /// A command for `argv`. With `--env` the file is sourced by `sh` first.
    pub fn command(&self, argv: &[String]) -> AppResult<Command> {
        let (program, rest) = argv.split_first().ok_or_else(|| AppError::EmptyCommand {
            app: self.name.clone(),
        })?;
        let command = match &self.args.env {
            Some(env) => {
                let mut command = Command::new("sh");
                command.arg("-c").arg(format!(". {env}; {}", argv.join(" ")));
                command
            }
            None => {
                let mut command = Command::new(program);
                command.args(rest);
                command
            }
        };
        Ok(command)
    }

    /// `argv` behind `<mpiexec> -n <np> [mpiflags...]` when `--mpiexec` is set.
    pub fn mpi_argv(&self, argv: &[String]) -> Vec<String> {
        let mut full = Vec::with_capacity(argv.len() + 4);
        if let Some(mpiexec) = &self.args.mpiexec {
            full.extend([mpiexec.clone(), "-n".to_string(), self.args.np.to_string()]);
            if let Some(flags) = &self.args.mpiflags {
                full.extend(flags.split_whitespace().map(str::to_string));
            }
        }
        full.extend(argv.iter().cloned());
        full
    }

    /// Spawn `argv`. `setup` can set the working directory or redirect output.
    pub fn start_subprocess<F>(&self, argv: &[String], setup: F) -> AppResult<Child>
    where
        F: FnOnce(&mut Command),
    {
        let mut command = self.command(argv)?;
        setup(&mut command);
        let child = command.spawn().map_err(|source| AppError::Spawn {
            program: argv.join(" "),
            source,
        })?;
        info!(app = %self.name, pid = child.id(), command = %argv.join(" "), "Started");
        Ok(child)
    }

    pub fn start_subprocess_with_mpi<F>(&self, argv: &[String], setup: F) -> AppResult<Child>
    where
        F: FnOnce(&mut Command),
    {
        self.start_subprocess(&self.mpi_argv(argv), setup)
    }

    /// Expected output paths for the current step, as recorded by `myna config`.
    pub fn output_paths(&self) -> Vec<PathBuf> {
        myna_core::document::nested_get(
            &self.settings,
            &["data", "output_paths", self.context.step_name.as_str()],
        )
        .and_then(Value::as_sequence)
        .map(|paths| {
            paths
                .iter()
                .filter_map(Value::as_str)
                .map(PathBuf::from)
                .collect()
        })
        .unwrap_or_default()
    }
}

/// Wait for `child` and turn a non-zero exit into an error.
pub fn wait_for_success(mut child: Child) -> AppResult<()> {
    let pid = child.id();
    let status = child.wait().map_err(|source| AppError::Wait { pid, source })?;
    if status.success() {
        Ok(())
    } else {
        Err(AppError::ProcessFailed { pid, status })
    }
}

fn available_procs() -> usize {
    std::thread::available_parallelism().map_or(1, |n| n.get())
}

fn copy_error(path: &Path) -> impl FnOnce(std::io::Error) -> AppError + use<> {
    let path = path.to_path_buf();
    move |source| AppError::Copy { path, source }
}

fn copy_tree(from: &Path, to: &Path) -> AppResult<()> {
    std::fs::create_dir_all(to).map_err(copy_error(to))?;
    for entry in std::fs::read_dir(from).map_err(copy_error(from))? {
        let entry = entry.map_err(copy_error(from))?;
        let source = entry.path();
        let target = to.join(entry.file_name());
        if entry.file_type().map_err(copy_error(&source))?.is_dir() {
            copy_tree(&source, &target)?;
        } else {
            std::fs::copy(&source, &target).map_err(copy_error(&target))?;
        }
    }
    Ok(())
}

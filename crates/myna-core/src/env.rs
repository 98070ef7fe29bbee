//! Environment variables exchanged between the engine and step processes.
//!
//! The engine never mutates its own environment. Each step gets a
//! [`StepEnvironment`] that is applied to every child it launches, and
//! interface programs read the same names back with [`std::env::var`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{CoreError, CoreResult};

pub const MYNA_INPUT: &str = "MYNA_INPUT";
pub const MYNA_RUN_INPUT: &str = "MYNA_RUN_INPUT";
pub const MYNA_CONFIG_INPUT: &str = "MYNA_CONFIG_INPUT";
pub const MYNA_SYNC_INPUT: &str = "MYNA_SYNC_INPUT";
pub const MYNA_STEP_NAME: &str = "MYNA_STEP_NAME";
pub const MYNA_STEP_CLASS: &str = "MYNA_STEP_CLASS";
pub const MYNA_STEP_INDEX: &str = "MYNA_STEP_INDEX";
pub const MYNA_LAST_STEP_NAME: &str = "MYNA_LAST_STEP_NAME";
pub const MYNA_LAST_STEP_CLASS: &str = "MYNA_LAST_STEP_CLASS";
pub const MYNA_INSTALL_PATH: &str = "MYNA_INSTALL_PATH";
pub const MYNA_APP_PATH: &str = "MYNA_APP_PATH";
pub const MYNA_INTERFACE_PATH: &str = "MYNA_INTERFACE_PATH";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepEnvironment {
    vars: BTreeMap<String, String>,
}

impl StepEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Export every variable to a child process.
    pub fn apply(&self, command: &mut Command) {
        command.envs(&self.vars);
    }
}

/// Locations of the Myna installation and its application scripts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPaths {
    pub install: PathBuf,
    pub app: PathBuf,
}

impl InstallPaths {
    pub fn new(install: impl Into<PathBuf>, app: impl Into<PathBuf>) -> Self {
        Self {
            install: install.into(),
            app: app.into(),
        }
    }

    /// Resolve from `MYNA_INSTALL_PATH` and `MYNA_APP_PATH`.
    ///
    /// `MYNA_INTERFACE_PATH` is accepted in place of `MYNA_APP_PATH`; when
    /// neither is set the app path defaults to `<install>/interfaces`.
    pub fn from_env() -> CoreResult<Self> {
        let install = std::env::var_os(MYNA_INSTALL_PATH)
            .map(PathBuf::from)
            .ok_or(CoreError::MissingEnv {
                name: MYNA_INSTALL_PATH,
            })?;
        let app = std::env::var_os(MYNA_APP_PATH)
            .or_else(|| std::env::var_os(MYNA_INTERFACE_PATH))
            .map(PathBuf::from)
            .unwrap_or_else(|| install.join("interfaces"));
        Ok(Self { install, app })
    }

    /// Export both locations under every name interface programs look for.
    pub fn export(&self, env: &mut StepEnvironment) {
        env.set(MYNA_INSTALL_PATH, path_string(&self.install));
        env.set(MYNA_APP_PATH, path_string(&self.app));
        env.set(MYNA_INTERFACE_PATH, path_string(&self.app));
    }
}

pub fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

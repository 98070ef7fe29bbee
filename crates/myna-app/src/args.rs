//! Command line contract shared by every interface program.
//!
//! Programs with extra options flatten [`AppArgs`] into their own parser
//! with `#[command(flatten)]`.

use std::ffi::OsString;

use clap::{CommandFactory, FromArgMatches, Parser};
use tracing::warn;

use crate::error::AppResult;

#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(about = "Configure and run an external application for Myna cases")]
pub struct AppArgs {
    /// Path to the case template; defaults to the application's template directory
    #[arg(long)]
    pub template: Option<String>,

    /// Regenerate each case and overwrite existing data
    #[arg(long)]
    pub overwrite: bool,

    /// Path to the application executable
    #[arg(long = "exec")]
    pub exec: Option<String>,

    /// Processors per job, capped at the available processors
    #[arg(long, default_value_t = 1)]
    pub np: usize,

    /// Maximum processors for the whole batch, defaults to the available processors
    #[arg(long)]
    pub maxproc: Option<usize>,

    /// Run jobs in parallel
    #[arg(long)]
    pub batch: bool,

    /// Skip this stage of the component
    #[arg(long)]
    pub skip: bool,

    /// MPI launcher to prepend, used with --mpiflags
    #[arg(long)]
    pub mpiexec: Option<String>,

    /// Flags appended after the MPI launcher
    #[arg(long, allow_hyphen_values = true)]
    pub mpiflags: Option<String>,

    /// File sourced to set up the environment for the executable
    #[arg(long)]
    pub env: Option<String>,

    /// Deprecated: full MPI command without the processor count, e.g. "mpirun --exclusive"
    #[arg(long, allow_hyphen_values = true)]
    pub mpiargs: Option<String>,
}

impl AppArgs {
    /// Parse the known options and ignore anything else on the line.
    pub fn parse_known<I, T>(argv: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = Self::command().ignore_errors(true).try_get_matches_from(argv)?;
        Ok(Self::from_arg_matches(&matches)?)
    }

    /// Apply the processor limits and migrate the deprecated MPI option.
    pub fn normalize(&mut self, app: &str, available: usize) {
        self.convert_mpiargs(app);
        self.set_procs(available);
    }

    /// `np` becomes `min(available, np, maxproc)`; an unset `maxproc`
    /// becomes `available`.
    pub fn set_procs(&mut self, available: usize) {
        let available = available.max(1);
        let maxproc = self.maxproc.unwrap_or(available).max(1);
        self.maxproc = Some(maxproc);
        self.np = self.np.min(available).min(maxproc).max(1);
    }

    pub fn maxproc(&self) -> usize {
        self.maxproc.unwrap_or(self.np)
    }

    /// Split `--mpiargs` into `--mpiexec`, `--np` and `--mpiflags`.
    pub fn convert_mpiargs(&mut self, app: &str) {
        let Some(mpiargs) = self.mpiargs.take() else {
            return;
        };
        let mut tokens: Vec<String> = mpiargs.split_whitespace().map(str::to_string).collect();
        if tokens.is_empty() {
            return;
        }
        let launcher = tokens.remove(0).replace(['"', '\''], "");

        for flag in ["-n", "--n", "-np", "--np"] {
            let Some(pos) = tokens.iter().position(|t| t == flag) else {
                continue;
            };
            if let Some(np) = tokens.get(pos + 1).and_then(|v| v.parse().ok()) {
                self.np = np;
                tokens.drain(pos..pos + 2);
            } else {
                tokens.remove(pos);
            }
        }

        self.mpiexec = Some(launcher);
        self.mpiflags = (!tokens.is_empty()).then(|| tokens.join(" "));
        warn!(
            app,
            mpiexec = ?self.mpiexec,
            np = self.np,
            mpiflags = ?self.mpiflags,
            "Deprecated `mpiargs` was converted to `mpiexec`, `np` and `mpiflags`"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> AppArgs {
        let argv = std::iter::once("app").chain(args.iter().copied());
        AppArgs::parse_known(argv).unwrap()
    }

    #[test]
    fn defaults() {
        let args = parse(&[]);
        assert_eq!(args.np, 1);
        assert!(!args.batch);
        assert!(args.exec.is_none());
    }

    #[test]
    fn np_is_capped() {
        let mut args = parse(&["--np", "16", "--maxproc", "8"]);
        args.set_procs(4);
        assert_eq!(args.np, 4);
        assert_eq!(args.maxproc(), 8);

        let mut args = parse(&["--np", "16"]);
        args.set_procs(12);
        assert_eq!(args.np, 12);
        assert_eq!(args.maxproc(), 12);
    }

    #[test]
    fn mpiargs_are_split() {
        let mut args = parse(&["--mpiargs", "'mpirun' --exclusive -np 6"]);
        args.convert_mpiargs("exaca");
        assert_eq!(args.mpiexec.as_deref(), Some("mpirun"));
        assert_eq!(args.np, 6);
        assert_eq!(args.mpiflags.as_deref(), Some("--exclusive"));
        assert!(args.mpiargs.is_none());
    }
}

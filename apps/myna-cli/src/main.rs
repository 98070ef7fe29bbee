use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use myna_core::{InstallPaths, str_to_list};
use myna_workflow::{
    ConfigOptions, StepStatus, Workflow, WorkflowEvent, WorkflowStage, WorkflowSummary,
    status_markdown,
};
use tracing_subscriber::EnvFilter;

type CliResult<T> = Result<T, Box<dyn Error>>;

#[derive(Parser)]
#[command(name = "myna")]
#[command(about = "Myna - additive manufacturing simulation workflow", long_about = None)]
struct Cli {
    #[command(flatten)]
    install: InstallArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct InstallArgs {
    /// Myna installation directory (defaults to $MYNA_INSTALL_PATH)
    #[arg(long, global = true)]
    install_path: Option<PathBuf>,
    /// Directory of application interface scripts (defaults to $MYNA_APP_PATH)
    #[arg(long, global = true)]
    app_path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve data requirements and lay out case directories
    Config {
        /// Settings file (.yaml or .json)
        #[arg(long)]
        input: PathBuf,
        /// Write the configured settings here instead of over the input
        #[arg(long)]
        output: Option<PathBuf>,
        /// List the files available in the build database and exit
        #[arg(long)]
        avail: bool,
        /// Re-copy cached resource files
        #[arg(long)]
        overwrite: bool,
    },
    /// Run every step's configure, execute and postprocess commands
    Run {
        /// Settings file (.yaml or .json)
        #[arg(long)]
        input: PathBuf,
        /// Only run these steps, e.g. `thermal` or `[thermal,rve]`
        #[arg(long)]
        step: Option<String>,
    },
    /// Push step outputs back to the build database
    Sync {
        /// Settings file (.yaml or .json)
        #[arg(long)]
        input: PathBuf,
        /// Only sync these steps
        #[arg(long)]
        step: Option<String>,
    },
    /// Write a markdown overview of components, file types and metadata
    Status {
        #[arg(long, default_value = "status.md")]
        output: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match dispatch(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            let mut source = err.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

fn dispatch(cli: Cli) -> CliResult<()> {
    match cli.command {
        Commands::Config {
            input,
            output,
            avail,
            overwrite,
        } => {
            let options = ConfigOptions {
                output,
                avail,
                overwrite,
            };
            cmd_config(&cli.install, &input, &options)
        }
        Commands::Run { input, step } => cmd_run(&cli.install, &input, step.as_deref()),
        Commands::Sync { input, step } => cmd_sync(&cli.install, &input, step.as_deref()),
        Commands::Status { output } => cmd_status(&cli.install, &output),
    }
}

fn install_paths(args: &InstallArgs) -> CliResult<InstallPaths> {
    let paths = resolve_install_paths(args)?;
    tracing::debug!(
        install = %paths.install.display(),
        app = %paths.app.display(),
        "Install paths"
    );
    Ok(paths)
}

fn resolve_install_paths(args: &InstallArgs) -> CliResult<InstallPaths> {
    if let Some(install) = &args.install_path {
        let app = args
            .app_path
            .clone()
            .unwrap_or_else(|| install.join("interfaces"));
        return Ok(InstallPaths::new(install, app));
    }
    match InstallPaths::from_env() {
        Ok(mut paths) => {
            if let Some(app) = &args.app_path {
                paths.app = app.clone();
            }
            Ok(paths)
        }
        Err(_) => {
            // Fall back to the directory holding the binary.
            let exe = std::env::current_exe()?;
            let install = exe.parent().map(Path::to_path_buf).unwrap_or_default();
            let app = args
                .app_path
                .clone()
                .unwrap_or_else(|| install.join("interfaces"));
            Ok(InstallPaths::new(install, app))
        }
    }
}

fn render_progress(event: WorkflowEvent) {
    let name = event.step_name.as_deref().unwrap_or_default();
    match event.stage {
        WorkflowStage::StepStarted => {
            let index = event.step_index.unwrap_or_default();
            println!("[{}] step {index}: {name}", event.mode);
        }
        WorkflowStage::StepSkipped => println!("[{}] skipped {name}", event.mode),
        WorkflowStage::Completed => println!("[{}] done", event.mode),
        WorkflowStage::LoadingSettings | WorkflowStage::StepFinished => {}
    }
}

fn print_summary(summary: &WorkflowSummary) {
    for step in &summary.steps {
        let status = match &step.status {
            StepStatus::Skipped => "skipped".to_string(),
            StepStatus::Configured { outputs } => format!("configured, {outputs} expected outputs"),
            StepStatus::Ran {
                executed: true,
                outputs,
            } => format!("ran, {outputs} valid outputs"),
            StepStatus::Ran {
                executed: false,
                outputs,
            } => format!("nothing to execute, {outputs} expected outputs"),
            StepStatus::Synced { files } => format!("synced {files} files"),
        };
        println!("  {} ({}): {status}", step.name, step.class);
    }
}

fn cmd_config(install: &InstallArgs, input: &Path, options: &ConfigOptions) -> CliResult<()> {
    let mut workflow = Workflow::new(install_paths(install)?);
    let summary = workflow.config(input, options, Some(&mut render_progress))?;

    if options.avail {
        println!("Available files in the build database:");
        for file in &summary.available {
            println!("  {}", file.display());
        }
        return Ok(());
    }
    print_summary(&summary);
    println!("✓ Configured {}", summary.document.display());
    Ok(())
}

fn cmd_run(install: &InstallArgs, input: &Path, step: Option<&str>) -> CliResult<()> {
    let steps = str_to_list(step);
    let mut workflow = Workflow::new(install_paths(install)?);
    let summary = workflow.run(input, steps.as_deref(), Some(&mut render_progress))?;
    print_summary(&summary);
    Ok(())
}

fn cmd_sync(install: &InstallArgs, input: &Path, step: Option<&str>) -> CliResult<()> {
    let steps = str_to_list(step);
    let mut workflow = Workflow::new(install_paths(install)?);
    let summary = workflow.sync(input, steps.as_deref(), Some(&mut render_progress))?;
    print_summary(&summary);
    Ok(())
}

fn cmd_status(install: &InstallArgs, output: &Path) -> CliResult<()> {
    let workflow = Workflow::new(install_paths(install)?);
    let markdown = status_markdown(workflow.components(), workflow.metadata());
    std::fs::write(output, markdown)?;
    println!("✓ Wrote {}", output.display());
    Ok(())
}

use std::path::{Path, PathBuf};

use myna_app::{AppArgs, AppContext, AppError, MynaApp};
use tempfile::TempDir;

const SETTINGS: &str = r#"
steps:
  - thermal:
      class: solidification_part
      application: 3dthesis
data:
  output_paths:
    thermal:
      - B/P1/1/thermal/out.csv
      - B/P1/2/thermal/out.csv
myna: {}
"#;

fn context(dir: &Path) -> AppContext {
    let input_file = dir.join("input.yaml");
    std::fs::write(&input_file, SETTINGS).unwrap();
    AppContext {
        input_file,
        app_path: dir.join("interfaces"),
        step_name: "thermal".into(),
        last_step_name: String::new(),
        step_index: Some(0),
    }
}

fn app(dir: &Path, args: &[&str]) -> MynaApp {
    let argv = std::iter::once("configure").chain(args.iter().copied());
    let args = AppArgs::parse_known(argv).unwrap();
    MynaApp::new("3dthesis", context(dir), args).unwrap()
}

fn template(dir: &TempDir) -> PathBuf {
    let template = dir.path().join("interfaces/3dthesis/solidification_part/template");
    std::fs::create_dir_all(template.join("Data")).unwrap();
    std::fs::write(template.join("Mode.txt"), "mode").unwrap();
    std::fs::write(template.join("Data/readme"), "data").unwrap();
    template
}

#[test]
fn loads_settings_and_output_paths() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path(), &["--np", "1"]);
    assert_eq!(app.output_paths().len(), 2);
    assert_eq!(app.args.np, 1);
    assert!(app.args.maxproc() >= 1);
    assert!(!app.should_skip());
}

#[test]
fn template_defaults_under_app_path() {
    let dir = tempfile::tempdir().unwrap();
    let expected = template(&dir);
    let mut app = app(dir.path(), &[]);
    let path = app.set_template_path(&["3dthesis", "solidification_part"]).unwrap();
    assert_eq!(path, expected);
}

#[test]
fn copy_fills_new_cases_and_keeps_existing_ones() {
    let dir = tempfile::tempdir().unwrap();
    template(&dir);
    let mut app = app(dir.path(), &[]);
    app.set_template_path(&["3dthesis", "solidification_part"]).unwrap();

    let case = dir.path().join("B/P1/1/thermal");
    std::fs::create_dir_all(&case).unwrap();
    std::fs::write(case.join("myna_data.yaml"), "build: {}").unwrap();
    assert!(app.copy(&case).unwrap());
    assert_eq!(std::fs::read_to_string(case.join("Data/readme")).unwrap(), "data");

    std::fs::write(case.join("Mode.txt"), "edited").unwrap();
    assert!(!app.copy(&case).unwrap());
    assert_eq!(std::fs::read_to_string(case.join("Mode.txt")).unwrap(), "edited");

    app.args.overwrite = true;
    assert!(app.copy(&case).unwrap());
    assert_eq!(std::fs::read_to_string(case.join("Mode.txt")).unwrap(), "mode");
}

#[test]
fn missing_executable_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path(), &["--exec", "no-such-myna-solver"]);
    let err = app.validate_executable("3DThesis").unwrap_err();
    assert!(matches!(err, AppError::ExecutableNotFound { .. }));
    assert!(err.to_string().contains("no-such-myna-solver"));

    let app_with_env = self::app(
        dir.path(),
        &["--exec", "no-such-myna-solver", "--env", "setup.sh"],
    );
    app_with_env.validate_executable("3DThesis").unwrap();
}

#[test]
fn mpi_launcher_is_prepended() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path(), &["--mpiexec", "mpirun", "--mpiflags", "--bind-to core"]);
    let argv = app.mpi_argv(&["ExaCA".to_string(), "input.json".to_string()]);
    let np = app.args.np.to_string();
    assert_eq!(
        argv,
        vec!["mpirun", "-n", np.as_str(), "--bind-to", "core", "ExaCA", "input.json"]
    );

    let plain = self::app(dir.path(), &[]);
    assert_eq!(plain.mpi_argv(&["ExaCA".to_string()]), vec!["ExaCA"]);
}

#[cfg(unix)]
#[test]
fn subprocess_runs_in_requested_directory() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path(), &[]);
    let argv: Vec<String> = ["sh", "-c", "pwd > where.txt"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let child = app
        .start_subprocess(&argv, |cmd| {
            cmd.current_dir(dir.path());
        })
        .unwrap();
    myna_app::wait_for_success(child).unwrap();
    assert!(dir.path().join("where.txt").is_file());

    assert!(matches!(
        app.start_subprocess(&[], |_| {}),
        Err(AppError::EmptyCommand { .. })
    ));
}

#[cfg(unix)]
#[test]
fn env_file_is_sourced_before_the_command() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("env.sh"), "export MYNA_TEST_GREETING=hello\n").unwrap();
    let app = app(dir.path(), &["--env", "./env.sh"]);
    let argv: Vec<String> = ["printf", "$MYNA_TEST_GREETING", ">", "greeting.txt"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let child = app
        .start_subprocess(&argv, |cmd| {
            cmd.current_dir(dir.path());
        })
        .unwrap();
    myna_app::wait_for_success(child).unwrap();
    let greeting = std::fs::read_to_string(dir.path().join("greeting.txt")).unwrap();
    assert_eq!(greeting, "hello");
}

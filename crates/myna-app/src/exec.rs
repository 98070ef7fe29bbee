//! Executable lookup on `PATH`.

use std::path::{Path, PathBuf};

/// Resolve `program` the way a shell would: paths with a separator are
/// used as given, bare names are searched on `PATH`. Only existence is
/// checked.
pub fn find_executable(program: &str) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(program))
        .find(|p| p.is_file())
}

/// True when `program` resolves and has execute permission.
pub fn is_executable(program: &str) -> bool {
    find_executable(program).is_some_and(|p| has_exec_permission(&p))
}

#[cfg(unix)]
pub(crate) fn has_exec_permission(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path).is_ok_and(|m| m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
pub(crate) fn has_exec_permission(path: &Path) -> bool {
    path.is_file()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn finds_shell_on_path() {
        assert!(is_executable("sh"));
        assert!(!is_executable("definitely-not-a-myna-program"));
    }

    #[test]
    fn explicit_path_needs_permission() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("tool");
        std::fs::write(&script, "#!/bin/sh\n").unwrap();
        let name = script.to_string_lossy().to_string();
        assert!(find_executable(&name).is_some());
        assert!(!is_executable(&name));
    }
}

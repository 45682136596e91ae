//! Session-wide shell state and executable resolution.

use std::env;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};

use users::os::unix::UserExt;

use super::history::History;

const DEFAULT_HISTFILE: &str = "./log/history.txt";

pub struct ShellState {
    pub history: History,
    pub histfile: PathBuf,
    pub home: String,
    pub last_status: i32,
}

impl ShellState {
    pub fn new() -> ShellState {
        let histfile = env::var_os("HISTFILE")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_HISTFILE));
        ShellState {
            history: History::load(&histfile),
            histfile,
            home: home_dir(),
            last_status: 0,
        }
    }
}

/// `$HOME`, falling back to the password database.
fn home_dir() -> String {
    if let Some(home) = env::var_os("HOME") {
        if !home.is_empty() {
            return home.to_string_lossy().into_owned();
        }
    }
    users::get_user_by_uid(users::get_current_uid())
        .map(|user| user.home_dir().to_string_lossy().into_owned())
        .unwrap_or_else(|| String::from("/"))
}

/// `$PATH` when set and nonempty; `None` disables external resolution.
pub fn path_var() -> Option<OsString> {
    env::var_os("PATH").filter(|p| !p.is_empty())
}

/// Resolve `name` against the live `$PATH`.
pub fn search_path(name: &str) -> Option<PathBuf> {
    search_dirs(name, &path_var()?)
}

/// Resolve `name` against an explicit search path value.
pub fn search_dirs(name: &str, path: &OsStr) -> Option<PathBuf> {
    env::split_paths(path)
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

pub fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::tempdir;

    fn make_executable(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, "#!/bin/sh\n").unwrap();
        let mut perm = fs::metadata(&path).unwrap().permissions();
        perm.set_mode(0o755);
        fs::set_permissions(&path, perm).unwrap();
        path
    }

    #[test]
    fn finds_executables_in_path_order() {
        let first = tempdir().unwrap();
        let second = tempdir().unwrap();
        make_executable(second.path(), "tool");
        let expected = second.path().join("tool");
        let path = env::join_paths([first.path(), second.path()]).unwrap();
        assert_eq!(search_dirs("tool", &path), Some(expected));
    }

    #[test]
    fn earlier_directories_win() {
        let first = tempdir().unwrap();
        let second = tempdir().unwrap();
        let winner = make_executable(first.path(), "tool");
        make_executable(second.path(), "tool");
        let path = env::join_paths([first.path(), second.path()]).unwrap();
        assert_eq!(search_dirs("tool", &path), Some(winner));
    }

    #[test]
    fn non_executable_files_are_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data");
        fs::write(&path, "not a program").unwrap();
        let mut perm = fs::metadata(&path).unwrap().permissions();
        perm.set_mode(0o644);
        fs::set_permissions(&path, perm).unwrap();
        let search = OsString::from(dir.path());
        assert_eq!(search_dirs("data", &search), None);
    }

    #[test]
    fn directories_are_not_executables() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        let search = OsString::from(dir.path());
        assert_eq!(search_dirs("sub", &search), None);
    }
}

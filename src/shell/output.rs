//! The output engine: every piece of shell-visible text passes through
//! [`write`], which routes it to stdout, stderr, or a redirection target.
//!
//! Content is trimmed of trailing whitespace, NFC-normalized, and terminated
//! with exactly one newline when nonempty. A redirection only captures the
//! stream it names; content for the other stream goes to the terminal and
//! leaves the file alone.

use std::env;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

use unicode_normalization::UnicodeNormalization;

use super::syntax::ast::{RedirectMode, Redirection};

/// Trailing-whitespace trim, NFC, and a single trailing newline. Empty
/// content stays empty.
pub fn rendered(content: &str) -> String {
    let trimmed = content.trim_end();
    if trimmed.is_empty() {
        return String::new();
    }
    let mut text: String = trimmed.nfc().collect();
    text.push('\n');
    text
}

/// Route one chunk of output. `is_error` selects the stderr side of the
/// routing table; `redir` is the stage's redirection, if any.
pub fn write(content: &str, is_error: bool, redir: Option<&Redirection>) -> io::Result<()> {
    let text = rendered(content);
    if text.is_empty() {
        return Ok(());
    }
    match redir {
        Some(r) if captures(r, is_error) => write_target(r, &text),
        _ if is_error => {
            let mut err = io::stderr();
            err.write_all(text.as_bytes())?;
            err.flush()
        }
        _ => {
            let mut out = io::stdout();
            out.write_all(text.as_bytes())?;
            out.flush()
        }
    }
}

/// Create (and for truncate mode, empty) the redirection target before the
/// stage body runs, so `cmd 2> f` leaves an empty `f` even when nothing is
/// ever written to stderr.
pub fn prepare(redir: &Redirection) -> io::Result<()> {
    open_target(&absolute_target(&redir.target), redir.mode).map(|_| ())
}

fn captures(redir: &Redirection, is_error: bool) -> bool {
    (redir.fd == 2) == is_error
}

fn write_target(redir: &Redirection, text: &str) -> io::Result<()> {
    let path = absolute_target(&redir.target);
    let mut file = open_target(&path, redir.mode)?;
    file.write_all(text.as_bytes())
}

fn open_target(path: &Path, mode: RedirectMode) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    match mode {
        RedirectMode::Truncate => OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path),
        RedirectMode::Append => OpenOptions::new().append(true).create(true).open(path),
    }
}

fn absolute_target(target: &str) -> PathBuf {
    let path = Path::new(target);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn redir(fd: u8, mode: RedirectMode, target: &Path) -> Redirection {
        Redirection {
            fd,
            mode,
            target: target.to_string_lossy().into_owned(),
        }
    }

    #[test]
    fn rendered_trims_and_terminates() {
        assert_eq!(rendered("hello"), "hello\n");
        assert_eq!(rendered("hello \t\n\n"), "hello\n");
        assert_eq!(rendered(""), "");
        assert_eq!(rendered("  \n"), "");
        assert_eq!(rendered("a\nb"), "a\nb\n");
    }

    #[test]
    fn rendered_normalizes_to_nfc() {
        assert_eq!(rendered("e\u{0301}"), "\u{00e9}\n");
    }

    #[test]
    fn truncate_replaces_file_contents() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("out.txt");
        let r = redir(1, RedirectMode::Truncate, &target);
        write("first", false, Some(&r)).unwrap();
        write("second", false, Some(&r)).unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "second\n");
    }

    #[test]
    fn append_accumulates() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("out.txt");
        let r = redir(1, RedirectMode::Append, &target);
        write("one", false, Some(&r)).unwrap();
        write("two", false, Some(&r)).unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "one\ntwo\n");
    }

    #[test]
    fn missing_parent_directories_are_created() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("sub/deep/out.txt");
        let r = redir(1, RedirectMode::Truncate, &target);
        write("content", false, Some(&r)).unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "content\n");
    }

    #[test]
    fn stderr_redirection_ignores_stdout_content() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("err.txt");
        let r = redir(2, RedirectMode::Truncate, &target);
        prepare(&r).unwrap();
        // Stdout content goes to the terminal; the file stays empty.
        write("hi", false, Some(&r)).unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "");
        write("oops", true, Some(&r)).unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "oops\n");
    }

    #[test]
    fn prepare_truncates_existing_file() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("out.txt");
        fs::write(&target, "stale").unwrap();
        prepare(&redir(1, RedirectMode::Truncate, &target)).unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "");
    }

    #[test]
    fn prepare_for_append_keeps_existing_content() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("out.txt");
        fs::write(&target, "kept\n").unwrap();
        prepare(&redir(1, RedirectMode::Append, &target)).unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "kept\n");
    }
}

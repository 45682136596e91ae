//! Commands implemented inside the shell.
//!
//! Each built-in returns its stdout/stderr content and an exit status; the
//! caller decides where the content goes (terminal, redirection target, or
//! the next pipeline stage).

use std::env;
use std::fmt::Write as _;
use std::path::PathBuf;

use super::history::History;
use super::state::{self, ShellState};

pub const BUILTINS: [&str; 5] = ["echo", "type", "pwd", "cd", "history"];
pub const ESCAPE_WORDS: [&str; 5] = ["exit", "quit", "q", "escape", "esc"];

pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}

pub fn is_escape_word(name: &str) -> bool {
    ESCAPE_WORDS.contains(&name)
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct BuiltinOutput {
    pub out: String,
    pub err: String,
    pub status: i32,
}

impl BuiltinOutput {
    fn ok<S: Into<String>>(out: S) -> BuiltinOutput {
        BuiltinOutput {
            out: out.into(),
            err: String::new(),
            status: 0,
        }
    }

    fn fail<S: Into<String>>(err: S) -> BuiltinOutput {
        BuiltinOutput {
            out: String::new(),
            err: err.into(),
            status: 1,
        }
    }
}

pub fn run(state: &mut ShellState, name: &str, args: &[String]) -> BuiltinOutput {
    match name {
        "echo" => BuiltinOutput::ok(args.join(" ")),
        "pwd" => pwd(),
        "cd" => cd(state, args),
        "type" => type_of(args),
        "history" => history(state, args),
        _ => BuiltinOutput::fail(format!("{}: not a shell builtin", name)),
    }
}

fn pwd() -> BuiltinOutput {
    match env::current_dir() {
        Ok(cwd) => BuiltinOutput::ok(cwd.to_string_lossy().into_owned()),
        Err(e) => BuiltinOutput::fail(format!("pwd: {}", e)),
    }
}

fn cd(state: &ShellState, args: &[String]) -> BuiltinOutput {
    let target = match args.first() {
        Some(dir) => dir.clone(),
        None => state.home.clone(),
    };
    let path = PathBuf::from(&target);
    let abspath = if path.is_absolute() {
        path
    } else {
        match env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(e) => return BuiltinOutput::fail(format!("cd: {}", e)),
        }
    };
    match abspath.canonicalize().and_then(|real| env::set_current_dir(&real)) {
        Ok(()) => BuiltinOutput::ok(""),
        Err(_) => BuiltinOutput::fail(format!(
            "cd: {}: No such file or directory",
            abspath.display()
        )),
    }
}

fn type_of(args: &[String]) -> BuiltinOutput {
    let name = match args.first() {
        Some(name) if !name.is_empty() => name,
        _ => return BuiltinOutput::fail("type: please include an argument"),
    };
    if is_builtin(name) || is_escape_word(name) {
        return BuiltinOutput::ok(format!("{} is a shell builtin", name));
    }
    match state::path_var() {
        None => BuiltinOutput::ok(format!("{}: please set PATH", name)),
        Some(path) => match state::search_dirs(name, &path) {
            Some(full) => BuiltinOutput::ok(format!("{} is {}", name, full.display())),
            None => BuiltinOutput::fail(format!("{}: not found", name)),
        },
    }
}

fn history(state: &mut ShellState, args: &[String]) -> BuiltinOutput {
    match args.first().map(String::as_str) {
        None => BuiltinOutput::ok(render(&state.history, None)),
        Some(flag @ ("-r" | "-w" | "-a")) => {
            let file = match args.get(1) {
                Some(file) => PathBuf::from(file),
                None => {
                    return BuiltinOutput::fail(format!(
                        "history: {}: option requires an argument",
                        flag
                    ))
                }
            };
            let result = match flag {
                "-r" => state.history.read_from(&file).map(|_| ()),
                "-w" => state.history.write_to(&file),
                _ => state.history.append_unflushed(&file).map(|_| ()),
            };
            match result {
                Ok(()) => BuiltinOutput::ok(""),
                Err(e) => BuiltinOutput::fail(format!("history: {}: {}", file.display(), e)),
            }
        }
        Some(count) => match count.parse::<usize>() {
            Ok(n) => BuiltinOutput::ok(render(&state.history, Some(n))),
            Err(_) => {
                BuiltinOutput::fail(format!("history: {}: numeric argument required", count))
            }
        },
    }
}

fn render(history: &History, last: Option<usize>) -> String {
    let skip = last
        .map(|n| history.len().saturating_sub(n))
        .unwrap_or(0);
    let mut out = String::new();
    for (index, entry) in history.entries().iter().enumerate().skip(skip) {
        let _ = writeln!(out, "    {}  {}", index + 1, entry);
    }
    out
}

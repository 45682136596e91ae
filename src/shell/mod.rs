//! The interactive shell: startup, the prompt loop, and shutdown.

use std::env;
use std::fs;

mod builtins;
mod completion;
mod history;
mod jobs;
mod output;
mod readline;
mod state;
mod syntax;

use self::completion::Completer;
use self::readline::ReadEvent;
use self::state::ShellState;

const PROMPT: &str = "$ ";

pub struct Shell {
    state: ShellState,
    completer: Completer,
}

impl Shell {
    pub fn new() -> Self {
        let state = ShellState::new();
        let mut completer = Completer::new();
        for name in builtins::BUILTINS.iter().chain(builtins::ESCAPE_WORDS.iter()) {
            completer.insert(name);
        }
        seed_path_executables(&mut completer);
        debug!("completion trie holds {} words", completer.len());
        Shell { state, completer }
    }

    /// The prompt loop. Returns the process exit code.
    pub fn run_interactive(&mut self) -> i32 {
        loop {
            match readline::read(PROMPT, &mut self.completer, &self.state.history) {
                Ok(ReadEvent::Line(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    self.state.history.push(&line);
                    if let jobs::Outcome::Exit = self.evaluate(&line) {
                        return self.shutdown();
                    }
                }
                Ok(ReadEvent::Interrupted) => continue,
                Ok(ReadEvent::Eof) => return self.shutdown(),
                Err(e) => {
                    eprintln!("error reading input: {}", e);
                    return self.shutdown();
                }
            }
        }
    }

    fn evaluate(&mut self, line: &str) -> jobs::Outcome {
        let tokens = syntax::lexer::lex(line, &self.state.home);
        if tokens.is_empty() {
            return jobs::Outcome::Continue;
        }
        match syntax::parser::parse(&tokens) {
            Ok(pipeline) => {
                debug!("executing {:?}", pipeline);
                jobs::execute(&mut self.state, line, &pipeline)
            }
            Err(e) => {
                eprintln!("{}", e);
                self.state.last_status = 1;
                jobs::Outcome::Continue
            }
        }
    }

    /// Persist what this session added to the history, then report the exit
    /// code: 0 normally, 1 if the flush failed.
    fn shutdown(&mut self) -> i32 {
        match self.state.history.flush_session(&self.state.histfile) {
            Ok(()) => 0,
            Err(e) => {
                eprintln!(
                    "failed to write history to {}: {}",
                    self.state.histfile.display(),
                    e
                );
                1
            }
        }
    }
}

/// Seed the completion trie with every executable in every readable `PATH`
/// directory. Unreadable directories are skipped.
fn seed_path_executables(completer: &mut Completer) {
    let path = match state::path_var() {
        Some(path) => path,
        None => {
            debug!("PATH is unset or empty; completion covers builtins only");
            return;
        }
    };
    for dir in env::split_paths(&path) {
        if dir.as_os_str().is_empty() {
            continue;
        }
        match fs::read_dir(&dir) {
            Ok(entries) => {
                for entry in entries.flatten() {
                    let candidate = entry.path();
                    if state::is_executable(&candidate) {
                        if let Some(name) = candidate.file_name().and_then(|n| n.to_str()) {
                            completer.insert(name);
                        }
                    }
                }
            }
            Err(e) => debug!("skipping {}: {}", dir.display(), e),
        }
    }
}

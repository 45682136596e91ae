//! Command classification and pipeline execution.
//!
//! Every stage is treated as process-like: externals are real children with
//! piped streams, built-ins run to completion against in-memory buffers and
//! are spliced in between. Stage k's stdout (or stderr under `|&`) feeds
//! stage k+1's stdin; the first stage inherits the terminal's stdin and the
//! trailing stage's streams are routed through the output engine, which is
//! where the trailing redirection (the only one honored) applies.

use std::io::{self, Write};
use std::process::{Child, ChildStderr, ChildStdout, Command, Stdio};
use std::thread::{self, JoinHandle};

use super::builtins;
use super::output;
use super::state::{self, ShellState};
use super::syntax::ast::{CommandKind, Pipeline, Redirection, Stage};

/// What the main loop should do after a line.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    Exit,
}

/// Resolve a head token, first match wins: exit words, built-ins, `$PATH`.
pub fn classify(name: &str) -> CommandKind {
    if builtins::is_escape_word(name) {
        CommandKind::Escape
    } else if builtins::is_builtin(name) {
        CommandKind::Builtin
    } else if let Some(path) = state::search_path(name) {
        CommandKind::External(path)
    } else {
        CommandKind::Unknown
    }
}

pub fn execute(state: &mut ShellState, line: &str, pipeline: &Pipeline) -> Outcome {
    if pipeline.is_single() {
        execute_single(state, line, &pipeline.stages[0])
    } else {
        execute_pipeline(state, &pipeline.stages);
        Outcome::Continue
    }
}

fn execute_single(state: &mut ShellState, line: &str, stage: &Stage) -> Outcome {
    let head = &stage.argv[0];
    match classify(head) {
        CommandKind::Escape => return Outcome::Exit,
        CommandKind::Builtin => {
            if !prepare_redirection(stage.redirection.as_ref()) {
                state.last_status = 1;
                return Outcome::Continue;
            }
            let result = builtins::run(state, head, &stage.argv[1..]);
            let mut status = result.status;
            if !emit(&result.out, false, stage.redirection.as_ref()) {
                status = 1;
            }
            if !emit(&result.err, true, stage.redirection.as_ref()) {
                status = 1;
            }
            state.last_status = status;
        }
        CommandKind::External(path) => {
            if !prepare_redirection(stage.redirection.as_ref()) {
                state.last_status = 1;
                return Outcome::Continue;
            }
            let spawned = Command::new(&path)
                .args(&stage.argv[1..])
                .stdin(Stdio::inherit())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .spawn();
            match spawned.and_then(Child::wait_with_output) {
                Ok(done) => {
                    let mut status = done.status.code().unwrap_or(1);
                    let out = String::from_utf8_lossy(&done.stdout);
                    let err = String::from_utf8_lossy(&done.stderr);
                    if !emit(&out, false, stage.redirection.as_ref()) {
                        status = 1;
                    }
                    if !emit(&err, true, stage.redirection.as_ref()) {
                        status = 1;
                    }
                    state.last_status = status;
                }
                Err(e) => {
                    emit(
                        &format!("{}: {}", head, e),
                        true,
                        stage.redirection.as_ref(),
                    );
                    state.last_status = 1;
                }
            }
        }
        CommandKind::Unknown => {
            prepare_redirection(stage.redirection.as_ref());
            emit(
                &format!("{}: command not found", line),
                true,
                stage.redirection.as_ref(),
            );
            state.last_status = 1;
        }
    }
    Outcome::Continue
}

/// The stream carried between adjacent stages.
enum Feed {
    Inherit,
    Bytes(Vec<u8>),
    Out(ChildStdout),
    Err(ChildStderr),
}

fn execute_pipeline(state: &mut ShellState, stages: &[Stage]) {
    let last = stages.len() - 1;
    let mut feed = Feed::Inherit;
    let mut children: Vec<(usize, Child)> = Vec::new();
    let mut writers: Vec<JoinHandle<()>> = Vec::new();
    let mut statuses = vec![0i32; stages.len()];

    for (k, stage) in stages.iter().enumerate() {
        let is_last = k == last;
        if !is_last && stage.redirection.is_some() {
            debug!("ignoring redirection on non-trailing stage {}", k);
        }
        let redirection = if is_last {
            stage.redirection.as_ref()
        } else {
            None
        };
        if is_last && !prepare_redirection(redirection) {
            statuses[k] = 1;
            // The previous stage is still writing into the feed; consume it
            // to EOF so the reap loop below cannot block on a full pipe.
            drain(std::mem::replace(&mut feed, Feed::Inherit));
            break;
        }
        let next_fd = if is_last {
            1
        } else {
            stages[k + 1].pipe_source_fd
        };
        let head = &stage.argv[0];

        match classify(head) {
            CommandKind::Builtin => {
                drain(std::mem::replace(&mut feed, Feed::Inherit));
                let result = builtins::run(state, head, &stage.argv[1..]);
                statuses[k] = result.status;
                if is_last {
                    if !emit(&result.out, false, redirection) {
                        statuses[k] = 1;
                    }
                    if !emit(&result.err, true, redirection) {
                        statuses[k] = 1;
                    }
                } else if next_fd == 2 {
                    emit(&result.out, false, None);
                    feed = Feed::Bytes(output::rendered(&result.err).into_bytes());
                } else {
                    emit(&result.err, true, None);
                    feed = Feed::Bytes(output::rendered(&result.out).into_bytes());
                }
            }
            kind => {
                // Escape words are not special mid-pipeline, and unknown
                // heads get a spawn attempt so the error surfaces.
                let program = match kind {
                    CommandKind::External(path) => path,
                    _ => head.into(),
                };
                let mut cmd = Command::new(&program);
                cmd.args(&stage.argv[1..]);
                let mut pending: Option<Vec<u8>> = None;
                match std::mem::replace(&mut feed, Feed::Inherit) {
                    Feed::Inherit => {
                        cmd.stdin(Stdio::inherit());
                    }
                    Feed::Bytes(bytes) => {
                        cmd.stdin(Stdio::piped());
                        pending = Some(bytes);
                    }
                    Feed::Out(stream) => {
                        cmd.stdin(Stdio::from(stream));
                    }
                    Feed::Err(stream) => {
                        cmd.stdin(Stdio::from(stream));
                    }
                }
                if is_last {
                    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
                } else if next_fd == 2 {
                    cmd.stdout(Stdio::inherit()).stderr(Stdio::piped());
                } else {
                    cmd.stdout(Stdio::piped()).stderr(Stdio::inherit());
                }
                match cmd.spawn() {
                    Ok(mut child) => {
                        if let (Some(bytes), Some(mut stdin)) = (pending, child.stdin.take()) {
                            writers.push(thread::spawn(move || {
                                // The reader may exit early; a broken pipe
                                // is not an error here.
                                let _ = stdin.write_all(&bytes);
                            }));
                        }
                        if !is_last {
                            feed = match next_fd {
                                2 => match child.stderr.take() {
                                    Some(stream) => Feed::Err(stream),
                                    None => Feed::Bytes(Vec::new()),
                                },
                                _ => match child.stdout.take() {
                                    Some(stream) => Feed::Out(stream),
                                    None => Feed::Bytes(Vec::new()),
                                },
                            };
                        }
                        children.push((k, child));
                    }
                    Err(e) => {
                        report_spawn_error(head, &e);
                        statuses[k] = 1;
                        feed = Feed::Bytes(Vec::new());
                    }
                }
            }
        }
    }

    // Read the tail of the pipeline first so upstream stages can drain.
    let mut tail_child = None;
    let mut remaining = Vec::new();
    for (k, child) in children.drain(..) {
        if k == last {
            tail_child = Some(child);
        } else {
            remaining.push((k, child));
        }
    }
    if let Some(child) = tail_child {
        match child.wait_with_output() {
            Ok(done) => {
                let mut status = done.status.code().unwrap_or(1);
                let redirection = stages[last].redirection.as_ref();
                let out = String::from_utf8_lossy(&done.stdout);
                let err = String::from_utf8_lossy(&done.stderr);
                if !emit(&out, false, redirection) {
                    status = 1;
                }
                if !emit(&err, true, redirection) {
                    status = 1;
                }
                statuses[last] = status;
            }
            Err(e) => {
                eprintln!("{}", e);
                statuses[last] = 1;
            }
        }
    }
    for (k, mut child) in remaining {
        match child.wait() {
            Ok(status) => statuses[k] = status.code().unwrap_or(1),
            Err(e) => {
                eprintln!("{}", e);
                statuses[k] = 1;
            }
        }
    }
    for writer in writers {
        let _ = writer.join();
    }

    if let Some(failed) = statuses.iter().find(|&&code| code != 0) {
        debug!("pipeline stage failed with status {}", failed);
    }
    state.last_status = statuses[last];
}

/// Consume a leftover inter-stage stream so its producer never blocks.
fn drain(feed: Feed) {
    match feed {
        Feed::Inherit | Feed::Bytes(_) => {}
        Feed::Out(mut stream) => {
            let _ = io::copy(&mut stream, &mut io::sink());
        }
        Feed::Err(mut stream) => {
            let _ = io::copy(&mut stream, &mut io::sink());
        }
    }
}

fn report_spawn_error(name: &str, e: &io::Error) {
    if e.kind() == io::ErrorKind::NotFound {
        emit(&format!("{}: command not found", name), true, None);
    } else {
        emit(&format!("{}: {}", name, e), true, None);
    }
}

/// Route content through the output engine, surfacing write failures on
/// stderr. Returns false when the write failed.
fn emit(content: &str, is_error: bool, redir: Option<&Redirection>) -> bool {
    match output::write(content, is_error, redir) {
        Ok(()) => true,
        Err(e) => {
            eprintln!("{}", e);
            false
        }
    }
}

fn prepare_redirection(redir: Option<&Redirection>) -> bool {
    match redir {
        None => true,
        Some(r) => match output::prepare(r) {
            Ok(()) => true,
            Err(e) => {
                eprintln!("{}: {}", r.target, e);
                false
            }
        },
    }
}

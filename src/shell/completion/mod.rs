//! Tab completion over built-ins and `PATH` executables.
//!
//! Backed by a trie seeded once at startup. A tab either completes a unique
//! match, extends the line to the longest common prefix, or rings the bell;
//! a second tab on the same ambiguous line within one second lists every
//! match in columns.

mod trie;

use std::io::{self, Write};
use std::time::{Duration, Instant};

use unicode_width::UnicodeWidthStr;

pub use self::trie::Trie;

const DOUBLE_TAB_WINDOW: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Nothing starts with the line.
    NoMatch,
    /// Exactly one word matches; replace the line with it (trailing space
    /// included so typing can continue).
    Unique(String),
    /// Several words match and share a prefix longer than the line.
    Extend(String),
    /// Several words match and the line is already their common prefix;
    /// first tab.
    Ambiguous,
    /// Second tab on the same ambiguous line: show everything.
    Matches(Vec<String>),
}

pub struct Completer {
    trie: Trie,
    last_tab: Option<(String, Instant)>,
}

impl Completer {
    pub fn new() -> Completer {
        Completer {
            trie: Trie::new(),
            last_tab: None,
        }
    }

    pub fn insert(&mut self, word: &str) {
        self.trie.insert(word);
    }

    pub fn len(&self) -> usize {
        self.trie.len()
    }

    pub fn complete(&mut self, line: &str) -> Completion {
        self.complete_at(line, Instant::now())
    }

    fn complete_at(&mut self, line: &str, now: Instant) -> Completion {
        if line.is_empty() || !self.trie.has_prefix(line) {
            return Completion::NoMatch;
        }
        let matches = self.trie.words_with_prefix(line);
        if matches.len() == 1 {
            return Completion::Unique(format!("{} ", matches[0]));
        }
        let lcp = self.trie.longest_common_prefix(line);
        if lcp.chars().count() > line.chars().count() {
            return Completion::Extend(lcp);
        }
        match self.last_tab.take() {
            Some((prev, at)) if prev == line && now.duration_since(at) <= DOUBLE_TAB_WINDOW => {
                Completion::Matches(matches)
            }
            _ => {
                self.last_tab = Some((line.to_string(), now));
                Completion::Ambiguous
            }
        }
    }
}

/// Lay the matches out in rows, each column as wide as the longest match
/// plus two spaces.
pub fn column_rows(matches: &[String], terminal_width: usize) -> Vec<String> {
    let widest = matches
        .iter()
        .map(|m| UnicodeWidthStr::width(m.as_str()))
        .max()
        .unwrap_or(0);
    let column_width = widest + 2;
    let columns = (terminal_width / column_width).max(1);

    let mut rows = Vec::new();
    for chunk in matches.chunks(columns) {
        let mut row = String::new();
        for (i, m) in chunk.iter().enumerate() {
            row.push_str(m);
            if i + 1 < chunk.len() {
                for _ in UnicodeWidthStr::width(m.as_str())..column_width {
                    row.push(' ');
                }
            }
        }
        rows.push(row);
    }
    rows
}

/// Audible feedback when completion has nothing to offer. macOS plays a
/// system sound; elsewhere BEL goes to stderr.
#[cfg(target_os = "macos")]
pub fn ring_bell() {
    use std::process::{Command, Stdio};
    let spawned = Command::new("afplay")
        .arg("/System/Library/Sounds/Tink.aiff")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();
    if spawned.is_err() {
        let _ = io::stderr().write_all(b"\x07");
        let _ = io::stderr().flush();
    }
}

#[cfg(not(target_os = "macos"))]
pub fn ring_bell() {
    let _ = io::stderr().write_all(b"\x07");
    let _ = io::stderr().flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completer(words: &[&str]) -> Completer {
        let mut c = Completer::new();
        for w in words {
            c.insert(w);
        }
        c
    }

    #[test]
    fn no_match_for_unknown_prefix() {
        let mut c = completer(&["echo", "exit"]);
        assert_eq!(c.complete("z"), Completion::NoMatch);
        assert_eq!(c.complete(""), Completion::NoMatch);
    }

    #[test]
    fn unique_match_gets_trailing_space() {
        let mut c = completer(&["echo", "exit"]);
        assert_eq!(c.complete("ec"), Completion::Unique(String::from("echo ")));
    }

    #[test]
    fn shared_prefix_extends_without_space() {
        let mut c = completer(&["history", "histfile"]);
        assert_eq!(c.complete("h"), Completion::Extend(String::from("hist")));
    }

    #[test]
    fn ambiguous_line_needs_a_second_tab() {
        let mut c = completer(&["echo", "exit"]);
        let start = Instant::now();
        assert_eq!(c.complete_at("e", start), Completion::Ambiguous);
        assert_eq!(
            c.complete_at("e", start + Duration::from_millis(300)),
            Completion::Matches(vec![String::from("echo"), String::from("exit")])
        );
    }

    #[test]
    fn slow_second_tab_stays_ambiguous() {
        let mut c = completer(&["echo", "exit"]);
        let start = Instant::now();
        assert_eq!(c.complete_at("e", start), Completion::Ambiguous);
        assert_eq!(
            c.complete_at("e", start + Duration::from_secs(2)),
            Completion::Ambiguous
        );
    }

    #[test]
    fn different_line_resets_double_tab() {
        let mut c = completer(&["aa1", "aa2", "ab1", "ab2"]);
        let start = Instant::now();
        assert_eq!(c.complete_at("a", start), Completion::Ambiguous);
        // A second tab on a *different* ambiguous line starts over.
        assert_eq!(
            c.complete_at("ab", start + Duration::from_millis(100)),
            Completion::Ambiguous
        );
        assert_eq!(
            c.complete_at("ab", start + Duration::from_millis(200)),
            Completion::Matches(vec![String::from("ab1"), String::from("ab2")])
        );
    }

    #[test]
    fn columns_pack_to_terminal_width() {
        let matches: Vec<String> = ["alpha", "beta", "gamma", "delta", "mu"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        // widest = 5, column width 7, two columns in 20 cells.
        let rows = column_rows(&matches, 20);
        assert_eq!(rows, ["alpha  beta", "gamma  delta", "mu"]);
    }

    #[test]
    fn narrow_terminal_still_gets_one_column() {
        let matches = vec![String::from("something-long")];
        let rows = column_rows(&matches, 4);
        assert_eq!(rows, ["something-long"]);
    }
}

//! Session command history.
//!
//! Entries are indexed from 1 and never removed during a session. Two
//! cursors track file state: `baseline` is the length right after the
//! startup load (the exit flush appends everything past it), and
//! `append_cursor` is how far `history -a` has already flushed.
//!
//! The history file is one entry per line, UTF-8; blank lines are ignored
//! on read. Writes keep the file private to the user.

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

#[derive(Default)]
pub struct History {
    entries: Vec<String>,
    baseline: usize,
    append_cursor: usize,
}

impl History {
    pub fn new() -> History {
        History::default()
    }

    /// Load the startup history file. A missing file is an empty history.
    pub fn load(path: &Path) -> History {
        let mut history = History::new();
        match File::open(path) {
            Ok(file) => {
                for line in BufReader::new(file).lines() {
                    match line {
                        Ok(entry) => {
                            if !entry.trim().is_empty() {
                                history.entries.push(entry);
                            }
                        }
                        Err(e) => {
                            warn!("unreadable line in {}: {}", path.display(), e);
                            break;
                        }
                    }
                }
                debug!(
                    "loaded {} history entries from {}",
                    history.entries.len(),
                    path.display()
                );
            }
            Err(e) => debug!("no history at {}: {}", path.display(), e),
        }
        history.baseline = history.entries.len();
        history.append_cursor = history.entries.len();
        history
    }

    pub fn push(&mut self, line: &str) {
        if !line.trim().is_empty() {
            self.entries.push(line.to_string());
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn baseline(&self) -> usize {
        self.baseline
    }

    /// `history -r`: append each nonempty line of the file to the store.
    pub fn read_from(&mut self, path: &Path) -> io::Result<usize> {
        let file = File::open(path)?;
        let mut added = 0;
        for line in BufReader::new(file).lines() {
            let entry = line?;
            if !entry.trim().is_empty() {
                self.entries.push(entry);
                added += 1;
            }
        }
        Ok(added)
    }

    /// `history -w`: write the full store.
    pub fn write_to(&self, path: &Path) -> io::Result<()> {
        let file = open_private(path, false)?;
        let mut writer = BufWriter::new(file);
        for entry in &self.entries {
            writer.write_all(entry.as_bytes())?;
            writer.write_all(b"\n")?;
        }
        writer.flush()
    }

    /// `history -a`: append entries not yet flushed with `-a`, then advance
    /// the cursor.
    pub fn append_unflushed(&mut self, path: &Path) -> io::Result<usize> {
        let count = self.entries.len() - self.append_cursor;
        append_range(path, &self.entries[self.append_cursor..])?;
        self.append_cursor = self.entries.len();
        Ok(count)
    }

    /// Shutdown flush: append everything recorded since startup.
    pub fn flush_session(&self, path: &Path) -> io::Result<()> {
        append_range(path, &self.entries[self.baseline..])
    }
}

fn append_range(path: &Path, entries: &[String]) -> io::Result<()> {
    if entries.is_empty() {
        return Ok(());
    }
    let file = open_private(path, true)?;
    let mut writer = BufWriter::new(file);
    for entry in entries {
        writer.write_all(entry.as_bytes())?;
        writer.write_all(b"\n")?;
    }
    writer.flush()
}

/// Open the history file for writing, creating parent directories first.
/// Entries can hold sensitive command lines, so the file is created
/// user-only, and a wider-open existing file is tightened to match.
fn open_private(path: &Path, append: bool) -> io::Result<File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut options = OpenOptions::new();
    if append {
        options.append(true);
    } else {
        options.write(true).truncate(true);
    }
    let file = options.create(true).mode(0o600).open(path)?;
    let mut permissions = file.metadata()?.permissions();
    if permissions.mode() & 0o077 != 0 {
        debug!("tightening permissions on {}", path.display());
        permissions.set_mode(0o600);
        file.set_permissions(permissions)?;
    }
    Ok(file)
}

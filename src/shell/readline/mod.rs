//! Raw-mode line editor.
//!
//! Reads one line at a time with cursor movement, history recall, and tab
//! completion. The terminal is in raw mode only while a line is being
//! edited; command execution happens in cooked mode.

use std::io::{self, stdin, stdout, Write};

use termion::event::Key;
use termion::input::TermRead;
use termion::raw::IntoRawMode;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use super::completion::{self, Completer, Completion};
use super::history::History;

pub enum ReadEvent {
    Line(String),
    Eof,
    Interrupted,
}

/// Edit buffer plus cursor, kept at grapheme boundaries.
struct LineBuffer {
    text: String,
    /// Byte offset of the cursor.
    cursor: usize,
}

impl LineBuffer {
    fn new() -> LineBuffer {
        LineBuffer {
            text: String::new(),
            cursor: 0,
        }
    }

    fn insert(&mut self, c: char) {
        self.text.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    fn backspace(&mut self) {
        if let Some(start) = self.prev_boundary() {
            self.text.replace_range(start..self.cursor, "");
            self.cursor = start;
        }
    }

    fn move_left(&mut self) {
        if let Some(start) = self.prev_boundary() {
            self.cursor = start;
        }
    }

    fn move_right(&mut self) {
        if let Some(grapheme) = self.text[self.cursor..].graphemes(true).next() {
            self.cursor += grapheme.len();
        }
    }

    fn replace(&mut self, text: String) {
        self.cursor = text.len();
        self.text = text;
    }

    fn prev_boundary(&self) -> Option<usize> {
        self.text[..self.cursor]
            .grapheme_indices(true)
            .last()
            .map(|(i, _)| i)
    }
}

pub fn read(
    prompt: &str,
    completer: &mut Completer,
    history: &History,
) -> io::Result<ReadEvent> {
    let mut stdout = stdout().into_raw_mode()?;
    let mut line = LineBuffer::new();
    // History recall: position in the store, with the in-progress line
    // stashed so Down past the end restores it.
    let mut recall: Option<usize> = None;
    let mut stash = String::new();

    write!(stdout, "\r{}", prompt)?;
    stdout.flush()?;

    for key in stdin().keys() {
        match key? {
            Key::Char('\n') => {
                write!(stdout, "\r\n")?;
                stdout.flush()?;
                return Ok(ReadEvent::Line(line.text));
            }
            Key::Char('\t') => {
                handle_tab(&mut stdout, completer, &mut line)?;
            }
            Key::Char(c) => line.insert(c),
            Key::Backspace => line.backspace(),
            Key::Left => line.move_left(),
            Key::Right => line.move_right(),
            Key::Home => line.cursor = 0,
            Key::End => line.cursor = line.text.len(),
            Key::Up => {
                let entries = history.entries();
                let previous = match recall {
                    None if !entries.is_empty() => Some(entries.len() - 1),
                    Some(i) if i > 0 => Some(i - 1),
                    other => other,
                };
                if previous != recall {
                    if recall.is_none() {
                        stash = line.text.clone();
                    }
                    if let Some(i) = previous {
                        line.replace(entries[i].clone());
                    }
                    recall = previous;
                }
            }
            Key::Down => {
                let entries = history.entries();
                if let Some(i) = recall {
                    if i + 1 < entries.len() {
                        recall = Some(i + 1);
                        line.replace(entries[i + 1].clone());
                    } else {
                        recall = None;
                        line.replace(std::mem::take(&mut stash));
                    }
                }
            }
            Key::Ctrl('c') => {
                write!(stdout, "\r\n")?;
                stdout.flush()?;
                return Ok(ReadEvent::Interrupted);
            }
            Key::Ctrl('d') => {
                if line.text.is_empty() {
                    write!(stdout, "\r\n")?;
                    stdout.flush()?;
                    return Ok(ReadEvent::Eof);
                }
            }
            _ => {}
        }
        redraw(&mut stdout, prompt, &line)?;
    }

    write!(stdout, "\r\n")?;
    stdout.flush()?;
    Ok(ReadEvent::Eof)
}

fn handle_tab<W: Write>(
    stdout: &mut W,
    completer: &mut Completer,
    line: &mut LineBuffer,
) -> io::Result<()> {
    match completer.complete(&line.text) {
        Completion::NoMatch | Completion::Ambiguous => completion::ring_bell(),
        Completion::Unique(word) => line.replace(word),
        Completion::Extend(prefix) => line.replace(prefix),
        Completion::Matches(matches) => {
            let width = termion::terminal_size()
                .map(|(w, _)| w as usize)
                .unwrap_or(80);
            write!(stdout, "\r\n")?;
            for row in completion::column_rows(&matches, width) {
                write!(stdout, "{}\r\n", row)?;
            }
        }
    }
    Ok(())
}

fn redraw<W: Write>(stdout: &mut W, prompt: &str, line: &LineBuffer) -> io::Result<()> {
    write!(
        stdout,
        "\r{}{}{}",
        termion::clear::CurrentLine,
        prompt,
        line.text
    )?;
    let tail = UnicodeWidthStr::width(&line.text[line.cursor..]);
    if tail > 0 {
        write!(stdout, "{}", termion::cursor::Left(tail as u16))?;
    }
    stdout.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_backspace_track_grapheme_boundaries() {
        let mut line = LineBuffer::new();
        for c in "ab".chars() {
            line.insert(c);
        }
        // A combining accent is two code points but one grapheme.
        line.insert('e');
        line.insert('\u{0301}');
        assert_eq!(line.text, "abe\u{0301}");
        line.backspace();
        assert_eq!(line.text, "ab");
        line.backspace();
        line.backspace();
        line.backspace();
        assert_eq!(line.text, "");
        assert_eq!(line.cursor, 0);
    }

    #[test]
    fn cursor_moves_by_graphemes() {
        let mut line = LineBuffer::new();
        for c in "xy".chars() {
            line.insert(c);
        }
        line.move_left();
        assert_eq!(line.cursor, 1);
        line.insert('a');
        assert_eq!(line.text, "xay");
        line.move_right();
        assert_eq!(line.cursor, 3);
        line.move_right();
        assert_eq!(line.cursor, 3);
    }

    #[test]
    fn replace_puts_cursor_at_the_end() {
        let mut line = LineBuffer::new();
        line.replace(String::from("echo "));
        assert_eq!(line.cursor, 5);
    }
}

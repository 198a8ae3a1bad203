//! Prefixed terminal output and the line-rewrite backends used while an
//! image pull is rendered.

mod style;

pub use style::{Icon, PREFIX, format_line};

use std::io::{self, Write};

use crossterm::cursor::{MoveDown, MoveToColumn, MoveUp};
use crossterm::queue;
use crossterm::style::Print;
use crossterm::terminal::{Clear, ClearType};

/// Destination for user-facing output.
///
/// `offset` in [`LineSink::rewrite_line`] counts the lines printed *after* the
/// target line, so `0` addresses the most recently printed line.
pub trait LineSink {
    fn print_line(&mut self, icon: Icon, text: &str) -> io::Result<()>;

    fn rewrite_line(&mut self, offset: usize, icon: Icon, text: &str) -> io::Result<()>;

    /// Unformatted byte stream, used to forward command output verbatim.
    fn raw(&mut self) -> &mut dyn Write;
}

/// Interactive backend: rewrites lines in place with cursor escape sequences.
pub struct AnsiConsole<W: Write> {
    out: W,
}

impl<W: Write> AnsiConsole<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> LineSink for AnsiConsole<W> {
    fn print_line(&mut self, icon: Icon, text: &str) -> io::Result<()> {
        writeln!(self.out, "{}", format_line(icon, text, true))?;
        self.out.flush()
    }

    fn rewrite_line(&mut self, offset: usize, icon: Icon, text: &str) -> io::Result<()> {
        // The cursor rests on the empty row below the last printed line.
        let rows = u16::try_from(offset.saturating_add(1)).unwrap_or(u16::MAX);

        // Queue into one buffer so the update reaches the terminal in a single write.
        let mut buf = Vec::new();
        queue!(
            buf,
            MoveUp(rows),
            MoveToColumn(0),
            Clear(ClearType::CurrentLine),
            Print(format_line(icon, text, true)),
            MoveDown(rows),
            MoveToColumn(0),
        )?;
        self.out.write_all(&buf)?;
        self.out.flush()
    }

    fn raw(&mut self) -> &mut dyn Write {
        &mut self.out
    }
}

/// Append-only backend for pipes and CI logs: no colours, no cursor movement.
/// A rewrite is printed as a fresh line.
pub struct PlainConsole<W: Write> {
    out: W,
}

impl<W: Write> PlainConsole<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> LineSink for PlainConsole<W> {
    fn print_line(&mut self, icon: Icon, text: &str) -> io::Result<()> {
        writeln!(self.out, "{}", format_line(icon, text, false))?;
        self.out.flush()
    }

    fn rewrite_line(&mut self, _offset: usize, icon: Icon, text: &str) -> io::Result<()> {
        self.print_line(icon, text)
    }

    fn raw(&mut self) -> &mut dyn Write {
        &mut self.out
    }
}

/// Console on stdout, picking the backend by whether stdout is a terminal.
pub fn stdout_console(interactive: bool) -> Box<dyn LineSink> {
    if interactive {
        Box::new(AnsiConsole::new(io::stdout()))
    } else {
        Box::new(PlainConsole::new(io::stdout()))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::io::{self, Write};

    use super::{Icon, LineSink};

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Op {
        Print(Icon, String),
        Rewrite(usize, Icon, String),
    }

    /// Records every call so tests can assert on the exact sequence.
    #[derive(Debug, Default)]
    pub struct RecordingSink {
        pub ops: Vec<Op>,
        pub raw: Vec<u8>,
    }

    impl RecordingSink {
        pub fn printed(&self) -> Vec<&str> {
            self.ops
                .iter()
                .filter_map(|op| match op {
                    Op::Print(_, text) => Some(text.as_str()),
                    Op::Rewrite(..) => None,
                })
                .collect()
        }

        pub fn contains(&self, needle: &str) -> bool {
            self.ops.iter().any(|op| match op {
                Op::Print(_, text) | Op::Rewrite(_, _, text) => text.contains(needle),
            })
        }
    }

    impl LineSink for RecordingSink {
        fn print_line(&mut self, icon: Icon, text: &str) -> io::Result<()> {
            self.ops.push(Op::Print(icon, text.to_string()));
            Ok(())
        }

        fn rewrite_line(&mut self, offset: usize, icon: Icon, text: &str) -> io::Result<()> {
            self.ops.push(Op::Rewrite(offset, icon, text.to_string()));
            Ok(())
        }

        fn raw(&mut self) -> &mut dyn Write {
            &mut self.raw
        }
    }
}

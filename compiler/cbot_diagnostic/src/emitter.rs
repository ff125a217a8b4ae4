//! Terminal emitter.
//!
//! Renders an error as `error[code]: message`, followed by the offending
//! source line and a caret underline, with optional ANSI colors.

use std::io::{self, Write};

use cbot_ir::Span;

use crate::{CompileError, RuntimeError};

/// ANSI color codes for terminal output.
mod colors {
    pub const ERROR: &str = "\x1b[1;31m"; // Bold red
    pub const BOLD: &str = "\x1b[1m";
    pub const SECONDARY: &str = "\x1b[1;34m"; // Bold blue
    pub const RESET: &str = "\x1b[0m";
}

/// Color output mode for terminal emitter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorMode {
    /// Automatically detect based on terminal capabilities.
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    /// For `Auto` mode, `is_tty` decides.
    pub fn should_use_colors(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

/// Anything the emitter can render.
pub trait Reportable {
    fn code(&self) -> i32;
    fn message(&self) -> String;
    fn span(&self) -> Span;
}

impl Reportable for CompileError {
    fn code(&self) -> i32 {
        self.kind.code()
    }

    fn message(&self) -> String {
        self.kind.to_string()
    }

    fn span(&self) -> Span {
        self.span
    }
}

impl Reportable for RuntimeError {
    fn code(&self) -> i32 {
        self.kind.code()
    }

    fn message(&self) -> String {
        self.kind.to_string()
    }

    fn span(&self) -> Span {
        self.span
    }
}

/// Terminal emitter with optional color support.
pub struct TerminalEmitter<W: Write> {
    writer: W,
    colors: bool,
}

impl<W: Write> TerminalEmitter<W> {
    pub fn with_color_mode(writer: W, mode: ColorMode, is_tty: bool) -> Self {
        TerminalEmitter {
            writer,
            colors: mode.should_use_colors(is_tty),
        }
    }

    pub fn new(writer: W) -> Self {
        TerminalEmitter {
            writer,
            colors: false,
        }
    }

    fn paint(&self, color: &'static str) -> &'static str {
        if self.colors {
            color
        } else {
            ""
        }
    }

    /// Emit one error against `source`, naming the file as `path`.
    pub fn emit(&mut self, err: &dyn Reportable, source: &str, path: &str) -> io::Result<()> {
        let (red, bold, blue, reset) = (
            self.paint(colors::ERROR),
            self.paint(colors::BOLD),
            self.paint(colors::SECONDARY),
            self.paint(colors::RESET),
        );
        let span = err.span();
        writeln!(
            self.writer,
            "{red}error[{}]{reset}{bold}: {}{reset}",
            err.code(),
            err.message()
        )?;

        let Some(loc) = locate(source, span) else {
            return writeln!(self.writer, "  {blue}-->{reset} {path}");
        };
        writeln!(
            self.writer,
            "  {blue}-->{reset} {path}:{}:{}",
            loc.line,
            loc.column + 1
        )?;
        let gutter = loc.line.to_string().len();
        writeln!(self.writer, "{:gutter$} {blue}|{reset}", "")?;
        writeln!(self.writer, "{blue}{}{reset} {blue}|{reset} {}", loc.line, loc.text)?;
        writeln!(
            self.writer,
            "{:gutter$} {blue}|{reset} {:pad$}{red}{}{reset}",
            "",
            "",
            "^".repeat(loc.width.max(1)),
            pad = loc.column
        )
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// A span resolved to a single source line.
#[derive(Debug, PartialEq, Eq)]
pub struct LineLocation<'a> {
    /// 1-based line number.
    pub line: usize,
    /// 0-based column in chars.
    pub column: usize,
    /// Underline width, clipped to the end of the line.
    pub width: usize,
    pub text: &'a str,
}

/// Find the line containing `span.start`.
pub fn locate(source: &str, span: Span) -> Option<LineLocation<'_>> {
    let start = span.start as usize;
    if start > source.len() || !source.is_char_boundary(start) {
        return None;
    }
    let line_start = source[..start].rfind('\n').map_or(0, |i| i + 1);
    let line_end = source[start..]
        .find('\n')
        .map_or(source.len(), |i| start + i);
    let text = source[line_start..line_end].trim_end_matches('\r');
    let line = source[..line_start].matches('\n').count() + 1;
    let column = source[line_start..start].chars().count();
    let line_end = u32::try_from(line_end).unwrap_or(u32::MAX);
    let width = Span::new(span.start, span.end.clamp(span.start, line_end))
        .slice(source)
        .map_or(0, |s| s.chars().count());
    Some(LineLocation {
        line,
        column,
        width,
        text,
    })
}

#[cfg(test)]
mod tests;

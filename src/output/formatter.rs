//! Message formatting for the command-line front end.
//!
//! Regular output goes to stdout, warnings and errors to stderr. Quiet mode
//! keeps only the latter; verbose mode adds debug lines and details.
//!
//! # Examples
//!
//! ```
//! use pdfstitch::output::{OutputFormatter, Verbosity};
//!
//! let formatter = OutputFormatter::new(Verbosity::Normal);
//! formatter.info("Merging 3 files");
//! formatter.success("Wrote merged.pdf");
//! ```

use std::io::{self, IsTerminal, Write};

use serde::Serialize;

/// How much the formatter prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    /// Warnings and errors only.
    Quiet,
    /// Regular progress messages.
    #[default]
    Normal,
    /// Everything, including details.
    Verbose,
}

impl Verbosity {
    /// Pick a verbosity from the `--quiet` / `--verbose` flags.
    pub fn from_flags(quiet: bool, verbose: bool) -> Self {
        match (quiet, verbose) {
            (true, _) => Verbosity::Quiet,
            (false, true) => Verbosity::Verbose,
            (false, false) => Verbosity::Normal,
        }
    }
}

/// Level of output message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    /// Informational message.
    Info,
    /// Success message.
    Success,
    /// Warning message.
    Warning,
    /// Error message.
    Error,
    /// Debug/verbose message.
    Debug,
}

impl MessageLevel {
    fn prefix(self) -> &'static str {
        match self {
            MessageLevel::Info => "",
            MessageLevel::Success => "✓ ",
            MessageLevel::Warning => "⚠ ",
            MessageLevel::Error => "✗ ",
            MessageLevel::Debug => "→ ",
        }
    }

    fn color(self) -> Option<&'static str> {
        match self {
            MessageLevel::Info => None,
            MessageLevel::Success => Some("\x1b[32m"),
            MessageLevel::Warning => Some("\x1b[33m"),
            MessageLevel::Error => Some("\x1b[31m"),
            MessageLevel::Debug => Some("\x1b[36m"),
        }
    }

    /// Lowest verbosity at which the level is shown.
    fn threshold(self) -> Verbosity {
        match self {
            MessageLevel::Warning | MessageLevel::Error => Verbosity::Quiet,
            MessageLevel::Info | MessageLevel::Success => Verbosity::Normal,
            MessageLevel::Debug => Verbosity::Verbose,
        }
    }

    fn to_stderr(self) -> bool {
        matches!(self, MessageLevel::Warning | MessageLevel::Error)
    }
}

/// User-facing output with configurable verbosity.
#[derive(Debug, Clone)]
pub struct OutputFormatter {
    verbosity: Verbosity,
    colored: bool,
}

impl OutputFormatter {
    /// Create a formatter; color is used when stdout is a terminal.
    pub fn new(verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            colored: io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
        }
    }

    /// Create a formatter from the `--quiet` / `--verbose` flags.
    pub fn from_flags(quiet: bool, verbose: bool) -> Self {
        Self::new(Verbosity::from_flags(quiet, verbose))
    }

    /// Format `message` for `level`, or `None` when it is filtered out.
    pub fn render(&self, level: MessageLevel, message: &str) -> Option<String> {
        if self.verbosity < level.threshold() {
            return None;
        }
        let prefix = level.prefix();
        Some(match level.color() {
            Some(color) if self.colored => format!("{color}{prefix}{message}\x1b[0m"),
            _ => format!("{prefix}{message}"),
        })
    }

    fn emit(&self, level: MessageLevel, message: &str) {
        if let Some(line) = self.render(level, message) {
            if level.to_stderr() {
                eprintln!("{line}");
            } else {
                println!("{line}");
            }
        }
    }

    /// Print an informational message.
    pub fn info(&self, message: &str) {
        self.emit(MessageLevel::Info, message);
    }

    /// Print a success message.
    pub fn success(&self, message: &str) {
        self.emit(MessageLevel::Success, message);
    }

    /// Print a warning. Shown even in quiet mode.
    pub fn warning(&self, message: &str) {
        self.emit(MessageLevel::Warning, message);
    }

    /// Print an error. Always shown.
    pub fn error(&self, message: &str) {
        self.emit(MessageLevel::Error, message);
    }

    /// Print a message only in verbose mode.
    pub fn debug(&self, message: &str) {
        self.emit(MessageLevel::Debug, message);
    }

    /// Print a section header.
    pub fn section(&self, title: &str) {
        if self.should_print() {
            println!("\n{title}");
        }
    }

    /// Print a `label: value` pair in verbose mode.
    pub fn detail(&self, label: &str, value: &str) {
        if self.is_verbose() {
            println!("  {label}: {value}");
        }
    }

    /// Print a numbered list item.
    pub fn list_item(&self, index: usize, message: &str) {
        if self.should_print() {
            println!("  {index}. {message}");
        }
    }

    /// Print a blank line.
    pub fn blank_line(&self) {
        if self.should_print() {
            println!();
        }
    }

    /// Print `value` as pretty JSON on stdout, regardless of verbosity.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn json<T: Serialize>(&self, value: &T) -> crate::Result<()> {
        let mut stdout = io::stdout().lock();
        serde_json::to_writer_pretty(&mut stdout, value)?;
        writeln!(stdout)?;
        Ok(())
    }

    /// Whether regular output is shown.
    pub fn should_print(&self) -> bool {
        self.verbosity >= Verbosity::Normal
    }

    /// Whether verbose output is shown.
    pub fn is_verbose(&self) -> bool {
        self.verbosity == Verbosity::Verbose
    }
}

impl Default for OutputFormatter {
    fn default() -> Self {
        Self::new(Verbosity::Normal)
    }
}

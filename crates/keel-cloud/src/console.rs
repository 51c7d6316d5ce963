//! Human-readable output sink
//!
//! Lifecycle operations report progress as `info` headings and indented
//! `detail` lines. Output is fire-and-forget: nothing returned by a console is
//! consumed by the core.

use colored::Colorize;
use std::sync::Mutex;

/// Presentation sink for info/detail/error lines
pub trait Console: Send + Sync {
    fn info(&self, message: &str);
    fn detail(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Console writing colored lines to stdout/stderr
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalConsole;

impl TerminalConsole {
    pub fn new() -> Self {
        Self
    }
}

impl Console for TerminalConsole {
    fn info(&self, message: &str) {
        println!("{}", message.bold());
    }

    fn detail(&self, message: &str) {
        println!("  {}", message);
    }

    fn warn(&self, message: &str) {
        eprintln!("{} {}", "⚠".yellow(), message.yellow());
    }

    fn error(&self, message: &str) {
        eprintln!("{} {}", "✗".red(), message.red());
    }
}

/// Severity of a recorded console line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineLevel {
    Info,
    Detail,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleLine {
    pub level: LineLevel,
    pub message: String,
}

/// Console keeping every line in memory
#[derive(Debug, Default)]
pub struct RecordingConsole {
    lines: Mutex<Vec<ConsoleLine>>,
}

impl RecordingConsole {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, level: LineLevel, message: &str) {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(ConsoleLine {
                level,
                message: message.to_string(),
            });
    }

    pub fn lines(&self) -> Vec<ConsoleLine> {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Messages recorded at one level, in order
    pub fn messages(&self, level: LineLevel) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|line| line.level == level)
            .map(|line| line.message)
            .collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|line| line.message.contains(needle))
    }
}

impl Console for RecordingConsole {
    fn info(&self, message: &str) {
        self.push(LineLevel::Info, message);
    }

    fn detail(&self, message: &str) {
        self.push(LineLevel::Detail, message);
    }

    fn warn(&self, message: &str) {
        self.push(LineLevel::Warn, message);
    }

    fn error(&self, message: &str) {
        self.push(LineLevel::Error, message);
    }
}

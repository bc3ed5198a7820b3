//! Rendering of script replay failures into human-readable diagnostics.
//!
//! Rendering is pure: it returns lines and leaves emitting them to the
//! caller. It never fails, whatever shape the failure arrives in.

use crate::models::{FileError, ReplayFailure, ReplayFailureKind};
use std::path::MAIN_SEPARATOR;

/// Shown in place of a file name when a failure carries none.
pub const UNKNOWN_FILE: &str = "<unknown file>";

const PARTIAL_PREAMBLE: &str = "Create completed with the following errors:";
const ABORTED_PREAMBLE: &str =
    "An unexpected SQL error occurred while executing scripts, and the process wasn't completed.";

/// Turns a [`ReplayFailure`] into an ordered list of diagnostic lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptExecutionReporter;

impl ScriptExecutionReporter {
    /// Creates a reporter
    pub const fn new() -> Self {
        Self
    }

    /// Renders a failure.
    ///
    /// Partial failures list every file error in replay order as a
    /// `- file (Line n):` line followed by the indented message. Aborted
    /// failures render a single block introduced by a preamble saying the
    /// process did not complete.
    pub fn render(&self, failure: &ReplayFailure) -> Vec<String> {
        match failure.kind {
            ReplayFailureKind::Partial => render_partial(&failure.errors),
            ReplayFailureKind::Aborted => render_aborted(failure.errors.first()),
        }
    }
}

fn render_partial(errors: &[FileError]) -> Vec<String> {
    let mut lines = Vec::with_capacity(errors.len().saturating_mul(2).saturating_add(1));
    lines.push(PARTIAL_PREAMBLE.to_string());
    for error in errors {
        lines.push(format!("- {}:", location(error)));
        lines.push(format!(" {}", error.message));
    }
    lines
}

fn render_aborted(error: Option<&FileError>) -> Vec<String> {
    let mut lines = vec![ABORTED_PREAMBLE.to_string()];
    match error {
        Some(error) => {
            lines.push(format!("{}:", location(error)));
            lines.push(error.message.clone());
        }
        None => {
            lines.push(format!("{UNKNOWN_FILE} (Line ?):"));
            lines.push("no error details were reported".to_string());
        }
    }
    lines
}

fn location(error: &FileError) -> String {
    let file = error
        .file_name
        .as_deref()
        .filter(|name| !name.trim().is_empty())
        .map_or_else(|| UNKNOWN_FILE.to_string(), normalize_separators);
    let line = error
        .line_number
        .map_or_else(|| "?".to_string(), |n| n.to_string());
    format!("{file} (Line {line})")
}

/// Rewrites both `/` and `\` to the host platform's path separator.
pub fn normalize_separators(path: &str) -> String {
    path.chars()
        .map(|c| if c == '/' || c == '\\' { MAIN_SEPARATOR } else { c })
        .collect()
}

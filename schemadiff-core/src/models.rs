//! Core data models for schema references, endpoints and replay outcomes.
//!
//! Everything a comparison run passes between its stages lives here: the
//! parsed user input ([`SchemaReference`]), the connectable form it resolves
//! to ([`SchemaEndpoint`]), the schema snapshot loaded from an endpoint
//! ([`DatabaseSchema`]) and the structured failure produced when a script
//! directory cannot be replayed ([`ReplayFailure`]).

use crate::error::{SchemaDiffError, redact_database_url};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Marker prefix identifying a script-directory reference on the command line.
pub const SCRIPT_DIRECTORY_PREFIX: &str = "dir:";

/// A user-supplied schema source, parsed once at the boundary.
#[derive(Clone, PartialEq, Eq)]
pub enum SchemaReference {
    /// A caller-owned database reachable through this connection string
    LiveConnection(String),
    /// A directory of DDL scripts to materialize into an ephemeral database
    ScriptDirectory(PathBuf),
}

impl SchemaReference {
    /// Returns true if this reference requires materialization
    pub const fn is_script_directory(&self) -> bool {
        matches!(self, Self::ScriptDirectory(_))
    }
}

impl FromStr for SchemaReference {
    type Err = SchemaDiffError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if value.is_empty() {
            return Err(SchemaDiffError::configuration(
                "schema reference cannot be empty",
            ));
        }

        match value.strip_prefix(SCRIPT_DIRECTORY_PREFIX) {
            Some(path) if path.trim().is_empty() => Err(SchemaDiffError::configuration(
                "script directory reference is missing a path after 'dir:'",
            )),
            Some(path) => Ok(Self::ScriptDirectory(PathBuf::from(path.trim()))),
            None => Ok(Self::LiveConnection(value.to_string())),
        }
    }
}

impl fmt::Display for SchemaReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LiveConnection(connection) => write!(f, "{}", redact_database_url(connection)),
            Self::ScriptDirectory(path) => {
                write!(f, "{}{}", SCRIPT_DIRECTORY_PREFIX, path.display())
            }
        }
    }
}

impl fmt::Debug for SchemaReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LiveConnection(connection) => f
                .debug_tuple("LiveConnection")
                .field(&redact_database_url(connection))
                .finish(),
            Self::ScriptDirectory(path) => f.debug_tuple("ScriptDirectory").field(path).finish(),
        }
    }
}

/// The resolved, connectable form of a [`SchemaReference`].
///
/// Ephemeral endpoints are owned by the run that materialized them and are
/// dropped when it ends. Live endpoints are never dropped.
#[derive(Clone, PartialEq, Eq)]
pub struct SchemaEndpoint {
    pub connection_string: String,
    pub is_ephemeral: bool,
}

impl SchemaEndpoint {
    /// Endpoint for a caller-owned database
    pub fn live(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            is_ephemeral: false,
        }
    }

    /// Endpoint for a database provisioned by the current run
    pub fn ephemeral(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            is_ephemeral: true,
        }
    }
}

impl fmt::Debug for SchemaEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaEndpoint")
            .field(
                "connection_string",
                &redact_database_url(&self.connection_string),
            )
            .field("is_ephemeral", &self.is_ephemeral)
            .finish()
    }
}

/// Database column information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: String,
    pub is_nullable: bool,
    pub default_value: Option<String>,
    pub ordinal_position: u32,
}

impl Column {
    /// Creates a nullable column without a default
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            is_nullable: true,
            default_value: None,
            ordinal_position: 0,
        }
    }

    /// Marks the column NOT NULL
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.is_nullable = false;
        self
    }

    /// Sets the column default expression
    #[must_use]
    pub fn with_default(mut self, default_value: impl Into<String>) -> Self {
        self.default_value = Some(default_value.into());
        self
    }
}

/// Database table information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub schema: String,
    pub name: String,
    pub columns: Vec<Column>,
}

impl Table {
    /// Creates an empty table in the given schema
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Appends a column, assigning its ordinal position
    #[must_use]
    pub fn with_column(mut self, mut column: Column) -> Self {
        column.ordinal_position = u32::try_from(self.columns.len())
            .unwrap_or(u32::MAX)
            .saturating_add(1);
        self.columns.push(column);
        self
    }

    /// Schema-qualified name, e.g. `public.users`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }

    /// Looks up a column by name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Snapshot of a database schema as loaded from an endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSchema {
    pub database_name: Option<String>,
    pub tables: Vec<Table>,
}

impl DatabaseSchema {
    /// Looks up a table by schema and name
    pub fn table(&self, schema: &str, name: &str) -> Option<&Table> {
        self.tables
            .iter()
            .find(|t| t.schema == schema && t.name == name)
    }
}

/// One script file that failed during replay.
///
/// File name and line number are optional: a failure that is not tied to a
/// particular script (an unreachable server, for example) carries neither.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileError {
    pub file_name: Option<String>,
    pub line_number: Option<u32>,
    pub message: String,
}

impl FileError {
    /// Error located at a specific file and line
    pub fn new(file_name: impl Into<String>, line_number: u32, message: impl Into<String>) -> Self {
        Self {
            file_name: Some(file_name.into()),
            line_number: Some(line_number),
            message: message.into(),
        }
    }

    /// Error not attributable to any script file
    pub fn unattributed(message: impl Into<String>) -> Self {
        Self {
            file_name: None,
            line_number: None,
            message: message.into(),
        }
    }
}

/// How far script replay got before failing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplayFailureKind {
    /// Replay ran to the end but one or more files failed
    Partial,
    /// Replay stopped early on an error not scoped to a single file
    Aborted,
}

/// Structured failure of a script-directory replay.
///
/// The errors are kept in replay order. A [`ReplayFailureKind::Aborted`]
/// failure normally carries exactly one error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayFailure {
    pub kind: ReplayFailureKind,
    pub errors: Vec<FileError>,
}

impl ReplayFailure {
    /// Aggregate failure: replay finished with these per-file errors
    pub const fn partial(errors: Vec<FileError>) -> Self {
        Self {
            kind: ReplayFailureKind::Partial,
            errors,
        }
    }

    /// Single fatal failure that stopped replay
    pub fn aborted(error: FileError) -> Self {
        Self {
            kind: ReplayFailureKind::Aborted,
            errors: vec![error],
        }
    }
}

impl fmt::Display for ReplayFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ReplayFailureKind::Partial => write!(
                f,
                "Script directory materialization failed: {} script error(s)",
                self.errors.len()
            ),
            ReplayFailureKind::Aborted => {
                let message = self
                    .errors
                    .first()
                    .map_or("unknown error", |e| e.message.as_str());
                write!(f, "Script replay did not complete: {message}")
            }
        }
    }
}

impl std::error::Error for ReplayFailure {}

/// Options controlling how a comparison result is reported and persisted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompareOptions {
    /// Emit one summary line per change instead of per-kind counts
    pub verbose_summary: bool,
    /// Where to write the generated diff script, if anywhere
    pub output_diff_path: Option<PathBuf>,
    /// Replace an existing file at `output_diff_path`
    pub overwrite_output: bool,
}

impl CompareOptions {
    /// Default options: terse summary, no output file
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets summary verbosity
    #[must_use]
    pub const fn with_verbose_summary(mut self, verbose: bool) -> Self {
        self.verbose_summary = verbose;
        self
    }

    /// Sets the diff script output path
    #[must_use]
    pub fn with_output_diff_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_diff_path = Some(path.into());
        self
    }

    /// Allows replacing an existing output file
    #[must_use]
    pub const fn with_overwrite_output(mut self, overwrite: bool) -> Self {
        self.overwrite_output = overwrite;
        self
    }
}

/// Result of a completed comparison run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompareOutcome {
    pub has_differences: bool,
    /// Status lines in the order they were emitted
    pub report: Vec<String>,
    /// Absolute path of the diff script, when one was written
    pub script_written: Option<PathBuf>,
}

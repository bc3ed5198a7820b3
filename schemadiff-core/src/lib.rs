//! Core library for SchemaDiff.
//!
//! SchemaDiff compares two SQL schemas, each given either as a live database
//! connection or as a directory of DDL scripts, and reports or scripts the
//! differences. This crate holds the comparison workflow and everything it
//! depends on; the `schemadiff` binary is a thin shell around it.
//!
//! # Guarantees
//! - Caller-supplied live databases are only read, never modified
//! - Every ephemeral database a run provisions is dropped exactly once
//! - Connection strings are redacted before reaching logs or errors
//!
//! # Architecture
//! - [`CompareOrchestrator`] drives a run end to end
//! - [`SourceResolver`] materializes script directories into ephemeral
//!   databases owned by the run
//! - [`ScriptExecutionReporter`] renders replay failures as diagnostics
//! - [`adapters`] holds the collaborator traits and the PostgreSQL backend

pub mod adapters;
pub mod diff;
pub mod error;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod reporter;
pub mod resolver;

// Re-export commonly used types
pub use adapters::{
    ConnectionConfig, DatabaseDropper, EphemeralConfig, SchemaComparator, SchemaLoader,
    ScriptRunner,
};
pub use diff::{DiffResult, SchemaChange, StructuralComparator};
pub use error::{Result, SchemaDiffError};
pub use logging::{LogFormat, LogSettings, init_logging};
pub use models::{
    Column, CompareOptions, CompareOutcome, DatabaseSchema, FileError, ReplayFailure,
    ReplayFailureKind, SchemaEndpoint, SchemaReference, Table,
};
pub use orchestrator::CompareOrchestrator;
pub use reporter::ScriptExecutionReporter;
pub use resolver::{EphemeralDatabase, OwnedDatabases, SourceResolver};

//! Collaborator traits for schema loading, comparison, script replay and
//! database disposal.
//!
//! The comparison workflow only talks to these traits. The `postgres`
//! module (feature `postgresql`) provides the bundled implementations; tests
//! substitute in-memory fakes.
//!
//! # Module Structure
//! - `config`: Configuration types (ConnectionConfig, EphemeralConfig)
//! - `postgres`: PostgreSQL loader, script runner and dropper

use crate::{
    Result,
    diff::DiffResult,
    models::{DatabaseSchema, ReplayFailure},
};
use async_trait::async_trait;
use std::path::Path;

pub mod config;

#[cfg(feature = "postgresql")]
pub mod postgres;

pub use config::{ConnectionConfig, EphemeralConfig};

/// Loads a schema snapshot from a connectable database.
///
/// Implementations must only read from the database; caller-supplied live
/// databases are never mutated.
#[async_trait]
pub trait SchemaLoader: Send + Sync {
    /// Loads the schema reachable through `connection_string`.
    ///
    /// # Errors
    /// Returns `SchemaLoad` if the server is unreachable or the database
    /// does not exist.
    async fn load(&self, connection_string: &str) -> Result<DatabaseSchema>;
}

/// Computes the structural difference between two schemas.
pub trait SchemaComparator: Send + Sync {
    /// Compares `source` against `target`.
    ///
    /// The resulting script, applied to the target, makes it structurally
    /// identical to the source.
    fn compare(&self, source: &DatabaseSchema, target: &DatabaseSchema) -> DiffResult;
}

/// Replays a directory of DDL scripts into a fresh database.
#[async_trait]
pub trait ScriptRunner: Send + Sync {
    /// Creates the database named by `connection_string` and replays every
    /// script under `directory` into it, in the runner's dependency order.
    ///
    /// A partial failure leaves whatever the successful scripts built in
    /// place; nothing is rolled back.
    ///
    /// # Errors
    /// Returns a [`ReplayFailure`] listing the failed files, or a single
    /// aborted failure if replay could not run to the end.
    async fn materialize(
        &self,
        directory: &Path,
        connection_string: &str,
    ) -> std::result::Result<(), ReplayFailure>;
}

/// Destroys an ephemeral database.
#[async_trait]
pub trait DatabaseDropper: Send + Sync {
    /// Drops the database named by `connection_string`.
    ///
    /// Must be idempotent: dropping a database that does not exist (or was
    /// never created) succeeds.
    ///
    /// # Errors
    /// Returns `Cleanup` if the server refuses or cannot be reached.
    async fn drop_database(&self, connection_string: &str) -> Result<()>;
}

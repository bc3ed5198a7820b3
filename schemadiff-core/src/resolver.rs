//! Resolution of script-directory references into ephemeral databases.
//!
//! Every ephemeral database is wrapped in an [`EphemeralDatabase`] guard as
//! soon as its name is generated, before any script runs, and handed to the
//! run's [`OwnedDatabases`] set. The set is released at the end of the run
//! whatever the outcome, so each database sees exactly one drop call.

use crate::{
    Result,
    adapters::{DatabaseDropper, EphemeralConfig, ScriptRunner},
    error::{SchemaDiffError, redact_database_url},
    models::{ReplayFailureKind, SchemaEndpoint},
    reporter::ScriptExecutionReporter,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Release-guaranteed handle on one ephemeral database.
///
/// Call [`EphemeralDatabase::release`] to drop the database. If the guard is
/// dropped unreleased (a panic, or a cancelled future) the drop call is
/// scheduled on the current tokio runtime instead.
pub struct EphemeralDatabase {
    endpoint: SchemaEndpoint,
    dropper: Arc<dyn DatabaseDropper>,
    released: bool,
}

impl EphemeralDatabase {
    fn new(endpoint: SchemaEndpoint, dropper: Arc<dyn DatabaseDropper>) -> Self {
        Self {
            endpoint,
            dropper,
            released: false,
        }
    }

    /// The endpoint this guard owns
    pub const fn endpoint(&self) -> &SchemaEndpoint {
        &self.endpoint
    }

    /// Drops the database.
    ///
    /// The drop call runs as its own task, so it completes even if the
    /// future returned here is cancelled.
    ///
    /// # Errors
    /// Returns the dropper's `Cleanup` error; the guard is consumed either way
    /// and no further drop is attempted.
    pub async fn release(mut self) -> Result<()> {
        debug!(
            "Dropping ephemeral database {}",
            redact_database_url(&self.endpoint.connection_string)
        );
        let dropper = Arc::clone(&self.dropper);
        let connection_string = self.endpoint.connection_string.clone();
        let task =
            tokio::spawn(async move { dropper.drop_database(&connection_string).await });
        self.released = true;

        task.await.map_err(|e| {
            SchemaDiffError::cleanup_failed(&self.endpoint.connection_string, e)
        })?
    }
}

impl std::fmt::Debug for EphemeralDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EphemeralDatabase")
            .field("endpoint", &self.endpoint)
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}

impl Drop for EphemeralDatabase {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        let redacted = redact_database_url(&self.endpoint.connection_string);
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            error!(
                "Ephemeral database {} was not released and no runtime is available to drop it",
                redacted
            );
            return;
        };

        warn!(
            "Ephemeral database {} was not released explicitly; scheduling drop",
            redacted
        );
        let dropper = Arc::clone(&self.dropper);
        let connection_string = self.endpoint.connection_string.clone();
        handle.spawn(async move {
            if let Err(e) = dropper.drop_database(&connection_string).await {
                error!("{}", e);
            }
        });
    }
}

/// The ephemeral databases owned by one comparison run.
#[derive(Debug, Default)]
pub struct OwnedDatabases {
    databases: Vec<EphemeralDatabase>,
}

impl OwnedDatabases {
    /// Creates an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes ownership of a guard
    pub fn push(&mut self, database: EphemeralDatabase) {
        self.databases.push(database);
    }

    /// Number of owned databases
    pub fn len(&self) -> usize {
        self.databases.len()
    }

    /// True if nothing is owned
    pub fn is_empty(&self) -> bool {
        self.databases.is_empty()
    }

    /// Releases every owned database in acquisition order.
    ///
    /// Every database is attempted even if an earlier drop fails. Failures
    /// are logged and returned; they never abort the release.
    pub async fn release_all(self) -> Vec<SchemaDiffError> {
        let mut failures = Vec::new();
        for database in self.databases {
            if let Err(e) = database.release().await {
                warn!("{}", e);
                failures.push(e);
            }
        }
        failures
    }
}

/// Turns script directories into materialized ephemeral endpoints.
pub struct SourceResolver {
    runner: Arc<dyn ScriptRunner>,
    dropper: Arc<dyn DatabaseDropper>,
    config: EphemeralConfig,
    reporter: ScriptExecutionReporter,
}

impl SourceResolver {
    /// Creates a resolver.
    ///
    /// # Errors
    /// Returns a configuration error if `config` is invalid
    pub fn new(
        runner: Arc<dyn ScriptRunner>,
        dropper: Arc<dyn DatabaseDropper>,
        config: EphemeralConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            runner,
            dropper,
            config,
            reporter: ScriptExecutionReporter::new(),
        })
    }

    /// Materializes `directory` into a new ephemeral database.
    ///
    /// The database's guard is pushed into `owned` before replay starts, so
    /// the caller drops it even when replay fails. A failed replay is not
    /// rolled back: the partially built database stays in place until the
    /// caller releases `owned`.
    ///
    /// # Errors
    /// - `Configuration` if `directory` is not an existing directory (no
    ///   database is provisioned in that case)
    /// - `Materialization` if replay fails; diagnostics are logged first
    pub async fn resolve(
        &self,
        directory: &Path,
        owned: &mut OwnedDatabases,
    ) -> Result<SchemaEndpoint> {
        let directory = normalize_directory(directory)?;

        let database = self.config.database_name(Uuid::new_v4());
        let endpoint = SchemaEndpoint::ephemeral(self.config.connection_string_for(&database)?);
        owned.push(EphemeralDatabase::new(
            endpoint.clone(),
            Arc::clone(&self.dropper),
        ));

        info!(
            "Materializing {} into ephemeral database {}",
            directory.display(),
            database
        );

        if let Err(failure) = self
            .runner
            .materialize(&directory, &endpoint.connection_string)
            .await
        {
            let lines = self.reporter.render(&failure);
            match failure.kind {
                ReplayFailureKind::Partial => {
                    for line in &lines {
                        warn!("{}", line);
                    }
                }
                ReplayFailureKind::Aborted => {
                    for line in &lines {
                        error!("{}", line);
                    }
                }
            }
            return Err(failure.into());
        }

        info!("✓ Materialized {}", directory.display());
        Ok(endpoint)
    }
}

impl std::fmt::Debug for SourceResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceResolver")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Makes `directory` absolute and checks that it exists.
fn normalize_directory(directory: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(directory).map_err(|e| {
        SchemaDiffError::io(
            format!("Failed to resolve script directory {}", directory.display()),
            e,
        )
    })?;

    if !absolute.is_dir() {
        return Err(SchemaDiffError::configuration(format!(
            "script directory {} does not exist or is not a directory",
            absolute.display()
        )));
    }

    Ok(absolute)
}

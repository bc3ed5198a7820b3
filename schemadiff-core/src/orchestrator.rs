//! The comparison workflow.
//!
//! [`CompareOrchestrator::compare`] resolves both schema references, loads
//! and compares the schemas, reports the result and optionally writes the
//! diff script. Ephemeral databases provisioned along the way are released
//! after the workflow returns, on the success path and on every error path.

use crate::{
    Result,
    adapters::{SchemaComparator, SchemaLoader},
    error::{SchemaDiffError, redact_database_url},
    models::{CompareOptions, CompareOutcome, SchemaEndpoint, SchemaReference},
    resolver::{OwnedDatabases, SourceResolver},
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Runs source/target comparisons.
pub struct CompareOrchestrator {
    loader: Arc<dyn SchemaLoader>,
    comparator: Arc<dyn SchemaComparator>,
    resolver: SourceResolver,
}

impl CompareOrchestrator {
    /// Creates an orchestrator from its collaborators
    pub fn new(
        loader: Arc<dyn SchemaLoader>,
        comparator: Arc<dyn SchemaComparator>,
        resolver: SourceResolver,
    ) -> Self {
        Self {
            loader,
            comparator,
            resolver,
        }
    }

    /// Creates an orchestrator backed by PostgreSQL and the structural
    /// comparator.
    ///
    /// # Errors
    /// Returns a configuration error if either configuration is invalid
    #[cfg(feature = "postgresql")]
    pub fn postgres(
        ephemeral: crate::adapters::EphemeralConfig,
        connection: crate::adapters::ConnectionConfig,
    ) -> Result<Self> {
        use crate::adapters::postgres::{
            PostgresDatabaseDropper, PostgresSchemaLoader, PostgresScriptRunner,
        };

        connection.validate()?;
        let runner = PostgresScriptRunner::new(&ephemeral, connection.clone());
        let dropper = PostgresDatabaseDropper::new(&ephemeral, connection.clone());
        let resolver = SourceResolver::new(Arc::new(runner), Arc::new(dropper), ephemeral)?;

        Ok(Self::new(
            Arc::new(PostgresSchemaLoader::new(connection)),
            Arc::new(crate::diff::StructuralComparator::new()),
            resolver,
        ))
    }

    /// Compares `source` against `target`.
    ///
    /// Returns whether the schemas differ, the status lines that were
    /// reported and the absolute path of the diff script if one was written.
    ///
    /// # Errors
    /// - `Materialization` if a script directory could not be replayed
    /// - `SchemaLoad` if either schema could not be loaded
    /// - `OutputAlreadyExists` if the output file exists and overwriting is
    ///   disabled; the comparison itself succeeded and the error carries its
    ///   report lines
    /// - `Io` if the diff script could not be written
    ///
    /// Failures to drop ephemeral databases are logged and never returned.
    pub async fn compare(
        &self,
        source: &SchemaReference,
        target: &SchemaReference,
        options: &CompareOptions,
    ) -> Result<CompareOutcome> {
        info!("Comparing {} against {}", source, target);

        let mut owned = OwnedDatabases::new();
        let result = self.run(source, target, options, &mut owned).await;

        if !owned.is_empty() {
            debug!("Releasing {} ephemeral database(s)", owned.len());
            let failures = owned.release_all().await;
            if !failures.is_empty() {
                warn!(
                    "{} ephemeral database(s) could not be dropped",
                    failures.len()
                );
            }
        }

        result
    }

    async fn run(
        &self,
        source: &SchemaReference,
        target: &SchemaReference,
        options: &CompareOptions,
        owned: &mut OwnedDatabases,
    ) -> Result<CompareOutcome> {
        let source_endpoint = self.endpoint_for(source, owned).await?;
        let target_endpoint = self.endpoint_for(target, owned).await?;

        debug!(
            "Loading source schema from {}",
            redact_database_url(&source_endpoint.connection_string)
        );
        let source_schema = self.loader.load(&source_endpoint.connection_string).await?;
        debug!(
            "Loading target schema from {}",
            redact_database_url(&target_endpoint.connection_string)
        );
        let target_schema = self.loader.load(&target_endpoint.connection_string).await?;

        let diff = self.comparator.compare(&source_schema, &target_schema);
        let mut report = Report::default();

        if !diff.has_differences() {
            report.line("Databases are identical.");
            return Ok(CompareOutcome {
                has_differences: false,
                report: report.into_lines(),
                script_written: None,
            });
        }

        report.line("Databases are different.");
        for line in diff.summarize(options.verbose_summary).lines() {
            report.line(line);
        }

        let script_written = match &options.output_diff_path {
            Some(path) => {
                let written = match write_script(path, diff.script(), options.overwrite_output)
                    .await
                {
                    Ok(written) => written,
                    Err(SchemaDiffError::OutputAlreadyExists { path, .. }) => {
                        return Err(SchemaDiffError::OutputAlreadyExists {
                            path,
                            report: report.into_lines(),
                        });
                    }
                    Err(e) => return Err(e),
                };
                report.line(format!(
                    "Script to make the databases identical has been created at {}",
                    written.display()
                ));
                Some(written)
            }
            None => None,
        };

        Ok(CompareOutcome {
            has_differences: true,
            report: report.into_lines(),
            script_written,
        })
    }

    async fn endpoint_for(
        &self,
        reference: &SchemaReference,
        owned: &mut OwnedDatabases,
    ) -> Result<SchemaEndpoint> {
        match reference {
            SchemaReference::LiveConnection(connection) => Ok(SchemaEndpoint::live(connection)),
            SchemaReference::ScriptDirectory(directory) => {
                self.resolver.resolve(directory, owned).await
            }
        }
    }
}

impl std::fmt::Debug for CompareOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompareOrchestrator")
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}

/// Status lines, logged at debug as they are added. Callers print them,
/// from the outcome or from [`SchemaDiffError::report`].
#[derive(Default)]
struct Report {
    lines: Vec<String>,
}

impl Report {
    fn line(&mut self, line: impl Into<String>) {
        let line = line.into();
        debug!("{}", line);
        self.lines.push(line);
    }

    fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

/// Writes the diff script and returns the absolute path written.
///
/// Without `overwrite` the file is opened with `create_new`, so an existing
/// file is never touched.
async fn write_script(path: &Path, script: &str, overwrite: bool) -> Result<PathBuf> {
    let absolute = std::path::absolute(path).map_err(|e| {
        SchemaDiffError::io(format!("Failed to resolve {}", path.display()), e)
    })?;

    let mut open = tokio::fs::OpenOptions::new();
    open.write(true);
    if overwrite {
        open.create(true).truncate(true);
    } else {
        open.create_new(true);
    }

    let mut file = open.open(&absolute).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::AlreadyExists {
            SchemaDiffError::OutputAlreadyExists {
                path: path.to_path_buf(),
                report: Vec::new(),
            }
        } else {
            SchemaDiffError::io(format!("Failed to open {}", absolute.display()), e)
        }
    })?;

    file.write_all(script.as_bytes())
        .await
        .map_err(|e| SchemaDiffError::io(format!("Failed to write {}", absolute.display()), e))?;
    file.flush()
        .await
        .map_err(|e| SchemaDiffError::io(format!("Failed to flush {}", absolute.display()), e))?;

    Ok(absolute)
}
